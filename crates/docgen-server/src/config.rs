use std::sync::Arc;

use clap::Parser;
use docgen_core::{CurrencyFormat, FormatPolicy, IconSet, IconSpec};
use docgen_gdocs::{RefreshingTokenProvider, StaticToken, TokenProvider};

/// Configuration for the docgen server.
#[derive(Parser, Debug, Clone)]
#[command(name = "docgen-server")]
#[command(about = "Generates proposals and reports from Google Docs templates")]
pub struct Config {
    /// TCP host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "DOCGEN_HOST")]
    pub host: String,

    /// TCP port to bind to
    #[arg(long, default_value = "8080", env = "DOCGEN_PORT")]
    pub port: u16,

    /// Fixed OAuth access token (takes precedence over the refresh flow)
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN")]
    pub google_access_token: Option<String>,

    /// Google OAuth2 Client ID (for token refresh)
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    /// Google OAuth2 Client Secret (for token refresh)
    #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
    pub google_client_secret: Option<String>,

    /// Long-lived OAuth2 refresh token
    #[arg(long, env = "GOOGLE_REFRESH_TOKEN")]
    pub google_refresh_token: Option<String>,

    /// Default template for POST /proposals
    #[arg(long, env = "PROPOSAL_TEMPLATE_ID")]
    pub proposal_template_id: Option<String>,

    /// Default template for POST /reports
    #[arg(long, env = "REPORT_TEMPLATE_ID")]
    pub report_template_id: Option<String>,

    /// Drive folder receiving generated documents
    #[arg(long, env = "DOCGEN_OUTPUT_FOLDER_ID")]
    pub output_folder_id: Option<String>,

    /// Icon per rich-link kind, e.g. `--icon calendar=https://cdn.example.com/cal.png`
    #[arg(long = "icon", value_name = "KIND=URL", env = "DOCGEN_ICONS", value_delimiter = ',')]
    pub icons: Vec<IconSpec>,

    /// Currency symbol
    #[arg(long, default_value = "$", env = "DOCGEN_CURRENCY_SYMBOL")]
    pub currency_symbol: String,

    /// Thousands separator for amounts
    #[arg(long, default_value = ".", env = "DOCGEN_THOUSANDS_SEPARATOR")]
    pub thousands_separator: char,

    /// Decimal separator for amounts
    #[arg(long, default_value = ",", env = "DOCGEN_DECIMAL_SEPARATOR")]
    pub decimal_separator: char,

    /// Decimal places shown for amounts
    #[arg(long, default_value = "0", env = "DOCGEN_CURRENCY_PRECISION")]
    pub currency_precision: u32,
}

impl Config {
    pub fn format_policy(&self) -> FormatPolicy {
        FormatPolicy {
            currency: CurrencyFormat {
                symbol: self.currency_symbol.clone(),
                thousands_separator: self.thousands_separator,
                decimal_separator: self.decimal_separator,
                precision: self.currency_precision,
            },
        }
    }

    pub fn icon_set(&self) -> IconSet {
        self.icons.iter().cloned().collect()
    }

    /// Static token if one is given, otherwise the refresh-token flow.
    pub fn token_provider(&self) -> anyhow::Result<Arc<dyn TokenProvider>> {
        if let Some(token) = self.google_access_token.as_deref().filter(|t| !t.is_empty()) {
            return Ok(Arc::new(StaticToken::new(token)));
        }
        match (
            &self.google_client_id,
            &self.google_client_secret,
            &self.google_refresh_token,
        ) {
            (Some(id), Some(secret), Some(refresh)) => Ok(Arc::new(RefreshingTokenProvider::new(
                id.clone(),
                secret.clone(),
                refresh.clone(),
            ))),
            _ => anyhow::bail!(
                "Set GOOGLE_ACCESS_TOKEN, or GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET and GOOGLE_REFRESH_TOKEN"
            ),
        }
    }
}
