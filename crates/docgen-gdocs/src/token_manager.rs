//! OAuth bearer tokens for the Google APIs.
//!
//! Either a fixed token handed in at startup, or a long-lived refresh token
//! exchanged at the OAuth token endpoint and cached in memory until shortly
//! before it expires.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use docgen_core::ServiceError;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::http::transport;

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Source of the bearer token sent with every API call.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, ServiceError>;
}

/// A token that never changes. Suited to short-lived processes and tests.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, ServiceError> {
        Ok(self.0.clone())
    }
}

/// Cached token with expiration.
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at - Duration::minutes(5)
    }
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: u64,
    #[serde(default)]
    refresh_token: Option<String>,
}

struct Credentials {
    refresh_token: String,
    cached: Option<CachedToken>,
}

/// Exchanges a refresh token for access tokens, refreshing on demand.
///
/// Concurrent callers wait on the same refresh instead of each starting one.
pub struct RefreshingTokenProvider {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    credentials: Mutex<Credentials>,
}

impl RefreshingTokenProvider {
    pub fn new(client_id: String, client_secret: String, refresh_token: String) -> Self {
        Self {
            http: Client::new(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            client_id,
            client_secret,
            credentials: Mutex::new(Credentials {
                refresh_token,
                cached: None,
            }),
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ServiceError> {
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ServiceError::Auth(format!(
                "OAuth token refresh failed: {} {}",
                status, body
            )));
        }

        resp.json()
            .await
            .map_err(|e| ServiceError::Schema(e.to_string()))
    }
}

#[async_trait]
impl TokenProvider for RefreshingTokenProvider {
    async fn access_token(&self) -> Result<String, ServiceError> {
        let mut credentials = self.credentials.lock().await;

        if let Some(cached) = &credentials.cached {
            if !cached.is_expired() {
                debug!("Access token cache hit");
                return Ok(cached.access_token.clone());
            }
            debug!("Access token expired, refreshing");
        }

        let refreshed = self.refresh(&credentials.refresh_token).await?;
        let expires_at = expiry(Utc::now(), refreshed.expires_in)?;

        // Google may rotate the refresh token
        if let Some(rotated) = refreshed.refresh_token {
            credentials.refresh_token = rotated;
        }
        credentials.cached = Some(CachedToken {
            access_token: refreshed.access_token.clone(),
            expires_at,
        });

        info!("Refreshed OAuth access token, expires at {}", expires_at.to_rfc3339());
        Ok(refreshed.access_token)
    }
}

/// Absolute expiry of a token valid for `expires_in` seconds from `now`.
fn expiry(now: DateTime<Utc>, expires_in: u64) -> Result<DateTime<Utc>, ServiceError> {
    i64::try_from(expires_in)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            ServiceError::Schema(format!("token expires_in out of range: {}", expires_in))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_in_range() {
        let now = Utc::now();
        assert_eq!(expiry(now, 3599).unwrap(), now + Duration::seconds(3599));
    }

    #[test]
    fn test_expiry_out_of_range_is_schema_error() {
        let now = Utc::now();
        assert!(matches!(expiry(now, u64::MAX), Err(ServiceError::Schema(_))));
        assert!(matches!(
            expiry(now, i64::MAX as u64),
            Err(ServiceError::Schema(_))
        ));
    }

    #[test]
    fn test_token_expires_five_minutes_early() {
        let fresh = CachedToken {
            access_token: "a".to_string(),
            expires_at: Utc::now() + Duration::minutes(30),
        };
        assert!(!fresh.is_expired());

        let almost = CachedToken {
            access_token: "a".to_string(),
            expires_at: Utc::now() + Duration::minutes(4),
        };
        assert!(almost.is_expired());
    }

    #[tokio::test]
    async fn test_static_token() {
        let provider = StaticToken::new("ya29.static");
        assert_eq!(provider.access_token().await.unwrap(), "ya29.static");
    }
}
