//! HTTP front end for the docgen engine.
//!
//! This server:
//! - Accepts proposal and report payloads as JSON
//! - Copies the configured Google Docs template for each request
//! - Fills the copy through the substitution, trimming and rich-content passes
//! - Records every generated document in memory, retrievable by id

use std::sync::Arc;

use clap::Parser;
use docgen_core::Engine;
use docgen_gdocs::GoogleWorkspace;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod handlers;
mod store;

use config::Config;
use handlers::{router, AppState, Templates};
use store::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    info!("Starting docgen-server v{}", env!("CARGO_PKG_VERSION"));
    info!("  Host: {}", config.host);
    info!("  Port: {}", config.port);

    let tokens = config.token_provider()?;
    if config.google_access_token.is_some() {
        info!("  Auth: static access token");
    } else {
        info!("  Auth: OAuth refresh token");
    }

    let icons = config.icon_set();
    info!("  Icons: {} kinds configured", icons.len());
    if icons.is_empty() {
        warn!("  No --icon configured, rich links render as linked text");
    }
    for (kind, template) in [
        ("proposal", &config.proposal_template_id),
        ("report", &config.report_template_id),
    ] {
        match template {
            Some(id) => info!("  {} template: {}", kind, id),
            None => warn!("  No {} template configured, requests must pass template_id", kind),
        }
    }

    let workspace =
        Arc::new(GoogleWorkspace::new(tokens).with_output_folder(config.output_folder_id.clone()));
    let engine = Engine::new(
        workspace.clone(),
        workspace,
        icons,
        config.format_policy(),
    );

    let state = AppState {
        engine: Arc::new(engine),
        store: Arc::new(MemoryStore::new()),
        templates: Templates {
            proposal: config.proposal_template_id.clone(),
            report: config.report_template_id.clone(),
        },
    };
    let app = router(state);

    // Bind and serve
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, initiating shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM, initiating shutdown");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
