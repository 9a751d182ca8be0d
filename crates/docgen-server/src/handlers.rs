//! HTTP handlers.
//!
//! Implements:
//! - GET /health - Health check endpoint
//! - POST /proposals - Generate a commercial proposal
//! - POST /reports - Generate a marketing report
//! - GET /documents/{id} - Record of a generated document

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use docgen_core::{
    DocumentKind, Engine, ProposalPayload, ReportPayload, ResolutionError, RichOutcome,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{ApiError, Result};
use crate::store::{GenerationRecord, GenerationStore};

/// Default template per document kind.
#[derive(Debug, Clone, Default)]
pub struct Templates {
    pub proposal: Option<String>,
    pub report: Option<String>,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub store: Arc<dyn GenerationStore>,
    pub templates: Templates,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/proposals", post(create_proposal))
        .route("/reports", post(create_report))
        .route("/documents/{id}", get(get_document))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
}

/// GET /health - Health check endpoint.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest<P> {
    #[serde(default)]
    pub template_id: Option<String>,
    pub name: String,
    pub payload: P,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub document_id: String,
    pub url: String,
    pub rich_content: RichOutcome,
}

/// POST /proposals
pub async fn create_proposal(
    State(state): State<AppState>,
    request: std::result::Result<Json<GenerateRequest<ProposalPayload>>, JsonRejection>,
) -> Result<(StatusCode, Json<GenerateResponse>)> {
    let Json(request) = request?;
    let template = state.templates.proposal.clone();
    generate(&state, template, request).await
}

/// POST /reports
pub async fn create_report(
    State(state): State<AppState>,
    request: std::result::Result<Json<GenerateRequest<ReportPayload>>, JsonRejection>,
) -> Result<(StatusCode, Json<GenerateResponse>)> {
    let Json(request) = request?;
    let template = state.templates.report.clone();
    generate(&state, template, request).await
}

/// GET /documents/{id}
pub async fn get_document(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<GenerationRecord>> {
    state
        .store
        .get(&document_id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound(document_id))
}

async fn generate<K>(
    state: &AppState,
    default_template: Option<String>,
    request: GenerateRequest<K>,
) -> Result<(StatusCode, Json<GenerateResponse>)>
where
    K: DocumentKind + Serialize + Send + Sync,
{
    let kind = request.payload.kind_name();
    let template_id = request
        .template_id
        .filter(|t| !t.trim().is_empty())
        .or(default_template)
        .ok_or(ApiError::NoTemplate(kind))?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::Engine(ResolutionError::MissingField("name").into()));
    }

    let generated = state
        .engine
        .generate(&template_id, name, &request.payload)
        .await?;

    let record = GenerationRecord::new(&generated, kind, name, &template_id, &request.payload)
        .map_err(|source| ApiError::Record {
            document_id: generated.document_id.clone(),
            source,
        })?;
    state.store.save(record).await;

    info!(kind, document_id = %generated.document_id, "Generated {}", generated.url);
    Ok((
        StatusCode::CREATED,
        Json(GenerateResponse {
            document_id: generated.document_id,
            url: generated.url,
            rich_content: generated.rich_content,
        }),
    ))
}
