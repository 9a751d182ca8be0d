//! Google Docs API v1 client.

use docgen_core::{Document, EditOperation, ServiceError};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::http::{check, transport};

pub const DOCS_API_BASE: &str = "https://docs.googleapis.com";

#[derive(Serialize)]
struct BatchUpdateRequest<'a> {
    requests: &'a [EditOperation],
}

/// Google Docs API client (stateless, token provided per call).
#[derive(Debug, Clone)]
pub struct GoogleDocsClient {
    http: Client,
    base_url: String,
}

impl Default for GoogleDocsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleDocsClient {
    pub fn new() -> Self {
        Self::with_base_url(DOCS_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the current revision of a document.
    #[instrument(skip(self, token), level = "debug")]
    pub async fn get_document(
        &self,
        token: &str,
        document_id: &str,
    ) -> Result<Document, ServiceError> {
        let url = format!("{}/v1/documents/{}", self.base_url, document_id);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        let body = check(resp, document_id)
            .await?
            .text()
            .await
            .map_err(transport)?;

        let document: Document =
            serde_json::from_str(&body).map_err(|e| ServiceError::Schema(e.to_string()))?;
        debug!(
            "Got document {} ({} top-level elements)",
            document_id,
            document.content.len()
        );
        Ok(document)
    }

    /// Apply `requests` as one atomic batch.
    #[instrument(skip(self, token, requests), level = "debug", fields(requests = requests.len()))]
    pub async fn batch_update(
        &self,
        token: &str,
        document_id: &str,
        requests: &[EditOperation],
    ) -> Result<(), ServiceError> {
        let url = format!("{}/v1/documents/{}:batchUpdate", self.base_url, document_id);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&BatchUpdateRequest { requests })
            .send()
            .await
            .map_err(transport)?;
        check(resp, document_id).await?;

        debug!("Applied {} requests to document {}", requests.len(), document_id);
        Ok(())
    }
}
