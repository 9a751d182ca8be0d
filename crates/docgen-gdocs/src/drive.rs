//! Google Drive API v3 client: template duplication.

use docgen_core::ServiceError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::http::{check, transport};

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com";

/// Browser URL of a Google Docs document.
pub fn document_url(document_id: &str) -> String {
    format!("https://docs.google.com/document/d/{}/edit", document_id)
}

#[derive(Serialize)]
struct CopyRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parents: Option<[&'a str; 1]>,
}

#[derive(Debug, Deserialize)]
struct CopiedFile {
    id: String,
}

/// Google Drive API client (stateless, token provided per call).
#[derive(Debug, Clone)]
pub struct DriveClient {
    http: Client,
    base_url: String,
}

impl Default for DriveClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveClient {
    pub fn new() -> Self {
        Self::with_base_url(DRIVE_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Copy `file_id` under a new name and return the id of the copy.
    #[instrument(skip(self, token), level = "debug")]
    pub async fn copy_file(
        &self,
        token: &str,
        file_id: &str,
        name: &str,
        parent: Option<&str>,
    ) -> Result<String, ServiceError> {
        let url = format!(
            "{}/drive/v3/files/{}/copy?fields=id&supportsAllDrives=true",
            self.base_url, file_id
        );

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&CopyRequest {
                name,
                parents: parent.map(|p| [p]),
            })
            .send()
            .await
            .map_err(transport)?;
        let copied: CopiedFile = check(resp, file_id)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::Schema(e.to_string()))?;

        debug!("Copied file {} to {}", file_id, copied.id);
        Ok(copied.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_url() {
        assert_eq!(
            document_url("1AbC"),
            "https://docs.google.com/document/d/1AbC/edit"
        );
    }

    #[test]
    fn test_copy_request_omits_missing_parent() {
        let body = serde_json::to_value(CopyRequest {
            name: "Propuesta",
            parents: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "name": "Propuesta" }));

        let body = serde_json::to_value(CopyRequest {
            name: "Propuesta",
            parents: Some(["folder"]),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "name": "Propuesta", "parents": ["folder"] })
        );
    }
}
