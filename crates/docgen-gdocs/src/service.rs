use std::sync::Arc;

use async_trait::async_trait;
use docgen_core::{
    CopiedDocument, Document, DocumentService, EditOperation, FileCopyService, ServiceError,
};

use crate::docs::GoogleDocsClient;
use crate::drive::{document_url, DriveClient};
use crate::token_manager::TokenProvider;

/// Docs and Drive behind the engine's service traits.
pub struct GoogleWorkspace {
    docs: GoogleDocsClient,
    drive: DriveClient,
    tokens: Arc<dyn TokenProvider>,
    output_folder: Option<String>,
}

impl GoogleWorkspace {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            docs: GoogleDocsClient::new(),
            drive: DriveClient::new(),
            tokens,
            output_folder: None,
        }
    }

    pub fn with_clients(mut self, docs: GoogleDocsClient, drive: DriveClient) -> Self {
        self.docs = docs;
        self.drive = drive;
        self
    }

    /// Drive folder that receives the generated documents.
    pub fn with_output_folder(mut self, folder_id: Option<String>) -> Self {
        self.output_folder = folder_id.filter(|f| !f.trim().is_empty());
        self
    }
}

#[async_trait]
impl DocumentService for GoogleWorkspace {
    async fn get(&self, document_id: &str) -> Result<Document, ServiceError> {
        let token = self.tokens.access_token().await?;
        self.docs.get_document(&token, document_id).await
    }

    async fn commit(
        &self,
        document_id: &str,
        operations: &[EditOperation],
    ) -> Result<(), ServiceError> {
        let token = self.tokens.access_token().await?;
        self.docs.batch_update(&token, document_id, operations).await
    }
}

#[async_trait]
impl FileCopyService for GoogleWorkspace {
    async fn copy(&self, template_id: &str, name: &str) -> Result<CopiedDocument, ServiceError> {
        let token = self.tokens.access_token().await?;
        let document_id = self
            .drive
            .copy_file(&token, template_id, name, self.output_folder.as_deref())
            .await?;
        Ok(CopiedDocument {
            url: document_url(&document_id),
            document_id,
        })
    }
}
