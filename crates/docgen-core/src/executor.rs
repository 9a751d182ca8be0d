use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::document::Document;
use crate::error::ServiceError;
use crate::ops::EditOperation;

/// Remote structural document store.
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Fetch the current revision of a document.
    async fn get(&self, document_id: &str) -> Result<Document, ServiceError>;

    /// Apply `operations` in one atomic batch. Either every operation lands or
    /// none does.
    async fn commit(&self, document_id: &str, operations: &[EditOperation])
        -> Result<(), ServiceError>;
}

/// Result of copying a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopiedDocument {
    pub document_id: String,
    pub url: String,
}

/// Remote file store able to duplicate a template.
#[async_trait]
pub trait FileCopyService: Send + Sync {
    async fn copy(&self, template_id: &str, name: &str) -> Result<CopiedDocument, ServiceError>;
}

/// Engine pass a batch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    Substitution,
    Trim,
    RichPrimary,
    RichFallback,
}

impl Pass {
    pub fn as_str(self) -> &'static str {
        match self {
            Pass::Substitution => "substitution",
            Pass::Trim => "trim",
            Pass::RichPrimary => "rich_primary",
            Pass::RichFallback => "rich_fallback",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sends batches to a `DocumentService`. No retries.
pub struct BatchExecutor<'a> {
    service: &'a dyn DocumentService,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(service: &'a dyn DocumentService) -> Self {
        Self { service }
    }

    /// Commit one batch and return the number of operations sent.
    /// An empty batch is not sent.
    pub async fn commit(
        &self,
        document_id: &str,
        pass: Pass,
        operations: &[EditOperation],
    ) -> Result<usize, ServiceError> {
        if operations.is_empty() {
            debug!(document_id, %pass, "Empty batch, nothing to commit");
            return Ok(0);
        }

        for op in operations {
            debug!(document_id, %pass, op = op.name(), offset = ?op.start_offset());
        }
        self.service.commit(document_id, operations).await?;
        info!(
            document_id,
            %pass,
            operations = operations.len(),
            "Committed batch"
        );
        Ok(operations.len())
    }
}
