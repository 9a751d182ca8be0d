//! Records of generated documents.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use docgen_core::{GeneratedDocument, RichOutcome};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Payload could not be serialized: {0}")]
    Payload(#[from] serde_json::Error),
}

/// One successfully generated document and the payload it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRecord {
    pub document_id: String,
    pub url: String,
    pub kind: &'static str,
    pub name: String,
    pub template_id: String,
    pub payload: serde_json::Value,
    pub rows_deleted: usize,
    pub rich_content: RichOutcome,
    pub created_at: DateTime<Utc>,
}

impl GenerationRecord {
    pub fn new<P: Serialize>(
        generated: &GeneratedDocument,
        kind: &'static str,
        name: &str,
        template_id: &str,
        payload: &P,
    ) -> Result<Self, RecordError> {
        Ok(Self {
            document_id: generated.document_id.clone(),
            url: generated.url.clone(),
            kind,
            name: name.to_string(),
            template_id: template_id.to_string(),
            payload: serde_json::to_value(payload)?,
            rows_deleted: generated.rows_deleted,
            rich_content: generated.rich_content,
            created_at: Utc::now(),
        })
    }
}

/// Persistence for generation records.
#[async_trait]
pub trait GenerationStore: Send + Sync {
    async fn save(&self, record: GenerationRecord);

    async fn get(&self, document_id: &str) -> Option<GenerationRecord>;
}

/// Process-local store; records are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<String, GenerationRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GenerationStore for MemoryStore {
    async fn save(&self, record: GenerationRecord) {
        self.records.insert(record.document_id.clone(), record);
    }

    async fn get(&self, document_id: &str) -> Option<GenerationRecord> {
        self.records.get(document_id).map(|r| r.value().clone())
    }
}
