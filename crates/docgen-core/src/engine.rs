//! Pass orchestration.
//!
//! One request runs substitution, then one trim commit per templated table,
//! then the rich-content upgrade. Every pass after the first fetches a fresh
//! revision, since indices from an earlier fetch are stale after any commit.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::document::Document;
use crate::error::{EngineError, ResolutionError};
use crate::executor::{BatchExecutor, DocumentService, FileCopyService, Pass};
use crate::format::FormatPolicy;
use crate::kinds::{DocumentKind, GenerationPlan};
use crate::ops::EditOperation;
use crate::rich::{fallback_batch, locate_sentinels, primary_batch, IconSet};
use crate::substitute::substitution_batch;
use crate::trim::trim_operations;

/// How the rich-content pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RichOutcome {
    /// No slot had a destination, or none of their sentinels was found.
    Skipped,
    /// Icons were inserted.
    Primary,
    /// Icons were rejected; linked labels were inserted instead.
    Fallback,
}

/// What the passes did to one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub substitutions: usize,
    pub tables_trimmed: usize,
    pub rows_deleted: usize,
    pub rich_content: RichOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedDocument {
    pub document_id: String,
    pub url: String,
    pub rows_deleted: usize,
    pub rich_content: RichOutcome,
}

pub struct Engine {
    documents: Arc<dyn DocumentService>,
    files: Arc<dyn FileCopyService>,
    icons: IconSet,
    policy: FormatPolicy,
}

impl Engine {
    pub fn new(
        documents: Arc<dyn DocumentService>,
        files: Arc<dyn FileCopyService>,
        icons: IconSet,
        policy: FormatPolicy,
    ) -> Self {
        Self {
            documents,
            files,
            icons,
            policy,
        }
    }

    pub fn policy(&self) -> &FormatPolicy {
        &self.policy
    }

    pub fn icons(&self) -> &IconSet {
        &self.icons
    }

    /// Resolve the payload, copy the template and fill the copy.
    ///
    /// Payload errors are raised before anything is copied. Once the copy
    /// exists, errors carry its id; the copy is left in place.
    #[instrument(skip_all, fields(kind = kind.kind_name(), template_id = %template_id))]
    pub async fn generate(
        &self,
        template_id: &str,
        name: &str,
        kind: &(dyn DocumentKind + Sync),
    ) -> Result<GeneratedDocument, EngineError> {
        if template_id.trim().is_empty() {
            return Err(ResolutionError::EmptyTemplateId.into());
        }
        let plan = kind.resolve(&self.policy)?;

        let copy = self
            .files
            .copy(template_id, name)
            .await
            .map_err(|source| EngineError::Copy {
                template_id: template_id.to_string(),
                source,
            })?;
        info!(document_id = %copy.document_id, "Template copied");

        let report = self.run(&copy.document_id, &plan).await?;
        Ok(GeneratedDocument {
            document_id: copy.document_id,
            url: copy.url,
            rows_deleted: report.rows_deleted,
            rich_content: report.rich_content,
        })
    }

    /// Run every pass of `plan` against an existing document.
    pub async fn run(
        &self,
        document_id: &str,
        plan: &GenerationPlan,
    ) -> Result<PassReport, EngineError> {
        let executor = BatchExecutor::new(self.documents.as_ref());

        let substitutions = executor
            .commit(
                document_id,
                Pass::Substitution,
                &substitution_batch(&plan.context),
            )
            .await
            .map_err(|source| EngineError::Commit {
                document_id: document_id.to_string(),
                pass: Pass::Substitution,
                source,
            })?;

        let mut tables_trimmed = 0;
        let mut rows_deleted = 0;
        for spec in &plan.tables {
            let document = self.fetch(document_id).await?;
            let Some(ops) = trim_operations(&document, spec) else {
                debug!(document_id, marker = %spec.leading_marker, "No table follows marker, skipping");
                continue;
            };
            let deleted = ops
                .iter()
                .filter(|op| matches!(op, EditOperation::DeleteTableRow(_)))
                .count();
            executor
                .commit(document_id, Pass::Trim, &ops)
                .await
                .map_err(|source| EngineError::Commit {
                    document_id: document_id.to_string(),
                    pass: Pass::Trim,
                    source,
                })?;
            tables_trimmed += 1;
            rows_deleted += deleted;
        }

        let rich_content = self.upgrade_rich_content(document_id, plan).await?;

        info!(
            document_id,
            substitutions, tables_trimmed, rows_deleted, ?rich_content, "Document generated"
        );
        Ok(PassReport {
            substitutions,
            tables_trimmed,
            rows_deleted,
            rich_content,
        })
    }

    async fn upgrade_rich_content(
        &self,
        document_id: &str,
        plan: &GenerationPlan,
    ) -> Result<RichOutcome, EngineError> {
        let slots = plan.context.rich_slots();
        if slots.is_empty() {
            return Ok(RichOutcome::Skipped);
        }

        let document = self.fetch(document_id).await?;
        let located = locate_sentinels(&document, slots);
        if located.is_empty() {
            debug!(document_id, slots = slots.len(), "No sentinel found in document");
            return Ok(RichOutcome::Skipped);
        }

        let executor = BatchExecutor::new(self.documents.as_ref());
        let primary = primary_batch(&located, &self.icons);
        let primary_err = match executor.commit(document_id, Pass::RichPrimary, &primary).await {
            Ok(_) => return Ok(RichOutcome::Primary),
            Err(e) => e,
        };
        warn!(document_id, error = %primary_err, "Icon batch rejected, falling back to linked text");

        let fallback = fallback_batch(&located);
        match executor.commit(document_id, Pass::RichFallback, &fallback).await {
            Ok(_) => Ok(RichOutcome::Fallback),
            Err(fallback_err) => Err(EngineError::RichContent {
                document_id: document_id.to_string(),
                primary: primary_err,
                fallback: fallback_err,
            }),
        }
    }

    async fn fetch(&self, document_id: &str) -> Result<Document, EngineError> {
        self.documents
            .get(document_id)
            .await
            .map_err(|source| EngineError::Fetch {
                document_id: document_id.to_string(),
                source,
            })
    }
}
