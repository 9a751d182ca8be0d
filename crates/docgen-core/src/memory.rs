//! Process-local document and file services.
//!
//! `MemoryDocuments` applies edit batches to in-memory documents the way the
//! remote service does: atomically, one operation at a time, with indices
//! recomputed after each operation. Text replacement works run by run, so a
//! marker split across two runs is not replaced.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use regex::{NoExpand, RegexBuilder};

use crate::document::{
    byte_offset, Document, ElementKind, Paragraph, ParagraphElement, ParagraphElementKind,
    StructuralElement, Table,
};
use crate::error::ServiceError;
use crate::executor::{CopiedDocument, DocumentService, FileCopyService};
use crate::ops::EditOperation;

type Rejection = Box<dyn Fn(&[EditOperation]) -> bool + Send + Sync>;

#[derive(Default)]
struct State {
    documents: HashMap<String, Document>,
    fetches: HashMap<String, usize>,
    attempts: HashMap<String, Vec<Vec<EditOperation>>>,
    commits: HashMap<String, Vec<Vec<EditOperation>>>,
    copies: usize,
}

/// In-memory `DocumentService` and `FileCopyService`.
#[derive(Default)]
pub struct MemoryDocuments {
    state: Mutex<State>,
    reject: Option<Rejection>,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every batch for which `predicate` returns true, leaving the
    /// document untouched.
    pub fn reject_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&[EditOperation]) -> bool + Send + Sync + 'static,
    {
        self.reject = Some(Box::new(predicate));
        self
    }

    pub fn insert(&self, document: Document) {
        self.state()
            .documents
            .insert(document.document_id.clone(), document);
    }

    pub fn document(&self, document_id: &str) -> Option<Document> {
        self.state().documents.get(document_id).cloned()
    }

    /// Number of `get` calls for a document.
    pub fn fetches(&self, document_id: &str) -> usize {
        self.state().fetches.get(document_id).copied().unwrap_or(0)
    }

    /// Every batch received, applied or not.
    pub fn attempts(&self, document_id: &str) -> Vec<Vec<EditOperation>> {
        self.state()
            .attempts
            .get(document_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Batches that were applied.
    pub fn commits(&self, document_id: &str) -> Vec<Vec<EditOperation>> {
        self.state()
            .commits
            .get(document_id)
            .cloned()
            .unwrap_or_default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DocumentService for MemoryDocuments {
    async fn get(&self, document_id: &str) -> Result<Document, ServiceError> {
        let mut state = self.state();
        *state.fetches.entry(document_id.to_string()).or_default() += 1;
        state
            .documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(document_id.to_string()))
    }

    async fn commit(
        &self,
        document_id: &str,
        operations: &[EditOperation],
    ) -> Result<(), ServiceError> {
        let mut state = self.state();
        let mut working = state
            .documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(document_id.to_string()))?;

        state
            .attempts
            .entry(document_id.to_string())
            .or_default()
            .push(operations.to_vec());

        if self.reject.as_ref().is_some_and(|reject| reject(operations)) {
            return Err(ServiceError::Status {
                status: 400,
                body: "batch rejected".to_string(),
            });
        }

        for (i, op) in operations.iter().enumerate() {
            apply(&mut working, op).map_err(|reason| ServiceError::Status {
                status: 400,
                body: format!("requests[{}] ({}): {}", i, op.name(), reason),
            })?;
            working.reindex();
        }

        state.documents.insert(document_id.to_string(), working);
        state
            .commits
            .entry(document_id.to_string())
            .or_default()
            .push(operations.to_vec());
        Ok(())
    }
}

#[async_trait]
impl FileCopyService for MemoryDocuments {
    async fn copy(&self, template_id: &str, name: &str) -> Result<CopiedDocument, ServiceError> {
        let mut state = self.state();
        let template = state
            .documents
            .get(template_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(template_id.to_string()))?;

        state.copies += 1;
        let document_id = format!("{}-copy-{}", template_id, state.copies);
        let mut copy = template;
        copy.document_id = document_id.clone();
        copy.title = name.to_string();
        state.documents.insert(document_id.clone(), copy);

        Ok(CopiedDocument {
            url: format!("memory://{}", document_id),
            document_id,
        })
    }
}

fn apply(document: &mut Document, op: &EditOperation) -> Result<(), String> {
    match op {
        EditOperation::ReplaceAllText(op) => {
            let criteria = &op.contains_text;
            if criteria.text.is_empty() {
                return Err("empty search text".to_string());
            }
            let pattern = RegexBuilder::new(&regex::escape(&criteria.text))
                .case_insensitive(!criteria.match_case)
                .build()
                .map_err(|e| e.to_string())?;
            for_each_paragraph(&mut document.content, &mut |paragraph| {
                for element in &mut paragraph.elements {
                    if let ParagraphElementKind::TextRun { content, .. } = &mut element.kind {
                        let replaced = pattern
                            .replace_all(content, NoExpand(op.replace_text.as_str()))
                            .into_owned();
                        *content = replaced;
                    }
                }
            });
            Ok(())
        }
        EditOperation::DeleteContentRange(op) => {
            let range = op.range;
            if range.is_empty() {
                return Err("empty range".to_string());
            }
            let paragraph =
                paragraph_spanning(&mut document.content, range.start_index, range.end_index)?;
            let lo = split_at(paragraph, range.start_index)?;
            let hi = split_at(paragraph, range.end_index)?;
            paragraph.elements.drain(lo..hi);
            Ok(())
        }
        EditOperation::InsertText(op) => {
            if op.text.is_empty() {
                return Err("empty text".to_string());
            }
            let index = op.location.index;
            let paragraph = paragraph_spanning(&mut document.content, index, index)?;
            let pos = split_at(paragraph, index)?;
            paragraph
                .elements
                .insert(pos, ParagraphElement::text(op.text.clone()));
            Ok(())
        }
        EditOperation::InsertInlineImage(op) => {
            let index = op.location.index;
            let paragraph = paragraph_spanning(&mut document.content, index, index)?;
            let pos = split_at(paragraph, index)?;
            paragraph.elements.insert(
                pos,
                ParagraphElement {
                    start_index: index,
                    end_index: index + 1,
                    kind: ParagraphElementKind::InlineObject {
                        uri: Some(op.uri.clone()),
                        link: None,
                    },
                },
            );
            Ok(())
        }
        EditOperation::UpdateTextStyle(op) => {
            let range = op.range;
            if range.is_empty() {
                return Err("empty range".to_string());
            }
            let paragraph =
                paragraph_spanning(&mut document.content, range.start_index, range.end_index)?;
            let lo = split_at(paragraph, range.start_index)?;
            let hi = split_at(paragraph, range.end_index)?;
            for element in &mut paragraph.elements[lo..hi] {
                match &mut element.kind {
                    ParagraphElementKind::TextRun { link, .. }
                    | ParagraphElementKind::InlineObject { link, .. } => {
                        *link = Some(op.text_style.link.url.clone());
                    }
                    ParagraphElementKind::Other => {}
                }
            }
            Ok(())
        }
        EditOperation::DeleteTableRow(op) => {
            let location = &op.table_cell_location;
            let table_start = location.table_start_location.index;
            let table = table_at(&mut document.content, table_start)
                .ok_or_else(|| format!("no table starts at {}", table_start))?;
            if location.row_index >= table.rows.len() {
                return Err(format!(
                    "row {} out of bounds ({} rows)",
                    location.row_index,
                    table.rows.len()
                ));
            }
            table.rows.remove(location.row_index);
            Ok(())
        }
    }
}

fn for_each_paragraph(content: &mut [StructuralElement], f: &mut dyn FnMut(&mut Paragraph)) {
    for element in content {
        match &mut element.kind {
            ElementKind::Paragraph(paragraph) => f(paragraph),
            ElementKind::Table(table) => {
                for row in &mut table.rows {
                    for cell in &mut row.cells {
                        for_each_paragraph(&mut cell.content, f);
                    }
                }
            }
            ElementKind::Other => {}
        }
    }
}

/// Paragraph containing `start` whose end is at or after `end`.
fn paragraph_spanning(
    content: &mut [StructuralElement],
    start: u32,
    end: u32,
) -> Result<&mut Paragraph, String> {
    let paragraph = paragraph_at(content, start)
        .ok_or_else(|| format!("index {} is not inside a paragraph", start))?;
    let paragraph_end = paragraph.elements.last().map(|e| e.end_index).unwrap_or(0);
    if end > paragraph_end {
        return Err(format!("range [{}, {}) crosses a paragraph boundary", start, end));
    }
    Ok(paragraph)
}

fn paragraph_at(content: &mut [StructuralElement], index: u32) -> Option<&mut Paragraph> {
    let element = content
        .iter_mut()
        .find(|e| e.start_index <= index && index < e.end_index)?;
    match &mut element.kind {
        ElementKind::Paragraph(paragraph) => Some(paragraph),
        ElementKind::Table(table) => table
            .rows
            .iter_mut()
            .flat_map(|row| row.cells.iter_mut())
            .find(|cell| cell.start_index <= index && index < cell.end_index)
            .and_then(|cell| paragraph_at(&mut cell.content, index)),
        ElementKind::Other => None,
    }
}

fn table_at(content: &mut [StructuralElement], index: u32) -> Option<&mut Table> {
    let element = content
        .iter_mut()
        .find(|e| e.start_index <= index && index < e.end_index)?;
    if element.start_index == index {
        return match &mut element.kind {
            ElementKind::Table(table) => Some(table),
            _ => None,
        };
    }
    match &mut element.kind {
        ElementKind::Table(table) => table
            .rows
            .iter_mut()
            .flat_map(|row| row.cells.iter_mut())
            .find(|cell| cell.start_index <= index && index < cell.end_index)
            .and_then(|cell| table_at(&mut cell.content, index)),
        _ => None,
    }
}

/// Ensure an element boundary at `index` and return the position of the
/// element starting there (or the element count, at the paragraph end).
fn split_at(paragraph: &mut Paragraph, index: u32) -> Result<usize, String> {
    let found = paragraph
        .elements
        .iter()
        .position(|e| e.start_index <= index && index < e.end_index);
    let Some(pos) = found else {
        return match paragraph.elements.last() {
            Some(last) if last.end_index == index => Ok(paragraph.elements.len()),
            _ => Err(format!("index {} is outside the paragraph", index)),
        };
    };

    let element = &mut paragraph.elements[pos];
    let (start, end) = (element.start_index, element.end_index);
    if start == index {
        return Ok(pos);
    }
    let ParagraphElementKind::TextRun { content, link } = &mut element.kind else {
        return Err(format!("index {} falls inside a non-text element", index));
    };
    let at = byte_offset(content, index - start);
    let tail = ParagraphElement {
        start_index: index,
        end_index: end,
        kind: ParagraphElementKind::TextRun {
            content: content.split_off(at),
            link: link.clone(),
        },
    };
    element.end_index = index;
    paragraph.elements.insert(pos + 1, tail);
    Ok(pos + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextRange;
    use crate::ops::ObjectSize;
    use crate::search::{find_first_marker_range, flatten_paragraph_text};

    fn service(content: Vec<StructuralElement>) -> MemoryDocuments {
        let service = MemoryDocuments::new();
        service.insert(Document::new("doc", "t", content));
        service
    }

    fn first_text(service: &MemoryDocuments) -> String {
        let document = service.document("doc").unwrap();
        flatten_paragraph_text(document.content[0].as_paragraph().unwrap())
    }

    #[tokio::test]
    async fn test_replace_all_is_case_insensitive_and_literal() {
        let service = service(vec![StructuralElement::paragraph("<-Empresa-> y <-empresa->\n")]);
        service
            .commit("doc", &[EditOperation::replace_all("<-EMPRESA->", "$1 Acme")])
            .await
            .unwrap();
        assert_eq!(first_text(&service), "$1 Acme y $1 Acme\n");
    }

    #[tokio::test]
    async fn test_delete_insert_and_link_reindex_between_ops() {
        let service = service(vec![StructuralElement::paragraph("Web: %%s%% fin\n")]);
        let ops = [
            EditOperation::delete_range(TextRange::new(5, 10)),
            EditOperation::insert_text(5, "Sitio"),
            EditOperation::link(TextRange::new(5, 10), "https://acme.test"),
        ];
        service.commit("doc", &ops).await.unwrap();

        assert_eq!(first_text(&service), "Web: Sitio fin\n");
        let document = service.document("doc").unwrap();
        let paragraph = document.content[0].as_paragraph().unwrap();
        let linked: Vec<&str> = paragraph
            .text_runs()
            .filter(|(e, _)| e.link().is_some())
            .map(|(_, text)| text)
            .collect();
        assert_eq!(linked, vec!["Sitio"]);
        assert_eq!(document.end_index(), 15);
    }

    #[tokio::test]
    async fn test_inline_image_takes_one_index() {
        let service = service(vec![StructuralElement::paragraph("a %%s%%\n")]);
        let ops = [
            EditOperation::delete_range(TextRange::new(2, 7)),
            EditOperation::insert_image(2, "https://cdn.test/i.png", ObjectSize::square(16.0)),
            EditOperation::link(TextRange::new(2, 3), "https://acme.test"),
        ];
        service.commit("doc", &ops).await.unwrap();

        let document = service.document("doc").unwrap();
        let paragraph = document.content[0].as_paragraph().unwrap();
        let image = &paragraph.elements[1];
        assert_eq!(image.index_len(), 1);
        assert_eq!(image.link(), Some("https://acme.test"));
        assert_eq!(document.end_index(), 4);
    }

    #[tokio::test]
    async fn test_delete_table_row() {
        let service = service(vec![
            StructuralElement::paragraph("x\n"),
            StructuralElement::table(vec![vec!["h"], vec!["a"], vec!["b"]]),
        ]);
        let anchor = service.document("doc").unwrap().content[1].start_index;
        service
            .commit("doc", &[EditOperation::delete_table_row(anchor, 2)])
            .await
            .unwrap();

        let document = service.document("doc").unwrap();
        assert_eq!(document.content[1].as_table().unwrap().rows.len(), 2);
        assert!(find_first_marker_range(&document, "b").is_none());
    }

    #[tokio::test]
    async fn test_delete_row_of_table_nested_in_cell() {
        let mut outer = StructuralElement::table(vec![vec!["o"]]);
        if let ElementKind::Table(table) = &mut outer.kind {
            table.rows[0].cells[0].content = vec![
                StructuralElement::paragraph("in\n"),
                StructuralElement::table(vec![vec!["h"], vec!["a"], vec!["b"]]),
                StructuralElement::paragraph("\n"),
            ];
        }
        let service = service(vec![StructuralElement::paragraph("x\n"), outer]);
        let nested_start = {
            let document = service.document("doc").unwrap();
            let outer = document.content[1].as_table().unwrap();
            outer.rows[0].cells[0].content[1].start_index
        };

        service
            .commit("doc", &[EditOperation::delete_table_row(nested_start, 1)])
            .await
            .unwrap();

        let document = service.document("doc").unwrap();
        let outer = document.content[1].as_table().unwrap();
        let nested = outer.rows[0].cells[0].content[1].as_table().unwrap();
        assert_eq!(nested.rows.len(), 2);
        assert!(find_first_marker_range(&document, "a\n").is_none());
        assert!(find_first_marker_range(&document, "b").is_some());
    }

    #[tokio::test]
    async fn test_row_delete_at_paragraph_start_is_rejected() {
        let service = service(vec![
            StructuralElement::paragraph("x\n"),
            StructuralElement::table(vec![vec!["h"]]),
        ]);
        let err = service
            .commit("doc", &[EditOperation::delete_table_row(0, 0)])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no table starts at 0"));
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_document_untouched() {
        let service = service(vec![StructuralElement::paragraph("<-a->\n")]);
        let before = service.document("doc").unwrap();
        let err = service
            .commit(
                "doc",
                &[
                    EditOperation::replace_all("<-a->", "A"),
                    EditOperation::delete_table_row(0, 0),
                ],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Status { status: 400, .. }));
        assert_eq!(service.document("doc").unwrap(), before);
        assert_eq!(service.attempts("doc").len(), 1);
        assert!(service.commits("doc").is_empty());
    }

    #[tokio::test]
    async fn test_rejection_predicate() {
        let service = MemoryDocuments::new().reject_if(|ops| {
            ops.iter()
                .any(|op| matches!(op, EditOperation::InsertInlineImage(_)))
        });
        service.insert(Document::new("doc", "t", vec![StructuralElement::paragraph("ab\n")]));

        let image = EditOperation::insert_image(0, "https://cdn.test/i.png", ObjectSize::square(16.0));
        assert!(service.commit("doc", &[image]).await.is_err());
        assert!(service
            .commit("doc", &[EditOperation::insert_text(0, "x")])
            .await
            .is_ok());
        assert_eq!(first_text(&service), "xab\n");
    }

    #[tokio::test]
    async fn test_copy_and_fetch_counts() {
        let service = service(vec![StructuralElement::paragraph("t\n")]);
        let copy = service.copy("doc", "Propuesta Acme").await.unwrap();
        assert_eq!(copy.document_id, "doc-copy-1");

        let fetched = service.get(&copy.document_id).await.unwrap();
        assert_eq!(fetched.title, "Propuesta Acme");
        assert_eq!(service.fetches(&copy.document_id), 1);
        assert_eq!(service.fetches("doc"), 0);

        let err = service.copy("missing", "x").await.unwrap_err();
        assert_eq!(err, ServiceError::NotFound("missing".to_string()));
    }
}
