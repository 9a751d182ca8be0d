//! Typed view over the remote structural document.
//!
//! Every element occupies a half-open interval `[start_index, end_index)` of a
//! single index space counted in UTF-16 code units. The remote JSON is parsed
//! strictly: an element must carry exactly one content variant.

use serde::{Deserialize, Serialize};

/// Number of UTF-16 code units in `s`, the unit of the document index space.
pub(crate) fn utf16_len(s: &str) -> u32 {
    s.encode_utf16().count() as u32
}

/// Byte offset in `s` of the given UTF-16 offset, clamped to the end of `s`.
pub(crate) fn byte_offset(s: &str, utf16_offset: u32) -> usize {
    let mut units = 0u32;
    for (i, ch) in s.char_indices() {
        if units >= utf16_offset {
            return i;
        }
        units += ch.len_utf16() as u32;
    }
    s.len()
}

/// Location of a literal token inside the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRange {
    pub start_index: u32,
    pub end_index: u32,
}

impl TextRange {
    pub fn new(start_index: u32, end_index: u32) -> Self {
        Self {
            start_index,
            end_index,
        }
    }

    pub fn len(&self) -> u32 {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Schema mismatch in a remote document.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct SchemaError(String);

/// A fetched document. Indices are only valid until the next commit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawDocument")]
pub struct Document {
    pub document_id: String,
    pub title: String,
    pub content: Vec<StructuralElement>,
}

impl Document {
    /// Build a document from content and assign indices the way the remote
    /// service does: body starts at 0, tables open and close with one index,
    /// rows and cells open with one index.
    pub fn new(
        document_id: impl Into<String>,
        title: impl Into<String>,
        content: Vec<StructuralElement>,
    ) -> Self {
        let mut document = Self {
            document_id: document_id.into(),
            title: title.into(),
            content,
        };
        document.reindex();
        document
    }

    /// Recompute every index from content lengths.
    pub fn reindex(&mut self) {
        reindex_elements(&mut self.content, 0);
    }

    /// Index one past the last element.
    pub fn end_index(&self) -> u32 {
        self.content.last().map(|e| e.end_index).unwrap_or(0)
    }

    /// All tables in reading order, including tables nested in cells.
    pub fn tables(&self) -> Vec<(&Table, u32)> {
        let mut tables = Vec::new();
        collect_tables(&self.content, &mut tables);
        tables
    }
}

fn collect_tables<'a>(content: &'a [StructuralElement], out: &mut Vec<(&'a Table, u32)>) {
    for element in content {
        if let ElementKind::Table(table) = &element.kind {
            out.push((table, element.start_index));
            for row in &table.rows {
                for cell in &row.cells {
                    collect_tables(&cell.content, out);
                }
            }
        }
    }
}

fn reindex_elements(content: &mut [StructuralElement], mut index: u32) -> u32 {
    for element in content {
        let span = element.end_index.saturating_sub(element.start_index).max(1);
        element.start_index = index;
        match &mut element.kind {
            ElementKind::Paragraph(paragraph) => {
                for inline in &mut paragraph.elements {
                    let len = inline.index_len();
                    inline.start_index = index;
                    index += len;
                    inline.end_index = index;
                }
            }
            ElementKind::Table(table) => {
                index += 1;
                for row in &mut table.rows {
                    row.start_index = index;
                    index += 1;
                    for cell in &mut row.cells {
                        cell.start_index = index;
                        index += 1;
                        index = reindex_elements(&mut cell.content, index);
                        cell.end_index = index;
                    }
                    row.end_index = index;
                }
                index += 1;
            }
            ElementKind::Other => index += span,
        }
        element.end_index = index;
    }
    index
}

/// Top-level node of the content tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawElement")]
pub struct StructuralElement {
    pub start_index: u32,
    pub end_index: u32,
    pub kind: ElementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Paragraph(Paragraph),
    Table(Table),
    /// Section breaks and tables of contents: occupy index space, never searched.
    Other,
}

impl StructuralElement {
    /// Single-run paragraph. Indices are assigned by `Document::new`.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            start_index: 0,
            end_index: 0,
            kind: ElementKind::Paragraph(Paragraph {
                elements: vec![ParagraphElement::text(text)],
            }),
        }
    }

    /// Table whose cells each hold one paragraph with the given text.
    pub fn table<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| TableRow {
                start_index: 0,
                end_index: 0,
                cells: row
                    .into_iter()
                    .map(|text| {
                        let mut text: String = text.into();
                        text.push('\n');
                        TableCell {
                            start_index: 0,
                            end_index: 0,
                            content: vec![StructuralElement::paragraph(text)],
                        }
                    })
                    .collect(),
            })
            .collect();
        Self {
            start_index: 0,
            end_index: 0,
            kind: ElementKind::Table(Table { rows }),
        }
    }

    pub fn section_break() -> Self {
        Self {
            start_index: 0,
            end_index: 1,
            kind: ElementKind::Other,
        }
    }

    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match &self.kind {
            ElementKind::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match &self.kind {
            ElementKind::Table(t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub elements: Vec<ParagraphElement>,
}

impl Paragraph {
    pub fn text_runs(&self) -> impl Iterator<Item = (&ParagraphElement, &str)> {
        self.elements.iter().filter_map(|e| match &e.kind {
            ParagraphElementKind::TextRun { content, .. } => Some((e, content.as_str())),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawParagraphElement")]
pub struct ParagraphElement {
    pub start_index: u32,
    pub end_index: u32,
    pub kind: ParagraphElementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParagraphElementKind {
    TextRun {
        content: String,
        link: Option<String>,
    },
    InlineObject {
        uri: Option<String>,
        link: Option<String>,
    },
    /// Page breaks, auto text and other non-text runs.
    Other,
}

impl ParagraphElement {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            start_index: 0,
            end_index: 0,
            kind: ParagraphElementKind::TextRun {
                content: content.into(),
                link: None,
            },
        }
    }

    /// Width of this element in the index space.
    pub fn index_len(&self) -> u32 {
        match &self.kind {
            ParagraphElementKind::TextRun { content, .. } => utf16_len(content),
            ParagraphElementKind::InlineObject { .. } => 1,
            ParagraphElementKind::Other => {
                self.end_index.saturating_sub(self.start_index).max(1)
            }
        }
    }

    pub fn link(&self) -> Option<&str> {
        match &self.kind {
            ParagraphElementKind::TextRun { link, .. }
            | ParagraphElementKind::InlineObject { link, .. } => link.as_deref(),
            ParagraphElementKind::Other => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Table {
    #[serde(rename = "tableRows", default)]
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    #[serde(default)]
    pub start_index: u32,
    pub end_index: u32,
    #[serde(rename = "tableCells", default)]
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    #[serde(default)]
    pub start_index: u32,
    pub end_index: u32,
    #[serde(default)]
    pub content: Vec<StructuralElement>,
}

// ---------------------------------------------------------------------------
// Remote JSON schema
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    document_id: String,
    #[serde(default)]
    title: String,
    body: RawBody,
}

#[derive(Deserialize)]
struct RawBody {
    #[serde(default)]
    content: Vec<StructuralElement>,
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        Self {
            document_id: raw.document_id,
            title: raw.title,
            content: raw.body.content,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawElement {
    #[serde(default)]
    start_index: u32,
    end_index: u32,
    paragraph: Option<Paragraph>,
    table: Option<Table>,
    section_break: Option<serde_json::Value>,
    table_of_contents: Option<serde_json::Value>,
}

impl TryFrom<RawElement> for StructuralElement {
    type Error = SchemaError;

    fn try_from(raw: RawElement) -> Result<Self, Self::Error> {
        let populated = [
            raw.paragraph.is_some(),
            raw.table.is_some(),
            raw.section_break.is_some(),
            raw.table_of_contents.is_some(),
        ]
        .iter()
        .filter(|p| **p)
        .count();
        if populated != 1 {
            return Err(SchemaError(format!(
                "structural element at {}..{} carries {} content variants, expected exactly one",
                raw.start_index, raw.end_index, populated
            )));
        }

        let kind = match (raw.paragraph, raw.table) {
            (Some(paragraph), None) => ElementKind::Paragraph(paragraph),
            (None, Some(table)) => ElementKind::Table(table),
            _ => ElementKind::Other,
        };
        Ok(Self {
            start_index: raw.start_index,
            end_index: raw.end_index,
            kind,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParagraphElement {
    #[serde(default)]
    start_index: u32,
    end_index: u32,
    text_run: Option<RawTextRun>,
    inline_object_element: Option<RawInlineObject>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTextRun {
    content: String,
    #[serde(default)]
    text_style: RawTextStyle,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInlineObject {
    #[serde(default)]
    text_style: RawTextStyle,
}

#[derive(Default, Deserialize)]
struct RawTextStyle {
    link: Option<RawLink>,
}

#[derive(Deserialize)]
struct RawLink {
    url: Option<String>,
}

impl RawTextStyle {
    fn url(self) -> Option<String> {
        self.link.and_then(|l| l.url)
    }
}

impl TryFrom<RawParagraphElement> for ParagraphElement {
    type Error = SchemaError;

    fn try_from(raw: RawParagraphElement) -> Result<Self, Self::Error> {
        let kind = match (raw.text_run, raw.inline_object_element) {
            (Some(_), Some(_)) => {
                return Err(SchemaError(format!(
                    "paragraph element at {}..{} is both a text run and an inline object",
                    raw.start_index, raw.end_index
                )))
            }
            (Some(run), None) => ParagraphElementKind::TextRun {
                content: run.content,
                link: run.text_style.url(),
            },
            (None, Some(object)) => ParagraphElementKind::InlineObject {
                uri: None,
                link: object.text_style.url(),
            },
            (None, None) => ParagraphElementKind::Other,
        };
        Ok(Self {
            start_index: raw.start_index,
            end_index: raw.end_index,
            kind,
        })
    }
}
