//! Edit operations accepted by the remote commit step.
//!
//! Each variant serializes to one entry of a `batchUpdate` request list
//! (`{"replaceAllText": {...}}`, `{"deleteTableRow": {...}}`, ...).

use serde::Serialize;

use crate::document::TextRange;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EditOperation {
    ReplaceAllText(ReplaceAllText),
    DeleteContentRange(DeleteContentRange),
    InsertText(InsertText),
    InsertInlineImage(InsertInlineImage),
    UpdateTextStyle(UpdateTextStyle),
    DeleteTableRow(DeleteTableRow),
}

impl EditOperation {
    /// Case-insensitive global replace.
    pub fn replace_all(text: impl Into<String>, replacement: impl Into<String>) -> Self {
        EditOperation::ReplaceAllText(ReplaceAllText {
            contains_text: SubstringMatchCriteria {
                text: text.into(),
                match_case: false,
            },
            replace_text: replacement.into(),
        })
    }

    pub fn delete_range(range: TextRange) -> Self {
        EditOperation::DeleteContentRange(DeleteContentRange { range })
    }

    pub fn insert_text(index: u32, text: impl Into<String>) -> Self {
        EditOperation::InsertText(InsertText {
            location: Location { index },
            text: text.into(),
        })
    }

    pub fn insert_image(index: u32, uri: impl Into<String>, size: ObjectSize) -> Self {
        EditOperation::InsertInlineImage(InsertInlineImage {
            location: Location { index },
            uri: uri.into(),
            object_size: size,
        })
    }

    /// Attach a hyperlink to `range`, leaving other styling untouched.
    pub fn link(range: TextRange, url: impl Into<String>) -> Self {
        EditOperation::UpdateTextStyle(UpdateTextStyle {
            range,
            text_style: TextStyle {
                link: Link { url: url.into() },
            },
            fields: "link".to_string(),
        })
    }

    /// Delete row `row_index` of the table starting at `table_start`.
    pub fn delete_table_row(table_start: u32, row_index: usize) -> Self {
        EditOperation::DeleteTableRow(DeleteTableRow {
            table_cell_location: TableCellLocation {
                table_start_location: Location { index: table_start },
                row_index,
                column_index: 0,
            },
        })
    }

    /// Lowest document index this operation addresses, if it is positional.
    pub fn start_offset(&self) -> Option<u32> {
        match self {
            EditOperation::ReplaceAllText(_) => None,
            EditOperation::DeleteContentRange(op) => Some(op.range.start_index),
            EditOperation::InsertText(op) => Some(op.location.index),
            EditOperation::InsertInlineImage(op) => Some(op.location.index),
            EditOperation::UpdateTextStyle(op) => Some(op.range.start_index),
            EditOperation::DeleteTableRow(op) => {
                Some(op.table_cell_location.table_start_location.index)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EditOperation::ReplaceAllText(_) => "replaceAllText",
            EditOperation::DeleteContentRange(_) => "deleteContentRange",
            EditOperation::InsertText(_) => "insertText",
            EditOperation::InsertInlineImage(_) => "insertInlineImage",
            EditOperation::UpdateTextStyle(_) => "updateTextStyle",
            EditOperation::DeleteTableRow(_) => "deleteTableRow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceAllText {
    pub contains_text: SubstringMatchCriteria,
    pub replace_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstringMatchCriteria {
    pub text: String,
    pub match_case: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteContentRange {
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertText {
    pub location: Location,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertInlineImage {
    pub location: Location,
    pub uri: String,
    pub object_size: ObjectSize,
}

/// Size of an inserted image, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObjectSize {
    pub height: Dimension,
    pub width: Dimension,
}

impl ObjectSize {
    pub fn square(points: f64) -> Self {
        Self {
            height: Dimension::points(points),
            width: Dimension::points(points),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dimension {
    pub magnitude: f64,
    pub unit: &'static str,
}

impl Dimension {
    pub fn points(magnitude: f64) -> Self {
        Self {
            magnitude,
            unit: "PT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTextStyle {
    pub range: TextRange,
    pub text_style: TextStyle,
    pub fields: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextStyle {
    pub link: Link,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTableRow {
    pub table_cell_location: TableCellLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCellLocation {
    pub table_start_location: Location,
    pub row_index: usize,
    pub column_index: usize,
}
