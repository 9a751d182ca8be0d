//! Table trimming: drop the pre-authored rows the data does not fill.
//!
//! Row 0 is the header and is never deleted. Rows are addressed relative to
//! their table and shift down after each deletion, so one table's deletions
//! are emitted from the highest row index to the lowest.

use crate::document::{Document, Table};
use crate::kinds::TableSpec;
use crate::ops::EditOperation;
use crate::search::{cell_text, find_table_following};

const FIRST_DATA_ROW: usize = 1;

/// Index of the summary row: the bottom-most row whose text contains
/// `keyword` (case-insensitive), or the last row if none does.
pub fn anchor_row_index(table: &Table, keyword: &str) -> Option<usize> {
    let last = table.rows.len().checked_sub(1)?;
    let keyword = keyword.to_lowercase();
    let found = table.rows.iter().rposition(|row| {
        row.cells
            .iter()
            .any(|cell| cell_text(cell).to_lowercase().contains(&keyword))
    });
    Some(found.unwrap_or(last))
}

/// Deletions leaving exactly `data_rows` data rows between the header and
/// the summary row (or the end of the table). Never inserts rows.
pub fn row_deletions(
    table: &Table,
    anchor: u32,
    data_rows: usize,
    summary_keyword: Option<&str>,
) -> Vec<EditOperation> {
    let limit = match summary_keyword {
        Some(keyword) => anchor_row_index(table, keyword).and_then(|i| i.checked_sub(1)),
        None => table.rows.len().checked_sub(1),
    };
    let Some(limit) = limit else {
        return Vec::new();
    };

    let start_delete = FIRST_DATA_ROW + data_rows;
    if start_delete > limit {
        return Vec::new();
    }
    (start_delete..=limit)
        .rev()
        .map(|row| EditOperation::delete_table_row(anchor, row))
        .collect()
}

/// Batch for one templated table: its row deletions, then the clearing of its
/// leading marker. The marker precedes the table, so clearing it last keeps
/// the anchor offset valid for the deletions.
///
/// `None` if the marker or the table is missing; the table is then skipped.
pub fn trim_operations(document: &Document, spec: &TableSpec) -> Option<Vec<EditOperation>> {
    let (table, anchor) = find_table_following(document, &spec.leading_marker)?;
    let mut ops = row_deletions(
        table,
        anchor,
        spec.data_rows,
        spec.summary_keyword.as_deref(),
    );
    ops.push(EditOperation::replace_all(&spec.leading_marker, ""));
    Some(ops)
}
