//! Marker and table lookup over a fetched document.

use crate::document::{
    utf16_len, Document, ElementKind, Paragraph, StructuralElement, Table, TableCell, TextRange,
};

/// Concatenate the text runs of a paragraph, in order.
pub fn flatten_paragraph_text(paragraph: &Paragraph) -> String {
    paragraph.text_runs().map(|(_, text)| text).collect()
}

/// Range of the first literal occurrence of `token`, scanning top to bottom
/// and descending into table cells in reading order.
///
/// `None` means the template has no slot for this token.
pub fn find_first_marker_range(document: &Document, token: &str) -> Option<TextRange> {
    if token.is_empty() {
        return None;
    }
    find_in_elements(&document.content, token)
}

fn find_in_elements(content: &[StructuralElement], token: &str) -> Option<TextRange> {
    content.iter().find_map(|element| match &element.kind {
        ElementKind::Paragraph(paragraph) => find_in_paragraph(paragraph, token),
        ElementKind::Table(table) => table
            .rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .find_map(|cell| find_in_elements(&cell.content, token)),
        ElementKind::Other => None,
    })
}

/// Map a match in the flattened paragraph text back to document indices via
/// the run that contains the match start. Runs carry their own start index,
/// so non-text elements between runs are accounted for.
fn find_in_paragraph(paragraph: &Paragraph, token: &str) -> Option<TextRange> {
    let flat = flatten_paragraph_text(paragraph);
    let byte_pos = flat.find(token)?;

    let mut run_start = 0usize;
    for (element, text) in paragraph.text_runs() {
        let run_end = run_start + text.len();
        if byte_pos < run_end {
            let within = utf16_len(&text[..byte_pos - run_start]);
            let start_index = element.start_index + within;
            return Some(TextRange::new(start_index, start_index + utf16_len(token)));
        }
        run_start = run_end;
    }
    None
}

/// Plain text of any element: paragraphs flattened, tables cell by cell.
fn element_text(element: &StructuralElement) -> String {
    match &element.kind {
        ElementKind::Paragraph(paragraph) => flatten_paragraph_text(paragraph),
        ElementKind::Table(table) => table
            .rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .map(cell_text)
            .collect(),
        ElementKind::Other => String::new(),
    }
}

/// First table after the top-level element containing `marker`, with the
/// table's own start index (the anchor for row deletions).
///
/// `None` if the marker is missing or nothing but text follows it.
pub fn find_table_following<'a>(document: &'a Document, marker: &str) -> Option<(&'a Table, u32)> {
    let position = document
        .content
        .iter()
        .position(|element| element_text(element).contains(marker))?;

    document.content[position + 1..]
        .iter()
        .find_map(|element| element.as_table().map(|t| (t, element.start_index)))
}

/// All text nested in a cell, including nested tables.
pub fn cell_text(cell: &TableCell) -> String {
    cell.content.iter().map(element_text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ParagraphElement, ParagraphElementKind};

    fn doc(content: Vec<StructuralElement>) -> Document {
        Document::new("doc", "test", content)
    }

    #[test]
    fn test_find_marker_in_paragraph() {
        let document = doc(vec![
            StructuralElement::section_break(),
            StructuralElement::paragraph("Estimado <-empresa->:\n"),
        ]);
        // paragraph starts at 1, "Estimado " is 9 units
        let range = find_first_marker_range(&document, "<-empresa->").unwrap();
        assert_eq!(range, TextRange::new(10, 21));
        assert_eq!(range.len(), 11);
    }

    #[test]
    fn test_missing_marker_is_none() {
        let document = doc(vec![StructuralElement::paragraph("nada\n")]);
        assert_eq!(find_first_marker_range(&document, "<-empresa->"), None);
        assert_eq!(find_first_marker_range(&document, ""), None);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let document = doc(vec![
            StructuralElement::paragraph("a X\n"),
            StructuralElement::paragraph("X\n"),
        ]);
        assert_eq!(
            find_first_marker_range(&document, "X"),
            Some(TextRange::new(2, 3))
        );
    }

    #[test]
    fn test_marker_split_across_runs() {
        let mut paragraph = StructuralElement::paragraph("ab<-em");
        if let ElementKind::Paragraph(p) = &mut paragraph.kind {
            p.elements.push(ParagraphElement::text("presa->\n"));
        }
        let document = doc(vec![paragraph]);
        assert_eq!(
            find_first_marker_range(&document, "<-empresa->"),
            Some(TextRange::new(2, 13))
        );
    }

    #[test]
    fn test_offsets_skip_inline_objects() {
        let mut paragraph = StructuralElement::paragraph("x");
        if let ElementKind::Paragraph(p) = &mut paragraph.kind {
            p.elements.push(ParagraphElement {
                start_index: 0,
                end_index: 0,
                kind: ParagraphElementKind::InlineObject {
                    uri: None,
                    link: None,
                },
            });
            p.elements.push(ParagraphElement::text("ñ<-fecha->\n"));
        }
        let document = doc(vec![paragraph]);
        // "x" at 0, image at 1, "ñ" at 2, marker at 3
        assert_eq!(
            find_first_marker_range(&document, "<-fecha->"),
            Some(TextRange::new(3, 12))
        );
    }

    #[test]
    fn test_find_marker_inside_table_cell() {
        let document = doc(vec![
            StructuralElement::paragraph("intro\n"),
            StructuralElement::table(vec![vec!["a", "%%docgen-link-0%%"]]),
        ]);
        let range = find_first_marker_range(&document, "%%docgen-link-0%%").unwrap();
        let cell = &document.content[1].as_table().unwrap().rows[0].cells[1];
        assert_eq!(range.start_index, cell.content[0].start_index);
    }

    #[test]
    fn test_table_following_marker() {
        let document = doc(vec![
            StructuralElement::table(vec![vec!["other"]]),
            StructuralElement::paragraph("<-tabla-items->\n"),
            StructuralElement::paragraph("Detalle\n"),
            StructuralElement::table(vec![vec!["Item"], vec!["<item1>"]]),
        ]);
        let (table, anchor) = find_table_following(&document, "<-tabla-items->").unwrap();
        assert_eq!(anchor, document.content[3].start_index);
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_table_following_missing() {
        let document = doc(vec![
            StructuralElement::table(vec![vec!["x"]]),
            StructuralElement::paragraph("<-tabla-items->\n"),
        ]);
        assert!(find_table_following(&document, "<-tabla-items->").is_none());
        assert!(find_table_following(&document, "<-tabla-contactos->").is_none());
    }

    #[test]
    fn test_cell_text() {
        let document = doc(vec![StructuralElement::table(vec![vec!["TOTAL", "$1"]])]);
        let row = &document.content[0].as_table().unwrap().rows[0];
        assert_eq!(cell_text(&row.cells[0]), "TOTAL\n");
    }
}
