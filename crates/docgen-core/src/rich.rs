//! Rich-content upgrade: replace sentinels with linked icons or linked text.

use std::collections::HashMap;
use std::str::FromStr;

use crate::context::{RichKind, RichSlot};
use crate::document::{utf16_len, Document, TextRange};
use crate::ops::{EditOperation, ObjectSize};
use crate::search::find_first_marker_range;

/// Side of the square icon inserted for a rich slot, in points.
pub const ICON_SIZE_PT: f64 = 16.0;

/// Icon image per rich-link kind. Resolved once at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IconSet {
    icons: HashMap<RichKind, String>,
}

impl IconSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: RichKind, uri: impl Into<String>) -> Self {
        self.icons.insert(kind, uri.into());
        self
    }

    pub fn get(&self, kind: RichKind) -> Option<&str> {
        self.icons.get(&kind).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}

impl FromIterator<IconSpec> for IconSet {
    fn from_iter<I: IntoIterator<Item = IconSpec>>(iter: I) -> Self {
        Self {
            icons: iter.into_iter().map(|s| (s.kind, s.uri)).collect(),
        }
    }
}

/// `kind=uri`, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconSpec {
    pub kind: RichKind,
    pub uri: String,
}

impl FromStr for IconSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, uri) = s
            .split_once('=')
            .ok_or_else(|| format!("expected kind=uri, got {}", s))?;
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(format!("missing icon uri for {}", kind));
        }
        Ok(Self {
            kind: kind.parse()?,
            uri: uri.to_string(),
        })
    }
}

/// A sentinel found in the current document revision.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedSentinel<'a> {
    pub slot: &'a RichSlot,
    pub range: TextRange,
}

/// Locate every slot's sentinel; slots the template lacks are skipped.
/// Sorted by descending start offset, the order edits must be emitted in.
pub fn locate_sentinels<'a>(document: &Document, slots: &'a [RichSlot]) -> Vec<LocatedSentinel<'a>> {
    let mut located: Vec<_> = slots
        .iter()
        .filter_map(|slot| {
            find_first_marker_range(document, &slot.sentinel)
                .map(|range| LocatedSentinel { slot, range })
        })
        .collect();
    located.sort_by(|a, b| b.range.start_index.cmp(&a.range.start_index));
    located
}

/// Icon + link for every located sentinel. Kinds without a configured icon
/// get linked label text so the batch stays complete.
pub fn primary_batch(located: &[LocatedSentinel<'_>], icons: &IconSet) -> Vec<EditOperation> {
    let mut ops = Vec::with_capacity(located.len() * 3);
    for sentinel in located {
        match icons.get(sentinel.slot.kind) {
            Some(uri) => {
                let start = sentinel.range.start_index;
                ops.push(EditOperation::delete_range(sentinel.range));
                ops.push(EditOperation::insert_image(
                    start,
                    uri,
                    ObjectSize::square(ICON_SIZE_PT),
                ));
                ops.push(EditOperation::link(
                    TextRange::new(start, start + 1),
                    &sentinel.slot.link.url,
                ));
            }
            None => push_linked_label(&mut ops, sentinel),
        }
    }
    ops
}

/// Linked label text for every located sentinel.
pub fn fallback_batch(located: &[LocatedSentinel<'_>]) -> Vec<EditOperation> {
    let mut ops = Vec::with_capacity(located.len() * 3);
    for sentinel in located {
        push_linked_label(&mut ops, sentinel);
    }
    ops
}

fn push_linked_label(ops: &mut Vec<EditOperation>, sentinel: &LocatedSentinel<'_>) {
    let start = sentinel.range.start_index;
    let label = &sentinel.slot.link.label;
    ops.push(EditOperation::delete_range(sentinel.range));
    ops.push(EditOperation::insert_text(start, label));
    ops.push(EditOperation::link(
        TextRange::new(start, start + utf16_len(label)),
        &sentinel.slot.link.url,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RichLink;
    use crate::document::StructuralElement;
    use crate::marker::sentinel;

    fn slot(i: usize, kind: RichKind, label: &str) -> RichSlot {
        RichSlot {
            sentinel: sentinel(i),
            kind,
            link: RichLink {
                url: format!("https://example.com/{}", i),
                label: label.to_string(),
            },
        }
    }

    fn document() -> Document {
        Document::new(
            "doc",
            "t",
            vec![
                StructuralElement::paragraph(format!("Web: {}\n", sentinel(1))),
                StructuralElement::paragraph(format!("Agenda: {}\n", sentinel(0))),
                StructuralElement::table(vec![vec![sentinel(2)]]),
            ],
        )
    }

    #[test]
    fn test_located_in_descending_order() {
        let slots = vec![
            slot(0, RichKind::Calendar, "Agendar"),
            slot(1, RichKind::Website, "Sitio"),
            slot(2, RichKind::Linkedin, "LinkedIn"),
            slot(3, RichKind::Email, "Correo"),
        ];
        let located = locate_sentinels(&document(), &slots);

        assert_eq!(located.len(), 3, "slot 3 is not in the template");
        let starts: Vec<u32> = located.iter().map(|l| l.range.start_index).collect();
        assert!(starts.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(located[0].slot.sentinel, sentinel(2));
        assert_eq!(located[2].slot.sentinel, sentinel(1));
    }

    #[test]
    fn test_primary_batch_shape() {
        let slots = vec![slot(0, RichKind::Calendar, "Agendar")];
        let located = locate_sentinels(&document(), &slots);
        let range = located[0].range;
        let icons = IconSet::new().with(RichKind::Calendar, "https://cdn.example.com/cal.png");

        let ops = primary_batch(&located, &icons);
        assert_eq!(
            ops,
            vec![
                EditOperation::delete_range(range),
                EditOperation::insert_image(
                    range.start_index,
                    "https://cdn.example.com/cal.png",
                    ObjectSize::square(ICON_SIZE_PT)
                ),
                EditOperation::link(
                    TextRange::new(range.start_index, range.start_index + 1),
                    "https://example.com/0"
                ),
            ]
        );
    }

    #[test]
    fn test_primary_without_icon_uses_label() {
        let slots = vec![slot(1, RichKind::Website, "Sitio")];
        let located = locate_sentinels(&document(), &slots);
        assert_eq!(
            primary_batch(&located, &IconSet::new()),
            fallback_batch(&located)
        );
    }

    #[test]
    fn test_fallback_links_label_span() {
        let slots = vec![slot(0, RichKind::Calendar, "Agendar reunión")];
        let located = locate_sentinels(&document(), &slots);
        let start = located[0].range.start_index;

        let ops = fallback_batch(&located);
        assert_eq!(ops[1], EditOperation::insert_text(start, "Agendar reunión"));
        assert_eq!(
            ops[2],
            EditOperation::link(TextRange::new(start, start + 15), "https://example.com/0")
        );
    }

    #[test]
    fn test_emitted_offsets_never_ascend_between_sentinels() {
        let slots = vec![
            slot(0, RichKind::Calendar, "a"),
            slot(1, RichKind::Website, "b"),
            slot(2, RichKind::Linkedin, "c"),
        ];
        let located = locate_sentinels(&document(), &slots);
        let deletes: Vec<u32> = fallback_batch(&located)
            .iter()
            .filter(|op| matches!(op, EditOperation::DeleteContentRange(_)))
            .filter_map(EditOperation::start_offset)
            .collect();
        assert_eq!(deletes.len(), 3);
        assert!(deletes.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_icon_spec_parsing() {
        let spec: IconSpec = "calendar=https://cdn.example.com/cal.png".parse().unwrap();
        assert_eq!(spec.kind, RichKind::Calendar);
        assert!("calendar".parse::<IconSpec>().is_err());
        assert!("calendar=".parse::<IconSpec>().is_err());
        assert!("fax=https://x".parse::<IconSpec>().is_err());

        let icons: IconSet = vec![spec].into_iter().collect();
        assert_eq!(icons.get(RichKind::Calendar), Some("https://cdn.example.com/cal.png"));
        assert_eq!(icons.get(RichKind::Website), None);
    }
}
