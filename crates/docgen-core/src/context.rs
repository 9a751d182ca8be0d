//! Template context: the resolved marker → value mapping of one generation run.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ResolutionError;
use crate::marker::{sentinel, Marker, MATRIX_COLS, MATRIX_ROWS};

/// What a rich-link slot points at; selects the icon used for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RichKind {
    Calendar,
    Website,
    Email,
    Linkedin,
    Instagram,
    Facebook,
    Whatsapp,
}

impl RichKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RichKind::Calendar => "calendar",
            RichKind::Website => "website",
            RichKind::Email => "email",
            RichKind::Linkedin => "linkedin",
            RichKind::Instagram => "instagram",
            RichKind::Facebook => "facebook",
            RichKind::Whatsapp => "whatsapp",
        }
    }
}

impl fmt::Display for RichKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RichKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "calendar" => Ok(RichKind::Calendar),
            "website" => Ok(RichKind::Website),
            "email" => Ok(RichKind::Email),
            "linkedin" => Ok(RichKind::Linkedin),
            "instagram" => Ok(RichKind::Instagram),
            "facebook" => Ok(RichKind::Facebook),
            "whatsapp" => Ok(RichKind::Whatsapp),
            other => Err(format!("unknown rich link kind: {}", other)),
        }
    }
}

/// Destination of a rich slot and the text shown when no icon can be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichLink {
    pub url: String,
    pub label: String,
}

/// Rich-link slot as it arrives in a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichLinkSlot {
    /// Scalar marker name, without the `<-`/`->` delimiters.
    pub marker: String,
    pub kind: RichKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub label: String,
}

/// A deferred rich substitution: find `sentinel`, replace it with `link`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichSlot {
    pub sentinel: String,
    pub kind: RichKind,
    pub link: RichLink,
}

/// Resolved substitutions plus deferred rich slots. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateContext {
    substitutions: BTreeMap<String, String>,
    rich_slots: Vec<RichSlot>,
}

impl TemplateContext {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Marker token → value, in marker order.
    pub fn substitutions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.substitutions
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.substitutions.get(token).map(String::as_str)
    }

    pub fn rich_slots(&self) -> &[RichSlot] {
        &self.rich_slots
    }

    pub fn len(&self) -> usize {
        self.substitutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substitutions.is_empty()
    }
}

/// Accumulates substitutions; `build` checks that no two markers collide.
#[derive(Debug, Default)]
pub struct ContextBuilder {
    substitutions: BTreeMap<String, String>,
    rich_slots: Vec<RichSlot>,
    duplicate: Option<String>,
}

impl ContextBuilder {
    /// A marker set twice keeps its first value and fails `build`.
    pub fn set(&mut self, marker: Marker, value: impl Into<String>) -> &mut Self {
        match self.substitutions.entry(marker.token()) {
            Entry::Vacant(entry) => {
                entry.insert(value.into());
            }
            Entry::Occupied(entry) => {
                self.duplicate.get_or_insert_with(|| entry.key().clone());
            }
        }
        self
    }

    /// All 35 `<w{row}c{col}>` markers; cells without data resolve to "".
    pub fn contact_matrix(&mut self, rows: &[Vec<String>]) -> Result<&mut Self, ResolutionError> {
        if rows.len() > MATRIX_ROWS {
            return Err(ResolutionError::TooManyContactRows {
                count: rows.len(),
                max: MATRIX_ROWS,
            });
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() > MATRIX_COLS) {
            return Err(ResolutionError::TooManyContactFields {
                row: i + 1,
                count: row.len(),
                max: MATRIX_COLS,
            });
        }

        for row in 1..=MATRIX_ROWS {
            for col in 1..=MATRIX_COLS {
                let value = rows
                    .get(row - 1)
                    .and_then(|r| r.get(col - 1))
                    .map(|v| v.trim().to_string())
                    .unwrap_or_default();
                self.set(Marker::Matrix { row, col }, value);
            }
        }
        Ok(self)
    }

    /// A slot with a destination gets a sentinel and a deferred rich slot;
    /// a slot without one resolves its marker to "".
    pub fn rich_link(&mut self, slot: &RichLinkSlot) -> Result<&mut Self, ResolutionError> {
        if slot.marker.trim().is_empty() {
            return Err(ResolutionError::MissingField("links.marker"));
        }
        let marker = Marker::scalar(slot.marker.trim());
        let token = marker.token();
        if self.substitutions.contains_key(&token) {
            return Err(ResolutionError::MarkerCollision {
                first: token.clone(),
                second: token,
            });
        }

        let url = match slot.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url,
            _ => {
                self.set(marker, "");
                return Ok(self);
            }
        };
        validate_link(&marker, url)?;

        let sentinel = sentinel(self.rich_slots.len());
        let label = match slot.label.trim() {
            "" => url.to_string(),
            label => label.to_string(),
        };
        self.set(marker, sentinel.clone());
        self.rich_slots.push(RichSlot {
            sentinel,
            kind: slot.kind,
            link: RichLink {
                url: url.to_string(),
                label,
            },
        });
        Ok(self)
    }

    pub fn build(self) -> Result<TemplateContext, ResolutionError> {
        if let Some(token) = self.duplicate {
            return Err(ResolutionError::MarkerCollision {
                first: token.clone(),
                second: token,
            });
        }
        let lowered: Vec<(String, &String)> = self
            .substitutions
            .keys()
            .map(|k| (k.to_lowercase(), k))
            .collect();
        for (i, (a, first)) in lowered.iter().enumerate() {
            for (b, second) in lowered.iter().skip(i + 1) {
                if a.contains(b.as_str()) || b.contains(a.as_str()) {
                    return Err(ResolutionError::MarkerCollision {
                        first: (*first).clone(),
                        second: (*second).clone(),
                    });
                }
            }
        }

        Ok(TemplateContext {
            substitutions: self.substitutions,
            rich_slots: self.rich_slots,
        })
    }
}

fn validate_link(marker: &Marker, raw: &str) -> Result<(), ResolutionError> {
    let invalid = |reason: &str| ResolutionError::InvalidLink {
        marker: marker.token(),
        url: raw.to_string(),
        reason: reason.to_string(),
    };
    let parsed = url::Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" | "mailto" => Ok(()),
        other => Err(invalid(&format!("unsupported scheme {}", other))),
    }
}
