//! Templated document assembly engine.
//!
//! Turns a structured payload into a finished document by editing a copy of a
//! remote template through ordered batches of edit operations:
//! - `context`: payload → marker/value substitutions and rich-content sentinels
//! - `substitute`: global case-insensitive replace of every marker
//! - `trim`: deletes the unused pre-authored rows of templated tables
//! - `rich`: swaps sentinels for linked icons, or linked text as a fallback
//! - `engine`: runs the passes in order, re-fetching the document between commits
//!
//! The remote side is reached through the `DocumentService` and
//! `FileCopyService` traits.

mod context;
mod document;
mod engine;
mod error;
mod executor;
mod format;
mod kinds;
mod marker;
pub mod memory;
mod ops;
mod rich;
mod search;
mod substitute;
mod trim;

pub use context::{ContextBuilder, RichKind, RichLink, RichLinkSlot, RichSlot, TemplateContext};
pub use document::{
    Document, ElementKind, Paragraph, ParagraphElement, ParagraphElementKind, SchemaError,
    StructuralElement, Table, TableCell, TableRow, TextRange,
};
pub use engine::{Engine, GeneratedDocument, PassReport, RichOutcome};
pub use error::{EngineError, ResolutionError, ServiceError};
pub use executor::{BatchExecutor, CopiedDocument, DocumentService, FileCopyService, Pass};
pub use format::{CurrencyFormat, FormatPolicy};
pub use kinds::{
    ContactRow, DocumentKind, GenerationPlan, LineItem, ProposalPayload, ReportPayload, TableSpec,
};
pub use marker::{sentinel, ItemField, Marker, MATRIX_COLS, MATRIX_ROWS};
pub use ops::{EditOperation, Location, ObjectSize};
pub use rich::{fallback_batch, locate_sentinels, primary_batch, IconSet, IconSpec, LocatedSentinel};
pub use search::{cell_text, find_first_marker_range, find_table_following, flatten_paragraph_text};
pub use substitute::substitution_batch;
pub use trim::{anchor_row_index, row_deletions, trim_operations};
