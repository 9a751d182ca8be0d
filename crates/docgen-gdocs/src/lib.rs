//! Google Workspace backend for docgen.
//!
//! Documents are read and edited through the Docs API v1, templates are
//! duplicated through the Drive API v3. Both clients are stateless; the bearer
//! token comes from a `TokenProvider` on every call.

mod docs;
mod drive;
mod http;
mod service;
mod token_manager;

pub use docs::{GoogleDocsClient, DOCS_API_BASE};
pub use drive::{document_url, DriveClient, DRIVE_API_BASE};
pub use service::GoogleWorkspace;
pub use token_manager::{RefreshingTokenProvider, StaticToken, TokenProvider, GOOGLE_TOKEN_URL};
