use crate::executor::Pass;

/// The payload cannot be turned into a template context.
///
/// Raised before any remote call, so nothing has been created or mutated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolutionError {
    #[error("Missing mandatory field: {0}")]
    MissingField(&'static str),

    #[error("Template id must not be empty")]
    EmptyTemplateId,

    #[error("Too many contact rows: {count} (max {max})")]
    TooManyContactRows { count: usize, max: usize },

    #[error("Contact row {row} has {count} fields (max {max})")]
    TooManyContactFields { row: usize, count: usize, max: usize },

    #[error("Invalid amount for {field}: {value}")]
    InvalidAmount { field: String, value: f64 },

    #[error("Invalid link for {marker}: {url} ({reason})")]
    InvalidLink {
        marker: String,
        url: String,
        reason: String,
    },

    #[error("Marker {first} collides with marker {second}")]
    MarkerCollision { first: String, second: String },

    #[error("Reporting period ends before it starts")]
    InvalidPeriod,
}

/// Failure reported by a remote collaborator (document, copy or token service).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Remote service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected response schema: {0}")]
    Schema(String),

    #[error("Authorization failed: {0}")]
    Auth(String),
}

/// Failure of a whole document-generation request.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid payload: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Copying template {template_id} failed: {source}")]
    Copy {
        template_id: String,
        #[source]
        source: ServiceError,
    },

    #[error("Fetching document {document_id} failed: {source}")]
    Fetch {
        document_id: String,
        #[source]
        source: ServiceError,
    },

    #[error("{pass} commit rejected for document {document_id}: {source}")]
    Commit {
        document_id: String,
        pass: Pass,
        #[source]
        source: ServiceError,
    },

    #[error(
        "Rich content rejected for document {document_id} (primary: {primary}; fallback: {fallback})"
    )]
    RichContent {
        document_id: String,
        primary: ServiceError,
        fallback: ServiceError,
    },
}

impl EngineError {
    /// Id of the copied document left behind in an incomplete state, if the
    /// failure happened after the template copy succeeded.
    pub fn document_id(&self) -> Option<&str> {
        match self {
            EngineError::Resolution(_) | EngineError::Copy { .. } => None,
            EngineError::Fetch { document_id, .. }
            | EngineError::Commit { document_id, .. }
            | EngineError::RichContent { document_id, .. } => Some(document_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_only_after_copy() {
        let err = EngineError::from(ResolutionError::MissingField("company"));
        assert_eq!(err.document_id(), None);

        let err = EngineError::Copy {
            template_id: "tpl".to_string(),
            source: ServiceError::NotFound("tpl".to_string()),
        };
        assert_eq!(err.document_id(), None);

        let err = EngineError::Commit {
            document_id: "doc-1".to_string(),
            pass: Pass::Substitution,
            source: ServiceError::Status {
                status: 400,
                body: "bad request".to_string(),
            },
        };
        assert_eq!(err.document_id(), Some("doc-1"));
        assert!(err.to_string().contains("substitution"));
    }
}
