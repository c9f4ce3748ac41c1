use thiserror::Error;

pub type DdocResult<T> = Result<T, DdocError>;

#[derive(Debug, Error)]
pub enum DdocError {
    #[error("document not found: {id} ({reason})")]
    NotFound { id: String, reason: String },
    #[error("document update conflict: {id}")]
    Conflict { id: String },
    #[error("invalid document: {0}")]
    Validation(String),
    #[error("malformed design document {id}: {source}")]
    Malformed {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("design document {id} has views of type {found}, expected an object")]
    InvalidViews { id: String, found: &'static str },
    #[error("client error: {0}")]
    Client(String),
}

impl DdocError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            id: id.into(),
            reason: "missing".to_string(),
        }
    }

    /// HTTP-style status marker, mirroring what document databases report.
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Validation(_) => 400,
            Self::Malformed { .. } | Self::InvalidViews { .. } | Self::Client(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
