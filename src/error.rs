//! Error types for frink-embeddings

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Reference not found: {0}")]
    ReferenceNotFound(String),

    #[error("At least one positive feature is required")]
    EmptyPositiveSet,

    #[error("include_graphs and exclude_graphs are mutually exclusive")]
    ConflictingGraphScope,

    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Unsupported feature type: {0}")]
    UnsupportedFeatureType(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn index(msg: impl Into<String>) -> Self {
        Error::Index(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Error::IndexUnavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Errors caused by the caller's input rather than by infrastructure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::ReferenceNotFound(_)
                | Error::EmptyPositiveSet
                | Error::ConflictingGraphScope
                | Error::UnsupportedFeatureType(_)
                | Error::InvalidQuery(_)
        )
    }

    /// Transport or connection failures reaching the index.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::IndexUnavailable(_))
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ReferenceNotFound(_) => "reference_not_found",
            Error::EmptyPositiveSet => "empty_positive_set",
            Error::ConflictingGraphScope => "conflicting_graph_scope",
            Error::IndexUnavailable(_) => "index_unavailable",
            Error::UnsupportedFeatureType(_) => "unsupported_feature_type",
            Error::InvalidQuery(_) => "invalid_query",
            Error::Index(_) => "index",
            Error::Embedding(_) => "embedding",
            Error::Serialization(_) => "serialization",
            Error::Io(_) => "io",
            Error::Internal(_) => "internal",
        }
    }
}
