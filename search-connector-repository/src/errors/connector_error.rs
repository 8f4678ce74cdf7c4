//! Connector error types.
//!
//! This module defines the unified error type for all connector operations,
//! covering configuration problems, index lifecycle conflicts and failures
//! reported by the search engine backend.

use search_connector_shared::DocumentError;
use thiserror::Error;

/// Unified errors from connector operations.
///
/// Used by the backend capability traits, the catalogs, the batcher, the index
/// lifecycle and the migration orchestrator.
#[derive(Debug, Clone, Error)]
pub enum ConnectorError {
    /// No index, definition or pipeline mapping for a type, or the type cannot
    /// be prepared. Never retried.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The target index exists and overwriting was not requested.
    #[error("Index already exists: {0}")]
    AlreadyExists(String),

    /// Failed to establish a connection to the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to index a single document.
    #[error("Index error: {0}")]
    IndexError(String),

    /// A bulk request failed as a whole.
    #[error("Bulk index error: {0}")]
    BulkIndexError(String),

    /// Failed to delete a document or an index.
    #[error("Delete error: {0}")]
    DeleteError(String),

    /// Failed to check for, or create, an index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to put or delete an ingest pipeline.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// Failed to open or advance a scroll cursor.
    #[error("Scroll error: {0}")]
    ScrollError(String),

    /// Failed to parse a response from the search engine.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A stored document could not be mapped back into a document.
    #[error("Mapping error: {0}")]
    MappingError(String),
}

impl ConnectorError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Create an already-exists error for the given index.
    pub fn already_exists(index: impl Into<String>) -> Self {
        Self::AlreadyExists(index.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index error.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    /// Create a bulk index error.
    pub fn bulk_index(msg: impl Into<String>) -> Self {
        Self::BulkIndexError(msg.into())
    }

    /// Create a delete error.
    pub fn delete(msg: impl Into<String>) -> Self {
        Self::DeleteError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a pipeline error.
    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::PipelineError(msg.into())
    }

    /// Create a scroll error.
    pub fn scroll(msg: impl Into<String>) -> Self {
        Self::ScrollError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a mapping error.
    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::MappingError(msg.into())
    }

    /// Whether the error was reported by (or while talking to) the backend.
    pub fn is_backend(&self) -> bool {
        !matches!(
            self,
            Self::ConfigurationError(_) | Self::AlreadyExists(_) | Self::MappingError(_)
        )
    }
}

impl From<DocumentError> for ConnectorError {
    fn from(err: DocumentError) -> Self {
        Self::MappingError(err.to_string())
    }
}
