//! # Search Connector Repository
//!
//! This crate provides the capability traits the search connector uses to talk
//! to a search engine, the wire-level request and response types, and a
//! concrete implementation for OpenSearch.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;
pub mod utils;

pub use config::OpenSearchConfig;
pub use errors::ConnectorError;
pub use interfaces::{ConnectionFactory, IndexBackend, ScrollBackend, WriteBackend};
pub use opensearch::{OpenSearchBackend, OpenSearchConnectionFactory};
pub use types::{
    BulkOperation, BulkOperationResult, BulkSummary, ScrollCursor, ScrollHit, ScrollPage,
    DEFAULT_SCROLL_KEEP_ALIVE,
};
