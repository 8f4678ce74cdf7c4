//! Index backend trait definition.
//!
//! This module defines the index and ingest-pipeline management operations of
//! the search engine.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ConnectorError;

/// Manages indices and ingest pipelines.
///
/// Every call is a single request/response round trip; none of them roll back
/// on failure.
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Check whether an index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, ConnectorError>;

    /// Create an index from a full definition (settings and mappings).
    async fn create_index(&self, index: &str, body: &Value) -> Result<(), ConnectorError>;

    /// Delete an index.
    async fn delete_index(&self, index: &str) -> Result<(), ConnectorError>;

    /// Create or replace an ingest pipeline. The body is passed through verbatim.
    async fn put_pipeline(&self, id: &str, body: &Value) -> Result<(), ConnectorError>;

    /// Delete an ingest pipeline.
    async fn delete_pipeline(&self, id: &str) -> Result<(), ConnectorError>;
}
