//! Write backend trait definition.

use async_trait::async_trait;
use search_connector_shared::Document;

use crate::errors::ConnectorError;
use crate::types::{BulkOperation, BulkSummary};

/// Writes documents to the search engine.
#[async_trait]
pub trait WriteBackend: Send + Sync {
    /// Index a single document, optionally through an ingest pipeline.
    ///
    /// A document with the same id is replaced.
    async fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Document,
        pipeline: Option<&str>,
    ) -> Result<(), ConnectorError>;

    /// Delete a single document.
    ///
    /// If the document doesn't exist, the operation is considered successful.
    async fn delete_document(&self, index: &str, id: &str) -> Result<(), ConnectorError>;

    /// Send all operations in one bulk request, in order.
    ///
    /// With `refresh` set, the affected shards are refreshed before the call
    /// returns so the writes are immediately visible to reads.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkSummary)` - Per-operation results; individual operations may have failed
    /// * `Err(ConnectorError)` - If the request failed as a whole
    async fn bulk(
        &self,
        operations: &[BulkOperation],
        refresh: bool,
    ) -> Result<BulkSummary, ConnectorError>;
}
