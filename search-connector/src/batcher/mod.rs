//! Bulk write batcher.
//!
//! Buffers index and delete operations and writes them with one bulk request
//! once the configured batch size is reached. The buffer is only cleared after
//! a successful bulk request.

use std::sync::Arc;

use futures::future::BoxFuture;
use search_connector_repository::{BulkOperation, BulkSummary, ConnectorError, WriteBackend};
use tracing::{debug, error, instrument, warn};

/// Configuration for the bulk batcher.
#[derive(Debug, Clone)]
pub struct BatcherConfig {
    /// Number of operations to buffer before flushing. Batching is only active
    /// above 1.
    pub batch_size: usize,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}

impl BatcherConfig {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size }
    }
}

/// Buffers bulk operations for one write backend.
///
/// The batcher must be finished with [`BulkBatcher::close`] (or used through
/// [`BulkBatcher::scoped`]) so the last partial batch is written. Dropping it
/// with pending operations loses them and logs an error.
pub struct BulkBatcher {
    backend: Arc<dyn WriteBackend>,
    config: BatcherConfig,
    buffer: Vec<BulkOperation>,
}

impl BulkBatcher {
    /// Create a new batcher with the default configuration.
    pub fn new(backend: Arc<dyn WriteBackend>) -> Self {
        Self::with_config(backend, BatcherConfig::default())
    }

    /// Create a new batcher with custom configuration.
    pub fn with_config(backend: Arc<dyn WriteBackend>, config: BatcherConfig) -> Self {
        let capacity = config.batch_size;
        Self {
            backend,
            config,
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Whether operations are buffered at all.
    pub fn is_batching(&self) -> bool {
        self.config.batch_size > 1
    }

    /// Number of pending operations.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Append an operation to the buffer. Never touches the network.
    pub fn enqueue(&mut self, operation: BulkOperation) {
        self.buffer.push(operation);
    }

    /// Flush if the buffer has reached the batch size.
    pub async fn maybe_flush(&mut self) -> Result<Option<BulkSummary>, ConnectorError> {
        self.flush(false).await
    }

    /// Write the buffer with one bulk request.
    ///
    /// Nothing happens when the buffer is empty, or when `force` is false and
    /// the buffer is smaller than the batch size.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(BulkSummary))` - The bulk request was sent and the buffer cleared
    /// * `Ok(None)` - Nothing was sent
    /// * `Err(ConnectorError)` - The request failed; the buffer is kept intact
    #[instrument(skip(self), fields(pending = self.buffer.len()))]
    pub async fn flush(&mut self, force: bool) -> Result<Option<BulkSummary>, ConnectorError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        if !force && self.buffer.len() < self.config.batch_size {
            return Ok(None);
        }

        let count = self.buffer.len();
        debug!(count = count, "Flushing bulk buffer");

        match self.backend.bulk(&self.buffer, true).await {
            Ok(summary) => {
                self.buffer.clear();
                Self::report(&summary);
                Ok(Some(summary))
            }
            Err(e) => {
                error!(error = %e, count = count, "Failed to flush bulk buffer");
                Err(e)
            }
        }
    }

    /// Flush the remaining operations and consume the batcher.
    pub async fn close(mut self) -> Result<Option<BulkSummary>, ConnectorError> {
        let result = self.flush(true).await;
        if result.is_err() {
            error!(
                lost = self.buffer.len(),
                "Discarding bulk operations after failed final flush"
            );
        }
        self.buffer.clear();
        result
    }

    /// Run `f` with the batcher and close it afterwards, whether `f` succeeded
    /// or not.
    ///
    /// When `f` fails its error is returned and a failing close is only logged.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let written = batcher
    ///     .scoped(|batcher| {
    ///         Box::pin(async move {
    ///             batcher.enqueue(BulkOperation::delete("articles", "1"));
    ///             batcher.maybe_flush().await?;
    ///             Ok(1)
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn scoped<T, F>(mut self, f: F) -> Result<T, ConnectorError>
    where
        F: for<'a> FnOnce(&'a mut BulkBatcher) -> BoxFuture<'a, Result<T, ConnectorError>>,
    {
        let outcome = f(&mut self).await;
        let closed = self.close().await;

        match (outcome, closed) {
            (Ok(value), Ok(_)) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(_)) => Err(e),
            (Err(e), Err(close_error)) => {
                error!(error = %close_error, "Failed to close bulk batcher after error");
                Err(e)
            }
        }
    }

    fn report(summary: &BulkSummary) {
        if summary.failed == 0 {
            debug!(count = summary.succeeded, "Bulk request succeeded");
            return;
        }

        warn!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Bulk request completed with some failures"
        );
        for result in summary.failures() {
            if let Some(ref err) = result.error {
                error!(
                    index = %result.index,
                    doc_id = %result.id,
                    error = %err,
                    "Failed to write document"
                );
            }
        }
    }
}

impl Drop for BulkBatcher {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            error!(
                lost = self.buffer.len(),
                "Bulk batcher dropped with pending operations"
            );
        }
    }
}
