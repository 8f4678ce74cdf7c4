//! Request and response types for backend operations.

use std::time::Duration;

use search_connector_shared::Document;
use serde_json::Value;

/// Keep-alive window requested for every scroll call.
pub const DEFAULT_SCROLL_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// A single action of a bulk write request.
///
/// Operations are sent in the order they were built; the engine applies them in
/// that order, which matters when several operations target the same id.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    /// Index (create or replace) a prepared document.
    Index {
        /// The target index.
        index: String,
        /// The document id.
        id: String,
        /// The prepared document body.
        document: Document,
    },
    /// Delete a document.
    Delete {
        /// The target index.
        index: String,
        /// The document id.
        id: String,
    },
}

impl BulkOperation {
    /// Create an index operation.
    pub fn index(index: impl Into<String>, id: impl Into<String>, document: Document) -> Self {
        Self::Index {
            index: index.into(),
            id: id.into(),
            document,
        }
    }

    /// Create a delete operation.
    pub fn delete(index: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Delete {
            index: index.into(),
            id: id.into(),
        }
    }

    /// The index this operation targets.
    pub fn target_index(&self) -> &str {
        match self {
            Self::Index { index, .. } | Self::Delete { index, .. } => index,
        }
    }

    /// The document id this operation targets.
    pub fn id(&self) -> &str {
        match self {
            Self::Index { id, .. } | Self::Delete { id, .. } => id,
        }
    }
}

/// Result of a single operation within a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOperationResult {
    /// The index the operation targeted.
    pub index: String,
    /// The document id.
    pub id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error reason reported by the engine if the operation failed.
    pub error: Option<String>,
}

/// Summary of a bulk request containing aggregate statistics and individual results.
///
/// A bulk request can succeed as a whole while individual operations fail; the
/// summary lets callers handle those partial failures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkSummary {
    /// Total number of operations in the request.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results, in request order.
    pub results: Vec<BulkOperationResult>,
}

impl BulkSummary {
    /// Build a summary from individual results.
    pub fn from_results(results: Vec<BulkOperationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// Failed operations only.
    pub fn failures(&self) -> impl Iterator<Item = &BulkOperationResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

/// Opaque server-side scroll state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScrollCursor(String);

impl ScrollCursor {
    /// Wrap a scroll id returned by the engine.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw scroll id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A stored document returned by a scroll call.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollHit {
    /// The index the document was read from.
    pub index: String,
    /// The document id.
    pub id: String,
    /// The raw `_source`; not yet checked to be a document.
    pub source: Value,
}

/// One page of a scroll.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollPage {
    /// The cursor to continue with.
    pub cursor: ScrollCursor,
    /// The hits of this page; empty once the scroll is exhausted.
    pub hits: Vec<ScrollHit>,
}

impl ScrollPage {
    /// Whether the scroll is exhausted.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn result(id: &str, success: bool) -> BulkOperationResult {
        BulkOperationResult {
            index: "articles".to_string(),
            id: id.to_string(),
            success,
            error: (!success).then(|| "mapper_parsing_exception".to_string()),
        }
    }

    #[test]
    fn test_summary_from_results() {
        let summary = BulkSummary::from_results(vec![
            result("1", true),
            result("2", false),
            result("3", true),
        ]);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["2"]);
    }

    #[test]
    fn test_operation_accessors() {
        let index = BulkOperation::index("articles", "1", Map::new());
        let delete = BulkOperation::delete("articles_v2", "2");

        assert_eq!(index.target_index(), "articles");
        assert_eq!(index.id(), "1");
        assert_eq!(delete.target_index(), "articles_v2");
        assert_eq!(delete.id(), "2");
    }
}
