//! Scroll backend trait definition.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::ConnectorError;
use crate::types::{ScrollCursor, ScrollPage};

/// Cursor-based full scan over a point-in-time snapshot of an index.
///
/// A scan starts with [`open_scroll`](ScrollBackend::open_scroll), which returns
/// the first page, and continues with [`next_page`](ScrollBackend::next_page)
/// using the most recent cursor until a page comes back empty. Each call renews
/// the server-side context for `keep_alive`.
#[async_trait]
pub trait ScrollBackend: Send + Sync {
    /// Start a scroll over every document of `index` and return the first page.
    async fn open_scroll(
        &self,
        index: &str,
        keep_alive: Duration,
    ) -> Result<ScrollPage, ConnectorError>;

    /// Fetch the next page of an open scroll.
    async fn next_page(
        &self,
        cursor: &ScrollCursor,
        keep_alive: Duration,
    ) -> Result<ScrollPage, ConnectorError>;

    /// Release the server-side scroll context early.
    async fn clear_scroll(&self, cursor: &ScrollCursor) -> Result<(), ConnectorError>;
}
