//! Configuration types for the OpenSearch backend.

/// Default number of hits fetched per scroll page.
pub const DEFAULT_SCROLL_PAGE_SIZE: usize = 500;

/// Configuration for the OpenSearch backend.
///
/// This struct controls how the backend connects to the cluster and how large
/// the pages of a full index scan are.
#[derive(Debug, Clone)]
pub struct OpenSearchConfig {
    /// The OpenSearch server URL (e.g., "http://localhost:9200").
    pub url: String,

    /// Number of hits requested per scroll page.
    ///
    /// Larger pages mean fewer round trips during a migration but bigger bulk
    /// requests. Defaults to 500.
    pub scroll_page_size: usize,
}

impl Default for OpenSearchConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            scroll_page_size: DEFAULT_SCROLL_PAGE_SIZE,
        }
    }
}

impl OpenSearchConfig {
    /// Create a config for the given URL with default scroll settings.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Set the number of hits requested per scroll page.
    ///
    /// A size of zero is raised to one.
    pub fn with_scroll_page_size(mut self, scroll_page_size: usize) -> Self {
        self.scroll_page_size = scroll_page_size.max(1);
        self
    }
}
