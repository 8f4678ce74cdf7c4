//! Connection factory for OpenSearch.

use async_trait::async_trait;

use crate::config::OpenSearchConfig;
use crate::errors::ConnectorError;
use crate::interfaces::ConnectionFactory;
use crate::opensearch::backend::OpenSearchBackend;

/// Builds [`OpenSearchBackend`] clients from a fixed configuration.
#[derive(Debug, Clone)]
pub struct OpenSearchConnectionFactory {
    config: OpenSearchConfig,
}

impl OpenSearchConnectionFactory {
    /// Create a factory for the given configuration.
    pub fn new(config: OpenSearchConfig) -> Self {
        Self { config }
    }

    /// Create a factory for the given URL with default settings.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self::new(OpenSearchConfig::new(url))
    }

    /// The configuration clients are built from.
    pub fn config(&self) -> &OpenSearchConfig {
        &self.config
    }
}

#[async_trait]
impl ConnectionFactory for OpenSearchConnectionFactory {
    type Client = OpenSearchBackend;

    async fn create_connection(&self) -> Result<Self::Client, ConnectorError> {
        OpenSearchBackend::new(self.config.clone()).await
    }
}
