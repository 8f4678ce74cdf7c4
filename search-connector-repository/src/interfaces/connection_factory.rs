//! Connection factory trait definition.

use async_trait::async_trait;

use crate::errors::ConnectorError;
use crate::interfaces::{IndexBackend, ScrollBackend, WriteBackend};

/// Creates the client used to talk to the search engine.
///
/// Consumers call [`create_connection`](ConnectionFactory::create_connection)
/// lazily, once, and share the resulting client for their whole lifetime.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// The client type, providing every backend capability.
    type Client: IndexBackend + WriteBackend + ScrollBackend + 'static;

    /// Build a new client.
    async fn create_connection(&self) -> Result<Self::Client, ConnectorError>;
}
