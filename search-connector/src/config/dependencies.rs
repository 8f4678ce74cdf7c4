//! Dependency initialization and wiring for the maintenance binary.

use std::sync::Arc;
use std::time::Duration;

use search_connector_repository::{
    ConnectionFactory, ConnectorError, OpenSearchConfig, OpenSearchConnectionFactory,
};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{Action, ConnectionMode, ConnectorSettings};
use crate::catalog::{IndexDefinerRegistry, TypeCatalog};
use crate::connector::SearchConnector;
use crate::migration::MigrationConfig;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The connector the action runs against.
    pub connector: SearchConnector<OpenSearchConnectionFactory>,
    /// The action to run.
    pub action: Action,
}

impl Dependencies {
    /// Load the catalog, wait for the cluster and build the connector.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(ConnectorError)` - If the catalog is invalid, the action's type is
    ///   unknown, or the cluster is unreachable in fail-fast mode
    pub async fn new(settings: ConnectorSettings) -> Result<Self, ConnectorError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            catalog_path = %settings.catalog_path.display(),
            index_prefix = settings.index_prefix.as_deref().unwrap_or(""),
            connection_mode = ?settings.connection_mode,
            retry_interval_secs = settings.retry_interval.as_secs(),
            "Initializing dependencies"
        );

        let catalog = IndexDefinerRegistry::from_json_file(
            &settings.catalog_path,
            settings.index_prefix.as_deref(),
        )?;
        let type_name = settings.action.type_name();
        let probe_index = catalog.index_name(type_name).ok_or_else(|| {
            ConnectorError::configuration(format!("Type {} is not in the catalog", type_name))
        })?;

        let factory =
            OpenSearchConnectionFactory::new(OpenSearchConfig::new(&settings.opensearch_url));
        let connector = SearchConnector::new(factory, Arc::new(catalog)).with_migration_config(
            MigrationConfig {
                scroll_keep_alive: settings.scroll_keep_alive,
            },
        );

        wait_for_cluster(
            &connector,
            &probe_index,
            settings.connection_mode,
            settings.retry_interval,
        )
        .await?;

        info!("OpenSearch connection established");

        Ok(Self {
            connector,
            action: settings.action,
        })
    }
}

/// Wait until the cluster answers an index-exists probe, retrying according to
/// the connection mode.
///
/// The probe goes through the connector, so the connection it opens is the one
/// the connector keeps using. Errors that did not come from the cluster, such
/// as an invalid URL, are returned at once in either mode.
pub async fn wait_for_cluster<F: ConnectionFactory>(
    connector: &SearchConnector<F>,
    probe_index: &str,
    mode: ConnectionMode,
    retry_interval: Duration,
) -> Result<(), ConnectorError> {
    loop {
        match connector.index_exists(probe_index).await {
            Ok(exists) => {
                debug!(index = %probe_index, exists = exists, "Cluster probe succeeded");
                return Ok(());
            }
            Err(e) if !e.is_backend() => return Err(e),
            Err(e) => match mode {
                ConnectionMode::FailFast => {
                    return Err(ConnectorError::connection(format!(
                        "Failed to connect to OpenSearch: {}",
                        e
                    )));
                }
                ConnectionMode::Retry => {
                    warn!(
                        error = %e,
                        retry_interval_secs = retry_interval.as_secs(),
                        "Failed to connect to OpenSearch, retrying..."
                    );
                    sleep(retry_interval).await;
                }
            },
        }
    }
}
