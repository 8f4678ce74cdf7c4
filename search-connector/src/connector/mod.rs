//! The search connector.
//!
//! Entry point for applications: resolves types through a catalog, prepares
//! documents before they are written, buffers writes when batching is enabled
//! and manages index lifecycle and migration. The connection to the search
//! engine is created on first use and shared afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use search_connector_repository::{
    BulkOperation, ConnectionFactory, ConnectorError, IndexBackend, WriteBackend,
};
use search_connector_shared::Document;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::batcher::{BatcherConfig, BulkBatcher};
use crate::catalog::TypeCatalog;
use crate::lifecycle::IndexLifecycle;
use crate::migration::{MigrationConfig, MigrationReport, ParallelIndexMigrator};

/// Connector between application types and a search engine.
///
/// With a batch size above 1 writes are buffered and sent in bulk; the
/// connector must then be finished with [`SearchConnector::close`] so the last
/// partial batch is written.
///
/// # Example
///
/// ```ignore
/// use search_connector::{IndexDefinerRegistry, SearchConnector};
/// use search_connector_repository::OpenSearchConnectionFactory;
///
/// let catalog = IndexDefinerRegistry::from_json_file("catalog.json", None)?;
/// let mut connector = SearchConnector::new(
///     OpenSearchConnectionFactory::from_url("http://localhost:9200"),
///     Arc::new(catalog),
/// )
/// .with_batch_size(500);
///
/// connector.create_index("article", false).await?;
/// connector.store_document("article", "1", document).await?;
/// connector.close().await?;
/// ```
pub struct SearchConnector<F: ConnectionFactory> {
    factory: F,
    catalog: Arc<dyn TypeCatalog>,
    batch_size: usize,
    migration: MigrationConfig,
    connection: OnceCell<Arc<F::Client>>,
    batcher: Option<BulkBatcher>,
}

impl<F: ConnectionFactory> SearchConnector<F> {
    /// Create a connector that writes every document directly.
    pub fn new(factory: F, catalog: Arc<dyn TypeCatalog>) -> Self {
        Self {
            factory,
            catalog,
            batch_size: 0,
            migration: MigrationConfig::default(),
            connection: OnceCell::new(),
            batcher: None,
        }
    }

    /// Buffer writes and send them in bulk requests of `batch_size`.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_migration_config(mut self, config: MigrationConfig) -> Self {
        self.migration = config;
        self
    }

    pub fn catalog(&self) -> &Arc<dyn TypeCatalog> {
        &self.catalog
    }

    /// Whether writes are buffered.
    pub fn is_batching(&self) -> bool {
        self.batch_size > 1
    }

    /// Number of buffered operations not yet written.
    pub fn pending(&self) -> usize {
        self.batcher.as_ref().map_or(0, BulkBatcher::len)
    }

    /// The canonical index name of a type.
    pub fn index_name(&self, type_name: &str) -> Result<String, ConnectorError> {
        self.catalog.index_name(type_name).ok_or_else(|| {
            ConnectorError::configuration(format!("No index name for type {}", type_name))
        })
    }

    /// The type stored in `index`, if any.
    pub fn type_for_index(&self, index: &str) -> Option<String> {
        self.catalog
            .supported_indices()
            .into_iter()
            .find_map(|(type_name, name)| (name == index).then_some(type_name))
    }

    /// Type name to index name for every type the catalog knows.
    pub fn supported_indices(&self) -> BTreeMap<String, String> {
        self.catalog.supported_indices()
    }

    /// Whether `index` exists on the cluster. Opens the connection on first
    /// use, like every other operation.
    pub async fn index_exists(&self, index: &str) -> Result<bool, ConnectorError> {
        self.connection().await?.index_exists(index).await
    }

    /// Create the index of a type together with its pipelines.
    pub async fn create_index(
        &self,
        type_name: &str,
        overwrite: bool,
    ) -> Result<(), ConnectorError> {
        let index = self.index_name(type_name)?;
        self.lifecycle()
            .await?
            .create_index(&index, type_name, overwrite)
            .await
    }

    /// Drop the index of a type together with its pipelines.
    pub async fn drop_index(&self, type_name: &str) -> Result<(), ConnectorError> {
        let index = self.index_name(type_name)?;
        self.lifecycle().await?.drop_index(&index, type_name).await
    }

    /// Prepare and store a document.
    ///
    /// # Arguments
    ///
    /// * `type_name` - The type the document belongs to
    /// * `id` - The document id
    /// * `document` - The raw document; fields the type does not declare are removed
    pub async fn store_document(
        &mut self,
        type_name: &str,
        id: &str,
        document: Document,
    ) -> Result<(), ConnectorError> {
        let result = self.execute_store(type_name, id, document).await;
        if let Err(ref e) = result {
            error!(type_name = %type_name, doc_id = %id, error = %e, "Failed to store document");
        }
        result
    }

    /// Remove a document.
    pub async fn remove_document(
        &mut self,
        type_name: &str,
        id: &str,
    ) -> Result<(), ConnectorError> {
        let result = self.execute_remove(type_name, id).await;
        if let Err(ref e) = result {
            error!(type_name = %type_name, doc_id = %id, error = %e, "Failed to remove document");
        }
        result
    }

    /// Write every buffered operation.
    pub async fn flush(&mut self) -> Result<(), ConnectorError> {
        if let Some(batcher) = self.batcher.as_mut() {
            batcher.flush(true).await?;
        }
        Ok(())
    }

    /// Write every buffered operation and release the connector.
    pub async fn close(mut self) -> Result<(), ConnectorError> {
        match self.batcher.take() {
            Some(batcher) => batcher.close().await.map(|_| ()),
            None => Ok(()),
        }
    }

    /// Rebuild a type's index under its parallel name and switch the type to it.
    ///
    /// Buffered writes are flushed first so the backfill sees them.
    pub async fn migrate_to_parallel_index(
        &mut self,
        type_name: &str,
        remove_old_index: bool,
    ) -> Result<MigrationReport, ConnectorError> {
        if self.catalog.as_parallel().is_none() {
            return Err(ConnectorError::configuration(format!(
                "Catalog of type {} does not support parallel indices",
                type_name
            )));
        }
        self.flush().await?;

        let client = self.connection().await?;
        let migrator = ParallelIndexMigrator::with_config(
            self.catalog.clone(),
            client.clone(),
            client.clone(),
            client,
            self.migration.clone(),
        );
        migrator.migrate(type_name, remove_old_index).await
    }

    async fn execute_store(
        &mut self,
        type_name: &str,
        id: &str,
        document: Document,
    ) -> Result<(), ConnectorError> {
        let index = self.index_name(type_name)?;
        let document = self.catalog.prepare(type_name, document).ok_or_else(|| {
            ConnectorError::configuration(format!(
                "Preparing documents of type {} is not possible",
                type_name
            ))
        })?;

        if self.is_batching() {
            let batcher = self.batcher().await?;
            batcher.enqueue(BulkOperation::index(index, id, document));
            batcher.maybe_flush().await?;
            return Ok(());
        }

        let pipeline = self.catalog.default_pipeline_name(type_name);
        self.connection()
            .await?
            .index_document(&index, id, &document, pipeline.as_deref())
            .await?;
        debug!(index = %index, doc_id = %id, "Stored document");
        Ok(())
    }

    async fn execute_remove(&mut self, type_name: &str, id: &str) -> Result<(), ConnectorError> {
        let index = self.index_name(type_name)?;

        if self.is_batching() {
            let batcher = self.batcher().await?;
            batcher.enqueue(BulkOperation::delete(index, id));
            batcher.maybe_flush().await?;
            return Ok(());
        }

        self.connection().await?.delete_document(&index, id).await?;
        debug!(index = %index, doc_id = %id, "Removed document");
        Ok(())
    }

    async fn connection(&self) -> Result<Arc<F::Client>, ConnectorError> {
        let client = self
            .connection
            .get_or_try_init(|| async {
                let client = self.factory.create_connection().await?;
                info!("Connected to search engine");
                Ok::<_, ConnectorError>(Arc::new(client))
            })
            .await?;
        Ok(client.clone())
    }

    async fn lifecycle(&self) -> Result<IndexLifecycle, ConnectorError> {
        let client: Arc<dyn IndexBackend> = self.connection().await?;
        Ok(IndexLifecycle::new(client, self.catalog.clone()))
    }

    async fn batcher(&mut self) -> Result<&mut BulkBatcher, ConnectorError> {
        let batcher = match self.batcher.take() {
            Some(batcher) => batcher,
            None => {
                let writer: Arc<dyn WriteBackend> = self.connection().await?;
                BulkBatcher::with_config(writer, BatcherConfig::new(self.batch_size))
            }
        };
        Ok(self.batcher.insert(batcher))
    }
}
