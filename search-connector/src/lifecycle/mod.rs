//! Index lifecycle.
//!
//! Creates and drops a type's index together with its ingest pipelines.
//! Pipelines are always stored before the index is created so the index can
//! reference them.

use std::sync::Arc;

use search_connector_repository::{ConnectorError, IndexBackend};
use tracing::{debug, error, info, instrument};

use crate::catalog::{PipelineDefinitions, TypeCatalog};

/// Creates and drops indices and their pipelines.
pub struct IndexLifecycle {
    backend: Arc<dyn IndexBackend>,
    catalog: Arc<dyn TypeCatalog>,
}

impl IndexLifecycle {
    pub fn new(backend: Arc<dyn IndexBackend>, catalog: Arc<dyn TypeCatalog>) -> Self {
        Self { backend, catalog }
    }

    /// Create `index` for `type_name`.
    ///
    /// # Arguments
    ///
    /// * `index` - The physical index name
    /// * `type_name` - The type whose definition and pipelines are used
    /// * `overwrite` - Delete an existing index first instead of failing
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The pipelines were stored and the index created
    /// * `Err(ConnectorError::AlreadyExists)` - The index exists and `overwrite` is false
    /// * `Err(ConnectorError)` - Any other failure; earlier steps are not rolled back
    #[instrument(skip(self))]
    pub async fn create_index(
        &self,
        index: &str,
        type_name: &str,
        overwrite: bool,
    ) -> Result<(), ConnectorError> {
        let result = self.execute_create(index, type_name, overwrite).await;
        if let Err(ref e) = result {
            error!(index = %index, type_name = %type_name, error = %e, "Failed to create index");
        }
        result
    }

    /// Drop `index` and the pipelines of `type_name`. A missing index is not
    /// an error.
    #[instrument(skip(self))]
    pub async fn drop_index(&self, index: &str, type_name: &str) -> Result<(), ConnectorError> {
        let result = self.execute_drop(index, type_name).await;
        if let Err(ref e) = result {
            error!(index = %index, type_name = %type_name, error = %e, "Failed to drop index");
        }
        result
    }

    /// Delete `index` without touching any pipeline.
    pub async fn delete_index(&self, index: &str) -> Result<(), ConnectorError> {
        debug!(index = %index, "Deleting index");
        match self.backend.delete_index(index).await {
            Ok(()) => {
                info!(index = %index, "Deleted index");
                Ok(())
            }
            Err(e) => {
                error!(index = %index, error = %e, "Failed to delete index");
                Err(e)
            }
        }
    }

    async fn execute_create(
        &self,
        index: &str,
        type_name: &str,
        overwrite: bool,
    ) -> Result<(), ConnectorError> {
        if self.backend.index_exists(index).await? {
            info!(index = %index, "Index already exists");
            if !overwrite {
                return Err(ConnectorError::already_exists(index));
            }
            self.delete_index(index).await?;
        }

        for (id, body) in self.pipelines(type_name) {
            debug!(pipeline = %id, "Storing pipeline");
            self.backend.put_pipeline(&id, &body).await?;
            info!(pipeline = %id, "Stored pipeline");
        }

        let definition = self.catalog.index_definition(type_name).ok_or_else(|| {
            ConnectorError::configuration(format!(
                "No index definition for type {}",
                type_name
            ))
        })?;

        debug!(index = %index, "Creating index");
        self.backend.create_index(index, &definition).await?;
        info!(index = %index, type_name = %type_name, "Created index");
        Ok(())
    }

    async fn execute_drop(&self, index: &str, type_name: &str) -> Result<(), ConnectorError> {
        if !self.backend.index_exists(index).await? {
            info!(index = %index, "Index does not exist, nothing to drop");
            return Ok(());
        }

        for id in self.pipelines(type_name).into_keys() {
            debug!(pipeline = %id, "Deleting pipeline");
            self.backend.delete_pipeline(&id).await?;
            info!(pipeline = %id, "Deleted pipeline");
        }

        self.delete_index(index).await
    }

    fn pipelines(&self, type_name: &str) -> PipelineDefinitions {
        self.catalog
            .pipeline_definitions(type_name)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DeclaredIndexDefiner, TypeDeclaration};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    /// Mock index backend recording every call.
    #[derive(Default)]
    struct MockIndexBackend {
        indices: Mutex<BTreeSet<String>>,
        calls: Mutex<Vec<String>>,
        fail_pipeline: bool,
    }

    impl MockIndexBackend {
        fn with_index(index: &str) -> Self {
            let backend = Self::default();
            backend.indices.lock().unwrap().insert(index.to_string());
            backend
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IndexBackend for MockIndexBackend {
        async fn index_exists(&self, index: &str) -> Result<bool, ConnectorError> {
            self.record(format!("exists {}", index));
            Ok(self.indices.lock().unwrap().contains(index))
        }

        async fn create_index(&self, index: &str, _body: &Value) -> Result<(), ConnectorError> {
            self.record(format!("create {}", index));
            self.indices.lock().unwrap().insert(index.to_string());
            Ok(())
        }

        async fn delete_index(&self, index: &str) -> Result<(), ConnectorError> {
            self.record(format!("delete {}", index));
            self.indices.lock().unwrap().remove(index);
            Ok(())
        }

        async fn put_pipeline(&self, id: &str, _body: &Value) -> Result<(), ConnectorError> {
            self.record(format!("put_pipeline {}", id));
            if self.fail_pipeline {
                return Err(ConnectorError::pipeline("invalid processor"));
            }
            Ok(())
        }

        async fn delete_pipeline(&self, id: &str) -> Result<(), ConnectorError> {
            self.record(format!("delete_pipeline {}", id));
            Ok(())
        }
    }

    fn catalog() -> Arc<dyn TypeCatalog> {
        Arc::new(DeclaredIndexDefiner::new(
            TypeDeclaration::new("article", json!({ "mappings": { "properties": {} } }))
                .with_index("articles")
                .with_pipeline("articles-a", json!({ "processors": [] }))
                .with_pipeline("articles-b", json!({ "processors": [] })),
        ))
    }

    fn lifecycle(backend: &Arc<MockIndexBackend>) -> IndexLifecycle {
        IndexLifecycle::new(backend.clone(), catalog())
    }

    #[tokio::test]
    async fn test_create_stores_pipelines_before_index() {
        let backend = Arc::new(MockIndexBackend::default());

        lifecycle(&backend)
            .create_index("articles", "article", false)
            .await
            .unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                "exists articles",
                "put_pipeline articles-a",
                "put_pipeline articles-b",
                "create articles",
            ]
        );
    }

    #[tokio::test]
    async fn test_create_existing_without_overwrite_fails() {
        let backend = Arc::new(MockIndexBackend::with_index("articles"));

        let result = lifecycle(&backend)
            .create_index("articles", "article", false)
            .await;

        assert!(matches!(result, Err(ConnectorError::AlreadyExists(_))));
        assert_eq!(backend.calls(), vec!["exists articles"]);
    }

    #[tokio::test]
    async fn test_create_existing_with_overwrite_recreates() {
        let backend = Arc::new(MockIndexBackend::with_index("articles"));

        lifecycle(&backend)
            .create_index("articles", "article", true)
            .await
            .unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                "exists articles",
                "delete articles",
                "put_pipeline articles-a",
                "put_pipeline articles-b",
                "create articles",
            ]
        );
    }

    #[tokio::test]
    async fn test_create_stops_at_first_pipeline_failure() {
        let backend = Arc::new(MockIndexBackend {
            fail_pipeline: true,
            ..MockIndexBackend::default()
        });

        let result = lifecycle(&backend)
            .create_index("articles", "article", false)
            .await;

        assert!(matches!(result, Err(ConnectorError::PipelineError(_))));
        assert_eq!(
            backend.calls(),
            vec!["exists articles", "put_pipeline articles-a"]
        );
    }

    #[tokio::test]
    async fn test_create_unknown_type_is_a_configuration_error() {
        let backend = Arc::new(MockIndexBackend::default());

        let result = lifecycle(&backend)
            .create_index("comments", "comment", false)
            .await;

        assert!(matches!(result, Err(ConnectorError::ConfigurationError(_))));
        assert!(!backend.calls().iter().any(|call| call.starts_with("create")));
    }

    #[tokio::test]
    async fn test_drop_missing_index_is_a_no_op() {
        let backend = Arc::new(MockIndexBackend::default());

        lifecycle(&backend)
            .drop_index("articles", "article")
            .await
            .unwrap();

        assert_eq!(backend.calls(), vec!["exists articles"]);
    }

    #[tokio::test]
    async fn test_drop_deletes_pipelines_then_index() {
        let backend = Arc::new(MockIndexBackend::with_index("articles"));

        lifecycle(&backend)
            .drop_index("articles", "article")
            .await
            .unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                "exists articles",
                "delete_pipeline articles-a",
                "delete_pipeline articles-b",
                "delete articles",
            ]
        );
    }
}
