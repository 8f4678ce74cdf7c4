//! Catalog decorator that prefixes index names.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use search_connector_repository::ConnectorError;
use search_connector_shared::{Document, SchemaNode};
use serde_json::Value;

use super::{ParallelTypeCatalog, PipelineDefinitions, TypeCatalog};

/// Wraps a catalog and prefixes every index name it resolves, so several
/// deployments can share one cluster.
///
/// Canonical, parallel and supported index names are all prefixed; definitions,
/// pipelines and document preparation are delegated unchanged.
pub struct PrefixedIndexDefiner {
    prefix: String,
    inner: Arc<dyn TypeCatalog>,
}

impl PrefixedIndexDefiner {
    pub fn new(prefix: impl Into<String>, inner: Arc<dyn TypeCatalog>) -> Self {
        Self {
            prefix: prefix.into(),
            inner,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn prefixed(&self, index: String) -> String {
        format!("{}{}", self.prefix, index)
    }
}

impl TypeCatalog for PrefixedIndexDefiner {
    fn index_name(&self, type_name: &str) -> Option<String> {
        self.inner
            .index_name(type_name)
            .map(|index| self.prefixed(index))
    }

    fn index_definition(&self, type_name: &str) -> Option<Value> {
        self.inner.index_definition(type_name)
    }

    fn pipeline_definitions(&self, type_name: &str) -> Option<PipelineDefinitions> {
        self.inner.pipeline_definitions(type_name)
    }

    fn default_pipeline_name(&self, type_name: &str) -> Option<String> {
        self.inner.default_pipeline_name(type_name)
    }

    fn schema(&self, type_name: &str) -> Option<SchemaNode> {
        self.inner.schema(type_name)
    }

    fn prepare(&self, type_name: &str, document: Document) -> Option<Document> {
        self.inner.prepare(type_name, document)
    }

    fn supported_indices(&self) -> BTreeMap<String, String> {
        self.inner
            .supported_indices()
            .into_iter()
            .map(|(type_name, index)| (type_name, self.prefixed(index)))
            .collect()
    }

    fn as_parallel(&self) -> Option<&dyn ParallelTypeCatalog> {
        self.inner
            .as_parallel()
            .map(|_| self as &dyn ParallelTypeCatalog)
    }
}

#[async_trait]
impl ParallelTypeCatalog for PrefixedIndexDefiner {
    fn parallel_index_name(&self, type_name: &str) -> Option<String> {
        self.inner
            .as_parallel()?
            .parallel_index_name(type_name)
            .map(|index| self.prefixed(index))
    }

    async fn switch_to_parallel_index(&self, type_name: &str) -> Result<(), ConnectorError> {
        match self.inner.as_parallel() {
            Some(parallel) => parallel.switch_to_parallel_index(type_name).await,
            None => Err(ConnectorError::configuration(format!(
                "Catalog of type {} does not support parallel indices",
                type_name
            ))),
        }
    }
}
