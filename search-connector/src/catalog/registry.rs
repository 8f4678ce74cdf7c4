//! Registry of per-type catalogs.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use search_connector_repository::ConnectorError;
use search_connector_shared::{Document, SchemaNode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{
    DeclaredIndexDefiner, ParallelTypeCatalog, PipelineDefinitions, PrefixedIndexDefiner,
    TypeCatalog, TypeDeclaration,
};

/// The JSON catalog document: `{ "types": [TypeDeclaration, ...] }`.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    types: Vec<TypeDeclaration>,
}

/// Maps each type to the catalog that declares it and delegates every lookup.
///
/// Unknown types resolve to `None`. The registry exposes the parallel
/// capability when at least one registered catalog does; switching a type whose
/// catalog lacks it is a configuration error.
///
/// A registry loaded with [`from_json_file`](Self::from_json_file) writes the
/// new version of a switched type back to that file before the type resolves
/// to its new index, so later runs start from the switched index.
#[derive(Default)]
pub struct IndexDefinerRegistry {
    definitions: BTreeMap<String, Arc<dyn TypeCatalog>>,
    declared: BTreeMap<String, Arc<DeclaredIndexDefiner>>,
    source: Option<PathBuf>,
}

impl IndexDefinerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the catalog responsible for a type, replacing any previous one.
    pub fn add_definition(
        &mut self,
        type_name: impl Into<String>,
        catalog: Arc<dyn TypeCatalog>,
    ) {
        let type_name = type_name.into();
        debug!(type_name = %type_name, "Registered type catalog");
        self.declared.remove(&type_name);
        self.definitions.insert(type_name, catalog);
    }

    /// Build a registry with one [`DeclaredIndexDefiner`] per declaration,
    /// each wrapped in a [`PrefixedIndexDefiner`] when a prefix is given.
    pub fn from_declarations(declarations: Vec<TypeDeclaration>, prefix: Option<&str>) -> Self {
        let mut registry = Self::new();
        for declaration in declarations {
            let type_name = declaration.type_name.clone();
            let declared = Arc::new(DeclaredIndexDefiner::new(declaration));
            let catalog: Arc<dyn TypeCatalog> = match prefix {
                Some(prefix) => Arc::new(PrefixedIndexDefiner::new(prefix, declared.clone())),
                None => declared.clone(),
            };
            registry.add_definition(type_name.clone(), catalog);
            registry.declared.insert(type_name, declared);
        }
        registry
    }

    /// Parse a JSON catalog document.
    pub fn from_json_str(json: &str, prefix: Option<&str>) -> Result<Self, ConnectorError> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| ConnectorError::configuration(format!("Invalid catalog: {}", e)))?;
        Ok(Self::from_declarations(file.types, prefix))
    }

    /// Load a JSON catalog file. Switches of versioned types are recorded in
    /// the same file.
    ///
    /// # Returns
    ///
    /// * `Ok(IndexDefinerRegistry)` - One catalog per declared type
    /// * `Err(ConnectorError)` - If the file cannot be read or parsed
    pub fn from_json_file(
        path: impl AsRef<Path>,
        prefix: Option<&str>,
    ) -> Result<Self, ConnectorError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ConnectorError::configuration(format!(
                "Failed to read catalog {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut registry = Self::from_json_str(&json, prefix)?;
        registry.source = Some(path.to_path_buf());

        info!(
            path = %path.display(),
            types = registry.definitions.len(),
            "Loaded type catalog"
        );
        Ok(registry)
    }

    /// The registered type names.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    fn definition(&self, type_name: &str) -> Option<&Arc<dyn TypeCatalog>> {
        self.definitions.get(type_name)
    }
}

impl TypeCatalog for IndexDefinerRegistry {
    fn index_name(&self, type_name: &str) -> Option<String> {
        self.definition(type_name)?.index_name(type_name)
    }

    fn index_definition(&self, type_name: &str) -> Option<Value> {
        self.definition(type_name)?.index_definition(type_name)
    }

    fn pipeline_definitions(&self, type_name: &str) -> Option<PipelineDefinitions> {
        self.definition(type_name)?.pipeline_definitions(type_name)
    }

    fn default_pipeline_name(&self, type_name: &str) -> Option<String> {
        self.definition(type_name)?.default_pipeline_name(type_name)
    }

    fn schema(&self, type_name: &str) -> Option<SchemaNode> {
        self.definition(type_name)?.schema(type_name)
    }

    fn prepare(&self, type_name: &str, document: Document) -> Option<Document> {
        self.definition(type_name)?.prepare(type_name, document)
    }

    fn supported_indices(&self) -> BTreeMap<String, String> {
        self.definitions
            .iter()
            .filter_map(|(type_name, catalog)| {
                catalog
                    .index_name(type_name)
                    .map(|index| (type_name.clone(), index))
            })
            .collect()
    }

    fn as_parallel(&self) -> Option<&dyn ParallelTypeCatalog> {
        self.definitions
            .values()
            .any(|catalog| catalog.as_parallel().is_some())
            .then_some(self as &dyn ParallelTypeCatalog)
    }
}

#[async_trait]
impl ParallelTypeCatalog for IndexDefinerRegistry {
    fn parallel_index_name(&self, type_name: &str) -> Option<String> {
        self.definition(type_name)?
            .as_parallel()?
            .parallel_index_name(type_name)
    }

    async fn switch_to_parallel_index(&self, type_name: &str) -> Result<(), ConnectorError> {
        let catalog = self.definition(type_name).ok_or_else(|| {
            ConnectorError::configuration(format!("No catalog registered for type {}", type_name))
        })?;
        let parallel = catalog.as_parallel().ok_or_else(|| {
            ConnectorError::configuration(format!(
                "Catalog of type {} does not support parallel indices",
                type_name
            ))
        })?;

        let current = self
            .declared
            .get(type_name)
            .and_then(|declared| declared.version());
        if let (Some(path), Some(current)) = (&self.source, current) {
            record_version(path, type_name, current + 1).await?;
            info!(
                path = %path.display(),
                type_name = %type_name,
                version = current + 1,
                "Recorded index version in catalog"
            );
        }
        parallel.switch_to_parallel_index(type_name).await
    }
}

/// Set the `version` of `type_name` in the catalog file at `path`.
///
/// The file is rewritten through a sibling `.tmp` file and a rename.
async fn record_version(path: &Path, type_name: &str, version: u32) -> Result<(), ConnectorError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| record_error(path, e))?;
    let mut catalog: Value = serde_json::from_str(&json).map_err(|e| record_error(path, e))?;

    let declaration = catalog
        .get_mut("types")
        .and_then(Value::as_array_mut)
        .and_then(|types| {
            types
                .iter_mut()
                .find(|declared| declared.get("type").and_then(Value::as_str) == Some(type_name))
        })
        .and_then(Value::as_object_mut)
        .ok_or_else(|| record_error(path, format!("type {} is not declared", type_name)))?;
    declaration.insert("version".to_string(), Value::from(version));

    let contents = serde_json::to_string_pretty(&catalog).map_err(|e| record_error(path, e))?;
    let mut staged = path.as_os_str().to_owned();
    staged.push(".tmp");
    let staged = PathBuf::from(staged);

    tokio::fs::write(&staged, contents)
        .await
        .map_err(|e| record_error(path, e))?;
    tokio::fs::rename(&staged, path)
        .await
        .map_err(|e| record_error(path, e))
}

fn record_error(path: &Path, err: impl fmt::Display) -> ConnectorError {
    ConnectorError::configuration(format!(
        "Failed to record index version in catalog {}: {}",
        path.display(),
        err
    ))
}
