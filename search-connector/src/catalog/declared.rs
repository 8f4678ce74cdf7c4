//! Catalog for a single declared type.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use search_connector_repository::ConnectorError;
use search_connector_shared::{sanitize, Document, SchemaNode};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{snake_case, ParallelTypeCatalog, PipelineDefinitions, TypeCatalog};

/// Declaration of one type, as written in a JSON catalog file.
///
/// ```json
/// {
///   "type": "blogPost",
///   "index": "posts",
///   "version": 0,
///   "definition": { "mappings": { "properties": { "title": { "type": "text" } } } },
///   "pipelines": { "posts-default": { "processors": [] } },
///   "default_pipeline": "posts-default"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TypeDeclaration {
    /// The application type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Base index name. Defaults to the snake_case form of the type name.
    #[serde(default)]
    pub index: Option<String>,
    /// Index definition the index is created with.
    pub definition: Value,
    #[serde(default)]
    pub pipelines: PipelineDefinitions,
    #[serde(default)]
    pub default_pipeline: Option<String>,
    /// Version of the physical index. Versioned types can be migrated.
    #[serde(default)]
    pub version: Option<u32>,
}

impl TypeDeclaration {
    /// Declare a type with an index definition and nothing else.
    pub fn new(type_name: impl Into<String>, definition: Value) -> Self {
        Self {
            type_name: type_name.into(),
            index: None,
            definition,
            pipelines: PipelineDefinitions::new(),
            default_pipeline: None,
            version: None,
        }
    }

    /// Use an explicit base index name.
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Add an ingest pipeline.
    pub fn with_pipeline(mut self, id: impl Into<String>, body: Value) -> Self {
        self.pipelines.insert(id.into(), body);
        self
    }

    /// Apply a pipeline to single document writes.
    pub fn with_default_pipeline(mut self, id: impl Into<String>) -> Self {
        self.default_pipeline = Some(id.into());
        self
    }

    /// Version the physical index, starting at `version`.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }
}

/// Catalog for one declared type.
///
/// The schema tree is built once from the declaration. A versioned type is
/// stored in `{base}_v{n}`, rebuilt in `{base}_v{n+1}`, and switching advances
/// `n`.
#[derive(Debug)]
pub struct DeclaredIndexDefiner {
    type_name: String,
    base_index: String,
    definition: Value,
    pipelines: PipelineDefinitions,
    default_pipeline: Option<String>,
    schema: Option<SchemaNode>,
    version: Option<AtomicU32>,
}

impl DeclaredIndexDefiner {
    pub fn new(declaration: TypeDeclaration) -> Self {
        let base_index = declaration
            .index
            .unwrap_or_else(|| snake_case(&declaration.type_name));
        let schema = SchemaNode::from_index_definition(&declaration.definition);

        Self {
            type_name: declaration.type_name,
            base_index,
            definition: declaration.definition,
            pipelines: declaration.pipelines,
            default_pipeline: declaration.default_pipeline,
            schema,
            version: declaration.version.map(AtomicU32::new),
        }
    }

    /// The type this catalog declares.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The current index version, if the type is versioned.
    pub fn version(&self) -> Option<u32> {
        self.version
            .as_ref()
            .map(|version| version.load(Ordering::SeqCst))
    }

    fn declares(&self, type_name: &str) -> bool {
        self.type_name == type_name
    }

    fn versioned_name(&self, version: u32) -> String {
        format!("{}_v{}", self.base_index, version)
    }
}

impl TypeCatalog for DeclaredIndexDefiner {
    fn index_name(&self, type_name: &str) -> Option<String> {
        if !self.declares(type_name) {
            return None;
        }
        Some(match self.version() {
            Some(version) => self.versioned_name(version),
            None => self.base_index.clone(),
        })
    }

    fn index_definition(&self, type_name: &str) -> Option<Value> {
        self.declares(type_name).then(|| self.definition.clone())
    }

    fn pipeline_definitions(&self, type_name: &str) -> Option<PipelineDefinitions> {
        self.declares(type_name).then(|| self.pipelines.clone())
    }

    fn default_pipeline_name(&self, type_name: &str) -> Option<String> {
        if !self.declares(type_name) {
            return None;
        }
        self.default_pipeline.clone()
    }

    fn schema(&self, type_name: &str) -> Option<SchemaNode> {
        if !self.declares(type_name) {
            return None;
        }
        self.schema.clone()
    }

    fn prepare(&self, type_name: &str, document: Document) -> Option<Document> {
        if !self.declares(type_name) {
            return None;
        }
        Some(match &self.schema {
            Some(schema) => sanitize(schema, document),
            None => document,
        })
    }

    fn supported_indices(&self) -> BTreeMap<String, String> {
        self.index_name(&self.type_name)
            .map(|index| BTreeMap::from([(self.type_name.clone(), index)]))
            .unwrap_or_default()
    }

    fn as_parallel(&self) -> Option<&dyn ParallelTypeCatalog> {
        self.version.as_ref().map(|_| self as &dyn ParallelTypeCatalog)
    }
}

#[async_trait]
impl ParallelTypeCatalog for DeclaredIndexDefiner {
    fn parallel_index_name(&self, type_name: &str) -> Option<String> {
        if !self.declares(type_name) {
            return None;
        }
        self.version()
            .map(|version| self.versioned_name(version + 1))
    }

    async fn switch_to_parallel_index(&self, type_name: &str) -> Result<(), ConnectorError> {
        if !self.declares(type_name) {
            return Err(ConnectorError::configuration(format!(
                "Type {} is not declared by this catalog",
                type_name
            )));
        }
        let version = self.version.as_ref().ok_or_else(|| {
            ConnectorError::configuration(format!("Type {} is not versioned", type_name))
        })?;

        let previous = version.fetch_add(1, Ordering::SeqCst);
        info!(
            type_name = %type_name,
            from = %self.versioned_name(previous),
            to = %self.versioned_name(previous + 1),
            "Switched type to parallel index"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition() -> Value {
        json!({ "mappings": { "properties": { "title": { "type": "text" } } } })
    }

    #[test]
    fn test_default_index_name_is_snake_case() {
        let definer = DeclaredIndexDefiner::new(TypeDeclaration::new("blogPost", definition()));

        assert_eq!(definer.index_name("blogPost").as_deref(), Some("blog_post"));
        assert_eq!(definer.index_name("comment"), None);
        assert!(definer.as_parallel().is_none());
    }

    #[test]
    fn test_explicit_index_and_pipelines() {
        let definer = DeclaredIndexDefiner::new(
            TypeDeclaration::new("article", definition())
                .with_index("articles")
                .with_pipeline("articles-default", json!({ "processors": [] }))
                .with_default_pipeline("articles-default"),
        );

        assert_eq!(definer.index_name("article").as_deref(), Some("articles"));
        assert_eq!(
            definer
                .pipeline_definitions("article")
                .unwrap()
                .keys()
                .collect::<Vec<_>>(),
            vec!["articles-default"]
        );
        assert_eq!(
            definer.default_pipeline_name("article").as_deref(),
            Some("articles-default")
        );
        assert!(definer.pipeline_definitions("comment").is_none());
        assert_eq!(
            definer.supported_indices(),
            BTreeMap::from([("article".to_string(), "articles".to_string())])
        );
    }

    #[tokio::test]
    async fn test_versioned_switch_advances_names() {
        let definer = DeclaredIndexDefiner::new(
            TypeDeclaration::new("article", definition())
                .with_index("articles")
                .with_version(3),
        );
        let parallel = definer.as_parallel().unwrap();

        assert_eq!(definer.index_name("article").as_deref(), Some("articles_v3"));
        assert_eq!(
            parallel.parallel_index_name("article").as_deref(),
            Some("articles_v4")
        );

        parallel.switch_to_parallel_index("article").await.unwrap();

        assert_eq!(definer.index_name("article").as_deref(), Some("articles_v4"));
        assert_eq!(
            parallel.parallel_index_name("article").as_deref(),
            Some("articles_v5")
        );
        assert_eq!(definer.version(), Some(4));
    }

    #[tokio::test]
    async fn test_switch_of_other_type_is_rejected() {
        let definer = DeclaredIndexDefiner::new(
            TypeDeclaration::new("article", definition()).with_version(0),
        );

        let result = definer.switch_to_parallel_index("comment").await;

        assert!(matches!(result, Err(ConnectorError::ConfigurationError(_))));
        assert_eq!(definer.version(), Some(0));
    }

    #[test]
    fn test_declaration_from_json() {
        let declaration: TypeDeclaration = serde_json::from_value(json!({
            "type": "article",
            "definition": definition(),
            "version": 1
        }))
        .unwrap();

        assert_eq!(declaration.type_name, "article");
        assert_eq!(declaration.index, None);
        assert!(declaration.pipelines.is_empty());
        assert_eq!(declaration.version, Some(1));
    }
}
