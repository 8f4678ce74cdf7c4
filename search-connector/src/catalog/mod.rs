//! Type catalogs.
//!
//! A catalog resolves an application type to the physical index it is stored
//! in, the index definition the index is created with, the ingest pipelines
//! that belong to it, and prepares documents of the type for writing.
//!
//! Catalogs that can rebuild a type's index under a second physical name expose
//! the [`ParallelTypeCatalog`] capability through [`TypeCatalog::as_parallel`].

mod declared;
mod prefixed;
mod registry;

use std::collections::BTreeMap;

use async_trait::async_trait;
use search_connector_repository::ConnectorError;
use search_connector_shared::{sanitize, Document, SchemaNode};
use serde_json::Value;

pub use declared::{DeclaredIndexDefiner, TypeDeclaration};
pub use prefixed::PrefixedIndexDefiner;
pub use registry::IndexDefinerRegistry;

/// Pipeline id to pipeline body. Bodies are passed to the engine verbatim.
pub type PipelineDefinitions = BTreeMap<String, Value>;

/// Resolves types to indices, definitions and pipelines.
///
/// Every lookup returns `None` when the catalog does not know the type.
pub trait TypeCatalog: Send + Sync {
    /// The canonical index name of a type.
    fn index_name(&self, type_name: &str) -> Option<String>;

    /// The full index definition (settings and mappings) of a type.
    fn index_definition(&self, type_name: &str) -> Option<Value>;

    /// The ingest pipelines of a type. An empty map means the type has none.
    fn pipeline_definitions(&self, type_name: &str) -> Option<PipelineDefinitions>;

    /// The pipeline applied to single document writes of a type.
    fn default_pipeline_name(&self, _type_name: &str) -> Option<String> {
        None
    }

    /// The schema tree documents of a type are sanitized against.
    ///
    /// `None` means the definition declares no properties and documents are
    /// stored unchanged.
    fn schema(&self, type_name: &str) -> Option<SchemaNode> {
        self.index_definition(type_name)
            .as_ref()
            .and_then(SchemaNode::from_index_definition)
    }

    /// Prepare a document of a type for writing.
    ///
    /// # Returns
    ///
    /// * `Some(Document)` - The document pruned to the fields the type declares
    /// * `None` - If the catalog cannot prepare documents of this type
    fn prepare(&self, type_name: &str, document: Document) -> Option<Document> {
        self.index_definition(type_name)?;
        Some(match self.schema(type_name) {
            Some(schema) => sanitize(&schema, document),
            None => document,
        })
    }

    /// Type name to canonical index name for every type the catalog knows.
    fn supported_indices(&self) -> BTreeMap<String, String>;

    /// Query the parallel index capability.
    fn as_parallel(&self) -> Option<&dyn ParallelTypeCatalog> {
        None
    }
}

/// A catalog that can build a type's index under a second physical name and
/// then switch the type over to it.
#[async_trait]
pub trait ParallelTypeCatalog: TypeCatalog {
    /// The physical name the type's index is rebuilt under.
    fn parallel_index_name(&self, type_name: &str) -> Option<String>;

    /// Make the parallel index the type's canonical index.
    ///
    /// After this returns `Ok`, [`TypeCatalog::index_name`] resolves to the
    /// former parallel name.
    async fn switch_to_parallel_index(&self, type_name: &str) -> Result<(), ConnectorError>;
}

/// Split a camelCase type name into its snake_case index name.
///
/// # Example
///
/// ```
/// use search_connector::catalog::snake_case;
///
/// assert_eq!(snake_case("blogPost"), "blog_post");
/// assert_eq!(snake_case("Article"), "article");
/// ```
pub fn snake_case(type_name: &str) -> String {
    let mut name = String::with_capacity(type_name.len() + 4);
    for (position, character) in type_name.chars().enumerate() {
        if character.is_uppercase() {
            if position > 0 {
                name.push('_');
            }
            name.extend(character.to_lowercase());
        } else {
            name.push(character);
        }
    }
    name
}
