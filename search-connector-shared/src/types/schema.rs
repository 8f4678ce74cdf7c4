//! Schema tree derived from an index definition.
//!
//! The tree is built once from the `mappings.properties` section of an index
//! definition and never changes afterwards.

use std::collections::BTreeMap;

use serde_json::Value;

/// Field types that hold nested documents.
const OBJECT_TYPES: [&str; 2] = ["object", "nested"];

/// A node of the schema tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    /// A field whose value is stored as is.
    Leaf,
    /// A field holding a nested document or a list of nested documents.
    ///
    /// `properties` is `None` when the field declares no nested properties; such
    /// values are never pruned.
    Object {
        properties: Option<BTreeMap<String, SchemaNode>>,
    },
}

impl SchemaNode {
    /// Build the root node from a full index definition.
    ///
    /// Returns `None` when the definition has no `mappings` or no
    /// `mappings.properties`; documents of such types are stored unchanged.
    ///
    /// # Example
    ///
    /// ```
    /// use search_connector_shared::SchemaNode;
    /// use serde_json::json;
    ///
    /// let schema = SchemaNode::from_index_definition(&json!({
    ///     "mappings": { "properties": { "title": { "type": "text" } } }
    /// }))
    /// .unwrap();
    /// assert!(schema.property("title").is_some());
    /// ```
    pub fn from_index_definition(definition: &Value) -> Option<Self> {
        let properties = definition.get("mappings")?.get("properties")?;
        Some(Self::Object {
            properties: Some(Self::build_properties(properties)),
        })
    }

    /// Build an object node from a `properties` mapping.
    pub fn from_properties(properties: &Value) -> Self {
        Self::Object {
            properties: Some(Self::build_properties(properties)),
        }
    }

    fn build_properties(properties: &Value) -> BTreeMap<String, SchemaNode> {
        properties
            .as_object()
            .map(|fields| {
                fields
                    .iter()
                    .map(|(name, field)| (name.clone(), Self::build_field(field)))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn build_field(field: &Value) -> Self {
        let is_object = field
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|field_type| OBJECT_TYPES.contains(&field_type));

        if !is_object {
            return Self::Leaf;
        }

        Self::Object {
            properties: field.get("properties").map(Self::build_properties),
        }
    }

    /// Look up a direct child of an object node.
    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        match self {
            Self::Object {
                properties: Some(properties),
            } => properties.get(name),
            _ => None,
        }
    }
}
