//! Document types for the search index.
//!
//! A document is an untyped JSON object. It carries no schema of its own and is
//! only checked against a [`SchemaNode`](crate::SchemaNode) when it is sanitized.

use serde_json::{Map, Value};
use thiserror::Error;

/// A document as stored in (or read back from) the search engine.
///
/// Values are scalars (including arrays of scalars, which the engine treats as
/// multi-valued fields), nested documents, or ordered lists of nested documents.
pub type Document = Map<String, Value>;

/// Errors raised while mapping a raw engine `_source` into a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// The source is not a JSON object.
    #[error("Document source must be an object, got {0}")]
    NotAnObject(&'static str),

    /// A list declared as nested documents holds something else.
    #[error("Field '{0}' is a list of nested documents but holds {1}")]
    NonObjectElement(String, &'static str),
}

/// Map a raw `_source` value into a [`Document`].
///
/// Only the outer shape is checked here. Whether the fields fit an index is
/// decided by [`check_against`](crate::check_against) and
/// [`sanitize`](crate::sanitize).
///
/// # Example
///
/// ```
/// use search_connector_shared::document_from_source;
/// use serde_json::json;
///
/// let doc = document_from_source(json!({ "title": "Hello", "tags": ["a", "b"] })).unwrap();
/// assert_eq!(doc["title"], "Hello");
///
/// assert!(document_from_source(json!(["title", "Hello"])).is_err());
/// ```
pub fn document_from_source(source: Value) -> Result<Document, DocumentError> {
    match source {
        Value::Object(document) => Ok(document),
        other => Err(DocumentError::NotAnObject(kind_of(&other))),
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
