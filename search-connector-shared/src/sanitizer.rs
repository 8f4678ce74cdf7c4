//! Document sanitizer.
//!
//! Prunes a document against a [`SchemaNode`] tree before it is written, so the
//! search engine never receives fields the index does not declare. Values are
//! never rewritten; only unknown keys and non-conforming nested structures are
//! removed.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::types::document::kind_of;
use crate::types::{Document, DocumentError, SchemaNode};

/// Remove every key of `document` that `schema` does not declare, at any depth.
///
/// For fields declared as objects:
///
/// - a value that is neither a container nor `null` is dropped;
/// - `null`, an empty container, or a value whose field declares no nested
///   properties is kept as is;
/// - an array, or an object whose keys are exactly `"0".."n-1"`, is treated as a
///   list of nested documents and each element is sanitized (elements that are
///   not objects are dropped); any other object is sanitized as a single nested
///   document.
///
/// A schema that is not an object node leaves the document unchanged.
///
/// # Example
///
/// ```
/// use search_connector_shared::{document_from_source, sanitize, SchemaNode};
/// use serde_json::json;
///
/// let schema = SchemaNode::from_properties(&json!({
///     "title": { "type": "text" },
///     "author": { "type": "object", "properties": { "name": { "type": "keyword" } } }
/// }));
/// let doc = document_from_source(json!({
///     "title": "Hello",
///     "legacy_flag": true,
///     "author": { "name": "Ada", "email": "ada@example.com" }
/// }))
/// .unwrap();
///
/// let clean = sanitize(&schema, doc);
/// assert_eq!(serde_json::Value::Object(clean), json!({
///     "title": "Hello",
///     "author": { "name": "Ada" }
/// }));
/// ```
pub fn sanitize(schema: &SchemaNode, document: Document) -> Document {
    match schema {
        SchemaNode::Object {
            properties: Some(properties),
        } => sanitize_object(properties, document),
        _ => document,
    }
}

/// Check that every list `schema` declares as nested documents holds only
/// objects.
///
/// Fields the schema does not declare are not looked at; [`sanitize`] removes
/// them. A scalar where an object is expected is not an error either; the
/// sanitizer drops it. Only a declared list of nested documents with something
/// else in it fails, at any declared depth.
///
/// ```
/// use search_connector_shared::{check_against, document_from_source, SchemaNode};
/// use serde_json::json;
///
/// let schema = SchemaNode::from_properties(&json!({
///     "comments": { "type": "nested", "properties": { "body": { "type": "text" } } }
/// }));
///
/// let legacy = document_from_source(json!({ "legacy": [{ "a": 1 }, 2] })).unwrap();
/// assert!(check_against(&schema, &legacy).is_ok());
///
/// let stray = document_from_source(json!({ "comments": [{ "body": "ok" }, "stray"] })).unwrap();
/// assert!(check_against(&schema, &stray).is_err());
/// ```
pub fn check_against(schema: &SchemaNode, document: &Document) -> Result<(), DocumentError> {
    check_object(schema, document, "")
}

fn check_object(node: &SchemaNode, document: &Document, path: &str) -> Result<(), DocumentError> {
    for (key, value) in document {
        let nested = match node.property(key) {
            Some(
                nested @ SchemaNode::Object {
                    properties: Some(_),
                },
            ) => nested,
            _ => continue,
        };
        let field_path = if path.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", path, key)
        };

        match value {
            Value::Array(items) => check_list(nested, items.iter(), &field_path)?,
            Value::Object(object) => match list_order(object) {
                Some(order) => {
                    check_list(nested, order.iter().filter_map(|k| object.get(k)), &field_path)?
                }
                None => check_object(nested, object, &field_path)?,
            },
            _ => {}
        }
    }
    Ok(())
}

fn check_list<'a>(
    node: &SchemaNode,
    items: impl Iterator<Item = &'a Value>,
    path: &str,
) -> Result<(), DocumentError> {
    for item in items {
        match item {
            Value::Object(object) => check_object(node, object, path)?,
            other => {
                return Err(DocumentError::NonObjectElement(
                    path.to_string(),
                    kind_of(other),
                ))
            }
        }
    }
    Ok(())
}

fn sanitize_object(properties: &BTreeMap<String, SchemaNode>, document: Document) -> Document {
    document
        .into_iter()
        .filter_map(|(key, value)| {
            let node = properties.get(&key)?;
            sanitize_field(node, value).map(|value| (key, value))
        })
        .collect()
}

/// Returns `None` when the field must be dropped.
fn sanitize_field(node: &SchemaNode, value: Value) -> Option<Value> {
    let SchemaNode::Object { properties } = node else {
        return Some(value);
    };

    let is_empty = match &value {
        Value::Null => true,
        Value::Object(object) => object.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => return None,
    };

    let Some(properties) = properties else {
        return Some(value);
    };
    if is_empty {
        return Some(value);
    }

    match value {
        Value::Array(items) => Some(sanitize_list(properties, items)),
        Value::Object(object) => match list_order(&object) {
            Some(order) => Some(sanitize_list(properties, in_list_order(object, order))),
            None => Some(Value::Object(sanitize_object(properties, object))),
        },
        _ => None,
    }
}

fn sanitize_list(
    properties: &BTreeMap<String, SchemaNode>,
    items: impl IntoIterator<Item = Value>,
) -> Value {
    Value::Array(
        items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(object) => Some(Value::Object(sanitize_object(properties, object))),
                _ => None,
            })
            .collect(),
    )
}

/// When the keys of `object` are exactly the decimal strings `"0".."n-1"`,
/// returns them ordered by their numeric value.
fn list_order(object: &Map<String, Value>) -> Option<Vec<String>> {
    let len = object.len();
    let mut slots: Vec<Option<&String>> = vec![None; len];

    for key in object.keys() {
        let position = key.parse::<usize>().ok()?;
        if position >= len || position.to_string() != *key {
            return None;
        }
        slots[position] = Some(key);
    }

    slots.into_iter().map(|key| key.cloned()).collect()
}

fn in_list_order(mut object: Map<String, Value>, order: Vec<String>) -> Vec<Value> {
    order
        .iter()
        .filter_map(|key| object.remove(key))
        .collect()
}
