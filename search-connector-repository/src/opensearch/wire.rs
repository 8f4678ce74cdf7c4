//! Request bodies and response parsing for the OpenSearch REST API.

use serde_json::{json, Value};

use crate::errors::ConnectorError;
use crate::types::{
    BulkOperation, BulkOperationResult, BulkSummary, ScrollCursor, ScrollHit, ScrollPage,
};

/// Build the NDJSON lines of a bulk request, one action line per operation,
/// followed by the document line for index actions.
pub fn bulk_body(operations: &[BulkOperation]) -> Vec<Value> {
    let mut lines = Vec::with_capacity(operations.len() * 2);
    for operation in operations {
        match operation {
            BulkOperation::Index {
                index,
                id,
                document,
            } => {
                lines.push(json!({ "index": { "_index": index, "_id": id } }));
                lines.push(Value::Object(document.clone()));
            }
            BulkOperation::Delete { index, id } => {
                lines.push(json!({ "delete": { "_index": index, "_id": id } }));
            }
        }
    }
    lines
}

/// Parse a bulk response into a per-operation summary.
///
/// An item is successful when the engine reported no `error` for it; a delete of
/// a missing document (`404` without error) counts as successful.
pub fn parse_bulk_response(response: &Value) -> Result<BulkSummary, ConnectorError> {
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| ConnectorError::parse("Bulk response has no items"))?;

    let results = items
        .iter()
        .map(|item| {
            let outcome = item
                .as_object()
                .and_then(|actions| actions.values().next())
                .ok_or_else(|| ConnectorError::parse("Bulk response item has no action"))?;

            let error = outcome.get("error").map(error_reason);
            Ok(BulkOperationResult {
                index: string_field(outcome, "_index"),
                id: string_field(outcome, "_id"),
                success: error.is_none(),
                error,
            })
        })
        .collect::<Result<Vec<_>, ConnectorError>>()?;

    Ok(BulkSummary::from_results(results))
}

/// Parse a search or scroll response into a page of hits.
pub fn parse_scroll_response(response: &Value) -> Result<ScrollPage, ConnectorError> {
    let scroll_id = response
        .get("_scroll_id")
        .and_then(Value::as_str)
        .ok_or_else(|| ConnectorError::parse("Scroll response has no _scroll_id"))?;

    let hits = response
        .get("hits")
        .and_then(|hits| hits.get("hits"))
        .and_then(Value::as_array)
        .ok_or_else(|| ConnectorError::parse("Scroll response has no hits"))?;

    let hits = hits
        .iter()
        .map(|hit| {
            let id = hit
                .get("_id")
                .and_then(Value::as_str)
                .ok_or_else(|| ConnectorError::parse("Scroll hit has no _id"))?;
            Ok(ScrollHit {
                index: string_field(hit, "_index"),
                id: id.to_string(),
                source: hit.get("_source").cloned().unwrap_or(Value::Null),
            })
        })
        .collect::<Result<Vec<_>, ConnectorError>>()?;

    Ok(ScrollPage {
        cursor: ScrollCursor::new(scroll_id),
        hits,
    })
}

fn string_field(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn error_reason(error: &Value) -> String {
    match (
        error.get("type").and_then(Value::as_str),
        error.get("reason").and_then(Value::as_str),
    ) {
        (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
        (None, Some(reason)) => reason.to_string(),
        _ => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_bulk_body_preserves_order() {
        let mut document = Map::new();
        document.insert("title".to_string(), json!("Hello"));

        let lines = bulk_body(&[
            BulkOperation::index("articles", "1", document),
            BulkOperation::delete("articles", "2"),
            BulkOperation::index("articles", "3", Map::new()),
        ]);

        assert_eq!(
            lines,
            vec![
                json!({ "index": { "_index": "articles", "_id": "1" } }),
                json!({ "title": "Hello" }),
                json!({ "delete": { "_index": "articles", "_id": "2" } }),
                json!({ "index": { "_index": "articles", "_id": "3" } }),
                json!({}),
            ]
        );
    }

    #[test]
    fn test_parse_bulk_response_with_failures() {
        let response = json!({
            "took": 3,
            "errors": true,
            "items": [
                { "index": { "_index": "articles", "_id": "1", "status": 201 } },
                { "index": {
                    "_index": "articles", "_id": "2", "status": 400,
                    "error": { "type": "mapper_parsing_exception", "reason": "failed to parse field [title]" }
                } },
                { "delete": { "_index": "articles", "_id": "3", "status": 404, "result": "not_found" } }
            ]
        });

        let summary = parse_bulk_response(&response).unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.results[1].id, "2");
        assert_eq!(
            summary.results[1].error.as_deref(),
            Some("mapper_parsing_exception: failed to parse field [title]")
        );
    }

    #[test]
    fn test_parse_bulk_response_without_items() {
        assert!(matches!(
            parse_bulk_response(&json!({ "errors": false })),
            Err(ConnectorError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_scroll_response() {
        let response = json!({
            "_scroll_id": "DXF1ZXJ5QW5kRmV0Y2gBAAAAAAAAAD4WYm9laVYtZndUQlNsdDcwakFMNjU1QQ==",
            "hits": {
                "total": { "value": 2 },
                "hits": [
                    { "_index": "articles", "_id": "1", "_source": { "title": "A" } },
                    { "_index": "articles", "_id": "2" }
                ]
            }
        });

        let page = parse_scroll_response(&response).unwrap();

        assert_eq!(
            page.cursor.as_str(),
            "DXF1ZXJ5QW5kRmV0Y2gBAAAAAAAAAD4WYm9laVYtZndUQlNsdDcwakFMNjU1QQ=="
        );
        assert_eq!(page.hits.len(), 2);
        assert_eq!(page.hits[0].source, json!({ "title": "A" }));
        assert_eq!(page.hits[1].source, Value::Null);
    }

    #[test]
    fn test_parse_scroll_response_without_scroll_id() {
        let response = json!({ "hits": { "hits": [] } });
        assert!(parse_scroll_response(&response).is_err());
    }
}
