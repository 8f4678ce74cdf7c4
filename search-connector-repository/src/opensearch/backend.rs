//! OpenSearch backend implementation.
//!
//! This module provides the concrete implementation of the backend capability
//! traits using the OpenSearch Rust crate.

use std::time::Duration;

use async_trait::async_trait;
use opensearch::{
    http::{
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts},
    ingest::{IngestDeletePipelineParts, IngestPutPipelineParts},
    params::Refresh,
    BulkParts, ClearScrollParts, DeleteParts, IndexParts, OpenSearch, ScrollParts, SearchParts,
};
use search_connector_shared::Document;
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::config::OpenSearchConfig;
use crate::errors::ConnectorError;
use crate::interfaces::{IndexBackend, ScrollBackend, WriteBackend};
use crate::opensearch::wire;
use crate::types::{BulkOperation, BulkSummary, ScrollCursor, ScrollPage};
use crate::utils::keep_alive_param;

/// OpenSearch backend.
///
/// Implements index management, document writes and scrolling against a single
/// OpenSearch node.
///
/// # Example
///
/// ```ignore
/// use search_connector_repository::{OpenSearchBackend, OpenSearchConfig, IndexBackend};
///
/// let backend = OpenSearchBackend::new(OpenSearchConfig::new("http://localhost:9200")).await?;
/// if !backend.index_exists("articles").await? {
///     backend.create_index("articles", &serde_json::json!({})).await?;
/// }
/// ```
pub struct OpenSearchBackend {
    client: OpenSearch,
    config: OpenSearchConfig,
}

impl OpenSearchBackend {
    /// Create a new OpenSearch backend connected to the configured URL.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchBackend)` - A new backend instance
    /// * `Err(ConnectorError)` - If the URL is invalid or the transport cannot be built
    pub async fn new(config: OpenSearchConfig) -> Result<Self, ConnectorError> {
        let parsed_url =
            Url::parse(&config.url).map_err(|e| ConnectorError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| ConnectorError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %config.url,
            scroll_page_size = config.scroll_page_size,
            "Created OpenSearch backend"
        );

        Ok(Self { client, config })
    }

    /// Turn a non-2xx response into an error built by `to_error`.
    async fn ensure_success(
        response: Response,
        action: &str,
        to_error: fn(String) -> ConnectorError,
    ) -> Result<Response, ConnectorError> {
        let status = response.status_code();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        error!(status = %status, body = %error_body, action = action, "Request failed");
        Err(to_error(format!(
            "{} failed with status {}: {}",
            action, status, error_body
        )))
    }

    async fn read_json(
        response: Response,
        to_error: fn(String) -> ConnectorError,
    ) -> Result<Value, ConnectorError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| to_error(format!("Failed to read response body: {}", e)))
    }
}

#[async_trait]
impl IndexBackend for OpenSearchBackend {
    async fn index_exists(&self, index: &str) -> Result<bool, ConnectorError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| ConnectorError::index_creation(e.to_string()))?;

        match response.status_code().as_u16() {
            404 => Ok(false),
            _ => {
                Self::ensure_success(
                    response,
                    "Index exists check",
                    ConnectorError::IndexCreationError,
                )
                .await?;
                Ok(true)
            }
        }
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<(), ConnectorError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body.clone())
            .send()
            .await
            .map_err(|e| ConnectorError::index_creation(e.to_string()))?;

        Self::ensure_success(response, "Create index", ConnectorError::IndexCreationError).await?;
        debug!(index = %index, "Index created");
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), ConnectorError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| ConnectorError::delete(e.to_string()))?;

        Self::ensure_success(response, "Delete index", ConnectorError::DeleteError).await?;
        debug!(index = %index, "Index deleted");
        Ok(())
    }

    async fn put_pipeline(&self, id: &str, body: &Value) -> Result<(), ConnectorError> {
        let response = self
            .client
            .ingest()
            .put_pipeline(IngestPutPipelineParts::Id(id))
            .body(body.clone())
            .send()
            .await
            .map_err(|e| ConnectorError::pipeline(e.to_string()))?;

        Self::ensure_success(response, "Put pipeline", ConnectorError::PipelineError).await?;
        debug!(pipeline = %id, "Pipeline stored");
        Ok(())
    }

    async fn delete_pipeline(&self, id: &str) -> Result<(), ConnectorError> {
        let response = self
            .client
            .ingest()
            .delete_pipeline(IngestDeletePipelineParts::Id(id))
            .send()
            .await
            .map_err(|e| ConnectorError::pipeline(e.to_string()))?;

        Self::ensure_success(response, "Delete pipeline", ConnectorError::PipelineError).await?;
        debug!(pipeline = %id, "Pipeline deleted");
        Ok(())
    }
}

#[async_trait]
impl WriteBackend for OpenSearchBackend {
    async fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Document,
        pipeline: Option<&str>,
    ) -> Result<(), ConnectorError> {
        let mut request = self
            .client
            .index(IndexParts::IndexId(index, id))
            .body(document.clone());
        if let Some(pipeline) = pipeline {
            request = request.pipeline(pipeline);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ConnectorError::index(e.to_string()))?;

        Self::ensure_success(response, "Index document", ConnectorError::IndexError).await?;
        debug!(index = %index, doc_id = %id, "Document indexed");
        Ok(())
    }

    async fn delete_document(&self, index: &str, id: &str) -> Result<(), ConnectorError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| ConnectorError::delete(e.to_string()))?;

        // 404 is acceptable - document may not exist
        if response.status_code().as_u16() == 404 {
            debug!(index = %index, doc_id = %id, "Document to delete not found");
            return Ok(());
        }

        Self::ensure_success(response, "Delete document", ConnectorError::DeleteError).await?;
        debug!(index = %index, doc_id = %id, "Document deleted");
        Ok(())
    }

    async fn bulk(
        &self,
        operations: &[BulkOperation],
        refresh: bool,
    ) -> Result<BulkSummary, ConnectorError> {
        if operations.is_empty() {
            return Ok(BulkSummary::default());
        }

        let body: Vec<JsonBody<Value>> = wire::bulk_body(operations)
            .into_iter()
            .map(JsonBody::new)
            .collect();

        let mut request = self.client.bulk(BulkParts::None).body(body);
        if refresh {
            request = request.refresh(Refresh::True);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ConnectorError::bulk_index(e.to_string()))?;

        let response =
            Self::ensure_success(response, "Bulk", ConnectorError::BulkIndexError).await?;
        let body = Self::read_json(response, ConnectorError::BulkIndexError).await?;
        let summary = wire::parse_bulk_response(&body)?;

        debug!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            refresh = refresh,
            "Bulk request completed"
        );
        Ok(summary)
    }
}

#[async_trait]
impl ScrollBackend for OpenSearchBackend {
    async fn open_scroll(
        &self,
        index: &str,
        keep_alive: Duration,
    ) -> Result<ScrollPage, ConnectorError> {
        let keep_alive = keep_alive_param(keep_alive);
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .scroll(&keep_alive)
            .size(self.config.scroll_page_size as i64)
            .body(json!({
                "query": { "match_all": {} },
                "sort": ["_doc"]
            }))
            .send()
            .await
            .map_err(|e| ConnectorError::scroll(e.to_string()))?;

        let response =
            Self::ensure_success(response, "Open scroll", ConnectorError::ScrollError).await?;
        let body = Self::read_json(response, ConnectorError::ScrollError).await?;
        let page = wire::parse_scroll_response(&body)?;

        debug!(index = %index, hits = page.hits.len(), "Scroll opened");
        Ok(page)
    }

    async fn next_page(
        &self,
        cursor: &ScrollCursor,
        keep_alive: Duration,
    ) -> Result<ScrollPage, ConnectorError> {
        let response = self
            .client
            .scroll(ScrollParts::None)
            .body(json!({
                "scroll": keep_alive_param(keep_alive),
                "scroll_id": cursor.as_str()
            }))
            .send()
            .await
            .map_err(|e| ConnectorError::scroll(e.to_string()))?;

        let response =
            Self::ensure_success(response, "Scroll", ConnectorError::ScrollError).await?;
        let body = Self::read_json(response, ConnectorError::ScrollError).await?;
        let page = wire::parse_scroll_response(&body)?;

        debug!(hits = page.hits.len(), "Scroll page fetched");
        Ok(page)
    }

    async fn clear_scroll(&self, cursor: &ScrollCursor) -> Result<(), ConnectorError> {
        let response = self
            .client
            .clear_scroll(ClearScrollParts::None)
            .body(json!({ "scroll_id": [cursor.as_str()] }))
            .send()
            .await
            .map_err(|e| ConnectorError::scroll(e.to_string()))?;

        // 404 means the context already expired
        if response.status_code().as_u16() == 404 {
            return Ok(());
        }

        Self::ensure_success(response, "Clear scroll", ConnectorError::ScrollError).await?;
        Ok(())
    }
}
