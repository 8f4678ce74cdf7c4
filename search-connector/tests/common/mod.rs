//! Mock backend, connection factory and catalog shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use search_connector::{ParallelTypeCatalog, PipelineDefinitions, TypeCatalog};
use search_connector_repository::{
    BulkOperation, BulkOperationResult, BulkSummary, ConnectionFactory, ConnectorError,
    IndexBackend, ScrollBackend, ScrollCursor, ScrollHit, ScrollPage, WriteBackend,
};
use search_connector_shared::Document;
use serde_json::{json, Value};

/// A request the mock backend received.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    IndexExists(String),
    CreateIndex(String),
    DeleteIndex(String),
    PutPipeline(String),
    DeletePipeline(String),
    IndexDocument {
        index: String,
        id: String,
        pipeline: Option<String>,
    },
    DeleteDocument {
        index: String,
        id: String,
    },
    Bulk {
        operations: Vec<BulkOperation>,
        refresh: bool,
    },
    OpenScroll(String),
    NextPage(String),
    ClearScroll(String),
}

#[derive(Default)]
pub struct MockState {
    calls: Mutex<Vec<Call>>,
    indices: Mutex<BTreeSet<String>>,
    pipelines: Mutex<BTreeSet<String>>,
    documents: Mutex<BTreeMap<String, BTreeMap<String, Document>>>,
    pages: Mutex<VecDeque<Vec<ScrollHit>>>,
    scrolls: AtomicUsize,
    /// 1-based numbers of the bulk calls that fail as a whole.
    failing_bulk_calls: Mutex<BTreeSet<usize>>,
    fail_open_scroll: AtomicBool,
    fail_next_page: AtomicBool,
    failing_index_deletes: Mutex<BTreeSet<String>>,
    connections: AtomicUsize,
    failing_connections: AtomicUsize,
    misconfigured: AtomicBool,
}

/// In-memory backend recording every call. Clones share their state.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(self, index: &str) -> Self {
        self.state.indices.lock().unwrap().insert(index.to_string());
        self
    }

    pub fn with_pipeline(self, id: &str) -> Self {
        self.state.pipelines.lock().unwrap().insert(id.to_string());
        self
    }

    /// Queue scroll pages; the open call returns the first one and every page
    /// call the next. An exhausted queue yields empty pages.
    pub fn with_pages(self, pages: Vec<Vec<ScrollHit>>) -> Self {
        self.state.pages.lock().unwrap().extend(pages);
        self
    }

    pub fn fail_bulk_call(self, number: usize) -> Self {
        self.state.failing_bulk_calls.lock().unwrap().insert(number);
        self
    }

    pub fn fail_open_scroll(self) -> Self {
        self.state.fail_open_scroll.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail_next_page(self) -> Self {
        self.state.fail_next_page.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail_delete_index(self, index: &str) -> Self {
        self.state
            .failing_index_deletes
            .lock()
            .unwrap()
            .insert(index.to_string());
        self
    }

    /// Make every connection attempt fail with a configuration error.
    pub fn misconfigured(self) -> Self {
        self.state.misconfigured.store(true, Ordering::SeqCst);
        self
    }

    /// Make the first `count` connection attempts fail.
    pub fn fail_connections(self, count: usize) -> Self {
        self.state.failing_connections.store(count, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    pub fn bulk_calls(&self) -> Vec<(Vec<BulkOperation>, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Bulk {
                    operations,
                    refresh,
                } => Some((operations, refresh)),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self, expected: &Call) -> Option<usize> {
        self.calls().iter().position(|call| call == expected)
    }

    pub fn has_index(&self, index: &str) -> bool {
        self.state.indices.lock().unwrap().contains(index)
    }

    pub fn has_pipeline(&self, id: &str) -> bool {
        self.state.pipelines.lock().unwrap().contains(id)
    }

    pub fn documents(&self, index: &str) -> BTreeMap<String, Document> {
        self.state
            .documents
            .lock()
            .unwrap()
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.state.calls.lock().unwrap().push(call);
    }

    fn next_scroll_page(&self) -> ScrollPage {
        let number = self.state.scrolls.fetch_add(1, Ordering::SeqCst) + 1;
        let hits = self.state.pages.lock().unwrap().pop_front().unwrap_or_default();
        ScrollPage {
            cursor: ScrollCursor::new(format!("scroll-{}", number)),
            hits,
        }
    }
}

#[async_trait]
impl IndexBackend for MockBackend {
    async fn index_exists(&self, index: &str) -> Result<bool, ConnectorError> {
        self.record(Call::IndexExists(index.to_string()));
        Ok(self.has_index(index))
    }

    async fn create_index(&self, index: &str, _body: &Value) -> Result<(), ConnectorError> {
        self.record(Call::CreateIndex(index.to_string()));
        self.state.indices.lock().unwrap().insert(index.to_string());
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), ConnectorError> {
        self.record(Call::DeleteIndex(index.to_string()));
        if self.state.failing_index_deletes.lock().unwrap().contains(index) {
            return Err(ConnectorError::delete(format!("cannot delete {}", index)));
        }
        self.state.indices.lock().unwrap().remove(index);
        self.state.documents.lock().unwrap().remove(index);
        Ok(())
    }

    async fn put_pipeline(&self, id: &str, _body: &Value) -> Result<(), ConnectorError> {
        self.record(Call::PutPipeline(id.to_string()));
        self.state.pipelines.lock().unwrap().insert(id.to_string());
        Ok(())
    }

    async fn delete_pipeline(&self, id: &str) -> Result<(), ConnectorError> {
        self.record(Call::DeletePipeline(id.to_string()));
        self.state.pipelines.lock().unwrap().remove(id);
        Ok(())
    }
}

#[async_trait]
impl WriteBackend for MockBackend {
    async fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Document,
        pipeline: Option<&str>,
    ) -> Result<(), ConnectorError> {
        self.record(Call::IndexDocument {
            index: index.to_string(),
            id: id.to_string(),
            pipeline: pipeline.map(str::to_string),
        });
        self.state
            .documents
            .lock()
            .unwrap()
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), document.clone());
        Ok(())
    }

    async fn delete_document(&self, index: &str, id: &str) -> Result<(), ConnectorError> {
        self.record(Call::DeleteDocument {
            index: index.to_string(),
            id: id.to_string(),
        });
        if let Some(documents) = self.state.documents.lock().unwrap().get_mut(index) {
            documents.remove(id);
        }
        Ok(())
    }

    async fn bulk(
        &self,
        operations: &[BulkOperation],
        refresh: bool,
    ) -> Result<BulkSummary, ConnectorError> {
        self.record(Call::Bulk {
            operations: operations.to_vec(),
            refresh,
        });
        let number = self.bulk_calls().len();
        if self.state.failing_bulk_calls.lock().unwrap().contains(&number) {
            return Err(ConnectorError::bulk_index("es_rejected_execution_exception"));
        }

        let mut documents = self.state.documents.lock().unwrap();
        let results = operations
            .iter()
            .map(|operation| {
                match operation {
                    BulkOperation::Index {
                        index,
                        id,
                        document,
                    } => {
                        documents
                            .entry(index.clone())
                            .or_default()
                            .insert(id.clone(), document.clone());
                    }
                    BulkOperation::Delete { index, id } => {
                        if let Some(stored) = documents.get_mut(index) {
                            stored.remove(id);
                        }
                    }
                }
                BulkOperationResult {
                    index: operation.target_index().to_string(),
                    id: operation.id().to_string(),
                    success: true,
                    error: None,
                }
            })
            .collect();
        Ok(BulkSummary::from_results(results))
    }
}

#[async_trait]
impl ScrollBackend for MockBackend {
    async fn open_scroll(
        &self,
        index: &str,
        _keep_alive: Duration,
    ) -> Result<ScrollPage, ConnectorError> {
        self.record(Call::OpenScroll(index.to_string()));
        if self.state.fail_open_scroll.load(Ordering::SeqCst) {
            return Err(ConnectorError::scroll("search_phase_execution_exception"));
        }
        Ok(self.next_scroll_page())
    }

    async fn next_page(
        &self,
        cursor: &ScrollCursor,
        _keep_alive: Duration,
    ) -> Result<ScrollPage, ConnectorError> {
        self.record(Call::NextPage(cursor.as_str().to_string()));
        if self.state.fail_next_page.load(Ordering::SeqCst) {
            return Err(ConnectorError::scroll("search_context_missing_exception"));
        }
        Ok(self.next_scroll_page())
    }

    async fn clear_scroll(&self, cursor: &ScrollCursor) -> Result<(), ConnectorError> {
        self.record(Call::ClearScroll(cursor.as_str().to_string()));
        Ok(())
    }
}

/// Hands out clones of one mock backend.
#[derive(Clone, Default)]
pub struct MockFactory {
    pub backend: MockBackend,
}

impl MockFactory {
    pub fn new(backend: MockBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ConnectionFactory for MockFactory {
    type Client = MockBackend;

    async fn create_connection(&self) -> Result<Self::Client, ConnectorError> {
        let state = &self.backend.state;
        let attempt = state.connections.fetch_add(1, Ordering::SeqCst) + 1;
        if state.misconfigured.load(Ordering::SeqCst) {
            return Err(ConnectorError::configuration("invalid OpenSearch URL"));
        }
        if attempt <= state.failing_connections.load(Ordering::SeqCst) {
            return Err(ConnectorError::connection("connection refused"));
        }
        Ok(self.backend.clone())
    }
}

/// Catalog for the `article` type stored in `articles`, rebuilt in
/// `articles_parallel`.
pub struct SwitchableCatalog {
    switched: AtomicBool,
}

impl SwitchableCatalog {
    pub const SOURCE: &'static str = "articles";
    pub const PARALLEL: &'static str = "articles_parallel";
    pub const PIPELINE: &'static str = "articles-default";

    pub fn new() -> Self {
        Self {
            switched: AtomicBool::new(false),
        }
    }

    pub fn is_switched(&self) -> bool {
        self.switched.load(Ordering::SeqCst)
    }
}

impl TypeCatalog for SwitchableCatalog {
    fn index_name(&self, type_name: &str) -> Option<String> {
        if type_name != "article" {
            return None;
        }
        let index = if self.is_switched() {
            Self::PARALLEL
        } else {
            Self::SOURCE
        };
        Some(index.to_string())
    }

    fn index_definition(&self, type_name: &str) -> Option<Value> {
        (type_name == "article").then(article_definition)
    }

    fn pipeline_definitions(&self, type_name: &str) -> Option<PipelineDefinitions> {
        (type_name == "article").then(|| {
            PipelineDefinitions::from([(Self::PIPELINE.to_string(), json!({ "processors": [] }))])
        })
    }

    fn supported_indices(&self) -> BTreeMap<String, String> {
        self.index_name("article")
            .map(|index| BTreeMap::from([("article".to_string(), index)]))
            .unwrap_or_default()
    }

    fn as_parallel(&self) -> Option<&dyn ParallelTypeCatalog> {
        Some(self)
    }
}

#[async_trait]
impl ParallelTypeCatalog for SwitchableCatalog {
    fn parallel_index_name(&self, type_name: &str) -> Option<String> {
        (type_name == "article").then(|| Self::PARALLEL.to_string())
    }

    async fn switch_to_parallel_index(&self, _type_name: &str) -> Result<(), ConnectorError> {
        self.switched.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Index definition of the `article` type.
pub fn article_definition() -> Value {
    json!({
        "settings": { "number_of_shards": 1 },
        "mappings": {
            "properties": {
                "title": { "type": "text" },
                "tags": { "type": "keyword" },
                "author": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "keyword" }
                    }
                },
                "comments": {
                    "type": "nested",
                    "properties": {
                        "body": { "type": "text" }
                    }
                }
            }
        }
    })
}

pub fn document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

pub fn hit(index: &str, id: &str, source: Value) -> ScrollHit {
    ScrollHit {
        index: index.to_string(),
        id: id.to_string(),
        source,
    }
}
