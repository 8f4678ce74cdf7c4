//! Parallel index migration.
//!
//! Rebuilds a type's index under its parallel name, backfills it from the
//! current index page by page, switches the type over and optionally retires
//! the old index. Reads and writes keep going to the current index until the
//! switch.
//!
//! ```text
//! Init -> ParallelCreated -> Backfilling -> Switched -> Retired
//!                                                   \-> LeftBehind
//! ```
//!
//! Any step before the switch failing moves the run to `Failed`. The backfill
//! tolerates single documents and single pages failing; those are counted in
//! the report. Once switched, a run cannot fail: if the old index cannot be
//! deleted the run stays `Switched` and the error is kept in the report.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use search_connector_repository::{
    BulkOperation, ConnectorError, IndexBackend, ScrollBackend, ScrollCursor, ScrollHit,
    WriteBackend, DEFAULT_SCROLL_KEEP_ALIVE,
};
use search_connector_shared::{check_against, document_from_source, Document};
use tracing::{debug, error, info, instrument, warn};

use crate::catalog::TypeCatalog;
use crate::lifecycle::IndexLifecycle;

/// State of a migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationState {
    Init,
    /// The parallel index exists and is empty.
    ParallelCreated,
    /// Documents are being copied from the current index.
    Backfilling,
    /// The type resolves to the parallel index.
    Switched,
    /// The old index was deleted.
    Retired,
    /// The old index was kept.
    LeftBehind,
    Failed { reason: String },
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::ParallelCreated => write!(f, "parallel_created"),
            Self::Backfilling => write!(f, "backfilling"),
            Self::Switched => write!(f, "switched"),
            Self::Retired => write!(f, "retired"),
            Self::LeftBehind => write!(f, "left_behind"),
            Self::Failed { .. } => write!(f, "failed"),
        }
    }
}

/// Configuration for the migrator.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// How long the engine keeps the scroll context alive between pages.
    pub scroll_keep_alive: Duration,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            scroll_keep_alive: DEFAULT_SCROLL_KEEP_ALIVE,
        }
    }
}

/// Outcome of a migration run.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub type_name: String,
    pub state: MigrationState,
    /// The index documents were copied from.
    pub source_index: String,
    /// The index documents were copied to.
    pub parallel_index: String,
    /// Pages fetched after the scroll was opened.
    pub page_fetches: usize,
    pub documents_reindexed: usize,
    /// Documents that could not be mapped or prepared.
    pub documents_skipped: usize,
    /// Documents whose page write failed or which the engine rejected.
    pub documents_lost: usize,
    /// Why the old index could not be deleted after the switch.
    pub retire_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl MigrationReport {
    fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            state: MigrationState::Init,
            source_index: String::new(),
            parallel_index: String::new(),
            page_fetches: 0,
            documents_reindexed: 0,
            documents_skipped: 0,
            documents_lost: 0,
            retire_error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    fn advance(&mut self, state: MigrationState) {
        info!(
            type_name = %self.type_name,
            from = %self.state,
            to = %state,
            "Migration state changed"
        );
        self.state = state;
    }

    fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Whether every source document reached the parallel index.
    pub fn is_complete(&self) -> bool {
        self.documents_skipped == 0 && self.documents_lost == 0
    }
}

/// Migrates a type to its parallel index.
pub struct ParallelIndexMigrator {
    catalog: Arc<dyn TypeCatalog>,
    lifecycle: IndexLifecycle,
    writer: Arc<dyn WriteBackend>,
    scroller: Arc<dyn ScrollBackend>,
    config: MigrationConfig,
}

impl ParallelIndexMigrator {
    /// Create a new migrator with the default configuration.
    pub fn new(
        catalog: Arc<dyn TypeCatalog>,
        indices: Arc<dyn IndexBackend>,
        writer: Arc<dyn WriteBackend>,
        scroller: Arc<dyn ScrollBackend>,
    ) -> Self {
        Self::with_config(catalog, indices, writer, scroller, MigrationConfig::default())
    }

    /// Create a new migrator with custom configuration.
    pub fn with_config(
        catalog: Arc<dyn TypeCatalog>,
        indices: Arc<dyn IndexBackend>,
        writer: Arc<dyn WriteBackend>,
        scroller: Arc<dyn ScrollBackend>,
        config: MigrationConfig,
    ) -> Self {
        Self {
            lifecycle: IndexLifecycle::new(indices, catalog.clone()),
            catalog,
            writer,
            scroller,
            config,
        }
    }

    /// Migrate `type_name` to its parallel index.
    ///
    /// # Arguments
    ///
    /// * `type_name` - The type to migrate
    /// * `remove_old_index` - Delete the former index after the switch
    ///
    /// # Returns
    ///
    /// * `Ok(MigrationReport)` - The type was switched; the report counts skipped
    ///   and lost documents and carries any failure to delete the old index
    /// * `Err(ConnectorError)` - A step before the switch failed; the parallel
    ///   index is left as is
    #[instrument(skip(self))]
    pub async fn migrate(
        &self,
        type_name: &str,
        remove_old_index: bool,
    ) -> Result<MigrationReport, ConnectorError> {
        let mut report = MigrationReport::new(type_name);
        info!(type_name = %type_name, remove_old_index, "Starting migration");

        match self.execute(&mut report, remove_old_index).await {
            Ok(()) => {
                report.finish();
                info!(
                    type_name = %type_name,
                    state = %report.state,
                    source_index = %report.source_index,
                    parallel_index = %report.parallel_index,
                    reindexed = report.documents_reindexed,
                    skipped = report.documents_skipped,
                    lost = report.documents_lost,
                    retire_error = report.retire_error.as_deref(),
                    "Migration completed"
                );
                Ok(report)
            }
            Err(e) => {
                error!(
                    type_name = %type_name,
                    state = %report.state,
                    error = %e,
                    "Migration failed"
                );
                report.advance(MigrationState::Failed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        report: &mut MigrationReport,
        remove_old_index: bool,
    ) -> Result<(), ConnectorError> {
        let type_name = report.type_name.clone();
        let parallel = self.catalog.as_parallel().ok_or_else(|| {
            ConnectorError::configuration("Catalog does not support parallel indices")
        })?;
        let source_index = self.catalog.index_name(&type_name).ok_or_else(|| {
            ConnectorError::configuration(format!("No index name for type {}", type_name))
        })?;
        let parallel_index = parallel.parallel_index_name(&type_name).ok_or_else(|| {
            ConnectorError::configuration(format!("No parallel index name for type {}", type_name))
        })?;
        report.source_index = source_index.clone();
        report.parallel_index = parallel_index.clone();

        self.lifecycle
            .create_index(&parallel_index, &type_name, true)
            .await?;
        report.advance(MigrationState::ParallelCreated);

        self.backfill(report, &source_index, &parallel_index).await?;

        parallel.switch_to_parallel_index(&type_name).await?;
        report.advance(MigrationState::Switched);

        if remove_old_index {
            match self.lifecycle.delete_index(&source_index).await {
                Ok(()) => report.advance(MigrationState::Retired),
                Err(e) => {
                    warn!(
                        type_name = %type_name,
                        index = %source_index,
                        "Type switched but the old index was kept"
                    );
                    report.retire_error = Some(e.to_string());
                }
            }
        } else {
            report.advance(MigrationState::LeftBehind);
        }
        Ok(())
    }

    /// Copy every document of `source` into `target`, one bulk request per
    /// scroll page.
    async fn backfill(
        &self,
        report: &mut MigrationReport,
        source: &str,
        target: &str,
    ) -> Result<(), ConnectorError> {
        let keep_alive = self.config.scroll_keep_alive;
        let mut page = self.scroller.open_scroll(source, keep_alive).await?;
        report.advance(MigrationState::Backfilling);

        while !page.is_empty() {
            let cursor = page.cursor;
            self.reindex_page(report, target, page.hits).await;

            page = match self.scroller.next_page(&cursor, keep_alive).await {
                Ok(next) => next,
                Err(e) => {
                    self.release(&cursor).await;
                    return Err(e);
                }
            };
            report.page_fetches += 1;
            debug!(
                page = report.page_fetches,
                hits = page.hits.len(),
                "Fetched scroll page"
            );
        }

        self.release(&page.cursor).await;
        Ok(())
    }

    /// Write one page of hits to `target`. Never fails the migration.
    async fn reindex_page(&self, report: &mut MigrationReport, target: &str, hits: Vec<ScrollHit>) {
        let mut operations = Vec::with_capacity(hits.len());
        for hit in hits {
            match self.prepare_hit(&report.type_name, hit.source) {
                Ok(document) => operations.push(BulkOperation::index(target, hit.id, document)),
                Err(e) => {
                    report.documents_skipped += 1;
                    warn!(
                        doc_id = %hit.id,
                        index = %hit.index,
                        error = %e,
                        "Skipping document that cannot be migrated"
                    );
                }
            }
        }

        if operations.is_empty() {
            return;
        }

        match self.writer.bulk(&operations, false).await {
            Ok(summary) => {
                report.documents_reindexed += summary.succeeded;
                report.documents_lost += summary.failed;
                for result in summary.failures() {
                    error!(
                        doc_id = %result.id,
                        error = result.error.as_deref().unwrap_or("unknown"),
                        "Failed to reindex document"
                    );
                }
            }
            Err(e) => {
                report.documents_lost += operations.len();
                error!(
                    index = %target,
                    count = operations.len(),
                    error = %e,
                    "Failed to write page to parallel index"
                );
            }
        }
    }

    fn prepare_hit(
        &self,
        type_name: &str,
        source: serde_json::Value,
    ) -> Result<Document, ConnectorError> {
        let document = document_from_source(source)?;
        if let Some(schema) = self.catalog.schema(type_name) {
            check_against(&schema, &document)?;
        }
        self.catalog.prepare(type_name, document).ok_or_else(|| {
            ConnectorError::configuration(format!(
                "Preparing documents of type {} is not possible",
                type_name
            ))
        })
    }

    async fn release(&self, cursor: &ScrollCursor) {
        if let Err(e) = self.scroller.clear_scroll(cursor).await {
            warn!(error = %e, "Failed to clear scroll context");
        }
    }
}
