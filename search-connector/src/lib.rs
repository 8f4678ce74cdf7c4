//! # Search Connector
//!
//! Connects application document types to an OpenSearch cluster: maps types to
//! indices, prunes documents to their declared schema, batches writes and
//! rebuilds indices without downtime.
//!
//! ## Architecture
//!
//! 1. **Catalog**: Resolves types to index names, definitions and pipelines
//! 2. **Batcher**: Buffers writes and sends them in bulk
//! 3. **Lifecycle**: Creates and drops indices with their pipelines
//! 4. **Migration**: Backfills a parallel index and switches the type to it
//! 5. **Connector**: The facade tying them together over a lazy connection
//!
//! ## Modules
//!
//! - [`catalog`]: Type catalogs and the catalog registry
//! - [`batcher`]: Bulk write batcher
//! - [`lifecycle`]: Index and pipeline lifecycle
//! - [`migration`]: Parallel index migration
//! - [`connector`]: The search connector
//! - [`config`]: Environment configuration and dependency initialization

pub mod batcher;
pub mod catalog;
pub mod config;
pub mod connector;
pub mod lifecycle;
pub mod migration;

pub use batcher::{BatcherConfig, BulkBatcher};
pub use catalog::{
    DeclaredIndexDefiner, IndexDefinerRegistry, ParallelTypeCatalog, PipelineDefinitions,
    PrefixedIndexDefiner, TypeCatalog, TypeDeclaration,
};
pub use config::{Action, ConnectionMode, ConnectorSettings, Dependencies};
pub use connector::SearchConnector;
pub use lifecycle::IndexLifecycle;
pub use migration::{MigrationConfig, MigrationReport, MigrationState, ParallelIndexMigrator};
