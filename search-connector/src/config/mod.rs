//! Configuration for the maintenance binary.
//!
//! Settings are read from environment variables (a `.env` file is loaded
//! first by the binary). Every variable except the catalog path, the action
//! and the type has a default.

mod dependencies;

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use search_connector_repository::{ConnectionFactory, ConnectorError};
use tracing::{info, warn};

use crate::connector::SearchConnector;

pub use dependencies::{wait_for_cluster, Dependencies};

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Default scroll keep-alive in seconds.
const DEFAULT_SCROLL_KEEP_ALIVE_SECS: u64 = 60;

/// Connection mode for OpenSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry the connection until it succeeds.
    Retry,
}

impl ConnectionMode {
    /// Parse a connection mode.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Defaults to "retry" if not set or invalid.
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "retry".to_string())
            .to_lowercase()
            .as_str()
        {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!("Invalid OPENSEARCH_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// The maintenance action the binary runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Create the type's index and pipelines.
    Create { type_name: String, overwrite: bool },
    /// Drop the type's index and pipelines.
    Drop { type_name: String },
    /// Migrate the type to its parallel index.
    Migrate {
        type_name: String,
        remove_old_index: bool,
    },
}

impl Action {
    /// The type the action applies to.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Create { type_name, .. }
            | Self::Drop { type_name }
            | Self::Migrate { type_name, .. } => type_name,
        }
    }

    /// Run the action against a connector.
    pub async fn execute<F: ConnectionFactory>(
        &self,
        connector: &mut SearchConnector<F>,
    ) -> Result<(), ConnectorError> {
        match self {
            Self::Create {
                type_name,
                overwrite,
            } => {
                connector.create_index(type_name, *overwrite).await?;
                info!(type_name = %type_name, "Index created");
            }
            Self::Drop { type_name } => {
                connector.drop_index(type_name).await?;
                info!(type_name = %type_name, "Index dropped");
            }
            Self::Migrate {
                type_name,
                remove_old_index,
            } => {
                let report = connector
                    .migrate_to_parallel_index(type_name, *remove_old_index)
                    .await?;
                if !report.is_complete() {
                    warn!(
                        type_name = %type_name,
                        skipped = report.documents_skipped,
                        lost = report.documents_lost,
                        "Migration finished without some documents"
                    );
                }
                if let Some(reason) = report.retire_error {
                    return Err(ConnectorError::delete(format!(
                        "Type {} switched to {} but {} was not deleted: {}",
                        type_name, report.parallel_index, report.source_index, reason
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Settings of the maintenance binary.
#[derive(Debug, Clone)]
pub struct ConnectorSettings {
    pub opensearch_url: String,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
    /// JSON catalog declaring the types.
    pub catalog_path: PathBuf,
    /// Prefix added to every index name.
    pub index_prefix: Option<String>,
    pub scroll_keep_alive: Duration,
    pub action: Action,
}

impl ConnectorSettings {
    /// Read the settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `OPENSEARCH_CONNECTION_MODE`: Connection mode - "fail-fast" or "retry" (default: retry)
    /// - `OPENSEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `SEARCH_CATALOG_PATH`: Path of the JSON type catalog (required)
    /// - `INDEX_PREFIX`: Prefix for every index name (default: none)
    /// - `SCROLL_KEEP_ALIVE_SECS`: Scroll keep-alive during migration (default: 60)
    /// - `CONNECTOR_ACTION`: "create", "drop" or "migrate" (required)
    /// - `CONNECTOR_TYPE`: The type the action applies to (required)
    /// - `CONNECTOR_OVERWRITE`: Recreate an existing index on create (default: false)
    /// - `CONNECTOR_REMOVE_OLD_INDEX`: Delete the old index after migrating (default: true)
    ///
    /// # Returns
    ///
    /// * `Ok(ConnectorSettings)` - The parsed settings
    /// * `Err(ConnectorError)` - If a required variable is missing or a value is invalid
    pub fn from_env() -> Result<Self, ConnectorError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the settings through `lookup` instead of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConnectorError> {
        let type_name = required(&lookup, "CONNECTOR_TYPE")?;
        let action = match required(&lookup, "CONNECTOR_ACTION")?.to_lowercase().as_str() {
            "create" => Action::Create {
                type_name,
                overwrite: parsed(&lookup, "CONNECTOR_OVERWRITE", parse_bool, false)?,
            },
            "drop" => Action::Drop { type_name },
            "migrate" => Action::Migrate {
                type_name,
                remove_old_index: parsed(&lookup, "CONNECTOR_REMOVE_OLD_INDEX", parse_bool, true)?,
            },
            other => {
                return Err(ConnectorError::configuration(format!(
                    "Invalid CONNECTOR_ACTION '{}', expected create, drop or migrate",
                    other
                )))
            }
        };

        Ok(Self {
            opensearch_url: lookup("OPENSEARCH_URL")
                .unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string()),
            connection_mode: ConnectionMode::parse(lookup("OPENSEARCH_CONNECTION_MODE")),
            retry_interval: Duration::from_secs(parsed(
                &lookup,
                "OPENSEARCH_RETRY_INTERVAL_SECS",
                u64::from_str,
                DEFAULT_RETRY_INTERVAL_SECS,
            )?),
            catalog_path: PathBuf::from(required(&lookup, "SEARCH_CATALOG_PATH")?),
            index_prefix: lookup("INDEX_PREFIX").filter(|prefix| !prefix.is_empty()),
            scroll_keep_alive: Duration::from_secs(parsed(
                &lookup,
                "SCROLL_KEEP_ALIVE_SECS",
                u64::from_str,
                DEFAULT_SCROLL_KEEP_ALIVE_SECS,
            )?),
            action,
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConnectorError> {
    lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConnectorError::configuration(format!("{} is not set", key)))
}

fn parsed<T, E>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Result<T, E>,
    default: T,
) -> Result<T, ConnectorError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => parse(value.trim()).map_err(|_| {
            ConnectorError::configuration(format!("Invalid value '{}' for {}", value, key))
        }),
    }
}

fn parse_bool(value: &str) -> Result<bool, ()> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(()),
    }
}
