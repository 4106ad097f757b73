//! Migration run configuration.
//!
//! Connections and collections are capabilities handed to the orchestrator
//! directly; the config carries everything else a run needs: the table list,
//! the batch size, the batch-failure policy, and collection naming overrides.
//! There is no process-wide mutable state.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tables to migrate, in the order they will be processed.
    pub tables: Vec<String>,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

impl Config {
    /// Create a config for the given tables with default behavior.
    pub fn for_tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tables: tables.into_iter().map(Into::into).collect(),
            migration: MigrationConfig::default(),
        }
    }

    /// Load and validate configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.tables.is_empty() {
            return Err(MigrateError::Config(
                "at least one table must be selected".into(),
            ));
        }
        if self.migration.batch_size == Some(0) {
            return Err(MigrateError::Config("batch_size must be at least 1".into()));
        }
        Ok(())
    }

    /// Target collection name for a source table: the override if one is
    /// configured, otherwise the table name itself.
    pub fn collection_for<'a>(&'a self, table: &'a str) -> &'a str {
        self.migration
            .collection_overrides
            .get(table)
            .map(String::as_str)
            .unwrap_or(table)
    }
}

/// Migration behavior configuration.
///
/// `batch_size` uses `Option<T>` to distinguish "not set" (use the default)
/// from "explicitly set".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Rows per batch (default: 1000).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,

    /// Abort a table on the first failed batch instead of skipping it and
    /// continuing with the next batch (default: false).
    #[serde(default)]
    pub stop_on_batch_failure: bool,

    /// Source table → target collection name overrides.
    #[serde(default)]
    pub collection_overrides: HashMap<String, String>,
}

impl MigrationConfig {
    /// Effective batch size.
    pub fn get_batch_size(&self) -> usize {
        self.batch_size.unwrap_or(1_000)
    }
}
