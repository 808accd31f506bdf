//! Configuration system for timeloom.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Main engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path to the SQLite database holding both the user tables and the
    /// engine's registry/history relations.
    pub db_path: PathBuf,
    /// Name of the registry relation.
    pub registry_table: String,
    /// Prefix for per-table history relations.
    pub history_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let timeloom_dir = dirs::home_dir()
            .map(|h| h.join(".timeloom"))
            .unwrap_or_else(|| PathBuf::from(".timeloom"));

        Self {
            db_path: timeloom_dir.join("timeloom.db"),
            registry_table: "timeloom_registry".to_string(),
            history_prefix: "timeloom_history_".to_string(),
        }
    }
}

static MEMORY_DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

impl EngineConfig {
    /// Configuration rooted at an explicit database path.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: path.into(),
            ..Self::default()
        }
    }

    /// Configuration backed by a process-private in-memory database.
    ///
    /// Uses SQLite's shared-cache URI form so the engine's private connection
    /// and session connections see the same database.
    pub fn in_memory() -> Self {
        let n = MEMORY_DB_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            db_path: PathBuf::from(format!("file:timeloom_mem_{}?mode=memory&cache=shared", n)),
            ..Self::default()
        }
    }

    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::error::TimeloomResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| crate::error::TimeloomError::Configuration(e.to_string())),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| crate::error::TimeloomError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| crate::error::TimeloomError::Configuration(e.to_string())),
            _ => Err(crate::error::TimeloomError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Name of the history relation for a tracked table.
    pub fn history_table(&self, table: &str) -> String {
        format!("{}{}", self.history_prefix, table)
    }

    /// Whether a relation belongs to the engine itself.
    ///
    /// The interceptor skips these to avoid self-referential capture.
    pub fn is_engine_table(&self, table: &str) -> bool {
        table == self.registry_table || table.starts_with(&self.history_prefix)
    }
}
