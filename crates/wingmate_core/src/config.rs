//! Repository configuration.

use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::OnceLock;

use jsonschema::Validator;
use serde::{Deserialize, Serialize};

use crate::CoreError;

// Embed the schema
const SCHEMA_JSON: &str = include_str!("../../../schemas/v1/repository.json");
static CONFIG_SCHEMA: OnceLock<Validator> = OnceLock::new();

/// Largest record read by default (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// How a store decides whether a record changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintMode {
    /// Size and modification time. A `stat` per record.
    #[default]
    Metadata,
    /// BLAKE3 hash of the bytes. A full read per record, immune to mtime
    /// granularity.
    Content,
}

/// Configuration for a [`BatchRepository`](crate::BatchRepository).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Maximum number of cached records; `None` keeps every record.
    #[serde(default)]
    pub max_entries: Option<usize>,

    /// Whether to process large batches on the rayon pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    /// Smallest batch processed in parallel.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,

    /// Staleness detection strategy for filesystem stores.
    #[serde(default)]
    pub fingerprint: FingerprintMode,

    /// Largest record a filesystem store will read.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_parallel() -> bool {
    true
}

fn default_parallel_threshold() -> usize {
    8
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

impl RepositoryConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            max_entries: None,
            parallel: default_parallel(),
            parallel_threshold: default_parallel_threshold(),
            fingerprint: FingerprintMode::default(),
            max_file_size: default_max_file_size(),
        }
    }

    /// Loads configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CoreError::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parses configuration from JSON string with schema validation.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| CoreError::config(format!("Invalid JSON: {}", e)))?;

        let schema = CONFIG_SCHEMA.get_or_init(|| {
            let schema_json: serde_json::Value =
                serde_json::from_str(SCHEMA_JSON).expect("Invalid embedded config schema");
            Validator::new(&schema_json).expect("Invalid config schema compilation")
        });

        let problems: Vec<String> = schema
            .iter_errors(&value)
            .map(|e| {
                let pointer = e.instance_path().to_string();
                if pointer.is_empty() {
                    e.to_string()
                } else {
                    format!("{pointer}: {e}")
                }
            })
            .collect();
        if !problems.is_empty() {
            return Err(CoreError::config(format!(
                "Config validation failed: {}",
                problems.join("; ")
            )));
        }

        serde_json::from_value(value)
            .map_err(|e| CoreError::config(format!("Invalid config: {}", e)))
    }

    /// Cache bound derived from `max_entries`.
    pub fn capacity(&self) -> Option<NonZeroUsize> {
        self.max_entries.and_then(NonZeroUsize::new)
    }

    /// Sets the cache bound.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Enables or disables parallel loading.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the fingerprint strategy.
    pub fn with_fingerprint(mut self, fingerprint: FingerprintMode) -> Self {
        self.fingerprint = fingerprint;
        self
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self::new()
    }
}
