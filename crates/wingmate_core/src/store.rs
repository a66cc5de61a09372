//! Backing stores that records are read from.

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;
use wingmate_cache::Fingerprint;
use wingmate_parser::SourceId;

use crate::config::{DEFAULT_MAX_FILE_SIZE, FingerprintMode, RepositoryConfig};
use crate::error::{LoadError, LoadErrorKind};

/// Result of probing a record before deciding whether to read it.
#[derive(Debug, Clone)]
pub struct Probe {
    /// Current fingerprint of the record.
    pub fingerprint: Fingerprint,
    /// The record bytes, when the store had to read them to fingerprint.
    pub bytes: Option<Vec<u8>>,
}

/// The narrow read contract the repository depends on.
pub trait BackingStore: Send + Sync {
    /// Reads the raw bytes of a record.
    fn read(&self, identity: &SourceId) -> Result<Vec<u8>, LoadError>;

    /// Computes the current fingerprint of a record.
    fn fingerprint(&self, identity: &SourceId) -> Result<Fingerprint, LoadError>;

    /// Fingerprints a record, handing back the bytes if they were read on
    /// the way so a cache miss does not read twice.
    fn probe(&self, identity: &SourceId) -> Result<Probe, LoadError> {
        Ok(Probe {
            fingerprint: self.fingerprint(identity)?,
            bytes: None,
        })
    }

    /// Maps an identity to the key of the content it names.
    ///
    /// Two identities naming the same record must map to the same key. The
    /// default treats every identity as already canonical.
    fn canonicalize(&self, identity: &SourceId) -> SourceId {
        identity.clone()
    }
}

impl<T: BackingStore + ?Sized> BackingStore for Arc<T> {
    fn read(&self, identity: &SourceId) -> Result<Vec<u8>, LoadError> {
        (**self).read(identity)
    }

    fn fingerprint(&self, identity: &SourceId) -> Result<Fingerprint, LoadError> {
        (**self).fingerprint(identity)
    }

    fn probe(&self, identity: &SourceId) -> Result<Probe, LoadError> {
        (**self).probe(identity)
    }

    fn canonicalize(&self, identity: &SourceId) -> SourceId {
        (**self).canonicalize(identity)
    }
}

/// Store backed by the local filesystem. Identities are paths.
#[derive(Debug, Clone)]
pub struct FsStore {
    mode: FingerprintMode,
    max_file_size: u64,
}

impl FsStore {
    /// Creates a store fingerprinting by metadata.
    pub fn new() -> Self {
        Self {
            mode: FingerprintMode::Metadata,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Creates a store following the repository configuration.
    pub fn from_config(config: &RepositoryConfig) -> Self {
        Self {
            mode: config.fingerprint,
            max_file_size: config.max_file_size,
        }
    }

    /// Sets the fingerprint strategy.
    pub fn with_mode(mut self, mode: FingerprintMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the largest file that will be read.
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Returns the fingerprint strategy.
    pub fn mode(&self) -> FingerprintMode {
        self.mode
    }

    fn checked_metadata(&self, identity: &SourceId) -> Result<fs::Metadata, LoadError> {
        let metadata = fs::metadata(identity.path()).map_err(|e| LoadError::io(identity, &e))?;

        if !metadata.is_file() {
            return Err(LoadError::new(identity, LoadErrorKind::NotAFile));
        }

        if metadata.len() > self.max_file_size {
            return Err(LoadError::new(
                identity,
                LoadErrorKind::TooLarge {
                    size: metadata.len(),
                    limit: self.max_file_size,
                },
            ));
        }

        Ok(metadata)
    }
}

impl Default for FsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BackingStore for FsStore {
    fn read(&self, identity: &SourceId) -> Result<Vec<u8>, LoadError> {
        self.checked_metadata(identity)?;
        debug!("Reading {}", identity);
        fs::read(identity.path()).map_err(|e| LoadError::io(identity, &e))
    }

    fn fingerprint(&self, identity: &SourceId) -> Result<Fingerprint, LoadError> {
        self.probe(identity).map(|probe| probe.fingerprint)
    }

    fn probe(&self, identity: &SourceId) -> Result<Probe, LoadError> {
        match self.mode {
            FingerprintMode::Metadata => {
                let metadata = self.checked_metadata(identity)?;
                Ok(Probe {
                    fingerprint: Fingerprint::from_metadata(
                        metadata.len(),
                        metadata.modified().ok(),
                    ),
                    bytes: None,
                })
            }
            FingerprintMode::Content => {
                let bytes = self.read(identity)?;
                Ok(Probe {
                    fingerprint: Fingerprint::of_content(&bytes),
                    bytes: Some(bytes),
                })
            }
        }
    }

    fn canonicalize(&self, identity: &SourceId) -> SourceId {
        SourceId::canonical(identity.path())
    }
}

/// Thread-safe in-memory store.
///
/// Fingerprints are content hashes. Every `read` and `fingerprint` call is
/// counted per identity, which makes the store useful for asserting how much
/// physical I/O a batch performed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<SourceId, Arc<Vec<u8>>>>,
    reads: Mutex<HashMap<SourceId, usize>>,
    probes: Mutex<HashMap<SourceId, usize>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a record.
    pub fn insert(&self, identity: impl Into<SourceId>, bytes: impl Into<Vec<u8>>) {
        self.records
            .write()
            .insert(identity.into(), Arc::new(bytes.into()));
    }

    /// Removes a record. Returns true if it existed.
    pub fn remove(&self, identity: &SourceId) -> bool {
        self.records.write().remove(identity).is_some()
    }

    /// Number of `read` calls made for `identity`.
    pub fn read_count(&self, identity: &SourceId) -> usize {
        self.reads.lock().get(identity).copied().unwrap_or(0)
    }

    /// Number of `read` calls made for every identity.
    pub fn total_reads(&self) -> usize {
        self.reads.lock().values().sum()
    }

    /// Number of fingerprint probes made for `identity`.
    pub fn probe_count(&self, identity: &SourceId) -> usize {
        self.probes.lock().get(identity).copied().unwrap_or(0)
    }

    /// Resets the read and probe counters.
    pub fn reset_counters(&self) {
        self.reads.lock().clear();
        self.probes.lock().clear();
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn record(&self, identity: &SourceId) -> Result<Arc<Vec<u8>>, LoadError> {
        self.records
            .read()
            .get(identity)
            .cloned()
            .ok_or_else(|| LoadError::not_found(identity))
    }
}

impl BackingStore for MemoryStore {
    fn read(&self, identity: &SourceId) -> Result<Vec<u8>, LoadError> {
        *self.reads.lock().entry(identity.clone()).or_default() += 1;
        self.record(identity).map(|bytes| bytes.as_ref().clone())
    }

    fn fingerprint(&self, identity: &SourceId) -> Result<Fingerprint, LoadError> {
        *self.probes.lock().entry(identity.clone()).or_default() += 1;
        self.record(identity)
            .map(|bytes| Fingerprint::of_content(&bytes))
    }
}
