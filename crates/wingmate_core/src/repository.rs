//! Batch-first record repository.
//!
//! A [`BatchRepository`] turns "one read per lookup" into "one pass per
//! batch": callers collect every record a piece of work needs, hand the whole
//! set to [`BatchRepository::load_many`], and then resolve against the
//! returned [`LoadedPayloads`] in memory.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use wingmate_cache::{CacheEntry, CacheStats, Fingerprint, ParseCache};
use wingmate_parser::{JsonSourceParser, SourceId, SourceParser};

use crate::cancel::CancellationToken;
use crate::config::RepositoryConfig;
use crate::error::{CancellationError, CoreError, LoadError};
use crate::store::BackingStore;
use crate::telemetry::{MetricsSnapshot, RepositoryMetrics};

static NEXT_REPOSITORY_ID: AtomicU64 = AtomicU64::new(1);

/// Counters for a single `load_many` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    /// Identities submitted, duplicates included.
    pub requested: usize,
    /// Distinct identities.
    pub unique: usize,
    /// Served from the cache after a matching fingerprint.
    pub reused: usize,
    /// Read and parsed.
    pub parsed: usize,
    /// Failed to probe, read or parse.
    pub failed: usize,
    /// Never started because the batch was cancelled.
    pub skipped: usize,
}

impl LoadStats {
    /// Identities that produced a value.
    pub fn loaded(&self) -> usize {
        self.reused + self.parsed
    }
}

/// Read-only view over the records produced by one `load_many` call.
///
/// Only a repository can build one. It remembers which repository and which
/// cache generation it came from, so it cannot be resolved against another
/// repository or after the session was switched.
///
/// Records are keyed by their canonical identity, but every lookup also
/// accepts the spelling the caller requested.
#[derive(Debug, Clone)]
pub struct LoadedPayloads {
    origin: u64,
    generation: u64,
    order: Vec<SourceId>,
    entries: HashMap<SourceId, Result<Arc<Value>, LoadError>>,
    aliases: HashMap<SourceId, SourceId>,
}

impl LoadedPayloads {
    fn new(origin: u64, generation: u64) -> Self {
        Self {
            origin,
            generation,
            order: Vec::new(),
            entries: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    fn insert(&mut self, identity: SourceId, result: Result<Arc<Value>, LoadError>) {
        if self.entries.insert(identity.clone(), result).is_none() {
            self.order.push(identity);
        }
    }

    fn alias(&mut self, requested: &SourceId, key: &SourceId) {
        if requested != key {
            self.aliases.insert(requested.clone(), key.clone());
        }
    }

    fn entry(&self, identity: &SourceId) -> Option<&Result<Arc<Value>, LoadError>> {
        let key = self.aliases.get(identity).unwrap_or(identity);
        self.entries.get(key)
    }

    /// Returns the parsed value, if the record loaded.
    pub fn get(&self, identity: &SourceId) -> Option<&Value> {
        match self.entry(identity) {
            Some(Ok(value)) => Some(value.as_ref()),
            _ => None,
        }
    }

    /// Returns the load error, if the record failed.
    pub fn error(&self, identity: &SourceId) -> Option<&LoadError> {
        match self.entry(identity) {
            Some(Err(e)) => Some(e),
            _ => None,
        }
    }

    /// Returns true if the record was part of the batch (loaded or failed).
    pub fn contains(&self, identity: &SourceId) -> bool {
        self.entry(identity).is_some()
    }

    /// Returns true if the record produced a value.
    pub fn is_loaded(&self, identity: &SourceId) -> bool {
        self.get(identity).is_some()
    }

    /// Iterates records in request order.
    pub fn iter(&self) -> impl Iterator<Item = (&SourceId, Result<&Value, &LoadError>)> {
        self.order.iter().filter_map(move |id| {
            self.entries
                .get(id)
                .map(|result| (id, result.as_ref().map(|v| v.as_ref())))
        })
    }

    /// Iterates successfully loaded records in request order.
    pub fn values(&self) -> impl Iterator<Item = (&SourceId, &Value)> {
        self.iter()
            .filter_map(|(id, result)| result.ok().map(|value| (id, value)))
    }

    /// Iterates load errors in request order.
    pub fn failed(&self) -> impl Iterator<Item = &LoadError> {
        self.iter().filter_map(|(_, result)| result.err())
    }

    /// Canonical identities in request order.
    pub fn ids(&self) -> &[SourceId] {
        &self.order
    }

    /// Number of records in the batch (loaded or failed).
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Everything a `load_many` call produced.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// Per-identity results.
    pub payloads: LoadedPayloads,
    /// Counters for this call.
    pub stats: LoadStats,
    /// Set when cancellation stopped the batch before every identity started.
    pub cancelled: Option<CancellationError>,
}

impl LoadOutcome {
    /// Returns true if the batch was cut short.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.is_some()
    }
}

/// A resolution strategy run over a whole loaded batch.
///
/// Resolvers only look things up in the payloads they are given; reading
/// more records from inside a resolver defeats the batching.
///
/// Any `Fn(&LoadedPayloads) -> Vec<T>` is a resolver.
pub trait BatchResolver {
    /// Resolved entity type.
    type Output;

    /// Resolves the batch.
    fn resolve(&self, payloads: &LoadedPayloads) -> Vec<Self::Output>;
}

impl<F, T> BatchResolver for F
where
    F: Fn(&LoadedPayloads) -> Vec<T>,
{
    type Output = T;

    fn resolve(&self, payloads: &LoadedPayloads) -> Vec<T> {
        self(payloads)
    }
}

enum Step {
    Reused(Arc<Value>),
    Parsed {
        value: Arc<Value>,
        fingerprint: Fingerprint,
    },
    Failed(LoadError),
    Skipped,
}

/// Bulk-first facade over a backing store, a parser and a parse cache.
///
/// The repository exclusively owns its cache. One repository serves one data
/// session (an open campaign); call [`begin_session`](Self::begin_session)
/// when switching so nothing from the previous session leaks into the next.
pub struct BatchRepository<S, P = JsonSourceParser> {
    id: u64,
    store: S,
    parser: P,
    cache: ParseCache,
    config: RepositoryConfig,
    metrics: RepositoryMetrics,
}

impl<S: BackingStore> BatchRepository<S, JsonSourceParser> {
    /// Creates a repository with the JSON parser and default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, RepositoryConfig::default())
    }

    /// Creates a repository with the JSON parser.
    pub fn with_config(store: S, config: RepositoryConfig) -> Self {
        Self::with_parser(store, JsonSourceParser::new(), config)
    }
}

impl<S: BackingStore, P: SourceParser> BatchRepository<S, P> {
    /// Creates a repository with a custom parser.
    pub fn with_parser(store: S, parser: P, config: RepositoryConfig) -> Self {
        Self {
            id: NEXT_REPOSITORY_ID.fetch_add(1, Ordering::Relaxed),
            store,
            parser,
            cache: ParseCache::with_capacity(config.capacity()),
            config,
            metrics: RepositoryMetrics::default(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Returns the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the parser.
    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// Loads a batch of records.
    ///
    /// Identities are first mapped through
    /// [`BackingStore::canonicalize`], so two spellings of one record count
    /// as one. Each distinct identity is probed once. A cached value is reused when
    /// its fingerprint still matches; otherwise the record is read, parsed
    /// and cached. Failures are reported per identity and never abort the
    /// batch.
    pub fn load_many(&self, identities: &[SourceId]) -> LoadOutcome {
        self.load_many_cancellable(identities, &CancellationToken::new())
    }

    /// Loads a batch of records, checking `token` before each one.
    ///
    /// On cancellation the outcome holds every record that finished and lists
    /// the ones never started. A started record is either fully written to
    /// the cache or not at all.
    pub fn load_many_cancellable(
        &self,
        identities: &[SourceId],
        token: &CancellationToken,
    ) -> LoadOutcome {
        let generation = self.cache.generation();

        let keys: Vec<SourceId> = identities
            .iter()
            .map(|id| self.store.canonicalize(id))
            .collect();
        let mut seen = HashSet::with_capacity(keys.len());
        let unique: Vec<&SourceId> = keys.iter().filter(|id| seen.insert(*id)).collect();

        let run = |identity: &SourceId| -> Step {
            if token.is_cancelled() {
                Step::Skipped
            } else {
                self.load_one(identity)
            }
        };

        let steps: Vec<Step> =
            if self.config.parallel && unique.len() >= self.config.parallel_threshold {
                unique.par_iter().map(|&id| run(id)).collect()
            } else {
                unique.iter().map(|&id| run(id)).collect()
            };

        // Cache writes are applied serially, after all I/O, and only while
        // the generation the batch started under is still current.
        let mut payloads = LoadedPayloads::new(self.id, generation);
        for (requested, key) in identities.iter().zip(&keys) {
            payloads.alias(requested, key);
        }
        let mut stats = LoadStats {
            requested: identities.len(),
            unique: unique.len(),
            ..LoadStats::default()
        };
        let mut skipped = Vec::new();
        let mut misses = 0;
        let mut session_switched = false;

        for (identity, step) in unique.into_iter().zip(steps) {
            match step {
                Step::Reused(value) => {
                    stats.reused += 1;
                    payloads.insert(identity.clone(), Ok(value));
                }
                Step::Parsed { value, fingerprint } => {
                    stats.parsed += 1;
                    misses += 1;
                    session_switched |= self
                        .cache
                        .put_if_generation(
                            generation,
                            identity.clone(),
                            Arc::clone(&value),
                            fingerprint,
                        )
                        .is_none();
                    payloads.insert(identity.clone(), Ok(value));
                }
                Step::Failed(error) => {
                    stats.failed += 1;
                    misses += 1;
                    debug!("{}", error);
                    self.cache.invalidate_if_generation(generation, identity);
                    payloads.insert(identity.clone(), Err(error));
                }
                Step::Skipped => {
                    stats.skipped += 1;
                    skipped.push(identity.clone());
                }
            }
        }

        if session_switched {
            warn!("Session switched during batch load; results were not cached");
        }

        self.metrics.record_batch(&stats, misses);

        info!(
            "Batch load: {} requested, {} unique, {} reused, {} parsed, {} failed",
            stats.requested, stats.unique, stats.reused, stats.parsed, stats.failed
        );

        let cancelled = if skipped.is_empty() {
            None
        } else {
            warn!(
                "Batch load cancelled with {} of {} sources not started",
                skipped.len(),
                stats.unique
            );
            Some(CancellationError {
                requested: stats.unique,
                completed: stats.unique - skipped.len(),
                skipped,
            })
        };

        LoadOutcome {
            payloads,
            stats,
            cancelled,
        }
    }

    fn load_one(&self, identity: &SourceId) -> Step {
        let probe = match self.store.probe(identity) {
            Ok(probe) => probe,
            Err(e) => return Step::Failed(e),
        };

        if let Some(entry) = self.cache.get(identity)
            && entry.is_current(&probe.fingerprint)
        {
            debug!("Reusing cached {}", identity);
            return Step::Reused(Arc::clone(&entry.value));
        }

        let bytes = match probe.bytes {
            Some(bytes) => bytes,
            None => match self.store.read(identity) {
                Ok(bytes) => bytes,
                Err(e) => return Step::Failed(e),
            },
        };

        match self.parser.parse(identity, &bytes) {
            Ok(value) => Step::Parsed {
                value: Arc::new(value),
                fingerprint: probe.fingerprint,
            },
            Err(e) => Step::Failed(LoadError::parse(e)),
        }
    }

    /// Reads and parses records without touching the cache.
    ///
    /// Every call performs a physical read per identity. This is the
    /// one-file-per-lookup path the batch API exists to replace; it is kept
    /// for benchmarking.
    pub fn load_uncached(&self, identities: &[SourceId]) -> LoadedPayloads {
        let mut payloads = LoadedPayloads::new(self.id, self.cache.generation());
        for identity in identities {
            let result = self
                .store
                .read(identity)
                .and_then(|bytes| {
                    self.parser
                        .parse(identity, &bytes)
                        .map_err(LoadError::parse)
                })
                .map(Arc::new);
            payloads.insert(identity.clone(), result);
        }
        payloads
    }

    /// Runs `resolver` once over `payloads`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Contract`] if the payloads were not loaded by
    /// this repository in the current session.
    pub fn resolve_many<R>(
        &self,
        payloads: &LoadedPayloads,
        resolver: &R,
    ) -> Result<Vec<R::Output>, CoreError>
    where
        R: BatchResolver + ?Sized,
    {
        if payloads.origin != self.id {
            return Err(CoreError::contract(
                "payloads were loaded by a different repository",
            ));
        }

        if payloads.generation != self.cache.generation() {
            return Err(CoreError::contract(
                "payloads were loaded before the cache was invalidated",
            ));
        }

        Ok(resolver.resolve(payloads))
    }

    /// Drops the cached value of one record.
    pub fn invalidate(&self, identity: &SourceId) -> bool {
        self.cache.invalidate(&self.store.canonicalize(identity))
    }

    /// Drops every cached value.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Starts a new data session (e.g. a different campaign).
    pub fn begin_session(&self, label: &str) {
        info!("Starting session '{}', discarding {} cached records", label, self.cache.len());
        self.cache.invalidate_all();
    }

    /// Returns the cached entry for a record, without probing the store.
    pub fn cached(&self, identity: &SourceId) -> Option<Arc<CacheEntry>> {
        self.cache.get(&self.store.canonicalize(identity))
    }

    /// Returns the cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Returns the repository counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.cache.len())
    }
}
