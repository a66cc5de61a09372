//! Naive versus batch resolution timing.

use std::fmt;
use std::slice;
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};
use tracing::info;
use wingmate_parser::{JsonSourceParser, SourceParser};

use crate::error::CoreError;
use crate::repository::BatchRepository;
use crate::resolution::{PersonRef, PersonnelResolutionService, PersonnelResolver};
use crate::store::BackingStore;
use crate::telemetry::TelemetrySink;

/// Runs per strategy when none is configured.
pub const DEFAULT_RUNS: usize = 3;

/// Relative time saved by the batch strategy, in percent.
///
/// Zero when `naive` is zero.
pub fn gain_pct(naive: Duration, batch: Duration) -> f64 {
    let naive = naive.as_nanos() as f64;
    if naive == 0.0 {
        return 0.0;
    }
    (naive - batch.as_nanos() as f64) * 100.0 / naive
}

fn millis(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(millis(*duration))
}

/// Timings of one benchmark scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResult {
    /// Label of the input set, usually the campaign name.
    pub scenario: String,
    /// Entities resolved per run.
    pub entities: usize,
    /// Runs per strategy.
    pub runs: usize,
    /// Total over all runs of the per-entity strategy.
    #[serde(rename = "naive_ms", serialize_with = "as_millis")]
    pub naive_elapsed: Duration,
    /// Total over all runs of the batch strategy.
    #[serde(rename = "batch_ms", serialize_with = "as_millis")]
    pub batch_elapsed: Duration,
    /// Time saved by the batch strategy, as a percentage of the naive time.
    pub gain_pct: f64,
}

impl BenchmarkResult {
    /// Result for a scenario with nothing to resolve.
    pub fn empty(scenario: impl Into<String>, runs: usize) -> Self {
        Self {
            scenario: scenario.into(),
            entities: 0,
            runs,
            naive_elapsed: Duration::ZERO,
            batch_elapsed: Duration::ZERO,
            gain_pct: 0.0,
        }
    }

    /// Naive total in milliseconds.
    pub fn naive_ms(&self) -> f64 {
        millis(self.naive_elapsed)
    }

    /// Batch total in milliseconds.
    pub fn batch_ms(&self) -> f64 {
        millis(self.batch_elapsed)
    }

    /// Sends the timings to `sink`.
    pub fn emit(&self, sink: &dyn TelemetrySink) {
        sink.record("benchmark_entities", self.entities as f64);
        sink.record("benchmark_naive_ms", self.naive_ms());
        sink.record("benchmark_batch_ms", self.batch_ms());
        sink.record("gain_pct", self.gain_pct);
    }
}

impl fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} entities x {} runs, naive {:.2}ms, batch {:.2}ms, gain {:.1}%",
            self.scenario,
            self.entities,
            self.runs,
            self.naive_ms(),
            self.batch_ms(),
            self.gain_pct
        )
    }
}

/// Times per-entity loading against batch loading over the same input.
///
/// The naive strategy reads and parses every source of every entity on its
/// own, bypassing the cache. The batch strategy clears the cache before each
/// run and resolves the whole input with one `load_many`, so neither
/// strategy benefits from the other's work.
pub struct BenchmarkHarness<'r, S, P = JsonSourceParser> {
    repository: &'r BatchRepository<S, P>,
    runs: usize,
}

impl<'r, S: BackingStore, P: SourceParser> BenchmarkHarness<'r, S, P> {
    /// Creates a harness running [`DEFAULT_RUNS`] runs per strategy.
    pub fn new(repository: &'r BatchRepository<S, P>) -> Self {
        Self {
            repository,
            runs: DEFAULT_RUNS,
        }
    }

    /// Sets the number of runs per strategy (at least one).
    pub fn with_runs(mut self, runs: usize) -> Self {
        self.runs = runs.max(1);
        self
    }

    /// Runs per strategy.
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Times both strategies over `people`.
    ///
    /// The batch runs call [`BatchRepository::invalidate_all`] on the
    /// repository this harness was built with. Afterwards its cache holds
    /// only what the last batch run loaded, and any [`LoadedPayloads`] taken
    /// from it before the call are rejected by `resolve_many`.
    ///
    /// [`LoadedPayloads`]: crate::LoadedPayloads
    pub fn benchmark(
        &self,
        scenario: &str,
        people: &[PersonRef],
    ) -> Result<BenchmarkResult, CoreError> {
        if people.is_empty() {
            return Ok(BenchmarkResult::empty(scenario, self.runs));
        }

        let mut naive_elapsed = Duration::ZERO;
        for _ in 0..self.runs {
            let start = Instant::now();
            self.run_naive(people)?;
            naive_elapsed += start.elapsed();
        }

        let service = PersonnelResolutionService::new(self.repository);
        let mut batch_elapsed = Duration::ZERO;
        for _ in 0..self.runs {
            self.repository.invalidate_all();
            let start = Instant::now();
            service.resolve(people)?;
            batch_elapsed += start.elapsed();
        }

        let result = BenchmarkResult {
            scenario: scenario.to_string(),
            entities: people.len(),
            runs: self.runs,
            naive_elapsed,
            batch_elapsed,
            gain_pct: gain_pct(naive_elapsed, batch_elapsed),
        };
        info!("{}", result);
        Ok(result)
    }

    fn run_naive(&self, people: &[PersonRef]) -> Result<(), CoreError> {
        for person in people {
            let sources: Vec<_> = person.sources().cloned().collect();
            let payloads = self.repository.load_uncached(&sources);
            self.repository
                .resolve_many(&payloads, &PersonnelResolver::new(slice::from_ref(person)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepositoryConfig;
    use crate::store::MemoryStore;
    use crate::telemetry::test_sink::RecordingSink;
    use std::sync::Arc;
    use wingmate_parser::SourceId;

    #[test]
    fn test_gain_pct() {
        assert_eq!(
            gain_pct(Duration::from_millis(100), Duration::from_millis(40)),
            60.0
        );
        assert_eq!(
            gain_pct(Duration::from_millis(100), Duration::from_millis(100)),
            0.0
        );
    }

    #[test]
    fn test_gain_pct_zero_naive() {
        assert_eq!(gain_pct(Duration::ZERO, Duration::from_millis(5)), 0.0);
        assert_eq!(gain_pct(Duration::ZERO, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_gain_pct_negative_when_batch_slower() {
        assert!(gain_pct(Duration::from_millis(10), Duration::from_millis(20)) < 0.0);
    }

    #[test]
    fn test_runs_clamped() {
        let repo = BatchRepository::new(MemoryStore::new());
        assert_eq!(BenchmarkHarness::new(&repo).runs(), DEFAULT_RUNS);
        assert_eq!(BenchmarkHarness::new(&repo).with_runs(0).runs(), 1);
    }

    #[test]
    fn test_empty_input() {
        let repo = BatchRepository::new(MemoryStore::new());
        let result = BenchmarkHarness::new(&repo).benchmark("empty", &[]).unwrap();
        assert_eq!(result, BenchmarkResult::empty("empty", DEFAULT_RUNS));
        assert_eq!(result.gain_pct, 0.0);
    }

    #[test]
    fn test_naive_bypasses_cache_and_batch_reads_once_per_run() {
        let store = Arc::new(MemoryStore::new());
        store.insert(
            "roster.json",
            r#"{"squadronMemberCollection": {"1": {"name": "A"}, "2": {"name": "B"}}}"#,
        );
        store.insert("medals.json", r#"{"medals": []}"#);
        let repo = BatchRepository::with_config(
            Arc::clone(&store),
            RepositoryConfig::default().with_parallel(false),
        );
        let people = vec![
            PersonRef::new("1", "roster.json").with_medal_table("medals.json"),
            PersonRef::new("2", "roster.json").with_medal_table("medals.json"),
        ];

        let result = BenchmarkHarness::new(&repo)
            .with_runs(2)
            .benchmark("two", &people)
            .unwrap();

        assert_eq!(result.entities, 2);
        assert_eq!(result.runs, 2);
        // naive: 2 runs x 2 people x 2 sources; batch: 2 runs x 2 sources
        assert_eq!(store.total_reads(), 8 + 4);
    }

    #[test]
    fn test_benchmark_resets_the_repository_cache() {
        let store = Arc::new(MemoryStore::new());
        store.insert("roster.json", r#"{"squadronMemberCollection": {"1": {"name": "A"}}}"#);
        store.insert("warm.json", "{}");
        let repo = BatchRepository::with_config(
            Arc::clone(&store),
            RepositoryConfig::default().with_parallel(false),
        );
        let held = repo.load_many(&[SourceId::from("warm.json")]).payloads;

        BenchmarkHarness::new(&repo)
            .with_runs(1)
            .benchmark("one", &[PersonRef::new("1", "roster.json")])
            .unwrap();

        assert!(repo.cached(&SourceId::from("warm.json")).is_none());
        assert!(repo.cached(&SourceId::from("roster.json")).is_some());
        let count = |p: &crate::LoadedPayloads| vec![p.len()];
        assert!(matches!(
            repo.resolve_many(&held, &count),
            Err(CoreError::Contract(_))
        ));
    }

    #[test]
    fn test_serialize_and_emit() {
        let result = BenchmarkResult {
            scenario: "s".to_string(),
            entities: 3,
            runs: 1,
            naive_elapsed: Duration::from_millis(100),
            batch_elapsed: Duration::from_millis(40),
            gain_pct: 60.0,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["naive_ms"], 100.0);
        assert_eq!(json["batch_ms"], 40.0);
        assert_eq!(json["gain_pct"], 60.0);

        let sink = RecordingSink::default();
        result.emit(&sink);
        assert_eq!(sink.value("gain_pct"), Some(60.0));
        assert_eq!(sink.value("benchmark_entities"), Some(3.0));
    }
}
