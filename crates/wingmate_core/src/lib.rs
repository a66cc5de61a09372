//! # wingmate_core
//!
//! Batch-first data access for campaign records.
//!
//! This crate provides:
//! - The `BatchRepository` with `load_many` / `resolve_many`
//! - Backing stores (filesystem and in-memory)
//! - Personnel and squadron resolution services
//! - The naive versus batch benchmark harness
//! - Repository configuration
//!
//! ## Example
//!
//! ```rust,ignore
//! use wingmate_core::{BatchRepository, CampaignLayout, FsStore, PersonnelResolutionService};
//!
//! let layout = CampaignLayout::new("/games/PWCGFC");
//! let repository = BatchRepository::new(FsStore::new());
//! let service = PersonnelResolutionService::new(&repository);
//!
//! let files = layout.personnel_files("Arras");
//! let pilot = service.resolve_pilot(&files, "Werner Voss")?;
//! println!("{}: {} medals", pilot.country, pilot.earned_medal_ids.len());
//! ```

pub mod benchmark;
mod campaign;
mod cancel;
mod config;
mod error;
mod repository;
pub mod resolution;
mod store;
mod telemetry;

pub use benchmark::{BenchmarkHarness, BenchmarkResult, gain_pct};
pub use campaign::{CampaignLayout, json_files};
pub use cancel::CancellationToken;
pub use config::{DEFAULT_MAX_FILE_SIZE, FingerprintMode, RepositoryConfig};
pub use error::{CancellationError, CoreError, LoadError, LoadErrorKind, PartialResolution};
pub use repository::{BatchRepository, BatchResolver, LoadOutcome, LoadStats, LoadedPayloads};
pub use resolution::{
    Country, PersonRef, PersonnelBatch, PersonnelResolutionService, ResolvedBatch, ResolvedPerson,
    ResolvedSquadron, SquadronRef, SquadronResolver, resolve_batch,
};
pub use store::{BackingStore, FsStore, MemoryStore, Probe};
pub use telemetry::{MetricsSnapshot, TelemetrySink, TracingSink};

pub use wingmate_cache::{CacheEntry, CacheStats, Fingerprint};
pub use wingmate_parser::{JsonSourceParser, ParseError, SourceId, SourceParser, Value};
