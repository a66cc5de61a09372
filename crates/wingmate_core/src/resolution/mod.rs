//! Domain resolution built on the batch repository.
//!
//! Every service here follows the same shape: collect the union of sources a
//! batch of entities needs, load them with a single `load_many`, then hand
//! the payloads to a resolver through `resolve_many`.

mod country;
mod fields;
mod personnel;
mod squadron;

pub use country::Country;
pub use personnel::{
    PersonRef, PersonnelBatch, PersonnelResolutionService, PersonnelResolver, PilotResolution,
    ResolvedMedal, ResolvedPerson,
};
pub use squadron::{AirfieldSpan, ResolvedSquadron, SquadronRef, SquadronResolver};

use tracing::debug;
use wingmate_parser::{SourceId, SourceParser};

use crate::cancel::CancellationToken;
use crate::error::{CancellationError, CoreError};
use crate::repository::{BatchRepository, BatchResolver, LoadStats};
use crate::store::BackingStore;

/// Resolved entities together with the load counters of their batch.
#[derive(Debug, Clone)]
pub struct ResolvedBatch<T> {
    /// One item per input entity, in input order.
    pub items: Vec<T>,
    /// Counters from the single `load_many` call.
    pub stats: LoadStats,
    /// Set when the load was cancelled before every source started.
    pub cancelled: Option<CancellationError>,
}

/// Loads `sources` once and runs `resolver` over the result.
pub fn resolve_batch<S, P, R>(
    repository: &BatchRepository<S, P>,
    sources: &[SourceId],
    resolver: &R,
    token: &CancellationToken,
) -> Result<ResolvedBatch<R::Output>, CoreError>
where
    S: BackingStore,
    P: SourceParser,
    R: BatchResolver + ?Sized,
{
    let outcome = repository.load_many_cancellable(sources, token);
    let items = repository.resolve_many(&outcome.payloads, resolver)?;
    debug!("Resolved {} entities from {} sources", items.len(), outcome.stats.unique);

    Ok(ResolvedBatch {
        items,
        stats: outcome.stats,
        cancelled: outcome.cancelled,
    })
}
