//! Personnel country and medal resolution.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};
use wingmate_parser::{JsonSourceParser, SourceId, SourceParser};

use super::country::Country;
use super::fields::{first_string, text};
use crate::cancel::CancellationToken;
use crate::error::{CancellationError, CoreError, PartialResolution};
use crate::repository::{BatchRepository, BatchResolver, LoadStats, LoadedPayloads};
use crate::store::BackingStore;

const MEMBER_COLLECTION: &str = "squadronMemberCollection";

/// A person to resolve and the records describing them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PersonRef {
    /// Serial key in the roster, or the person's name.
    pub person: String,
    /// Personnel file holding the person's roster entry.
    pub roster: SourceId,
    /// Medal tables used to describe the person's decorations.
    pub medal_tables: Vec<SourceId>,
}

impl PersonRef {
    /// Creates a reference with no medal tables.
    pub fn new(person: impl Into<String>, roster: impl Into<SourceId>) -> Self {
        Self {
            person: person.into(),
            roster: roster.into(),
            medal_tables: Vec::new(),
        }
    }

    /// Adds a medal table.
    pub fn with_medal_table(mut self, table: impl Into<SourceId>) -> Self {
        self.medal_tables.push(table.into());
        self
    }

    /// Every source this person references, roster first.
    pub fn sources(&self) -> impl Iterator<Item = &SourceId> {
        std::iter::once(&self.roster).chain(self.medal_tables.iter())
    }
}

/// A decoration held by a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMedal {
    /// Stable medal id, e.g. `"iron_cross"`.
    pub id: String,
    /// Display name, if any source had one.
    pub name: Option<String>,
    /// Awarding country, if a medal table declared it.
    pub country: Option<Country>,
    /// Image file name.
    pub image: Option<String>,
}

impl ResolvedMedal {
    fn bare(id: String) -> Self {
        Self {
            id,
            name: None,
            country: None,
            image: None,
        }
    }

    /// Applies a medal table description. The roster image is kept when set.
    fn merge(&mut self, other: &ResolvedMedal) {
        if other.name.is_some() {
            self.name.clone_from(&other.name);
        }
        if other.country.is_some() {
            self.country = other.country;
        }
        if self.image.is_none() {
            self.image.clone_from(&other.image);
        }
    }
}

/// A person with their derived attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPerson {
    /// The reference this result answers.
    pub person: String,
    /// Name as spelled in the roster, or the reference when not found.
    pub display_name: String,
    /// Whether a roster entry matched.
    pub found: bool,
    /// Normalised country.
    pub country: Country,
    /// Decorations in roster order, without duplicates.
    pub medals: Vec<ResolvedMedal>,
    /// Set when a referenced source failed to load.
    pub partial: Option<PartialResolution>,
}

impl ResolvedPerson {
    /// Returns true if at least one referenced source was unavailable.
    pub fn is_partial(&self) -> bool {
        self.partial.is_some()
    }

    /// Medal ids in roster order.
    pub fn medal_ids(&self) -> impl Iterator<Item = &str> {
        self.medals.iter().map(|m| m.id.as_str())
    }
}

/// Result of a personnel batch.
#[derive(Debug, Clone)]
pub struct PersonnelBatch {
    /// One entry per input reference, in input order.
    pub people: Vec<ResolvedPerson>,
    /// Counters from the single load.
    pub stats: LoadStats,
    /// Set when the load was cancelled early.
    pub cancelled: Option<CancellationError>,
}

impl PersonnelBatch {
    /// Number of people resolved with missing sources.
    pub fn partial_count(&self) -> usize {
        self.people.iter().filter(|p| p.is_partial()).count()
    }
}

/// Country and decorations of a single pilot found by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PilotResolution {
    /// Normalised country, Germany when the pilot was not found.
    pub country: Country,
    /// Medal ids the pilot holds.
    pub earned_medal_ids: BTreeSet<String>,
    /// Personnel file the pilot was found in.
    pub source: Option<SourceId>,
}

impl Default for PilotResolution {
    fn default() -> Self {
        Self {
            country: Country::default(),
            earned_medal_ids: BTreeSet::new(),
            source: None,
        }
    }
}

/// Batch resolver for a fixed list of [`PersonRef`]s.
///
/// Builds one index per roster and per medal table, then answers every
/// reference from memory.
#[derive(Debug, Clone, Copy)]
pub struct PersonnelResolver<'a> {
    people: &'a [PersonRef],
}

impl<'a> PersonnelResolver<'a> {
    /// Creates a resolver for `people`.
    pub fn new(people: &'a [PersonRef]) -> Self {
        Self { people }
    }
}

impl BatchResolver for PersonnelResolver<'_> {
    type Output = ResolvedPerson;

    fn resolve(&self, payloads: &LoadedPayloads) -> Vec<ResolvedPerson> {
        let mut rosters: HashMap<&SourceId, RosterIndex<'_>> = HashMap::new();
        let mut tables: HashMap<&SourceId, HashMap<String, ResolvedMedal>> = HashMap::new();

        for person in self.people {
            if !rosters.contains_key(&person.roster)
                && let Some(value) = payloads.get(&person.roster)
            {
                rosters.insert(&person.roster, RosterIndex::build(value));
            }
            for table in &person.medal_tables {
                if !tables.contains_key(table)
                    && let Some(value) = payloads.get(table)
                {
                    tables.insert(table, index_medal_table(value));
                }
            }
        }

        self.people
            .iter()
            .map(|person| {
                let mut seen = HashSet::new();
                let missing: Vec<SourceId> = person
                    .sources()
                    .filter(|id| !payloads.is_loaded(id) && seen.insert(*id))
                    .cloned()
                    .collect();

                let partial = (!missing.is_empty()).then(|| PartialResolution {
                    entity: person.person.clone(),
                    missing_sources: missing,
                });

                let member = rosters
                    .get(&person.roster)
                    .and_then(|index| index.find(&person.person));

                let Some(member) = member else {
                    return ResolvedPerson {
                        person: person.person.clone(),
                        display_name: person.person.trim().to_string(),
                        found: false,
                        country: Country::default(),
                        medals: Vec::new(),
                        partial,
                    };
                };

                let person_tables: Vec<&HashMap<String, ResolvedMedal>> = person
                    .medal_tables
                    .iter()
                    .filter_map(|t| tables.get(t))
                    .collect();

                let medals = member_medals(member)
                    .into_iter()
                    .map(|mut medal| {
                        if let Some(known) =
                            person_tables.iter().find_map(|table| table.get(&medal.id))
                        {
                            medal.merge(known);
                        }
                        medal
                    })
                    .collect();

                ResolvedPerson {
                    person: person.person.clone(),
                    display_name: text(member.get("name"))
                        .unwrap_or_else(|| person.person.trim().to_string()),
                    found: true,
                    country: member_country(member),
                    medals,
                    partial,
                }
            })
            .collect()
    }
}

/// Resolves personnel attributes with one load per batch.
pub struct PersonnelResolutionService<'r, S, P = JsonSourceParser> {
    repository: &'r BatchRepository<S, P>,
}

impl<'r, S: BackingStore, P: SourceParser> PersonnelResolutionService<'r, S, P> {
    /// Creates a service over `repository`.
    pub fn new(repository: &'r BatchRepository<S, P>) -> Self {
        Self { repository }
    }

    /// Union of every source referenced by `people`, in first-seen order.
    pub fn required_sources(&self, people: &[PersonRef]) -> Vec<SourceId> {
        let mut seen = HashSet::new();
        people
            .iter()
            .flat_map(PersonRef::sources)
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect()
    }

    /// Resolves `people`. The output has exactly one entry per input.
    pub fn resolve(&self, people: &[PersonRef]) -> Result<PersonnelBatch, CoreError> {
        self.resolve_cancellable(people, &CancellationToken::new())
    }

    /// Resolves `people`, stopping the load when `token` is cancelled.
    ///
    /// People whose sources were skipped come back partial.
    pub fn resolve_cancellable(
        &self,
        people: &[PersonRef],
        token: &CancellationToken,
    ) -> Result<PersonnelBatch, CoreError> {
        let sources = self.required_sources(people);
        let batch = super::resolve_batch(
            self.repository,
            &sources,
            &PersonnelResolver::new(people),
            token,
        )?;

        let result = PersonnelBatch {
            people: batch.items,
            stats: batch.stats,
            cancelled: batch.cancelled,
        };
        info!(
            "Resolved {} people from {} sources ({} partial)",
            result.people.len(),
            sources.len(),
            result.partial_count()
        );
        Ok(result)
    }

    /// Lists every member of `rosters` as a reference, in roster order.
    ///
    /// Each reference points at `medal_tables`. Rosters that fail to load
    /// contribute nothing.
    pub fn roster_members(
        &self,
        rosters: &[SourceId],
        medal_tables: &[SourceId],
    ) -> Result<Vec<PersonRef>, CoreError> {
        let outcome = self.repository.load_many(rosters);
        let list = |payloads: &LoadedPayloads| -> Vec<PersonRef> {
            payloads
                .values()
                .flat_map(|(roster, value)| {
                    members(value).map(move |(serial, _)| PersonRef {
                        person: serial.to_string(),
                        roster: roster.clone(),
                        medal_tables: medal_tables.to_vec(),
                    })
                })
                .collect()
        };
        self.repository.resolve_many(&outcome.payloads, &list)
    }

    /// Finds a pilot by name across every personnel file of a campaign.
    ///
    /// The first file (in the given order) holding a member with that name
    /// wins. An empty name or no match yields the default resolution.
    pub fn resolve_pilot(
        &self,
        personnel_files: &[SourceId],
        pilot_name: &str,
    ) -> Result<PilotResolution, CoreError> {
        let wanted = normalize_name(pilot_name);
        if wanted.is_empty() {
            return Ok(PilotResolution::default());
        }

        let outcome = self.repository.load_many(personnel_files);
        info!(
            "Batch personnel: {} requested, {} loaded",
            outcome.stats.requested,
            outcome.stats.loaded()
        );
        for error in outcome.payloads.failed() {
            warn!("{}", error);
        }

        let find_pilot = |payloads: &LoadedPayloads| -> Vec<PilotResolution> {
            payloads
                .values()
                .filter_map(|(id, value)| {
                    let (_, member) = members(value).find(|(_, m)| {
                        text(m.get("name")).is_some_and(|n| normalize_name(&n) == wanted)
                    })?;
                    Some(PilotResolution {
                        country: member_country(member),
                        earned_medal_ids: member_medals(member)
                            .into_iter()
                            .map(|m| m.id)
                            .collect(),
                        source: Some(id.clone()),
                    })
                })
                .collect()
        };

        let matches = self.repository.resolve_many(&outcome.payloads, &find_pilot)?;
        Ok(match matches.into_iter().next() {
            Some(found) => {
                info!(
                    "Resolved pilot: country={}, {} medals",
                    found.country.code(),
                    found.earned_medal_ids.len()
                );
                found
            }
            None => PilotResolution::default(),
        })
    }
}

struct RosterIndex<'v> {
    by_serial: HashMap<&'v str, &'v Map<String, Value>>,
    by_name: HashMap<String, &'v Map<String, Value>>,
}

impl<'v> RosterIndex<'v> {
    fn build(value: &'v Value) -> Self {
        let mut by_serial = HashMap::new();
        let mut by_name = HashMap::new();
        for (serial, member) in members(value) {
            by_serial.insert(serial, member);
            if let Some(name) = text(member.get("name")) {
                by_name.entry(normalize_name(&name)).or_insert(member);
            }
        }
        Self { by_serial, by_name }
    }

    fn find(&self, person: &str) -> Option<&'v Map<String, Value>> {
        self.by_serial
            .get(person.trim())
            .or_else(|| self.by_name.get(&normalize_name(person)))
            .copied()
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Roster members as `(serial, member)` pairs.
fn members(value: &Value) -> impl Iterator<Item = (&str, &Map<String, Value>)> {
    value
        .get(MEMBER_COLLECTION)
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|collection| collection.iter())
        .filter_map(|(serial, member)| member.as_object().map(|m| (serial.as_str(), m)))
}

fn member_country(member: &Map<String, Value>) -> Country {
    Country::normalize(text(member.get("country")).as_deref())
}

/// Medals listed on a roster entry, deduplicated by id.
fn member_medals(member: &Map<String, Value>) -> Vec<ResolvedMedal> {
    let mut seen = HashSet::new();
    member
        .get("medals")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .filter_map(|entry| {
            let id = medal_id(entry)?;
            seen.insert(id.clone()).then(|| ResolvedMedal {
                id,
                name: first_string(entry, &["medalName"]),
                country: None,
                image: first_string(entry, &["medalImage"]),
            })
        })
        .collect()
}

/// `medalImage` without its `.png` suffix, else `medalName` in snake case.
fn medal_id(entry: &Map<String, Value>) -> Option<String> {
    if let Some(mut image) = first_string(entry, &["medalImage"]) {
        let stem_len = image.len().saturating_sub(4);
        if image
            .get(stem_len..)
            .is_some_and(|suffix| suffix.eq_ignore_ascii_case(".png"))
        {
            image.truncate(stem_len);
        }
        return Some(image);
    }

    first_string(entry, &["medalName"]).map(|name| name.to_lowercase().replace(' ', "_"))
}

/// Indexes a medal table by id.
///
/// Accepts `{"medals": [{"id", ...}]}` or an object keyed by id.
fn index_medal_table(value: &Value) -> HashMap<String, ResolvedMedal> {
    let describe = |id: String, entry: &Map<String, Value>| {
        let mut medal = ResolvedMedal::bare(id);
        medal.name = first_string(entry, &["name", "medalName"]);
        medal.country = first_string(entry, &["country"]).and_then(|c| Country::from_alias(&c));
        medal.image = first_string(entry, &["image", "medalImage"]);
        (medal.id.clone(), medal)
    };

    match value.get("medals") {
        Some(Value::Array(list)) => list
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|entry| {
                let id = first_string(entry, &["id"]).or_else(|| medal_id(entry))?;
                Some(describe(id, entry))
            })
            .collect(),
        _ => value
            .as_object()
            .into_iter()
            .flatten()
            .filter_map(|(id, entry)| entry.as_object().map(|e| describe(id.clone(), e)))
            .collect(),
    }
}
