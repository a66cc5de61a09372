//! Squadron name, country and airfield history resolution.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;
use wingmate_parser::{JsonSourceParser, SourceId, SourceParser};

use super::country::Country;
use super::fields::{first_string, first_text, text};
use super::{ResolvedBatch, resolve_batch};
use crate::cancel::CancellationToken;
use crate::error::{CoreError, PartialResolution};
use crate::repository::{BatchRepository, LoadedPayloads};
use crate::store::BackingStore;

const NAME_KEYS: &[&str] = &["squadronName", "name", "displayName", "id", "squadron_id"];
const COUNTRY_KEYS: &[&str] = &["country", "nation", "countryCode"];

/// A squadron and the record describing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SquadronRef {
    /// Squadron id, usually the record's file stem.
    pub squadron_id: String,
    /// Squadron record.
    pub source: SourceId,
}

impl SquadronRef {
    /// Creates a reference whose id is the file stem of `source`.
    pub fn from_source(source: impl Into<SourceId>) -> Self {
        let source = source.into();
        let squadron_id = source
            .stem()
            .map(str::to_string)
            .unwrap_or_else(|| source.to_string());
        Self {
            squadron_id,
            source,
        }
    }
}

/// One stay at an airfield. `end` is empty for the current base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AirfieldSpan {
    /// Arrival date as written in the record.
    pub start: String,
    /// Departure date, the next span's start when derived from a dated map.
    pub end: String,
    /// Airfield name.
    pub airfield: String,
}

impl AirfieldSpan {
    fn from_fields(
        start: Option<String>,
        end: Option<String>,
        airfield: Option<String>,
    ) -> Option<Self> {
        Some(Self {
            start: start.unwrap_or_default(),
            end: end.unwrap_or_default(),
            airfield: airfield?,
        })
    }
}

/// A squadron with its derived attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSquadron {
    /// Squadron id from the reference.
    pub id: String,
    /// Display name, the id when the record has none.
    pub name: String,
    /// Country as written in the record.
    pub country: Option<String>,
    /// Airfield history, oldest first.
    pub airfields: Vec<AirfieldSpan>,
    /// Set when the record failed to load.
    #[serde(skip)]
    pub partial: Option<PartialResolution>,
}

impl ResolvedSquadron {
    /// Normalised country, if the record named a known one.
    pub fn country_code(&self) -> Option<Country> {
        self.country.as_deref().and_then(Country::from_alias)
    }

    /// Returns true if the record failed to load.
    pub fn is_partial(&self) -> bool {
        self.partial.is_some()
    }
}

/// Resolves squadron records with one load per batch.
pub struct SquadronResolver<'r, S, P = JsonSourceParser> {
    repository: &'r BatchRepository<S, P>,
}

impl<'r, S: BackingStore, P: SourceParser> SquadronResolver<'r, S, P> {
    /// Creates a resolver over `repository`.
    pub fn new(repository: &'r BatchRepository<S, P>) -> Self {
        Self { repository }
    }

    /// Resolves `squadrons`. The output has exactly one entry per input.
    pub fn resolve(
        &self,
        squadrons: &[SquadronRef],
    ) -> Result<ResolvedBatch<ResolvedSquadron>, CoreError> {
        let mut seen = HashSet::new();
        let sources: Vec<SourceId> = squadrons
            .iter()
            .map(|s| &s.source)
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect();

        let resolver = |payloads: &LoadedPayloads| -> Vec<ResolvedSquadron> {
            squadrons
                .iter()
                .map(|squadron| resolve_squadron(squadron, payloads))
                .collect()
        };

        let batch = resolve_batch(
            self.repository,
            &sources,
            &resolver,
            &CancellationToken::new(),
        )?;
        info!(
            "Resolved {} squadrons from {} sources",
            batch.items.len(),
            sources.len()
        );
        Ok(batch)
    }
}

fn resolve_squadron(squadron: &SquadronRef, payloads: &LoadedPayloads) -> ResolvedSquadron {
    let record = payloads.get(&squadron.source).and_then(Value::as_object);

    let Some(record) = record else {
        let partial = (!payloads.is_loaded(&squadron.source)).then(|| PartialResolution {
            entity: squadron.squadron_id.clone(),
            missing_sources: vec![squadron.source.clone()],
        });
        return ResolvedSquadron {
            id: squadron.squadron_id.clone(),
            name: squadron.squadron_id.clone(),
            country: None,
            airfields: Vec::new(),
            partial,
        };
    };

    ResolvedSquadron {
        id: squadron.squadron_id.clone(),
        name: first_string(record, NAME_KEYS).unwrap_or_else(|| squadron.squadron_id.clone()),
        country: first_string(record, COUNTRY_KEYS),
        airfields: airfield_history(record),
        partial: None,
    }
}

/// Collects airfield stays from every shape campaign files use.
///
/// - `airfields` as an object of start date to airfield, each stay ending
///   where the next one starts;
/// - `airfields` as a list of `{start, end, airfield|base|name}`;
/// - `airfieldHistory` as a list of `{from, to, airfield|name}`;
/// - `bases` as a list of `{startDate, endDate, airfield|base}`, only when
///   nothing else was found.
///
/// Stays without an airfield are dropped.
fn airfield_history(record: &Map<String, Value>) -> Vec<AirfieldSpan> {
    let mut spans = Vec::new();

    match record.get("airfields") {
        Some(Value::Object(by_start)) => {
            let mut dated: Vec<(&String, Option<String>)> = by_start
                .iter()
                .map(|(start, airfield)| (start, text(Some(airfield))))
                .collect();
            dated.sort_by(|a, b| a.0.cmp(b.0));

            for (index, (start, airfield)) in dated.iter().enumerate() {
                let end = dated.get(index + 1).map(|(next, _)| next.trim().to_string());
                spans.extend(AirfieldSpan::from_fields(
                    Some(start.trim().to_string()),
                    end,
                    airfield.clone(),
                ));
            }
        }
        Some(Value::Array(items)) => {
            spans.extend(items.iter().filter_map(Value::as_object).filter_map(|item| {
                AirfieldSpan::from_fields(
                    text(item.get("start")),
                    text(item.get("end")),
                    first_text(item, &["airfield", "base", "name"]),
                )
            }));
        }
        _ => {}
    }

    if let Some(Value::Array(items)) = record.get("airfieldHistory") {
        spans.extend(items.iter().filter_map(Value::as_object).filter_map(|item| {
            AirfieldSpan::from_fields(
                text(item.get("from")),
                text(item.get("to")),
                first_text(item, &["airfield", "name"]),
            )
        }));
    }

    if spans.is_empty()
        && let Some(Value::Array(items)) = record.get("bases")
    {
        spans.extend(items.iter().filter_map(Value::as_object).filter_map(|item| {
            AirfieldSpan::from_fields(
                text(item.get("startDate")),
                text(item.get("endDate")),
                first_text(item, &["airfield", "base"]),
            )
        }));
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn span(start: &str, end: &str, airfield: &str) -> AirfieldSpan {
        AirfieldSpan {
            start: start.to_string(),
            end: end.to_string(),
            airfield: airfield.to_string(),
        }
    }

    #[test]
    fn test_airfields_keyed_by_start_date() {
        let data = record(json!({
            "squadronName": "Jasta 11",
            "airfields": {"19180201": "Base B", "19180101": "Base A"}
        }));

        assert_eq!(
            airfield_history(&data),
            vec![
                span("19180101", "19180201", "Base A"),
                span("19180201", "", "Base B"),
            ]
        );
    }

    #[test]
    fn test_airfields_list_with_alternate_keys() {
        let data = record(json!({"airfields": [
            {"start": "1917", "end": "1918", "base": "Douai"},
            {"start": "1918", "name": "Cappy"},
            {"start": "1918", "airfield": ""}
        ]}));

        assert_eq!(
            airfield_history(&data),
            vec![span("1917", "1918", "Douai"), span("1918", "", "Cappy")]
        );
    }

    #[test]
    fn test_airfield_history_appends() {
        let data = record(json!({
            "airfields": [{"start": "1", "airfield": "A"}],
            "airfieldHistory": [{"from": "2", "to": "3", "name": "B"}]
        }));

        assert_eq!(
            airfield_history(&data),
            vec![span("1", "", "A"), span("2", "3", "B")]
        );
    }

    #[test]
    fn test_bases_only_when_nothing_else() {
        let fallback = record(json!({"bases": [{"startDate": "1", "endDate": "2", "base": "C"}]}));
        assert_eq!(airfield_history(&fallback), vec![span("1", "2", "C")]);

        let ignored = record(json!({
            "airfields": {"1": "A"},
            "bases": [{"startDate": "1", "base": "C"}]
        }));
        assert_eq!(airfield_history(&ignored), vec![span("1", "", "A")]);
    }

    #[test]
    fn test_squadron_ref_from_source() {
        let squadron = SquadronRef::from_source("Squadrons/42.json");
        assert_eq!(squadron.squadron_id, "42");
    }
}
