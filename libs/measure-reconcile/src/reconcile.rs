//! Population reconciliation engine
//!
//! Turns a measure definition, a patient's desired selection and that
//! patient's calculation result into a [`ComparisonMatrix`]: one patient row,
//! plus one row per episode for episode-based measures.
//!
//! Any population code outside the taxonomy, or an observation whose source
//! population cannot be found, aborts the whole patient. A partial matrix
//! would have an ambiguous key space.

use crate::error::{Error, Result};
use crate::key::{self, PopulationKey};
use crate::matrix::{Cell, ComparisonMatrix, ComparisonRow};
use crate::population::PopulationType;
use crate::results::{DetailedGroupResult, EpisodeResult, PopulationResult, ResultKind};
use crate::selection::{self, DesiredSelection};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use testify_models::{Bundle, Measure, MeasureGroup};
use tracing::{debug, warn};

/// Label of the aggregate row
pub const PATIENT_ROW_LABEL: &str = "Patient";

/// Resolves episode ids to the FHIR resources they were calculated from
pub trait EpisodeResourceLookup {
    fn find_resource(&self, episode_id: &str) -> Option<&Value>;
}

impl EpisodeResourceLookup for Bundle {
    fn find_resource(&self, episode_id: &str) -> Option<&Value> {
        Bundle::find_resource(self, episode_id)
    }
}

impl EpisodeResourceLookup for HashMap<String, Value> {
    fn find_resource(&self, episode_id: &str) -> Option<&Value> {
        self.get(episode_id)
    }
}

/// Lookup for callers without patient resources at hand
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEpisodeResources;

impl EpisodeResourceLookup for NoEpisodeResources {
    fn find_resource(&self, _episode_id: &str) -> Option<&Value> {
        None
    }
}

/// Reconciles calculation results against one measure's first group
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'m> {
    measure: &'m Measure,
    group: &'m MeasureGroup,
}

impl<'m> Reconciler<'m> {
    /// Bind to the measure's first group. Measures with several groups are
    /// not supported: later groups are ignored with a warning.
    pub fn new(measure: &'m Measure) -> Result<Self> {
        let groups = measure.groups();
        let Some(group) = groups.first() else {
            return Err(Error::NoGroups(
                measure.id.clone().unwrap_or_else(|| "<unidentified>".to_string()),
            ));
        };

        if groups.len() > 1 {
            warn!(
                measure_id = ?measure.id,
                groups = groups.len(),
                "Multi-group measures are not supported; reconciling the first group only"
            );
        }

        Ok(Self { measure, group })
    }

    pub fn group(&self) -> &'m MeasureGroup {
        self.group
    }

    pub fn reconcile(
        &self,
        desired: &DesiredSelection,
        result: &DetailedGroupResult,
        lookup: &dyn EpisodeResourceLookup,
    ) -> Result<ComparisonMatrix> {
        let kind = result.kind();
        self.check_population_basis(kind);

        let patient = match kind {
            ResultKind::PatientBased => {
                patient_row_from_flat_results(desired, result.population_results())?
            }
            ResultKind::EpisodeBasedEmpty => self.patient_row_without_episodes()?,
            ResultKind::EpisodeBased => patient_row_from_episodes(result.episode_results())?,
        };

        let keys: Vec<String> = patient.keys().map(str::to_string).collect();
        let mut rows = Vec::with_capacity(1 + result.episode_results().len());
        rows.push(patient);

        if kind == ResultKind::EpisodeBased {
            for episode in result.episode_results() {
                rows.push(episode_row(episode, lookup)?.align_to(&keys));
            }
        }

        debug!(
            measure_id = ?self.measure.id,
            ?kind,
            keys = keys.len(),
            rows = rows.len(),
            "Reconciled population results"
        );

        Ok(ComparisonMatrix { keys, rows })
    }

    /// The declared population basis and the shape of the result should agree;
    /// reconciliation still follows the result
    fn check_population_basis(&self, kind: ResultKind) -> bool {
        let Some(basis) = self.group.population_basis() else {
            return true;
        };
        let declared_episodes = self.group.is_episode_based();
        let reported_episodes = kind != ResultKind::PatientBased;
        if declared_episodes != reported_episodes {
            warn!(
                measure_id = ?self.measure.id,
                population_basis = basis,
                ?kind,
                "Calculation result shape does not match the group's population basis"
            );
            return false;
        }
        true
    }

    /// Keys come from the group definition since there is no episode data.
    /// Desired episode counts cannot be expressed, so every desired value is
    /// undetermined.
    fn patient_row_without_episodes(&self) -> Result<ComparisonRow> {
        let mut row = ComparisonRow::new(PATIENT_ROW_LABEL);
        for population in self.group.populations() {
            let Some(code) = population.code() else {
                continue;
            };
            let key = selection::population_key(code, population, self.group)?;
            row.set(&key.label(), Cell::Undetermined, Cell::count(0));
        }
        Ok(row)
    }
}

/// Reconcile one patient against the measure's first group
pub fn reconcile(
    measure: &Measure,
    desired: &DesiredSelection,
    result: &DetailedGroupResult,
    lookup: &dyn EpisodeResourceLookup,
) -> Result<ComparisonMatrix> {
    Reconciler::new(measure)?.reconcile(desired, result, lookup)
}

/// Key of a calculated population, resolving observation references among
/// the results it was reported with
pub fn key_for(result: &PopulationResult, group: &[PopulationResult]) -> Result<PopulationKey> {
    key::resolve(
        &result.population_type,
        result.criteria_reference_id.as_deref(),
        result.criteria_expression.as_deref().unwrap_or_default(),
        |id| {
            group
                .iter()
                .find(|r| r.population_id.as_deref() == Some(id))
                .map(|r| r.population_type.as_str())
        },
    )
}

fn patient_row_from_flat_results(
    desired: &DesiredSelection,
    results: &[PopulationResult],
) -> Result<ComparisonRow> {
    let mut row = ComparisonRow::new(PATIENT_ROW_LABEL);
    for result in results {
        let key = key_for(result, results)?;
        row.set(
            &key.label(),
            Cell::flag(desired.contains(&key.value())),
            Cell::flag(result.is_member()),
        );
    }
    Ok(row)
}

/// Episode counts per population; observations have no patient-level total
fn patient_row_from_episodes(episodes: &[EpisodeResult]) -> Result<ComparisonRow> {
    let mut counts: IndexMap<String, Option<u64>> = IndexMap::new();
    for episode in episodes {
        for result in &episode.population_results {
            let key = key_for(result, &episode.population_results)?;
            if key.population_type() == PopulationType::MeasureObservation {
                counts.entry(key.label()).or_insert(None);
                continue;
            }
            let count = counts.entry(key.label()).or_insert(Some(0));
            if result.is_member() {
                *count = Some(count.unwrap_or(0) + 1);
            }
        }
    }

    let mut row = ComparisonRow::new(PATIENT_ROW_LABEL);
    for (key, count) in counts {
        match count {
            Some(n) => row.set(&key, Cell::Undetermined, Cell::count(n)),
            None => row.set(&key, Cell::NotApplicable, Cell::NotApplicable),
        }
    }
    Ok(row)
}

fn episode_row(episode: &EpisodeResult, lookup: &dyn EpisodeResourceLookup) -> Result<ComparisonRow> {
    let mut row = ComparisonRow::new(episode_label(&episode.episode_id, lookup));
    for result in &episode.population_results {
        let key = key_for(result, &episode.population_results)?;
        let actual = if key.population_type() == PopulationType::MeasureObservation {
            result
                .first_observation()
                .map(Cell::Value)
                .unwrap_or(Cell::NotApplicable)
        } else {
            Cell::flag(result.is_member())
        };
        row.set(&key.label(), Cell::Undetermined, actual);
    }
    Ok(row)
}

fn episode_label(episode_id: &str, lookup: &dyn EpisodeResourceLookup) -> String {
    let resource_type = lookup
        .find_resource(episode_id)
        .and_then(|r| r.get("resourceType"))
        .and_then(Value::as_str);

    match resource_type {
        Some(resource_type) => format!("{resource_type}: {episode_id}"),
        None => {
            warn!(episode_id, "Episode resource not found; labelling by id only");
            format!("Episode: {episode_id}")
        }
    }
}
