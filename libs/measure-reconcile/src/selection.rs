//! Desired-population selection list
//!
//! Builds the choices a user can mark as "desired" for a test patient, and
//! holds the set of choices made.

use crate::error::Result;
use crate::key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use testify_models::{Measure, MeasureGroup, MeasurePopulation};
use tracing::debug;

/// One selectable population
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionEntry {
    /// Disambiguated population code, stored in a [`DesiredSelection`]
    pub value: String,
    /// Disambiguated shorthand, shown to the user and used as the matrix key
    pub label: String,
    pub disabled: bool,
}

/// Build the ordered, deduplicated selection list for the measure's first group.
///
/// Measure-population bookkeeping codes are left out. Entries keep the
/// measure's declaration order.
pub fn build_selection_list(measure: &Measure) -> Result<Vec<SelectionEntry>> {
    let Some(group) = measure.first_group() else {
        return Ok(Vec::new());
    };

    let mut entries: Vec<SelectionEntry> = Vec::new();
    for population in group.populations() {
        let Some(code) = population.code() else {
            debug!(population_id = ?population.id, "Skipping population without a code");
            continue;
        };

        let key = population_key(code, population, group)?;
        if !key.population_type().is_selectable() {
            continue;
        }

        let value = key.value();
        if entries.iter().any(|e| e.value == value) {
            continue;
        }
        entries.push(SelectionEntry {
            value,
            label: key.label(),
            disabled: false,
        });
    }

    debug!(
        measure_id = ?measure.id,
        entries = entries.len(),
        "Built population selection list"
    );
    Ok(entries)
}

/// Key of a population as declared in the measure definition
pub(crate) fn population_key(
    code: &str,
    population: &MeasurePopulation,
    group: &MeasureGroup,
) -> Result<key::PopulationKey> {
    key::resolve(
        code,
        population.criteria_reference(),
        population.criteria_expression().unwrap_or_default(),
        |id| group.population_by_id(id).and_then(MeasurePopulation::code),
    )
}

/// Distinct population codes of the first group, in declaration order
pub fn measure_populations(measure: &Measure) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for code in measure
        .first_group()
        .map(MeasureGroup::populations)
        .unwrap_or_default()
        .iter()
        .filter_map(MeasurePopulation::code)
    {
        if !codes.iter().any(|c| c == code) {
            codes.push(code.to_string());
        }
    }
    codes
}

/// Selection values a user marked as desired for one test patient
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesiredSelection(BTreeSet<String>);

impl DesiredSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        self.0.insert(value.into())
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.contains(value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Values that name no entry of `list`, typically left over from an older measure version
    pub fn unknown_values<'a>(&'a self, list: &[SelectionEntry]) -> Vec<&'a str> {
        self.iter()
            .filter(|value| !list.iter().any(|e| e.value == *value))
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for DesiredSelection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn measure_with(populations: Vec<MeasurePopulation>) -> Measure {
        let mut group = MeasureGroup::default();
        for population in populations {
            group.add_population(population);
        }
        let mut measure = Measure::new("selection-test");
        measure.add_group(group);
        measure
    }

    fn values(entries: &[SelectionEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.value.as_str()).collect()
    }

    #[test]
    fn keeps_declaration_order_and_labels() {
        let measure = measure_with(vec![
            MeasurePopulation::new("denominator", "Denominator"),
            MeasurePopulation::new("numerator", "Numerator"),
            MeasurePopulation::new("initial-population", "Initial Population"),
            MeasurePopulation::new("denominator-exclusion", "Denominator Exclusion"),
        ]);

        let entries = build_selection_list(&measure).unwrap();
        assert_eq!(
            values(&entries),
            vec![
                "denominator",
                "numerator",
                "initial-population",
                "denominator-exclusion"
            ]
        );
        let labels: Vec<_> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["DENOM", "NUMER", "IPP", "DENEX"]);
        assert!(entries.iter().all(|e| !e.disabled));
    }

    #[test]
    fn skips_measure_population_bookkeeping() {
        let measure = measure_with(vec![
            MeasurePopulation::new("initial-population", "Initial Population"),
            MeasurePopulation::new("measure-population", "Measure Population"),
            MeasurePopulation::new("measure-population-exclusion", "Measure Population Exclusion"),
        ]);

        let entries = build_selection_list(&measure).unwrap();
        assert_eq!(values(&entries), vec!["initial-population"]);
    }

    #[test]
    fn disambiguates_observations_by_observed_population() {
        let measure = measure_with(vec![
            MeasurePopulation::new("denominator", "Denominator").with_id("denom"),
            MeasurePopulation::new("numerator", "Numerator").with_id("numer"),
            MeasurePopulation::new("measure-observation", "Denominator Observation")
                .with_criteria_reference("denom"),
            MeasurePopulation::new("measure-observation", "Numerator Observation")
                .with_criteria_reference("numer"),
        ]);

        let entries = build_selection_list(&measure).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(
            entries[2],
            SelectionEntry {
                value: "measure-observation-DENOM (Denominator Observation)".to_string(),
                label: "OBSERV-DENOM (Denominator Observation)".to_string(),
                disabled: false,
            }
        );
        assert_eq!(entries[3].label, "OBSERV-NUMER (Numerator Observation)");
    }

    #[test]
    fn deduplicates_by_disambiguated_value() {
        let measure = measure_with(vec![
            MeasurePopulation::new("initial-population", "Initial Population 1"),
            MeasurePopulation::new("initial-population", "Initial Population 2"),
            MeasurePopulation::new("measure-observation", "Observation"),
            MeasurePopulation::new("measure-observation", "Observation Again"),
        ]);

        let entries = build_selection_list(&measure).unwrap();
        assert_eq!(values(&entries), vec!["initial-population", "measure-observation"]);
    }

    #[test]
    fn unknown_code_aborts() {
        let measure = measure_with(vec![
            MeasurePopulation::new("initial-population", "Initial Population"),
            MeasurePopulation::new("stratifier", "Strat"),
        ]);

        assert_eq!(
            build_selection_list(&measure).unwrap_err(),
            Error::UnknownPopulationCode("stratifier".to_string())
        );
    }

    #[test]
    fn unresolved_observation_reference_aborts() {
        let measure = measure_with(vec![MeasurePopulation::new(
            "measure-observation",
            "Observation",
        )
        .with_criteria_reference("nowhere")]);

        assert!(matches!(
            build_selection_list(&measure).unwrap_err(),
            Error::UnresolvedObservationReference { .. }
        ));
    }

    #[test]
    fn population_without_code_is_skipped() {
        let measure = measure_with(vec![
            MeasurePopulation::default(),
            MeasurePopulation::new("numerator", "Numerator"),
        ]);

        let entries = build_selection_list(&measure).unwrap();
        assert_eq!(values(&entries), vec!["numerator"]);
    }

    #[test]
    fn measure_without_groups_has_no_choices() {
        let measure = Measure::new("empty");
        assert!(build_selection_list(&measure).unwrap().is_empty());
        assert!(measure_populations(&measure).is_empty());
    }

    #[test]
    fn measure_populations_lists_distinct_codes() {
        let measure = measure_with(vec![
            MeasurePopulation::new("denominator", "Denominator"),
            MeasurePopulation::new("numerator", "Numerator"),
            MeasurePopulation::new("initial-population", "Initial Population"),
            MeasurePopulation::new("denominator-exclusion", "Denominator Exclusion"),
            MeasurePopulation::new("numerator", "Numerator 2"),
        ]);

        assert_eq!(
            measure_populations(&measure),
            vec![
                "denominator",
                "numerator",
                "initial-population",
                "denominator-exclusion"
            ]
        );
    }

    #[test]
    fn desired_selection_reports_unknown_values() {
        let measure = measure_with(vec![MeasurePopulation::new("numerator", "Numerator")]);
        let list = build_selection_list(&measure).unwrap();

        let desired: DesiredSelection = ["numerator", "denominator"].into_iter().collect();
        assert!(desired.contains("numerator"));
        assert_eq!(desired.len(), 2);
        assert_eq!(desired.unknown_values(&list), vec!["denominator"]);
    }

    #[test]
    fn desired_selection_is_a_json_array() {
        let desired: DesiredSelection =
            serde_json::from_str(r#"["numerator", "initial-population"]"#).unwrap();
        assert_eq!(
            desired.iter().collect::<Vec<_>>(),
            vec!["initial-population", "numerator"]
        );
    }
}
