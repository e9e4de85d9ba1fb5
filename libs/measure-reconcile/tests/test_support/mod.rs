#![allow(dead_code)]

use serde_json::Value;
use std::{fs::File, path::PathBuf};
use testify_models::{Bundle, Measure, MeasureGroup, MeasurePopulation};
use testify_reconcile::{CalculationOutput, PopulationType};

pub fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn read_json(relative: &str) -> Value {
    let path = fixtures_root().join(relative);
    assert!(path.exists(), "fixture missing at {:?}", path);

    let file = File::open(&path).expect("failed to open fixture");
    serde_json::from_reader(file).expect("failed to read fixture JSON")
}

pub fn load_bundle(relative: &str) -> Bundle {
    Bundle::from_value(&read_json(relative)).expect("failed to deserialize bundle fixture")
}

pub fn load_results(relative: &str) -> CalculationOutput {
    serde_json::from_value(read_json(relative)).expect("failed to deserialize results fixture")
}

pub fn ratio_measure() -> Measure {
    load_bundle("measure-bundle-ratio.json")
        .measure()
        .expect("ratio bundle should carry a measure")
}

/// Single-group measure with one population per `(code, expression)` pair
pub fn measure_with(populations: &[(&str, &str)]) -> Measure {
    let mut group = MeasureGroup {
        id: Some("group-1".to_string()),
        ..MeasureGroup::default()
    };
    for (code, expression) in populations {
        group.add_population(MeasurePopulation::new(code, expression));
    }
    let mut measure = Measure::new("test-measure");
    measure.add_group(group);
    measure
}

pub fn proportion_measure() -> Measure {
    measure_with(&[
        ("denominator", "Denominator"),
        ("numerator", "Numerator"),
        ("initial-population", "Initial Population"),
        ("denominator-exclusion", "Denominator Exclusion"),
    ])
}

/// Selectable codes in taxonomy order
pub fn selectable_codes() -> Vec<&'static str> {
    PopulationType::ALL
        .iter()
        .filter(|t| t.is_selectable() && **t != PopulationType::MeasureObservation)
        .map(|t| t.code())
        .collect()
}

/// Two groups that rank the same statements in opposite order
pub fn two_group_measure() -> Measure {
    let mut first = MeasureGroup {
        id: Some("group-1".to_string()),
        ..MeasureGroup::default()
    };
    first.add_population(MeasurePopulation::new("initial-population", "A Stmt"));
    first.add_population(MeasurePopulation::new("numerator", "B Stmt"));

    let mut second = MeasureGroup {
        id: Some("group-2".to_string()),
        ..MeasureGroup::default()
    };
    second.add_population(MeasurePopulation::new("initial-population", "B Stmt"));
    second.add_population(MeasurePopulation::new("denominator", "C Stmt"));
    second.add_population(MeasurePopulation::new("numerator", "A Stmt"));

    let mut measure = Measure::new("two-groups");
    measure.add_group(first);
    measure.add_group(second);
    measure
}
