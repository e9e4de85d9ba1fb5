//! Subcommand handlers

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use testify_models::{Bundle, Measure};
use testify_reconcile::{
    build_selection_list, measure_populations, shorthand, sort_statements, statement_population,
    CalculationOutput, ComparisonMatrix, DesiredSelection, DetailedGroupResult,
    EpisodeResourceLookup, ExecutionResult, Reconciler, SelectionEntry, StatementResult,
};
use tracing::{debug, error, info, warn};

use crate::config::{OutputConfig, OutputFormat};
use crate::table;

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))
}

fn load_measure(path: &Path) -> anyhow::Result<Measure> {
    let value: Value = read_json(path)?;
    let bundle = Bundle::from_value(&value)
        .with_context(|| format!("{} is not a FHIR Bundle", path.display()))?;
    let measure = bundle
        .measure()
        .with_context(|| format!("No Measure in {}", path.display()))?;

    info!(
        measure_id = ?measure.id,
        measure_url = ?measure.url,
        groups = measure.groups().len(),
        "Loaded measure"
    );
    Ok(measure)
}

fn load_results(path: &Path) -> anyhow::Result<CalculationOutput> {
    let output: CalculationOutput = read_json(path)?;
    info!(patients = output.results().len(), "Loaded calculation results");
    Ok(output)
}

/// Results for `patient`, or every patient in file order
fn select_patients<'a>(
    output: &'a CalculationOutput,
    patient: Option<&str>,
) -> anyhow::Result<Vec<&'a ExecutionResult>> {
    match patient {
        Some(id) => output
            .patient(id)
            .map(|result| vec![result])
            .with_context(|| format!("No calculation results for patient '{id}'")),
        None => Ok(output.results().iter().collect()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Episode resources from every patient bundle given on the command line
struct PatientBundles(Vec<Bundle>);

impl PatientBundles {
    fn load(paths: &[PathBuf]) -> anyhow::Result<Self> {
        let mut bundles = Vec::with_capacity(paths.len());
        for path in paths {
            let value: Value = read_json(path)?;
            let bundle = Bundle::from_value(&value)
                .with_context(|| format!("{} is not a FHIR Bundle", path.display()))?;
            debug!(path = %path.display(), entries = bundle.entry_count(), "Loaded patient bundle");
            bundles.push(bundle);
        }
        Ok(Self(bundles))
    }
}

impl EpisodeResourceLookup for PatientBundles {
    fn find_resource(&self, episode_id: &str) -> Option<&Value> {
        self.0
            .iter()
            .find_map(|bundle| bundle.find_resource(episode_id))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PopulationsOutput<'a> {
    populations: Vec<String>,
    selection: &'a [SelectionEntry],
}

pub fn populations(measure_bundle: &Path, output: &OutputConfig) -> anyhow::Result<()> {
    let measure = load_measure(measure_bundle)?;
    let entries = build_selection_list(&measure)
        .context("Failed to build the population selection list")?;
    let codes = measure_populations(&measure);

    match output.format {
        OutputFormat::Json => print_json(&PopulationsOutput {
            populations: codes,
            selection: &entries,
        }),
        OutputFormat::Table => {
            println!("{}", table::selection_table(&entries));
            println!("Populations: {}", codes.join(", "));
            Ok(())
        }
    }
}

pub struct CompareArgs<'a> {
    pub measure_bundle: &'a Path,
    pub results: &'a Path,
    pub desired: Option<&'a Path>,
    pub patient_bundles: &'a [PathBuf],
    pub patient: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PatientComparison<'a> {
    patient_id: &'a str,
    #[serde(flatten)]
    matrix: ComparisonMatrix,
}

/// Matrices for the patients that reconciled, and the ids of those that did not
#[derive(Default)]
struct ComparisonReport<'a> {
    comparisons: Vec<PatientComparison<'a>>,
    failed: Vec<&'a str>,
}

/// Reconcile each patient independently; one failure does not stop the rest
fn reconcile_patients<'a>(
    reconciler: &Reconciler<'_>,
    patients: &[&'a ExecutionResult],
    desired: &HashMap<String, DesiredSelection>,
    selection: &[SelectionEntry],
    lookup: &dyn EpisodeResourceLookup,
) -> ComparisonReport<'a> {
    let no_selection = DesiredSelection::new();
    let mut report = ComparisonReport::default();

    for &patient in patients {
        let Some(group_result) = patient.first_group_result() else {
            warn!(patient_id = %patient.patient_id, "Patient has no group results; skipping");
            continue;
        };

        let patient_desired = desired.get(&patient.patient_id).unwrap_or(&no_selection);
        let unknown = patient_desired.unknown_values(selection);
        if !unknown.is_empty() {
            warn!(
                patient_id = %patient.patient_id,
                values = ?unknown,
                "Desired populations not offered by this measure"
            );
        }

        match reconciler.reconcile(patient_desired, group_result, lookup) {
            Ok(matrix) => report.comparisons.push(PatientComparison {
                patient_id: &patient.patient_id,
                matrix,
            }),
            Err(e) => {
                error!(patient_id = %patient.patient_id, error = %e, "Reconciliation failed");
                report.failed.push(&patient.patient_id);
            }
        }
    }

    report
}

pub fn compare(args: CompareArgs<'_>, output: &OutputConfig) -> anyhow::Result<()> {
    let measure = load_measure(args.measure_bundle)?;
    let results = load_results(args.results)?;
    let lookup = PatientBundles::load(args.patient_bundles)?;
    let desired: HashMap<String, DesiredSelection> = match args.desired {
        Some(path) => read_json(path)?,
        None => HashMap::new(),
    };

    let reconciler = Reconciler::new(&measure).context("Measure cannot be reconciled")?;
    let selection = build_selection_list(&measure)
        .context("Failed to build the population selection list")?;

    let patients = select_patients(&results, args.patient)?;
    info!(
        group_id = ?reconciler.group().id,
        patients = patients.len(),
        "Comparing populations"
    );
    let report = reconcile_patients(&reconciler, &patients, &desired, &selection, &lookup);

    match output.format {
        OutputFormat::Json => print_json(&report.comparisons)?,
        OutputFormat::Table => {
            for comparison in &report.comparisons {
                println!("Patient {}", comparison.patient_id);
                println!("{}", table::comparison_table(&comparison.matrix, output.color));
            }
        }
    }

    if !report.failed.is_empty() {
        anyhow::bail!(
            "Reconciliation failed for {} patient(s): {}",
            report.failed.len(),
            report.failed.join(", ")
        );
    }
    Ok(())
}

/// A statement result with the population it defines, if any
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatementListing {
    #[serde(flatten)]
    statement: StatementResult,
    population: Option<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PatientStatements<'a> {
    patient_id: &'a str,
    statements: Vec<StatementListing>,
}

/// Statements of one group result in canonical order, tagged with the
/// shorthand of the population each one defines
fn statement_listings(measure: &Measure, group_result: &DetailedGroupResult) -> Vec<StatementListing> {
    let group_id = group_result.group_id.as_deref();
    sort_statements(measure, group_id, &group_result.statement_results)
        .into_iter()
        .map(|statement| {
            let population = statement_population(measure, group_id, &statement.statement_name)
                .and_then(shorthand);
            StatementListing {
                statement,
                population,
            }
        })
        .collect()
}

pub fn statements(
    measure_bundle: &Path,
    results: &Path,
    patient: Option<&str>,
    output: &OutputConfig,
) -> anyhow::Result<()> {
    let measure = load_measure(measure_bundle)?;
    let results = load_results(results)?;

    let mut listings = Vec::new();
    for patient in select_patients(&results, patient)? {
        let Some(group_result) = patient.first_group_result() else {
            warn!(patient_id = %patient.patient_id, "Patient has no group results; skipping");
            continue;
        };
        listings.push(PatientStatements {
            patient_id: &patient.patient_id,
            statements: statement_listings(&measure, group_result),
        });
    }

    match output.format {
        OutputFormat::Json => print_json(&listings),
        OutputFormat::Table => {
            for listing in &listings {
                let rows: Vec<_> = listing
                    .statements
                    .iter()
                    .map(|l| (&l.statement, l.population))
                    .collect();
                println!("Patient {}", listing.patient_id);
                println!("{}", table::statement_table(&rows, output.color));
            }
            Ok(())
        }
    }
}
