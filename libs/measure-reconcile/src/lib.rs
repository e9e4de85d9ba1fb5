//! Population reconciliation for eCQM test cases
//!
//! Given a FHIR `Measure` and the detailed per-patient output of a measure
//! calculation engine, this crate produces:
//!
//! - the list of populations a user can mark as desired for a test patient
//!   ([`build_selection_list`])
//! - a desired vs. actual comparison matrix per patient, with episode rows for
//!   episode-based measures ([`reconcile`])
//! - the styling decisions for each matrix row ([`render_row`])
//! - CQL statement results in population-then-alphabetical order
//!   ([`sort_statements`])
//!
//! Everything is a pure function of its inputs; nothing is cached or mutated.
//!
//! # Example
//!
//! ```rust
//! use testify_models::{Measure, MeasureGroup, MeasurePopulation};
//! use testify_reconcile::{
//!     build_selection_list, reconcile, Cell, DesiredSelection, DetailedGroupResult,
//!     NoEpisodeResources, PopulationResult,
//! };
//!
//! let mut group = MeasureGroup::default();
//! group.add_population(MeasurePopulation::new("initial-population", "Initial Population"));
//! group.add_population(MeasurePopulation::new("numerator", "Numerator"));
//! let mut measure = Measure::new("example");
//! measure.add_group(group);
//!
//! let choices = build_selection_list(&measure).unwrap();
//! assert_eq!(choices[0].label, "IPP");
//!
//! let desired: DesiredSelection = ["initial-population"].into_iter().collect();
//! let result = DetailedGroupResult::patient_based(vec![
//!     PopulationResult::new("initial-population", "Initial Population", true),
//!     PopulationResult::new("numerator", "Numerator", true),
//! ]);
//!
//! let matrix = reconcile(&measure, &desired, &result, &NoEpisodeResources).unwrap();
//! let row = matrix.patient_row().unwrap();
//! assert_eq!(row.desired["NUMER"], Cell::flag(false));
//! assert_eq!(row.actual["NUMER"], Cell::flag(true));
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod key;
pub mod matrix;
pub mod population;
pub mod reconcile;
pub mod render;
pub mod results;
pub mod selection;
pub mod statements;

pub use error::{Error, Result};
pub use key::PopulationKey;
pub use matrix::{Cell, ComparisonMatrix, ComparisonRow};
pub use population::{rank, shorthand, PopulationType};
pub use reconcile::{
    key_for, reconcile, EpisodeResourceLookup, NoEpisodeResources, Reconciler, PATIENT_ROW_LABEL,
};
pub use render::{render_row, CellStatus, RenderedCell, RowView};
pub use results::{
    CalculationOutput, DetailedGroupResult, EpisodeResult, ExecutionResult, FinalResult,
    PopulationResult, Relevance, ResultKind, StatementResult,
};
pub use selection::{build_selection_list, measure_populations, DesiredSelection, SelectionEntry};
pub use statements::{sort_statements, statement_population};
