//! Calculation-engine output
//!
//! Shapes of the detailed per-patient results a CQL measure calculation
//! engine produces. They are read-only inputs to reconciliation and statement
//! ordering; nothing here computes a result.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Membership of one population for a patient or an episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationResult {
    /// Measure-population code, e.g. `numerator`
    pub population_type: String,

    /// CQL statement backing the population
    #[serde(default)]
    pub criteria_expression: Option<String>,

    #[serde(default)]
    pub result: Option<bool>,

    /// Id of the measure population this result belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population_id: Option<String>,

    /// For measure observations: id of the observed population
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria_reference_id: Option<String>,

    /// Raw observation values; engines may report nulls, quantities or
    /// numbers outside the decimal range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<Vec<Value>>,
}

impl PopulationResult {
    pub fn new(population_type: &str, criteria_expression: &str, result: bool) -> Self {
        Self {
            population_type: population_type.to_string(),
            criteria_expression: Some(criteria_expression.to_string()),
            result: Some(result),
            population_id: None,
            criteria_reference_id: None,
            observations: None,
        }
    }

    pub fn with_population_id(mut self, id: impl Into<String>) -> Self {
        self.population_id = Some(id.into());
        self
    }

    pub fn with_criteria_reference(mut self, id: impl Into<String>) -> Self {
        self.criteria_reference_id = Some(id.into());
        self
    }

    pub fn with_observations(mut self, observations: impl IntoIterator<Item = Value>) -> Self {
        self.observations = Some(observations.into_iter().collect());
        self
    }

    /// `true` only for an explicit positive result
    pub fn is_member(&self) -> bool {
        self.result == Some(true)
    }

    /// First observation as a decimal; `None` when it is missing or not a
    /// representable number
    pub fn first_observation(&self) -> Option<Decimal> {
        let value = self.observations.as_ref()?.first()?;
        if let Some(n) = value.as_i64() {
            Some(Decimal::from(n))
        } else if let Some(n) = value.as_u64() {
            Some(Decimal::from(n))
        } else {
            value.as_f64().and_then(Decimal::from_f64)
        }
    }
}

/// Population results of one episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeResult {
    pub episode_id: String,

    #[serde(default)]
    pub population_results: Vec<PopulationResult>,
}

/// Shape of a group result, in the precedence reconciliation applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// No episode list at all: flat population results apply
    PatientBased,
    /// An episode list that is empty: the patient produced no episodes
    EpisodeBasedEmpty,
    /// At least one episode; episode results take precedence over flat ones
    EpisodeBased,
}

/// Detailed calculation result of one measure group for one patient
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedGroupResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    #[serde(default)]
    pub statement_results: Vec<StatementResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population_results: Option<Vec<PopulationResult>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_results: Option<Vec<EpisodeResult>>,

    /// Highlighted logic, when the engine was asked for it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl DetailedGroupResult {
    pub fn patient_based(population_results: Vec<PopulationResult>) -> Self {
        Self {
            population_results: Some(population_results),
            ..Self::default()
        }
    }

    pub fn episode_based(episode_results: Vec<EpisodeResult>) -> Self {
        Self {
            episode_results: Some(episode_results),
            ..Self::default()
        }
    }

    pub fn kind(&self) -> ResultKind {
        match self.episode_results.as_deref() {
            None => ResultKind::PatientBased,
            Some([]) => ResultKind::EpisodeBasedEmpty,
            Some(_) => ResultKind::EpisodeBased,
        }
    }

    pub fn population_results(&self) -> &[PopulationResult] {
        self.population_results.as_deref().unwrap_or(&[])
    }

    pub fn episode_results(&self) -> &[EpisodeResult] {
        self.episode_results.as_deref().unwrap_or(&[])
    }
}

/// Final truth value of a CQL statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FinalResult {
    True,
    False,
    #[default]
    Na,
    Unhit,
}

impl FinalResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalResult::True => "TRUE",
            FinalResult::False => "FALSE",
            FinalResult::Na => "NA",
            FinalResult::Unhit => "UNHIT",
        }
    }
}

/// Whether a statement contributed to the population results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Relevance {
    True,
    False,
    #[default]
    Na,
}

impl Relevance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relevance::True => "TRUE",
            Relevance::False => "FALSE",
            Relevance::Na => "NA",
        }
    }
}

/// Result of one CQL statement for a patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementResult {
    pub library_name: String,

    pub statement_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,

    #[serde(rename = "final", default)]
    pub final_result: FinalResult,

    #[serde(default)]
    pub relevance: Relevance,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,

    #[serde(default)]
    pub is_function: bool,

    /// Human readable rendering of the raw value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pretty: Option<String>,
}

impl StatementResult {
    pub fn new(library_name: &str, statement_name: &str) -> Self {
        Self {
            library_name: library_name.to_string(),
            statement_name: statement_name.to_string(),
            local_id: None,
            final_result: FinalResult::default(),
            relevance: Relevance::default(),
            raw: None,
            is_function: false,
            pretty: None,
        }
    }

    pub fn function(mut self) -> Self {
        self.is_function = true;
        self
    }
}

/// Calculation output for one patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub patient_id: String,

    #[serde(default)]
    pub detailed_results: Vec<DetailedGroupResult>,
}

impl ExecutionResult {
    /// The group result reconciliation reads: the first one, as only
    /// single-group measures are supported
    pub fn first_group_result(&self) -> Option<&DetailedGroupResult> {
        self.detailed_results.first()
    }
}

/// A calculation run as written to disk: either the bare list of patient
/// results or the calculator envelope `{ "results": [...] }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CalculationOutput {
    Envelope { results: Vec<ExecutionResult> },
    Results(Vec<ExecutionResult>),
}

impl CalculationOutput {
    pub fn results(&self) -> &[ExecutionResult] {
        match self {
            CalculationOutput::Envelope { results } | CalculationOutput::Results(results) => {
                results
            }
        }
    }

    pub fn patient(&self, patient_id: &str) -> Option<&ExecutionResult> {
        self.results().iter().find(|r| r.patient_id == patient_id)
    }
}
