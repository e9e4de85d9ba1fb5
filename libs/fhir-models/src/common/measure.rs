//! FHIR Measure model
//!
//! Covers the parts of an R4 `Measure` an eCQM test workflow reads: groups,
//! their populations, the CQL criteria behind each population and the
//! cqfm extensions that tie measure observations to their source population.

use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Extension URLs linking a measure observation to the population it observes
pub const CRITERIA_REFERENCE_URLS: &[&str] = &[
    "http://hl7.org/fhir/us/cqfmeasures/StructureDefinition/cqfm-criteriaReference",
    "http://hl7.org/fhir/StructureDefinition/cqf-criteriaReference",
];

/// Extension URL declaring the population basis (`boolean` or a resource type)
pub const POPULATION_BASIS_URL: &str =
    "http://hl7.org/fhir/us/cqfmeasures/StructureDefinition/cqfm-populationBasis";

/// Code system of measure population codes
pub const MEASURE_POPULATION_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/measure-population";

/// FHIR Measure resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    /// Resource type - always "Measure"
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    /// Logical id of this artifact
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Canonical identifier for this measure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Business version of the measure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Name for this measure (computer friendly)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Name for this measure (human friendly)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// draft | active | retired | unknown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// proportion | ratio | continuous-variable | cohort
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring: Option<CodeableConcept>,

    /// Logic libraries used by the measure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<Vec<String>>,

    /// Extensions on the measure itself
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,

    /// Population criteria groups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Vec<MeasureGroup>>,

    /// Additional content beyond core fields
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

fn default_resource_type() -> String {
    "Measure".to_string()
}

/// Population criteria group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MeasureGroup {
    /// Unique id for the group within the measure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Meaning of the group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,

    /// Summary description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Group-level extensions (population basis, scoring unit, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,

    /// Population criteria
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population: Option<Vec<MeasurePopulation>>,

    /// Additional content beyond core fields (stratifier, ...)
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

/// Population criteria
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MeasurePopulation {
    /// Unique id for the population within the measure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// initial-population | numerator | numerator-exclusion | denominator | ...
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,

    /// The human readable description of this population criteria
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Population-level extensions (criteria reference, aggregate method, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,

    /// The criteria that defines this population
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Expression>,

    /// Additional content beyond core fields
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

/// An expression that can be used to generate a value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Expression {
    /// Short name assigned to expression for reuse
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// text/cql | text/fhirpath | application/x-fhir-query | etc.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Expression in specified language
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    /// Where the expression is found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Concept - reference to a terminology or just text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CodeableConcept {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coding: Option<Vec<Coding>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A reference to a code defined by a terminology system
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Extension with the value[x] choices measure profiles use
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_boolean: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_coding: Option<Coding>,

    /// Remaining value[x] choices and nested extensions
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

impl Extension {
    /// Extension carrying a `valueString`
    pub fn string(url: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            value_string: Some(value.into()),
            value_code: None,
            value_boolean: None,
            value_coding: None,
            extensions: HashMap::new(),
        }
    }

    /// Extension carrying a `valueCode`
    pub fn code(url: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            value_string: None,
            value_code: Some(value.into()),
            ..Self::string(url, String::new())
        }
    }

    /// The textual value of the extension, whichever primitive carries it
    pub fn text_value(&self) -> Option<&str> {
        self.value_string
            .as_deref()
            .or(self.value_code.as_deref())
            .or_else(|| self.value_coding.as_ref().and_then(|c| c.code.as_deref()))
    }
}

impl CodeableConcept {
    /// Concept with a single coding from `system`
    pub fn from_code(system: &str, code: impl Into<String>) -> Self {
        Self {
            coding: Some(vec![Coding {
                system: Some(system.to_string()),
                code: Some(code.into()),
                ..Coding::default()
            }]),
            text: None,
        }
    }

    /// The first coding, which measure authoring tools treat as authoritative
    pub fn first_coding(&self) -> Option<&Coding> {
        self.coding.as_ref().and_then(|c| c.first())
    }
}

fn find_extension<'a>(extensions: &'a Option<Vec<Extension>>, urls: &[&str]) -> Option<&'a Extension> {
    extensions
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .find(|e| urls.contains(&e.url.as_str()))
}

impl Measure {
    /// Create an empty Measure with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            resource_type: "Measure".to_string(),
            id: Some(id.into()),
            url: None,
            version: None,
            name: None,
            title: None,
            status: None,
            scoring: None,
            library: None,
            extension: None,
            group: None,
            extensions: HashMap::new(),
        }
    }

    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        let measure: Self = serde_json::from_value(value.clone())?;
        if measure.resource_type != "Measure" {
            return Err(Error::InvalidResource(format!(
                "expected resourceType 'Measure', found '{}'",
                measure.resource_type
            )));
        }
        Ok(measure)
    }

    /// Convert to JSON Value
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(Error::from)
    }

    /// All population groups in declaration order
    pub fn groups(&self) -> &[MeasureGroup] {
        self.group.as_deref().unwrap_or(&[])
    }

    pub fn first_group(&self) -> Option<&MeasureGroup> {
        self.groups().first()
    }

    pub fn group_by_id(&self, id: &str) -> Option<&MeasureGroup> {
        self.groups().iter().find(|g| g.id.as_deref() == Some(id))
    }

    /// Measure-level scoring code (proportion, ratio, ...)
    pub fn scoring_code(&self) -> Option<&str> {
        self.scoring
            .as_ref()
            .and_then(CodeableConcept::first_coding)
            .and_then(|c| c.code.as_deref())
    }

    /// Append a group, creating the group list if needed
    pub fn add_group(&mut self, group: MeasureGroup) {
        self.group.get_or_insert_with(Vec::new).push(group);
    }
}

impl MeasureGroup {
    /// Populations in declaration order
    pub fn populations(&self) -> &[MeasurePopulation] {
        self.population.as_deref().unwrap_or(&[])
    }

    pub fn population_by_id(&self, id: &str) -> Option<&MeasurePopulation> {
        self.populations()
            .iter()
            .find(|p| p.id.as_deref() == Some(id))
    }

    /// Value of the cqfm-populationBasis extension, when declared
    pub fn population_basis(&self) -> Option<&str> {
        find_extension(&self.extension, &[POPULATION_BASIS_URL]).and_then(Extension::text_value)
    }

    /// Whether the group counts episodes (a resource type basis) rather than patients
    pub fn is_episode_based(&self) -> bool {
        self.population_basis()
            .is_some_and(|basis| basis != "boolean")
    }

    /// Append a population, creating the population list if needed
    pub fn add_population(&mut self, population: MeasurePopulation) {
        self.population.get_or_insert_with(Vec::new).push(population);
    }
}

impl MeasurePopulation {
    /// A population with a measure-population code and a CQL criteria identifier
    pub fn new(code: &str, expression: &str) -> Self {
        Self {
            code: Some(CodeableConcept::from_code(MEASURE_POPULATION_SYSTEM, code)),
            criteria: Some(Expression {
                language: Some("text/cql-identifier".to_string()),
                expression: Some(expression.to_string()),
                ..Expression::default()
            }),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Point this population (a measure observation) at another population's id
    pub fn with_criteria_reference(mut self, population_id: impl Into<String>) -> Self {
        self.extension
            .get_or_insert_with(Vec::new)
            .push(Extension::string(CRITERIA_REFERENCE_URLS[0], population_id));
        self
    }

    /// Population code from the first coding
    pub fn code(&self) -> Option<&str> {
        self.code
            .as_ref()
            .and_then(CodeableConcept::first_coding)
            .and_then(|c| c.code.as_deref())
    }

    pub fn display(&self) -> Option<&str> {
        self.code
            .as_ref()
            .and_then(CodeableConcept::first_coding)
            .and_then(|c| c.display.as_deref())
    }

    /// Name of the CQL statement backing this population
    pub fn criteria_expression(&self) -> Option<&str> {
        self.criteria.as_ref().and_then(|c| c.expression.as_deref())
    }

    /// Id of the population this one observes (measure observations only)
    pub fn criteria_reference(&self) -> Option<&str> {
        find_extension(&self.extension, CRITERIA_REFERENCE_URLS).and_then(Extension::text_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ratio_measure() -> Value {
        json!({
            "resourceType": "Measure",
            "id": "ratio-measure",
            "scoring": {
                "coding": [{
                    "system": "http://terminology.hl7.org/CodeSystem/measure-scoring",
                    "code": "ratio"
                }]
            },
            "group": [{
                "id": "group-1",
                "extension": [{
                    "url": POPULATION_BASIS_URL,
                    "valueCode": "Encounter"
                }],
                "population": [
                    {
                        "id": "ipp",
                        "code": { "coding": [{ "system": MEASURE_POPULATION_SYSTEM, "code": "initial-population", "display": "Initial Population" }] },
                        "criteria": { "language": "text/cql-identifier", "expression": "Initial Population" }
                    },
                    {
                        "id": "numer",
                        "code": { "coding": [{ "system": MEASURE_POPULATION_SYSTEM, "code": "numerator" }] },
                        "criteria": { "language": "text/cql-identifier", "expression": "Numerator" }
                    },
                    {
                        "id": "observ",
                        "extension": [{
                            "url": "http://hl7.org/fhir/us/cqfmeasures/StructureDefinition/cqfm-criteriaReference",
                            "valueString": "numer"
                        }],
                        "code": { "coding": [{ "system": MEASURE_POPULATION_SYSTEM, "code": "measure-observation" }] },
                        "criteria": { "language": "text/cql-identifier", "expression": "Observation1" }
                    }
                ]
            }]
        })
    }

    #[test]
    fn test_deserialize_measure() {
        let measure = Measure::from_value(&ratio_measure()).unwrap();
        assert_eq!(measure.id.as_deref(), Some("ratio-measure"));
        assert_eq!(measure.scoring_code(), Some("ratio"));
        assert_eq!(measure.groups().len(), 1);

        let group = measure.first_group().unwrap();
        assert_eq!(group.populations().len(), 3);
        assert_eq!(group.populations()[0].code(), Some("initial-population"));
        assert_eq!(group.populations()[0].display(), Some("Initial Population"));
        assert_eq!(
            group.populations()[0].criteria_expression(),
            Some("Initial Population")
        );
    }

    #[test]
    fn test_criteria_reference() {
        let measure = Measure::from_value(&ratio_measure()).unwrap();
        let group = measure.first_group().unwrap();
        let observation = group.population_by_id("observ").unwrap();
        assert_eq!(observation.criteria_reference(), Some("numer"));
        assert_eq!(group.population_by_id("numer").unwrap().criteria_reference(), None);
    }

    #[test]
    fn test_population_basis() {
        let measure = Measure::from_value(&ratio_measure()).unwrap();
        let group = measure.group_by_id("group-1").unwrap();
        assert_eq!(group.population_basis(), Some("Encounter"));
        assert!(group.is_episode_based());
        assert!(!MeasureGroup::default().is_episode_based());
    }

    #[test]
    fn test_rejects_other_resource_types() {
        let err = Measure::from_value(&json!({"resourceType": "Library"})).unwrap_err();
        assert!(matches!(err, Error::InvalidResource(_)));
    }

    #[test]
    fn test_builders_round_trip_through_json() {
        let mut group = MeasureGroup::default();
        group.add_population(MeasurePopulation::new("numerator", "Numerator").with_id("numer"));
        group.add_population(
            MeasurePopulation::new("measure-observation", "Observation1")
                .with_criteria_reference("numer"),
        );
        let mut measure = Measure::new("built");
        measure.add_group(group);

        let json = measure.to_value().unwrap();
        assert_eq!(
            json["group"][0]["population"][1]["extension"][0]["valueString"],
            "numer"
        );

        let parsed = Measure::from_value(&json).unwrap();
        assert_eq!(parsed, measure);
    }

    #[test]
    fn test_unknown_members_are_kept() {
        let mut value = ratio_measure();
        value["effectivePeriod"] = json!({"start": "2026-01-01"});
        let measure = Measure::from_value(&value).unwrap();
        assert!(measure.extensions.contains_key("effectivePeriod"));
    }
}
