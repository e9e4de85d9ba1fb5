//! Population key disambiguation
//!
//! A measure may declare several `measure-observation` populations, one per
//! observed population. They share a code, so both the selection list and the
//! comparison matrix key them by code plus a suffix naming the observed
//! population and the observation's CQL statement. Both call sites go through
//! [`resolve`], which keeps the two key spaces identical.

use crate::error::{Error, Result};
use crate::population::PopulationType;

/// Disambiguated identity of one population within a group
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PopulationKey {
    population_type: PopulationType,
    suffix: String,
}

impl PopulationKey {
    /// Build a key. `observed` only contributes a suffix for measure observations.
    pub fn new(
        population_type: PopulationType,
        observed: Option<PopulationType>,
        expression: &str,
    ) -> Self {
        let suffix = match (population_type, observed) {
            (PopulationType::MeasureObservation, Some(observed)) => {
                format!("-{} ({})", observed.shorthand(), expression)
            }
            _ => String::new(),
        };

        Self {
            population_type,
            suffix,
        }
    }

    pub fn population_type(&self) -> PopulationType {
        self.population_type
    }

    /// Selection value: population code plus suffix, e.g. `measure-observation-NUMER (Obs)`
    pub fn value(&self) -> String {
        format!("{}{}", self.population_type.code(), self.suffix)
    }

    /// Matrix key and selection label: shorthand plus suffix, e.g. `OBSERV-NUMER (Obs)`
    pub fn label(&self) -> String {
        format!("{}{}", self.population_type.shorthand(), self.suffix)
    }
}

/// Resolve the key of a population from its code, its optional criteria
/// reference and the CQL expression behind it.
///
/// `lookup` maps a population id to that population's code within the same
/// group. A measure observation whose reference does not resolve is an error:
/// the key would otherwise collide with every other observation.
pub fn resolve<'a, F>(
    code: &str,
    criteria_reference: Option<&str>,
    expression: &str,
    lookup: F,
) -> Result<PopulationKey>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let population_type = PopulationType::from_code(code)?;

    let observed = match (population_type, criteria_reference) {
        (PopulationType::MeasureObservation, Some(reference)) => {
            let observed_code =
                lookup(reference).ok_or_else(|| Error::UnresolvedObservationReference {
                    reference: reference.to_string(),
                    expression: expression.to_string(),
                })?;
            Some(PopulationType::from_code(observed_code)?)
        }
        _ => None,
    };

    Ok(PopulationKey::new(population_type, observed, expression))
}
