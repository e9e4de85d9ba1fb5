//! Population taxonomy
//!
//! The nine measure-population codes, their short names and their fixed
//! presentation rank. Code lookups go through a compile-time perfect hash map,
//! so an unknown code is a checked `None`/`Err` rather than a failed scan.

use crate::error::{Error, Result};
use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical eCQM population kinds, declared in rank order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PopulationType {
    InitialPopulation,
    Denominator,
    DenominatorExclusion,
    DenominatorException,
    Numerator,
    NumeratorExclusion,
    MeasurePopulation,
    MeasurePopulationExclusion,
    MeasureObservation,
}

static POPULATIONS_BY_CODE: phf::Map<&'static str, PopulationType> = phf_map! {
    "initial-population" => PopulationType::InitialPopulation,
    "denominator" => PopulationType::Denominator,
    "denominator-exclusion" => PopulationType::DenominatorExclusion,
    "denominator-exception" => PopulationType::DenominatorException,
    "numerator" => PopulationType::Numerator,
    "numerator-exclusion" => PopulationType::NumeratorExclusion,
    "measure-population" => PopulationType::MeasurePopulation,
    "measure-population-exclusion" => PopulationType::MeasurePopulationExclusion,
    "measure-observation" => PopulationType::MeasureObservation,
};

impl PopulationType {
    pub const ALL: [PopulationType; 9] = [
        PopulationType::InitialPopulation,
        PopulationType::Denominator,
        PopulationType::DenominatorExclusion,
        PopulationType::DenominatorException,
        PopulationType::Numerator,
        PopulationType::NumeratorExclusion,
        PopulationType::MeasurePopulation,
        PopulationType::MeasurePopulationExclusion,
        PopulationType::MeasureObservation,
    ];

    /// Resolve a measure-population code, failing on codes outside the valueset
    pub fn from_code(code: &str) -> Result<Self> {
        Self::lookup(code).ok_or_else(|| Error::UnknownPopulationCode(code.to_string()))
    }

    pub fn lookup(code: &str) -> Option<Self> {
        POPULATIONS_BY_CODE.get(code).copied()
    }

    pub const fn code(self) -> &'static str {
        match self {
            PopulationType::InitialPopulation => "initial-population",
            PopulationType::Denominator => "denominator",
            PopulationType::DenominatorExclusion => "denominator-exclusion",
            PopulationType::DenominatorException => "denominator-exception",
            PopulationType::Numerator => "numerator",
            PopulationType::NumeratorExclusion => "numerator-exclusion",
            PopulationType::MeasurePopulation => "measure-population",
            PopulationType::MeasurePopulationExclusion => "measure-population-exclusion",
            PopulationType::MeasureObservation => "measure-observation",
        }
    }

    pub const fn shorthand(self) -> &'static str {
        match self {
            PopulationType::InitialPopulation => "IPP",
            PopulationType::Denominator => "DENOM",
            PopulationType::DenominatorExclusion => "DENEX",
            PopulationType::DenominatorException => "DENEXCEP",
            PopulationType::Numerator => "NUMER",
            PopulationType::NumeratorExclusion => "NUMEX",
            PopulationType::MeasurePopulation => "MSRPOPL",
            PopulationType::MeasurePopulationExclusion => "MSRPOPLEX",
            PopulationType::MeasureObservation => "OBSERV",
        }
    }

    /// Position in the fixed presentation order (IPP = 0 .. OBSERV = 8)
    pub const fn rank(self) -> usize {
        self as usize
    }

    /// Bookkeeping populations a user never marks as desired
    pub const fn is_selectable(self) -> bool {
        !matches!(
            self,
            PopulationType::MeasurePopulation | PopulationType::MeasurePopulationExclusion
        )
    }
}

impl fmt::Display for PopulationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PopulationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_code(s)
    }
}

/// Short name for a population code, `None` for codes outside the taxonomy
pub fn shorthand(code: &str) -> Option<&'static str> {
    PopulationType::lookup(code).map(PopulationType::shorthand)
}

/// Rank of a population code; `None` marks an unranked code, which sorts
/// after every ranked one
pub fn rank(code: &str) -> Option<usize> {
    PopulationType::lookup(code).map(PopulationType::rank)
}
