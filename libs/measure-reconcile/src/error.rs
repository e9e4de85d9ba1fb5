//! Error types for population reconciliation

use thiserror::Error;

/// Failures that make a comparison matrix ambiguous.
///
/// Both population errors are deterministic data errors in the measure or the
/// calculation output; retrying cannot help.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown population code: {0}")]
    UnknownPopulationCode(String),

    #[error("Measure observation '{expression}' references population '{reference}', which is not in the group")]
    UnresolvedObservationReference {
        reference: String,
        expression: String,
    },

    #[error("Measure {0} has no population groups")]
    NoGroups(String),
}

pub type Result<T> = std::result::Result<T, Error>;
