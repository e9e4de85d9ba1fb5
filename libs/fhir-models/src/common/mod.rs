//! FHIR R4 models used by measure bundles

pub mod bundle;
pub mod error;
pub mod measure;

// Re-export commonly used types
pub use bundle::*;
pub use error::{Error, Result};
pub use measure::*;
