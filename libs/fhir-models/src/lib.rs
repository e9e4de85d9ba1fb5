//! FHIR data models for measure test authoring
//!
//! This crate provides strongly-typed Rust structures for the FHIR resources
//! a measure test workflow reads: the `Measure` definition and the `Bundle`s
//! that carry it and the synthetic patients.
//!
//! # Module Organization
//!
//! - `common`: Measure and Bundle models shared by every FHIR R4 measure bundle
//!
//! # Design Philosophy
//!
//! - **Lenient reads**: Optional FHIR elements are `Option`s, so partially
//!   authored measures still parse
//! - **Extensible**: `extensions` field captures members the models do not name
//! - **Strongly-typed**: Helpers resolve codes, criteria and extensions without
//!   walking raw JSON
//!
//! # Example
//!
//! ```rust
//! use testify_models::common::Measure;
//! use serde_json::json;
//!
//! let measure_json = json!({
//!     "resourceType": "Measure",
//!     "id": "example",
//!     "group": [{
//!         "population": [{
//!             "code": { "coding": [{ "code": "initial-population" }] },
//!             "criteria": { "language": "text/cql-identifier", "expression": "Initial Population" }
//!         }]
//!     }]
//! });
//!
//! let measure: Measure = serde_json::from_value(measure_json).unwrap();
//! let group = measure.first_group().unwrap();
//! assert_eq!(group.populations()[0].code(), Some("initial-population"));
//! ```

pub mod common;

// Re-export commonly used types
pub use common::*;
