//! Comparison matrix
//!
//! Rows of desired vs. actual values keyed by disambiguated population key.
//! Every row of a matrix carries the same keys in the same order on both its
//! desired and actual side.

use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;

/// One value of a comparison row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    /// The population has no value at this level (observations on a patient row)
    NotApplicable,
    /// A desired value the workflow cannot express yet (episode counts)
    Undetermined,
    /// Membership (0/1), an episode count, or an observation value
    Value(Decimal),
}

impl Cell {
    pub fn count(n: u64) -> Self {
        Cell::Value(Decimal::from(n))
    }

    pub fn flag(member: bool) -> Self {
        Cell::count(u64::from(member))
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            Cell::Value(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::NotApplicable => f.write_str("N/A"),
            Cell::Undetermined => f.write_str("-"),
            Cell::Value(v) => write!(f, "{}", v.normalize()),
        }
    }
}

/// Wire form: `null` for not applicable, `-1` for undetermined, numbers otherwise
impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::NotApplicable => serializer.serialize_none(),
            Cell::Undetermined => serializer.serialize_i64(-1),
            Cell::Value(v) if v.fract().is_zero() => match v.to_i64() {
                Some(n) => serializer.serialize_i64(n),
                None => serializer.serialize_f64(v.to_f64().unwrap_or(f64::NAN)),
            },
            Cell::Value(v) => serializer.serialize_f64(v.to_f64().unwrap_or(f64::NAN)),
        }
    }
}

/// Desired vs. actual values of the patient or of one episode
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    pub resource_label: String,
    pub desired: IndexMap<String, Cell>,
    pub actual: IndexMap<String, Cell>,
}

impl ComparisonRow {
    pub fn new(resource_label: impl Into<String>) -> Self {
        Self {
            resource_label: resource_label.into(),
            desired: IndexMap::new(),
            actual: IndexMap::new(),
        }
    }

    /// Set both sides of one key
    pub fn set(&mut self, key: &str, desired: Cell, actual: Cell) {
        self.desired.insert(key.to_string(), desired);
        self.actual.insert(key.to_string(), actual);
    }

    /// Desired values are only meaningful when none of them is undetermined
    pub fn desired_available(&self) -> bool {
        !self.desired.values().any(|c| *c == Cell::Undetermined)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.actual.keys().map(String::as_str)
    }

    /// Re-key the row to `keys`, filling absent keys as not applicable on both sides
    pub(crate) fn align_to(mut self, keys: &[String]) -> Self {
        let mut desired = IndexMap::with_capacity(keys.len());
        let mut actual = IndexMap::with_capacity(keys.len());
        for key in keys {
            desired.insert(
                key.clone(),
                self.desired.swap_remove(key).unwrap_or(Cell::NotApplicable),
            );
            actual.insert(
                key.clone(),
                self.actual.swap_remove(key).unwrap_or(Cell::NotApplicable),
            );
        }
        self.desired = desired;
        self.actual = actual;
        self
    }
}

/// Patient row followed by one row per episode, all sharing `keys`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonMatrix {
    pub keys: Vec<String>,
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonMatrix {
    /// The aggregate row; `None` only for a matrix built without rows
    pub fn patient_row(&self) -> Option<&ComparisonRow> {
        self.rows.first()
    }

    pub fn episode_rows(&self) -> &[ComparisonRow] {
        self.rows.get(1..).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn cells_serialize_to_wire_values() {
        let mut row = ComparisonRow::new("Patient");
        row.set("IPP", Cell::flag(true), Cell::flag(false));
        row.set("NUMER", Cell::Undetermined, Cell::count(3));
        row.set(
            "OBSERV-NUMER (Obs)",
            Cell::NotApplicable,
            Cell::Value(Decimal::from_str("2.5").unwrap()),
        );

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(
            json,
            json!({
                "resourceLabel": "Patient",
                "desired": {"IPP": 1, "NUMER": -1, "OBSERV-NUMER (Obs)": null},
                "actual": {"IPP": 0, "NUMER": 3, "OBSERV-NUMER (Obs)": 2.5}
            })
        );
    }

    #[test]
    fn display_normalizes_values() {
        assert_eq!(Cell::Value(Decimal::from_str("4.50").unwrap()).to_string(), "4.5");
        assert_eq!(Cell::count(1).to_string(), "1");
        assert_eq!(Cell::NotApplicable.to_string(), "N/A");
    }

    #[test]
    fn undetermined_desired_makes_row_unavailable() {
        let mut row = ComparisonRow::new("Patient");
        row.set("IPP", Cell::flag(true), Cell::flag(true));
        assert!(row.desired_available());
        row.set("DENOM", Cell::Undetermined, Cell::count(0));
        assert!(!row.desired_available());
    }

    #[test]
    fn align_fills_and_orders_keys() {
        let mut row = ComparisonRow::new("Encounter: e1");
        row.set("NUMER", Cell::Undetermined, Cell::flag(true));
        row.set("IPP", Cell::Undetermined, Cell::flag(true));

        let keys = vec!["IPP".to_string(), "DENOM".to_string(), "NUMER".to_string()];
        let row = row.align_to(&keys);

        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["IPP", "DENOM", "NUMER"]);
        assert_eq!(row.desired.keys().collect::<Vec<_>>(), row.actual.keys().collect::<Vec<_>>());
        assert_eq!(row.actual["DENOM"], Cell::NotApplicable);
        assert_eq!(row.desired["DENOM"], Cell::NotApplicable);
    }

    #[test]
    fn empty_matrix_has_no_rows_to_hand_out() {
        let matrix = ComparisonMatrix {
            keys: vec!["IPP".to_string()],
            rows: Vec::new(),
        };
        assert!(matrix.patient_row().is_none());
        assert!(matrix.episode_rows().is_empty());

        let matrix = ComparisonMatrix {
            keys: Vec::new(),
            rows: vec![ComparisonRow::new("Patient")],
        };
        assert_eq!(matrix.patient_row().map(|r| r.resource_label.as_str()), Some("Patient"));
        assert!(matrix.episode_rows().is_empty());
    }
}
