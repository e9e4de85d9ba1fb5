//! Row rendering policy
//!
//! Decides, per comparison row, whether a desired sub-row is shown and how
//! each cell is styled. Presentation layers only map [`CellStatus`] to colours.

use crate::matrix::{Cell, ComparisonRow};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CellStatus {
    Match,
    Mismatch,
    /// Rendered as "N/A", never highlighted
    NotApplicable,
    /// Shown without match highlighting
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedCell {
    pub text: String,
    pub status: CellStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub label: String,
    /// `None` when the row's desired values are undetermined
    pub desired: Option<Vec<RenderedCell>>,
    pub actual: Vec<RenderedCell>,
}

impl RowView {
    pub fn has_mismatch(&self) -> bool {
        self.actual.iter().any(|c| c.status == CellStatus::Mismatch)
    }
}

/// Render `row` in `keys` order
pub fn render_row(row: &ComparisonRow, keys: &[String]) -> RowView {
    let cell_at = |side: &indexmap::IndexMap<String, Cell>, key: &String| {
        side.get(key).copied().unwrap_or(Cell::NotApplicable)
    };

    if !row.desired_available() {
        let actual = keys
            .iter()
            .map(|key| {
                let cell = cell_at(&row.actual, key);
                rendered(cell, plain_status(cell))
            })
            .collect();
        return RowView {
            label: row.resource_label.clone(),
            desired: None,
            actual,
        };
    }

    let mut desired = Vec::with_capacity(keys.len());
    let mut actual = Vec::with_capacity(keys.len());
    for key in keys {
        let want = cell_at(&row.desired, key);
        let got = cell_at(&row.actual, key);
        let status = match (want, got) {
            (Cell::Value(a), Cell::Value(b)) if a == b => CellStatus::Match,
            (Cell::Value(_), Cell::Value(_)) => CellStatus::Mismatch,
            _ => CellStatus::Plain,
        };
        desired.push(rendered(want, status_for(want, status)));
        actual.push(rendered(got, status_for(got, status)));
    }

    RowView {
        label: row.resource_label.clone(),
        desired: Some(desired),
        actual,
    }
}

fn rendered(cell: Cell, status: CellStatus) -> RenderedCell {
    RenderedCell {
        text: cell.to_string(),
        status,
    }
}

fn plain_status(cell: Cell) -> CellStatus {
    status_for(cell, CellStatus::Plain)
}

fn status_for(cell: Cell, compared: CellStatus) -> CellStatus {
    match cell {
        Cell::NotApplicable => CellStatus::NotApplicable,
        _ => compared,
    }
}
