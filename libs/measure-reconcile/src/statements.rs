//! Canonical statement ordering
//!
//! Population statements come first in taxonomy rank, then other statements
//! alphabetically, then functions alphabetically.

use crate::population;
use crate::results::StatementResult;
use std::cmp::Ordering;
use std::collections::HashMap;
use testify_models::{Measure, MeasureGroup, MeasurePopulation};
use tracing::debug;

/// Return `statements` in canonical order for the group `group_id`.
///
/// An absent or unknown `group_id` falls back to the measure's first group.
/// The input slice is left untouched; the sort is stable.
pub fn sort_statements(
    measure: &Measure,
    group_id: Option<&str>,
    statements: &[StatementResult],
) -> Vec<StatementResult> {
    let populations = population_statements(target_group(measure, group_id));

    let mut sorted = statements.to_vec();
    sorted.sort_by(|a, b| compare(a, b, &populations));
    sorted
}

fn target_group<'m>(measure: &'m Measure, group_id: Option<&str>) -> Option<&'m MeasureGroup> {
    if let Some(group) = group_id.and_then(|id| measure.group_by_id(id)) {
        return Some(group);
    }
    debug!(
        measure_id = ?measure.id,
        group_id = ?group_id,
        "No matching group for statement results; using the first group"
    );
    measure.first_group()
}

/// Statement name -> population code, joined on the criteria expression
fn population_statements(group: Option<&MeasureGroup>) -> HashMap<&str, &str> {
    group
        .map(MeasureGroup::populations)
        .unwrap_or_default()
        .iter()
        .filter_map(|p| Some((p.criteria_expression()?, p.code()?)))
        .fold(HashMap::new(), |mut map, (expression, code)| {
            map.entry(expression).or_insert(code);
            map
        })
}

fn compare(a: &StatementResult, b: &StatementResult, populations: &HashMap<&str, &str>) -> Ordering {
    let a_code = populations.get(a.statement_name.as_str());
    let b_code = populations.get(b.statement_name.as_str());

    match (a_code, b_code) {
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(a_code), Some(b_code)) => sort_rank(a_code).cmp(&sort_rank(b_code)),
        (None, None) => a
            .is_function
            .cmp(&b.is_function)
            .then_with(|| a.statement_name.cmp(&b.statement_name)),
    }
}

/// Unranked codes sort after all ranked ones
fn sort_rank(code: &str) -> usize {
    population::rank(code).unwrap_or(usize::MAX)
}

/// Population code backing a statement, when the statement defines a population
pub fn statement_population<'m>(
    measure: &'m Measure,
    group_id: Option<&str>,
    statement_name: &str,
) -> Option<&'m str> {
    target_group(measure, group_id)?
        .populations()
        .iter()
        .find(|p| p.criteria_expression() == Some(statement_name))
        .and_then(MeasurePopulation::code)
}
