//! Property-based tests using QuickCheck

use quickcheck::{QuickCheck, TestResult};
use std::collections::HashSet;
use testify_reconcile::{
    build_selection_list, reconcile, render_row, sort_statements, Cell, DesiredSelection,
    DetailedGroupResult, EpisodeResult, NoEpisodeResources, PopulationResult, StatementResult,
};

mod test_support;

/// Measure populations picked from the selectable taxonomy by index
fn codes_from(picks: &[u8]) -> Vec<&'static str> {
    let codes = test_support::selectable_codes();
    picks
        .iter()
        .map(|p| codes[*p as usize % codes.len()])
        .collect()
}

fn patient_results(codes: &[&str], members: &[bool]) -> Vec<PopulationResult> {
    codes
        .iter()
        .enumerate()
        .map(|(i, code)| {
            let member = members.get(i).copied().unwrap_or(false);
            PopulationResult::new(code, code, member)
        })
        .collect()
}

/// Property: reconciliation is a pure function of its inputs
#[test]
fn prop_reconcile_is_deterministic() {
    fn prop(picks: Vec<u8>, members: Vec<bool>, desired: Vec<u8>) -> TestResult {
        if picks.is_empty() {
            return TestResult::discard();
        }
        let codes = codes_from(&picks);
        let pairs: Vec<_> = codes.iter().map(|c| (*c, *c)).collect();
        let measure = test_support::measure_with(&pairs);

        let desired: DesiredSelection = codes_from(&desired).into_iter().collect();
        let result = DetailedGroupResult::patient_based(patient_results(&codes, &members));

        let first = reconcile(&measure, &desired, &result, &NoEpisodeResources).unwrap();
        let second = reconcile(&measure, &desired, &result, &NoEpisodeResources).unwrap();
        TestResult::from_bool(first == second)
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(Vec<u8>, Vec<bool>, Vec<u8>) -> TestResult);
}

/// Property: selection labels and zero-episode matrix keys are the same key space
#[test]
fn prop_selection_labels_match_matrix_keys() {
    fn prop(picks: Vec<u8>) -> TestResult {
        if picks.is_empty() {
            return TestResult::discard();
        }
        let pairs: Vec<_> = codes_from(&picks).into_iter().map(|c| (c, c)).collect();
        let measure = test_support::measure_with(&pairs);

        let labels: Vec<String> = build_selection_list(&measure)
            .unwrap()
            .into_iter()
            .map(|e| e.label)
            .collect();
        let matrix = reconcile(
            &measure,
            &DesiredSelection::new(),
            &DetailedGroupResult::episode_based(vec![]),
            &NoEpisodeResources,
        )
        .unwrap();

        TestResult::from_bool(labels == matrix.keys)
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(Vec<u8>) -> TestResult);
}

/// Property: the selection list never repeats a value
#[test]
fn prop_selection_values_are_unique() {
    fn prop(picks: Vec<u8>) -> TestResult {
        let pairs: Vec<_> = codes_from(&picks).into_iter().map(|c| (c, c)).collect();
        let entries = build_selection_list(&test_support::measure_with(&pairs)).unwrap();

        let distinct: HashSet<_> = entries.iter().map(|e| e.value.as_str()).collect();
        TestResult::from_bool(distinct.len() == entries.len())
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(Vec<u8>) -> TestResult);
}

/// Property: sorting statements is idempotent and keeps every statement
#[test]
fn prop_statement_sort_is_idempotent() {
    fn prop(names: Vec<String>, functions: Vec<bool>) -> TestResult {
        let measure = test_support::proportion_measure();
        let statements: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let statement = StatementResult::new("Lib", name);
                if functions.get(i).copied().unwrap_or(false) {
                    statement.function()
                } else {
                    statement
                }
            })
            .collect();

        let once = sort_statements(&measure, None, &statements);
        let twice = sort_statements(&measure, None, &once);

        let mut before: Vec<_> = statements.iter().map(|s| s.statement_name.clone()).collect();
        let mut after: Vec<_> = once.iter().map(|s| s.statement_name.clone()).collect();
        before.sort();
        after.sort();

        TestResult::from_bool(once == twice && before == after)
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(Vec<String>, Vec<bool>) -> TestResult);
}

/// Property: episode-based patient rows never carry a determined desired value
#[test]
fn prop_episode_rows_suppress_desired_values() {
    fn prop(picks: Vec<u8>, episodes: Vec<Vec<bool>>) -> TestResult {
        if picks.is_empty() {
            return TestResult::discard();
        }
        let codes = codes_from(&picks);
        let pairs: Vec<_> = codes.iter().map(|c| (*c, *c)).collect();
        let measure = test_support::measure_with(&pairs);

        let episode_results: Vec<_> = episodes
            .iter()
            .enumerate()
            .map(|(i, members)| EpisodeResult {
                episode_id: format!("episode-{i}"),
                population_results: patient_results(&codes, members),
            })
            .collect();
        let result = DetailedGroupResult::episode_based(episode_results);

        let desired: DesiredSelection = codes.iter().copied().collect();
        let matrix = reconcile(&measure, &desired, &result, &NoEpisodeResources).unwrap();
        let patient = matrix.patient_row().unwrap();

        let all_undetermined = patient.desired.values().all(|c| *c == Cell::Undetermined);
        let view = render_row(patient, &matrix.keys);
        TestResult::from_bool(all_undetermined && view.desired.is_none())
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(Vec<u8>, Vec<Vec<bool>>) -> TestResult);
}
