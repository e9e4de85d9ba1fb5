//! Terminal tables

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use testify_reconcile::{
    render_row, CellStatus, ComparisonMatrix, RenderedCell, SelectionEntry, StatementResult,
};

fn new_table(header: Vec<Cell>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn header(names: impl IntoIterator<Item = impl Into<String>>) -> Vec<Cell> {
    names
        .into_iter()
        .map(|name| {
            let name: String = name.into();
            Cell::new(name).add_attribute(Attribute::Bold)
        })
        .collect()
}

fn styled(cell: &RenderedCell, color: bool) -> Cell {
    let rendered = Cell::new(&cell.text);
    if !color {
        return rendered;
    }
    match cell.status {
        CellStatus::Match => rendered.fg(Color::Green),
        CellStatus::Mismatch => rendered.fg(Color::Red),
        CellStatus::NotApplicable => rendered.fg(Color::DarkGrey),
        CellStatus::Plain => rendered,
    }
}

/// One "Desired"/"Actual" sub-row pair per matrix row; the desired sub-row
/// is omitted when the row's desired values are undetermined
pub fn comparison_table(matrix: &ComparisonMatrix, color: bool) -> Table {
    let mut names = vec!["Resource".to_string(), String::new()];
    names.extend(matrix.keys.iter().cloned());
    let mut table = new_table(header(names));

    for row in &matrix.rows {
        let view = render_row(row, &matrix.keys);
        let mut actual_label = view.label.clone();

        if let Some(desired) = &view.desired {
            let mut cells = vec![Cell::new(&view.label), Cell::new("Desired")];
            cells.extend(desired.iter().map(|c| styled(c, color)));
            table.add_row(cells);
            actual_label.clear();
        }

        let mut cells = vec![Cell::new(actual_label), Cell::new("Actual")];
        cells.extend(view.actual.iter().map(|c| styled(c, color)));
        table.add_row(cells);
    }

    table
}

pub fn selection_table(entries: &[SelectionEntry]) -> Table {
    let mut table = new_table(header(["Label", "Value"]));
    for entry in entries {
        table.add_row(vec![Cell::new(&entry.label), Cell::new(&entry.value)]);
    }
    table
}

/// Statements with the population shorthand they define, if any
pub fn statement_table(statements: &[(&StatementResult, Option<&str>)], color: bool) -> Table {
    let mut table = new_table(header([
        "Statement",
        "Library",
        "Population",
        "Final",
        "Relevance",
        "Value",
    ]));

    for (statement, population) in statements {
        let mut name = Cell::new(&statement.statement_name);
        if statement.is_function && color {
            name = name.add_attribute(Attribute::Italic);
        }
        table.add_row(vec![
            name,
            Cell::new(&statement.library_name),
            Cell::new(population.unwrap_or_default()),
            Cell::new(statement.final_result.as_str()),
            Cell::new(statement.relevance.as_str()),
            Cell::new(statement_value(statement)),
        ]);
    }

    table
}

fn statement_value(statement: &StatementResult) -> String {
    match (&statement.pretty, &statement.raw) {
        (Some(pretty), _) => pretty.clone(),
        (None, Some(raw)) => raw.to_string(),
        (None, None) => String::new(),
    }
}
