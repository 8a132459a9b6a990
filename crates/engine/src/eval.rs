//! In-memory evaluation of artifact formulas.
//!
//! Follows spreadsheet semantics for the three formula shapes the builder
//! produces: blanks and text count as zero inside sums and products.

use crate::table::{Cell, CellRef, Formula, TabularArtifact};

/// Numeric value of the cell at `at`, evaluating formulas recursively.
///
/// Out-of-range references evaluate to 0, like an empty spreadsheet cell.
pub fn value_at(artifact: &TabularArtifact, at: CellRef) -> f64 {
    match artifact.cell(at) {
        Some(cell) => cell_value(artifact, cell),
        None => 0.0,
    }
}

pub fn cell_value(artifact: &TabularArtifact, cell: &Cell) -> f64 {
    match cell {
        Cell::Blank | Cell::Text(_) => 0.0,
        Cell::Number(n) => *n,
        Cell::Formula(f) => eval_formula(artifact, f),
    }
}

pub fn eval_formula(artifact: &TabularArtifact, formula: &Formula) -> f64 {
    match *formula {
        Formula::RowSum { row, first_col, last_col } => (first_col..=last_col)
            .map(|col| value_at(artifact, CellRef::new(row, col)))
            .sum(),
        Formula::Product { left, right } => value_at(artifact, left) * value_at(artifact, right),
        Formula::ColumnSum { col, first_row, last_row } => (first_row..=last_row)
            .map(|row| value_at(artifact, CellRef::new(row, col)))
            .sum(),
    }
}

/// Value of the grand-total cell.
pub fn grand_total(artifact: &TabularArtifact) -> f64 {
    value_at(artifact, CellRef::new(artifact.total_row(), artifact.total_price_col()))
}

/// Every cell as a number, row by row (header excluded).
pub fn evaluate(artifact: &TabularArtifact) -> Vec<Vec<f64>> {
    artifact
        .rows()
        .iter()
        .map(|row| row.cells.iter().map(|c| cell_value(artifact, c)).collect())
        .collect()
}
