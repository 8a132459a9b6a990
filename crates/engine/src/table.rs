//! Formula table construction.
//!
//! Turns a [`ReconciledMatrix`] into a format-agnostic [`TabularArtifact`]:
//! column descriptors, data rows and a terminal grand-total row. Sums and
//! totals are kept as [`Formula`] descriptions over artifact coordinates and
//! only become native spreadsheet syntax at emission time.

use serde::Serialize;

use crate::error::{BoqError, Result};
use crate::model::BoqDocument;
use crate::reconcile::ReconciledMatrix;

/// Fixed column positions before the per-BoQ quantity columns.
pub const NAME_COL: usize = 0;
pub const UNIT_COL: usize = 1;
pub const PRICE_COL: usize = 2;
pub const FIRST_QTY_COL: usize = 3;

// ---------------------------------------------------------------------------
// Formula descriptions
// ---------------------------------------------------------------------------

/// Cell coordinate inside the artifact. `row` counts data rows from 0; the
/// header is not a row of the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Formula {
    /// Sum of `row` across columns `first_col..=last_col`.
    RowSum { row: usize, first_col: usize, last_col: usize },
    /// `left * right`.
    Product { left: CellRef, right: CellRef },
    /// Sum of `col` down rows `first_row..=last_row`.
    ColumnSum { col: usize, first_row: usize, last_row: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Blank,
    Text(String),
    Number(f64),
    Formula(Formula),
}

impl Cell {
    fn text_or_blank(value: Option<&str>) -> Self {
        match value {
            Some(s) if !s.is_empty() => Cell::Text(s.to_string()),
            _ => Cell::Blank,
        }
    }

    fn number_or_blank(value: Option<f64>) -> Self {
        value.map_or(Cell::Blank, Cell::Number)
    }
}

// ---------------------------------------------------------------------------
// Columns + rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Name,
    Unit,
    UnitPrice,
    /// Quantity column of the BoQ at this input index.
    Quantity(usize),
    QuantitySum,
    TotalPrice,
}

/// How a column's numbers should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberStyle {
    Text,
    Quantity,
    Money,
}

impl ColumnKind {
    pub fn number_style(&self) -> NumberStyle {
        match self {
            Self::Name | Self::Unit => NumberStyle::Text,
            Self::Quantity(_) | Self::QuantitySum => NumberStyle::Quantity,
            Self::UnitPrice | Self::TotalPrice => NumberStyle::Money,
        }
    }

    /// Computed columns are emphasised in the output.
    pub fn is_computed(&self) -> bool {
        matches!(self, Self::QuantitySum | Self::TotalPrice)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub kind: ColumnKind,
    pub header: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Data,
    Total,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub kind: RowKind,
    pub cells: Vec<Cell>,
}

/// Header text used by the builder.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLabels {
    pub name: String,
    pub unit: String,
    pub unit_price: String,
    pub quantity_sum: String,
    pub total_price: String,
    pub grand_total: String,
}

impl Default for TableLabels {
    fn default() -> Self {
        Self {
            name: "Name".into(),
            unit: "Unit".into(),
            unit_price: "Unit price".into(),
            quantity_sum: "Total quantity".into(),
            total_price: "Total price".into(),
            grand_total: "TOTAL".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// The built table. Immutable once returned by [`build`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabularArtifact {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl TabularArtifact {
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn data_row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    pub fn boq_count(&self) -> usize {
        self.columns.len() - (FIRST_QTY_COL + 2)
    }

    pub fn quantity_sum_col(&self) -> usize {
        self.columns.len() - 2
    }

    pub fn total_price_col(&self) -> usize {
        self.columns.len() - 1
    }

    /// Index of the grand-total row (always last).
    pub fn total_row(&self) -> usize {
        self.rows.len() - 1
    }

    pub fn cell(&self, at: CellRef) -> Option<&Cell> {
        self.rows.get(at.row).and_then(|r| r.cells.get(at.col))
    }
}

/// Collect BoQ names in input order, for use as quantity headers.
pub fn boq_names(boqs: &[BoqDocument]) -> Vec<String> {
    boqs.iter().map(|b| b.name.clone()).collect()
}

/// Build with the default English labels.
pub fn build(matrix: &ReconciledMatrix, boq_names: &[String]) -> Result<TabularArtifact> {
    build_with_labels(matrix, boq_names, &TableLabels::default())
}

pub fn build_with_labels(
    matrix: &ReconciledMatrix,
    boq_names: &[String],
    labels: &TableLabels,
) -> Result<TabularArtifact> {
    if matrix.is_empty() {
        return Err(BoqError::EmptyMatrix);
    }
    if boq_names.len() != matrix.boq_count {
        return Err(BoqError::HeaderMismatch {
            expected: matrix.boq_count,
            found: boq_names.len(),
        });
    }

    let n = matrix.boq_count;
    let last_qty_col = FIRST_QTY_COL + n - 1;
    let sum_col = FIRST_QTY_COL + n;
    let total_col = sum_col + 1;

    let mut columns = Vec::with_capacity(total_col + 1);
    columns.push(Column { kind: ColumnKind::Name, header: labels.name.clone() });
    columns.push(Column { kind: ColumnKind::Unit, header: labels.unit.clone() });
    columns.push(Column { kind: ColumnKind::UnitPrice, header: labels.unit_price.clone() });
    for (i, name) in boq_names.iter().enumerate() {
        columns.push(Column { kind: ColumnKind::Quantity(i), header: name.clone() });
    }
    columns.push(Column { kind: ColumnKind::QuantitySum, header: labels.quantity_sum.clone() });
    columns.push(Column { kind: ColumnKind::TotalPrice, header: labels.total_price.clone() });

    let mut rows = Vec::with_capacity(matrix.len() + 1);
    for (r, item) in matrix.rows.iter().enumerate() {
        let mut cells = Vec::with_capacity(columns.len());
        cells.push(Cell::Text(item.name.clone()));
        cells.push(Cell::text_or_blank(item.unit.as_deref()));
        cells.push(Cell::number_or_blank(item.unit_price));
        cells.extend(item.quantities.iter().map(|q| Cell::Number(*q)));
        cells.push(Cell::Formula(Formula::RowSum {
            row: r,
            first_col: FIRST_QTY_COL,
            last_col: last_qty_col,
        }));
        cells.push(Cell::Formula(Formula::Product {
            left: CellRef::new(r, sum_col),
            right: CellRef::new(r, PRICE_COL),
        }));
        rows.push(Row { kind: RowKind::Data, cells });
    }

    let mut total_cells = vec![Cell::Blank; columns.len()];
    total_cells[NAME_COL] = Cell::Text(labels.grand_total.clone());
    total_cells[total_col] = Cell::Formula(Formula::ColumnSum {
        col: total_col,
        first_row: 0,
        last_row: matrix.len() - 1,
    });
    rows.push(Row { kind: RowKind::Total, cells: total_cells });

    tracing::debug!(columns = columns.len(), rows = rows.len(), "built formula table");
    Ok(TabularArtifact { columns, rows })
}
