//! Item reconciliation across BoQ documents.
//!
//! Unions item identities over N documents (by product id), keeps first-seen
//! row order, and aligns quantities into one slot per document. Absent items
//! get a quantity of 0 in that document's slot.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::error::{BoqError, Result};
use crate::model::{BoqDocument, LineItem, ProductId};

/// One reconciled product with its per-BoQ quantities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixRow {
    pub id: ProductId,
    /// Snapshot from the first BoQ (in caller order) containing the product.
    pub name: String,
    pub unit: Option<String>,
    pub unit_price: Option<f64>,
    pub category: Option<String>,
    /// Exactly one entry per input BoQ, in input order.
    pub quantities: Vec<f64>,
    /// Indices of later BoQs whose snapshot disagreed with the one kept.
    pub conflicts: Vec<usize>,
}

impl MatrixRow {
    pub fn quantity_sum(&self) -> f64 {
        self.quantities.iter().sum()
    }

    /// Sum of quantities times unit price (missing price counts as zero).
    pub fn total_price(&self) -> f64 {
        self.quantity_sum() * self.unit_price.unwrap_or(0.0)
    }

    fn seed(item: &LineItem, boq_count: usize) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            unit: item.unit.clone(),
            unit_price: item.unit_price,
            category: item.category.clone(),
            quantities: vec![0.0; boq_count],
            conflicts: Vec::new(),
        }
    }

    fn snapshot_matches(&self, item: &LineItem) -> bool {
        self.name == item.name && self.unit == item.unit && self.unit_price == item.unit_price
    }
}

/// The union of all line items across the inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledMatrix {
    pub boq_count: usize,
    pub rows: Vec<MatrixRow>,
}

impl ReconciledMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose snapshot diverged in at least one later BoQ.
    pub fn conflicted_rows(&self) -> impl Iterator<Item = &MatrixRow> {
        self.rows.iter().filter(|r| !r.conflicts.is_empty())
    }

    /// Per-BoQ sum of quantities (one entry per input BoQ).
    pub fn column_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.boq_count];
        for row in &self.rows {
            for (sum, q) in sums.iter_mut().zip(&row.quantities) {
                *sum += q;
            }
        }
        sums
    }
}

/// Reconcile BoQs in caller order.
///
/// Conflicting snapshots for the same product id resolve to the first one
/// seen; later divergences are recorded in [`MatrixRow::conflicts`] and logged.
/// Inputs are never mutated.
pub fn reconcile(boqs: &[BoqDocument]) -> Result<ReconciledMatrix> {
    if boqs.is_empty() {
        return Err(BoqError::EmptyInput);
    }

    let boq_count = boqs.len();
    let mut index: FxHashMap<&ProductId, usize> = FxHashMap::default();
    let mut rows: Vec<MatrixRow> = Vec::new();

    for (boq_idx, boq) in boqs.iter().enumerate() {
        for item in &boq.items {
            let row_idx = *index.entry(&item.id).or_insert_with(|| {
                rows.push(MatrixRow::seed(item, boq_count));
                rows.len() - 1
            });

            let row = &mut rows[row_idx];
            if !row.snapshot_matches(item) && !row.conflicts.contains(&boq_idx) {
                tracing::warn!(
                    product = %item.id,
                    kept = %row.name,
                    boq = %boq.name,
                    "divergent product snapshot; keeping first-seen values"
                );
                row.conflicts.push(boq_idx);
            }
            // Assign, not add: an id occurs at most once per BoQ.
            row.quantities[boq_idx] = item.quantity;
        }
        tracing::debug!(boq = %boq.name, items = boq.items.len(), "reconciled BoQ");
    }

    Ok(ReconciledMatrix { boq_count, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, items: &[(&str, f64, f64)]) -> BoqDocument {
        let mut d = BoqDocument::new(name);
        for (id, qty, price) in items {
            d.items.push(LineItem::new(*id, format!("item {id}"), *qty).with_price(*price));
        }
        d
    }

    #[test]
    fn empty_input_rejected() {
        assert!(matches!(reconcile(&[]), Err(BoqError::EmptyInput)));
    }

    #[test]
    fn worked_example() {
        let a = doc("A", &[("1", 5.0, 2.0), ("2", 3.0, 4.0)]);
        let b = doc("B", &[("2", 1.0, 4.0), ("3", 2.0, 1.5)]);
        let m = reconcile(&[a, b]).unwrap();

        assert_eq!(m.boq_count, 2);
        let ids: Vec<&str> = m.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(m.rows[0].quantities, vec![5.0, 0.0]);
        assert_eq!(m.rows[1].quantities, vec![3.0, 1.0]);
        assert_eq!(m.rows[2].quantities, vec![0.0, 2.0]);

        let totals: Vec<f64> = m.rows.iter().map(MatrixRow::total_price).collect();
        assert_eq!(totals, vec![10.0, 16.0, 3.0]);
        assert_eq!(totals.iter().sum::<f64>(), 29.0);
    }

    #[test]
    fn first_seen_snapshot_wins_and_conflict_recorded() {
        let a = doc("A", &[("x", 1.0, 10.0)]);
        let mut b = doc("B", &[("x", 2.0, 12.0)]);
        b.items[0].name = "renamed".into();
        let c = doc("C", &[("x", 3.0, 10.0)]);

        let m = reconcile(&[a, b, c]).unwrap();
        let row = &m.rows[0];
        assert_eq!(row.name, "item x");
        assert_eq!(row.unit_price, Some(10.0));
        assert_eq!(row.conflicts, vec![1]);
        assert_eq!(row.quantities, vec![1.0, 2.0, 3.0]);
        assert_eq!(m.conflicted_rows().count(), 1);
    }

    #[test]
    fn all_empty_boqs_yield_empty_matrix() {
        let m = reconcile(&[BoqDocument::new("A"), BoqDocument::new("B")]).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.column_sums(), vec![0.0, 0.0]);
    }

    #[test]
    fn missing_price_preserved() {
        let mut a = BoqDocument::new("A");
        a.items.push(LineItem::new("np", "No price", 4.0));
        let m = reconcile(&[a]).unwrap();
        assert_eq!(m.rows[0].unit_price, None);
        assert_eq!(m.rows[0].total_price(), 0.0);
    }

    #[test]
    fn same_boq_twice_gives_two_equal_columns() {
        let a = doc("A", &[("1", 5.0, 2.0), ("2", 3.0, 4.0)]);
        let m = reconcile(&[a.clone(), a]).unwrap();
        for row in &m.rows {
            assert_eq!(row.quantities[0], row.quantities[1]);
            assert!(row.conflicts.is_empty());
        }
    }
}
