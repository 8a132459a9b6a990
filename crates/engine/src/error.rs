use std::path::PathBuf;

use thiserror::Error;

use crate::model::ProductId;

/// Every way a combination run (or an authoring edit) can fail.
///
/// All variants are terminal for the current run. Nothing is retried; the
/// caller reports the message and lets the user pick different input.
#[derive(Debug, Error)]
pub enum BoqError {
    /// Zero BoQ documents were supplied to a combination.
    #[error("no BoQ documents supplied; at least one is required")]
    EmptyInput,

    /// A BoQ file is structurally invalid (missing field, bad quantity,
    /// duplicate product id, unparseable JSON).
    #[error("{}: malformed BoQ document: {reason}", path.display())]
    MalformedDocument { path: PathBuf, reason: String },

    /// Reconciliation produced zero rows (every input BoQ is empty).
    #[error("the supplied BoQs contain no items; nothing to combine")]
    EmptyMatrix,

    /// Number of quantity headers differs from the number of reconciled BoQs.
    #[error("expected {expected} BoQ name(s) for the quantity columns, got {found}")]
    HeaderMismatch { expected: usize, found: usize },

    /// The destination could not be written. The destination is left as it was.
    #[error("cannot write {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    /// The source file could not be opened or read.
    #[error("cannot read {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    /// Cancellation was requested before emission started.
    #[error("combination cancelled")]
    Cancelled,

    /// Authoring lookup against the catalog found nothing.
    #[error("product '{0}' not found in catalog")]
    UnknownProduct(ProductId),

    /// Authoring edit referenced a product that is not in the document.
    #[error("product '{0}' is not part of this BoQ")]
    MissingItem(ProductId),

    /// Quantity is negative, NaN or infinite.
    #[error("invalid quantity {0}: must be a finite, non-negative number")]
    InvalidQuantity(f64),

    /// Unit price is NaN or infinite.
    #[error("invalid unit price {0}: must be a finite number")]
    InvalidPrice(f64),

    /// Product id is empty or whitespace.
    #[error("product id must not be empty")]
    EmptyProductId,
}

impl BoqError {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedDocument { path: path.into(), reason: reason.into() }
    }

    pub fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Write { path: path.into(), reason: reason.to_string() }
    }

    pub fn read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Read { path: path.into(), reason: reason.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, BoqError>;
