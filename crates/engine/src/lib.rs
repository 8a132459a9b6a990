//! `boqsheet-engine`: BoQ reconciliation and formula-table engine.
//!
//! Pure crate: receives in-memory BoQ documents, returns a reconciled matrix
//! and a format-agnostic table. No filesystem access.

pub mod cancel;
pub mod catalog;
pub mod error;
pub mod eval;
pub mod model;
pub mod reconcile;
pub mod table;

pub use cancel::CancelToken;
pub use catalog::{Catalog, InMemoryCatalog};
pub use error::{BoqError, Result};
pub use model::{BoqDocument, LineItem, Product, ProductId};
pub use reconcile::{reconcile, MatrixRow, ReconciledMatrix};
pub use table::{build, build_with_labels, TableLabels, TabularArtifact};
