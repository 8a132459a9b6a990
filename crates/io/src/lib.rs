// File I/O: BoQ documents (JSON) and combined spreadsheets (XLSX)

pub mod atomic;
pub mod combine;
pub mod store;
pub mod xlsx;

pub use combine::{combine_documents, combine_files, CombineJob, CombineOptions, CombineReport};
pub use xlsx::{emit_with_style, validate_sheet_name, EmitReport, SheetStyle};
