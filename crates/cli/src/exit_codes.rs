//! CLI Exit Code Registry
//!
//! Single source of truth for the `boq` exit codes. Scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain      | Description                                  |
//! |---------|-------------|----------------------------------------------|
//! | 0       | Universal   | Success                                      |
//! | 1       | Universal   | General error (unspecified)                  |
//! | 2       | Universal   | CLI usage error (bad args)                   |
//! | 3-9     | combine     | Input, reconciliation and output failures    |
//! | 10-19   | authoring   | Catalog and document edit failures           |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in `exit_code` below

use boqsheet_engine::BoqError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, conflicting options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Combine (3-9)
// =============================================================================

/// No BoQ documents were supplied.
pub const EXIT_EMPTY_INPUT: u8 = 3;

/// A BoQ (or catalog) file is structurally invalid.
pub const EXIT_MALFORMED: u8 = 4;

/// Every supplied BoQ was empty; nothing to combine.
pub const EXIT_EMPTY_MATRIX: u8 = 5;

/// The destination could not be written. The previous file is untouched.
pub const EXIT_WRITE: u8 = 6;

/// An input file could not be opened or read.
pub const EXIT_READ: u8 = 7;

/// The run was cancelled before the output was written.
pub const EXIT_CANCELLED: u8 = 8;

// =============================================================================
// Authoring (10-19)
// =============================================================================

/// Product id not found in the catalog.
pub const EXIT_UNKNOWN_PRODUCT: u8 = 10;

/// Product id not present in the BoQ being edited.
pub const EXIT_MISSING_ITEM: u8 = 11;

/// Quantity is negative or not a finite number.
pub const EXIT_INVALID_QUANTITY: u8 = 12;

/// Unit price is not a finite number.
pub const EXIT_INVALID_PRICE: u8 = 13;

/// Product id is empty or blank.
pub const EXIT_EMPTY_PRODUCT_ID: u8 = 14;

/// Map an engine error to its exit code.
pub fn exit_code(err: &BoqError) -> u8 {
    match err {
        BoqError::EmptyInput => EXIT_EMPTY_INPUT,
        BoqError::MalformedDocument { .. } => EXIT_MALFORMED,
        BoqError::EmptyMatrix => EXIT_EMPTY_MATRIX,
        BoqError::Write { .. } => EXIT_WRITE,
        BoqError::Read { .. } => EXIT_READ,
        BoqError::Cancelled => EXIT_CANCELLED,
        BoqError::UnknownProduct(_) => EXIT_UNKNOWN_PRODUCT,
        BoqError::MissingItem(_) => EXIT_MISSING_ITEM,
        BoqError::InvalidQuantity(_) => EXIT_INVALID_QUANTITY,
        BoqError::InvalidPrice(_) => EXIT_INVALID_PRICE,
        BoqError::EmptyProductId => EXIT_EMPTY_PRODUCT_ID,
        // Internal invariant; never caused by user input
        BoqError::HeaderMismatch { .. } => EXIT_ERROR,
    }
}
