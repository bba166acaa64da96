//! Row and referential validation of normalized tables.
//!
//! - **rows**: drops rows whose required identifiers are null
//! - **referential**: reports child values with no matching parent key,
//!   without touching any row

pub mod error;
pub mod referential;
pub mod rows;

pub use error::ValidateError;
pub use referential::{ForeignKeyCheck, ReferentialReport, validate_foreign_keys};
pub use rows::{RowValidation, validate_rows};
