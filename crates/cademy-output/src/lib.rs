//! Loader for the analytics database.
//!
//! All tables are replaced inside one transaction: a run either commits
//! every table or leaves the destination as it was.

mod error;
mod sqlite;

pub use error::LoadError;
pub use sqlite::{LoadSummary, TableLoad, load_tables, sql_type};
