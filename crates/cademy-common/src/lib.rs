//! Shared utilities for cademy crates.
//!
//! This crate provides the [`TableSnapshot`] frame type passed between
//! pipeline stages, Polars `AnyValue` helpers used to read it, and SQL
//! identifier quoting.

pub mod frame;
pub mod polars;
pub mod sql;

pub use frame::TableSnapshot;
pub use polars::{
    any_to_string, any_to_string_non_empty, format_numeric, integral_f64, parse_f64, parse_i64,
};
pub use sql::quote_identifier;
