//! Type normalization and JSON decoding for extracted tables.
//!
//! - **coerce**: per-cell conversion of raw values to declared semantic types
//! - **decode**: defensive parsing of string-encoded JSON documents and their
//!   expansion into columns

pub mod coerce;
pub mod decode;
pub mod error;

pub use coerce::{Coerced, TypedTable, coerce_date, coerce_float, coerce_int, coerce_text, normalize_table};
pub use decode::{DecodeSite, DocumentColumn, JsonField, decode, decode_documents};
pub use error::NormalizeError;
