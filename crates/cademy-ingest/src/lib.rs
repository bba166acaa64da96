pub mod error;
pub mod source;

pub use error::ExtractError;
pub use source::{SourceStore, extract_all};
