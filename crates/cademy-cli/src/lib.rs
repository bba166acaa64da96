//! Library side of the `cademy-etl` runner.

pub mod config;
pub mod logging;
pub mod pipeline;
pub mod types;
