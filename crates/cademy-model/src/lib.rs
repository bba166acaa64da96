pub mod anomaly;
pub mod error;
pub mod ids;
pub mod raw;
pub mod schema;

pub use anomaly::{Anomaly, AnomalyLog, AnomalyRule, AnomalySink, ForeignKeyViolation, RowRef};
pub use error::{ModelError, Result};
pub use ids::TableName;
pub use raw::{RawTable, RawValue};
pub use schema::{ColumnSpec, ForeignKey, PipelineSchema, SemanticType, TableSpec};
