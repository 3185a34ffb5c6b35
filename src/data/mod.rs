//! Data module: vertex properties, their per-rank tables, and output records.

pub mod property;
pub mod property_table;
pub mod record;

pub use property::{PropertyGenerator, PropertyValue};
pub use property_table::VertexPropertyTable;
pub use record::{EdgeRecord, Payload, PayloadKind, RecordShape};
