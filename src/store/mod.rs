//! Durable tabular storage for parsed message records.

pub mod table;

pub use table::{deserialize_records, serialize_records};
