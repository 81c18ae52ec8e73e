//! Data model: structured message records and email addresses.

pub mod address;
pub mod record;

pub use address::EmailAddress;
pub use record::{AttributeEntry, Label, MessageRecord, TagEntry, ValueEntry};
