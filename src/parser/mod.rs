//! Message Record Builder: turns raw `.eml` bytes into [`MessageRecord`]s.
//!
//! Parsing is deliberately permissive. Malformed headers, undecodable
//! bodies and broken URLs degrade individual fields to safe defaults and
//! emit warning-level diagnostics; no single message aborts a batch.
//!
//! [`MessageRecord`]: crate::model::MessageRecord

pub mod eml;
pub mod headers;
pub mod html;
pub mod links;
pub mod message;

pub use eml::{parse_eml_file, parse_identifier};
pub use message::build_record;
