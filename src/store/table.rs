//! Binary table file format for message records.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ HEADER (32 bytes, fixed)             │
//! │  magic: [u8; 8] = b"SIFTTAB\0"      │
//! │  version: u32                        │
//! │  row_count: u64                      │
//! │  (padding to 32 bytes)               │
//! ├──────────────────────────────────────┤
//! │ ROWS (variable)                      │
//! │  bincode-serialized Vec<TableRow>    │
//! └──────────────────────────────────────┘
//! ```
//!
//! Each row carries the record's scalar fields as columns plus three
//! JSON-encoded string columns for the nested structures (`html_tags`,
//! `link_domains`, `link_contexts`). The JSON encoding is
//! self-describing and round-trips losslessly, preserving tag and
//! context ordering and domain-set membership.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SiftError};
use crate::model::{Label, MessageRecord, TagEntry};

/// Magic bytes identifying a spamsift table file.
pub const MAGIC: &[u8; 8] = b"SIFTTAB\0";

/// Current table format version.
pub const VERSION: u32 = 1;

/// Fixed header size in bytes.
pub const HEADER_SIZE: usize = 32;

/// Serializable table header.
#[derive(Debug, Serialize, Deserialize)]
pub struct TableHeader {
    /// Magic bytes (must equal [`MAGIC`]).
    pub magic: [u8; 8],
    /// Format version (must equal [`VERSION`]).
    pub version: u32,
    /// Number of rows in the table.
    pub row_count: u64,
}

impl TableHeader {
    /// Validate that the header matches the current format.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.magic != *MAGIC {
            return Err("Invalid magic bytes".into());
        }
        if self.version != VERSION {
            return Err(format!(
                "Incompatible version: expected {VERSION}, found {}",
                self.version
            ));
        }
        Ok(())
    }
}

/// One persisted row: scalar columns plus JSON-encoded nested columns.
#[derive(Debug, Serialize, Deserialize)]
struct TableRow {
    id: u64,
    label: String,
    source: String,
    subject: String,
    body: String,
    html_tags: String,
    sender_address: String,
    sender_name: String,
    link_count: u32,
    duplicate_link_count: u32,
    link_domains: String,
    link_contexts: String,
    recipient_count: u32,
    has_attachment: bool,
    auth_failed: bool,
}

impl TableRow {
    fn encode(record: &MessageRecord, path: &Path) -> Result<Self> {
        let json = |reason: serde_json::Error| SiftError::InvalidTable {
            path: path.to_path_buf(),
            reason: format!("Nested column encoding failed: {reason}"),
        };
        Ok(Self {
            id: record.id,
            label: record.label.as_str().to_string(),
            source: record.source.clone(),
            subject: record.subject.clone(),
            body: record.body.clone(),
            html_tags: serde_json::to_string(&record.html_tags).map_err(json)?,
            sender_address: record.sender_address.clone(),
            sender_name: record.sender_name.clone(),
            link_count: record.link_count,
            duplicate_link_count: record.duplicate_link_count,
            link_domains: serde_json::to_string(&record.link_domains).map_err(json)?,
            link_contexts: serde_json::to_string(&record.link_contexts).map_err(json)?,
            recipient_count: record.recipient_count,
            has_attachment: record.has_attachment,
            auth_failed: record.auth_failed,
        })
    }

    fn decode(self, path: &Path) -> Result<MessageRecord> {
        let json = |reason: serde_json::Error| SiftError::InvalidTable {
            path: path.to_path_buf(),
            reason: format!("Nested column decoding failed: {reason}"),
        };
        let html_tags: Vec<TagEntry> = serde_json::from_str(&self.html_tags).map_err(json)?;
        let link_domains: BTreeSet<String> =
            serde_json::from_str(&self.link_domains).map_err(json)?;
        let link_contexts: Vec<String> =
            serde_json::from_str(&self.link_contexts).map_err(json)?;
        Ok(MessageRecord {
            id: self.id,
            label: Label::parse(&self.label),
            source: self.source,
            subject: self.subject,
            body: self.body,
            html_tags,
            sender_address: self.sender_address,
            sender_name: self.sender_name,
            link_count: self.link_count,
            duplicate_link_count: self.duplicate_link_count,
            link_domains,
            link_contexts,
            recipient_count: self.recipient_count,
            has_attachment: self.has_attachment,
            auth_failed: self.auth_failed,
        })
    }
}

/// Write a sequence of records to a table file.
pub fn serialize_records(records: &[MessageRecord], path: &Path) -> Result<()> {
    let header = TableHeader {
        magic: *MAGIC,
        version: VERSION,
        row_count: records.len() as u64,
    };
    let mut bytes = bincode::serialize(&header).map_err(|e| SiftError::InvalidTable {
        path: path.to_path_buf(),
        reason: format!("Header serialization failed: {e}"),
    })?;
    bytes.resize(HEADER_SIZE, 0);

    let rows: Vec<TableRow> = records
        .iter()
        .map(|r| TableRow::encode(r, path))
        .collect::<Result<_>>()?;
    let payload = bincode::serialize(&rows).map_err(|e| SiftError::InvalidTable {
        path: path.to_path_buf(),
        reason: format!("Row serialization failed: {e}"),
    })?;
    bytes.extend_from_slice(&payload);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SiftError::io(parent, e))?;
    }
    std::fs::write(path, bytes).map_err(|e| SiftError::io(path, e))?;
    debug!(path = %path.display(), rows = records.len(), "Wrote table file");
    Ok(())
}

/// Read a table file back into the identical sequence of records.
pub fn deserialize_records(path: &Path) -> Result<Vec<MessageRecord>> {
    let data = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SiftError::FileNotFound(path.to_path_buf())
        } else {
            SiftError::io(path, e)
        }
    })?;

    if data.len() < HEADER_SIZE {
        return Err(SiftError::InvalidTable {
            path: path.to_path_buf(),
            reason: "File too small for header".into(),
        });
    }

    let header: TableHeader =
        bincode::deserialize(&data[..HEADER_SIZE]).map_err(|e| SiftError::InvalidTable {
            path: path.to_path_buf(),
            reason: format!("Header deserialization failed: {e}"),
        })?;
    header.validate().map_err(|reason| SiftError::InvalidTable {
        path: path.to_path_buf(),
        reason,
    })?;

    let rows: Vec<TableRow> =
        bincode::deserialize(&data[HEADER_SIZE..]).map_err(|e| SiftError::InvalidTable {
            path: path.to_path_buf(),
            reason: format!("Row deserialization failed: {e}"),
        })?;

    if rows.len() as u64 != header.row_count {
        return Err(SiftError::InvalidTable {
            path: path.to_path_buf(),
            reason: format!(
                "Row count mismatch: header says {}, payload has {}",
                header.row_count,
                rows.len()
            ),
        });
    }

    rows.into_iter().map(|row| row.decode(path)).collect()
}
