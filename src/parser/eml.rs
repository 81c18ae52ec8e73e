//! Parser entry points for individual `.eml` files.

use std::path::Path;

use crate::error::{Result, SiftError};
use crate::model::{Label, MessageRecord};
use crate::parser::message;

/// Split a filename stem of the form `<integer>_<label>` (e.g. `12_spam`)
/// into its numeric id and label.
pub fn parse_identifier(stem: &str) -> Result<(u64, Label)> {
    let (id_part, label_part) = stem
        .split_once('_')
        .ok_or_else(|| SiftError::BadIdentifier(stem.to_string()))?;
    let id = id_part
        .parse::<u64>()
        .map_err(|_| SiftError::BadIdentifier(stem.to_string()))?;
    Ok((id, Label::parse(label_part)))
}

/// Parse a single `.eml` file into a [`MessageRecord`].
///
/// The file's stem supplies the id and label; `folder_label` is the
/// name of the containing folder (e.g. `trec_ham`).
pub fn parse_eml_file(path: impl AsRef<Path>, folder_label: &str) -> Result<MessageRecord> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SiftError::FileNotFound(path.to_path_buf())
        } else {
            SiftError::io(path, e)
        }
    })?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| SiftError::BadIdentifier(path.display().to_string()))?;

    message::build_record(&data, stem, folder_label)
}
