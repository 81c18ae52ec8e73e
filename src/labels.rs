//! Judgment store and interactive labelling session.
//!
//! Judgments are hand-assigned verdicts for individual messages, kept
//! in a JSON file mapping message id to `1` (ham), `2` (spam) or `3`
//! (unknown). The file is rewritten after every assignment so an
//! interrupted session loses at most the answer being typed.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SiftError};
use crate::model::{Label, MessageRecord};
use crate::parser::html::strip_tags;

/// A hand-assigned verdict for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Judgment {
    Ham,
    Spam,
    Unknown,
}

impl Judgment {
    /// The label this judgment assigns, if any (unknown keeps the
    /// record's existing label).
    pub fn as_label(self) -> Option<Label> {
        match self {
            Self::Ham => Some(Label::Ham),
            Self::Spam => Some(Label::Spam),
            Self::Unknown => None,
        }
    }
}

impl TryFrom<u8> for Judgment {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Ham),
            2 => Ok(Self::Spam),
            3 => Ok(Self::Unknown),
            other => Err(format!("invalid judgment value {other}")),
        }
    }
}

impl From<Judgment> for u8 {
    fn from(judgment: Judgment) -> Self {
        match judgment {
            Judgment::Ham => 1,
            Judgment::Spam => 2,
            Judgment::Unknown => 3,
        }
    }
}

/// The on-disk judgment store, ordered by message id.
#[derive(Debug)]
pub struct JudgmentStore {
    path: PathBuf,
    entries: BTreeMap<u64, Judgment>,
}

impl JudgmentStore {
    /// Load an existing store, or start an empty one if the file is
    /// absent.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            info!(path = %path.display(), "Labels file not found, starting empty");
            return Ok(Self {
                path,
                entries: BTreeMap::new(),
            });
        }
        let contents =
            std::fs::read_to_string(&path).map_err(|e| SiftError::io(&path, e))?;
        let entries: BTreeMap<u64, Judgment> =
            serde_json::from_str(&contents).map_err(|e| SiftError::LabelsFile {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { path, entries })
    }

    /// Persist the store, keys ordered numerically.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SiftError::io(parent, e))?;
        }
        let contents =
            serde_json::to_string_pretty(&self.entries).map_err(|e| SiftError::LabelsFile {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        std::fs::write(&self.path, contents).map_err(|e| SiftError::io(&self.path, e))
    }

    /// Record a judgment and persist immediately.
    pub fn assign(&mut self, id: u64, judgment: Judgment) -> Result<()> {
        self.entries.insert(id, judgment);
        self.save()
    }

    pub fn get(&self, id: u64) -> Option<Judgment> {
        self.entries.get(&id).copied()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Apply stored judgments to records, producing relabelled copies.
///
/// Records are immutable, so each ham/spam judgment yields a fresh
/// record via [`MessageRecord::with_label`]; unknown judgments and
/// unjudged records pass through unchanged.
pub fn apply_judgments(records: &[MessageRecord], store: &JudgmentStore) -> Vec<MessageRecord> {
    records
        .iter()
        .map(|record| {
            match store.get(record.id).and_then(Judgment::as_label) {
                Some(label) => record.with_label(label),
                None => record.clone(),
            }
        })
        .collect()
}

/// Run an interactive labelling session over the given records.
///
/// Records already present in the store are skipped; every answer is
/// persisted immediately. `q` quits early, any other unrecognized
/// input skips the current record.
pub fn run_labelling_session(
    records: &[MessageRecord],
    store: &mut JudgmentStore,
    snippet_chars: usize,
) -> Result<()> {
    println!("Loaded {} existing labels.", store.len());
    println!(
        "{} emails remaining to label.",
        records.iter().filter(|r| !store.contains(r.id)).count()
    );

    let stdin = std::io::stdin();
    let mut input = stdin.lock();

    let mut ordered: Vec<&MessageRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.id);

    for record in ordered {
        if store.contains(record.id) {
            continue;
        }
        print_record_summary(record, snippet_chars);

        print!("[1]=Ham  [2]=Spam  [3]=Unknown  [q]=Quit\n> ");
        std::io::stdout().flush().map_err(SiftError::from)?;
        let mut line = String::new();
        input.read_line(&mut line).map_err(SiftError::from)?;

        match line.trim() {
            "q" | "Q" => {
                println!("Quitting early.");
                break;
            }
            "1" => store.assign(record.id, Judgment::Ham)?,
            "2" => store.assign(record.id, Judgment::Spam)?,
            "3" => store.assign(record.id, Judgment::Unknown)?,
            other => {
                println!("Unrecognized input {other:?}; skipping this email.");
                continue;
            }
        }
        println!("Labelled email {}.", record.id);
    }

    println!("Labelling session complete. {} labels saved.", store.len());
    Ok(())
}

fn print_record_summary(record: &MessageRecord, snippet_chars: usize) {
    let bar = "=".repeat(75);
    println!("{bar}");
    println!("Labelling email ID: {}", record.id);
    println!(
        "From: {} | Links: {} | Attachments: {}",
        record.sender_address, record.link_count, record.has_attachment
    );
    println!("Subject: {}", record.subject);
    let snippet: String = strip_tags(&record.body).chars().take(snippet_chars).collect();
    println!("{snippet} ...");
    println!("{bar}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn record(id: u64, label: Label) -> MessageRecord {
        MessageRecord {
            id,
            label,
            source: "personal".into(),
            subject: String::new(),
            body: String::new(),
            html_tags: Vec::new(),
            sender_address: String::new(),
            sender_name: String::new(),
            link_count: 0,
            duplicate_link_count: 0,
            link_domains: BTreeSet::new(),
            link_contexts: Vec::new(),
            recipient_count: 0,
            has_attachment: false,
            auth_failed: false,
        }
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JudgmentStore::load(dir.path().join("labels.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_assign_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");

        let mut store = JudgmentStore::load(&path).unwrap();
        store.assign(12, Judgment::Spam).unwrap();
        store.assign(3, Judgment::Ham).unwrap();

        let reloaded = JudgmentStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get(12), Some(Judgment::Spam));
        assert_eq!(reloaded.get(3), Some(Judgment::Ham));
    }

    #[test]
    fn test_saved_keys_are_numerically_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");

        let mut store = JudgmentStore::load(&path).unwrap();
        store.assign(10, Judgment::Ham).unwrap();
        store.assign(2, Judgment::Spam).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let pos_2 = contents.find("\"2\"").unwrap();
        let pos_10 = contents.find("\"10\"").unwrap();
        assert!(pos_2 < pos_10);
    }

    #[test]
    fn test_invalid_judgment_value_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        std::fs::write(&path, r#"{"1": 9}"#).unwrap();
        assert!(matches!(
            JudgmentStore::load(&path),
            Err(SiftError::LabelsFile { .. })
        ));
    }

    #[test]
    fn test_apply_judgments_relabels_copies() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JudgmentStore::load(dir.path().join("labels.json")).unwrap();
        store.assign(1, Judgment::Spam).unwrap();
        store.assign(2, Judgment::Unknown).unwrap();

        let records = vec![
            record(1, Label::Inbox),
            record(2, Label::Inbox),
            record(3, Label::Inbox),
        ];
        let relabelled = apply_judgments(&records, &store);
        assert_eq!(relabelled[0].label, Label::Spam);
        assert_eq!(relabelled[1].label, Label::Inbox);
        assert_eq!(relabelled[2].label, Label::Inbox);
        // Originals untouched.
        assert_eq!(records[0].label, Label::Inbox);
    }
}
