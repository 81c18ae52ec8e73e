//! Corpus organisation and batch parsing.
//!
//! The public corpora ship in their own layouts; `organise_*` copies
//! each message into the common `raw/<dataset>_<label>/` layout with
//! `<n>_<label>.eml` filenames. `parse_folder` then turns a raw folder
//! into message records, and `process_dataset` writes a dataset's
//! records to its processed table file.
//!
//! Errors here are boundary errors: a missing index file or corpus
//! folder aborts the run. Individual unreadable messages are logged
//! and skipped.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::DatasetPaths;
use crate::error::{Result, SiftError};
use crate::model::MessageRecord;
use crate::parser::parse_eml_file;
use crate::store::serialize_records;

/// Outcome of organising one external corpus.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct OrganiseSummary {
    /// Ham files copied.
    pub ham: u64,
    /// Spam files copied.
    pub spam: u64,
    /// Entries skipped (missing files, non-file directory entries).
    pub skipped: u64,
}

/// Organise the TREC Public Spam Corpus.
///
/// Reads `<external>/full/index`, whose lines are `<label> <relative
/// path>`, and copies each listed file to the ham or spam folder as
/// `<n>_<label>.eml` with per-label 1-based counters. Missing data
/// files are skipped and counted; a missing index file is fatal.
pub fn organise_trec(external: &Path, ham_dir: &Path, spam_dir: &Path) -> Result<OrganiseSummary> {
    info!("Starting TREC data organisation");
    std::fs::create_dir_all(ham_dir).map_err(|e| SiftError::io(ham_dir, e))?;
    std::fs::create_dir_all(spam_dir).map_err(|e| SiftError::io(spam_dir, e))?;

    let index_path = external.join("full").join("index");
    if !index_path.is_file() {
        return Err(SiftError::MissingResource {
            path: index_path,
            hint: "Verify that the TREC dataset was unzipped correctly and a \
                   'full' folder containing an 'index' file exists. The corpus \
                   is available from https://plg.uwaterloo.ca/~gvcormac/treccorpus/"
                .into(),
        });
    }

    let index =
        std::fs::read_to_string(&index_path).map_err(|e| SiftError::io(&index_path, e))?;

    let mut summary = OrganiseSummary::default();
    for line in index.lines() {
        let Some((label, rel_path)) = line.trim().split_once(char::is_whitespace) else {
            continue;
        };
        if label != "ham" && label != "spam" {
            return Err(SiftError::MissingResource {
                path: index_path.clone(),
                hint: format!("Invalid label '{label}' in index"),
            });
        }

        let src = external.join("full").join(rel_path.trim());
        if !src.is_file() {
            summary.skipped += 1;
            debug!(path = %src.display(), "Data file missing");
            continue;
        }

        let dest = if label == "ham" {
            summary.ham += 1;
            ham_dir.join(format!("{}_ham.eml", summary.ham))
        } else {
            summary.spam += 1;
            spam_dir.join(format!("{}_spam.eml", summary.spam))
        };
        std::fs::copy(&src, &dest).map_err(|e| SiftError::io(&src, e))?;
    }

    if summary.skipped > 0 {
        warn!(
            skipped = summary.skipped,
            "Skipped invalid or missing files; raise log level to debug for details"
        );
    }
    info!(ham = summary.ham, spam = summary.spam, "TREC data organisation complete");
    Ok(summary)
}

/// Organise the SpamAssassin public corpus.
///
/// Walks the external folder's subdirectories, whose names must contain
/// `ham` or `spam`, copying every file to the matching folder as
/// `<n>_<label>.eml`. A subdirectory with neither word in its name is
/// fatal, as is a missing external folder.
pub fn organise_spamassassin(
    external: &Path,
    ham_dir: &Path,
    spam_dir: &Path,
) -> Result<OrganiseSummary> {
    info!("Starting SpamAssassin data organisation");
    std::fs::create_dir_all(ham_dir).map_err(|e| SiftError::io(ham_dir, e))?;
    std::fs::create_dir_all(spam_dir).map_err(|e| SiftError::io(spam_dir, e))?;

    if !external.is_dir() {
        return Err(SiftError::MissingResource {
            path: external.to_path_buf(),
            hint: "Verify that the dataset directory exists and contains \
                   subfolders whose names include 'ham' or 'spam'. The corpus \
                   is available from https://spamassassin.apache.org/old/publiccorpus/"
                .into(),
        });
    }

    let mut subdirs: Vec<PathBuf> = std::fs::read_dir(external)
        .map_err(|e| SiftError::io(external, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    subdirs.sort();

    let mut summary = OrganiseSummary::default();
    for subdir in subdirs {
        let name = subdir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !subdir.is_dir() || (!name.contains("ham") && !name.contains("spam")) {
            return Err(SiftError::MissingResource {
                path: subdir.clone(),
                hint: "Unexpected entry in SpamAssassin external data".into(),
            });
        }
        let is_spam = name.contains("spam");

        let mut files: Vec<PathBuf> = std::fs::read_dir(&subdir)
            .map_err(|e| SiftError::io(&subdir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        files.sort();

        for src in files {
            if !src.is_file() {
                summary.skipped += 1;
                debug!(path = %src.display(), "Skipping non-file entry");
                continue;
            }
            let dest = if is_spam {
                summary.spam += 1;
                spam_dir.join(format!("{}_spam.eml", summary.spam))
            } else {
                summary.ham += 1;
                ham_dir.join(format!("{}_ham.eml", summary.ham))
            };
            std::fs::copy(&src, &dest).map_err(|e| SiftError::io(&src, e))?;
        }
    }

    if summary.skipped > 0 {
        warn!(skipped = summary.skipped, "Skipped non-file entries");
    }
    info!(
        ham = summary.ham,
        spam = summary.spam,
        "SpamAssassin data organisation complete"
    );
    Ok(summary)
}

/// Parse every `.eml` file in a raw folder, sorted by filename.
///
/// The folder's own name supplies the folder label (and thus record
/// source). Files that fail to parse are logged and skipped; the
/// optional progress callback receives `(done, total)`.
pub fn parse_folder(
    folder: &Path,
    progress: Option<&dyn Fn(u64, u64)>,
) -> Result<Vec<MessageRecord>> {
    if !folder.is_dir() {
        return Err(SiftError::MissingResource {
            path: folder.to_path_buf(),
            hint: "Raw message folder not found".into(),
        });
    }
    let folder_label = folder
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let mut paths: Vec<PathBuf> = std::fs::read_dir(folder)
        .map_err(|e| SiftError::io(folder, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "eml"))
        .collect();
    paths.sort();

    let total = paths.len() as u64;
    let mut records = Vec::with_capacity(paths.len());
    for (done, path) in paths.iter().enumerate() {
        match parse_eml_file(path, &folder_label) {
            Ok(record) => records.push(record),
            Err(error) => {
                warn!(path = %path.display(), %error, "Skipping unparseable message");
            }
        }
        if let Some(report) = progress {
            report(done as u64 + 1, total);
        }
    }

    info!(
        folder = %folder.display(),
        parsed = records.len(),
        total,
        "Parsed raw folder"
    );
    Ok(records)
}

/// Parse all of a dataset's raw folders and write its processed table.
///
/// Absent folders are logged and skipped; an absent processed path
/// means the dataset cannot be persisted and is fatal.
pub fn process_dataset(
    paths: &DatasetPaths,
    progress: Option<&dyn Fn(u64, u64)>,
) -> Result<Vec<MessageRecord>> {
    let mut records = Vec::new();
    for folder in paths.raw_folders() {
        if !folder.is_dir() {
            info!(folder = %folder.display(), "Raw folder not found, skipping");
            continue;
        }
        records.extend(parse_folder(folder, progress)?);
    }

    let processed = paths.processed.as_ref().ok_or_else(|| {
        SiftError::MissingResource {
            path: PathBuf::from("<processed>"),
            hint: "Dataset has no processed table path".into(),
        }
    })?;
    serialize_records(&records, processed)?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Label;

    fn write_eml(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    const SIMPLE_EML: &str = "From: a@x.com\nSubject: t\n\nbody\n";

    #[test]
    fn test_parse_folder_sorted_and_labelled() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("trec_ham");
        std::fs::create_dir_all(&folder).unwrap();
        write_eml(&folder, "2_ham.eml", SIMPLE_EML);
        write_eml(&folder, "1_ham.eml", SIMPLE_EML);
        write_eml(&folder, "notes.txt", "not an email");

        let records = parse_folder(&folder, None).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[1].id, 2);
        assert!(records.iter().all(|r| r.label == Label::Ham));
        assert!(records.iter().all(|r| r.source == "trec"));
    }

    #[test]
    fn test_parse_folder_skips_bad_stems() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("trec_spam");
        std::fs::create_dir_all(&folder).unwrap();
        write_eml(&folder, "1_spam.eml", SIMPLE_EML);
        write_eml(&folder, "badname.eml", SIMPLE_EML);

        let records = parse_folder(&folder, None).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_parse_missing_folder_is_fatal() {
        let err = parse_folder(Path::new("/nonexistent/trec_ham"), None).unwrap_err();
        assert!(matches!(err, SiftError::MissingResource { .. }));
    }

    #[test]
    fn test_organise_trec_copies_by_index() {
        let dir = tempfile::tempdir().unwrap();
        let external = dir.path().join("external");
        let data = external.join("full").join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join("msg.1"), SIMPLE_EML).unwrap();
        std::fs::write(data.join("msg.2"), SIMPLE_EML).unwrap();
        std::fs::write(
            external.join("full").join("index"),
            "spam data/msg.1\nham data/msg.2\nham data/missing\n",
        )
        .unwrap();

        let ham_dir = dir.path().join("ham");
        let spam_dir = dir.path().join("spam");
        let summary = organise_trec(&external, &ham_dir, &spam_dir).unwrap();

        assert_eq!(summary.ham, 1);
        assert_eq!(summary.spam, 1);
        assert_eq!(summary.skipped, 1);
        assert!(spam_dir.join("1_spam.eml").is_file());
        assert!(ham_dir.join("1_ham.eml").is_file());
    }

    #[test]
    fn test_organise_trec_missing_index_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = organise_trec(
            &dir.path().join("external"),
            &dir.path().join("ham"),
            &dir.path().join("spam"),
        )
        .unwrap_err();
        assert!(matches!(err, SiftError::MissingResource { .. }));
    }

    #[test]
    fn test_organise_spamassassin_by_folder_name() {
        let dir = tempfile::tempdir().unwrap();
        let external = dir.path().join("external");
        std::fs::create_dir_all(external.join("easy_ham")).unwrap();
        std::fs::create_dir_all(external.join("spam_2")).unwrap();
        std::fs::write(external.join("easy_ham").join("0001.aaa"), SIMPLE_EML).unwrap();
        std::fs::write(external.join("spam_2").join("0001.bbb"), SIMPLE_EML).unwrap();
        std::fs::write(external.join("spam_2").join("0002.ccc"), SIMPLE_EML).unwrap();

        let ham_dir = dir.path().join("ham");
        let spam_dir = dir.path().join("spam");
        let summary = organise_spamassassin(&external, &ham_dir, &spam_dir).unwrap();

        assert_eq!(summary.ham, 1);
        assert_eq!(summary.spam, 2);
        assert!(ham_dir.join("1_ham.eml").is_file());
        assert!(spam_dir.join("2_spam.eml").is_file());
    }

    #[test]
    fn test_organise_spamassassin_rejects_stray_folder() {
        let dir = tempfile::tempdir().unwrap();
        let external = dir.path().join("external");
        std::fs::create_dir_all(external.join("unrelated")).unwrap();

        let err = organise_spamassassin(
            &external,
            &dir.path().join("ham"),
            &dir.path().join("spam"),
        )
        .unwrap_err();
        assert!(matches!(err, SiftError::MissingResource { .. }));
    }

    #[test]
    fn test_process_dataset_writes_table() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("raw").join("trec_ham");
        std::fs::create_dir_all(&folder).unwrap();
        write_eml(&folder, "1_ham.eml", SIMPLE_EML);

        let paths = DatasetPaths {
            raw_external: None,
            raw_ham: Some(folder),
            raw_spam: Some(dir.path().join("raw").join("trec_spam")),
            raw_inbox: None,
            processed: Some(dir.path().join("processed").join("trec.tbl")),
            labels: None,
        };

        let records = process_dataset(&paths, None).unwrap();
        assert_eq!(records.len(), 1);
        let restored =
            crate::store::deserialize_records(paths.processed.as_ref().unwrap()).unwrap();
        assert_eq!(restored, records);
    }
}
