//! Feature Pipeline: turns message records into a numeric design matrix.
//!
//! Four independent blocks — body/subject text, HTML-structure counts,
//! numeric/boolean metadata, and sender-domain character patterns — are
//! fit on the training records, then concatenated side by side with a
//! fixed scalar weight per block. Vocabularies and statistics are frozen
//! at fit time and reused unchanged at inference time, so `transform`
//! is deterministic and idempotent; keys unseen during fit are ignored.

pub mod domain;
pub mod html;
pub mod meta;
pub mod text;
mod tfidf;

use crate::model::{Label, MessageRecord};

/// One sparse matrix row: `(column, value)` pairs sorted by column.
pub type SparseRow = Vec<(usize, f64)>;

/// The numeric feature matrix fed to the classifier.
///
/// Never persisted — recomputed on demand from records, because the
/// fitted vocabularies depend on the full training set.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    /// One sparse row per input record, in input order.
    pub rows: Vec<SparseRow>,
    /// Total number of feature columns.
    pub n_columns: usize,
}

impl DesignMatrix {
    /// Per-column mean over all rows (absent entries count as zero).
    pub fn column_means(&self) -> Vec<f64> {
        let mut means = vec![0.0; self.n_columns];
        if self.rows.is_empty() {
            return means;
        }
        for row in &self.rows {
            for &(column, value) in row {
                means[column] += value;
            }
        }
        let n = self.rows.len() as f64;
        for mean in &mut means {
            *mean /= n;
        }
        means
    }
}

/// A feature sub-transform: fit once on training records, then map any
/// records to sparse rows over the frozen feature set.
pub trait FeatureBlock {
    /// Learn vocabularies/statistics from the training records.
    fn fit(&mut self, records: &[&MessageRecord]);

    /// Map records to sparse rows over this block's columns.
    fn transform(&self, records: &[&MessageRecord]) -> Vec<SparseRow>;

    /// Column names, fixed after `fit`.
    fn feature_names(&self) -> Vec<String>;
}

struct UnionEntry {
    name: &'static str,
    weight: f64,
    block: Box<dyn FeatureBlock>,
}

/// Horizontal concatenation of feature blocks with fixed scalar weights.
pub struct FeatureUnion {
    entries: Vec<UnionEntry>,
}

impl FeatureUnion {
    /// The spam-filter feature set: text (0.50), HTML structure (1.0),
    /// metadata (1.0), sender domain (0.25).
    pub fn spam_features() -> Self {
        Self {
            entries: vec![
                UnionEntry {
                    name: "text",
                    weight: 0.50,
                    block: Box::new(text::TextTfidf::default()),
                },
                UnionEntry {
                    name: "html",
                    weight: 1.0,
                    block: Box::new(html::HtmlCensusBlock::default()),
                },
                UnionEntry {
                    name: "meta",
                    weight: 1.0,
                    block: Box::new(meta::MetadataBlock::default()),
                },
                UnionEntry {
                    name: "domain",
                    weight: 0.25,
                    block: Box::new(domain::SenderDomainNgrams::default()),
                },
            ],
        }
    }

    /// Fit every block on the training records.
    pub fn fit(&mut self, records: &[&MessageRecord]) {
        for entry in &mut self.entries {
            entry.block.fit(records);
        }
    }

    /// Transform records into the concatenated, weighted design matrix.
    pub fn transform(&self, records: &[&MessageRecord]) -> DesignMatrix {
        let mut rows: Vec<SparseRow> = vec![Vec::new(); records.len()];
        let mut offset = 0;

        for entry in &self.entries {
            let block_rows = entry.block.transform(records);
            for (row, block_row) in rows.iter_mut().zip(block_rows) {
                for (column, value) in block_row {
                    row.push((offset + column, value * entry.weight));
                }
            }
            offset += entry.block.feature_names().len();
        }

        DesignMatrix {
            rows,
            n_columns: offset,
        }
    }

    /// All column names, prefixed with their block name (`text__win`).
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for entry in &self.entries {
            for name in entry.block.feature_names() {
                names.push(format!("{}__{}", entry.name, name));
            }
        }
        names
    }
}

/// Binary label vector: 1.0 for spam, 0.0 for ham.
///
/// Callers must filter out unlabelled records before this stage.
pub fn binary_labels(records: &[&MessageRecord]) -> Vec<f64> {
    records
        .iter()
        .map(|r| if r.label == Label::Spam { 1.0 } else { 0.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MessageRecord;
    use std::collections::BTreeSet;

    fn record(id: u64, label: Label, subject: &str, body: &str) -> MessageRecord {
        MessageRecord {
            id,
            label,
            source: "test".into(),
            subject: subject.into(),
            body: body.into(),
            html_tags: Vec::new(),
            sender_address: format!("user{id}@example.com"),
            sender_name: String::new(),
            link_count: id as u32,
            duplicate_link_count: 0,
            link_domains: BTreeSet::new(),
            link_contexts: Vec::new(),
            recipient_count: 1,
            has_attachment: false,
            auth_failed: false,
        }
    }

    #[test]
    fn test_union_concatenates_blocks() {
        let records = vec![
            record(1, Label::Spam, "win money", "claim your prize now"),
            record(2, Label::Ham, "meeting notes", "see agenda attached"),
        ];
        let refs: Vec<&MessageRecord> = records.iter().collect();

        let mut union = FeatureUnion::spam_features();
        union.fit(&refs);
        let matrix = union.transform(&refs);

        assert_eq!(matrix.rows.len(), 2);
        assert_eq!(matrix.n_columns, union.feature_names().len());
        // Every column index stays in range.
        for row in &matrix.rows {
            for &(column, _) in row {
                assert!(column < matrix.n_columns);
            }
        }
    }

    #[test]
    fn test_transform_is_idempotent() {
        let records = vec![
            record(1, Label::Spam, "free offer", "click http fast"),
            record(2, Label::Ham, "hello", "just checking in"),
        ];
        let refs: Vec<&MessageRecord> = records.iter().collect();

        let mut union = FeatureUnion::spam_features();
        union.fit(&refs);
        let first = union.transform(&refs);
        let second = union.transform(&refs);
        assert_eq!(first, second);
    }

    #[test]
    fn test_feature_names_are_prefixed() {
        let records = vec![record(1, Label::Spam, "offer", "deal")];
        let refs: Vec<&MessageRecord> = records.iter().collect();
        let mut union = FeatureUnion::spam_features();
        union.fit(&refs);
        let names = union.feature_names();
        assert!(names.iter().any(|n| n.starts_with("text__")));
        assert!(names.iter().any(|n| n.starts_with("meta__")));
        assert!(names.iter().any(|n| n.starts_with("domain__")));
    }

    #[test]
    fn test_binary_labels() {
        let records = vec![
            record(1, Label::Spam, "", ""),
            record(2, Label::Ham, "", ""),
        ];
        let refs: Vec<&MessageRecord> = records.iter().collect();
        assert_eq!(binary_labels(&refs), vec![1.0, 0.0]);
    }

    #[test]
    fn test_column_means() {
        let matrix = DesignMatrix {
            rows: vec![vec![(0, 2.0)], vec![(0, 4.0), (1, 1.0)]],
            n_columns: 2,
        };
        assert_eq!(matrix.column_means(), vec![3.0, 0.5]);
    }
}
