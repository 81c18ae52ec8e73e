//! Subject + body text block: TF-IDF over alphanumeric word tokens.

use std::sync::OnceLock;

use regex::Regex;

use crate::features::tfidf::TfidfVectorizer;
use crate::features::{FeatureBlock, SparseRow};
use crate::model::MessageRecord;

/// A token is one letter followed by one or more letters or digits,
/// case preserved. Single characters never tokenise.
fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z][A-Za-z0-9]+").expect("static regex must parse"))
}

/// TF-IDF over the concatenated subject and body.
pub struct TextTfidf {
    vectorizer: TfidfVectorizer,
}

impl Default for TextTfidf {
    fn default() -> Self {
        Self {
            vectorizer: TfidfVectorizer::new(None),
        }
    }
}

fn tokenize(record: &MessageRecord) -> Vec<String> {
    let combined = format!("{} {}", record.subject, record.body);
    token_re()
        .find_iter(&combined)
        .map(|m| m.as_str().to_string())
        .collect()
}

impl FeatureBlock for TextTfidf {
    fn fit(&mut self, records: &[&MessageRecord]) {
        let documents: Vec<Vec<String>> = records.iter().map(|r| tokenize(r)).collect();
        self.vectorizer.fit(&documents);
    }

    fn transform(&self, records: &[&MessageRecord]) -> Vec<SparseRow> {
        records
            .iter()
            .map(|r| self.vectorizer.transform_one(&tokenize(r)))
            .collect()
    }

    fn feature_names(&self) -> Vec<String> {
        self.vectorizer.vocabulary().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Label;
    use std::collections::BTreeSet;

    fn record(subject: &str, body: &str) -> MessageRecord {
        MessageRecord {
            id: 1,
            label: Label::Ham,
            source: "test".into(),
            subject: subject.into(),
            body: body.into(),
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
    fn test_tokenizer_requires_leading_letter() {
        let r = record("2024 offer x9", "42abc ok");
        let tokens = tokenize(&r);
        // "2024" and "42abc" start with digits, "x9" qualifies.
        assert_eq!(tokens, vec!["offer", "x9", "ok"]);
    }

    #[test]
    fn test_tokenizer_minimum_length_two() {
        let r = record("a I be", "");
        assert_eq!(tokenize(&r), vec!["be"]);
    }

    #[test]
    fn test_case_is_preserved() {
        let r = record("FREE Money", "");
        let tokens = tokenize(&r);
        assert_eq!(tokens, vec!["FREE", "Money"]);
    }

    #[test]
    fn test_subject_and_body_combined() {
        let records = [record("alpha", "beta")];
        let refs: Vec<&MessageRecord> = records.iter().collect();
        let mut block = TextTfidf::default();
        block.fit(&refs);
        assert_eq!(block.feature_names(), vec!["alpha", "beta"]);
        let rows = block.transform(&refs);
        assert_eq!(rows[0].len(), 2);
    }
}
