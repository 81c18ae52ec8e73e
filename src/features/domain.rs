//! Sender-domain block: TF-IDF over character n-grams of the domain.

use crate::features::tfidf::TfidfVectorizer;
use crate::features::{FeatureBlock, SparseRow};
use crate::model::MessageRecord;

const NGRAM_MIN: usize = 3;
const NGRAM_MAX: usize = 5;
const MAX_FEATURES: usize = 256;

/// Character 3- to 5-grams of the sender address's domain part, capped
/// at the 256 most frequent n-grams seen during fit.
pub struct SenderDomainNgrams {
    vectorizer: TfidfVectorizer,
}

impl Default for SenderDomainNgrams {
    fn default() -> Self {
        Self {
            vectorizer: TfidfVectorizer::new(Some(MAX_FEATURES)),
        }
    }
}

/// The substring after the last `@`, or the whole address without one.
fn sender_domain(record: &MessageRecord) -> &str {
    record
        .sender_address
        .rsplit('@')
        .next()
        .unwrap_or(&record.sender_address)
}

/// All character n-grams of the space-padded domain, shortest first.
fn char_ngrams(domain: &str) -> Vec<String> {
    let padded: Vec<char> = format!(" {} ", domain.trim()).chars().collect();
    let mut grams = Vec::new();
    for n in NGRAM_MIN..=NGRAM_MAX {
        if padded.len() < n {
            break;
        }
        for window in padded.windows(n) {
            grams.push(window.iter().collect());
        }
    }
    grams
}

impl FeatureBlock for SenderDomainNgrams {
    fn fit(&mut self, records: &[&MessageRecord]) {
        let documents: Vec<Vec<String>> = records
            .iter()
            .map(|r| char_ngrams(sender_domain(r)))
            .collect();
        self.vectorizer.fit(&documents);
    }

    fn transform(&self, records: &[&MessageRecord]) -> Vec<SparseRow> {
        records
            .iter()
            .map(|r| self.vectorizer.transform_one(&char_ngrams(sender_domain(r))))
            .collect()
    }

    fn feature_names(&self) -> Vec<String> {
        self.vectorizer.vocabulary().to_vec()
    }
}
