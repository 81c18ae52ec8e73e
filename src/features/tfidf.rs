//! Shared TF-IDF machinery for the text and sender-domain blocks.
//!
//! Term frequency times smoothed inverse document frequency
//! (`ln((1+n)/(1+df)) + 1`), with L2-normalised rows. The vocabulary is
//! frozen at fit time; unseen terms are ignored at transform time.

use std::collections::HashMap;

use crate::features::SparseRow;

pub(crate) struct TfidfVectorizer {
    /// Optional cap on vocabulary size: keep the most frequent terms.
    max_features: Option<usize>,
    /// Vocabulary terms, sorted, index position = column.
    vocabulary: Vec<String>,
    index: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn new(max_features: Option<usize>) -> Self {
        Self {
            max_features,
            vocabulary: Vec::new(),
            index: HashMap::new(),
            idf: Vec::new(),
        }
    }

    /// Build vocabulary and idf weights from tokenised documents.
    pub fn fit(&mut self, documents: &[Vec<String>]) {
        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        let mut total_frequency: HashMap<&str, u64> = HashMap::new();

        for tokens in documents {
            let mut seen: Vec<&str> = Vec::new();
            for token in tokens {
                let token = token.as_str();
                *total_frequency.entry(token).or_insert(0) += 1;
                if !seen.contains(&token) {
                    seen.push(token);
                    *document_frequency.entry(token).or_insert(0) += 1;
                }
            }
        }

        let mut terms: Vec<&str> = document_frequency.keys().copied().collect();
        if let Some(cap) = self.max_features {
            // Most frequent terms first, name as the deterministic tiebreak.
            terms.sort_by(|a, b| {
                total_frequency[b]
                    .cmp(&total_frequency[a])
                    .then_with(|| a.cmp(b))
            });
            terms.truncate(cap);
        }
        terms.sort_unstable();

        let n = documents.len() as f64;
        self.vocabulary = terms.iter().map(|t| t.to_string()).collect();
        self.index = self
            .vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        self.idf = terms
            .iter()
            .map(|t| ((1.0 + n) / (1.0 + document_frequency[t] as f64)).ln() + 1.0)
            .collect();
    }

    /// TF-IDF row for one tokenised document, L2-normalised.
    pub fn transform_one(&self, tokens: &[String]) -> SparseRow {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in tokens {
            if let Some(&column) = self.index.get(token) {
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }

        let mut row: SparseRow = counts
            .into_iter()
            .map(|(column, tf)| (column, tf * self.idf[column]))
            .collect();
        row.sort_unstable_by_key(|&(column, _)| column);

        let norm = row.iter().map(|&(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, value) in &mut row {
                *value /= norm;
            }
        }
        row
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }
}
