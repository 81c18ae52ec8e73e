//! The trained-model abstraction: a one-way train/predict state machine
//! wrapping the feature union and the classifier.

use tracing::info;

use crate::config::ModelConfig;
use crate::error::{Result, SiftError};
use crate::features::{binary_labels, DesignMatrix, FeatureUnion};
use crate::model::{Label, MessageRecord};

use super::logistic::LogisticRegression;

/// Currently existing model kinds, mapped to their pipeline constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    LogisticRegression,
}

impl ModelKind {
    /// Build the untrained pipeline for this model kind.
    pub fn pipeline(self, params: &ModelConfig) -> ModelPipeline {
        match self {
            Self::LogisticRegression => ModelPipeline::logistic_regression(params),
        }
    }
}

/// Spam probability for one record, keyed by its id.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub id: u64,
    pub probability: f64,
}

/// A feature union plus classifier with an `Untrained → Trained`
/// one-way state machine.
///
/// `predict` and `learned_weights` fail with [`SiftError::Untrained`]
/// until `train` has succeeded. Training either fully succeeds and
/// flips the state, or fails and leaves the pipeline untrained. Each
/// instance is single-owner: concurrent use is not supported.
pub struct ModelPipeline {
    name: &'static str,
    features: FeatureUnion,
    classifier: LogisticRegression,
    trained: bool,
}

impl ModelPipeline {
    /// Untrained logistic-regression pipeline over the spam feature set.
    pub fn logistic_regression(params: &ModelConfig) -> Self {
        Self {
            name: "logistic_regression",
            features: FeatureUnion::spam_features(),
            classifier: LogisticRegression::new(params.c, params.max_iter, params.tol),
            trained: false,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Fit the feature union and classifier on the labelled subset of
    /// `records`, then mark the pipeline trained.
    ///
    /// Returns `self` for chaining.
    pub fn train(&mut self, records: &[&MessageRecord]) -> Result<&mut Self> {
        let labelled: Vec<&MessageRecord> = records
            .iter()
            .copied()
            .filter(|r| r.label.is_labelled())
            .collect();
        if labelled.is_empty() {
            return Err(SiftError::TrainingData(
                "no ham- or spam-labelled records to train on".into(),
            ));
        }

        info!(
            model = self.name,
            samples = labelled.len(),
            "Training classifier"
        );
        self.features.fit(&labelled);
        let x = self.features.transform(&labelled);
        let y = binary_labels(&labelled);
        self.classifier.fit(&x, &y)?;

        self.trained = true;
        Ok(self)
    }

    /// Spam probability per record, keyed by record id.
    pub fn predict(&self, records: &[&MessageRecord]) -> Result<Vec<Prediction>> {
        let x = self.transform(records)?;
        let probabilities = self.classifier.predict_proba(&x);
        Ok(records
            .iter()
            .zip(probabilities)
            .map(|(record, probability)| Prediction {
                id: record.id,
                probability,
            })
            .collect())
    }

    /// Every feature name with its learned coefficient, ordered from
    /// most spam-indicative (most positive) to most ham-indicative.
    pub fn learned_weights(&self) -> Result<Vec<(String, f64)>> {
        if !self.trained {
            return Err(SiftError::Untrained);
        }
        let mut weights: Vec<(String, f64)> = self
            .features
            .feature_names()
            .into_iter()
            .zip(self.classifier.coefficients().iter().copied())
            .collect();
        weights.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(weights)
    }

    /// Apply the frozen feature transform (available once trained).
    pub fn transform(&self, records: &[&MessageRecord]) -> Result<DesignMatrix> {
        if !self.trained {
            return Err(SiftError::Untrained);
        }
        Ok(self.features.transform(records))
    }

    /// Column names of the fitted design matrix, in column order
    /// (available once trained).
    pub fn feature_names(&self) -> Result<Vec<String>> {
        if !self.trained {
            return Err(SiftError::Untrained);
        }
        Ok(self.features.feature_names())
    }

    /// The fitted classifier's coefficients (available once trained).
    pub fn coefficients(&self) -> Result<&[f64]> {
        if !self.trained {
            return Err(SiftError::Untrained);
        }
        Ok(self.classifier.coefficients())
    }

    /// The fitted classifier's intercept (available once trained).
    pub fn intercept(&self) -> Result<f64> {
        if !self.trained {
            return Err(SiftError::Untrained);
        }
        Ok(self.classifier.intercept())
    }
}

/// Split records into labelled (spam/ham) and unlabelled (inbox) subsets.
pub fn split_labelled_and_inbox(
    records: &[MessageRecord],
) -> (Vec<&MessageRecord>, Vec<&MessageRecord>) {
    let labelled: Vec<&MessageRecord> =
        records.iter().filter(|r| r.label.is_labelled()).collect();
    let n_spam = labelled.iter().filter(|r| r.label == Label::Spam).count();
    let n_ham = labelled.len() - n_spam;
    info!(
        spam = n_spam,
        ham = n_ham,
        total = labelled.len(),
        "Labelled dataset"
    );

    let inbox: Vec<&MessageRecord> = records
        .iter()
        .filter(|r| r.label == Label::Inbox)
        .collect();
    info!(count = inbox.len(), "Inbox records");

    (labelled, inbox)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn record(id: u64, label: Label, subject: &str, body: &str) -> MessageRecord {
        MessageRecord {
            id,
            label,
            source: "test".into(),
            subject: subject.into(),
            body: body.into(),
            html_tags: Vec::new(),
            sender_address: format!("u{id}@example.com"),
            sender_name: String::new(),
            link_count: 0,
            duplicate_link_count: 0,
            link_domains: BTreeSet::new(),
            link_contexts: Vec::new(),
            recipient_count: 1,
            has_attachment: false,
            auth_failed: false,
        }
    }

    fn training_set() -> Vec<MessageRecord> {
        vec![
            record(1, Label::Spam, "win big money", "claim your free prize now"),
            record(2, Label::Spam, "free money offer", "click now to win cash"),
            record(3, Label::Ham, "project meeting", "minutes from the sync"),
            record(4, Label::Ham, "lunch plans", "see you at the meeting"),
        ]
    }

    #[test]
    fn test_untrained_predict_fails() {
        let pipeline = ModelPipeline::logistic_regression(&ModelConfig::default());
        let records = training_set();
        let refs: Vec<&MessageRecord> = records.iter().collect();
        assert!(matches!(
            pipeline.predict(&refs),
            Err(SiftError::Untrained)
        ));
    }

    #[test]
    fn test_untrained_weights_fail() {
        let pipeline = ModelPipeline::logistic_regression(&ModelConfig::default());
        assert!(matches!(
            pipeline.learned_weights(),
            Err(SiftError::Untrained)
        ));
    }

    #[test]
    fn test_train_then_predict_inbox() {
        let mut records = training_set();
        records.push(record(9, Label::Inbox, "hello there", "quick question"));
        let refs: Vec<&MessageRecord> = records.iter().collect();

        let mut pipeline = ModelPipeline::logistic_regression(&ModelConfig::default());
        pipeline.train(&refs).unwrap();
        assert!(pipeline.is_trained());

        let inbox = [&records[4]];
        let predictions = pipeline.predict(&inbox).unwrap();
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].id, 9);
        assert!((0.0..=1.0).contains(&predictions[0].probability));
    }

    #[test]
    fn test_weights_ordered_most_spam_indicative_first() {
        let records = training_set();
        let refs: Vec<&MessageRecord> = records.iter().collect();
        let mut pipeline = ModelPipeline::logistic_regression(&ModelConfig::default());
        pipeline.train(&refs).unwrap();

        let weights = pipeline.learned_weights().unwrap();
        assert!(!weights.is_empty());
        for pair in weights.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn test_failed_training_leaves_state_unchanged() {
        // All spam: the classifier rejects single-class data.
        let records = vec![
            record(1, Label::Spam, "offer", "money"),
            record(2, Label::Spam, "deal", "cash"),
        ];
        let refs: Vec<&MessageRecord> = records.iter().collect();
        let mut pipeline = ModelPipeline::logistic_regression(&ModelConfig::default());
        assert!(pipeline.train(&refs).is_err());
        assert!(!pipeline.is_trained());
    }

    #[test]
    fn test_model_kind_constructs_pipeline() {
        let pipeline = ModelKind::LogisticRegression.pipeline(&ModelConfig::default());
        assert_eq!(pipeline.name(), "logistic_regression");
        assert!(!pipeline.is_trained());
    }

    #[test]
    fn test_split_labelled_and_inbox() {
        let mut records = training_set();
        records.push(record(9, Label::Inbox, "", ""));
        let (labelled, inbox) = split_labelled_and_inbox(&records);
        assert_eq!(labelled.len(), 4);
        assert_eq!(inbox.len(), 1);
    }
}
