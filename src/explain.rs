//! Exact per-feature attribution of a single prediction's log-odds.
//!
//! For a linear model the attribution has a closed form: with baseline
//! log-odds `b = intercept + w·x̄` over a reference set with mean row
//! `x̄`, each feature contributes `wᵢ·(xᵢ − x̄ᵢ)`, and the contributions
//! sum exactly to the predicted log-odds minus the baseline.

use crate::classify::{sigmoid, ModelPipeline};
use crate::error::{Result, SiftError};
use crate::model::MessageRecord;
use crate::parser::html::strip_tags;

/// Attribution of one prediction to the model's input features.
#[derive(Debug, Clone)]
pub struct Explanation {
    /// Expected log-odds over the reference set.
    pub baseline_log_odds: f64,
    /// `sigmoid(baseline_log_odds)`.
    pub baseline_probability: f64,
    /// Log-odds of the explained record.
    pub predicted_log_odds: f64,
    /// `sigmoid(predicted_log_odds)`.
    pub predicted_probability: f64,
    /// Per-feature contribution to `predicted − baseline`, ordered from
    /// most spam-pushing to most ham-pushing.
    pub contributions: Vec<(String, f64)>,
}

/// Attribute one record's predicted log-odds to individual features,
/// relative to a reference set (typically the labelled training set).
///
/// The identity `baseline_log_odds + Σ contributions ==
/// predicted_log_odds` holds exactly, up to floating-point rounding.
pub fn explain_record(
    model: &ModelPipeline,
    target: &MessageRecord,
    reference: &[&MessageRecord],
) -> Result<Explanation> {
    if reference.is_empty() {
        return Err(SiftError::TrainingData(
            "explanation reference set is empty".into(),
        ));
    }

    let reference_matrix = model.transform(reference)?;
    let target_matrix = model.transform(&[target])?;
    let weights = model.coefficients()?;
    let intercept = model.intercept()?;

    let reference_means = reference_matrix.column_means();
    let baseline_log_odds = intercept
        + weights
            .iter()
            .zip(&reference_means)
            .map(|(w, m)| w * m)
            .sum::<f64>();

    // Densify the single target row.
    let mut target_row = vec![0.0; target_matrix.n_columns];
    for &(column, value) in &target_matrix.rows[0] {
        target_row[column] = value;
    }

    let mut contributions: Vec<(String, f64)> = model
        .feature_names()?
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name, weights[i] * (target_row[i] - reference_means[i])))
        .collect();
    contributions.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let predicted_log_odds = intercept
        + target_matrix.rows[0]
            .iter()
            .map(|&(column, value)| weights[column] * value)
            .sum::<f64>();

    Ok(Explanation {
        baseline_log_odds,
        baseline_probability: sigmoid(baseline_log_odds),
        predicted_log_odds,
        predicted_probability: sigmoid(predicted_log_odds),
        contributions,
    })
}

/// Render the top contributions as a text waterfall, strongest absolute
/// movers first.
pub fn render_waterfall(explanation: &Explanation, max_display: usize) -> String {
    let mut by_magnitude: Vec<&(String, f64)> = explanation.contributions.iter().collect();
    by_magnitude.sort_by(|a, b| {
        b.1.abs()
            .partial_cmp(&a.1.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut out = String::new();
    out.push_str(&format!(
        "P(spam): {:.1}%   (baseline {:.1}%)\n",
        explanation.predicted_probability * 100.0,
        explanation.baseline_probability * 100.0
    ));
    out.push_str(&format!(
        "log-odds: {:+.4} from baseline {:+.4}\n",
        explanation.predicted_log_odds, explanation.baseline_log_odds
    ));
    for (name, contribution) in by_magnitude.into_iter().take(max_display) {
        if *contribution == 0.0 {
            break;
        }
        out.push_str(&format!("  {contribution:+.4}  {name}\n"));
    }
    out
}

/// One-paragraph summary for a predicted record.
pub fn prediction_summary(record: &MessageRecord, probability: f64, max_chars: usize) -> String {
    let snippet: String = strip_tags(&record.body).chars().take(max_chars).collect();
    format!(
        "ID:      {}\nSender:  {}\nSubject: {:?}\nScore:   {:.3}\nSnippet: {}",
        record.id, record.sender_address, record.subject, probability, snippet
    )
}
