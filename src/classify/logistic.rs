//! L2-regularized binary logistic regression.
//!
//! Minimises the summed Bernoulli log-loss plus `‖w‖²/(2C)` (the
//! intercept is not penalised) by gradient descent with a backtracking
//! line search, up to a fixed iteration cap.

use tracing::debug;

use crate::error::{Result, SiftError};
use crate::features::DesignMatrix;

/// The logistic sigmoid, computed without overflow for large `|z|`.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + exp(z))` without overflow for large `z`.
fn log1p_exp(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// Binary logistic regression classifier.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    /// Inverse regularization strength (smaller = stronger penalty).
    pub c: f64,
    /// Iteration cap for the optimiser.
    pub max_iter: usize,
    /// Convergence tolerance on the gradient infinity norm.
    pub tol: f64,
    weights: Vec<f64>,
    intercept: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(1.0, 1000, 1e-4)
    }
}

impl LogisticRegression {
    pub fn new(c: f64, max_iter: usize, tol: f64) -> Self {
        Self {
            c,
            max_iter,
            tol,
            weights: Vec::new(),
            intercept: 0.0,
        }
    }

    /// Linear score `intercept + w·x` for one sparse row.
    fn score(&self, row: &[(usize, f64)]) -> f64 {
        self.intercept
            + row
                .iter()
                .map(|&(column, value)| self.weights[column] * value)
                .sum::<f64>()
    }

    /// Objective value for a candidate parameter vector.
    fn objective(&self, x: &DesignMatrix, y: &[f64], weights: &[f64], intercept: f64) -> f64 {
        let mut loss = 0.0;
        for (row, &label) in x.rows.iter().zip(y) {
            let z = intercept
                + row
                    .iter()
                    .map(|&(column, value)| weights[column] * value)
                    .sum::<f64>();
            loss += log1p_exp(z) - label * z;
        }
        let penalty: f64 = weights.iter().map(|w| w * w).sum::<f64>() / (2.0 * self.c);
        loss + penalty
    }

    /// Fit on a design matrix and binary label vector (1 = spam, 0 = ham).
    pub fn fit(&mut self, x: &DesignMatrix, y: &[f64]) -> Result<()> {
        if x.rows.is_empty() {
            return Err(SiftError::TrainingData("no training rows".into()));
        }
        if y.iter().all(|&l| l == 0.0) || y.iter().all(|&l| l == 1.0) {
            return Err(SiftError::TrainingData(
                "training labels contain only one class".into(),
            ));
        }

        let mut weights = vec![0.0; x.n_columns];
        let mut intercept = 0.0;
        let mut value = self.objective(x, y, &weights, intercept);

        for iteration in 0..self.max_iter {
            // Gradient of the objective at the current parameters.
            let mut grad_w = vec![0.0; x.n_columns];
            let mut grad_b = 0.0;
            for (row, &label) in x.rows.iter().zip(y) {
                let z = intercept
                    + row
                        .iter()
                        .map(|&(column, v)| weights[column] * v)
                        .sum::<f64>();
                let residual = sigmoid(z) - label;
                grad_b += residual;
                for &(column, v) in row {
                    grad_w[column] += residual * v;
                }
            }
            for (g, w) in grad_w.iter_mut().zip(&weights) {
                *g += w / self.c;
            }

            let grad_norm = grad_w
                .iter()
                .chain(std::iter::once(&grad_b))
                .fold(0.0f64, |m, g| m.max(g.abs()));
            if grad_norm < self.tol {
                debug!(iteration, grad_norm, "Optimiser converged");
                break;
            }

            // Backtracking line search along the negative gradient.
            let grad_sq: f64 =
                grad_w.iter().map(|g| g * g).sum::<f64>() + grad_b * grad_b;
            let mut step = 1.0;
            loop {
                let trial_w: Vec<f64> = weights
                    .iter()
                    .zip(&grad_w)
                    .map(|(w, g)| w - step * g)
                    .collect();
                let trial_b = intercept - step * grad_b;
                let trial_value = self.objective(x, y, &trial_w, trial_b);
                if trial_value <= value - 1e-4 * step * grad_sq || step < 1e-10 {
                    weights = trial_w;
                    intercept = trial_b;
                    value = trial_value;
                    break;
                }
                step *= 0.5;
            }
        }

        self.weights = weights;
        self.intercept = intercept;
        Ok(())
    }

    /// Calibrated spam probability for each row.
    pub fn predict_proba(&self, x: &DesignMatrix) -> Vec<f64> {
        x.rows.iter().map(|row| sigmoid(self.score(row))).collect()
    }

    /// Log-odds (the linear score before the sigmoid) for each row.
    pub fn decision_function(&self, x: &DesignMatrix) -> Vec<f64> {
        x.rows.iter().map(|row| self.score(row)).collect()
    }

    /// One learned coefficient per design-matrix column.
    pub fn coefficients(&self) -> &[f64] {
        &self.weights
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_matrix() -> (DesignMatrix, Vec<f64>) {
        // One informative column: positive for spam, negative for ham.
        let rows = vec![
            vec![(0, 2.0)],
            vec![(0, 1.5)],
            vec![(0, -1.0)],
            vec![(0, -2.5)],
        ];
        (DesignMatrix { rows, n_columns: 1 }, vec![1.0, 1.0, 0.0, 0.0])
    }

    #[test]
    fn test_sigmoid_bounds_and_symmetry() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(40.0) > 0.999);
        assert!(sigmoid(-40.0) < 0.001);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
        assert!(sigmoid(1000.0).is_finite());
        assert!(sigmoid(-1000.0).is_finite());
    }

    #[test]
    fn test_fit_separates_toy_data() {
        let (x, y) = toy_matrix();
        let mut model = LogisticRegression::default();
        model.fit(&x, &y).unwrap();

        let probabilities = model.predict_proba(&x);
        assert!(probabilities[0] > 0.5);
        assert!(probabilities[1] > 0.5);
        assert!(probabilities[2] < 0.5);
        assert!(probabilities[3] < 0.5);
        // The single informative column gets a positive weight.
        assert!(model.coefficients()[0] > 0.0);
    }

    #[test]
    fn test_decision_function_matches_probability() {
        let (x, y) = toy_matrix();
        let mut model = LogisticRegression::default();
        model.fit(&x, &y).unwrap();

        let scores = model.decision_function(&x);
        let probabilities = model.predict_proba(&x);
        for (z, p) in scores.iter().zip(probabilities) {
            assert!((sigmoid(*z) - p).abs() < 1e-12);
        }
    }

    #[test]
    fn test_regularization_shrinks_weights() {
        let (x, y) = toy_matrix();
        let mut loose = LogisticRegression::new(100.0, 1000, 1e-6);
        let mut tight = LogisticRegression::new(0.01, 1000, 1e-6);
        loose.fit(&x, &y).unwrap();
        tight.fit(&x, &y).unwrap();
        assert!(tight.coefficients()[0].abs() < loose.coefficients()[0].abs());
    }

    #[test]
    fn test_fit_rejects_empty_matrix() {
        let x = DesignMatrix {
            rows: Vec::new(),
            n_columns: 0,
        };
        let mut model = LogisticRegression::default();
        assert!(matches!(
            model.fit(&x, &[]),
            Err(SiftError::TrainingData(_))
        ));
    }

    #[test]
    fn test_fit_rejects_single_class() {
        let x = DesignMatrix {
            rows: vec![vec![(0, 1.0)], vec![(0, 2.0)]],
            n_columns: 1,
        };
        let mut model = LogisticRegression::default();
        assert!(matches!(
            model.fit(&x, &[1.0, 1.0]),
            Err(SiftError::TrainingData(_))
        ));
    }
}
