//! Gradient-boosted regression trees
//!
//! Squared-error boosting: each round fits a depth-limited tree to the
//! current residuals on a row subsample and a per-tree column subsample,
//! and adds it to the ensemble scaled by the learning rate.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::features::FeatureMatrix;
use crate::model::tree::{RegressionTree, TreeParams};
use crate::model::Regressor;
use crate::{BoostingConfig, FootballError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub n_rounds: usize,
    pub learning_rate: f32,
    pub max_depth: usize,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub lambda: f32,
    pub seed: u64,
    base_score: f32,
    trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn new(config: &BoostingConfig) -> Self {
        GradientBoosting {
            n_rounds: config.n_rounds,
            learning_rate: config.learning_rate,
            max_depth: config.max_depth,
            subsample: config.subsample,
            colsample_bytree: config.colsample_bytree,
            lambda: config.lambda,
            seed: config.seed,
            base_score: 0.0,
            trees: Vec::new(),
        }
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub fn base_score(&self) -> f32 {
        self.base_score
    }
}

/// `ratio * total` rounded, kept within `1..=total`
fn sample_size(total: usize, ratio: f64) -> usize {
    ((total as f64 * ratio).round() as usize).clamp(1, total)
}

impl Regressor for GradientBoosting {
    fn fit(&mut self, x: &FeatureMatrix, y: &[f32]) -> Result<()> {
        let n = x.rows();
        if n == 0 || n != y.len() || x.cols() == 0 {
            return Err(FootballError::FitFailure(format!(
                "gradient boosting needs matching non-empty inputs ({} rows, {} targets, {} columns)",
                n,
                y.len(),
                x.cols()
            )));
        }
        if self.n_rounds == 0 {
            return Err(FootballError::FitFailure(
                "gradient boosting needs at least one round".to_string(),
            ));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0)
            || !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0)
        {
            return Err(FootballError::FitFailure(format!(
                "subsample ratios must be in (0, 1], got {} and {}",
                self.subsample, self.colsample_bytree
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let params = TreeParams {
            max_depth: Some(self.max_depth),
            min_samples_split: 2,
            min_samples_leaf: 1,
            lambda: self.lambda,
        };
        let n_rows = sample_size(n, self.subsample);
        let n_cols = sample_size(x.cols(), self.colsample_bytree);

        self.base_score = (y.iter().map(|v| *v as f64).sum::<f64>() / n as f64) as f32;
        self.trees.clear();

        let mut predictions = vec![self.base_score; n];
        let mut residuals = vec![0.0f32; n];

        for round in 0..self.n_rounds {
            for i in 0..n {
                residuals[i] = y[i] - predictions[i];
            }

            let mut rows = sample(&mut rng, n, n_rows).into_vec();
            rows.sort_unstable();
            let mut features = sample(&mut rng, x.cols(), n_cols).into_vec();
            features.sort_unstable();

            let tree = RegressionTree::fit(x, &residuals, &rows, &features, &params);
            for (i, p) in predictions.iter_mut().enumerate() {
                *p += self.learning_rate * tree.predict_row(x.row(i));
            }
            self.trees.push(tree);

            if (round + 1) % 25 == 0 {
                let mse = y
                    .iter()
                    .zip(&predictions)
                    .map(|(t, p)| (t - p).powi(2))
                    .sum::<f32>()
                    / n as f32;
                log::debug!("Boosting round {}: train MSE {:.4}", round + 1, mse);
            }
        }

        Ok(())
    }

    fn predict_row(&self, row: &[f32]) -> f32 {
        self.base_score
            + self.learning_rate * self.trees.iter().map(|t| t.predict_row(row)).sum::<f32>()
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BoostingConfig {
        BoostingConfig {
            n_rounds: 50,
            learning_rate: 0.1,
            max_depth: 3,
            subsample: 0.8,
            colsample_bytree: 0.8,
            lambda: 1.0,
            seed: 42,
        }
    }

    fn data() -> (FeatureMatrix, Vec<f32>) {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for i in 0..50 {
            let a = i as f32 / 10.0;
            let b = (i % 7) as f32;
            xs.extend_from_slice(&[a, b]);
            ys.push(if a < 2.5 { 0.0 } else { 2.0 });
        }
        (FeatureMatrix::new(50, 2, xs).unwrap(), ys)
    }

    #[test]
    fn test_boosting_reduces_error() {
        let (x, y) = data();
        let mut model = GradientBoosting::new(&config());
        model.fit(&x, &y).unwrap();

        assert_eq!(model.trees().len(), 50);
        assert!((model.base_score() - 1.0).abs() < 1e-6);

        let base_mse: f32 = y.iter().map(|t| (t - 1.0).powi(2)).sum::<f32>() / 50.0;
        let preds = model.predict(&x);
        let mse: f32 = y.iter().zip(&preds).map(|(t, p)| (t - p).powi(2)).sum::<f32>() / 50.0;
        assert!(mse < base_mse * 0.1, "mse {} vs baseline {}", mse, base_mse);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let (x, y) = data();
        let mut a = GradientBoosting::new(&config());
        let mut b = GradientBoosting::new(&config());
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x), b.predict(&x));
    }

    #[test]
    fn test_sample_size() {
        assert_eq!(sample_size(10, 0.8), 8);
        assert_eq!(sample_size(1, 0.8), 1);
        assert_eq!(sample_size(3, 0.01), 1);
        assert_eq!(sample_size(5, 1.0), 5);
    }

    #[test]
    fn test_invalid_ratio_fails() {
        let (x, y) = data();
        let mut model = GradientBoosting::new(&BoostingConfig {
            subsample: 0.0,
            ..config()
        });
        assert!(matches!(model.fit(&x, &y), Err(FootballError::FitFailure(_))));
    }

    #[test]
    fn test_zero_rounds_fails() {
        let (x, y) = data();
        let mut model = GradientBoosting::new(&BoostingConfig {
            n_rounds: 0,
            ..config()
        });
        assert!(matches!(model.fit(&x, &y), Err(FootballError::FitFailure(_))));
        assert!(!model.is_fitted());
    }
}
