//! Random forest regressor
//!
//! Bagged CART trees: every tree sees a bootstrap sample of the rows and all
//! feature columns; the forest predicts the mean of its trees.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::features::FeatureMatrix;
use crate::model::tree::{RegressionTree, TreeParams};
use crate::model::Regressor;
use crate::{FootballError, ForestConfig, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn new(config: &ForestConfig) -> Self {
        RandomForest {
            n_trees: config.n_trees,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            seed: config.seed,
            trees: Vec::new(),
        }
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    fn params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            lambda: 0.0,
        }
    }
}

impl Regressor for RandomForest {
    fn fit(&mut self, x: &FeatureMatrix, y: &[f32]) -> Result<()> {
        let n = x.rows();
        if n == 0 || n != y.len() {
            return Err(FootballError::FitFailure(format!(
                "random forest needs matching non-empty inputs ({} rows, {} targets)",
                n,
                y.len()
            )));
        }
        if self.n_trees == 0 {
            return Err(FootballError::FitFailure(
                "random forest needs at least one tree".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let params = self.params();
        let features: Vec<usize> = (0..x.cols()).collect();

        self.trees = (0..self.n_trees)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, &sample, &features, &params)
            })
            .collect();

        log::debug!(
            "Random forest: {} trees, mean depth {:.1}",
            self.trees.len(),
            self.trees.iter().map(|t| t.depth()).sum::<usize>() as f32 / self.trees.len() as f32
        );
        Ok(())
    }

    fn predict_row(&self, row: &[f32]) -> f32 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict_row(row)).sum::<f32>() / self.trees.len() as f32
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(n_trees: usize) -> ForestConfig {
        ForestConfig {
            n_trees,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }

    fn linear_data() -> (FeatureMatrix, Vec<f32>) {
        let xs: Vec<f32> = (0..40).map(|i| i as f32 / 4.0).collect();
        let ys: Vec<f32> = xs.iter().map(|x| if *x < 5.0 { 1.0 } else { 3.0 }).collect();
        (FeatureMatrix::new(40, 1, xs).unwrap(), ys)
    }

    #[test]
    fn test_forest_fits_step() {
        let (x, y) = linear_data();
        let mut forest = RandomForest::new(&config(20));
        forest.fit(&x, &y).unwrap();

        assert_eq!(forest.trees().len(), 20);
        assert!((forest.predict_row(&[1.0]) - 1.0).abs() < 0.2);
        assert!((forest.predict_row(&[9.0]) - 3.0).abs() < 0.2);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = linear_data();
        let mut a = RandomForest::new(&config(5));
        let mut b = RandomForest::new(&config(5));
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.trees(), b.trees());
        assert_eq!(a.predict(&x), b.predict(&x));
    }

    #[test]
    fn test_empty_input_fails() {
        let x = FeatureMatrix::new(0, 1, vec![]).unwrap();
        let mut forest = RandomForest::new(&config(5));
        assert!(matches!(forest.fit(&x, &[]), Err(FootballError::FitFailure(_))));
    }
}
