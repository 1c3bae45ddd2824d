//! CART regression tree
//!
//! Shared by the random forest (plain variance reduction, `lambda = 0`) and
//! gradient boosting (L2-regularised leaf weights, `lambda > 0`). Splits
//! maximise `S_L²/(n_L+λ) + S_R²/(n_R+λ) - S²/(n+λ)` where `S` is the sum of
//! targets in a node; leaves predict `S/(n+λ)`.

use serde::{Deserialize, Serialize};

use crate::features::FeatureMatrix;

/// Minimum gain for a split to be kept
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small to split
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub lambda: f32,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            lambda: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Node {
    Leaf {
        value: f32,
    },
    Split {
        feature: usize,
        /// Rows with `x[feature] <= threshold` go left
        threshold: f32,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Node,
}

struct BestSplit {
    feature: usize,
    threshold: f32,
    gain: f64,
}

/// Borrowed training data for one tree
struct Grower<'a> {
    x: &'a FeatureMatrix,
    y: &'a [f32],
    features: &'a [usize],
    params: &'a TreeParams,
}

impl RegressionTree {
    /// Fit on the given rows (duplicates allowed, e.g. bootstrap samples)
    /// considering only the given feature columns.
    pub fn fit(
        x: &FeatureMatrix,
        y: &[f32],
        rows: &[usize],
        features: &[usize],
        params: &TreeParams,
    ) -> Self {
        let grower = Grower {
            x,
            y,
            features,
            params,
        };
        let mut rows = rows.to_vec();
        RegressionTree {
            root: grower.grow(&mut rows, 0),
        }
    }

    pub fn predict_row(&self, row: &[f32]) -> f32 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn depth(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        depth(&self.root)
    }

    pub fn leaf_count(&self) -> usize {
        fn count(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 1,
                Node::Split { left, right, .. } => count(left) + count(right),
            }
        }
        count(&self.root)
    }
}

impl Grower<'_> {
    fn grow(&self, rows: &mut [usize], depth: usize) -> Node {
        let n = rows.len();
        let sum: f64 = rows.iter().map(|&r| self.y[r] as f64).sum();
        let leaf = Node::Leaf {
            value: (sum / (n as f64 + self.params.lambda as f64)) as f32,
        };

        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        if depth_reached || n < self.params.min_samples_split.max(2) {
            return leaf;
        }

        let Some(best) = self.best_split(rows, sum) else {
            return leaf;
        };

        let (feature, threshold) = (best.feature, best.threshold);
        let mid = partition(rows, |r| self.x.get(r, feature) <= threshold);
        let (left_rows, right_rows) = rows.split_at_mut(mid);

        Node::Split {
            feature,
            threshold,
            left: Box::new(self.grow(left_rows, depth + 1)),
            right: Box::new(self.grow(right_rows, depth + 1)),
        }
    }

    fn best_split(&self, rows: &[usize], total: f64) -> Option<BestSplit> {
        let n = rows.len();
        let lambda = self.params.lambda as f64;
        let min_leaf = self.params.min_samples_leaf.max(1);
        let parent_score = total * total / (n as f64 + lambda);

        let mut best: Option<BestSplit> = None;
        let mut sorted: Vec<(f32, f32)> = Vec::with_capacity(n);

        for &feature in self.features {
            sorted.clear();
            sorted.extend(rows.iter().map(|&r| (self.x.get(r, feature), self.y[r])));
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0f64;
            for i in 0..n - 1 {
                left_sum += sorted[i].1 as f64;
                let left_n = i + 1;
                let right_n = n - left_n;

                // Only split between distinct values
                if sorted[i].0 == sorted[i + 1].0 {
                    continue;
                }
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let right_sum = total - left_sum;
                let gain = left_sum * left_sum / (left_n as f64 + lambda)
                    + right_sum * right_sum / (right_n as f64 + lambda)
                    - parent_score;

                if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: midpoint(sorted[i].0, sorted[i + 1].0),
                        gain,
                    });
                }
            }
        }

        best
    }
}

/// Threshold between two adjacent sorted values that still separates them
/// in f32
fn midpoint(lo: f32, hi: f32) -> f32 {
    let mid = lo + (hi - lo) / 2.0;
    if mid < hi {
        mid
    } else {
        lo
    }
}

/// Reorder `rows` so that rows satisfying `pred` come first; returns their count
fn partition<F: Fn(usize) -> bool>(rows: &mut [usize], pred: F) -> usize {
    let mut mid = 0;
    for i in 0..rows.len() {
        if pred(rows[i]) {
            rows.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[f32]) -> FeatureMatrix {
        FeatureMatrix::new(values.len(), 1, values.to_vec()).unwrap()
    }

    #[test]
    fn test_step_function_is_learned() {
        let x = column(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let y = [1.0, 1.0, 1.0, 3.0, 3.0, 3.0];
        let rows: Vec<usize> = (0..6).collect();

        let tree = RegressionTree::fit(&x, &y, &rows, &[0], &TreeParams::default());

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_row(&[0.5]), 1.0);
        assert_eq!(tree.predict_row(&[4.5]), 3.0);
        // Threshold at the midpoint of 2 and 3
        assert_eq!(tree.predict_row(&[2.4]), 1.0);
        assert_eq!(tree.predict_row(&[2.6]), 3.0);
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let x = column(&[0.0, 1.0, 2.0]);
        let tree = RegressionTree::fit(&x, &[2.0; 3], &[0, 1, 2], &[0], &TreeParams::default());
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.predict_row(&[10.0]), 2.0);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x = column(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let y: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let rows: Vec<usize> = (0..8).collect();
        let params = TreeParams {
            max_depth: Some(2),
            ..TreeParams::default()
        };

        let tree = RegressionTree::fit(&x, &y, &rows, &[0], &params);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.leaf_count(), 4);
    }

    #[test]
    fn test_lambda_shrinks_leaves() {
        let x = column(&[0.0, 1.0]);
        let params = TreeParams {
            max_depth: Some(0),
            lambda: 1.0,
            ..TreeParams::default()
        };
        let tree = RegressionTree::fit(&x, &[2.0, 4.0], &[0, 1], &[0], &params);
        // 6 / (2 + 1)
        assert!((tree.predict_row(&[0.0]) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_ignores_unselected_features() {
        // Feature 1 explains the target perfectly, but only feature 0 is allowed
        let x = FeatureMatrix::new(4, 2, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]).unwrap();
        let y = [0.0, 5.0, 0.0, 5.0];
        let tree = RegressionTree::fit(&x, &y, &[0, 1, 2, 3], &[0], &TreeParams::default());
        assert_eq!(tree.leaf_count(), 1);
    }

    #[test]
    fn test_min_samples_leaf() {
        let x = column(&[0.0, 1.0, 2.0, 3.0]);
        let y = [10.0, 0.0, 0.0, 0.0];
        let params = TreeParams {
            min_samples_leaf: 2,
            ..TreeParams::default()
        };
        let tree = RegressionTree::fit(&x, &y, &[0, 1, 2, 3], &[0], &params);
        // The only allowed split is 2/2
        assert_eq!(tree.predict_row(&[0.0]), 5.0);
        assert_eq!(tree.predict_row(&[3.0]), 0.0);
    }

    #[test]
    fn test_serde_roundtrip_predicts_identically() {
        let x = column(&[0.0, 1.0, 2.0, 3.0]);
        let tree = RegressionTree::fit(&x, &[1.0, 2.0, 3.0, 4.0], &[0, 1, 2, 3], &[0], &TreeParams::default());
        let json = serde_json::to_string(&tree).unwrap();
        let loaded: RegressionTree = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, tree);
    }
}
