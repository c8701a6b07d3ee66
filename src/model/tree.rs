//! Variance-reduction regression tree.
//!
//! Each leaf keeps the mean, variance, and count of the training targets
//! that reached it, so a single tree already reports uncertainty alongside
//! its point estimate. Splits greedily maximize the reduction in target
//! variance over a random `sqrt(d)` subset of candidate features.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::model::{Prediction, Regressor};
use crate::rng_util;
use crate::space::SearchSpace;

/// Configuration for a [`DecisionTreeRegressor`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecisionTreeConfig {
    /// Maximum tree depth. `None` for unlimited (default: `None`).
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node (default: 2).
    pub min_samples_split: usize,
    /// Minimum samples required in a leaf node (default: 1).
    pub min_samples_leaf: usize,
    /// Minimum samples for [`Regressor::should_fit`] to accept a fit
    /// (default: 10).
    pub min_samples_to_fit: usize,
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_samples_to_fit: 10,
        }
    }
}

/// A node in the regression tree (arena-allocated).
#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        mean: f64,
        variance: f64,
        n_samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A regression decision tree over a flattened input subspace.
///
/// Until the first successful [`fit`](Regressor::fit), and for any row
/// missing a value in one of the tree's input columns, predictions are
/// explicit invalid markers.
#[derive(Debug)]
pub struct DecisionTreeRegressor {
    config: DecisionTreeConfig,
    input_space: SearchSpace,
    output_space: SearchSpace,
    input_columns: Vec<String>,
    target: String,
    seed: u64,
    nodes: Vec<TreeNode>,
}

impl DecisionTreeRegressor {
    /// Creates an unfit tree scoped to the given flat subspaces.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonScalarTarget`] if the output space does not have
    /// exactly one dimension.
    pub fn new(
        config: DecisionTreeConfig,
        input_space: SearchSpace,
        output_space: SearchSpace,
        seed: u64,
    ) -> Result<Self> {
        if output_space.dimensions().len() != 1 {
            return Err(Error::NonScalarTarget(output_space.dimensions().len()));
        }
        let input_columns = input_space
            .dimensions()
            .iter()
            .map(|d| d.name.clone())
            .collect();
        let target = output_space.dimensions()[0].name.clone();
        Ok(Self {
            config,
            input_space,
            output_space,
            input_columns,
            target,
            seed,
            nodes: Vec::new(),
        })
    }

    /// Returns `true` once a fit has produced a usable tree.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }

    #[allow(clippy::cast_precision_loss)]
    fn build_node(
        &mut self,
        data: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        depth: usize,
        rng: &mut fastrand::Rng,
    ) -> usize {
        let n = indices.len();
        let mean = indices.iter().map(|&i| targets[i]).sum::<f64>() / n as f64;
        let total_var: f64 = indices.iter().map(|&i| (targets[i] - mean).powi(2)).sum();

        let mut leaf = |nodes: &mut Vec<TreeNode>| {
            let idx = nodes.len();
            nodes.push(TreeNode::Leaf {
                mean,
                variance: total_var / n as f64,
                n_samples: n,
            });
            idx
        };

        // Stopping conditions
        if n < self.config.min_samples_split
            || self.config.max_depth.is_some_and(|d| depth >= d)
            || total_var == 0.0
        {
            return leaf(&mut self.nodes);
        }

        let n_features = data[0].len();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let max_features = ((n_features as f64).sqrt().ceil() as usize)
            .max(1)
            .min(n_features);
        let candidates = rng_util::partial_shuffle(n_features, max_features, rng);

        let mut best_score = f64::NEG_INFINITY;
        let mut best_feature = 0;
        let mut best_threshold = 0.0;

        for &feat in &candidates {
            let mut values: Vec<f64> = indices.iter().map(|&i| data[i][feat]).collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));
            values.dedup();

            if values.len() < 2 {
                continue;
            }

            for w in values.windows(2) {
                let threshold = f64::midpoint(w[0], w[1]);
                let (l_sum, l_sq, l_n, r_sum, r_sq, r_n) =
                    split_stats(data, targets, indices, feat, threshold);

                if l_n < self.config.min_samples_leaf || r_n < self.config.min_samples_leaf {
                    continue;
                }

                let l_var = l_sq - l_sum * l_sum / l_n as f64;
                let r_var = r_sq - r_sum * r_sum / r_n as f64;
                let score = total_var - l_var - r_var;

                if score > best_score {
                    best_score = score;
                    best_feature = feat;
                    best_threshold = threshold;
                }
            }
        }

        if best_score <= 0.0 {
            return leaf(&mut self.nodes);
        }

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| data[i][best_feature] <= best_threshold);

        if left_indices.is_empty() || right_indices.is_empty() {
            return leaf(&mut self.nodes);
        }

        // Reserve slot for this split node (placeholder replaced below)
        let node_idx = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            mean: 0.0,
            variance: 0.0,
            n_samples: 0,
        });

        let left = self.build_node(data, targets, &left_indices, depth + 1, rng);
        let right = self.build_node(data, targets, &right_indices, depth + 1, rng);

        self.nodes[node_idx] = TreeNode::Split {
            feature: best_feature,
            threshold: best_threshold,
            left,
            right,
        };

        node_idx
    }

    fn predict_row(&self, row: &[f64]) -> (f64, f64, usize) {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf {
                    mean,
                    variance,
                    n_samples,
                } => return (mean, variance, n_samples),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

impl Regressor for DecisionTreeRegressor {
    fn input_space(&self) -> &SearchSpace {
        &self.input_space
    }

    fn output_space(&self) -> &SearchSpace {
        &self.output_space
    }

    fn should_fit(&self, n_samples: usize) -> bool {
        n_samples >= self.config.min_samples_to_fit
    }

    fn fit(&mut self, features: &Frame, targets: &[f64]) -> Result<()> {
        if features.n_rows() != targets.len() {
            return Err(Error::ShapeMismatch {
                rows: features.n_rows(),
                scores: targets.len(),
            });
        }

        let projected = features.select(&self.input_columns);
        let mut data: Vec<Vec<f64>> = Vec::new();
        let mut kept_targets: Vec<f64> = Vec::new();
        for row in 0..projected.n_rows() {
            let cells: Option<Vec<f64>> = self
                .input_columns
                .iter()
                .map(|c| projected.get(row, c).map(crate::value::Value::to_f64))
                .collect();
            if let Some(cells) = cells {
                data.push(cells);
                kept_targets.push(targets[row]);
            }
        }

        self.nodes.clear();
        if data.is_empty() {
            return Ok(());
        }

        // Reseed per fit so refitting on identical data rebuilds the same tree.
        let mut rng = fastrand::Rng::with_seed(self.seed);
        let indices: Vec<usize> = (0..data.len()).collect();
        self.build_node(&data, &kept_targets, &indices, 0, &mut rng);
        Ok(())
    }

    fn predict(&self, features: &Frame) -> Vec<Prediction> {
        let projected = features.select(&self.input_columns);
        (0..projected.n_rows())
            .map(|row| {
                if !self.is_fitted() {
                    return Prediction::invalid(self.target.as_str());
                }
                let cells: Option<Vec<f64>> = self
                    .input_columns
                    .iter()
                    .map(|c| projected.get(row, c).map(crate::value::Value::to_f64))
                    .collect();
                match cells {
                    Some(cells) => {
                        let (mean, variance, n_samples) = self.predict_row(&cells);
                        Prediction::of(self.target.as_str(), mean, variance, n_samples)
                    }
                    None => Prediction::invalid(self.target.as_str()),
                }
            })
            .collect()
    }
}

/// Compute left/right split statistics for variance reduction.
#[allow(clippy::cast_precision_loss)]
fn split_stats(
    data: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    feature: usize,
    threshold: f64,
) -> (f64, f64, usize, f64, f64, usize) {
    let (mut l_sum, mut l_sq, mut l_n) = (0.0, 0.0, 0usize);
    let (mut r_sum, mut r_sq, mut r_n) = (0.0, 0.0, 0usize);

    for &i in indices {
        let y = targets[i];
        if data[i][feature] <= threshold {
            l_sum += y;
            l_sq += y * y;
            l_n += 1;
        } else {
            r_sum += y;
            r_sq += y * y;
            r_n += 1;
        }
    }

    (l_sum, l_sq, l_n, r_sum, r_sq, r_n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Config;
    use crate::space::Dimension;
    use crate::value::Value;

    fn spaces() -> (SearchSpace, SearchSpace) {
        (
            SearchSpace::new("inputs").with_dimension(Dimension::float("x", 0.0, 10.0)),
            SearchSpace::new("objective").with_dimension(Dimension::float(
                "score",
                f64::NEG_INFINITY,
                f64::INFINITY,
            )),
        )
    }

    fn tree(config: DecisionTreeConfig) -> DecisionTreeRegressor {
        let (input, output) = spaces();
        DecisionTreeRegressor::new(config, input, output, 42).unwrap()
    }

    fn grid_frame(n: usize) -> (Frame, Vec<f64>) {
        #[allow(clippy::cast_precision_loss)]
        let configs: Vec<Config> = (0..n)
            .map(|i| Config::new().with("x", Value::Float(i as f64 * 10.0 / (n - 1) as f64)))
            .collect();
        let targets = configs
            .iter()
            .map(|c| c.get("x").unwrap().to_f64())
            .collect();
        (Frame::from_configs(&configs), targets)
    }

    #[test]
    fn rejects_multi_dimensional_output() {
        let input = SearchSpace::new("inputs").with_dimension(Dimension::float("x", 0.0, 1.0));
        let output = SearchSpace::new("objective")
            .with_dimension(Dimension::float("a", 0.0, 1.0))
            .with_dimension(Dimension::float("b", 0.0, 1.0));
        assert!(matches!(
            DecisionTreeRegressor::new(DecisionTreeConfig::default(), input, output, 0),
            Err(Error::NonScalarTarget(2))
        ));
    }

    #[test]
    fn unfit_tree_predicts_invalid() {
        let tree = tree(DecisionTreeConfig::default());
        let (frame, _) = grid_frame(5);
        let predictions = tree.predict(&frame);
        assert_eq!(predictions.len(), 5);
        assert!(predictions.iter().all(|p| !p.is_valid()));
    }

    #[test]
    fn fits_identity_function() {
        let mut tree = tree(DecisionTreeConfig::default());
        let (frame, targets) = grid_frame(50);
        tree.fit(&frame, &targets).unwrap();
        assert!(tree.is_fitted());

        for (prediction, target) in tree.predict(&frame).iter().zip(&targets) {
            let estimate = prediction.estimate.expect("fitted tree must predict");
            assert!(
                (estimate.mean - target).abs() < 0.5,
                "mean {} far from target {target}",
                estimate.mean
            );
            assert!(estimate.variance >= 0.0);
            assert!(estimate.count >= 1);
        }
    }

    #[test]
    fn constant_target_yields_zero_variance_leaf() {
        let mut tree = tree(DecisionTreeConfig::default());
        let (frame, _) = grid_frame(20);
        let targets = vec![3.5; 20];
        tree.fit(&frame, &targets).unwrap();

        let prediction = &tree.predict(&frame)[7];
        let estimate = prediction.estimate.unwrap();
        assert!((estimate.mean - 3.5).abs() < 1e-12);
        assert!(estimate.variance.abs() < 1e-12);
        assert_eq!(estimate.count, 20);
    }

    #[test]
    fn missing_input_cell_predicts_invalid() {
        let mut tree = tree(DecisionTreeConfig::default());
        let (frame, targets) = grid_frame(20);
        tree.fit(&frame, &targets).unwrap();

        let empty = Frame::from_configs(&[Config::new().with("other", Value::Float(1.0))]);
        let predictions = tree.predict(&empty);
        assert_eq!(predictions.len(), 1);
        assert!(!predictions[0].is_valid());
    }

    #[test]
    fn fit_shape_mismatch_errors() {
        let mut tree = tree(DecisionTreeConfig::default());
        let (frame, _) = grid_frame(10);
        assert!(matches!(
            tree.fit(&frame, &[1.0, 2.0]),
            Err(Error::ShapeMismatch { rows: 10, scores: 2 })
        ));
    }

    #[test]
    fn readiness_follows_min_samples_to_fit() {
        let tree = tree(DecisionTreeConfig {
            min_samples_to_fit: 5,
            ..DecisionTreeConfig::default()
        });
        assert!(!tree.should_fit(4));
        assert!(tree.should_fit(5));
    }

    #[test]
    fn refit_on_identical_data_is_identical() {
        let mut tree = tree(DecisionTreeConfig::default());
        let (frame, targets) = grid_frame(30);
        tree.fit(&frame, &targets).unwrap();
        let first = tree.predict(&frame);
        tree.fit(&frame, &targets).unwrap();
        assert_eq!(first, tree.predict(&frame));
    }
}
