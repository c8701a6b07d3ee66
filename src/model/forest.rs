//! Random-forest regression with explicit mean/variance aggregation.
//!
//! Every member tree is scoped to its own randomly drawn feature subset
//! and trained on its own bootstrap resample of the rows, which is what
//! makes the spread of member predictions a usable uncertainty estimate.
//! Per-row aggregation combines member estimates through the law of total
//! variance: `Var(X) = E[Var(X|member)] + Var(E[X|member])`.
//!
//! # Example
//!
//! ```
//! use autotune::frame::{Config, Frame};
//! use autotune::model::forest::{RandomForestConfig, RandomForestRegressor};
//! use autotune::model::Regressor;
//! use autotune::space::{Dimension, SearchSpace};
//! use autotune::Value;
//!
//! let inputs = SearchSpace::new("inputs").with_dimension(Dimension::float("x", 0.0, 10.0));
//! let objective =
//!     SearchSpace::new("objective").with_dimension(Dimension::float("score", 0.0, 10.0));
//! let mut forest =
//!     RandomForestRegressor::new(RandomForestConfig::default(), inputs, objective).unwrap();
//!
//! let configs: Vec<Config> = (0..20)
//!     .map(|i| Config::new().with("x", Value::Float(f64::from(i) / 2.0)))
//!     .collect();
//! let targets: Vec<f64> = configs.iter().map(|c| c.get("x").unwrap().to_f64()).collect();
//! forest.fit(&Frame::from_configs(&configs), &targets).unwrap();
//!
//! let predictions = forest.predict(&Frame::from_configs(&configs));
//! assert!(predictions.iter().all(autotune::model::Prediction::is_valid));
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::model::tree::{DecisionTreeConfig, DecisionTreeRegressor};
use crate::model::{Estimate, Prediction, Regressor};
use crate::rng_util;
use crate::space::{FlatIndex, SearchSpace};

/// Configuration for a [`RandomForestRegressor`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RandomForestConfig {
    /// Number of ensemble members (default: 5).
    pub n_estimators: usize,
    /// Fraction of input dimensions assigned to each member, in `(0, 1]`
    /// (default: 1.0).
    pub features_fraction_per_estimator: f64,
    /// Fraction of training rows resampled for each member, in `(0, 1]`
    /// (default: 1.0).
    pub samples_fraction_per_estimator: f64,
    /// Seed for member subspace selection (default: 42). Row resampling is
    /// reseeded per member by member index and does not depend on this.
    pub seed: u64,
    /// Configuration passed through unchanged to every member tree.
    pub tree: DecisionTreeConfig,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 5,
            features_fraction_per_estimator: 1.0,
            samples_fraction_per_estimator: 1.0,
            seed: 42,
            tree: DecisionTreeConfig::default(),
        }
    }
}

impl RandomForestConfig {
    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(Error::NoEstimators);
        }
        for (name, value) in [
            (
                "features_fraction_per_estimator",
                self.features_fraction_per_estimator,
            ),
            (
                "samples_fraction_per_estimator",
                self.samples_fraction_per_estimator,
            ),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(Error::InvalidFraction { name, value });
            }
        }
        Ok(())
    }
}

/// An ensemble of decision trees over random feature and row subsets,
/// reporting a mean, a variance, and a support count per query row.
pub struct RandomForestRegressor {
    config: RandomForestConfig,
    input_space: SearchSpace,
    output_space: SearchSpace,
    input_index: FlatIndex,
    target: String,
    members: Vec<DecisionTreeRegressor>,
}

impl RandomForestRegressor {
    /// Builds the ensemble: flattens both spaces and assigns every member
    /// its own input subspace drawn from one random valid point.
    ///
    /// Sampling a valid point first means a member never mixes mutually
    /// exclusive dimensions from different guarded branches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonScalarTarget`] if the flattened output space
    /// does not have exactly one dimension, [`Error::InvalidFraction`] or
    /// [`Error::NoEstimators`] for a bad configuration, and
    /// [`Error::FlatNameCollision`] if a space cannot be flattened
    /// bijectively.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
    pub fn new(
        config: RandomForestConfig,
        input_space: SearchSpace,
        output_space: SearchSpace,
    ) -> Result<Self> {
        config.validate()?;
        let input_index = FlatIndex::new(&input_space)?;
        let output_index = FlatIndex::new(&output_space)?;
        if output_index.len() != 1 {
            return Err(Error::NonScalarTarget(output_index.len()));
        }
        let (target_path, target_flat) = output_index
            .iter()
            .next()
            .map(|(p, f)| (p.to_string(), f.to_string()))
            .ok_or(Error::Internal("output index cannot be empty here"))?;
        let target_dimension = output_space
            .dimension_at(&target_path)
            .ok_or(Error::Internal("output index path must resolve"))?
            .clone();

        let total_dimensions = input_space.n_dimensions();
        let features_per_estimator = ((total_dimensions as f64
            * config.features_fraction_per_estimator)
            .ceil() as usize)
            .max(1);

        let mut rng = fastrand::Rng::with_seed(config.seed);
        let mut members = Vec::with_capacity(config.n_estimators);
        for i in 0..config.n_estimators {
            // One random valid point; its participating dimensions are the
            // candidate features for this member.
            let point = input_space.sample(&mut rng);
            let paths: Vec<&str> = point.iter().map(|(path, _)| path).collect();
            let picked = rng_util::partial_shuffle(
                paths.len(),
                features_per_estimator.min(paths.len()),
                &mut rng,
            );

            let mut member_inputs = SearchSpace::new(format!("estimator_{i}_inputs"));
            for &index in &picked {
                let path = paths[index];
                let dimension = input_space
                    .dimension_at(path)
                    .ok_or(Error::Internal("sampled path must resolve in its space"))?;
                let flat = input_index
                    .flatten(path)
                    .ok_or(Error::Internal("sampled path must be indexed"))?;
                member_inputs = member_inputs.with_dimension(dimension.renamed(flat));
            }
            let member_output = SearchSpace::new(format!("estimator_{i}_output"))
                .with_dimension(target_dimension.renamed(target_flat.as_str()));

            members.push(DecisionTreeRegressor::new(
                config.tree.clone(),
                member_inputs,
                member_output,
                rng.u64(..),
            )?);
        }

        Ok(Self {
            config,
            input_space,
            output_space,
            input_index,
            target: target_flat,
            members,
        })
    }

    /// The ensemble members, in construction order.
    #[must_use]
    pub fn members(&self) -> &[DecisionTreeRegressor] {
        &self.members
    }

    /// The flat name of the predicted target dimension.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Rewrites path-named columns to flat names, dropping columns the
    /// input space does not declare.
    fn encode(&self, features: &Frame) -> Frame {
        features.rename_columns(|column| self.input_index.flatten(column))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
    fn rows_per_estimator(&self, total_rows: usize) -> usize {
        (self.config.samples_fraction_per_estimator * total_rows as f64).ceil() as usize
    }
}

impl Regressor for RandomForestRegressor {
    fn input_space(&self) -> &SearchSpace {
        &self.input_space
    }

    fn output_space(&self) -> &SearchSpace {
        &self.output_space
    }

    fn should_fit(&self, n_samples: usize) -> bool {
        let rows = self.rows_per_estimator(n_samples);
        self.members.iter().any(|m| m.should_fit(rows))
    }

    fn fit(&mut self, features: &Frame, targets: &[f64]) -> Result<()> {
        if features.n_rows() != targets.len() {
            return Err(Error::ShapeMismatch {
                rows: features.n_rows(),
                scores: targets.len(),
            });
        }

        let encoded = self.encode(features);
        let rows_per_estimator = self.rows_per_estimator(encoded.n_rows());

        for (i, member) in self.members.iter_mut().enumerate() {
            let member_columns: Vec<String> = member
                .input_space()
                .dimensions()
                .iter()
                .map(|d| d.name.clone())
                .collect();
            let projected = encoded.select(&member_columns);

            // Rows with a missing value are excluded per member, not
            // globally: a row useless to this member may still train another.
            let filtered: Vec<usize> = (0..projected.n_rows())
                .filter(|&row| member_columns.iter().all(|c| projected.get(row, c).is_some()))
                .collect();
            if filtered.is_empty() {
                continue;
            }

            // Reseeded by member index: each member resamples the same rows
            // across repeated fits on identical data, regardless of the
            // order members are processed in.
            let mut member_rng = fastrand::Rng::with_seed(i as u64);
            let n_selected = filtered.len().min(rows_per_estimator);
            let selected: Vec<usize> = (0..n_selected)
                .map(|_| filtered[member_rng.usize(0..filtered.len())])
                .collect();

            if !member.should_fit(selected.len()) {
                continue;
            }
            let member_targets: Vec<f64> = selected.iter().map(|&row| targets[row]).collect();
            member.fit(&encoded.take(&selected), &member_targets)?;
        }
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn predict(&self, features: &Frame) -> Vec<Prediction> {
        let encoded = self.encode(features);
        let member_predictions: Vec<Vec<Prediction>> = self
            .members
            .iter()
            .map(|member| member.predict(&encoded))
            .collect();

        (0..encoded.n_rows())
            .map(|row| {
                let valid: Vec<Estimate> = member_predictions
                    .iter()
                    .filter_map(|predictions| predictions[row].estimate)
                    .collect();
                if valid.is_empty() {
                    return Prediction::invalid(self.target.as_str());
                }
                let n = valid.len() as f64;
                let mean = valid.iter().map(|e| e.mean).sum::<f64>() / n;
                // Law of total variance; clamp tiny negative rounding noise.
                let second_moment = valid
                    .iter()
                    .map(|e| e.variance + e.mean * e.mean)
                    .sum::<f64>()
                    / n;
                let variance = (second_moment - mean * mean).max(0.0);
                Prediction::of(self.target.as_str(), mean, variance, valid.len())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Config;
    use crate::space::Dimension;
    use crate::value::Value;

    fn objective_space() -> SearchSpace {
        SearchSpace::new("objective").with_dimension(Dimension::float(
            "score",
            f64::NEG_INFINITY,
            f64::INFINITY,
        ))
    }

    fn flat_inputs(names: &[&str]) -> SearchSpace {
        names.iter().fold(SearchSpace::new("inputs"), |space, name| {
            space.with_dimension(Dimension::float(*name, 0.0, 10.0))
        })
    }

    fn identity_data(n: usize) -> (Frame, Vec<f64>) {
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
    fn rejects_zero_estimators() {
        let config = RandomForestConfig {
            n_estimators: 0,
            ..RandomForestConfig::default()
        };
        assert!(matches!(
            RandomForestRegressor::new(config, flat_inputs(&["x"]), objective_space()),
            Err(Error::NoEstimators)
        ));
    }

    #[test]
    fn rejects_out_of_range_fractions() {
        for value in [0.0, -0.1, 1.5] {
            let config = RandomForestConfig {
                samples_fraction_per_estimator: value,
                ..RandomForestConfig::default()
            };
            assert!(matches!(
                RandomForestRegressor::new(config, flat_inputs(&["x"]), objective_space()),
                Err(Error::InvalidFraction {
                    name: "samples_fraction_per_estimator",
                    ..
                })
            ));
        }
    }

    #[test]
    fn rejects_multi_dimensional_output() {
        let output = SearchSpace::new("objective")
            .with_dimension(Dimension::float("a", 0.0, 1.0))
            .with_dimension(Dimension::float("b", 0.0, 1.0));
        assert!(matches!(
            RandomForestRegressor::new(RandomForestConfig::default(), flat_inputs(&["x"]), output),
            Err(Error::NonScalarTarget(2))
        ));
    }

    #[test]
    fn members_get_feature_subsets() {
        let config = RandomForestConfig {
            n_estimators: 8,
            features_fraction_per_estimator: 0.5,
            ..RandomForestConfig::default()
        };
        let forest =
            RandomForestRegressor::new(config, flat_inputs(&["a", "b", "c", "d"]), objective_space())
                .unwrap();
        for member in forest.members() {
            assert_eq!(member.input_space().dimensions().len(), 2);
        }
    }

    #[test]
    fn features_per_estimator_floors_at_one() {
        let config = RandomForestConfig {
            features_fraction_per_estimator: 0.01,
            ..RandomForestConfig::default()
        };
        let forest =
            RandomForestRegressor::new(config, flat_inputs(&["a", "b", "c"]), objective_space())
                .unwrap();
        for member in forest.members() {
            assert_eq!(member.input_space().dimensions().len(), 1);
        }
    }

    #[test]
    fn unfit_forest_predicts_invalid() {
        let forest = RandomForestRegressor::new(
            RandomForestConfig::default(),
            flat_inputs(&["x"]),
            objective_space(),
        )
        .unwrap();
        let (frame, _) = identity_data(5);
        let predictions = forest.predict(&frame);
        assert_eq!(predictions.len(), 5);
        assert!(predictions.iter().all(|p| !p.is_valid()));
    }

    #[test]
    fn constant_target_aggregates_to_zero_variance() {
        let mut forest = RandomForestRegressor::new(
            RandomForestConfig::default(),
            flat_inputs(&["x"]),
            objective_space(),
        )
        .unwrap();
        let (frame, _) = identity_data(20);
        forest.fit(&frame, &vec![2.5; 20]).unwrap();

        for prediction in forest.predict(&frame) {
            let estimate = prediction.estimate.expect("all members must be fitted");
            assert!((estimate.mean - 2.5).abs() < 1e-12);
            assert!(estimate.variance.abs() < 1e-12);
            assert_eq!(estimate.count, 5);
        }
    }

    #[test]
    fn fit_is_deterministic_across_instances() {
        let make = || {
            RandomForestRegressor::new(
                RandomForestConfig {
                    samples_fraction_per_estimator: 0.7,
                    ..RandomForestConfig::default()
                },
                flat_inputs(&["x"]),
                objective_space(),
            )
            .unwrap()
        };
        let (frame, targets) = identity_data(40);

        let mut first = make();
        let mut second = make();
        first.fit(&frame, &targets).unwrap();
        second.fit(&frame, &targets).unwrap();
        assert_eq!(first.predict(&frame), second.predict(&frame));
    }

    #[test]
    fn refit_on_identical_data_is_identical() {
        let mut forest = RandomForestRegressor::new(
            RandomForestConfig {
                samples_fraction_per_estimator: 0.5,
                ..RandomForestConfig::default()
            },
            flat_inputs(&["x"]),
            objective_space(),
        )
        .unwrap();
        let (frame, targets) = identity_data(40);
        forest.fit(&frame, &targets).unwrap();
        let first = forest.predict(&frame);
        forest.fit(&frame, &targets).unwrap();
        assert_eq!(first, forest.predict(&frame));
    }

    #[test]
    fn fit_shape_mismatch_errors() {
        let mut forest = RandomForestRegressor::new(
            RandomForestConfig::default(),
            flat_inputs(&["x"]),
            objective_space(),
        )
        .unwrap();
        let (frame, _) = identity_data(10);
        assert!(matches!(
            forest.fit(&frame, &[1.0]),
            Err(Error::ShapeMismatch { rows: 10, scores: 1 })
        ));
    }

    #[test]
    fn hierarchical_rows_train_members_independently() {
        let lru = SearchSpace::new("lru").with_dimension(Dimension::int("size", 1, 1024));
        let random = SearchSpace::new("random").with_dimension(Dimension::float("decay", 0.0, 1.0));
        let space = SearchSpace::new("cache")
            .with_dimension(Dimension::categorical("policy", ["lru", "random"]))
            .with_subspace("policy", 0, lru)
            .with_subspace("policy", 1, random);

        let mut forest = RandomForestRegressor::new(
            RandomForestConfig {
                n_estimators: 10,
                ..RandomForestConfig::default()
            },
            space.clone(),
            objective_space(),
        )
        .unwrap();

        let mut rng = fastrand::Rng::with_seed(3);
        let configs: Vec<Config> = (0..40).map(|_| space.sample(&mut rng)).collect();
        let targets: Vec<f64> = configs
            .iter()
            .map(|c| c.get("policy").unwrap().to_f64())
            .collect();
        let frame = Frame::from_configs(&configs);

        forest.fit(&frame, &targets).unwrap();
        let predictions = forest.predict(&frame);
        assert_eq!(predictions.len(), 40);
        assert!(
            predictions.iter().any(Prediction::is_valid),
            "mixed-branch data must still produce predictions"
        );
        for prediction in predictions.iter().filter(|p| p.is_valid()) {
            let estimate = prediction.estimate.unwrap();
            assert!(estimate.variance >= 0.0);
            assert!(estimate.count <= 10);
        }
    }
}
