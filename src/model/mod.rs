//! Uncertainty-aware regression models backing the surrogate optimizer.
//!
//! The [`Regressor`] trait is the seam between the ensemble and its
//! members: anything that can fit a flattened feature table and predict a
//! mean/variance per row can serve as an ensemble member. The crate ships
//! a variance-reduction [`DecisionTreeRegressor`](tree::DecisionTreeRegressor)
//! and combines many of them in a
//! [`RandomForestRegressor`](forest::RandomForestRegressor).

pub mod forest;
pub mod tree;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::frame::Frame;
use crate::space::SearchSpace;

/// A mean/variance estimate backed by `count` contributing samples or
/// members.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Estimate {
    /// Predicted mean of the target.
    pub mean: f64,
    /// Predicted variance of the target.
    pub variance: f64,
    /// Number of contributing samples (single regressor) or valid members
    /// (ensemble).
    pub count: usize,
}

/// The result of querying a regressor for one row.
///
/// A prediction without an estimate is an explicit "no prediction
/// possible" marker, distinct from any numeric value — callers never have
/// to compare against a sentinel.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Prediction {
    /// The flat name of the predicted target dimension.
    pub target: String,
    /// The estimate, or `None` when the regressor cannot predict this row.
    pub estimate: Option<Estimate>,
}

impl Prediction {
    /// Creates a prediction carrying an estimate.
    #[must_use]
    pub fn of(target: impl Into<String>, mean: f64, variance: f64, count: usize) -> Self {
        Self {
            target: target.into(),
            estimate: Some(Estimate {
                mean,
                variance,
                count,
            }),
        }
    }

    /// Creates an explicit "no prediction possible" marker.
    #[must_use]
    pub fn invalid(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            estimate: None,
        }
    }

    /// Returns `true` if the prediction carries an estimate.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.estimate.is_some()
    }
}

/// A trainable regressor over a flattened input subspace and a
/// single-dimension output subspace.
pub trait Regressor {
    /// The flattened input subspace this regressor reads from.
    fn input_space(&self) -> &SearchSpace;

    /// The flattened single-dimension output subspace.
    fn output_space(&self) -> &SearchSpace;

    /// Readiness check: would this regressor accept a fit on `n_samples`
    /// rows?
    fn should_fit(&self, n_samples: usize) -> bool;

    /// Fits the regressor on the given rows.
    ///
    /// # Errors
    ///
    /// Returns an error if `features` and `targets` disagree on row count.
    fn fit(&mut self, features: &Frame, targets: &[f64]) -> Result<()>;

    /// Predicts one [`Prediction`] per input row, order preserved.
    fn predict(&self, features: &Frame) -> Vec<Prediction>;
}
