#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Sample-efficient black-box configuration tuning with an
//! uncertainty-aware random-forest surrogate model.
//!
//! The crate splits the tuning loop into two halves. An
//! [`Optimizer`](optimizer::Optimizer) runs the observe/suggest protocol:
//! it keeps an append-only history of scored configurations, tracks
//! in-flight (pending) trials, and can reparameterize the search through a
//! [`SpaceAdapter`](adapter::SpaceAdapter). A
//! [`Strategy`](optimizer::Strategy) decides what to propose next — either
//! uniform [`RandomStrategy`](optimizer::RandomStrategy) search or the
//! model-based [`SurrogateStrategy`](optimizer::SurrogateStrategy), which
//! fits a [`RandomForestRegressor`](model::forest::RandomForestRegressor)
//! on everything observed so far and picks the candidate with the lowest
//! confidence bound.
//!
//! # Getting Started
//!
//! Minimize a black-box function over a two-dimensional space:
//!
//! ```
//! use autotune::frame::Frame;
//! use autotune::optimizer::{Optimizer, SurrogateConfig, SurrogateStrategy};
//! use autotune::space::{Dimension, SearchSpace};
//!
//! let space = SearchSpace::new("knobs")
//!     .with_dimension(Dimension::float("x", -5.0, 5.0))
//!     .with_dimension(Dimension::int("threads", 1, 16));
//!
//! let strategy = SurrogateStrategy::new(space.clone(), SurrogateConfig::default()).unwrap();
//! let mut optimizer = Optimizer::new(space, strategy);
//!
//! for _ in 0..25 {
//!     let config = optimizer.suggest(None).unwrap();
//!     let x = config.get("x").unwrap().to_f64();
//!     let score = (x - 2.0).powi(2); // the black box under tuning
//!     optimizer
//!         .register(&Frame::from_configs(&[config]), &[score], None)
//!         .unwrap();
//! }
//!
//! let best = optimizer.get_best_observation().unwrap();
//! assert_eq!(best.n_rows(), 1);
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`SearchSpace`](space::SearchSpace) | Declare tunable dimensions, including guarded subspaces that only participate under a chosen categorical value. |
//! | [`Config`](frame::Config) / [`Frame`](frame::Frame) | Exchange single configurations and row-per-configuration batches. |
//! | [`Optimizer`](optimizer::Optimizer) | Run the observe/suggest protocol: history, pending trials, adapter bookkeeping. |
//! | [`Strategy`](optimizer::Strategy) | Decide what to propose next (random baseline or surrogate-model search). |
//! | [`Regressor`](model::Regressor) | Fit and predict with mean/variance; the seam between the forest and its member trees. |
//! | [`SpaceAdapter`](adapter::SpaceAdapter) | Reparameterize the space the strategy searches, invisibly to the caller. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on configurations, frames, spaces, and predictions | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at registration and suggestion points | off |

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod adapter;
mod error;
pub mod frame;
pub mod model;
pub mod optimizer;
mod rng_util;
pub mod space;
mod value;

pub use error::{Error, Result};
pub use value::Value;

/// Convenient wildcard import for the most common types.
///
/// ```
/// use autotune::prelude::*;
/// ```
pub mod prelude {
    pub use crate::adapter::{AffineAdapter, IdentityAdapter, SpaceAdapter};
    pub use crate::error::{Error, Result};
    pub use crate::frame::{Config, Frame};
    pub use crate::model::forest::{RandomForestConfig, RandomForestRegressor};
    pub use crate::model::{Estimate, Prediction, Regressor};
    pub use crate::optimizer::{
        Observation, Optimizer, RandomStrategy, Strategy, SurrogateConfig, SurrogateStrategy,
    };
    pub use crate::space::{Dimension, Domain, SearchSpace};
    pub use crate::value::Value;
}
