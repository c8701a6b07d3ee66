//! The observe/suggest protocol and the strategies that drive it.
//!
//! [`Optimizer`] enforces a uniform contract — append-only observation
//! history, a pending-observation list for in-flight trials, and
//! transparent space-adapter bookkeeping — while delegating the actual
//! search policy to a [`Strategy`]. Strategies always operate in the
//! optimizer-facing (target) space; the optimizer converts at the
//! boundary, so a strategy never sees adapter details and a caller never
//! sees target-space configurations.
//!
//! # Example
//!
//! ```
//! use autotune::frame::Frame;
//! use autotune::optimizer::{Optimizer, RandomStrategy};
//! use autotune::space::{Dimension, SearchSpace};
//!
//! let space = SearchSpace::new("knobs").with_dimension(Dimension::float("x", 0.0, 1.0));
//! let mut optimizer = Optimizer::new(space.clone(), RandomStrategy::with_seed(space, 42));
//!
//! let config = optimizer.suggest(None).unwrap();
//! let score = config.get("x").unwrap().to_f64(); // stand-in for a real trial
//! optimizer
//!     .register(&Frame::from_configs(&[config]), &[score], None)
//!     .unwrap();
//! assert_eq!(optimizer.get_observations().unwrap().n_rows(), 1);
//! ```

mod random;
mod surrogate;

pub use random::RandomStrategy;
pub use surrogate::{SurrogateConfig, SurrogateStrategy};

use crate::adapter::SpaceAdapter;
use crate::error::{Error, Result};
use crate::frame::{Config, Frame};
use crate::space::SearchSpace;
use crate::value::Value;

/// Name of the score column in observation tables.
pub const SCORE_COLUMN: &str = "score";

/// One recorded (configuration batch, scores, reserved context) triple,
/// stored in original-space form exactly as the caller registered it.
#[derive(Clone, Debug)]
pub struct Observation {
    /// The registered configurations, one row each.
    pub configurations: Frame,
    /// The scores, aligned by row position. Lower is better.
    pub scores: Vec<f64>,
    /// Reserved; carries no semantics yet.
    pub context: Option<Frame>,
}

/// A search policy operating in the optimizer-facing space.
///
/// The optimizer handles history, pending bookkeeping, and adapter
/// transforms; a strategy only decides what to propose and how to digest
/// observations. `suggest` takes `&self` so proposing never mutates
/// observation state; strategies wrap their RNGs in a mutex where needed.
pub trait Strategy: Send + Sync {
    /// Proposes exactly one configuration in the optimizer-facing space.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy cannot produce a proposal.
    fn suggest(&self, context: Option<&Frame>) -> Result<Config>;

    /// Digests a batch of scored configurations (already mapped into the
    /// optimizer-facing space).
    ///
    /// # Errors
    ///
    /// Returns an error if the batch shapes disagree or a model update
    /// fails.
    fn register(&mut self, configurations: &Frame, scores: &[f64], context: Option<&Frame>)
    -> Result<()>;

    /// Records configurations as in flight so the strategy can avoid
    /// re-proposing them.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy cannot record the configurations.
    fn register_pending(&mut self, configurations: &Frame, context: Option<&Frame>) -> Result<()>;
}

/// A black-box configuration optimizer: owns the observation history and
/// pending list, applies an optional space adapter, and delegates search
/// policy to its [`Strategy`].
pub struct Optimizer {
    parameter_space: SearchSpace,
    optimizer_parameter_space: SearchSpace,
    adapter: Option<Box<dyn SpaceAdapter>>,
    strategy: Box<dyn Strategy>,
    observations: Vec<Observation>,
    pending: Vec<Frame>,
}

impl Optimizer {
    /// Creates an optimizer without reparameterization: the strategy
    /// operates directly in `parameter_space`.
    #[must_use]
    pub fn new(parameter_space: SearchSpace, strategy: impl Strategy + 'static) -> Self {
        Self {
            optimizer_parameter_space: parameter_space.clone(),
            parameter_space,
            adapter: None,
            strategy: Box::new(strategy),
            observations: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Creates an optimizer whose strategy operates in the adapter's
    /// target space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SpaceMismatch`] if the adapter's original space is
    /// not `parameter_space` — this prevents silently optimizing in a
    /// mismatched space.
    pub fn with_adapter(
        parameter_space: SearchSpace,
        strategy: impl Strategy + 'static,
        adapter: impl SpaceAdapter + 'static,
    ) -> Result<Self> {
        if adapter.orig_space() != &parameter_space {
            return Err(Error::SpaceMismatch {
                adapter: adapter.orig_space().name().to_string(),
                optimizer: parameter_space.name().to_string(),
            });
        }
        Ok(Self {
            optimizer_parameter_space: adapter.target_space().clone(),
            parameter_space,
            adapter: Some(Box::new(adapter)),
            strategy: Box::new(strategy),
            observations: Vec::new(),
            pending: Vec::new(),
        })
    }

    /// The space the caller operates in.
    #[must_use]
    pub fn parameter_space(&self) -> &SearchSpace {
        &self.parameter_space
    }

    /// The space the strategy operates in (equals
    /// [`parameter_space`](Self::parameter_space) without an adapter).
    #[must_use]
    pub fn optimizer_parameter_space(&self) -> &SearchSpace {
        &self.optimizer_parameter_space
    }

    /// The recorded observations, in registration order.
    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of configurations currently registered as pending.
    #[must_use]
    pub fn n_pending(&self) -> usize {
        self.pending.iter().map(Frame::n_rows).sum()
    }

    /// Records scored configurations and forwards them to the strategy.
    ///
    /// The observation is stored verbatim in original-space form; the
    /// strategy receives the inverse-transformed (target-space) frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if row counts disagree,
    /// [`Error::ContextNotSupported`] for a non-empty context, or any
    /// error from the adapter or strategy.
    pub fn register(
        &mut self,
        configurations: &Frame,
        scores: &[f64],
        context: Option<&Frame>,
    ) -> Result<()> {
        ensure_no_context(context)?;
        if configurations.n_rows() != scores.len() {
            return Err(Error::ShapeMismatch {
                rows: configurations.n_rows(),
                scores: scores.len(),
            });
        }
        self.observations.push(Observation {
            configurations: configurations.clone(),
            scores: scores.to_vec(),
            // An empty context frame is treated as absent.
            context: context.filter(|c| !c.is_empty()).cloned(),
        });
        trace_debug!(
            rows = configurations.n_rows(),
            batches = self.observations.len(),
            "registered observation batch"
        );
        let adapted = self.to_target_space(configurations)?;
        self.strategy.register(&adapted, scores, context)
    }

    /// Proposes one configuration in the caller's (original) space.
    ///
    /// Never mutates the observation history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContextNotSupported`] for a non-empty context, or
    /// any error from the strategy or adapter.
    pub fn suggest(&self, context: Option<&Frame>) -> Result<Config> {
        ensure_no_context(context)?;
        let raw = self.strategy.suggest(context)?;
        match &self.adapter {
            None => Ok(raw),
            Some(adapter) => adapter.transform(&raw),
        }
    }

    /// Records configurations as in flight (suggested, trial started, no
    /// score yet).
    ///
    /// Pending configurations are stored in original-space form as
    /// received; the strategy receives the inverse-transformed frame,
    /// mirroring [`register`](Self::register)'s transform direction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContextNotSupported`] for a non-empty context, or
    /// any error from the adapter or strategy.
    pub fn register_pending(
        &mut self,
        configurations: &Frame,
        context: Option<&Frame>,
    ) -> Result<()> {
        ensure_no_context(context)?;
        self.pending.push(configurations.clone());
        let adapted = self.to_target_space(configurations)?;
        self.strategy.register_pending(&adapted, context)
    }

    /// Returns the full observation history as one table: parameter
    /// columns plus a [`SCORE_COLUMN`], one row per observation, in
    /// registration order. Pending configurations are never included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoObservations`] if nothing was registered (or
    /// every registered batch was empty), or
    /// [`Error::ContextNotSupported`] if any observation carries a
    /// context.
    pub fn get_observations(&self) -> Result<Frame> {
        // Zero-row batches pass the shape check but contribute no rows.
        if self.observations.iter().all(|o| o.configurations.is_empty()) {
            return Err(Error::NoObservations);
        }
        if self.observations.iter().any(|o| o.context.is_some()) {
            return Err(Error::ContextNotSupported);
        }
        let mut table = Frame::default();
        let mut scores = Vec::new();
        for observation in &self.observations {
            table.vstack(&observation.configurations);
            scores.extend(observation.scores.iter().map(|&s| Value::Float(s)));
        }
        table.push_column(SCORE_COLUMN, scores)?;
        Ok(table)
    }

    /// Returns the single observation with the minimal score (lower is
    /// better), ties broken by registration order.
    ///
    /// # Errors
    ///
    /// Same conditions as [`get_observations`](Self::get_observations).
    pub fn get_best_observation(&self) -> Result<Frame> {
        let table = self.get_observations()?;
        let mut best_row = 0;
        let mut best_score = f64::INFINITY;
        for row in 0..table.n_rows() {
            if let Some(Value::Float(score)) = table.get(row, SCORE_COLUMN)
                && *score < best_score
            {
                best_score = *score;
                best_row = row;
            }
        }
        Ok(table.take(&[best_row]))
    }

    fn to_target_space(&self, configurations: &Frame) -> Result<Frame> {
        match &self.adapter {
            None => Ok(configurations.clone()),
            Some(adapter) => {
                let mapped: Vec<Config> = configurations
                    .to_configs()
                    .iter()
                    .map(|c| adapter.inverse_transform(c))
                    .collect::<Result<_>>()?;
                Ok(Frame::from_configs(&mapped))
            }
        }
    }
}

fn ensure_no_context(context: Option<&Frame>) -> Result<()> {
    if context.is_some_and(|c| !c.is_empty()) {
        return Err(Error::ContextNotSupported);
    }
    Ok(())
}
