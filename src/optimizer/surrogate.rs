use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::frame::{Config, Frame};
use crate::model::Regressor;
use crate::model::forest::{RandomForestConfig, RandomForestRegressor};
use crate::optimizer::{SCORE_COLUMN, Strategy};
use crate::space::{Dimension, SearchSpace};

/// Tuning knobs of [`SurrogateStrategy`].
#[derive(Clone, Debug)]
pub struct SurrogateConfig {
    /// Observations to collect with pure random search before trusting the
    /// model.
    pub n_startup: usize,
    /// Random candidates scored by the model per suggestion.
    pub n_candidates: usize,
    /// Exploration weight on the predicted standard deviation in the
    /// lower-confidence-bound acquisition.
    pub kappa: f64,
    /// Seed for the strategy's own sampling RNG.
    pub seed: u64,
    /// Configuration of the backing forest.
    pub forest: RandomForestConfig,
}

impl Default for SurrogateConfig {
    fn default() -> Self {
        Self {
            n_startup: 10,
            n_candidates: 1000,
            kappa: 1.0,
            seed: 42,
            forest: RandomForestConfig::default(),
        }
    }
}

/// Model-based search: fits a random forest on all observations and
/// suggests the random candidate with the lowest lower confidence bound
/// `mean - kappa * stddev`.
///
/// Candidates matching a pending configuration are skipped so concurrent
/// trials do not duplicate work. Falls back to a uniform sample while the
/// model is not fit or when no scoreable candidate remains.
pub struct SurrogateStrategy {
    space: SearchSpace,
    config: SurrogateConfig,
    forest: RandomForestRegressor,
    seen: Frame,
    scores: Vec<f64>,
    pending: Vec<Config>,
    fitted: bool,
    rng: Mutex<fastrand::Rng>,
}

impl SurrogateStrategy {
    /// Creates the strategy and its backing forest over `space`.
    ///
    /// # Errors
    ///
    /// Returns an error if the forest configuration is invalid or the
    /// space cannot be flattened bijectively.
    pub fn new(space: SearchSpace, config: SurrogateConfig) -> Result<Self> {
        let output_space = SearchSpace::new("objective").with_dimension(Dimension::float(
            SCORE_COLUMN,
            f64::NEG_INFINITY,
            f64::INFINITY,
        ));
        let forest =
            RandomForestRegressor::new(config.forest.clone(), space.clone(), output_space)?;
        Ok(Self {
            rng: Mutex::new(fastrand::Rng::with_seed(config.seed)),
            space,
            config,
            forest,
            seen: Frame::default(),
            scores: Vec::new(),
            pending: Vec::new(),
            fitted: false,
        })
    }

    /// The backing forest, for inspection.
    #[must_use]
    pub fn forest(&self) -> &RandomForestRegressor {
        &self.forest
    }

    /// Number of configurations currently held as pending.
    #[must_use]
    pub fn n_pending(&self) -> usize {
        self.pending.len()
    }
}

impl Strategy for SurrogateStrategy {
    fn suggest(&self, _context: Option<&Frame>) -> Result<Config> {
        let mut rng = self.rng.lock();
        if self.scores.len() < self.config.n_startup || !self.fitted {
            return Ok(self.space.sample(&mut rng));
        }

        let candidates: Vec<Config> = (0..self.config.n_candidates)
            .map(|_| self.space.sample(&mut rng))
            .collect();
        let predictions = self.forest.predict(&Frame::from_configs(&candidates));

        let mut best: Option<(usize, f64)> = None;
        for (i, prediction) in predictions.iter().enumerate() {
            if self.pending.iter().any(|p| p.matches(&candidates[i])) {
                continue;
            }
            let Some(estimate) = prediction.estimate else {
                continue;
            };
            let acquisition = estimate.mean - self.config.kappa * estimate.variance.sqrt();
            if best.is_none_or(|(_, score)| acquisition < score) {
                best = Some((i, acquisition));
            }
        }
        match best {
            Some((i, _)) => Ok(candidates[i].clone()),
            // Every candidate was pending or unscoreable.
            None => Ok(self.space.sample(&mut rng)),
        }
    }

    fn register(&mut self, configurations: &Frame, scores: &[f64], _context: Option<&Frame>)
    -> Result<()> {
        if configurations.n_rows() != scores.len() {
            return Err(Error::ShapeMismatch {
                rows: configurations.n_rows(),
                scores: scores.len(),
            });
        }
        self.seen.vstack(configurations);
        self.scores.extend_from_slice(scores);
        for config in configurations.to_configs() {
            if let Some(position) = self.pending.iter().position(|p| p.matches(&config)) {
                self.pending.remove(position);
            }
        }
        if self.forest.should_fit(self.scores.len()) {
            self.forest.fit(&self.seen, &self.scores)?;
            self.fitted = true;
            trace_debug!(n_observations = self.scores.len(), "refit surrogate forest");
        }
        Ok(())
    }

    fn register_pending(&mut self, configurations: &Frame, _context: Option<&Frame>)
    -> Result<()> {
        self.pending.extend(configurations.to_configs());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn float_space() -> SearchSpace {
        SearchSpace::new("s").with_dimension(Dimension::float("x", 0.0, 10.0))
    }

    fn register_points(strategy: &mut SurrogateStrategy, points: &[(f64, f64)]) {
        let configs: Vec<Config> = points
            .iter()
            .map(|(x, _)| Config::new().with("x", Value::Float(*x)))
            .collect();
        let scores: Vec<f64> = points.iter().map(|(_, s)| *s).collect();
        strategy
            .register(&Frame::from_configs(&configs), &scores, None)
            .unwrap();
    }

    #[test]
    fn startup_suggestions_are_in_space() {
        let strategy = SurrogateStrategy::new(float_space(), SurrogateConfig::default()).unwrap();
        for _ in 0..20 {
            let config = strategy.suggest(None).unwrap();
            assert!(float_space().contains(&config));
        }
    }

    #[test]
    fn model_suggestions_stay_in_space() {
        let mut strategy = SurrogateStrategy::new(
            float_space(),
            SurrogateConfig {
                n_startup: 5,
                n_candidates: 50,
                ..SurrogateConfig::default()
            },
        )
        .unwrap();
        let points: Vec<(f64, f64)> = (0..30)
            .map(|i| {
                let x = f64::from(i) / 3.0;
                (x, (x - 3.0) * (x - 3.0))
            })
            .collect();
        register_points(&mut strategy, &points);
        for _ in 0..10 {
            let config = strategy.suggest(None).unwrap();
            assert!(float_space().contains(&config));
        }
    }

    #[test]
    fn acquisition_prefers_the_better_region() {
        // Two-choice space with a clear winner; the fitted model must steer
        // suggestions to it.
        let space = SearchSpace::new("s")
            .with_dimension(Dimension::categorical("mode", ["good", "bad"]));
        let mut strategy = SurrogateStrategy::new(
            space,
            SurrogateConfig {
                n_startup: 5,
                n_candidates: 100,
                ..SurrogateConfig::default()
            },
        )
        .unwrap();
        let configs: Vec<Config> = (0..30)
            .map(|i| Config::new().with("mode", Value::Categorical(i % 2)))
            .collect();
        let scores: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 0.0 } else { 10.0 }).collect();
        strategy
            .register(&Frame::from_configs(&configs), &scores, None)
            .unwrap();

        let suggestion = strategy.suggest(None).unwrap();
        assert_eq!(suggestion.get("mode"), Some(&Value::Categorical(0)));
    }

    #[test]
    fn pending_configurations_are_not_reproposed() {
        let space = SearchSpace::new("s")
            .with_dimension(Dimension::categorical("mode", ["good", "bad"]));
        let mut strategy = SurrogateStrategy::new(
            space,
            SurrogateConfig {
                n_startup: 5,
                n_candidates: 200,
                ..SurrogateConfig::default()
            },
        )
        .unwrap();
        let configs: Vec<Config> = (0..30)
            .map(|i| Config::new().with("mode", Value::Categorical(i % 2)))
            .collect();
        let scores: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 0.0 } else { 10.0 }).collect();
        strategy
            .register(&Frame::from_configs(&configs), &scores, None)
            .unwrap();

        // Mark the winning configuration as in flight; suggestions must
        // switch to the only other configuration.
        let winner = Config::new().with("mode", Value::Categorical(0));
        strategy
            .register_pending(&Frame::from_configs(std::slice::from_ref(&winner)), None)
            .unwrap();
        let suggestion = strategy.suggest(None).unwrap();
        assert_eq!(suggestion.get("mode"), Some(&Value::Categorical(1)));
    }

    #[test]
    fn registering_a_pending_configuration_clears_it() {
        let mut strategy =
            SurrogateStrategy::new(float_space(), SurrogateConfig::default()).unwrap();
        let config = Config::new().with("x", Value::Float(1.0));
        let frame = Frame::from_configs(std::slice::from_ref(&config));
        strategy.register_pending(&frame, None).unwrap();
        assert_eq!(strategy.n_pending(), 1);
        strategy.register(&frame, &[0.5], None).unwrap();
        assert_eq!(strategy.n_pending(), 0);
    }

    #[test]
    fn register_checks_shapes() {
        let mut strategy =
            SurrogateStrategy::new(float_space(), SurrogateConfig::default()).unwrap();
        let config = Config::new().with("x", Value::Float(1.0));
        let frame = Frame::from_configs(std::slice::from_ref(&config));
        assert!(matches!(
            strategy.register(&frame, &[1.0, 2.0], None),
            Err(Error::ShapeMismatch { rows: 1, scores: 2 })
        ));
    }
}
