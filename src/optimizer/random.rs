use parking_lot::Mutex;

use crate::error::Result;
use crate::frame::{Config, Frame};
use crate::optimizer::Strategy;
use crate::space::SearchSpace;

/// Uniform random search: every suggestion is an independent sample of
/// the space. Observations are accepted and ignored.
///
/// Useful as a baseline and as the startup phase of model-based
/// strategies.
pub struct RandomStrategy {
    space: SearchSpace,
    rng: Mutex<fastrand::Rng>,
}

impl RandomStrategy {
    /// Creates a random strategy with a nondeterministic seed.
    #[must_use]
    pub fn new(space: SearchSpace) -> Self {
        Self {
            space,
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Creates a random strategy with a fixed seed for reproducible runs.
    #[must_use]
    pub fn with_seed(space: SearchSpace, seed: u64) -> Self {
        Self {
            space,
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }
}

impl Strategy for RandomStrategy {
    fn suggest(&self, _context: Option<&Frame>) -> Result<Config> {
        Ok(self.space.sample(&mut self.rng.lock()))
    }

    fn register(&mut self, _configurations: &Frame, _scores: &[f64], _context: Option<&Frame>)
    -> Result<()> {
        Ok(())
    }

    fn register_pending(&mut self, _configurations: &Frame, _context: Option<&Frame>)
    -> Result<()> {
        Ok(())
    }
}
