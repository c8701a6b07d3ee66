//! Space adapters: bidirectional reparameterizations of the search space.
//!
//! An adapter lets the optimizer search a *target* space that is more
//! convenient than the caller's *original* space, with the
//! [`Optimizer`](crate::optimizer::Optimizer) applying the mapping
//! transparently in both directions. The optimizer relies only on the
//! contract below and never inspects adapter internals; a lossless adapter
//! satisfies `inverse_transform(transform(c)) == c`.

use crate::error::{Error, Result};
use crate::frame::Config;
use crate::space::{Domain, SearchSpace};
use crate::value::Value;

/// A bidirectional mapping between an original and a target parameter
/// space.
pub trait SpaceAdapter: Send + Sync {
    /// The space the caller operates in.
    fn orig_space(&self) -> &SearchSpace;

    /// The space the optimizer operates in.
    fn target_space(&self) -> &SearchSpace;

    /// Maps a target-space configuration to the original space.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration references dimensions the
    /// space does not declare.
    fn transform(&self, configuration: &Config) -> Result<Config>;

    /// Maps an original-space configuration to the target space.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration references dimensions the
    /// space does not declare.
    fn inverse_transform(&self, configuration: &Config) -> Result<Config>;
}

/// The do-nothing adapter: both spaces are the caller's space and both
/// maps are the identity.
pub struct IdentityAdapter {
    space: SearchSpace,
}

impl IdentityAdapter {
    /// Wraps a space in an identity mapping.
    #[must_use]
    pub fn new(space: SearchSpace) -> Self {
        Self { space }
    }
}

impl SpaceAdapter for IdentityAdapter {
    fn orig_space(&self) -> &SearchSpace {
        &self.space
    }

    fn target_space(&self) -> &SearchSpace {
        &self.space
    }

    fn transform(&self, configuration: &Config) -> Result<Config> {
        Ok(configuration.clone())
    }

    fn inverse_transform(&self, configuration: &Config) -> Result<Config> {
        Ok(configuration.clone())
    }
}

/// Rescales every continuous dimension of the original space onto the
/// unit interval; integer and categorical dimensions pass through.
///
/// Lossless up to floating-point rounding, so it exercises the round-trip
/// contract without changing the search problem.
pub struct AffineAdapter {
    orig: SearchSpace,
    target: SearchSpace,
}

impl AffineAdapter {
    /// Builds the unit-interval reparameterization of `orig`.
    #[must_use]
    pub fn new(orig: SearchSpace) -> Self {
        let target = orig.map_domains(&|domain| match domain {
            Domain::Float { .. } => Domain::Float {
                low: 0.0,
                high: 1.0,
            },
            other => other.clone(),
        });
        Self { orig, target }
    }

    fn map(&self, configuration: &Config, to_orig: bool) -> Result<Config> {
        let mut mapped = Config::new();
        for (path, value) in configuration.iter() {
            let dimension = self
                .orig
                .dimension_at(path)
                .ok_or_else(|| Error::UnknownDimension(path.to_string()))?;
            let value = match (&dimension.domain, value) {
                (Domain::Float { low, high }, Value::Float(v)) => {
                    let width = high - low;
                    if to_orig {
                        Value::Float(low + v * width)
                    } else if width > 0.0 {
                        Value::Float((v - low) / width)
                    } else {
                        Value::Float(0.0)
                    }
                }
                _ => value.clone(),
            };
            mapped.push(path.to_string(), value);
        }
        Ok(mapped)
    }
}

impl SpaceAdapter for AffineAdapter {
    fn orig_space(&self) -> &SearchSpace {
        &self.orig
    }

    fn target_space(&self) -> &SearchSpace {
        &self.target
    }

    fn transform(&self, configuration: &Config) -> Result<Config> {
        self.map(configuration, true)
    }

    fn inverse_transform(&self, configuration: &Config) -> Result<Config> {
        self.map(configuration, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::Dimension;

    fn space() -> SearchSpace {
        SearchSpace::new("knobs")
            .with_dimension(Dimension::float("x", -5.0, 5.0))
            .with_dimension(Dimension::int("n", 1, 8))
            .with_dimension(Dimension::categorical("mode", ["fast", "safe"]))
    }

    #[test]
    fn identity_round_trips_exactly() {
        let adapter = IdentityAdapter::new(space());
        let mut rng = fastrand::Rng::with_seed(5);
        let config = space().sample(&mut rng);
        let there = adapter.inverse_transform(&config).unwrap();
        let back = adapter.transform(&there).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn affine_target_space_is_unit_interval() {
        let adapter = AffineAdapter::new(space());
        match &adapter.target_space().dimension_at("x").unwrap().domain {
            Domain::Float { low, high } => {
                assert!((low - 0.0).abs() < f64::EPSILON);
                assert!((high - 1.0).abs() < f64::EPSILON);
            }
            other => panic!("x must stay continuous, got {other:?}"),
        }
        // Non-float dimensions are untouched.
        assert_eq!(
            adapter.target_space().dimension_at("n").unwrap().domain,
            Domain::Int { low: 1, high: 8 }
        );
    }

    #[test]
    fn affine_round_trips_within_rounding() {
        let adapter = AffineAdapter::new(space());
        let mut rng = fastrand::Rng::with_seed(9);
        for _ in 0..20 {
            let config = space().sample(&mut rng);
            let target = adapter.inverse_transform(&config).unwrap();
            assert!(adapter.target_space().contains(&target));
            let back = adapter.transform(&target).unwrap();
            for (path, value) in config.iter() {
                match (value, back.get(path).unwrap()) {
                    (Value::Float(a), Value::Float(b)) => {
                        assert!((a - b).abs() < 1e-9, "{path}: {a} != {b}");
                    }
                    (a, b) => assert_eq!(a, b, "{path}"),
                }
            }
        }
    }

    #[test]
    fn affine_rejects_unknown_dimensions() {
        let adapter = AffineAdapter::new(space());
        let config = Config::new().with("nope", Value::Float(0.5));
        assert!(matches!(
            adapter.transform(&config),
            Err(Error::UnknownDimension(_))
        ));
    }
}
