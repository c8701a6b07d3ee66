//! Search space definition: dimensions, hierarchical subspaces, and the
//! bijective path-flattening table.
//!
//! A [`SearchSpace`] is a named set of [`Dimension`]s plus optional *guarded
//! subspaces*: a subspace attached to one choice of a categorical dimension
//! that only participates when that choice is taken. Guards give mutually
//! exclusive parameter groups — a configuration using an LRU cache policy
//! carries LRU parameters, never the random-eviction ones.
//!
//! Nested dimensions are addressed by dot-joined *paths*
//! (`cache.lru.size`). [`FlatIndex`] maintains an explicit bijective table
//! between paths and flat identifiers so that regression models can work
//! over non-nested column names without string-rewriting heuristics.
//!
//! # Example
//!
//! ```
//! use autotune::space::{Dimension, SearchSpace};
//!
//! let lru = SearchSpace::new("lru").with_dimension(Dimension::int("size", 1, 4096));
//! let space = SearchSpace::new("cache")
//!     .with_dimension(Dimension::categorical("policy", ["lru", "random"]))
//!     .with_subspace("policy", 0, lru);
//!
//! let mut rng = fastrand::Rng::with_seed(1);
//! let config = space.sample(&mut rng);
//! assert!(space.contains(&config));
//! ```

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frame::Config;
use crate::rng_util;
use crate::value::Value;

/// Separator between nesting levels in a dimension path.
pub const PATH_SEPARATOR: char = '.';

/// Separator substituted for [`PATH_SEPARATOR`] in flat identifiers.
const FLAT_SEPARATOR: &str = "__";

/// The domain of a single dimension.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Domain {
    /// A continuous range, both bounds inclusive.
    Float {
        /// Lower bound (inclusive).
        low: f64,
        /// Upper bound (inclusive).
        high: f64,
    },
    /// An integer range, both bounds inclusive.
    Int {
        /// Lower bound (inclusive).
        low: i64,
        /// Upper bound (inclusive).
        high: i64,
    },
    /// A finite set of named choices.
    Categorical {
        /// The choice labels; values store indices into this array.
        choices: Vec<String>,
    },
}

impl Domain {
    /// Returns `true` if the value belongs to this domain.
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Float { low, high }, Value::Float(v)) => (*low..=*high).contains(v),
            (Self::Int { low, high }, Value::Int(v)) => (*low..=*high).contains(v),
            (Self::Categorical { choices }, Value::Categorical(i)) => *i < choices.len(),
            _ => false,
        }
    }

    /// Samples a uniformly random value from this domain.
    pub(crate) fn sample(&self, rng: &mut fastrand::Rng) -> Value {
        match self {
            Self::Float { low, high } => Value::Float(rng_util::f64_range(rng, *low, *high)),
            Self::Int { low, high } => Value::Int(rng.i64(*low..=*high)),
            Self::Categorical { choices } => Value::Categorical(rng.usize(0..choices.len())),
        }
    }
}

/// A named dimension of a search space.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dimension {
    /// The dimension's name, unique within its level of the space.
    pub name: String,
    /// The dimension's domain.
    pub domain: Domain,
}

impl Dimension {
    /// Creates a continuous dimension.
    #[must_use]
    pub fn float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            domain: Domain::Float { low, high },
        }
    }

    /// Creates an integer dimension.
    #[must_use]
    pub fn int(name: impl Into<String>, low: i64, high: i64) -> Self {
        Self {
            name: name.into(),
            domain: Domain::Int { low, high },
        }
    }

    /// Creates a categorical dimension from choice labels.
    #[must_use]
    pub fn categorical<S: Into<String>>(
        name: impl Into<String>,
        choices: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            domain: Domain::Categorical {
                choices: choices.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Returns a copy of this dimension under a different name.
    #[must_use]
    pub(crate) fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: self.domain.clone(),
        }
    }
}

/// A subspace that participates only when a categorical guard dimension
/// takes a specific choice.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct GuardedSubspace {
    /// Name of the guarding categorical dimension in the parent space.
    dimension: String,
    /// The choice index that activates this subspace.
    choice: usize,
    /// The guarded subspace; its name becomes the path prefix.
    space: SearchSpace,
}

/// A named, possibly hierarchical parameter space.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchSpace {
    name: String,
    dimensions: Vec<Dimension>,
    subspaces: Vec<GuardedSubspace>,
}

impl SearchSpace {
    /// Creates an empty space with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimensions: Vec::new(),
            subspaces: Vec::new(),
        }
    }

    /// Adds a dimension to this space.
    #[must_use]
    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    /// Attaches a guarded subspace, active when `dimension` takes `choice`.
    ///
    /// The subspace's name becomes the path prefix of its dimensions and
    /// must be unique among this space's subspaces.
    #[must_use]
    pub fn with_subspace(
        mut self,
        dimension: impl Into<String>,
        choice: usize,
        space: SearchSpace,
    ) -> Self {
        self.subspaces.push(GuardedSubspace {
            dimension: dimension.into(),
            choice,
            space,
        });
        self
    }

    /// The space's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The space's own (top-level) dimensions.
    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// All dimension paths across every branch, in declaration order.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths("", &mut out);
        out
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        for dimension in &self.dimensions {
            out.push(join_path(prefix, &dimension.name));
        }
        for subspace in &self.subspaces {
            let nested = join_path(prefix, &subspace.space.name);
            subspace.space.collect_paths(&nested, out);
        }
    }

    /// Total number of dimensions across every branch.
    #[must_use]
    pub fn n_dimensions(&self) -> usize {
        self.dimensions.len()
            + self
                .subspaces
                .iter()
                .map(|s| s.space.n_dimensions())
                .sum::<usize>()
    }

    /// Resolves a dot-joined path to its dimension, if it exists.
    #[must_use]
    pub fn dimension_at(&self, path: &str) -> Option<&Dimension> {
        match path.split_once(PATH_SEPARATOR) {
            None => self.dimensions.iter().find(|d| d.name == path),
            Some((head, rest)) => self
                .subspaces
                .iter()
                .find(|s| s.space.name == head)
                .and_then(|s| s.space.dimension_at(rest)),
        }
    }

    /// Samples one uniformly random valid configuration.
    ///
    /// Only participating dimensions appear: a guarded subspace contributes
    /// values only when its guard choice was drawn.
    #[must_use]
    pub fn sample(&self, rng: &mut fastrand::Rng) -> Config {
        let mut config = Config::new();
        self.sample_into("", rng, &mut config);
        config
    }

    fn sample_into(&self, prefix: &str, rng: &mut fastrand::Rng, config: &mut Config) {
        for dimension in &self.dimensions {
            config.push(join_path(prefix, &dimension.name), dimension.domain.sample(rng));
        }
        for subspace in &self.subspaces {
            let guard_path = join_path(prefix, &subspace.dimension);
            let active = matches!(
                config.get(&guard_path),
                Some(Value::Categorical(i)) if *i == subspace.choice
            );
            if active {
                let nested = join_path(prefix, &subspace.space.name);
                subspace.space.sample_into(&nested, rng, config);
            }
        }
    }

    /// Returns `true` if the configuration is a member of this space.
    ///
    /// Membership requires every participating dimension (as determined by
    /// the configuration's own guard choices) to be present with an
    /// in-domain value, and no extraneous entries.
    #[must_use]
    pub fn contains(&self, config: &Config) -> bool {
        let mut expected = Vec::new();
        if !self.collect_participating("", config, &mut expected) {
            return false;
        }
        if expected.len() != config.len() {
            return false;
        }
        expected.iter().all(|path| {
            config.get(path).zip(self.dimension_at(path)).is_some_and(
                |(value, dimension)| dimension.domain.contains(value),
            )
        })
    }

    /// Returns a structurally identical space with every domain rewritten
    /// through `f`.
    pub(crate) fn map_domains(&self, f: &impl Fn(&Domain) -> Domain) -> SearchSpace {
        SearchSpace {
            name: self.name.clone(),
            dimensions: self
                .dimensions
                .iter()
                .map(|d| Dimension {
                    name: d.name.clone(),
                    domain: f(&d.domain),
                })
                .collect(),
            subspaces: self
                .subspaces
                .iter()
                .map(|s| GuardedSubspace {
                    dimension: s.dimension.clone(),
                    choice: s.choice,
                    space: s.space.map_domains(f),
                })
                .collect(),
        }
    }

    /// Collects the paths a configuration must populate. Returns `false`
    /// when a guard dimension is missing or mistyped.
    fn collect_participating(&self, prefix: &str, config: &Config, out: &mut Vec<String>) -> bool {
        for dimension in &self.dimensions {
            out.push(join_path(prefix, &dimension.name));
        }
        for subspace in &self.subspaces {
            let guard_path = join_path(prefix, &subspace.dimension);
            match config.get(&guard_path) {
                Some(Value::Categorical(i)) => {
                    if *i == subspace.choice {
                        let nested = join_path(prefix, &subspace.space.name);
                        if !subspace.space.collect_participating(&nested, config, out) {
                            return false;
                        }
                    }
                }
                _ => return false,
            }
        }
        true
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{PATH_SEPARATOR}{name}")
    }
}

/// An explicit bijective table between structured dimension paths and flat
/// identifiers.
///
/// Built once per space; construction fails if two paths would flatten to
/// the same identifier, so the mapping is guaranteed invertible.
#[derive(Clone, Debug)]
pub struct FlatIndex {
    entries: Vec<(String, String)>,
    by_path: HashMap<String, usize>,
    by_flat: HashMap<String, usize>,
}

impl FlatIndex {
    /// Builds the flattening table for a space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FlatNameCollision`] if two paths map to the same
    /// flat identifier.
    pub fn new(space: &SearchSpace) -> Result<Self> {
        let mut entries = Vec::new();
        let mut by_path = HashMap::new();
        let mut by_flat = HashMap::new();
        for path in space.paths() {
            let flat = path.replace(PATH_SEPARATOR, FLAT_SEPARATOR);
            if by_flat.contains_key(&flat) {
                return Err(Error::FlatNameCollision(flat));
            }
            by_path.insert(path.clone(), entries.len());
            by_flat.insert(flat.clone(), entries.len());
            entries.push((path, flat));
        }
        Ok(Self {
            entries,
            by_path,
            by_flat,
        })
    }

    /// The flat identifier for a path.
    #[must_use]
    pub fn flatten(&self, path: &str) -> Option<&str> {
        self.by_path.get(path).map(|&i| self.entries[i].1.as_str())
    }

    /// The path for a flat identifier.
    #[must_use]
    pub fn unflatten(&self, flat: &str) -> Option<&str> {
        self.by_flat.get(flat).map(|&i| self.entries[i].0.as_str())
    }

    /// Number of dimensions in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(path, flat)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, f)| (p.as_str(), f.as_str()))
    }
}
