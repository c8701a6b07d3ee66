#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a space adapter's original space differs from the
    /// optimizer's parameter space.
    #[error("space adapter original space '{adapter}' does not match optimizer space '{optimizer}'")]
    SpaceMismatch {
        /// Name of the adapter's original space.
        adapter: String,
        /// Name of the optimizer's parameter space.
        optimizer: String,
    },

    /// Returned when an ensemble's output space does not reduce to exactly
    /// one target dimension.
    #[error("output space must reduce to exactly one target dimension, got {0}")]
    NonScalarTarget(usize),

    /// Returned when observations are requested before any were registered.
    #[error("no observations registered yet")]
    NoObservations,

    /// Returned when a configuration batch and its scores disagree on row count.
    #[error("shape mismatch: {rows} configuration rows but {scores} scores")]
    ShapeMismatch {
        /// Number of configuration rows.
        rows: usize,
        /// Number of scores.
        scores: usize,
    },

    /// Returned when a non-empty context is supplied. Context is reserved
    /// in the interface but has no semantics yet.
    #[error("context is not yet supported")]
    ContextNotSupported,

    /// Returned when a per-estimator fraction falls outside `(0.0, 1.0]`.
    #[error("invalid {name}: {value} must be in (0.0, 1.0]")]
    InvalidFraction {
        /// The name of the offending option.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Returned when an ensemble is configured with zero estimators.
    #[error("ensemble must have at least one estimator")]
    NoEstimators,

    /// Returned when two dimension paths flatten to the same identifier.
    #[error("flattened dimension name collision: '{0}'")]
    FlatNameCollision(String),

    /// Returned when a configuration references a dimension the space
    /// does not declare.
    #[error("unknown dimension '{0}'")]
    UnknownDimension(String),

    /// Returned when a row's cell count does not match the frame's columns.
    #[error("row length {got} does not match column count {expected}")]
    RowLength {
        /// The frame's column count.
        expected: usize,
        /// The supplied row's cell count.
        got: usize,
    },

    /// Returned when an internal invariant is violated.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;
