//! Parameter value storage types.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single parameter value within a configuration.
///
/// This enum stores different parameter value types uniformly. For
/// categorical parameters, the `Categorical` variant stores the index into
/// the dimension's choices array.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    /// A floating-point parameter value.
    Float(f64),
    /// An integer parameter value.
    Int(i64),
    /// A categorical parameter value, stored as an index into the choices array.
    Categorical(usize),
}

impl Value {
    /// Returns the numeric encoding of this value.
    ///
    /// Floats pass through, integers are widened, and categoricals map to
    /// their choice index. This is the encoding the regression models
    /// consume.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(&self) -> f64 {
        match self {
            Self::Float(v) => *v,
            Self::Int(v) => *v as f64,
            Self::Categorical(i) => *i as f64,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_encoding() {
        assert!((Value::Float(1.5).to_f64() - 1.5).abs() < f64::EPSILON);
        assert!((Value::Int(-3).to_f64() + 3.0).abs() < f64::EPSILON);
        assert!((Value::Categorical(2).to_f64() - 2.0).abs() < f64::EPSILON);
    }
}
