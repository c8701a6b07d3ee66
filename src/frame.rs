//! Tabular data exchange types: single configurations and row-major frames.
//!
//! A [`Config`] is one assignment of values to dimension paths. A [`Frame`]
//! is a batch of configurations: one column per dimension path, one row per
//! configuration, with `None` marking cells a row does not populate
//! (hierarchical spaces produce rows with differing participating columns).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::Value;

/// One configuration: ordered `(path, value)` pairs.
///
/// # Example
///
/// ```
/// use autotune::frame::Config;
/// use autotune::Value;
///
/// let config = Config::new()
///     .with("x", Value::Float(0.5))
///     .with("n", Value::Int(3));
/// assert_eq!(config.get("n"), Some(&Value::Int(3)));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    pairs: Vec<(String, Value)>,
}

impl Config {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, builder style.
    #[must_use]
    pub fn with(mut self, path: impl Into<String>, value: Value) -> Self {
        self.push(path, value);
        self
    }

    /// Appends a value.
    pub fn push(&mut self, path: impl Into<String>, value: Value) {
        self.pairs.push((path.into(), value));
    }

    /// Looks up the value at a path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.pairs.iter().find(|(p, _)| p == path).map(|(_, v)| v)
    }

    /// Number of populated dimensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if no dimensions are populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterates `(path, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.pairs.iter().map(|(p, v)| (p.as_str(), v))
    }

    /// Order-insensitive equality on the populated pairs.
    #[must_use]
    pub fn matches(&self, other: &Config) -> bool {
        self.len() == other.len() && self.iter().all(|(path, value)| other.get(path) == Some(value))
    }
}

/// A row-major table: one column per dimension path, one row per
/// configuration, `None` for cells a row does not populate.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Option<Value>>>,
}

impl Frame {
    /// Creates an empty frame with the given columns.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a frame from configurations, taking the union of their paths
    /// as columns. Cells a configuration does not populate become `None`.
    #[must_use]
    pub fn from_configs(configs: &[Config]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for config in configs {
            for (path, _) in config.iter() {
                if !columns.iter().any(|c| c == path) {
                    columns.push(path.to_string());
                }
            }
        }
        let mut frame = Self::new(columns);
        for config in configs {
            let row = frame
                .columns
                .iter()
                .map(|c| config.get(c).cloned())
                .collect();
            frame.rows.push(row);
        }
        frame
    }

    /// The column names, in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the frame holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowLength`] if the cell count does not match the
    /// column count.
    pub fn push_row(&mut self, row: Vec<Option<Value>>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::RowLength {
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// The cell at `(row, column)`; `None` for missing cells or unknown
    /// columns.
    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(col)?.as_ref()
    }

    /// Projects onto the given columns, in the given order. A requested
    /// column absent from the frame yields an all-`None` column.
    #[must_use]
    pub fn select(&self, columns: &[String]) -> Frame {
        let positions: Vec<Option<usize>> = columns
            .iter()
            .map(|c| self.columns.iter().position(|own| own == c))
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                positions
                    .iter()
                    .map(|p| p.and_then(|i| row[i].clone()))
                    .collect()
            })
            .collect();
        Frame {
            columns: columns.to_vec(),
            rows,
        }
    }

    /// Returns a frame holding the rows at `indices`, in order. Indices may
    /// repeat (bootstrap resampling).
    ///
    /// # Panics
    ///
    /// Panics if any index is out of range.
    #[must_use]
    pub fn take(&self, indices: &[usize]) -> Frame {
        Frame {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Appends all rows of `other`, taking the union of columns. Cells
    /// absent on either side become `None`.
    pub fn vstack(&mut self, other: &Frame) {
        for column in &other.columns {
            if !self.columns.iter().any(|c| c == column) {
                self.columns.push(column.clone());
                for row in &mut self.rows {
                    row.push(None);
                }
            }
        }
        for other_row in &other.rows {
            let row = self
                .columns
                .iter()
                .map(|c| {
                    other
                        .columns
                        .iter()
                        .position(|oc| oc == c)
                        .and_then(|i| other_row[i].clone())
                })
                .collect();
            self.rows.push(row);
        }
    }

    /// Appends a fully-populated column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowLength`] if the value count does not match the
    /// row count.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Value>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(Error::RowLength {
                expected: self.rows.len(),
                got: values.len(),
            });
        }
        self.columns.push(name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(Some(value));
        }
        Ok(())
    }

    /// Renames columns through a lookup, dropping columns the lookup does
    /// not cover.
    #[must_use]
    pub(crate) fn rename_columns<'a>(
        &self,
        lookup: impl Fn(&str) -> Option<&'a str>,
    ) -> Frame {
        let kept: Vec<(usize, String)> = self
            .columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| lookup(c).map(|renamed| (i, renamed.to_string())))
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| kept.iter().map(|(i, _)| row[*i].clone()).collect())
            .collect();
        Frame {
            columns: kept.into_iter().map(|(_, name)| name).collect(),
            rows,
        }
    }

    /// Converts one row back into a configuration, skipping `None` cells.
    #[must_use]
    pub fn row_config(&self, row: usize) -> Config {
        let mut config = Config::new();
        if let Some(cells) = self.rows.get(row) {
            for (column, cell) in self.columns.iter().zip(cells) {
                if let Some(value) = cell {
                    config.push(column.clone(), value.clone());
                }
            }
        }
        config
    }

    /// Converts every row into a configuration.
    #[must_use]
    pub fn to_configs(&self) -> Vec<Config> {
        (0..self.n_rows()).map(|i| self.row_config(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, f64)]) -> Config {
        let mut c = Config::new();
        for (path, v) in pairs {
            c.push(*path, Value::Float(*v));
        }
        c
    }

    #[test]
    fn from_configs_unions_columns() {
        let frame = Frame::from_configs(&[
            config(&[("a", 1.0), ("b", 2.0)]),
            config(&[("a", 3.0), ("c", 4.0)]),
        ]);
        assert_eq!(frame.columns(), ["a", "b", "c"]);
        assert_eq!(frame.get(0, "c"), None);
        assert_eq!(frame.get(1, "b"), None);
        assert_eq!(frame.get(1, "c"), Some(&Value::Float(4.0)));
    }

    #[test]
    fn select_fills_missing_columns_with_none() {
        let frame = Frame::from_configs(&[config(&[("a", 1.0)])]);
        let projected = frame.select(&["a".to_string(), "z".to_string()]);
        assert_eq!(projected.columns(), ["a", "z"]);
        assert_eq!(projected.get(0, "a"), Some(&Value::Float(1.0)));
        assert_eq!(projected.get(0, "z"), None);
    }

    #[test]
    fn vstack_aligns_by_column_name() {
        let mut frame = Frame::from_configs(&[config(&[("a", 1.0), ("b", 2.0)])]);
        let other = Frame::from_configs(&[config(&[("b", 5.0), ("c", 6.0)])]);
        frame.vstack(&other);
        assert_eq!(frame.n_rows(), 2);
        assert_eq!(frame.get(1, "a"), None);
        assert_eq!(frame.get(1, "b"), Some(&Value::Float(5.0)));
        assert_eq!(frame.get(1, "c"), Some(&Value::Float(6.0)));
        assert_eq!(frame.get(0, "c"), None);
    }

    #[test]
    fn take_repeats_rows() {
        let frame = Frame::from_configs(&[config(&[("a", 1.0)]), config(&[("a", 2.0)])]);
        let taken = frame.take(&[1, 1, 0]);
        assert_eq!(taken.n_rows(), 3);
        assert_eq!(taken.get(0, "a"), Some(&Value::Float(2.0)));
        assert_eq!(taken.get(2, "a"), Some(&Value::Float(1.0)));
    }

    #[test]
    fn push_row_checks_length() {
        let mut frame = Frame::new(vec!["a".to_string(), "b".to_string()]);
        assert!(matches!(
            frame.push_row(vec![Some(Value::Float(1.0))]),
            Err(Error::RowLength { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn row_config_round_trip() {
        let original = config(&[("a", 1.0), ("b", 2.0)]);
        let frame = Frame::from_configs(std::slice::from_ref(&original));
        assert!(frame.row_config(0).matches(&original));
    }

    #[test]
    fn config_matches_is_order_insensitive() {
        let a = config(&[("x", 1.0), ("y", 2.0)]);
        let b = config(&[("y", 2.0), ("x", 1.0)]);
        assert!(a.matches(&b));
        assert!(!a.matches(&config(&[("x", 1.0)])));
    }
}
