//! Runtime values carried by declared variables.

use crate::error::{H2iError, H2iResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A variable value: a single number or a fixed-length series (typically
/// one entry per hour of the year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(f64),
    Series(Vec<f64>),
}

impl Value {
    /// Zero default for a slot of `len` entries: scalar 0.0 when `len == 1`,
    /// otherwise a zero vector of exactly `len`.
    pub fn zeros(len: usize) -> Self {
        if len == 1 {
            Value::Scalar(0.0)
        } else {
            Value::Series(vec![0.0; len])
        }
    }

    /// Series of `len` copies of `value`.
    pub fn broadcast(value: f64, len: usize) -> Self {
        Value::Series(vec![value; len])
    }

    pub fn len(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::Series(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Series(values) if values.is_empty())
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Scalar(_))
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Series(_) => None,
        }
    }

    pub fn as_series(&self) -> Option<&[f64]> {
        match self {
            Value::Scalar(_) => None,
            Value::Series(values) => Some(values),
        }
    }

    /// Sum over all entries; a scalar sums to itself.
    pub fn sum(&self) -> f64 {
        match self {
            Value::Scalar(v) => *v,
            Value::Series(values) => values.iter().sum(),
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Value::Scalar(v) => v.is_finite(),
            Value::Series(values) => values.iter().all(|v| v.is_finite()),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Value::Series(values)
    }
}

/// Name → value mapping used to override zero defaults at declaration time.
///
/// Need not cover every declared variable; names that match no declaration
/// are ignored by the declarator.
pub type Overrides = BTreeMap<String, Value>;

/// Overlay `extra` on top of `base` without touching either input.
pub fn merge_overrides(base: &Overrides, extra: Option<&Overrides>) -> Overrides {
    let mut merged = base.clone();
    if let Some(extra) = extra {
        for (name, value) in extra {
            merged.insert(name.clone(), value.clone());
        }
    }
    merged
}

/// Named values passed into and returned from a stage's compute step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values {
    inner: BTreeMap<String, Value>,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.inner.insert(name.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.inner.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Value under `name`, or a configuration error naming the key.
    pub fn require(&self, name: &str) -> H2iResult<&Value> {
        self.inner
            .get(name)
            .ok_or_else(|| H2iError::config(format!("missing value '{name}'")))
    }

    /// Scalar under `name`.
    pub fn scalar(&self, name: &str) -> H2iResult<f64> {
        self.require(name)?
            .as_scalar()
            .ok_or_else(|| H2iError::config(format!("value '{name}' is a series, expected a scalar")))
    }

    /// Series under `name`.
    pub fn series(&self, name: &str) -> H2iResult<&[f64]> {
        self.require(name)?
            .as_series()
            .ok_or_else(|| H2iError::config(format!("value '{name}' is a scalar, expected a series")))
    }

    /// Sum over the entries under `name` (scalars sum to themselves).
    pub fn total(&self, name: &str) -> H2iResult<f64> {
        Ok(self.require(name)?.sum())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.inner.remove(name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn extend(&mut self, other: Values) {
        self.inner.extend(other.inner);
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.inner
    }
}

impl FromIterator<(String, Value)> for Values {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_follow_length() {
        assert_eq!(Value::zeros(1), Value::Scalar(0.0));
        match Value::zeros(8760) {
            Value::Series(v) => {
                assert_eq!(v.len(), 8760);
                assert!(v.iter().all(|x| *x == 0.0));
            }
            other => panic!("expected series, got {other:?}"),
        }
    }

    #[test]
    fn merge_overrides_is_pure() {
        let mut base = Overrides::new();
        base.insert("a".into(), Value::Scalar(1.0));
        base.insert("b".into(), Value::Scalar(2.0));
        let mut extra = Overrides::new();
        extra.insert("b".into(), Value::Scalar(3.0));

        let merged = merge_overrides(&base, Some(&extra));
        assert_eq!(merged["a"], Value::Scalar(1.0));
        assert_eq!(merged["b"], Value::Scalar(3.0));
        assert_eq!(base["b"], Value::Scalar(2.0));
        assert_eq!(extra.len(), 1);
    }

    #[test]
    fn values_accessors() {
        let values = Values::new()
            .with("capacity", 10.0)
            .with("flow", vec![1.0, 2.0, 3.0]);
        assert_eq!(values.scalar("capacity").unwrap(), 10.0);
        assert_eq!(values.series("flow").unwrap().len(), 3);
        assert!((values.total("flow").unwrap() - 6.0).abs() < 1e-12);
        assert!(matches!(
            values.scalar("flow"),
            Err(H2iError::Configuration(_))
        ));
        let err = values.scalar("missing").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn untagged_serde_round_trip() {
        let scalar: Value = serde_json::from_str("2.5").unwrap();
        assert_eq!(scalar, Value::Scalar(2.5));
        let series: Value = serde_json::from_str("[1.0, 2.0]").unwrap();
        assert_eq!(series, Value::Series(vec![1.0, 2.0]));
    }
}
