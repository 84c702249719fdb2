//! Declarative variable tables.
//!
//! Each stage describes its interface as a static table of [`VariableSpec`]
//! rows. A [`VariableSet`] is built from one or two such tables plus value
//! overrides; every row becomes a named input or output slot initialised to
//! its override or to zero.
//!
//! ```
//! use h2i_core::variable::{VariableSet, VariableSpec, HOURS_PER_YEAR};
//! use h2i_core::value::{Overrides, Value};
//!
//! const TABLE: &[VariableSpec] = &[
//!     VariableSpec::input("capacity_factor", 1, None),
//!     VariableSpec::output("methanol", HOURS_PER_YEAR, Some("kg/h")),
//! ];
//!
//! let mut overrides = Overrides::new();
//! overrides.insert("capacity_factor".into(), Value::Scalar(0.85));
//!
//! let mut set = VariableSet::new("methanol_performance");
//! set.declare_from_table(TABLE, None, &overrides, None).unwrap();
//! assert_eq!(set.value("capacity_factor"), Some(&Value::Scalar(0.85)));
//! assert_eq!(set.value("methanol").unwrap().len(), HOURS_PER_YEAR);
//! ```

use crate::error::{H2iError, H2iResult};
use crate::value::{merge_overrides, Overrides, Value, Values};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Hourly horizon of one simulated year.
pub const HOURS_PER_YEAR: usize = 8760;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

/// How the slot's shape is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapePolicy {
    /// Shape is exactly the declared length.
    Fixed,
    /// Shape is inferred from whatever is connected to the slot.
    Connection,
}

/// One row of a variable table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VariableSpec {
    pub direction: Direction,
    pub len: usize,
    pub shape: ShapePolicy,
    pub unit: Option<&'static str>,
    pub name: &'static str,
}

impl VariableSpec {
    pub const fn input(name: &'static str, len: usize, unit: Option<&'static str>) -> Self {
        Self {
            direction: Direction::In,
            len,
            shape: ShapePolicy::Fixed,
            unit,
            name,
        }
    }

    pub const fn output(name: &'static str, len: usize, unit: Option<&'static str>) -> Self {
        Self {
            direction: Direction::Out,
            len,
            shape: ShapePolicy::Fixed,
            unit,
            name,
        }
    }

    /// Mark the slot as taking its shape from the connection.
    pub const fn connected(mut self) -> Self {
        self.shape = ShapePolicy::Connection;
        self
    }

    pub fn is_input(&self) -> bool {
        self.direction == Direction::In
    }

    pub fn is_output(&self) -> bool {
        self.direction == Direction::Out
    }

    /// Zero default for this row.
    pub fn default_value(&self) -> Value {
        Value::zeros(self.len)
    }

    /// Check `value` against the declared shape.
    pub fn check_shape(&self, value: &Value) -> H2iResult<()> {
        match (self.shape, value) {
            (ShapePolicy::Connection, _) => Ok(()),
            (ShapePolicy::Fixed, Value::Scalar(_)) if self.len == 1 => Ok(()),
            (ShapePolicy::Fixed, Value::Series(values)) if self.len > 1 && values.len() == self.len => {
                Ok(())
            }
            (ShapePolicy::Fixed, value) => Err(H2iError::config(format!(
                "variable '{}' declared with length {} but given a value of length {}{}",
                self.name,
                self.len,
                value.len(),
                if value.is_scalar() { " (scalar)" } else { "" },
            ))),
        }
    }
}

/// A declared slot and its current value.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub spec: VariableSpec,
    pub value: Value,
}

/// Ordered set of declared variables owned by one stage.
///
/// Names are unique: a second declaration of a name is rejected.
#[derive(Debug, Clone, Default)]
pub struct VariableSet {
    owner: String,
    variables: Vec<Variable>,
    index: HashMap<&'static str, usize>,
}

impl VariableSet {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            ..Self::default()
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Register one slot, initialised to `value` or to the zero default.
    pub fn declare(&mut self, spec: VariableSpec, value: Option<Value>) -> H2iResult<()> {
        if spec.len == 0 {
            return Err(H2iError::config(format!(
                "{}: variable '{}' declared with zero length",
                self.owner, spec.name
            )));
        }
        if self.index.contains_key(spec.name) {
            return Err(H2iError::config(format!(
                "{}: variable '{}' declared more than once",
                self.owner, spec.name
            )));
        }
        let value = match value {
            Some(value) => {
                spec.check_shape(&value)
                    .map_err(|err| H2iError::config(format!("{}: {}", self.owner, inner_message(err))))?;
                value
            }
            None => spec.default_value(),
        };
        self.index.insert(spec.name, self.variables.len());
        self.variables.push(Variable { spec, value });
        Ok(())
    }

    /// Register every row of `base` followed by every row of `extra`.
    ///
    /// `extra_overrides` is laid over `overrides`; neither mapping is modified.
    pub fn declare_from_table(
        &mut self,
        base: &[VariableSpec],
        extra: Option<&[VariableSpec]>,
        overrides: &Overrides,
        extra_overrides: Option<&Overrides>,
    ) -> H2iResult<()> {
        let merged = merge_overrides(overrides, extra_overrides);
        for spec in base.iter().chain(extra.unwrap_or_default()) {
            self.declare(*spec, merged.get(spec.name).cloned())?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.index.get(name).map(|&idx| &self.variables[idx])
    }

    pub fn spec(&self, name: &str) -> Option<&VariableSpec> {
        self.get(name).map(|var| &var.spec)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).map(|var| &var.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Replace the value of a declared slot, enforcing its shape.
    pub fn set_value(&mut self, name: &str, value: Value) -> H2iResult<()> {
        let idx = *self.index.get(name).ok_or_else(|| {
            H2iError::config(format!("{}: variable '{name}' is not declared", self.owner))
        })?;
        let var = &mut self.variables[idx];
        var.spec
            .check_shape(&value)
            .map_err(|err| H2iError::config(format!("{}: {}", self.owner, inner_message(err))))?;
        var.value = value;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|var| var.spec.is_input())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|var| var.spec.is_output())
    }

    /// Current input values keyed by name.
    pub fn input_values(&self) -> Values {
        self.inputs()
            .map(|var| (var.spec.name.to_string(), var.value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

fn inner_message(err: H2iError) -> String {
    match err {
        H2iError::Configuration(msg) => msg,
        other => other.to_string(),
    }
}
