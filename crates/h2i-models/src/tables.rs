//! Declaration helpers shared by the technology stages.

use h2i_core::value::{Overrides, Value};
use h2i_core::variable::{VariableSet, VariableSpec, HOURS_PER_YEAR};
use h2i_core::H2iResult;

/// Built-in defaults of a table, laid under the configured values.
pub(crate) type Defaults = &'static [(&'static str, f64)];

pub(crate) const NO_DEFAULTS: Defaults = &[];

pub(crate) fn default_overrides(defaults: Defaults) -> Overrides {
    defaults
        .iter()
        .map(|(name, value)| (name.to_string(), Value::Scalar(*value)))
        .collect()
}

/// Declare `base` then `extra`; configured values win over built-in defaults.
pub(crate) fn declare(
    id: &str,
    base: &'static [VariableSpec],
    extra: Option<&'static [VariableSpec]>,
    defaults: Defaults,
    configured: &Overrides,
) -> H2iResult<VariableSet> {
    let mut set = VariableSet::new(id);
    set.declare_from_table(base, extra, &default_overrides(defaults), Some(configured))?;
    Ok(set)
}

/// Constant hourly profile over one year.
pub(crate) fn hourly(rate: f64) -> Vec<f64> {
    vec![rate; HOURS_PER_YEAR]
}

pub(crate) fn scaled(series: &[f64], factor: f64) -> Vec<f64> {
    series.iter().map(|v| v * factor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[VariableSpec] = &[
        VariableSpec::input("capacity_factor", 1, None),
        VariableSpec::input("price", 1, Some("USD/kg")),
    ];

    #[test]
    fn configured_values_win_over_defaults() {
        let mut configured = Overrides::new();
        configured.insert("capacity_factor".into(), Value::Scalar(0.5));
        let set = declare("t", TABLE, None, &[("capacity_factor", 0.9), ("price", 2.0)], &configured).unwrap();
        assert_eq!(set.value("capacity_factor"), Some(&Value::Scalar(0.5)));
        assert_eq!(set.value("price"), Some(&Value::Scalar(2.0)));
    }

    #[test]
    fn hourly_profile() {
        let profile = hourly(2.0);
        assert_eq!(profile.len(), HOURS_PER_YEAR);
        assert_eq!(scaled(&profile, 0.5)[10], 1.0);
    }
}
