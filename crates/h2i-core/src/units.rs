//! Unit tags and conversions for plant model variables.
//!
//! Every declared variable carries an optional physical-unit string such as
//! `"kg/h"`, `"USD/year"` or `"kW*h/kg"`. The strings are passed through the
//! stage chain unchanged; this module only knows enough about them to
//! convert between a handful of mass and energy units used by the cost
//! formulas (e.g. natural gas LHV from MJ/kg to MMBtu/kg).
//!
//! # Monetary newtypes
//!
//! Annualized and one-off money amounts are easy to mix up when building a
//! levelized cost. [`Usd`] and [`UsdPerYear`] keep the two apart:
//!
//! ```
//! use h2i_core::units::{Usd, UsdPerYear};
//!
//! let capex = Usd(1.0e6);
//! let annualized: UsdPerYear = capex.annualize(0.07);
//! assert!((annualized.value() - 70_000.0).abs() < 1e-9);
//!
//! // This would NOT compile - different units
//! // let wrong = capex + annualized;
//! ```

use crate::error::{H2iError, H2iResult};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Macro to implement common arithmetic operations for unit types
macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.2} {}", self.0, $unit_name)
            }
        }

        impl $type {
            /// Unit tag used when declaring variables of this quantity
            pub const UNIT: &'static str = $unit_name;

            /// Get the raw numeric value
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Check if value is finite
            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

/// One-off money amount in US dollars (CapEx, total plant cost)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Usd(pub f64);

impl_unit_ops!(Usd, "USD");

/// Recurring money amount in US dollars per year (OpEx, annual feedstock cost)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct UsdPerYear(pub f64);

impl_unit_ops!(UsdPerYear, "USD/year");

impl Usd {
    /// Annual charge on a capital amount at the given fixed charge rate
    #[inline]
    pub fn annualize(self, fixed_charge_rate: f64) -> UsdPerYear {
        UsdPerYear(self.0 * fixed_charge_rate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Mass,
    Energy,
    Time,
    Length,
    Dimensionless,
}

/// Scale factors to SI base (kg, J, s, m).
static UNIT_FACTORS: Lazy<HashMap<&'static str, (Dimension, f64)>> = Lazy::new(|| {
    let btu = 1055.055_852_62;
    HashMap::from([
        ("kg", (Dimension::Mass, 1.0)),
        ("g", (Dimension::Mass, 1.0e-3)),
        ("t", (Dimension::Mass, 1.0e3)),
        ("tonne", (Dimension::Mass, 1.0e3)),
        ("lbm", (Dimension::Mass, 0.453_592_37)),
        ("J", (Dimension::Energy, 1.0)),
        ("kJ", (Dimension::Energy, 1.0e3)),
        ("MJ", (Dimension::Energy, 1.0e6)),
        ("GJ", (Dimension::Energy, 1.0e9)),
        ("kW*h", (Dimension::Energy, 3.6e6)),
        ("MW*h", (Dimension::Energy, 3.6e9)),
        ("Btu", (Dimension::Energy, btu)),
        ("MBtu", (Dimension::Energy, btu * 1.0e6)),
        ("MMBtu", (Dimension::Energy, btu * 1.0e6)),
        ("s", (Dimension::Time, 1.0)),
        ("h", (Dimension::Time, 3600.0)),
        ("m", (Dimension::Length, 1.0)),
        ("km", (Dimension::Length, 1.0e3)),
        ("ft", (Dimension::Length, 0.3048)),
        ("1", (Dimension::Dimensionless, 1.0)),
    ])
});

fn simple_factor(unit: &str) -> H2iResult<(Dimension, f64)> {
    UNIT_FACTORS
        .get(unit.trim())
        .copied()
        .ok_or_else(|| H2iError::config(format!("unknown unit '{unit}'")))
}

/// Resolve a unit of the form `a` or `a/b` to its dimension pair and SI factor.
fn resolve(unit: &str) -> H2iResult<((Dimension, Dimension), f64)> {
    match unit.split_once('/') {
        Some((num, den)) => {
            let (num_dim, num_factor) = simple_factor(num)?;
            let (den_dim, den_factor) = simple_factor(den)?;
            Ok(((num_dim, den_dim), num_factor / den_factor))
        }
        None => {
            let (dim, factor) = simple_factor(unit)?;
            Ok(((dim, Dimension::Dimensionless), factor))
        }
    }
}

/// Convert `value` expressed in `from` into `to`.
///
/// Supports simple units and single ratios (`"MJ/kg"` → `"MMBtu/kg"`).
/// Incompatible dimensions or unknown units are configuration errors.
pub fn convert(value: f64, from: &str, to: &str) -> H2iResult<f64> {
    if from == to {
        return Ok(value);
    }
    let (from_dims, from_factor) = resolve(from)?;
    let (to_dims, to_factor) = resolve(to)?;
    if from_dims != to_dims {
        return Err(H2iError::config(format!(
            "cannot convert '{from}' to '{to}': incompatible dimensions"
        )));
    }
    Ok(value * from_factor / to_factor)
}

/// Two unit tags are compatible for forwarding when either side is untagged
/// or both carry the identical tag.
pub fn tags_compatible(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_arithmetic_stays_in_kind() {
        let a = Usd(100.0) + Usd(50.0);
        assert_eq!(a.value(), 150.0);
        let total: UsdPerYear = [UsdPerYear(1.0), UsdPerYear(2.5)].into_iter().sum();
        assert_eq!(total.value(), 3.5);
        assert_eq!(Usd::UNIT, "USD");
        assert_eq!(UsdPerYear::UNIT, "USD/year");
    }

    #[test]
    fn megajoule_to_mmbtu() {
        let mmbtu = convert(1055.055_852_62, "MJ", "MMBtu").unwrap();
        assert!((mmbtu - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ratio_units_convert() {
        // 50 MJ/kg natural gas LHV
        let per_kg = convert(50.0, "MJ/kg", "MBtu/kg").unwrap();
        assert!((per_kg - 50.0 / 1055.055_852_62).abs() < 1e-12);

        let kwh_per_t = convert(1.0, "kW*h/kg", "kW*h/t").unwrap();
        assert!((kwh_per_t - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn incompatible_units_are_rejected() {
        assert!(matches!(
            convert(1.0, "kg", "MJ"),
            Err(H2iError::Configuration(_))
        ));
        assert!(matches!(
            convert(1.0, "furlong", "m"),
            Err(H2iError::Configuration(_))
        ));
    }

    #[test]
    fn tag_compatibility() {
        assert!(tags_compatible(Some("kg/h"), Some("kg/h")));
        assert!(tags_compatible(None, Some("kg/h")));
        assert!(!tags_compatible(Some("kg/h"), Some("t/h")));
    }
}
