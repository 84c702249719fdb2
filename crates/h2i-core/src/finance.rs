//! Levelized cost math.
//!
//! A levelized cost is built from annual cost streams divided by annual
//! output:
//!
//! ```text
//! LCOx = (CapEx * FCR * TASC + Fixed_OpEx) / annual_output + Variable_OpEx / annual_output
//! ```
//!
//! [`LevelizedCost`] keeps every contribution as a named share so the total
//! is by construction the sum of its parts. By-product revenue enters as a
//! credit, i.e. a negative share.

use crate::error::{H2iError, H2iResult};
use crate::value::Values;
use serde::Serialize;

/// Annual total of an hourly series; must be positive and finite.
pub fn annual_total(series: &[f64], label: &str) -> H2iResult<f64> {
    positive_output(series.iter().sum(), label)
}

/// Check a summed annual output before it is used as a divisor.
pub fn positive_output(total: f64, label: &str) -> H2iResult<f64> {
    if !total.is_finite() || total <= 0.0 {
        return Err(H2iError::domain(format!(
            "annual {label} production must be positive to levelize costs, got {total}"
        )));
    }
    Ok(total)
}

/// Capital recovery factor for `years` equal payments at `rate`.
///
/// CRF = r(1+r)^n / ((1+r)^n - 1); falls back to 1/n at zero rate.
pub fn capital_recovery_factor(rate: f64, years: u32) -> H2iResult<f64> {
    if years == 0 {
        return Err(H2iError::domain("capital recovery period must be at least one year"));
    }
    if rate.abs() < 1e-12 {
        return Ok(1.0 / years as f64);
    }
    let growth = (1.0 + rate).powi(years as i32);
    Ok(rate * growth / (growth - 1.0))
}

/// Default effective tax rate for NETL fixed charge rates.
pub const NETL_EFFECTIVE_TAX_RATE: f64 = 0.2574;

/// Default after-tax weighted average cost of capital (NETL Exhibit 3-2).
pub const NETL_ATWACC: f64 = 0.0473;

/// Fixed charge rate per NETL-PUB-22580 with straight-line depreciation.
///
/// ```text
/// dep = CRF * Σ_{n=1..L} (1/L) / (1+atwacc)^n
/// FCR = CRF/(1-etr) - etr*dep/(1-etr)
/// ```
pub fn netl_fixed_charge_rate(lifetime: u32, effective_tax_rate: f64, atwacc: f64) -> H2iResult<f64> {
    if lifetime == 0 {
        return Err(H2iError::domain("lifetime must be at least one year"));
    }
    if !(0.0..1.0).contains(&effective_tax_rate) {
        return Err(H2iError::domain(format!(
            "effective tax rate must be in [0, 1), got {effective_tax_rate}"
        )));
    }
    let crf = capital_recovery_factor(atwacc, lifetime)?;
    let dep_n = 1.0 / lifetime as f64;
    let discounted: f64 = (1..=lifetime)
        .map(|n| dep_n / (1.0 + atwacc).powi(n as i32))
        .sum();
    let dep = crf * discounted;
    Ok(crf / (1.0 - effective_tax_rate) - effective_tax_rate * dep / (1.0 - effective_tax_rate))
}

/// Builder for a levelized cost and its named shares.
///
/// # Example
///
/// ```
/// use h2i_core::finance::LevelizedCost;
///
/// let lcom = LevelizedCost::new("LCOM", 1.0e6).unwrap()
///     .capital("LCOM_capex", 2.0e6, 0.07, 1.0)
///     .annual("LCOM_fopex", 5.0e4)
///     .annual("LCOM_vopex", 1.0e5)
///     .credit("LCOM_elec", 2.0e4)
///     .finish();
///
/// assert!((lcom.total - 0.27).abs() < 1e-12);
/// assert!(lcom.closes(1e-12));
/// ```
#[derive(Debug, Clone)]
pub struct LevelizedCost {
    name: String,
    annual_output: f64,
    shares: Vec<(String, f64)>,
}

impl LevelizedCost {
    /// Start a levelized cost over `annual_output` units per year.
    pub fn new(name: impl Into<String>, annual_output: f64) -> H2iResult<Self> {
        let name = name.into();
        let annual_output = positive_output(annual_output, &name)?;
        Ok(Self {
            name,
            annual_output,
            shares: Vec::new(),
        })
    }

    /// Capital share, `capex * fixed_charge_rate * tasc_multiplier / output`.
    pub fn capital(self, share: &str, capex: f64, fixed_charge_rate: f64, tasc_multiplier: f64) -> Self {
        self.annual(share, capex * fixed_charge_rate * tasc_multiplier)
    }

    /// Share of an annual cost stream, `annual_cost / output`.
    pub fn annual(mut self, share: &str, annual_cost: f64) -> Self {
        let per_unit = annual_cost / self.annual_output;
        self.shares.push((share.to_string(), per_unit));
        self
    }

    /// Share already expressed per unit of output.
    pub fn per_unit(mut self, share: &str, cost_per_unit: f64) -> Self {
        self.shares.push((share.to_string(), cost_per_unit));
        self
    }

    /// By-product revenue, entered as a negative share.
    pub fn credit(self, share: &str, annual_revenue: f64) -> Self {
        self.annual(share, -annual_revenue)
    }

    pub fn annual_output(&self) -> f64 {
        self.annual_output
    }

    pub fn finish(self) -> CostBreakdown {
        let total = self.shares.iter().map(|(_, v)| v).sum();
        CostBreakdown {
            name: self.name,
            total,
            shares: self.shares,
        }
    }
}

/// A levelized cost with its named shares.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub name: String,
    pub total: f64,
    pub shares: Vec<(String, f64)>,
}

impl CostBreakdown {
    pub fn share(&self, name: &str) -> H2iResult<f64> {
        self.shares
            .iter()
            .find(|(share, _)| share == name)
            .map(|(_, v)| *v)
            .ok_or_else(|| H2iError::lookup(format!("{} has no share named '{name}'", self.name)))
    }

    /// Sum of a subset of shares.
    pub fn subtotal(&self, names: &[&str]) -> H2iResult<f64> {
        names.iter().map(|name| self.share(name)).sum()
    }

    /// True when the shares add back up to the total within `tol`.
    pub fn closes(&self, tol: f64) -> bool {
        let sum: f64 = self.shares.iter().map(|(_, v)| v).sum();
        (sum - self.total).abs() <= tol * self.total.abs().max(1.0)
    }

    /// Total under its own name plus one entry per share.
    pub fn to_values(&self) -> Values {
        let mut values = Values::new().with(self.name.clone(), self.total);
        for (name, v) in &self.shares {
            values.insert(name.clone(), *v);
        }
        values
    }
}
