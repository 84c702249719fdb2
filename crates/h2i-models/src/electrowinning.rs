//! Direct capital cost of an electrowinning plant (Stinn & Allanore, 2020).
//!
//! Costs are in 2018 USD and split into three terms:
//!
//! ```text
//! pre_costs   = α1(T) * P^0.8
//! electrolysis = α2(T) * (p z F / (j A ε M))^0.9
//! rectifier   = α3 * Q * V^0.15 * N^0.5
//! ```
//!
//! where `αk(T) = numerator / (1 + exp(slope * (T - offset)))`.

use h2i_core::{H2iError, H2iResult};
use serde::{Deserialize, Serialize};

pub const FARADAY: f64 = 96_485.332_12;

/// Fitted coefficients of the cost function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StinnCoefficients {
    pub alpha_1_numerator: f64,
    pub alpha_1_slope: f64,
    pub alpha_1_temp_offset: f64,
    pub alpha_2_numerator: f64,
    pub alpha_2_slope: f64,
    pub alpha_2_temp_offset: f64,
    pub alpha_3: f64,
}

impl Default for StinnCoefficients {
    fn default() -> Self {
        Self {
            alpha_1_numerator: 51_010.0,
            alpha_1_slope: -3.823e-3,
            alpha_1_temp_offset: 631.0,
            alpha_2_numerator: 5_634_000.0,
            alpha_2_slope: -7.813e-3,
            alpha_2_temp_offset: 349.0,
            alpha_3: 750_000.0,
        }
    }
}

/// Operating point of the electrowinning cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElectrowinningParams {
    /// Electrolysis temperature, °C.
    pub temperature: f64,
    pub pressure: f64,
    /// Product rate, kg/s.
    pub production_rate: f64,
    /// Moles of electrons per mole of product.
    pub electron_moles: f64,
    #[serde(default = "default_faraday")]
    pub faraday_const: f64,
    /// A/m².
    pub current_density: f64,
    /// m².
    pub electrode_area: f64,
    pub current_efficiency: f64,
    /// Product molar mass, kg/mol.
    pub molar_mass: f64,
    /// Installed power, MW.
    pub installed_capacity: f64,
    /// V.
    pub cell_voltage: f64,
    pub rectifier_lines: f64,
    #[serde(default)]
    pub coefficients: StinnCoefficients,
}

fn default_faraday() -> f64 {
    FARADAY
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ElectrowinningCost {
    pub pre_costs: f64,
    pub electrolysis: f64,
    pub rectifier: f64,
}

impl ElectrowinningCost {
    pub fn electrowinning(&self) -> f64 {
        self.electrolysis + self.rectifier
    }

    pub fn total(&self) -> f64 {
        self.pre_costs + self.electrowinning()
    }
}

fn logistic(numerator: f64, slope: f64, offset: f64, temperature: f64) -> f64 {
    numerator / (1.0 + (slope * (temperature - offset)).exp())
}

impl ElectrowinningParams {
    pub fn cost(&self) -> H2iResult<ElectrowinningCost> {
        let denominator = self.current_density * self.electrode_area * self.current_efficiency * self.molar_mass;
        if denominator <= 0.0 {
            return Err(H2iError::domain(format!(
                "electrowinning: current density, electrode area, efficiency and molar mass \
                 must be positive (product {denominator})"
            )));
        }
        if self.pressure < 0.0 || self.cell_voltage < 0.0 || self.rectifier_lines < 0.0 {
            return Err(H2iError::domain(
                "electrowinning: pressure, cell voltage and rectifier lines must be non-negative",
            ));
        }
        let c = &self.coefficients;
        let alpha_1 = logistic(c.alpha_1_numerator, c.alpha_1_slope, c.alpha_1_temp_offset, self.temperature);
        let alpha_2 = logistic(c.alpha_2_numerator, c.alpha_2_slope, c.alpha_2_temp_offset, self.temperature);

        let handling = (self.production_rate * self.electron_moles * self.faraday_const / denominator).powf(0.9);
        Ok(ElectrowinningCost {
            pre_costs: alpha_1 * self.pressure.powf(0.8),
            electrolysis: alpha_2 * handling,
            rectifier: c.alpha_3
                * self.installed_capacity
                * self.cell_voltage.powf(0.15)
                * self.rectifier_lines.powf(0.5),
        })
    }
}
