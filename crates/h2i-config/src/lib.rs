//! Plant configuration for h2i.
//!
//! A plant file names its technologies, the registry key of each stage
//! implementation, the `model_inputs` block per technology and the
//! interconnections between technologies:
//!
//! ```yaml
//! name: texas_methanol
//! plant:
//!   cost_year: 2020
//!   plant_life: 30
//! technologies:
//!   methanol:
//!     performance_model: { model: smr_methanol_performance }
//!     cost_model: { model: smr_methanol_cost }
//!     financial_model: { model: smr_methanol_financial }
//!     model_inputs:
//!       shared_parameters:
//!         plant_capacity_kgpy: 1.0e8
//! technology_interconnections: []
//! ```

pub mod loader;
pub mod schema;

pub use loader::{load_plant_config, parse_plant_config};
pub use schema::{Interconnection, ModelRef, PlantConfig, PlantSettings, TechnologyConfig};
