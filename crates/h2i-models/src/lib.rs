//! # h2i-models: technology stages and plant assembly
//!
//! Every technology contributes a Performance, a Cost and a Finance stage,
//! registered under `<technology>_<performance|cost|financial>`:
//!
//! | technology        | product   | levelized cost |
//! |-------------------|-----------|----------------|
//! | `methanol`        | methanol  | `LCOM`         |
//! | `smr_methanol`    | methanol  | `LCOM`         |
//! | `natural_geoh2`   | hydrogen  | `LCOH`         |
//! | `combined_geoh2`  | hydrogen  | `LCOH`         |
//! | `ammonia`         | ammonia   | `LCOA`         |
//! | `iron`            | DRI       | `LCOI`         |
//!
//! [`PlantModel`] wires the chains of a [`h2i_config::PlantConfig`] together
//! and runs them upstream first.

pub mod ammonia;
pub mod electrowinning;
pub mod geoh2;
pub mod iron;
pub mod methanol;
pub mod plant;
pub mod registry;
pub mod smr_methanol;
mod tables;

pub use electrowinning::{ElectrowinningCost, ElectrowinningParams};
pub use methanol::ConversionTech;
pub use plant::{PlantModel, PlantResults, PlantTotals};
pub use registry::{build_chain, build_stage, lookup, supported_models, StageContext, Technology};
