//! # h2i-core: techno-economic plant modeling core
//!
//! Building blocks shared by every technology model:
//!
//! - [`variable`] / [`value`]: declarative input/output tables with zero or
//!   overridden defaults
//! - [`config`]: pure, layered merging of `model_inputs` blocks
//! - [`stage`] / [`chain`]: the Performance → Cost → Finance pipeline with
//!   promoted, unit-tagged variables
//! - [`inflation`], [`cost`], [`finance`]: price indices, scaling-law CapEx
//!   and levelized cost decomposition
//! - [`topology`]: technology interconnection graph and evaluation order
//!
//! All fallible operations return [`H2iResult`].

pub mod chain;
pub mod config;
pub mod cost;
pub mod diagnostics;
pub mod error;
pub mod finance;
pub mod inflation;
pub mod stage;
pub mod topology;
pub mod units;
pub mod value;
pub mod variable;

pub use chain::{ChainOutputs, Signal, SignalPool, StageChain, StageRecord};
pub use config::{merge_layers, merge_shared_inputs, ConfigMap, ModelInputs};
pub use cost::{CoefficientRecord, CoefficientTable, OpexSplit};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{H2iError, H2iResult};
pub use finance::{CostBreakdown, LevelizedCost};
pub use inflation::{inflate, PriceIndex};
pub use stage::{Stage, StageKind, TemplateStage};
pub use topology::{Connection, PlantGraph};
pub use units::{Usd, UsdPerYear};
pub use value::{Overrides, Value, Values};
pub use variable::{Direction, ShapePolicy, VariableSet, VariableSpec, HOURS_PER_YEAR};
