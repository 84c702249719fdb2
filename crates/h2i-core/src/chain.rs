//! Performance → Cost → Finance chaining with promoted variables.
//!
//! Each stage's declared outputs are promoted into a pool. A later stage
//! input with the same name takes its value from the pool, so Cost sees the
//! production series computed by Performance and Finance sees the CapEx and
//! OpEx computed by Cost. Unit tags travel with the promoted values.

use crate::error::{H2iError, H2iResult};
use crate::stage::{Stage, StageKind};
use crate::units::tags_compatible;
use crate::value::{Value, Values};
use crate::variable::VariableSet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// A promoted value with the unit tag of the slot that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Signal {
    pub fn new(value: impl Into<Value>, unit: Option<&str>) -> Self {
        Self {
            value: value.into(),
            unit: unit.map(str::to_string),
        }
    }
}

/// Promoted variables keyed by name.
pub type SignalPool = BTreeMap<String, Signal>;

/// Outputs of one evaluated stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub id: String,
    pub kind: StageKind,
    pub outputs: Values,
}

/// Result of running one technology's chain.
#[derive(Debug, Clone, Serialize)]
pub struct ChainOutputs {
    pub technology: String,
    pub stages: Vec<StageRecord>,
    /// Every output promoted by the chain, with its unit tag.
    pub promoted: SignalPool,
}

impl ChainOutputs {
    pub fn get(&self, name: &str) -> Option<&Signal> {
        self.promoted.get(name)
    }

    pub fn scalar(&self, name: &str) -> H2iResult<f64> {
        self.get(name)
            .and_then(|signal| signal.value.as_scalar())
            .ok_or_else(|| {
                H2iError::config(format!(
                    "{}: no scalar output named '{name}'",
                    self.technology
                ))
            })
    }

    pub fn stage(&self, kind: StageKind) -> Option<&StageRecord> {
        self.stages.iter().find(|record| record.kind == kind)
    }
}

/// The fixed three-stage pipeline of one technology.
#[derive(Clone)]
pub struct StageChain {
    technology: String,
    stages: [Arc<dyn Stage>; 3],
}

impl std::fmt::Debug for StageChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageChain")
            .field("technology", &self.technology)
            .field(
                "stages",
                &self.stages.iter().map(|s| s.id().to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl StageChain {
    /// Assemble a chain, checking each stage sits in the slot its kind names.
    pub fn new(
        technology: impl Into<String>,
        performance: Arc<dyn Stage>,
        cost: Arc<dyn Stage>,
        finance: Arc<dyn Stage>,
    ) -> H2iResult<Self> {
        let technology = technology.into();
        let stages = [performance, cost, finance];
        for (stage, expected) in stages.iter().zip(StageKind::ALL) {
            if stage.kind() != expected {
                return Err(H2iError::config(format!(
                    "{technology}: stage '{}' is a {} stage but was placed in the {} slot",
                    stage.id(),
                    stage.kind(),
                    expected
                )));
            }
        }
        Ok(Self { technology, stages })
    }

    pub fn technology(&self) -> &str {
        &self.technology
    }

    pub fn stages(&self) -> &[Arc<dyn Stage>] {
        &self.stages
    }

    /// Declared variable sets of all three stages, in chain order.
    pub fn declarations(&self) -> H2iResult<Vec<VariableSet>> {
        self.stages.iter().map(|stage| stage.variables()).collect()
    }

    /// Run Performance, Cost and Finance once, in order.
    ///
    /// `external` seeds the pool with values coming from outside the chain
    /// (interconnections from upstream technologies).
    pub fn run(&self, external: &SignalPool) -> H2iResult<ChainOutputs> {
        let mut pool = external.clone();
        let mut promoted = SignalPool::new();
        let mut records = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let (outputs, declared) = evaluate_stage(stage.as_ref(), &pool)?;
            for var in declared.outputs() {
                let Some(value) = outputs.get(var.spec.name) else {
                    continue;
                };
                let signal = Signal::new(value.clone(), var.spec.unit);
                pool.insert(var.spec.name.to_string(), signal.clone());
                promoted.insert(var.spec.name.to_string(), signal);
            }
            records.push(StageRecord {
                id: stage.id().to_string(),
                kind: stage.kind(),
                outputs,
            });
        }

        Ok(ChainOutputs {
            technology: self.technology.clone(),
            stages: records,
            promoted,
        })
    }
}

/// Evaluate a single stage against a pool of promoted values.
///
/// Inputs start from their declared defaults (zero or configured override)
/// and are replaced by a pool value of the same name. Returns the outputs
/// together with the declarations they were checked against.
pub fn evaluate_stage(stage: &dyn Stage, pool: &SignalPool) -> H2iResult<(Values, VariableSet)> {
    let start = Instant::now();
    let mut declared = stage.variables()?;

    let input_names: Vec<&'static str> = declared.inputs().map(|var| var.spec.name).collect();
    for name in input_names {
        let Some(signal) = pool.get(name) else {
            continue;
        };
        let declared_unit = declared.spec(name).and_then(|spec| spec.unit);
        if !tags_compatible(declared_unit, signal.unit.as_deref()) {
            return Err(H2iError::config(format!(
                "{}: input '{name}' declared in '{}' but forwarded in '{}'",
                stage.id(),
                declared_unit.unwrap_or_default(),
                signal.unit.as_deref().unwrap_or_default()
            )));
        }
        declared.set_value(name, signal.value.clone())?;
    }

    let outputs = stage.compute(&declared.input_values())?;

    for (name, _) in outputs.iter() {
        if !declared.spec(name).is_some_and(|spec| spec.is_output()) {
            return Err(H2iError::config(format!(
                "{}: produced undeclared output '{name}'",
                stage.id()
            )));
        }
    }
    for var in declared.outputs() {
        let value = outputs.get(var.spec.name).ok_or_else(|| {
            H2iError::config(format!(
                "{}: declared output '{}' was not produced",
                stage.id(),
                var.spec.name
            ))
        })?;
        var.spec.check_shape(value)?;
        if !value.is_finite() {
            return Err(H2iError::domain(format!(
                "{}: output '{}' is not finite",
                stage.id(),
                var.spec.name
            )));
        }
    }

    debug!(
        "Evaluated {} stage '{}' in {:?} ({} outputs)",
        stage.kind(),
        stage.id(),
        start.elapsed(),
        outputs.len()
    );
    Ok((outputs, declared))
}
