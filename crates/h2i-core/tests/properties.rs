use h2i_core::config::{merge_layers, merge_shared_inputs, ConfigMap, ModelInputs};
use h2i_core::cost::scaled_capex;
use h2i_core::finance::{annual_total, LevelizedCost};
use h2i_core::value::{merge_overrides, Overrides, Value};
use h2i_core::variable::{VariableSet, VariableSpec, HOURS_PER_YEAR};
use h2i_core::{H2iError, PriceIndex, StageKind};
use serde_json::json;

const TABLE: &[VariableSpec] = &[
    VariableSpec::input("capacity", 1, Some("kg/year")),
    VariableSpec::input("profile", HOURS_PER_YEAR, Some("kg/h")),
    VariableSpec::output("cost", 1, Some("USD")),
];

const EXTRA: &[VariableSpec] = &[VariableSpec::input("price", 1, Some("USD/kg"))];

fn map(value: serde_json::Value) -> ConfigMap {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[test]
fn undeclared_values_start_at_zero() {
    let mut set = VariableSet::new("t");
    set.declare_from_table(TABLE, Some(EXTRA), &Overrides::new(), None).unwrap();
    assert_eq!(set.value("capacity"), Some(&Value::Scalar(0.0)));
    assert_eq!(set.value("profile"), Some(&Value::zeros(HOURS_PER_YEAR)));
    assert_eq!(set.value("price"), Some(&Value::Scalar(0.0)));
    assert_eq!(set.inputs().count(), 3);
    assert_eq!(set.outputs().count(), 1);
}

#[test]
fn extra_overrides_win_and_inputs_are_untouched() {
    let mut base = Overrides::new();
    base.insert("capacity".into(), Value::Scalar(1.0));
    base.insert("price".into(), Value::Scalar(2.0));
    let mut extra = Overrides::new();
    extra.insert("price".into(), Value::Scalar(5.0));
    let (base_before, extra_before) = (base.clone(), extra.clone());

    let mut set = VariableSet::new("t");
    set.declare_from_table(TABLE, Some(EXTRA), &base, Some(&extra)).unwrap();
    assert_eq!(set.value("capacity"), Some(&Value::Scalar(1.0)));
    assert_eq!(set.value("price"), Some(&Value::Scalar(5.0)));
    assert_eq!(base, base_before);
    assert_eq!(extra, extra_before);

    let merged = merge_overrides(&base, Some(&extra));
    assert_eq!(merged.get("price"), Some(&Value::Scalar(5.0)));
}

#[test]
fn wrong_shape_override_is_rejected() {
    let mut overrides = Overrides::new();
    overrides.insert("profile".into(), Value::Series(vec![1.0; 24]));
    let mut set = VariableSet::new("t");
    let err = set.declare_from_table(TABLE, None, &overrides, None).unwrap_err();
    assert!(matches!(err, H2iError::Configuration(_)));
    assert!(err.to_string().contains("profile"));
}

#[test]
fn later_layers_override_earlier_ones() {
    let merged = merge_layers(&[&map(json!({"a": 1, "b": 2})), &map(json!({"b": 3, "c": 4}))]);
    assert_eq!(serde_json::Value::Object(merged), json!({"a": 1, "b": 3, "c": 4}));

    let inputs: ModelInputs = serde_json::from_value(json!({
        "shared_parameters": {"capacity": 10, "price": 1.0},
        "cost_parameters": {"price": 2.5}
    }))
    .unwrap();
    let cost = merge_shared_inputs(&inputs, StageKind::Cost);
    assert_eq!(cost.get("price"), Some(&json!(2.5)));
    let perf = merge_shared_inputs(&inputs, StageKind::Performance);
    assert_eq!(perf.get("price"), Some(&json!(1.0)));
    // merging leaves the block untouched
    assert_eq!(inputs.shared_parameters.get("price"), Some(&json!(1.0)));
}

#[test]
fn inflation_round_trip() {
    let index = PriceIndex::new("cepci", [(2010, 550.8), (2015, 556.8), (2022, 816.0)]).unwrap();
    let forward = index.inflate(1.0e6, 2010, 2022).unwrap();
    let back = index.inflate(forward, 2022, 2010).unwrap();
    assert!((back - 1.0e6).abs() < 1e-6);
    assert!(matches!(index.inflate(1.0, 1999, 2022), Err(H2iError::Lookup(_))));
}

#[test]
fn levelized_shares_close() {
    let lcox = LevelizedCost::new("LCOX", 3.3e7)
        .unwrap()
        .capital("LCOX_capex", 4.2e7, 0.0707, 1.093)
        .annual("LCOX_fopex", 1.3e6)
        .annual("LCOX_vopex", 8.0e5)
        .credit("LCOX_elec", 2.0e5)
        .finish();
    assert!(lcox.closes(1e-12));
    let sum: f64 = lcox.shares.iter().map(|(_, v)| v).sum();
    assert!((lcox.total - sum).abs() < 1e-12);
    assert!(lcox.share("LCOX_elec").unwrap() < 0.0);
}

#[test]
fn zero_production_is_domain_error() {
    let zeros = vec![0.0; HOURS_PER_YEAR];
    assert!(matches!(annual_total(&zeros, "product"), Err(H2iError::Domain(_))));
    assert!(matches!(LevelizedCost::new("LCOX", 0.0), Err(H2iError::Domain(_))));
    assert!(matches!(LevelizedCost::new("LCOX", f64::NAN), Err(H2iError::Domain(_))));
}

#[test]
fn scaling_law_capex_reference_value() {
    let capex = scaled_capex(100.0, 1000.0, 0.6, 596.2 / 708.8).unwrap().value();
    assert!((capex - 5308.4).abs() < 2.0, "{capex}");
}
