//! Whole-model JSON round trips
//!
//! Run tests with: cargo test --test `persistence_roundtrip`

mod common;

use common::two_phase_section;
use seepage_core::{
    Injector, InjectorMode, InjectorTarget, Interp1, PersistenceError, Reaction,
    ReactionComponent, Seepage, SeepageConfig, Vec3,
};

fn busy_model() -> Seepage {
    let config = SeepageConfig {
        gravity: Vec3::new(0.0, 0.0, -9.81),
        ..SeepageConfig::default()
    };
    let mut model = two_phase_section(3, 2, config);
    let t_key = model.reg_cell_key("temperature");
    let perm_key = model.reg_face_key("permeability");
    for cell in 0..model.cell_count() {
        model
            .cell_mut(cell)
            .unwrap()
            .attrs
            .set(t_key, 280.0 + 0.1 * cell as f64 + 1.0 / 3.0);
    }
    model.face_mut(0).unwrap().attrs.set(perm_key, 1.0e-15 / 7.0);

    let mut reaction = Reaction::new(
        "condensation",
        Interp1::linear(0.0, 270.0, 1.0e7, 300.0).unwrap(),
        Interp1::linear(-10.0, -1.0e-4, 10.0, 1.0e-4).unwrap(),
    )
    .with_cell_thermal(t_key, None);
    reaction
        .add_component(ReactionComponent::new(vec![1], -3.0))
        .add_component(ReactionComponent::new(vec![0], 3.0));
    model.add_reaction(reaction).unwrap();

    let injector = Injector::new(
        0,
        InjectorTarget::Fluid { path: vec![1] },
        vec![(0.0, InjectorMode::Rate(1.0e-7)), (30.0, InjectorMode::Rate(-1.0e-7))],
    )
    .unwrap()
    .with_radius(1.5);
    model.add_injector(injector).unwrap();

    for _ in 0..3 {
        model.iterate(7.0).unwrap();
    }
    model
}

#[test]
fn test_round_trip_is_bit_identical() {
    let model = busy_model();
    let json = model.to_json().unwrap();
    let restored = Seepage::from_json(&json).unwrap();

    assert_eq!(restored.cell_count(), model.cell_count());
    assert_eq!(restored.face_count(), model.face_count());
    assert_eq!(restored.reactions(), model.reactions());
    assert_eq!(restored.injectors(), model.injectors());
    assert_eq!(restored.keys(), model.keys());
    assert_eq!(restored.clock(), model.clock());
    assert_eq!(restored.config, model.config);
    for (a, b) in restored.cells().iter().zip(model.cells()) {
        assert_eq!(a, b);
        for (fa, fb) in a.fluids().iter().zip(b.fluids()) {
            assert_eq!(fa.mass().to_bits(), fb.mass().to_bits());
        }
    }
    for (a, b) in restored.faces().iter().zip(model.faces()) {
        assert_eq!(a, b);
    }
    assert_eq!(restored.to_json().unwrap(), json);
}

#[test]
fn test_restored_model_continues_identically() {
    let mut original = busy_model();
    original.config.parallel = false;
    let mut restored = Seepage::from_json(&original.to_json().unwrap()).unwrap();

    for _ in 0..3 {
        original.iterate(5.0).unwrap();
        restored.iterate(5.0).unwrap();
    }

    assert_eq!(restored.snapshot(), original.snapshot());
}

#[test]
fn test_adjacency_rebuilt_after_load() {
    let model = busy_model();
    let restored = Seepage::from_json(&model.to_json().unwrap()).unwrap();

    for cell in 0..model.cell_count() {
        assert_eq!(restored.faces_of(cell), model.faces_of(cell));
    }
    assert_eq!(restored.face_between(1, 0), Some(0));
}

#[test]
fn test_garbage_is_a_parse_error() {
    let result = Seepage::from_json("{\"cells\": 12}");
    assert!(matches!(result, Err(PersistenceError::ParseFailed(_))));
}

#[test]
fn test_empty_kr_curve_is_a_parse_error() {
    let json = busy_model().to_json().unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["kr_curves"][0]["x"] = serde_json::json!([]);
    value["kr_curves"][0]["y"] = serde_json::json!([]);

    let result = Seepage::from_json(&value.to_string());
    assert!(matches!(result, Err(PersistenceError::ParseFailed(_))));
}

#[test]
fn test_dangling_reaction_path_is_a_parse_error() {
    let json = busy_model().to_json().unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["reactions"][0]["components"][0]["path"] = serde_json::json!([9]);

    let result = Seepage::from_json(&value.to_string());
    assert!(matches!(result, Err(PersistenceError::ParseFailed(_))));
}
