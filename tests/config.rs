//! Loading presets from JSON.

use ribbon_motion::prelude::*;
use ribbon_motion::{
    AreaConstraint, Curve, CurveError, NeighborSearch, PathControllerConfig, PolylineCurve, SceneConfig,
};

#[test]
fn test_scene_preset_from_json() {
    let json = r#"{
        "trail": { "max_points": 64, "trail_ratio": 0.5 },
        "flocking": {
            "weights": { "separation": 2.0, "alignment": 0.5 },
            "neighbor_search": { "mode": "grid", "cell_size": 6.0 },
            "wander": { "weight": 0.2 },
            "lane_targets": [[0.0, 0.0, 10.0], [0.0, 0.0, -10.0]],
            "lane_weight": 0.3
        },
        "seed": 7
    }"#;

    let config: SceneConfig = serde_json::from_str(json).expect("valid preset");
    assert_eq!(config.trail.max_points, 64);
    assert_eq!(config.trail.trail_ratio, 0.5);
    assert_eq!(config.seed, 7);

    let flocking = &config.flocking;
    assert_eq!(flocking.weights.separation, 2.0);
    assert_eq!(flocking.weights.alignment, 0.5);
    // Missing fields keep their defaults.
    assert_eq!(flocking.weights.cohesion, 1.0);
    assert_eq!(flocking.weights.separation_radius_factor, 0.8);
    assert_eq!(flocking.neighbor_search, NeighborSearch::Grid { cell_size: 6.0 });
    let wander = flocking.wander.expect("wander enabled");
    assert_eq!(wander.weight, 0.2);
    assert_eq!(wander.distance, WanderConfig::default().distance);
    assert_eq!(flocking.lane_targets, vec![Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -10.0)]);
    assert!(!flocking.frame_rate_independent);

    let scene = TrailScene::new(config);
    assert_eq!(scene.trail_count(), 0);
}

#[test]
fn test_empty_object_is_all_defaults() {
    let config: SceneConfig = serde_json::from_str("{}").expect("defaults");
    assert_eq!(config, SceneConfig::default());

    let boid: BoidConfig = serde_json::from_str("{}").expect("defaults");
    assert_eq!(boid, BoidConfig::default());

    let path: PathControllerConfig = serde_json::from_str(r#"{ "sample_count": 250 }"#).expect("partial");
    assert_eq!(path.sample_count, 250);
    assert_eq!(path.cell_size, None);
}

#[test]
fn test_constraint_presets() {
    let cubic: AreaConstraint =
        serde_json::from_str(r#"{ "type": "cubic", "bounds": [10.0, 5.0, 10.0], "strength": 0.1 }"#)
            .expect("cubic");
    assert!(cubic.contains(Vec3::new(9.0, 4.0, -9.0)));
    assert!(!cubic.contains(Vec3::new(0.0, 6.0, 0.0)));

    let donut: AreaConstraint = serde_json::from_str(
        r#"{ "type": "donut", "inner_radius": 50.0, "outer_radius": 100.0, "height": 30.0, "strength": 0.1 }"#,
    )
    .expect("donut");
    assert_eq!(donut, AreaConstraint::donut(50.0, 100.0, 30.0, 0.1));

    // Inverted radii and a negative strength are corrected on load.
    let inverted: AreaConstraint = serde_json::from_str(
        r#"{ "type": "donut", "inner_radius": 120.0, "outer_radius": 100.0, "height": 10.0, "strength": -1.0 }"#,
    )
    .expect("inverted donut");
    assert_eq!(inverted, AreaConstraint::donut(120.0, 100.0, 10.0, -1.0));
    assert_eq!(inverted.strength(), ribbon_motion::constraint::DEFAULT_STRENGTH);
    match inverted {
        AreaConstraint::Donut(d) => assert!(d.inner_radius < d.outer_radius),
        other => panic!("unexpected variant {:?}", other),
    }
    let force = inverted.force(Vec3::new(110.0, 0.0, 0.0));
    assert!(force.x < 0.0, "force {:?} points outward", force);

    let negative: AreaConstraint =
        serde_json::from_str(r#"{ "type": "cubic", "bounds": [-4.0, 2.0, 2.0], "strength": 0.0 }"#).expect("cubic");
    assert_eq!(negative, AreaConstraint::cubic(Vec3::new(4.0, 2.0, 2.0), 0.1));
    assert!(negative.force(Vec3::new(6.0, 0.0, 0.0)).x < 0.0);
}

#[test]
fn test_curve_presets_are_validated() {
    let empty = serde_json::from_str::<CatmullRomCurve>(r#"{ "points": [], "closed": false, "alpha": 0.5 }"#);
    let err = empty.expect_err("empty control points");
    assert!(err.to_string().contains(&CurveError::NoControlPoints.to_string()));

    assert!(serde_json::from_str::<PolylineCurve>(r#"{ "points": [] }"#).is_err());

    let curve: CatmullRomCurve =
        serde_json::from_str(r#"{ "points": [[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [4.0, 4.0, 0.0]], "alpha": 7.0 }"#)
            .expect("valid spline");
    assert!(!curve.is_closed());
    assert!(curve.point(0.5).is_finite());

    // Loaded curves drive a path like any other.
    let path = PathController::new(curve);
    assert!(path.length() >= 7.99);
    assert!(path.point_at(1.0).distance(Vec3::new(4.0, 4.0, 0.0)) < 1e-3);

    let line: PolylineCurve = serde_json::from_str(r#"{ "points": [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0]], "closed": false }"#)
        .expect("valid polyline");
    assert_eq!(line.points().len(), 2);
}

#[test]
fn test_config_round_trips_through_json() {
    let original = SceneConfig {
        trail: TrailConfig::default().with_max_points(12),
        flocking: FlockingConfig::default().with_wander(WanderConfig::default()),
        seed: 3,
    };
    let json = serde_json::to_string(&original).expect("serialize");
    let back: SceneConfig = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, original);
}

#[test]
fn test_unknown_constraint_type_is_an_error() {
    let result: Result<AreaConstraint, _> = serde_json::from_str(r#"{ "type": "sphere", "radius": 1.0 }"#);
    assert!(result.is_err());
}
