//! Structure-preserving transform invariances, exercised through the
//! wrapper types: every knot transform must leave the evaluated geometry
//! unchanged on the shared parameter domain.

use approx::assert_relative_eq;
use nrb_core::{DVec3, Tolerance};
use nrb_geometry::{BSplineCurve, NurbsCurve};

fn cubic_curve() -> BSplineCurve {
    BSplineCurve::try_new(
        3,
        vec![0.0, 0.0, 0.0, 0.0, 0.5, 1.0, 2.0, 2.0, 2.0, 2.0],
        vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(0.5, 1.0, 0.2),
            DVec3::new(1.5, 1.2, -0.4),
            DVec3::new(2.5, -0.3, 0.1),
            DVec3::new(3.0, 0.4, 0.6),
            DVec3::new(4.0, 0.0, 0.0),
        ],
    )
    .unwrap()
}

fn half_circle() -> NurbsCurve {
    // Two rational quadratic quarter-circle segments.
    let w = std::f64::consts::FRAC_1_SQRT_2;
    NurbsCurve::try_new(
        2,
        vec![0.0, 0.0, 0.0, 0.5, 0.5, 1.0, 1.0, 1.0],
        vec![
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(-1.0, 1.0, 0.0),
            DVec3::new(-1.0, 0.0, 0.0),
        ],
        vec![1.0, w, 1.0, w, 1.0],
    )
    .unwrap()
}

fn max_deviation(a: &BSplineCurve, b: &BSplineCurve, samples: usize) -> f64 {
    let (lo, hi) = a.domain();
    (0..=samples)
        .map(|i| lo + (hi - lo) * i as f64 / samples as f64)
        .map(|u| (a.point_at(u) - b.point_at(u)).length())
        .fold(0.0, f64::max)
}

#[test]
fn insertion_leaves_geometry_unchanged() {
    let c = cubic_curve();
    let mut r = c.clone();
    for &(u, times) in &[(0.25, 1), (0.5, 2), (1.5, 3)] {
        r = r.insert_knot(u, times).unwrap();
    }
    assert!(max_deviation(&c, &r, 200) < 1e-12);
    assert_eq!(r.control_points.len(), c.control_points.len() + 6);
}

#[test]
fn refinement_equals_repeated_insertion() {
    let c = cubic_curve();
    let xs = [0.25, 0.75, 0.75, 1.25];
    let refined = c.refine(&xs).unwrap();
    let mut inserted = c.clone();
    for &x in &xs {
        inserted = inserted.insert_knot(x, 1).unwrap();
    }
    assert_eq!(refined.knots.len(), inserted.knots.len());
    for (a, b) in refined.knots.iter().zip(&inserted.knots) {
        assert_relative_eq!(a, b, epsilon = 1e-14);
    }
    for (a, b) in refined.control_points.iter().zip(&inserted.control_points) {
        assert_relative_eq!((*a - *b).length(), 0.0, epsilon = 1e-12);
    }
}

#[test]
fn insert_then_remove_round_trips() {
    let c = cubic_curve();
    let inserted = c.insert_knot(0.75, 1).unwrap();
    let (t, removed) = inserted
        .remove_knot(0.75, 1, Tolerance::default_precision())
        .unwrap();
    assert_eq!(t, 1);
    assert_eq!(removed.knots.len(), c.knots.len());
    assert!(max_deviation(&c, &removed, 200) < 1e-9);
}

#[test]
fn elevation_leaves_geometry_unchanged() {
    let c = cubic_curve();
    let e = c.elevate_degree(2);
    assert_eq!(e.degree, 5);
    assert!(max_deviation(&c, &e, 200) < 1e-11);
}

#[test]
fn clamp_unclamp_identity() {
    let c = cubic_curve();
    let round = c.unclamp(true, true).clamp(true, true);
    for (a, b) in round.knots.iter().zip(&c.knots) {
        assert_relative_eq!(a, b, epsilon = 1e-12);
    }
    for (a, b) in round.control_points.iter().zip(&c.control_points) {
        assert_relative_eq!((*a - *b).length(), 0.0, epsilon = 1e-10);
    }
}

#[test]
fn rational_transforms_stay_on_circle() {
    let c = half_circle();
    let refined = c.refine(&[0.2, 0.4, 0.6, 0.8]).unwrap();
    let elevated = c.elevate_degree(1);
    for curve in [&refined, &elevated] {
        for i in 0..=100 {
            let u = i as f64 / 100.0;
            assert_relative_eq!(curve.point_at(u).length(), 1.0, epsilon = 1e-11);
        }
    }
}

#[test]
fn rational_derivatives_survive_insertion() {
    let c = half_circle();
    let r = c.insert_knot(0.3, 2).unwrap();
    for &u in &[0.1, 0.3, 0.62, 0.9] {
        let (pa, da, dda) = c.derivs_at(u);
        let (pb, db, ddb) = r.derivs_at(u);
        assert_relative_eq!((pa - pb).length(), 0.0, epsilon = 1e-11);
        assert_relative_eq!((da - db).length(), 0.0, epsilon = 1e-9);
        assert_relative_eq!((dda - ddb).length(), 0.0, epsilon = 1e-7);
    }
}

#[test]
fn curves_round_trip_through_serde() {
    let c = half_circle();
    let json = serde_json::to_string(&c).unwrap();
    let back: NurbsCurve = serde_json::from_str(&json).unwrap();
    assert_eq!(back.degree, c.degree);
    assert_eq!(back.knots, c.knots);
    assert_eq!(back.weights, c.weights);
    for (a, b) in back.control_points.iter().zip(&c.control_points) {
        assert_eq!(a, b);
    }
}
