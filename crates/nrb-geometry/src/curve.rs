//! B-spline and NURBS curve wrapper types.
//!
//! These validate their invariants at construction and adapt `Point3`
//! control data to the flat arrays the core routines operate on. All knot
//! transforms return new curves; the receiver is never mutated.

use nrb_core::{NrbError, Point3, Result, Tolerance, Vector3};
use serde::{Deserialize, Serialize};

use nrb_basis::basis::Normalization;
use nrb_basis::knot::find_span_mult;

use crate::eval::curve as eval;
use crate::{clamp, elevate, refine};

pub(crate) fn validate_knots(degree: usize, knots: &[f64], count: usize) -> Result<()> {
    if degree == 0 {
        return Err(NrbError::InvalidOperation("degree must be at least 1".into()));
    }
    if count < degree + 1 {
        return Err(NrbError::DimensionMismatch(format!(
            "need at least {} control points for degree {}, got {}",
            degree + 1,
            degree,
            count
        )));
    }
    if knots.len() != count + degree + 1 {
        return Err(NrbError::InvalidKnotVector(format!(
            "expected {} knots for {} control points with degree {}, got {}",
            count + degree + 1,
            count,
            degree,
            knots.len()
        )));
    }
    if knots.windows(2).any(|w| w[0] > w[1]) {
        return Err(NrbError::InvalidKnotVector(
            "knot vector must be non-decreasing".into(),
        ));
    }
    if knots[degree] >= knots[count] {
        return Err(NrbError::InvalidKnotVector(
            "parameter domain is empty".into(),
        ));
    }
    Ok(())
}

pub(crate) fn flatten(pts: &[Point3]) -> Vec<f64> {
    let mut out = Vec::with_capacity(pts.len() * 3);
    for p in pts {
        out.extend_from_slice(&[p.x, p.y, p.z]);
    }
    out
}

pub(crate) fn unflatten(data: &[f64]) -> Vec<Point3> {
    data.chunks(3).map(|c| Point3::new(c[0], c[1], c[2])).collect()
}

pub(crate) fn homogenize(pts: &[Point3], weights: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(pts.len() * 4);
    for (p, &w) in pts.iter().zip(weights) {
        out.extend_from_slice(&[p.x * w, p.y * w, p.z * w, w]);
    }
    out
}

pub(crate) fn dehomogenize(data: &[f64]) -> (Vec<Point3>, Vec<f64>) {
    let mut pts = Vec::with_capacity(data.len() / 4);
    let mut weights = Vec::with_capacity(data.len() / 4);
    for c in data.chunks(4) {
        let w = c[3];
        pts.push(Point3::new(c[0] / w, c[1] / w, c[2] / w));
        weights.push(w);
    }
    (pts, weights)
}

/// A B-spline curve defined by degree, knot vector, and control points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BSplineCurve {
    pub degree: usize,
    pub knots: Vec<f64>,
    pub control_points: Vec<Point3>,
}

impl BSplineCurve {
    pub fn try_new(degree: usize, knots: Vec<f64>, control_points: Vec<Point3>) -> Result<Self> {
        validate_knots(degree, &knots, control_points.len())?;
        Ok(Self {
            degree,
            knots,
            control_points,
        })
    }

    pub fn domain(&self) -> (f64, f64) {
        let p = self.degree;
        (self.knots[p], self.knots[self.knots.len() - p - 1])
    }

    pub fn point_at(&self, u: f64) -> Point3 {
        let ctrl = flatten(&self.control_points);
        let pt = eval::point(self.degree, &self.knots, &ctrl, 3, u);
        Point3::new(pt[0], pt[1], pt[2])
    }

    /// Point, first and second derivative at `u`.
    pub fn derivs_at(&self, u: f64) -> (Point3, Vector3, Vector3) {
        let ctrl = flatten(&self.control_points);
        let weights = vec![1.0; self.control_points.len()];
        let jet = eval::evaluate_derivs(
            self.degree,
            &self.knots,
            &ctrl,
            &weights,
            3,
            &[u],
            Normalization::NSpline,
        );
        (
            Point3::new(jet.value[0], jet.value[1], jet.value[2]),
            Vector3::new(jet.du[0], jet.du[1], jet.du[2]),
            Vector3::new(jet.duu[0], jet.duu[1], jet.duu[2]),
        )
    }

    /// Evaluate at a batch of parameter sites, in parallel across sites.
    pub fn evaluate(&self, sites: &[f64]) -> Vec<Point3> {
        let ctrl = flatten(&self.control_points);
        let weights = vec![1.0; self.control_points.len()];
        let pts = eval::evaluate(
            self.degree,
            &self.knots,
            &ctrl,
            &weights,
            3,
            sites,
            Normalization::NSpline,
        );
        unflatten(&pts)
    }

    /// Insert the knot `u`, `times` times.
    pub fn insert_knot(&self, u: f64, times: usize) -> Result<Self> {
        let (lo, hi) = self.domain();
        if u <= lo || u >= hi {
            return Err(NrbError::InvalidOperation(format!(
                "knot {u} lies outside the open domain ({lo}, {hi})"
            )));
        }
        let n = self.control_points.len() - 1;
        let (span, mult) = find_span_mult(n, self.degree, u, &self.knots);
        if mult + times > self.degree {
            return Err(NrbError::InvalidOperation(format!(
                "inserting {times} copies of {u} would exceed multiplicity {}",
                self.degree
            )));
        }
        let ctrl = flatten(&self.control_points);
        let (knots, q) = refine::insert_knot(self.degree, &self.knots, &ctrl, 3, u, span, mult, times);
        Ok(Self {
            degree: self.degree,
            knots,
            control_points: unflatten(&q),
        })
    }

    /// Insert a whole non-decreasing batch of interior knots in one pass.
    pub fn refine(&self, xs: &[f64]) -> Result<Self> {
        let (lo, hi) = self.domain();
        if xs.windows(2).any(|w| w[0] > w[1]) {
            return Err(NrbError::InvalidOperation(
                "refinement knots must be non-decreasing".into(),
            ));
        }
        if xs.iter().any(|&x| x <= lo || x >= hi) {
            return Err(NrbError::InvalidOperation(format!(
                "refinement knots must lie inside the open domain ({lo}, {hi})"
            )));
        }
        let ctrl = flatten(&self.control_points);
        let (knots, q) = refine::refine_knot_vector(self.degree, &self.knots, &ctrl, 3, xs);
        Ok(Self {
            degree: self.degree,
            knots,
            control_points: unflatten(&q),
        })
    }

    /// Try to remove the knot `u` up to `times` times, keeping the curve
    /// within `tol.linear`. Returns the number of removals achieved together
    /// with the (possibly unchanged) result; achieving fewer removals than
    /// requested is a normal outcome, not an error.
    pub fn remove_knot(&self, u: f64, times: usize, tol: Tolerance) -> Result<(usize, Self)> {
        let (lo, hi) = self.domain();
        let n = self.control_points.len() - 1;
        let (span, mult) = find_span_mult(n, self.degree, u, &self.knots);
        if mult == 0 || u <= lo || u >= hi {
            return Err(NrbError::InvalidOperation(format!(
                "{u} is not an interior knot of the curve"
            )));
        }
        let times = times.min(mult);
        let ctrl = flatten(&self.control_points);
        let (t, knots, q) =
            refine::remove_knot(self.degree, &self.knots, &ctrl, 3, u, span, mult, times, tol.linear);
        Ok((
            t,
            Self {
                degree: self.degree,
                knots,
                control_points: unflatten(&q),
            },
        ))
    }

    /// Raise the degree by `t` without changing the curve.
    pub fn elevate_degree(&self, t: usize) -> Self {
        let ctrl = flatten(&self.control_points);
        let (knots, q) = elevate::degree_elevate(self.degree, &self.knots, &ctrl, 3, t);
        Self {
            degree: self.degree + t,
            knots,
            control_points: unflatten(&q),
        }
    }

    /// Free the end conditions on the selected ends.
    pub fn unclamp(&self, left: bool, right: bool) -> Self {
        let ctrl = flatten(&self.control_points);
        let (knots, q) = clamp::unclamp(self.degree, &self.knots, &ctrl, 3, left, right);
        Self {
            degree: self.degree,
            knots,
            control_points: unflatten(&q),
        }
    }

    /// Restore clamped (open) end conditions on the selected ends.
    pub fn clamp(&self, left: bool, right: bool) -> Self {
        let ctrl = flatten(&self.control_points);
        let (knots, q) = clamp::clamp(self.degree, &self.knots, &ctrl, 3, left, right);
        Self {
            degree: self.degree,
            knots,
            control_points: unflatten(&q),
        }
    }
}

/// A NURBS (Non-Uniform Rational B-Spline) curve.
///
/// Extends `BSplineCurve` with weights; all knot transforms run in
/// homogeneous coordinates so the rational curve is preserved exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NurbsCurve {
    pub degree: usize,
    pub knots: Vec<f64>,
    pub control_points: Vec<Point3>,
    pub weights: Vec<f64>,
}

impl NurbsCurve {
    pub fn try_new(
        degree: usize,
        knots: Vec<f64>,
        control_points: Vec<Point3>,
        weights: Vec<f64>,
    ) -> Result<Self> {
        validate_knots(degree, &knots, control_points.len())?;
        if weights.len() != control_points.len() {
            return Err(NrbError::DimensionMismatch(format!(
                "{} weights for {} control points",
                weights.len(),
                control_points.len()
            )));
        }
        if weights.iter().any(|&w| w <= 0.0) {
            return Err(NrbError::InvalidOperation(
                "all weights must be positive".into(),
            ));
        }
        Ok(Self {
            degree,
            knots,
            control_points,
            weights,
        })
    }

    pub fn domain(&self) -> (f64, f64) {
        let p = self.degree;
        (self.knots[p], self.knots[self.knots.len() - p - 1])
    }

    pub fn point_at(&self, u: f64) -> Point3 {
        let ctrl = flatten(&self.control_points);
        let pt = eval::evaluate(
            self.degree,
            &self.knots,
            &ctrl,
            &self.weights,
            3,
            &[u],
            Normalization::NSpline,
        );
        Point3::new(pt[0], pt[1], pt[2])
    }

    /// Point, first and second derivative at `u` (quotient rule).
    pub fn derivs_at(&self, u: f64) -> (Point3, Vector3, Vector3) {
        let ctrl = flatten(&self.control_points);
        let jet = eval::evaluate_derivs(
            self.degree,
            &self.knots,
            &ctrl,
            &self.weights,
            3,
            &[u],
            Normalization::NSpline,
        );
        (
            Point3::new(jet.value[0], jet.value[1], jet.value[2]),
            Vector3::new(jet.du[0], jet.du[1], jet.du[2]),
            Vector3::new(jet.duu[0], jet.duu[1], jet.duu[2]),
        )
    }

    /// Evaluate at a batch of parameter sites, in parallel across sites.
    pub fn evaluate(&self, sites: &[f64]) -> Vec<Point3> {
        let ctrl = flatten(&self.control_points);
        let pts = eval::evaluate(
            self.degree,
            &self.knots,
            &ctrl,
            &self.weights,
            3,
            sites,
            Normalization::NSpline,
        );
        unflatten(&pts)
    }

    /// Insert the knot `u`, `times` times.
    pub fn insert_knot(&self, u: f64, times: usize) -> Result<Self> {
        let (lo, hi) = self.domain();
        if u <= lo || u >= hi {
            return Err(NrbError::InvalidOperation(format!(
                "knot {u} lies outside the open domain ({lo}, {hi})"
            )));
        }
        let n = self.control_points.len() - 1;
        let (span, mult) = find_span_mult(n, self.degree, u, &self.knots);
        if mult + times > self.degree {
            return Err(NrbError::InvalidOperation(format!(
                "inserting {times} copies of {u} would exceed multiplicity {}",
                self.degree
            )));
        }
        let pw = homogenize(&self.control_points, &self.weights);
        let (knots, qw) = refine::insert_knot(self.degree, &self.knots, &pw, 4, u, span, mult, times);
        let (control_points, weights) = dehomogenize(&qw);
        Ok(Self {
            degree: self.degree,
            knots,
            control_points,
            weights,
        })
    }

    /// Insert a whole non-decreasing batch of interior knots in one pass.
    pub fn refine(&self, xs: &[f64]) -> Result<Self> {
        let (lo, hi) = self.domain();
        if xs.windows(2).any(|w| w[0] > w[1]) {
            return Err(NrbError::InvalidOperation(
                "refinement knots must be non-decreasing".into(),
            ));
        }
        if xs.iter().any(|&x| x <= lo || x >= hi) {
            return Err(NrbError::InvalidOperation(format!(
                "refinement knots must lie inside the open domain ({lo}, {hi})"
            )));
        }
        let pw = homogenize(&self.control_points, &self.weights);
        let (knots, qw) = refine::refine_knot_vector(self.degree, &self.knots, &pw, 4, xs);
        let (control_points, weights) = dehomogenize(&qw);
        Ok(Self {
            degree: self.degree,
            knots,
            control_points,
            weights,
        })
    }

    /// Try to remove the knot `u` up to `times` times. The linear tolerance
    /// is transferred to homogeneous space through the minimum weight and
    /// the largest control-point magnitude, so the bound holds for the
    /// projected curve.
    pub fn remove_knot(&self, u: f64, times: usize, tol: Tolerance) -> Result<(usize, Self)> {
        let (lo, hi) = self.domain();
        let n = self.control_points.len() - 1;
        let (span, mult) = find_span_mult(n, self.degree, u, &self.knots);
        if mult == 0 || u <= lo || u >= hi {
            return Err(NrbError::InvalidOperation(format!(
                "{u} is not an interior knot of the curve"
            )));
        }
        let times = times.min(mult);

        let wmin = self.weights.iter().cloned().fold(f64::INFINITY, f64::min);
        let pmax = self
            .control_points
            .iter()
            .map(|p| p.length())
            .fold(0.0, f64::max);
        let htol = tol.linear * wmin / (1.0 + pmax);

        let pw = homogenize(&self.control_points, &self.weights);
        let (t, knots, qw) =
            refine::remove_knot(self.degree, &self.knots, &pw, 4, u, span, mult, times, htol);
        let (control_points, weights) = dehomogenize(&qw);
        Ok((
            t,
            Self {
                degree: self.degree,
                knots,
                control_points,
                weights,
            },
        ))
    }

    /// Raise the degree by `t` without changing the curve.
    pub fn elevate_degree(&self, t: usize) -> Self {
        let pw = homogenize(&self.control_points, &self.weights);
        let (knots, qw) = elevate::degree_elevate(self.degree, &self.knots, &pw, 4, t);
        let (control_points, weights) = dehomogenize(&qw);
        Self {
            degree: self.degree + t,
            knots,
            control_points,
            weights,
        }
    }

    /// Free the end conditions on the selected ends.
    pub fn unclamp(&self, left: bool, right: bool) -> Self {
        let pw = homogenize(&self.control_points, &self.weights);
        let (knots, qw) = clamp::unclamp(self.degree, &self.knots, &pw, 4, left, right);
        let (control_points, weights) = dehomogenize(&qw);
        Self {
            degree: self.degree,
            knots,
            control_points,
            weights,
        }
    }

    /// Restore clamped (open) end conditions on the selected ends.
    pub fn clamp(&self, left: bool, right: bool) -> Self {
        let pw = homogenize(&self.control_points, &self.weights);
        let (knots, qw) = clamp::clamp(self.degree, &self.knots, &pw, 4, left, right);
        let (control_points, weights) = dehomogenize(&qw);
        Self {
            degree: self.degree,
            knots,
            control_points,
            weights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nrb_core::DVec3;

    fn quadratic_arc() -> BSplineCurve {
        BSplineCurve::try_new(
            2,
            vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0],
            vec![
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(1.0, 2.0, 0.0),
                DVec3::new(2.0, -1.0, 0.0),
                DVec3::new(3.0, 1.5, 0.0),
                DVec3::new(4.0, 0.0, 0.0),
            ],
        )
        .unwrap()
    }

    fn quarter_circle() -> NurbsCurve {
        let w = std::f64::consts::FRAC_1_SQRT_2;
        NurbsCurve::try_new(
            2,
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            vec![
                DVec3::new(1.0, 0.0, 0.0),
                DVec3::new(1.0, 1.0, 0.0),
                DVec3::new(0.0, 1.0, 0.0),
            ],
            vec![1.0, w, 1.0],
        )
        .unwrap()
    }

    #[test]
    fn test_try_new_rejects_bad_inputs() {
        assert!(BSplineCurve::try_new(2, vec![0.0, 0.0, 1.0, 1.0], vec![DVec3::ZERO; 3]).is_err());
        assert!(BSplineCurve::try_new(
            2,
            vec![0.0, 0.0, 1.0, 0.5, 1.0, 1.0],
            vec![DVec3::ZERO; 3]
        )
        .is_err());
        assert!(NurbsCurve::try_new(
            2,
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            vec![DVec3::ZERO; 3],
            vec![1.0, -1.0, 1.0]
        )
        .is_err());
    }

    #[test]
    fn test_domain_and_endpoints() {
        let c = quadratic_arc();
        assert_eq!(c.domain(), (0.0, 3.0));
        let start = c.point_at(0.0);
        let end = c.point_at(3.0);
        assert_relative_eq!(start.x, 0.0, epsilon = 1e-14);
        assert_relative_eq!(end.x, 4.0, epsilon = 1e-14);
    }

    #[test]
    fn test_insert_knot_preserves_shape() {
        let c = quadratic_arc();
        let refined = c.insert_knot(1.5, 1).unwrap();
        assert_eq!(refined.control_points.len(), c.control_points.len() + 1);
        for i in 0..=30 {
            let u = 3.0 * i as f64 / 30.0;
            let a = c.point_at(u);
            let b = refined.point_at(u);
            assert_relative_eq!((a - b).length(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_insert_knot_rejects_out_of_domain() {
        let c = quadratic_arc();
        assert!(c.insert_knot(0.0, 1).is_err());
        assert!(c.insert_knot(3.5, 1).is_err());
        assert!(c.insert_knot(1.0, 3).is_err());
    }

    #[test]
    fn test_nurbs_circle_transforms_preserve_radius() {
        let c = quarter_circle();
        let refined = c.refine(&[0.25, 0.5, 0.5, 0.75]).unwrap();
        let elevated = c.elevate_degree(2);
        for i in 0..=20 {
            let u = i as f64 / 20.0;
            for curve in [&refined, &elevated] {
                let pt = curve.point_at(u);
                assert_relative_eq!(pt.length(), 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_nurbs_insert_then_remove_roundtrip() {
        let c = quarter_circle();
        let inserted = c.insert_knot(0.5, 1).unwrap();
        let (t, removed) = inserted
            .remove_knot(0.5, 1, Tolerance::default_precision())
            .unwrap();
        assert_eq!(t, 1);
        assert_eq!(removed.control_points.len(), c.control_points.len());
        for i in 0..=20 {
            let u = i as f64 / 20.0;
            let a = c.point_at(u);
            let b = removed.point_at(u);
            assert_relative_eq!((a - b).length(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_remove_required_knot_reports_zero() {
        // The interior knot at 1.0 carries real shape; tight tolerance
        // refuses the removal.
        let c = quadratic_arc();
        let (t, kept) = c.remove_knot(1.0, 1, Tolerance::tight()).unwrap();
        assert_eq!(t, 0);
        assert_eq!(kept.control_points.len(), c.control_points.len());
    }

    #[test]
    fn test_unclamp_clamp_roundtrip() {
        let c = quadratic_arc();
        let free = c.unclamp(true, true);
        let back = free.clamp(true, true);
        for (a, b) in back.control_points.iter().zip(&c.control_points) {
            assert_relative_eq!((*a - *b).length(), 0.0, epsilon = 1e-10);
        }
        for i in 0..=20 {
            let u = 3.0 * i as f64 / 20.0;
            assert_relative_eq!((free.point_at(u) - c.point_at(u)).length(), 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_batch_evaluate_matches_point_at() {
        let c = quarter_circle();
        let sites: Vec<f64> = (0..=10).map(|i| i as f64 / 10.0).collect();
        let pts = c.evaluate(&sites);
        for (pt, &u) in pts.iter().zip(&sites) {
            assert_relative_eq!((*pt - c.point_at(u)).length(), 0.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_derivs_at_circle_tangent() {
        let c = quarter_circle();
        let (v, d1, _) = c.derivs_at(0.4);
        assert_relative_eq!(v.dot(d1), 0.0, epsilon = 1e-10);
    }
}
