//! B-spline and NURBS surface wrapper types.
//!
//! Control nets are stored as a flat u-major `Vec<Point3>` with
//! `(nu + 1) x (nv + 1)` entries; `counts` records the grid shape.

use nrb_core::{NrbError, Point3, Result, Vector3};
use serde::{Deserialize, Serialize};

use nrb_basis::basis::Normalization;
use nrb_basis::knot::find_span_mult;

use crate::curve::{dehomogenize, flatten, homogenize, unflatten, validate_knots};
use crate::eval::surface as eval;
use crate::refine;

/// Reorder a flat `rows x cols x dim` grid to `cols x rows x dim`.
fn transpose(ctrl: &[f64], rows: usize, cols: usize, dim: usize) -> Vec<f64> {
    let mut out = vec![0.0; ctrl.len()];
    for r in 0..rows {
        for c in 0..cols {
            out[(c * rows + r) * dim..][..dim]
                .copy_from_slice(&ctrl[(r * cols + c) * dim..][..dim]);
        }
    }
    out
}

/// Shared precondition check for directional knot insertion.
fn check_insert(
    p: usize,
    knots: &[f64],
    count: usize,
    u: f64,
    times: usize,
) -> Result<(usize, usize)> {
    let (lo, hi) = (knots[p], knots[knots.len() - p - 1]);
    if u <= lo || u >= hi {
        return Err(NrbError::InvalidOperation(format!(
            "knot {u} lies outside the open domain ({lo}, {hi})"
        )));
    }
    let (span, mult) = find_span_mult(count - 1, p, u, knots);
    if mult + times > p {
        return Err(NrbError::InvalidOperation(format!(
            "inserting {times} copies of {u} would exceed multiplicity {p}"
        )));
    }
    Ok((span, mult))
}

fn check_refine(p: usize, knots: &[f64], xs: &[f64]) -> Result<()> {
    let (lo, hi) = (knots[p], knots[knots.len() - p - 1]);
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
    Ok(())
}

fn validate_grid(
    degree_u: usize,
    degree_v: usize,
    knots_u: &[f64],
    knots_v: &[f64],
    counts: (usize, usize),
    total: usize,
) -> Result<()> {
    let (cu, cv) = counts;
    if cu * cv != total {
        return Err(NrbError::DimensionMismatch(format!(
            "control grid of {cu} x {cv} needs {} points, got {total}",
            cu * cv
        )));
    }
    validate_knots(degree_u, knots_u, cu)?;
    validate_knots(degree_v, knots_v, cv)?;
    Ok(())
}

/// A tensor-product B-spline surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BSplineSurface {
    pub degree_u: usize,
    pub degree_v: usize,
    pub knots_u: Vec<f64>,
    pub knots_v: Vec<f64>,
    /// u-major control net, `counts.0 * counts.1` points.
    pub control_points: Vec<Point3>,
    pub counts: (usize, usize),
}

impl BSplineSurface {
    pub fn try_new(
        degree_u: usize,
        degree_v: usize,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        control_points: Vec<Point3>,
        counts: (usize, usize),
    ) -> Result<Self> {
        validate_grid(
            degree_u,
            degree_v,
            &knots_u,
            &knots_v,
            counts,
            control_points.len(),
        )?;
        Ok(Self {
            degree_u,
            degree_v,
            knots_u,
            knots_v,
            control_points,
            counts,
        })
    }

    pub fn domain_u(&self) -> (f64, f64) {
        let p = self.degree_u;
        (self.knots_u[p], self.knots_u[self.knots_u.len() - p - 1])
    }

    pub fn domain_v(&self) -> (f64, f64) {
        let p = self.degree_v;
        (self.knots_v[p], self.knots_v[self.knots_v.len() - p - 1])
    }

    pub fn point_at(&self, u: f64, v: f64) -> Point3 {
        let ctrl = flatten(&self.control_points);
        let pt = eval::point(
            self.degree_u,
            self.degree_v,
            &self.knots_u,
            &self.knots_v,
            &ctrl,
            self.counts.1 - 1,
            3,
            u,
            v,
        );
        Point3::new(pt[0], pt[1], pt[2])
    }

    /// Point and first partials at `(u, v)`.
    pub fn derivs_at(&self, u: f64, v: f64) -> (Point3, Vector3, Vector3) {
        let ctrl = flatten(&self.control_points);
        let weights = vec![1.0; self.control_points.len()];
        let jet = eval::evaluate_derivs(
            self.degree_u,
            self.degree_v,
            &self.knots_u,
            &self.knots_v,
            &ctrl,
            &weights,
            self.counts.1 - 1,
            3,
            &[u],
            &[v],
            Normalization::NSpline,
        );
        (
            Point3::new(jet.value[0], jet.value[1], jet.value[2]),
            Vector3::new(jet.du[0], jet.du[1], jet.du[2]),
            Vector3::new(jet.dv[0], jet.dv[1], jet.dv[2]),
        )
    }

    /// Unit surface normal at `(u, v)`, from the cross product of the
    /// partials. Degenerate corners yield a zero vector.
    pub fn normal_at(&self, u: f64, v: f64) -> Vector3 {
        let (_, du, dv) = self.derivs_at(u, v);
        let n = du.cross(dv);
        let len = n.length();
        if len > 0.0 {
            n / len
        } else {
            Vector3::ZERO
        }
    }

    /// Evaluate over the tensor grid of sites, in parallel across u-rows.
    /// Output is u-major, `sites_u.len() * sites_v.len()` points.
    pub fn evaluate(&self, sites_u: &[f64], sites_v: &[f64]) -> Vec<Point3> {
        let ctrl = flatten(&self.control_points);
        let weights = vec![1.0; self.control_points.len()];
        let pts = eval::evaluate(
            self.degree_u,
            self.degree_v,
            &self.knots_u,
            &self.knots_v,
            &ctrl,
            &weights,
            self.counts.1 - 1,
            3,
            sites_u,
            sites_v,
            Normalization::NSpline,
        );
        unflatten(&pts)
    }

    /// Insert the knot `u` into the u direction, `times` times.
    ///
    /// The control net is u-major, so a whole v-row acts as one flat
    /// "control point" of the insertion recurrence.
    pub fn insert_knot_u(&self, u: f64, times: usize) -> Result<Self> {
        let (span, mult) = check_insert(self.degree_u, &self.knots_u, self.counts.0, u, times)?;
        let ctrl = flatten(&self.control_points);
        let (knots_u, q) = refine::insert_knot(
            self.degree_u,
            &self.knots_u,
            &ctrl,
            self.counts.1 * 3,
            u,
            span,
            mult,
            times,
        );
        Ok(Self {
            degree_u: self.degree_u,
            degree_v: self.degree_v,
            knots_u,
            knots_v: self.knots_v.clone(),
            control_points: unflatten(&q),
            counts: (self.counts.0 + times, self.counts.1),
        })
    }

    /// Insert the knot `v` into the v direction, `times` times.
    pub fn insert_knot_v(&self, v: f64, times: usize) -> Result<Self> {
        let (span, mult) = check_insert(self.degree_v, &self.knots_v, self.counts.1, v, times)?;
        let ctrl = flatten(&self.control_points);
        let vmajor = transpose(&ctrl, self.counts.0, self.counts.1, 3);
        let (knots_v, q) = refine::insert_knot(
            self.degree_v,
            &self.knots_v,
            &vmajor,
            self.counts.0 * 3,
            v,
            span,
            mult,
            times,
        );
        let umajor = transpose(&q, self.counts.1 + times, self.counts.0, 3);
        Ok(Self {
            degree_u: self.degree_u,
            degree_v: self.degree_v,
            knots_u: self.knots_u.clone(),
            knots_v,
            control_points: unflatten(&umajor),
            counts: (self.counts.0, self.counts.1 + times),
        })
    }

    /// Insert a non-decreasing batch of interior knots in the u direction.
    pub fn refine_u(&self, xs: &[f64]) -> Result<Self> {
        check_refine(self.degree_u, &self.knots_u, xs)?;
        let ctrl = flatten(&self.control_points);
        let (knots_u, q) =
            refine::refine_knot_vector(self.degree_u, &self.knots_u, &ctrl, self.counts.1 * 3, xs);
        Ok(Self {
            degree_u: self.degree_u,
            degree_v: self.degree_v,
            knots_u,
            knots_v: self.knots_v.clone(),
            control_points: unflatten(&q),
            counts: (self.counts.0 + xs.len(), self.counts.1),
        })
    }

    /// Insert a non-decreasing batch of interior knots in the v direction.
    pub fn refine_v(&self, xs: &[f64]) -> Result<Self> {
        check_refine(self.degree_v, &self.knots_v, xs)?;
        let ctrl = flatten(&self.control_points);
        let vmajor = transpose(&ctrl, self.counts.0, self.counts.1, 3);
        let (knots_v, q) =
            refine::refine_knot_vector(self.degree_v, &self.knots_v, &vmajor, self.counts.0 * 3, xs);
        let umajor = transpose(&q, self.counts.1 + xs.len(), self.counts.0, 3);
        Ok(Self {
            degree_u: self.degree_u,
            degree_v: self.degree_v,
            knots_u: self.knots_u.clone(),
            knots_v,
            control_points: unflatten(&umajor),
            counts: (self.counts.0, self.counts.1 + xs.len()),
        })
    }
}

/// A tensor-product NURBS surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NurbsSurface {
    pub degree_u: usize,
    pub degree_v: usize,
    pub knots_u: Vec<f64>,
    pub knots_v: Vec<f64>,
    /// u-major control net, `counts.0 * counts.1` points.
    pub control_points: Vec<Point3>,
    pub weights: Vec<f64>,
    pub counts: (usize, usize),
}

impl NurbsSurface {
    pub fn try_new(
        degree_u: usize,
        degree_v: usize,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        control_points: Vec<Point3>,
        weights: Vec<f64>,
        counts: (usize, usize),
    ) -> Result<Self> {
        validate_grid(
            degree_u,
            degree_v,
            &knots_u,
            &knots_v,
            counts,
            control_points.len(),
        )?;
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
            degree_u,
            degree_v,
            knots_u,
            knots_v,
            control_points,
            weights,
            counts,
        })
    }

    pub fn domain_u(&self) -> (f64, f64) {
        let p = self.degree_u;
        (self.knots_u[p], self.knots_u[self.knots_u.len() - p - 1])
    }

    pub fn domain_v(&self) -> (f64, f64) {
        let p = self.degree_v;
        (self.knots_v[p], self.knots_v[self.knots_v.len() - p - 1])
    }

    pub fn point_at(&self, u: f64, v: f64) -> Point3 {
        let ctrl = flatten(&self.control_points);
        let pt = eval::evaluate(
            self.degree_u,
            self.degree_v,
            &self.knots_u,
            &self.knots_v,
            &ctrl,
            &self.weights,
            self.counts.1 - 1,
            3,
            &[u],
            &[v],
            Normalization::NSpline,
        );
        Point3::new(pt[0], pt[1], pt[2])
    }

    /// Point and first partials at `(u, v)` (quotient rule).
    pub fn derivs_at(&self, u: f64, v: f64) -> (Point3, Vector3, Vector3) {
        let ctrl = flatten(&self.control_points);
        let jet = eval::evaluate_derivs(
            self.degree_u,
            self.degree_v,
            &self.knots_u,
            &self.knots_v,
            &ctrl,
            &self.weights,
            self.counts.1 - 1,
            3,
            &[u],
            &[v],
            Normalization::NSpline,
        );
        (
            Point3::new(jet.value[0], jet.value[1], jet.value[2]),
            Vector3::new(jet.du[0], jet.du[1], jet.du[2]),
            Vector3::new(jet.dv[0], jet.dv[1], jet.dv[2]),
        )
    }

    /// Unit surface normal at `(u, v)`.
    pub fn normal_at(&self, u: f64, v: f64) -> Vector3 {
        let (_, du, dv) = self.derivs_at(u, v);
        let n = du.cross(dv);
        let len = n.length();
        if len > 0.0 {
            n / len
        } else {
            Vector3::ZERO
        }
    }

    /// Evaluate over the tensor grid of sites, in parallel across u-rows.
    pub fn evaluate(&self, sites_u: &[f64], sites_v: &[f64]) -> Vec<Point3> {
        let ctrl = flatten(&self.control_points);
        let pts = eval::evaluate(
            self.degree_u,
            self.degree_v,
            &self.knots_u,
            &self.knots_v,
            &ctrl,
            &self.weights,
            self.counts.1 - 1,
            3,
            sites_u,
            sites_v,
            Normalization::NSpline,
        );
        unflatten(&pts)
    }

    /// Insert the knot `u` into the u direction, `times` times, in
    /// homogeneous coordinates.
    pub fn insert_knot_u(&self, u: f64, times: usize) -> Result<Self> {
        let (span, mult) = check_insert(self.degree_u, &self.knots_u, self.counts.0, u, times)?;
        let pw = homogenize(&self.control_points, &self.weights);
        let (knots_u, qw) = refine::insert_knot(
            self.degree_u,
            &self.knots_u,
            &pw,
            self.counts.1 * 4,
            u,
            span,
            mult,
            times,
        );
        let (control_points, weights) = dehomogenize(&qw);
        Ok(Self {
            degree_u: self.degree_u,
            degree_v: self.degree_v,
            knots_u,
            knots_v: self.knots_v.clone(),
            control_points,
            weights,
            counts: (self.counts.0 + times, self.counts.1),
        })
    }

    /// Insert the knot `v` into the v direction, `times` times, in
    /// homogeneous coordinates.
    pub fn insert_knot_v(&self, v: f64, times: usize) -> Result<Self> {
        let (span, mult) = check_insert(self.degree_v, &self.knots_v, self.counts.1, v, times)?;
        let pw = homogenize(&self.control_points, &self.weights);
        let vmajor = transpose(&pw, self.counts.0, self.counts.1, 4);
        let (knots_v, qw) = refine::insert_knot(
            self.degree_v,
            &self.knots_v,
            &vmajor,
            self.counts.0 * 4,
            v,
            span,
            mult,
            times,
        );
        let umajor = transpose(&qw, self.counts.1 + times, self.counts.0, 4);
        let (control_points, weights) = dehomogenize(&umajor);
        Ok(Self {
            degree_u: self.degree_u,
            degree_v: self.degree_v,
            knots_u: self.knots_u.clone(),
            knots_v,
            control_points,
            weights,
            counts: (self.counts.0, self.counts.1 + times),
        })
    }

    /// Insert a non-decreasing batch of interior knots in the u direction.
    pub fn refine_u(&self, xs: &[f64]) -> Result<Self> {
        check_refine(self.degree_u, &self.knots_u, xs)?;
        let pw = homogenize(&self.control_points, &self.weights);
        let (knots_u, qw) =
            refine::refine_knot_vector(self.degree_u, &self.knots_u, &pw, self.counts.1 * 4, xs);
        let (control_points, weights) = dehomogenize(&qw);
        Ok(Self {
            degree_u: self.degree_u,
            degree_v: self.degree_v,
            knots_u,
            knots_v: self.knots_v.clone(),
            control_points,
            weights,
            counts: (self.counts.0 + xs.len(), self.counts.1),
        })
    }

    /// Insert a non-decreasing batch of interior knots in the v direction.
    pub fn refine_v(&self, xs: &[f64]) -> Result<Self> {
        check_refine(self.degree_v, &self.knots_v, xs)?;
        let pw = homogenize(&self.control_points, &self.weights);
        let vmajor = transpose(&pw, self.counts.0, self.counts.1, 4);
        let (knots_v, qw) =
            refine::refine_knot_vector(self.degree_v, &self.knots_v, &vmajor, self.counts.0 * 4, xs);
        let umajor = transpose(&qw, self.counts.1 + xs.len(), self.counts.0, 4);
        let (control_points, weights) = dehomogenize(&umajor);
        Ok(Self {
            degree_u: self.degree_u,
            degree_v: self.degree_v,
            knots_u: self.knots_u.clone(),
            knots_v,
            control_points,
            weights,
            counts: (self.counts.0, self.counts.1 + xs.len()),
        })
    }
}
