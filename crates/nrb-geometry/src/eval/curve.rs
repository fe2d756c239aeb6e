//! Curve evaluation: points and derivatives up to second order.

use rayon::prelude::*;

use nrb_basis::basis::{basis_funs, Normalization};
use nrb_basis::knot::find_span;

use super::{batch_ders, site_basis};

/// Value and first/second derivatives of a rational curve at a batch of
/// sites. Each field is a flat `sites x dim` grid.
#[derive(Debug, Clone)]
pub struct CurveJet {
    pub value: Vec<f64>,
    pub du: Vec<f64>,
    pub duu: Vec<f64>,
}

/// Evaluate a non-rational B-spline curve point at `u`.
pub fn point(p: usize, knots: &[f64], ctrl: &[f64], dim: usize, u: f64) -> Vec<f64> {
    let n = ctrl.len() / dim - 1;
    let span = find_span(n, p, u, knots);
    let basis = basis_funs(span, u, p, knots);

    let mut out = vec![0.0; dim];
    for (i, &b) in basis.iter().enumerate() {
        let row = &ctrl[(span - p + i) * dim..][..dim];
        for (o, &c) in out.iter_mut().zip(row) {
            *o += b * c;
        }
    }
    out
}

/// Evaluate a rational curve at every site, in parallel across sites.
///
/// Each site contributes `basis * weight * coordinate` per active control
/// point; the coordinate sum is divided by the weight sum. Returns a flat
/// `sites.len() x dim` grid.
pub fn evaluate(
    p: usize,
    knots: &[f64],
    ctrl: &[f64],
    weights: &[f64],
    dim: usize,
    sites: &[f64],
    norm: Normalization,
) -> Vec<f64> {
    let n = ctrl.len() / dim - 1;
    let mut out = vec![0.0; sites.len() * dim];

    out.par_chunks_mut(dim)
        .zip(sites.par_iter())
        .for_each(|(slot, &u)| {
            let (span, basis) = site_basis(n, p, u, knots, norm);
            let mut w = 0.0;
            for (i, &b) in basis.iter().enumerate() {
                let idx = span - p + i;
                let bw = b * weights[idx];
                w += bw;
                for (o, &c) in slot.iter_mut().zip(&ctrl[idx * dim..][..dim]) {
                    *o += bw * c;
                }
            }
            for o in slot.iter_mut() {
                *o /= w;
            }
        });

    out
}

/// Evaluate a rational curve and its first and second derivatives at every
/// site, via the quotient rule over the weighted sums `A = Cw`:
///
/// `C  = A / w`
/// `C' = (A' - w' C) / w`
/// `C'' = (A'' - 2 w' C' - w'' C) / w`
pub fn evaluate_derivs(
    p: usize,
    knots: &[f64],
    ctrl: &[f64],
    weights: &[f64],
    dim: usize,
    sites: &[f64],
    norm: Normalization,
) -> CurveJet {
    let n = ctrl.len() / dim - 1;
    let r = sites.len();
    let mut jet = CurveJet {
        value: vec![0.0; r * dim],
        du: vec![0.0; r * dim],
        duu: vec![0.0; r * dim],
    };

    let tables = batch_ders(n, p, sites, knots, 2, norm);

    let mut a0 = vec![0.0; dim];
    let mut a1 = vec![0.0; dim];
    let mut a2 = vec![0.0; dim];

    for (s, (span, ders)) in tables.iter().enumerate() {
        a0.fill(0.0);
        a1.fill(0.0);
        a2.fill(0.0);
        let (mut w0, mut w1, mut w2) = (0.0, 0.0, 0.0);

        for i in 0..=p {
            let idx = span - p + i;
            let wt = weights[idx];
            let (b0, b1, b2) = (ders[0][i] * wt, ders[1][i] * wt, ders[2][i] * wt);
            w0 += b0;
            w1 += b1;
            w2 += b2;
            for (c, &x) in ctrl[idx * dim..][..dim].iter().enumerate() {
                a0[c] += b0 * x;
                a1[c] += b1 * x;
                a2[c] += b2 * x;
            }
        }

        let base = s * dim;
        for c in 0..dim {
            let v = a0[c] / w0;
            let d1 = (a1[c] - w1 * v) / w0;
            let d2 = (a2[c] - 2.0 * w1 * d1 - w2 * v) / w0;
            jet.value[base + c] = v;
            jet.du[base + c] = d1;
            jet.duu[base + c] = d2;
        }
    }

    jet
}
