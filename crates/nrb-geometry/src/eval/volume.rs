//! Tensor-product volume evaluation: points and partial derivatives.

use rayon::prelude::*;

use nrb_basis::basis::{basis_funs, Normalization};
use nrb_basis::knot::find_span;

use super::{batch_basis, batch_ders};

/// Value and all first/second partial derivatives of a rational volume over
/// a tensor grid of sites. Fields are flat `su x sv x sw x dim` grids
/// (u-major); only one of each symmetric pair of mixed partials is produced.
#[derive(Debug, Clone)]
pub struct VolumeJet {
    pub value: Vec<f64>,
    pub du: Vec<f64>,
    pub dv: Vec<f64>,
    pub dw: Vec<f64>,
    pub duu: Vec<f64>,
    pub duv: Vec<f64>,
    pub duw: Vec<f64>,
    pub dvv: Vec<f64>,
    pub dvw: Vec<f64>,
    pub dww: Vec<f64>,
}

/// Evaluate a non-rational B-spline volume point at `(u, v, w)`.
///
/// `ctrl` is a flat `(nu + 1) x (nv + 1) x (nw + 1) x dim` grid, u-major.
#[allow(clippy::too_many_arguments)]
pub fn point(
    degrees: (usize, usize, usize),
    knots_u: &[f64],
    knots_v: &[f64],
    knots_w: &[f64],
    ctrl: &[f64],
    nv: usize,
    nw: usize,
    dim: usize,
    u: f64,
    v: f64,
    w: f64,
) -> Vec<f64> {
    let (pu, pv, pw) = degrees;
    let nu = ctrl.len() / (dim * (nv + 1) * (nw + 1)) - 1;
    let span_u = find_span(nu, pu, u, knots_u);
    let span_v = find_span(nv, pv, v, knots_v);
    let span_w = find_span(nw, pw, w, knots_w);
    let basis_u = basis_funs(span_u, u, pu, knots_u);
    let basis_v = basis_funs(span_v, v, pv, knots_v);
    let basis_w = basis_funs(span_w, w, pw, knots_w);

    let mut out = vec![0.0; dim];
    for (i, &bu) in basis_u.iter().enumerate() {
        let plane = (span_u - pu + i) * (nv + 1);
        for (j, &bv) in basis_v.iter().enumerate() {
            let row = (plane + span_v - pv + j) * (nw + 1);
            let buv = bu * bv;
            for (k, &bw) in basis_w.iter().enumerate() {
                let idx = (row + span_w - pw + k) * dim;
                let b = buv * bw;
                for (o, &c) in out.iter_mut().zip(&ctrl[idx..idx + dim]) {
                    *o += b * c;
                }
            }
        }
    }
    out
}

/// Evaluate a rational volume over the tensor grid `sites_u x sites_v x
/// sites_w`, in parallel across u-slabs of the grid.
#[allow(clippy::too_many_arguments)]
pub fn evaluate(
    degrees: (usize, usize, usize),
    knots_u: &[f64],
    knots_v: &[f64],
    knots_w: &[f64],
    ctrl: &[f64],
    weights: &[f64],
    nv: usize,
    nw: usize,
    dim: usize,
    sites_u: &[f64],
    sites_v: &[f64],
    sites_w: &[f64],
    norm: Normalization,
) -> Vec<f64> {
    let (pu, pv, pw) = degrees;
    let nu = ctrl.len() / (dim * (nv + 1) * (nw + 1)) - 1;
    let tab_u = batch_basis(nu, pu, sites_u, knots_u, norm);
    let tab_v = batch_basis(nv, pv, sites_v, knots_v, norm);
    let tab_w = batch_basis(nw, pw, sites_w, knots_w, norm);

    let slab = sites_v.len() * sites_w.len() * dim;
    let mut out = vec![0.0; sites_u.len() * slab];

    out.par_chunks_mut(slab)
        .zip(tab_u.par_iter())
        .for_each(|(slab_out, (span_u, basis_u))| {
            for (jv, (span_v, basis_v)) in tab_v.iter().enumerate() {
                for (jw, (span_w, basis_w)) in tab_w.iter().enumerate() {
                    let slot = &mut slab_out[(jv * tab_w.len() + jw) * dim..][..dim];
                    let mut wsum = 0.0;
                    for (i, &bu) in basis_u.iter().enumerate() {
                        let plane = (span_u - pu + i) * (nv + 1);
                        for (j, &bv) in basis_v.iter().enumerate() {
                            let row = (plane + span_v - pv + j) * (nw + 1);
                            let buv = bu * bv;
                            for (k, &bw) in basis_w.iter().enumerate() {
                                let idx = row + span_w - pw + k;
                                let bwt = buv * bw * weights[idx];
                                wsum += bwt;
                                for (o, &c) in slot.iter_mut().zip(&ctrl[idx * dim..][..dim]) {
                                    *o += bwt * c;
                                }
                            }
                        }
                    }
                    for o in slot.iter_mut() {
                        *o /= wsum;
                    }
                }
            }
        });

    out
}

/// Derivative orders per direction for the ten jet components.
const ORDERS: [(usize, usize, usize); 10] = [
    (0, 0, 0),
    (1, 0, 0),
    (0, 1, 0),
    (0, 0, 1),
    (2, 0, 0),
    (1, 1, 0),
    (1, 0, 1),
    (0, 2, 0),
    (0, 1, 1),
    (0, 0, 2),
];

/// Evaluate a rational volume and all its partials up to second order over
/// a tensor grid. Quotient-rule combinations mirror the curve and surface
/// cases, with one cross term per mixed partial:
///
/// `C_uv = (A_uv - w_u C_v - w_v C_u - w_uv C) / w`
#[allow(clippy::too_many_arguments)]
pub fn evaluate_derivs(
    degrees: (usize, usize, usize),
    knots_u: &[f64],
    knots_v: &[f64],
    knots_w: &[f64],
    ctrl: &[f64],
    weights: &[f64],
    nv: usize,
    nw: usize,
    dim: usize,
    sites_u: &[f64],
    sites_v: &[f64],
    sites_w: &[f64],
    norm: Normalization,
) -> VolumeJet {
    let (pu, pv, pw) = degrees;
    let nu = ctrl.len() / (dim * (nv + 1) * (nw + 1)) - 1;
    let tab_u = batch_ders(nu, pu, sites_u, knots_u, 2, norm);
    let tab_v = batch_ders(nv, pv, sites_v, knots_v, 2, norm);
    let tab_w = batch_ders(nw, pw, sites_w, knots_w, 2, norm);

    let grid = sites_u.len() * sites_v.len() * sites_w.len() * dim;
    let mut jet = VolumeJet {
        value: vec![0.0; grid],
        du: vec![0.0; grid],
        dv: vec![0.0; grid],
        dw: vec![0.0; grid],
        duu: vec![0.0; grid],
        duv: vec![0.0; grid],
        duw: vec![0.0; grid],
        dvv: vec![0.0; grid],
        dvw: vec![0.0; grid],
        dww: vec![0.0; grid],
    };

    let mut a = vec![vec![0.0; dim]; 10];
    let mut site = 0usize;

    for (span_u, du_tab) in &tab_u {
        for (span_v, dv_tab) in &tab_v {
            for (span_w, dw_tab) in &tab_w {
                for row in a.iter_mut() {
                    row.fill(0.0);
                }
                let mut ws = [0.0; 10];

                for i in 0..=pu {
                    let plane = (span_u - pu + i) * (nv + 1);
                    for j in 0..=pv {
                        let row = (plane + span_v - pv + j) * (nw + 1);
                        for k in 0..=pw {
                            let idx = row + span_w - pw + k;
                            let wt = weights[idx];
                            let coords = &ctrl[idx * dim..][..dim];
                            for (t, &(au, av, aw)) in ORDERS.iter().enumerate() {
                                let b = du_tab[au][i] * dv_tab[av][j] * dw_tab[aw][k] * wt;
                                ws[t] += b;
                                for (o, &c) in a[t].iter_mut().zip(coords) {
                                    *o += b * c;
                                }
                            }
                        }
                    }
                }

                let base = site * dim;
                for c in 0..dim {
                    let w0 = ws[0];
                    let v0 = a[0][c] / w0;
                    let cu = (a[1][c] - ws[1] * v0) / w0;
                    let cv = (a[2][c] - ws[2] * v0) / w0;
                    let cw = (a[3][c] - ws[3] * v0) / w0;
                    jet.value[base + c] = v0;
                    jet.du[base + c] = cu;
                    jet.dv[base + c] = cv;
                    jet.dw[base + c] = cw;
                    jet.duu[base + c] = (a[4][c] - 2.0 * ws[1] * cu - ws[4] * v0) / w0;
                    jet.duv[base + c] = (a[5][c] - ws[1] * cv - ws[2] * cu - ws[5] * v0) / w0;
                    jet.duw[base + c] = (a[6][c] - ws[1] * cw - ws[3] * cu - ws[6] * v0) / w0;
                    jet.dvv[base + c] = (a[7][c] - 2.0 * ws[2] * cv - ws[7] * v0) / w0;
                    jet.dvw[base + c] = (a[8][c] - ws[2] * cw - ws[3] * cv - ws[8] * v0) / w0;
                    jet.dww[base + c] = (a[9][c] - 2.0 * ws[3] * cw - ws[9] * v0) / w0;
                }
                site += 1;
            }
        }
    }

    jet
}
