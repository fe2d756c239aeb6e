//! Point and derivative evaluation of (rational) B-spline curves, surfaces
//! and volumes over flat coordinate arrays.
//!
//! Batch entry points accept arrays of parameter sites per direction and
//! compute spans and basis windows once per distinct site, then combine
//! them across the tensor grid. Outputs are flat row-major grids with `dim`
//! contiguous components per site.

pub mod curve;
pub mod surface;
pub mod volume;

use nrb_basis::basis::{basis_funs, ders_basis_funs, mspline_scale, Normalization};
use nrb_basis::knot::find_span;

/// Span and (optionally rescaled) basis window for one parameter site.
pub(crate) fn site_basis(
    n: usize,
    p: usize,
    u: f64,
    knots: &[f64],
    norm: Normalization,
) -> (usize, Vec<f64>) {
    let span = find_span(n, p, u, knots);
    let mut vals = basis_funs(span, u, p, knots);
    if norm == Normalization::MSpline {
        mspline_scale(span, p, knots, &mut vals);
    }
    (span, vals)
}

/// Span and basis derivative table up to order `d` for one parameter site.
pub(crate) fn site_ders(
    n: usize,
    p: usize,
    u: f64,
    knots: &[f64],
    d: usize,
    norm: Normalization,
) -> (usize, Vec<Vec<f64>>) {
    let span = find_span(n, p, u, knots);
    let mut ders = ders_basis_funs(span, u, p, d, knots);
    if norm == Normalization::MSpline {
        for row in &mut ders {
            mspline_scale(span, p, knots, row);
        }
    }
    (span, ders)
}

/// Precompute spans and basis windows for a batch of sites in one direction.
pub(crate) fn batch_basis(
    n: usize,
    p: usize,
    sites: &[f64],
    knots: &[f64],
    norm: Normalization,
) -> Vec<(usize, Vec<f64>)> {
    sites
        .iter()
        .map(|&u| site_basis(n, p, u, knots, norm))
        .collect()
}

/// Precompute spans and derivative tables for a batch of sites.
pub(crate) fn batch_ders(
    n: usize,
    p: usize,
    sites: &[f64],
    knots: &[f64],
    d: usize,
    norm: Normalization,
) -> Vec<(usize, Vec<Vec<f64>>)> {
    sites
        .iter()
        .map(|&u| site_ders(n, p, u, knots, d, norm))
        .collect()
}
