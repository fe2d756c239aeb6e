//! Collocation matrices: basis values sampled at parameter sites.

use nalgebra::DMatrix;

use nrb_basis::basis::{basis_funs, mspline_scale, Normalization};
use nrb_basis::knot::find_span;

fn site_row(n: usize, p: usize, u: f64, knots: &[f64], norm: Normalization) -> (usize, Vec<f64>) {
    let span = find_span(n, p, u, knots);
    let mut vals = basis_funs(span, u, p, knots);
    if norm == Normalization::MSpline {
        mspline_scale(span, p, knots, &mut vals);
    }
    (span, vals)
}

/// Assemble the `sites.len() x (n + 1)` collocation matrix: row `r` holds
/// the `p + 1` active basis values at `sites[r]`, scattered into columns
/// `span - p ..= span`.
pub fn collocation_matrix(
    n: usize,
    p: usize,
    knots: &[f64],
    sites: &[f64],
    norm: Normalization,
) -> DMatrix<f64> {
    let mut m = DMatrix::zeros(sites.len(), n + 1);
    for (r, &u) in sites.iter().enumerate() {
        let (span, vals) = site_row(n, p, u, knots, norm);
        for (i, &v) in vals.iter().enumerate() {
            m[(r, span - p + i)] = v;
        }
    }
    m
}

/// Periodic collocation matrix with `n - r` columns, for a basis of
/// regularity `r` across the seam: the `r + 1` functions straddling the
/// seam are identified with the leading ones, so active column indices wrap
/// modulo the reduced dimension. Contributions that wrap onto the same
/// column accumulate.
pub fn collocation_periodic_matrix(
    n: usize,
    p: usize,
    r: usize,
    knots: &[f64],
    sites: &[f64],
    norm: Normalization,
) -> DMatrix<f64> {
    let cols = n - r;
    let mut m = DMatrix::zeros(sites.len(), cols);
    for (row, &u) in sites.iter().enumerate() {
        let (span, vals) = site_row(n, p, u, knots, norm);
        for (i, &v) in vals.iter().enumerate() {
            m[(row, (span - p + i) % cols)] += v;
        }
    }
    m
}
