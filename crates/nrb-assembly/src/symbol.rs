//! Stiffness symbol of the uniform cardinal basis.

use nalgebra::DMatrix;

use nrb_basis::basis::ders_basis_funs;
use nrb_basis::knot::find_span;

/// Galerkin stiffness coefficients of degree-`p` cardinal B-splines at
/// integer offsets `0..=p`, via the convolution identity
/// `int N_p'(x) N_p'(x - k) dx = -N_{2p+1}''(p + 1 + k)`.
///
/// The right-hand side is read off a single derivative table on a synthetic
/// uniform integer knot vector, evaluated at the knot `q + p + 1` where all
/// `q + 1` active functions of degree `q = 2p + 1` are full cardinal
/// splines.
fn cardinal_stiffness_coefficients(p: usize) -> Vec<f64> {
    let q = 2 * p + 1;
    let knots: Vec<f64> = (0..=3 * q + 2).map(|i| i as f64).collect();
    let n = 2 * q + 1;
    let x = (q + p + 1) as f64;

    let span = find_span(n, q, x, &knots);
    let ders = ders_basis_funs(span, x, q, 2, &knots);
    (0..=p).map(|k| -ders[2][p - k]).collect()
}

/// Assemble the symmetric banded Toeplitz `(n + 1) x (n + 1)` stiffness
/// symbol: entry `(i, j)` is the cardinal stiffness coefficient at offset
/// `|i - j|`, zero beyond the band `|i - j| > p`.
pub fn symbol_stiffness_matrix(n: usize, p: usize) -> DMatrix<f64> {
    let coeffs = cardinal_stiffness_coefficients(p);
    let mut m = DMatrix::zeros(n + 1, n + 1);
    for i in 0..=n {
        for j in i.saturating_sub(p)..=(i + p).min(n) {
            m[(i, j)] = coeffs[i.abs_diff(j)];
        }
    }
    m
}
