//! Cox-de Boor basis function evaluation and differentiation.

/// Basis normalization selected by evaluation entry points.
///
/// `NSpline` is the standard partition-of-unity basis. `MSpline` rescales
/// each basis value by `(p + 1) / support_width`, giving unit-integral
/// basis functions. The scaling is linear, so it applies unchanged to
/// derivative rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    #[default]
    NSpline,
    MSpline,
}

/// Compute the `p + 1` non-vanishing basis functions at `u` in span `span`.
///
/// Iterative triangular Cox-de Boor recurrence with `left`/`right`
/// difference buffers: O(p^2) time, O(p) space.
pub fn basis_funs(span: usize, u: f64, p: usize, knots: &[f64]) -> Vec<f64> {
    let mut n = vec![0.0; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];

    n[0] = 1.0;

    for j in 1..=p {
        left[j] = u - knots[span + 1 - j];
        right[j] = knots[span + j] - u;
        let mut saved = 0.0;

        for r in 0..j {
            let temp = n[r] / (right[r + 1] + left[j - r]);
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }

        n[j] = saved;
    }

    n
}

/// Compute basis functions and derivatives up to order `d` at `u`.
///
/// Returns a `(d + 1) x (p + 1)` table: row `k` holds the `k`-th derivatives
/// of the `p + 1` non-vanishing basis functions. Row 0 is identical to
/// [`basis_funs`] (same recurrence, retained triangular table). Rows beyond
/// order `p` are zero.
///
/// Phase one builds the full `ndu` table of undivided differences; phase two
/// runs the derivative recurrence per basis index `r` over a two-row rolling
/// buffer `a`, skipping terms whose index falls outside the valid triangular
/// range (`r - k < 0` or `r > p - k`), then scales by falling factorials
/// of `p`.
pub fn ders_basis_funs(span: usize, u: f64, p: usize, d: usize, knots: &[f64]) -> Vec<Vec<f64>> {
    let mut ndu = vec![vec![0.0; p + 1]; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];

    ndu[0][0] = 1.0;

    for j in 1..=p {
        left[j] = u - knots[span + 1 - j];
        right[j] = knots[span + j] - u;
        let mut saved = 0.0;

        for r in 0..j {
            // Lower triangle: knot differences
            ndu[j][r] = right[r + 1] + left[j - r];
            let temp = ndu[r][j - 1] / ndu[j][r];

            // Upper triangle: basis values
            ndu[r][j] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        ndu[j][j] = saved;
    }

    let mut ders = vec![vec![0.0; p + 1]; d + 1];
    for j in 0..=p {
        ders[0][j] = ndu[j][p];
    }

    let du = d.min(p);
    let mut a = vec![vec![0.0; p + 1]; 2];

    for r in 0..=p {
        let mut s1 = 0usize;
        let mut s2 = 1usize;
        a[0][0] = 1.0;

        for k in 1..=du {
            let mut dv = 0.0;
            let rk = r as isize - k as isize;
            let pk = p - k;

            if r >= k {
                a[s2][0] = a[s1][0] / ndu[pk + 1][rk as usize];
                dv = a[s2][0] * ndu[rk as usize][pk];
            }

            let j1 = if rk >= -1 { 1 } else { (-rk) as usize };
            let j2 = if r <= pk + 1 { k - 1 } else { p - r };

            for j in j1..=j2 {
                let col = (rk + j as isize) as usize;
                a[s2][j] = (a[s1][j] - a[s1][j - 1]) / ndu[pk + 1][col];
                dv += a[s2][j] * ndu[col][pk];
            }

            if r <= pk {
                a[s2][k] = -a[s1][k - 1] / ndu[pk + 1][r];
                dv += a[s2][k] * ndu[r][pk];
            }

            ders[k][r] = dv;
            std::mem::swap(&mut s1, &mut s2);
        }
    }

    // Convert to true derivatives: multiply row k by p (p-1) ... (p-k+1)
    let mut factor = p as f64;
    for k in 1..=du {
        for v in &mut ders[k] {
            *v *= factor;
        }
        factor *= (p - k) as f64;
    }

    ders
}

/// Rescale the `p + 1` basis values at `span` from N-splines to M-splines.
///
/// Basis index `j = span - p + i` is scaled by
/// `(p + 1) / (knots[j + p + 1] - knots[j])`, the reciprocal mean width of
/// its support, so each scaled function integrates to one.
pub fn mspline_scale(span: usize, p: usize, knots: &[f64], values: &mut [f64]) {
    for (i, v) in values.iter_mut().enumerate() {
        let j = span - p + i;
        *v *= (p + 1) as f64 / (knots[j + p + 1] - knots[j]);
    }
}
