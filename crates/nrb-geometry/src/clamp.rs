//! Clamping and unclamping of end conditions.
//!
//! Both transforms keep the array sizes fixed: end knots are rewritten and
//! the first/last `p - 1` control points are adjusted through the same
//! convex-combination recurrence used by knot insertion (run forward to
//! clamp, solved backward to unclamp). Inputs are copied, never aliased.

/// Convert a clamped (open) spline to free end conditions on the selected
/// ends, recomputing ghost knots from interior spacing and solving the end
/// control points by back-substitution.
pub fn unclamp(
    p: usize,
    knots: &[f64],
    ctrl: &[f64],
    dim: usize,
    left: bool,
    right: bool,
) -> (Vec<f64>, Vec<f64>) {
    let n = ctrl.len() / dim - 1;
    let mut u = knots.to_vec();
    let mut q = ctrl.to_vec();

    if left {
        for i in 0..p.saturating_sub(1) {
            u[p - i - 1] = u[p - i] - (u[n - i + 1] - u[n - i]);
            let mut k = p - 1;
            for j in (0..=i).rev() {
                let alfa = (u[p] - u[k]) / (u[p + j + 1] - u[k]);
                for c in 0..dim {
                    q[j * dim + c] =
                        (q[j * dim + c] - alfa * q[(j + 1) * dim + c]) / (1.0 - alfa);
                }
                k -= 1;
            }
        }
        // First knot from the spacing at the far end
        u[0] = u[1] - (u[n - p + 2] - u[n - p + 1]);
    }

    if right {
        for i in 0..p.saturating_sub(1) {
            u[n + i + 2] = u[n + i + 1] + (u[p + i + 1] - u[p + i]);
            for j in (0..=i).rev() {
                let alfa = (u[n + 1] - u[n - j]) / (u[n - j + i + 2] - u[n - j]);
                for c in 0..dim {
                    q[(n - j) * dim + c] = (q[(n - j) * dim + c]
                        - (1.0 - alfa) * q[(n - j - 1) * dim + c])
                        / alfa;
                }
            }
        }
        u[n + p + 1] = u[n + p] + (u[2 * p] - u[2 * p - 1]);
    }

    (u, q)
}

/// Convert a spline with free end conditions back to clamped (open) ends.
///
/// Exact inverse of [`unclamp`]: the same convex combinations are applied
/// forward, in reverse iteration order, with the coefficients taken from
/// the unclamped input knots; then the end knots are overwritten to full
/// multiplicity `p + 1`.
pub fn clamp(
    p: usize,
    knots: &[f64],
    ctrl: &[f64],
    dim: usize,
    left: bool,
    right: bool,
) -> (Vec<f64>, Vec<f64>) {
    let n = ctrl.len() / dim - 1;
    let mut u = knots.to_vec();
    let mut q = ctrl.to_vec();

    if left {
        for i in (0..p.saturating_sub(1)).rev() {
            for j in 0..=i {
                let k = p - 1 - (i - j);
                let alfa = (knots[p] - knots[k]) / (knots[p + j + 1] - knots[k]);
                for c in 0..dim {
                    q[j * dim + c] =
                        (1.0 - alfa) * q[j * dim + c] + alfa * q[(j + 1) * dim + c];
                }
            }
        }
        for v in u.iter_mut().take(p) {
            *v = knots[p];
        }
    }

    if right {
        for i in (0..p.saturating_sub(1)).rev() {
            for j in 0..=i {
                let alfa = (knots[n + 1] - knots[n - j]) / (knots[n - j + i + 2] - knots[n - j]);
                for c in 0..dim {
                    q[(n - j) * dim + c] = alfa * q[(n - j) * dim + c]
                        + (1.0 - alfa) * q[(n - j - 1) * dim + c];
                }
            }
        }
        for v in u.iter_mut().skip(n + 2) {
            *v = knots[n + 1];
        }
    }

    (u, q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::curve;
    use approx::assert_relative_eq;

    fn uniform_curve() -> (usize, Vec<f64>, Vec<f64>) {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0];
        let ctrl = vec![0.0, 0.0, 1.0, 2.0, 2.0, -1.0, 3.0, 1.5, 4.0, 0.0];
        (2, knots, ctrl)
    }

    #[test]
    fn test_unclamp_uniform_knots() {
        let (p, knots, ctrl) = uniform_curve();
        let (u, _) = unclamp(p, &knots, &ctrl, 2, true, true);
        assert_eq!(u, vec![-2.0, -1.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_unclamp_preserves_curve_on_domain() {
        let (p, knots, ctrl) = uniform_curve();
        let (u, q) = unclamp(p, &knots, &ctrl, 2, true, true);
        for i in 0..=30 {
            let s = 3.0 * i as f64 / 30.0;
            let before = curve::point(p, &knots, &ctrl, 2, s);
            let after = curve::point(p, &u, &q, 2, s);
            assert_relative_eq!(before[0], after[0], epsilon = 1e-12);
            assert_relative_eq!(before[1], after[1], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_clamp_inverts_unclamp() {
        let (p, knots, ctrl) = uniform_curve();
        let (u, q) = unclamp(p, &knots, &ctrl, 2, true, true);
        let (u2, q2) = clamp(p, &u, &q, 2, true, true);

        assert_eq!(u2.len(), knots.len());
        for (a, b) in u2.iter().zip(&knots) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
        for (a, b) in q2.iter().zip(&ctrl) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_clamp_inverts_unclamp_cubic() {
        let knots = vec![0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 4.0, 4.0, 4.0, 4.0];
        let ctrl = vec![
            0.0, 0.0, 0.5, 1.0, 1.5, 1.2, 2.5, -0.3, 3.0, 0.4, 4.0, 0.0,
        ];
        let p = 3;
        let (u, q) = unclamp(p, &knots, &ctrl, 2, true, true);
        let (u2, q2) = clamp(p, &u, &q, 2, true, true);
        for (a, b) in u2.iter().zip(&knots) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
        for (a, b) in q2.iter().zip(&ctrl) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_unclamp_one_end_only() {
        let (p, knots, ctrl) = uniform_curve();
        let (u, q) = unclamp(p, &knots, &ctrl, 2, false, true);
        // Left end untouched
        assert_eq!(&u[..3], &knots[..3]);
        assert_eq!(&q[..2], &ctrl[..2]);
        assert_eq!(u[6], 4.0);
        assert_eq!(u[7], 5.0);
    }
}
