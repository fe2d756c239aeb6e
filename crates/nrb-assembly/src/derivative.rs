//! Derivative operator on spline coefficients.

use nalgebra::DMatrix;

/// Assemble the `(n + 1) x (n + 1)` lower-bidiagonal matrix mapping basis
/// coefficients to derivative-basis coefficients: row `i` holds `+s_i` on
/// the diagonal and `-s_i` at `(i, i - 1)`, with
/// `s_i = p / (knots[i + p + 1] - knots[i])`. With `normalized` the scale
/// is dropped (it is already carried by an M-spline basis) and the entries
/// are plain first differences.
///
/// Rows whose knot support is collapsed (multiplicity above `p`) are left
/// zero; the corresponding basis function vanishes.
pub fn derivative_matrix(n: usize, p: usize, knots: &[f64], normalized: bool) -> DMatrix<f64> {
    let mut m = DMatrix::zeros(n + 1, n + 1);
    for i in 0..=n {
        let width = knots[i + p + 1] - knots[i];
        if width == 0.0 {
            continue;
        }
        let s = if normalized { 1.0 } else { p as f64 / width };
        m[(i, i)] = s;
        if i > 0 {
            m[(i, i - 1)] = -s;
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bidiagonal_structure_bezier() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let m = derivative_matrix(2, 2, &knots, false);

        let mut nonzero: Vec<(usize, usize)> = Vec::new();
        for i in 0..3 {
            for j in 0..3 {
                if m[(i, j)] != 0.0 {
                    nonzero.push((i, j));
                }
            }
        }
        assert_eq!(nonzero, vec![(0, 0), (1, 0), (1, 1), (2, 1), (2, 2)]);
    }

    #[test]
    fn test_scales_from_knot_support() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0];
        let m = derivative_matrix(4, 2, &knots, false);
        // s_0 = 2 / (knots[3] - knots[0]) = 2, s_2 = 2 / (knots[5] - knots[2]) = 2/3
        assert_relative_eq!(m[(0, 0)], 2.0, epsilon = 1e-14);
        assert_relative_eq!(m[(2, 2)], 2.0 / 3.0, epsilon = 1e-14);
        assert_relative_eq!(m[(2, 1)], -2.0 / 3.0, epsilon = 1e-14);
    }

    #[test]
    fn test_normalized_drops_scale() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0];
        let m = derivative_matrix(4, 2, &knots, true);
        for i in 0..5 {
            assert_eq!(m[(i, i)], 1.0);
            if i > 0 {
                assert_eq!(m[(i, i - 1)], -1.0);
            }
        }
    }

    #[test]
    fn test_constant_coefficients_map_to_zero() {
        // A constant spline has zero derivative: the matrix applied to the
        // all-ones vector vanishes away from the first row.
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0];
        let m = derivative_matrix(4, 2, &knots, false);
        let ones = nalgebra::DVector::from_element(5, 1.0);
        let d = &m * ones;
        for i in 1..5 {
            assert_relative_eq!(d[i], 0.0, epsilon = 1e-14);
        }
    }
}
