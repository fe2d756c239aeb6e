//! Knot vector queries: span search, multiplicity, elements, Greville sites.

/// Find the knot span index containing parameter `u`.
///
/// Returns the unique `k` with `knots[k] <= u < knots[k+1]`, except at the
/// right boundary: `u >= knots[n+1]` returns `n` (the parameter is clamped
/// into the last span). This right-closed/left-open convention decides which
/// `p + 1` control points are active and must be matched by every caller.
///
/// # Arguments
/// * `n` - Number of control points minus 1
/// * `p` - Degree of the B-spline
/// * `u` - Parameter value
/// * `knots` - The knot vector, length `n + p + 2`
pub fn find_span(n: usize, p: usize, u: f64, knots: &[f64]) -> usize {
    if u >= knots[n + 1] {
        return n;
    }
    if u <= knots[p] {
        return p;
    }

    let mut low = p;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;

    while u < knots[mid] || u >= knots[mid + 1] {
        if u < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }

    mid
}

/// Count the multiplicity of the value `u` in the neighborhood of span `i`.
///
/// Scans `knots[i-p ..= i+p+1]` (clamped to the slice) for exact
/// floating-point matches. No epsilon is applied: callers are expected to
/// pass knot values snapped to entries of the vector.
pub fn find_mult(i: usize, u: f64, p: usize, knots: &[f64]) -> usize {
    let lo = i.saturating_sub(p);
    let hi = (i + p + 1).min(knots.len() - 1);
    knots[lo..=hi].iter().filter(|&&k| k == u).count()
}

/// Find the span containing `u` together with the multiplicity of `u`.
pub fn find_span_mult(n: usize, p: usize, u: f64, knots: &[f64]) -> (usize, usize) {
    let span = find_span(n, p, u, knots);
    (span, find_mult(span, u, p, knots))
}

/// Distinct breakpoints of the knot vector, from `knots[p]` to `knots[n+1]`.
///
/// These are the element boundaries used to define integration and
/// evaluation cells; the number of nonzero-measure elements is
/// `breakpoints(...).len() - 1`.
pub fn breakpoints(n: usize, p: usize, knots: &[f64]) -> Vec<f64> {
    let mut grid = vec![knots[p]];
    let mut last = knots[p];
    for &k in &knots[p + 1..=n + 1] {
        if k > last {
            grid.push(k);
            last = k;
        }
    }
    grid
}

/// Span index of every knot interval with nonzero measure, in order.
pub fn element_spans(n: usize, p: usize, knots: &[f64]) -> Vec<usize> {
    (p..=n).filter(|&i| knots[i] != knots[i + 1]).collect()
}

/// Greville abscissae: `x[i] = mean(knots[i+1 ..= i+p])`.
///
/// The canonical collocation/interpolation sites associated with each of the
/// `n + 1` control points. Requires `p >= 1`.
pub fn greville(n: usize, p: usize, knots: &[f64]) -> Vec<f64> {
    (0..=n)
        .map(|i| knots[i + 1..=i + p].iter().sum::<f64>() / p as f64)
        .collect()
}

/// Symmetrize a knot vector for periodic spline construction.
///
/// Reflects `nu = r + 1` knots at each end by the knot-vector period
/// `knots[n+1] - knots[p]`, so that the first/last `nu` knots repeat the
/// pattern of the interior ones. The output has the same length as the
/// input. `r` is the spline regularity at the seam and must satisfy
/// `r < p`.
pub fn symmetrize_knots(n: usize, p: usize, r: usize, knots: &[f64]) -> Vec<f64> {
    let period = knots[n + 1] - knots[p];
    let nu = r + 1;
    let mut out = knots.to_vec();
    for i in 1..=nu {
        out[p - i] = knots[n + 1 - i] - period;
        out[n + 1 + i] = knots[p + i] + period;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_span_uniform() {
        // Degree 2, 5 control points, uniform knot vector
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0];
        let n = 4;
        let p = 2;

        assert_eq!(find_span(n, p, 0.0, &knots), 2);
        assert_eq!(find_span(n, p, 0.5, &knots), 2);
        assert_eq!(find_span(n, p, 1.0, &knots), 3);
        assert_eq!(find_span(n, p, 1.5, &knots), 3);
        assert_eq!(find_span(n, p, 2.5, &knots), 4);
        assert_eq!(find_span(n, p, 3.0, &knots), 4);
    }

    #[test]
    fn test_find_span_bezier() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        assert_eq!(find_span(2, 2, 0.5, &knots), 2);
        assert_eq!(find_span(2, 2, 0.0, &knots), 2);
        assert_eq!(find_span(2, 2, 1.0, &knots), 2);
    }

    #[test]
    fn test_find_span_matches_interval() {
        // For every span k with nonzero measure and samples u in
        // [knots[k], knots[k+1]), find_span must return k.
        let knots = vec![0.0, 0.0, 0.0, 0.0, 0.5, 1.5, 1.5, 2.0, 3.0, 3.0, 3.0, 3.0];
        let p = 3;
        let n = knots.len() - p - 2;
        for k in p..=n {
            if knots[k] == knots[k + 1] {
                continue;
            }
            for s in 0..10 {
                let u = knots[k] + (knots[k + 1] - knots[k]) * s as f64 / 10.0;
                assert_eq!(find_span(n, p, u, &knots), k, "u = {}", u);
            }
        }
        assert_eq!(find_span(n, p, knots[n + 1], &knots), n);
    }

    #[test]
    fn test_find_mult() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        assert_eq!(find_mult(2, 0.0, 2, &knots), 3);
        assert_eq!(find_mult(2, 1.0, 2, &knots), 3);
        assert_eq!(find_mult(2, 0.5, 2, &knots), 0);

        let knots = vec![0.0, 0.0, 0.0, 0.5, 0.5, 1.0, 2.0, 2.0, 2.0];
        let (span, mult) = find_span_mult(5, 2, 0.5, &knots);
        assert_eq!(span, 4);
        assert_eq!(mult, 2);
    }

    #[test]
    fn test_breakpoints_skips_repeats() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 2.0, 3.0, 3.0, 3.0];
        let p = 2;
        let n = knots.len() - p - 2;
        assert_eq!(breakpoints(n, p, &knots), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_element_spans() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 2.0, 3.0, 3.0, 3.0];
        let p = 2;
        let n = knots.len() - p - 2;
        assert_eq!(element_spans(n, p, &knots), vec![2, 3, 5]);
    }

    #[test]
    fn test_greville_clamped() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        assert_eq!(greville(2, 2, &knots), vec![0.0, 0.5, 1.0]);

        // Greville sites of a clamped vector start and end at the domain ends
        let knots = vec![0.0, 0.0, 0.0, 0.0, 0.4, 1.0, 1.0, 1.0, 1.0];
        let p = 3;
        let n = knots.len() - p - 2;
        let x = greville(n, p, &knots);
        assert_eq!(x.len(), n + 1);
        assert_eq!(x[0], 0.0);
        assert_eq!(x[n], 1.0);
        for w in x.windows(2) {
            assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn test_symmetrize_knots_uniform() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0];
        let p = 2;
        let n = knots.len() - p - 2;
        let sym = symmetrize_knots(n, p, 1, &knots);
        assert_eq!(sym, vec![-2.0, -1.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(sym.len(), knots.len());
    }
}
