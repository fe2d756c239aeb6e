//! Boehm knot insertion, batch refinement, and tolerance-gated removal.
//!
//! All routines take a flat `(n + 1) x dim` control array (homogeneous
//! coordinates for rational splines) and return freshly allocated
//! `(knots, ctrl)` pairs; inputs are never mutated.

use nrb_basis::knot::find_span;

#[inline]
fn row(ctrl: &[f64], i: usize, dim: usize) -> &[f64] {
    &ctrl[i * dim..(i + 1) * dim]
}

#[inline]
fn copy_row(dst: &mut [f64], di: usize, src: &[f64], si: usize, dim: usize) {
    dst[di * dim..(di + 1) * dim].copy_from_slice(&src[si * dim..(si + 1) * dim]);
}

/// Insert the knot `u` (span `span`, current multiplicity `mult`) `times`
/// times using Boehm's algorithm.
///
/// Unaffected control points are copied verbatim; the affected window is
/// recomputed by repeated convex combinations with
/// `alpha = (u - knots[l+i]) / (knots[i+span+1] - knots[l+i])`.
///
/// Contract: `times + mult <= p`. The kernel does not check this; the
/// wrapper layer does.
pub fn insert_knot(
    p: usize,
    knots: &[f64],
    ctrl: &[f64],
    dim: usize,
    u: f64,
    span: usize,
    mult: usize,
    times: usize,
) -> (Vec<f64>, Vec<f64>) {
    if times == 0 {
        return (knots.to_vec(), ctrl.to_vec());
    }

    let n = ctrl.len() / dim - 1;
    let m = n + p + 1;
    let (k, s, r) = (span, mult, times);

    let mut uq = vec![0.0; m + r + 1];
    uq[..=k].copy_from_slice(&knots[..=k]);
    for i in 1..=r {
        uq[k + i] = u;
    }
    for i in k + 1..=m {
        uq[i + r] = knots[i];
    }

    let mut qw = vec![0.0; (n + r + 1) * dim];
    for i in 0..=k - p {
        copy_row(&mut qw, i, ctrl, i, dim);
    }
    for i in k - s..=n {
        copy_row(&mut qw, i + r, ctrl, i, dim);
    }

    // Working window of the p - s + 1 affected points
    let mut rw = ctrl[(k - p) * dim..(k - s + 1) * dim].to_vec();

    let mut l = 0;
    for j in 1..=r {
        l = k - p + j;
        for i in 0..=p - j - s {
            let alpha = (u - knots[l + i]) / (knots[i + k + 1] - knots[l + i]);
            for c in 0..dim {
                rw[i * dim + c] = alpha * rw[(i + 1) * dim + c] + (1.0 - alpha) * rw[i * dim + c];
            }
        }
        copy_row(&mut qw, l, &rw, 0, dim);
        copy_row(&mut qw, k + r - j - s, &rw, p - j - s, dim);
    }
    for i in l + 1..k - s {
        copy_row(&mut qw, i, &rw, i - l, dim);
    }

    (uq, qw)
}

/// Insert a sorted batch `xs` of knots (repeats allowed) in one pass,
/// processing the affected span from the end backward. Equivalent to
/// repeated single insertion but numerically consistent across the batch.
pub fn refine_knot_vector(
    p: usize,
    knots: &[f64],
    ctrl: &[f64],
    dim: usize,
    xs: &[f64],
) -> (Vec<f64>, Vec<f64>) {
    if xs.is_empty() {
        return (knots.to_vec(), ctrl.to_vec());
    }

    let n = ctrl.len() / dim - 1;
    let m = n + p + 1;
    let r = xs.len() - 1;
    let a = find_span(n, p, xs[0], knots);
    let b = find_span(n, p, xs[r], knots) + 1;

    let mut uq = vec![0.0; m + r + 2];
    let mut qw = vec![0.0; (n + r + 2) * dim];

    for i in 0..=a - p {
        copy_row(&mut qw, i, ctrl, i, dim);
    }
    for i in b - 1..=n {
        copy_row(&mut qw, i + r + 1, ctrl, i, dim);
    }
    uq[..=a].copy_from_slice(&knots[..=a]);
    for i in b + p..=m {
        uq[i + r + 1] = knots[i];
    }

    let mut i = b + p - 1;
    let mut k = b + p + r;

    for j in (0..=r).rev() {
        while xs[j] <= knots[i] && i > a {
            copy_row(&mut qw, k - p - 1, ctrl, i - p - 1, dim);
            uq[k] = knots[i];
            k -= 1;
            i -= 1;
        }
        for c in 0..dim {
            qw[(k - p - 1) * dim + c] = qw[(k - p) * dim + c];
        }
        for l in 1..=p {
            let ind = k - p + l;
            let mut alfa = uq[k + l] - xs[j];
            if alfa == 0.0 {
                for c in 0..dim {
                    qw[(ind - 1) * dim + c] = qw[ind * dim + c];
                }
            } else {
                alfa /= uq[k + l] - knots[i - p + l];
                for c in 0..dim {
                    qw[(ind - 1) * dim + c] =
                        alfa * qw[(ind - 1) * dim + c] + (1.0 - alfa) * qw[ind * dim + c];
                }
            }
        }
        uq[k] = xs[j];
        k -= 1;
    }

    (uq, qw)
}

/// Attempt up to `times` removals of the knot `u`, whose last occurrence is
/// at `index` with multiplicity `mult`.
///
/// Each pass reconstructs candidate control points by running the insertion
/// recurrence in reverse from both ends toward the middle and accepts the
/// removal only if the two reconstructions meet within `tol` (Euclidean
/// distance over the `dim` components). Returns the achieved count
/// `t <= times` together with the compacted arrays; `t = 0` is a normal
/// outcome meaning the knot is structurally required at this tolerance.
#[allow(clippy::too_many_arguments)]
pub fn remove_knot(
    p: usize,
    knots: &[f64],
    ctrl: &[f64],
    dim: usize,
    u: f64,
    index: usize,
    mult: usize,
    times: usize,
    tol: f64,
) -> (usize, Vec<f64>, Vec<f64>) {
    let n = ctrl.len() / dim - 1;
    let m = n + p + 1;
    let (r, s) = (index, mult);
    let ord = p + 1;
    let fout = (2 * r - s - p) / 2;

    let mut uq = knots.to_vec();
    let mut qw = ctrl.to_vec();
    let mut temp = vec![0.0; (2 * p + 1) * dim];

    let mut first = r - p;
    let mut last = r - s;
    let mut t = 0;

    while t < times {
        let off = first - 1;
        copy_row(&mut temp, 0, &qw, off, dim);
        copy_row(&mut temp, last + 1 - off, &qw, last + 1, dim);

        let mut i = first;
        let mut j = last;
        let mut ii = 1usize;
        let mut jj = last - off;

        while j as isize - i as isize > t as isize {
            let alfi = (u - uq[i]) / (uq[i + ord + t] - uq[i]);
            let alfj = (u - uq[j - t]) / (uq[j - t + ord] - uq[j - t]);
            for c in 0..dim {
                temp[ii * dim + c] =
                    (qw[i * dim + c] - (1.0 - alfi) * temp[(ii - 1) * dim + c]) / alfi;
                temp[jj * dim + c] =
                    (qw[j * dim + c] - alfj * temp[(jj + 1) * dim + c]) / (1.0 - alfj);
            }
            i += 1;
            ii += 1;
            j -= 1;
            jj -= 1;
        }

        // Does the knot come out at this tolerance?
        let removable = if (j as isize - i as isize) < t as isize {
            dist(row(&temp, ii - 1, dim), row(&temp, jj + 1, dim)) <= tol
        } else {
            let alfi = (u - uq[i]) / (uq[i + ord + t] - uq[i]);
            let mut blend = vec![0.0; dim];
            for c in 0..dim {
                blend[c] =
                    alfi * temp[(ii + t + 1) * dim + c] + (1.0 - alfi) * temp[(ii - 1) * dim + c];
            }
            dist(row(&qw, i, dim), &blend) <= tol
        };

        if !removable {
            break;
        }

        // Accept: write the reconstruction back
        let mut i = first;
        let mut j = last;
        while j as isize - i as isize > t as isize {
            for c in 0..dim {
                qw[i * dim + c] = temp[(i - off) * dim + c];
                qw[j * dim + c] = temp[(j - off) * dim + c];
            }
            i += 1;
            j -= 1;
        }

        t += 1;
        first -= 1;
        last += 1;
    }

    if t == 0 {
        return (0, uq, qw);
    }

    // Shift knots down over the removed entries
    for k in r + 1..=m {
        uq[k - t] = uq[k];
    }
    uq.truncate(m + 1 - t);

    // Compact the control points around fout
    let mut j = fout;
    let mut i = j;
    for k in 1..t {
        if k % 2 == 1 {
            i += 1;
        } else {
            j -= 1;
        }
    }
    for k in i + 1..=n {
        for c in 0..dim {
            qw[j * dim + c] = qw[k * dim + c];
        }
        j += 1;
    }
    qw.truncate((n + 1 - t) * dim);

    (t, uq, qw)
}

fn dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
