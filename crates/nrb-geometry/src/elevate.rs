//! Degree elevation via Bezier segment decomposition.

use nrb_basis::knot::breakpoints;

/// Binomial coefficient as f64, computed multiplicatively.
fn binomial(n: usize, k: usize) -> f64 {
    let k = k.min(n - k);
    let mut acc = 1.0;
    for i in 0..k {
        acc = acc * (n - i) as f64 / (i + 1) as f64;
    }
    acc
}

#[inline]
fn lerp_rows(dst: &mut [f64], di: usize, src_a: usize, src_b: usize, alpha: f64, dim: usize) {
    for c in 0..dim {
        dst[di * dim + c] = alpha * dst[src_a * dim + c] + (1.0 - alpha) * dst[src_b * dim + c];
    }
}

/// Elevate the degree of a spline by `t`, returning the new knot vector and
/// control points (degree `p + t`).
///
/// Bezier-decomposition algorithm: precompute the elevation coefficient
/// ratios `bezalfs` from binomial products, walk the knot vector
/// span-by-span inserting knots to isolate each Bezier segment, elevate the
/// segment control points through `bezalfs`, then remove the excess internal
/// knots with the running `alf`/`bet`/`gam` overlap averaging between
/// adjacent elevated segments. The output arrays are sized and returned by
/// this routine.
pub fn degree_elevate(
    p: usize,
    knots: &[f64],
    ctrl: &[f64],
    dim: usize,
    t: usize,
) -> (Vec<f64>, Vec<f64>) {
    if t == 0 {
        return (knots.to_vec(), ctrl.to_vec());
    }

    let n = ctrl.len() / dim - 1;
    let m = n + p + 1;
    let ph = p + t;
    let ph2 = ph / 2;

    // Elevation coefficients: bezalfs[i][j] relates elevated Bezier point i
    // to original Bezier point j.
    let mut bezalfs = vec![vec![0.0; p + 1]; ph + 1];
    bezalfs[0][0] = 1.0;
    bezalfs[ph][p] = 1.0;
    for i in 1..=ph2 {
        let inv = 1.0 / binomial(ph, i);
        let mpi = p.min(i);
        for j in i.saturating_sub(t)..=mpi {
            bezalfs[i][j] = inv * binomial(p, j) * binomial(t, i - j);
        }
    }
    for i in ph2 + 1..ph {
        let mpi = p.min(i);
        for j in i.saturating_sub(t)..=mpi {
            bezalfs[i][j] = bezalfs[ph - i][p - j];
        }
    }

    // One elevated segment per distinct element plus the boundary regions
    let segments = breakpoints(n, p, knots).len() - 1;
    let rows_out = n + 1 + t * (segments + 1);
    let mut uh = vec![0.0; rows_out + ph + 1];
    let mut qw = vec![0.0; rows_out * dim];

    // Working buffers: current Bezier segment, its elevated image, and the
    // leftover points for the next segment.
    let mut bpts = vec![0.0; (p + 1) * dim];
    let mut ebpts = vec![0.0; (ph + 1) * dim];
    let mut next_bpts = vec![0.0; if p > 1 { (p - 1) * dim } else { dim }];
    let mut alfs = vec![0.0; p.max(1)];

    let mut kind = ph + 1;
    let mut r: isize = -1;
    let mut a = p;
    let mut b = p + 1;
    let mut cind = 1usize;
    let mut ua = knots[0];

    qw[..dim].copy_from_slice(&ctrl[..dim]);
    for v in uh.iter_mut().take(ph + 1) {
        *v = ua;
    }
    bpts.copy_from_slice(&ctrl[..(p + 1) * dim]);

    while b < m {
        let i = b;
        while b < m && knots[b] == knots[b + 1] {
            b += 1;
        }
        let mul = b - i + 1;
        let ub = knots[b];
        let oldr = r;
        r = p as isize - mul as isize;

        let lbz = if oldr > 0 { (oldr as usize + 2) / 2 } else { 1 };
        let rbz = if r > 0 { ph - (r as usize + 1) / 2 } else { ph };

        if r > 0 {
            // Insert the knot to isolate the Bezier segment
            let numer = ub - ua;
            for k in (mul + 1..=p).rev() {
                alfs[k - mul - 1] = numer / (knots[a + k] - ua);
            }
            for j in 1..=r as usize {
                let save = r as usize - j;
                let s = mul + j;
                for k in (s..=p).rev() {
                    let alf = alfs[k - s];
                    for c in 0..dim {
                        bpts[k * dim + c] =
                            alf * bpts[k * dim + c] + (1.0 - alf) * bpts[(k - 1) * dim + c];
                    }
                }
                next_bpts[save * dim..(save + 1) * dim]
                    .copy_from_slice(&bpts[p * dim..(p + 1) * dim]);
            }
        }

        // Elevate the Bezier segment
        for i in lbz..=ph {
            let slot = &mut ebpts[i * dim..(i + 1) * dim];
            slot.fill(0.0);
            let mpi = p.min(i);
            for j in i.saturating_sub(t)..=mpi {
                let bz = bezalfs[i][j];
                for (o, &x) in slot.iter_mut().zip(&bpts[j * dim..(j + 1) * dim]) {
                    *o += bz * x;
                }
            }
        }

        if oldr > 1 {
            // Remove the excess copies of knot ua between adjacent segments
            let mut first = kind - 2;
            let mut last = kind;
            let den = ub - ua;
            let bet = (ub - uh[kind - 1]) / den;
            for tr in 1..oldr as usize {
                let mut i = first as isize;
                let mut j = last as isize;
                let mut kj = j - kind as isize + 1;
                while j - i > tr as isize {
                    if (i as usize) < cind {
                        let alf = (ub - uh[i as usize]) / (ua - uh[i as usize]);
                        lerp_rows(&mut qw, i as usize, i as usize, i as usize - 1, alf, dim);
                    }
                    if j >= lbz as isize {
                        if j - tr as isize <= kind as isize - ph as isize + oldr {
                            let gam = (ub - uh[(j - tr as isize) as usize]) / den;
                            lerp_rows(
                                &mut ebpts,
                                kj as usize,
                                kj as usize,
                                kj as usize + 1,
                                gam,
                                dim,
                            );
                        } else {
                            lerp_rows(
                                &mut ebpts,
                                kj as usize,
                                kj as usize,
                                kj as usize + 1,
                                bet,
                                dim,
                            );
                        }
                    }
                    i += 1;
                    j -= 1;
                    kj -= 1;
                }
                first -= 1;
                last += 1;
            }
        }

        if a != p {
            // Load the knot ua
            for _ in 0..(ph as isize - oldr) {
                uh[kind] = ua;
                kind += 1;
            }
        }
        for j in lbz..=rbz {
            qw[cind * dim..(cind + 1) * dim].copy_from_slice(&ebpts[j * dim..(j + 1) * dim]);
            cind += 1;
        }

        if b < m {
            // Set up for the next pass through the loop
            if r > 0 {
                bpts[..r as usize * dim].copy_from_slice(&next_bpts[..r as usize * dim]);
            }
            for j in r.max(0) as usize..=p {
                bpts[j * dim..(j + 1) * dim]
                    .copy_from_slice(&ctrl[(b - p + j) * dim..(b - p + j + 1) * dim]);
            }
            a = b;
            b += 1;
            ua = ub;
        } else {
            // End knot
            for i in 0..=ph {
                uh[kind + i] = ub;
            }
        }
    }

    uh.truncate(kind + ph + 1);
    qw.truncate(cind * dim);
    (uh, qw)
}
