//! Knot vector utilities and B-spline basis function evaluation.
//!
//! Conventions used throughout the kernel: a knot vector of length
//! `n + p + 2` describes `n + 1` basis functions (and control points) of
//! degree `p`, 0-indexed. All routines here are pure functions over `&[f64]`
//! slices; preconditions (monotone knots, interior multiplicity <= `p`) are
//! the caller's contract and are not re-checked.

pub mod basis;
pub mod knot;

pub use basis::{basis_funs, ders_basis_funs, mspline_scale, Normalization};
pub use knot::{find_mult, find_span, find_span_mult, greville};
