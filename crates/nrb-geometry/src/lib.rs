//! NRB kernel geometry: (rational) B-spline evaluation and the
//! structure-preserving knot-vector transforms.
//!
//! The core routines in [`eval`], [`refine`], [`elevate`] and [`clamp`]
//! operate on flat, caller-owned coordinate arrays of shape
//! `(n + 1) x dim` (row-major) and never validate their contracts; the
//! wrapper types in [`curve`] and [`surface`] validate at the boundary and
//! adapt 3D point data to the flat layout.

pub mod clamp;
pub mod curve;
pub mod elevate;
pub mod eval;
pub mod refine;
pub mod surface;

pub use curve::{BSplineCurve, NurbsCurve};
pub use surface::{BSplineSurface, NurbsSurface};
