//! Dense matrix assembly over the B-spline basis.
//!
//! Collocation operators sample basis values at parameter sites, the
//! derivative operator maps spline coefficients to derivative-basis
//! coefficients, and the stiffness symbol gives the Galerkin stiffness
//! coefficients of uniform cardinal splines for preconditioning. All
//! results are `nalgebra::DMatrix<f64>`.

pub mod collocation;
pub mod derivative;
pub mod symbol;

pub use collocation::{collocation_matrix, collocation_periodic_matrix};
pub use derivative::derivative_matrix;
pub use symbol::symbol_stiffness_matrix;
