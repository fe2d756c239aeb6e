use thiserror::Error;

/// Boundary-layer errors for the spline kernel.
///
/// The numeric core routines follow a contract-not-defense discipline and do
/// not validate their inputs; validation happens in the wrapper types, which
/// surface these errors before any core routine runs.
#[derive(Debug, Error)]
pub enum NrbError {
    #[error("Invalid knot vector: {0}")]
    InvalidKnotVector(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Degenerate knot interval at index {0}")]
    DegenerateInterval(usize),
}

pub type Result<T> = std::result::Result<T, NrbError>;
