/// Tolerance management for spline computations.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Tolerance {
    /// Linear tolerance for distance comparisons (in model units).
    /// This is the bound used by tolerance-gated knot removal.
    pub linear: f64,
    /// Parametric tolerance for comparisons in knot space.
    pub parametric: f64,
}

impl Tolerance {
    pub const DEFAULT_LINEAR: f64 = 1e-7;
    pub const DEFAULT_PARAMETRIC: f64 = 1e-10;

    pub fn new(linear: f64, parametric: f64) -> Self {
        Self { linear, parametric }
    }

    pub fn default_precision() -> Self {
        Self {
            linear: Self::DEFAULT_LINEAR,
            parametric: Self::DEFAULT_PARAMETRIC,
        }
    }

    pub fn loose() -> Self {
        Self {
            linear: 1e-4,
            parametric: 1e-6,
        }
    }

    pub fn tight() -> Self {
        Self {
            linear: 1e-10,
            parametric: 1e-12,
        }
    }

    /// Check if two distances are equal within linear tolerance.
    pub fn linear_eq(self, a: f64, b: f64) -> bool {
        (a - b).abs() < self.linear
    }

    /// Check if a distance is zero within linear tolerance.
    pub fn is_zero(self, v: f64) -> bool {
        v.abs() < self.linear
    }

    /// Check if two parameter values are equal within parametric tolerance.
    pub fn parametric_eq(self, a: f64, b: f64) -> bool {
        (a - b).abs() < self.parametric
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::default_precision()
    }
}
