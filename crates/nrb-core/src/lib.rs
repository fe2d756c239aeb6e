pub mod error;
pub mod tolerance;

pub use error::{NrbError, Result};
pub use tolerance::Tolerance;

pub use glam::{DVec2, DVec3};

pub type Point2 = DVec2;
pub type Point3 = DVec3;
pub type Vector2 = DVec2;
pub type Vector3 = DVec3;
