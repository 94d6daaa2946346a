pub mod circle_rect;
pub mod circular;
pub mod egg;
pub mod r3;
pub mod rectangular;
mod shape;

pub use circle_rect::TwoCirclesAndRectangle;
pub use circular::CircularPipe;
pub use egg::{EggType1, EggType2, EggType2a};
pub use r3::{solve_r3, EggForm};
pub use rectangular::RectangularChannel;
pub use shape::{build_geometry, BuiltGeometry, PipeShape};

/// A pipe or channel cross-section that can turn a depth/velocity pair into
/// a flow rate.
///
/// Depth in meters, velocity in m/s; the result is in l/s.
pub trait FlowGeometry {
    fn flow_rate(&self, depth: f64, velocity: f64) -> f64;
}

#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("Invalid pipe dimension: {0}")]
    InvalidDimension(String),

    #[error("Invalid dimension string '{value}': expected {expected}")]
    BadDimensionString {
        value: String,
        expected: &'static str,
    },

    #[error("Unknown pipe shape: {0}")]
    UnknownShape(String),

    #[error("Math domain error: the value inside the square root is negative")]
    MathDomain,

    #[error("Failed to converge within {0} iterations")]
    NonConvergence(usize),
}
