//! CLI-facing pipe shape selection and dimension parsing.
//!
//! Dimensions are always supplied in millimeters (comma-separated where a
//! shape needs more than one) and converted to meters here, so every
//! calculator works in meters.

use std::str::FromStr;

use crate::geometry::{
    CircularPipe, EggType1, EggType2, EggType2a, FlowGeometry, GeometryError, RectangularChannel,
    TwoCirclesAndRectangle,
};

const MM_PER_M: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeShape {
    Circular,
    Rectangular,
    EggType1,
    EggType2,
    EggType2a,
    TwoCirclesAndRectangle,
}

impl PipeShape {
    /// What the dimension string for this shape must contain.
    pub fn expected_dimensions(&self) -> &'static str {
        match self {
            PipeShape::Circular => "diameter (mm)",
            PipeShape::Rectangular => "width (mm)",
            PipeShape::EggType1 | PipeShape::EggType2a => "width,height,r3 (mm)",
            PipeShape::EggType2 => "height (mm)",
            PipeShape::TwoCirclesAndRectangle => "width,height (mm)",
        }
    }
}

impl FromStr for PipeShape {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "circular" => Ok(PipeShape::Circular),
            "rectangular" => Ok(PipeShape::Rectangular),
            "egg1" | "egg-type-1" => Ok(PipeShape::EggType1),
            "egg2" | "egg-type-2" => Ok(PipeShape::EggType2),
            "egg2a" | "egg-type-2a" => Ok(PipeShape::EggType2a),
            "circle-rect" | "two-circles-and-a-rectangle" => {
                Ok(PipeShape::TwoCirclesAndRectangle)
            }
            other => Err(GeometryError::UnknownShape(other.to_string())),
        }
    }
}

/// A constructed calculator plus the single pipe size (meters) recorded in
/// the FDV header, for the shapes that have one.
pub struct BuiltGeometry {
    pub geometry: Box<dyn FlowGeometry>,
    pub pipe_size_m: Option<f64>,
}

impl std::fmt::Debug for BuiltGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltGeometry")
            .field("geometry", &"<dyn FlowGeometry>")
            .field("pipe_size_m", &self.pipe_size_m)
            .finish()
    }
}

/// Parse a dimension string for the shape and build its calculator.
pub fn build_geometry(shape: PipeShape, size_param: &str) -> Result<BuiltGeometry, GeometryError> {
    match shape {
        PipeShape::Circular => {
            let [diameter] = parse_dims(size_param, shape)?;
            let size_m = diameter / MM_PER_M;
            Ok(BuiltGeometry {
                geometry: Box::new(CircularPipe::new(size_m / 2.0)?),
                pipe_size_m: Some(size_m),
            })
        }
        PipeShape::Rectangular => {
            let [width] = parse_dims(size_param, shape)?;
            let size_m = width / MM_PER_M;
            Ok(BuiltGeometry {
                geometry: Box::new(RectangularChannel::new(size_m)?),
                pipe_size_m: Some(size_m),
            })
        }
        PipeShape::EggType1 => {
            let [width, height, radius3] = parse_dims(size_param, shape)?;
            Ok(BuiltGeometry {
                geometry: Box::new(EggType1::new(
                    width / MM_PER_M,
                    height / MM_PER_M,
                    radius3 / MM_PER_M,
                )?),
                pipe_size_m: None,
            })
        }
        PipeShape::EggType2 => {
            let [height] = parse_dims(size_param, shape)?;
            Ok(BuiltGeometry {
                geometry: Box::new(EggType2::new(height / MM_PER_M)?),
                pipe_size_m: None,
            })
        }
        PipeShape::EggType2a => {
            let [width, height, radius3] = parse_dims(size_param, shape)?;
            Ok(BuiltGeometry {
                geometry: Box::new(EggType2a::new(
                    width / MM_PER_M,
                    height / MM_PER_M,
                    radius3 / MM_PER_M,
                )?),
                pipe_size_m: None,
            })
        }
        PipeShape::TwoCirclesAndRectangle => {
            let [width, height] = parse_dims(size_param, shape)?;
            Ok(BuiltGeometry {
                geometry: Box::new(TwoCirclesAndRectangle::new(
                    width / MM_PER_M,
                    height / MM_PER_M,
                )?),
                pipe_size_m: None,
            })
        }
    }
}

fn parse_dims<const N: usize>(value: &str, shape: PipeShape) -> Result<[f64; N], GeometryError> {
    let parts: Result<Vec<f64>, _> = value.split(',').map(|p| p.trim().parse::<f64>()).collect();
    let parts = parts.map_err(|_| GeometryError::BadDimensionString {
        value: value.to_string(),
        expected: shape.expected_dimensions(),
    })?;

    parts
        .try_into()
        .map_err(|_| GeometryError::BadDimensionString {
            value: value.to_string(),
            expected: shape.expected_dimensions(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_from_str() {
        assert_eq!("circular".parse::<PipeShape>().unwrap(), PipeShape::Circular);
        assert_eq!("Egg2a".parse::<PipeShape>().unwrap(), PipeShape::EggType2a);
        assert!("hexagonal".parse::<PipeShape>().is_err());
    }

    #[test]
    fn test_build_circular_records_pipe_size() {
        let built = build_geometry(PipeShape::Circular, "450").unwrap();
        assert_eq!(built.pipe_size_m, Some(0.45));
        // Half full 450 mm pipe at 1 m/s
        let flow = built.geometry.flow_rate(0.225, 1.0);
        assert!((flow - 79.5216).abs() < 1e-3);
    }

    #[test]
    fn test_build_egg_has_no_single_size() {
        let built = build_geometry(PipeShape::EggType1, "450, 675, 675").unwrap();
        assert_eq!(built.pipe_size_m, None);
        assert!(built.geometry.flow_rate(0.3, 1.0) > 0.0);
    }

    #[test]
    fn test_wrong_arity_rejected() {
        assert!(build_geometry(PipeShape::EggType1, "450,675").is_err());
        assert!(build_geometry(PipeShape::Circular, "450,675").is_err());
    }

    #[test]
    fn test_garbage_dimensions_rejected() {
        let err = build_geometry(PipeShape::Circular, "big").unwrap_err();
        assert!(matches!(err, GeometryError::BadDimensionString { .. }));
    }
}
