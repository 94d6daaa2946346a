use std::f64::consts::PI;

use crate::geometry::{FlowGeometry, GeometryError};

/// Area of a circle segment of the given height from the circle's base.
fn segment_area(radius: f64, height: f64) -> f64 {
    let radius_squared = radius * radius;
    let t = radius - height;
    let chord_length = 2.0 * (radius_squared - t * t).sqrt();
    let half_chord = chord_length / 2.0;
    let interior_angle = 2.0 * (half_chord / t).atan();
    radius_squared * (interior_angle - interior_angle.sin()) / 2.0
}

/// Conduit made of two half-circles of diameter `width` joined by a
/// rectangle; `height` is the overall height including both half-circles.
#[derive(Debug, Clone)]
pub struct TwoCirclesAndRectangle {
    width: f64,
    height: f64,
}

impl TwoCirclesAndRectangle {
    pub fn new(width: f64, height: f64) -> Result<Self, GeometryError> {
        if !width.is_finite() || width <= 0.0 || !height.is_finite() || height <= 0.0 {
            return Err(GeometryError::InvalidDimension(format!(
                "width {width}, height {height}"
            )));
        }
        if height <= width {
            return Err(GeometryError::InvalidDimension(format!(
                "height {height} must exceed width {width}"
            )));
        }
        Ok(Self { width, height })
    }
}

impl FlowGeometry for TwoCirclesAndRectangle {
    fn flow_rate(&self, depth: f64, velocity: f64) -> f64 {
        let r1 = self.width / 2.0;
        let radius_squared = r1 * r1;
        let circle_area = PI * radius_squared;

        if depth < r1 {
            if depth > 0.0 {
                segment_area(r1, depth) * velocity * 1000.0
            } else {
                0.0
            }
        } else if depth < self.height - r1 {
            // Water surface in the straight-sided band.
            let rectangle_area = (depth - r1) * self.width;
            (circle_area / 2.0 + rectangle_area) * velocity * 1000.0
        } else if depth < self.height {
            // Into the top half-circle: full area minus the dry segment.
            let d = depth - self.width / 2.0 - (self.height - self.width);
            let top_half = circle_area / 2.0 - segment_area(r1, r1 - d);
            let rectangle_area = (self.height - self.width) * self.width;
            (circle_area / 2.0 + rectangle_area + top_half) * velocity * 1000.0
        } else {
            let rectangle_area = (self.height - self.width) * self.width;
            (circle_area + rectangle_area) * velocity * 1000.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_dimensions_rejected() {
        assert!(TwoCirclesAndRectangle::new(f64::NAN, 1.2).is_err());
        assert!(TwoCirclesAndRectangle::new(0.5, 0.4).is_err());
    }

    #[test]
    fn test_reference_flows() {
        // 500 mm wide, 1200 mm tall conduit at 1 m/s.
        let conduit = TwoCirclesAndRectangle::new(0.5, 1.2).unwrap();
        assert_eq!(conduit.flow_rate(0.0, 1.0), 0.0);
        assert!((conduit.flow_rate(0.1, 1.0) - 27.956).abs() < 1e-3);
        // Exactly the bottom half-circle at depth r1
        assert!((conduit.flow_rate(0.25, 1.0) - 98.1748).abs() < 1e-3);
        assert!((conduit.flow_rate(0.6, 1.0) - 273.1748).abs() < 1e-3);
        assert!((conduit.flow_rate(1.0, 1.0) - 473.0071).abs() < 1e-3);
    }

    #[test]
    fn test_surcharged_uses_full_area() {
        let conduit = TwoCirclesAndRectangle::new(0.5, 1.2).unwrap();
        let full = conduit.flow_rate(1.2, 1.0);
        assert!((full - 546.3495).abs() < 1e-3);
        assert_eq!(conduit.flow_rate(1.5, 1.0), full);
    }
}
