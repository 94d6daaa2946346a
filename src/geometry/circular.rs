use std::f64::consts::PI;

use crate::geometry::{FlowGeometry, GeometryError};

/// Circular pipe, defined by its radius in meters.
#[derive(Debug, Clone)]
pub struct CircularPipe {
    radius: f64,
    radius_squared: f64,
    circle_area: f64,
}

impl CircularPipe {
    pub fn new(radius: f64) -> Result<Self, GeometryError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(GeometryError::InvalidDimension(format!(
                "pipe radius {radius}"
            )));
        }
        Ok(Self {
            radius,
            radius_squared: radius * radius,
            circle_area: PI * radius * radius,
        })
    }

    /// Area of the circle segment cut off by a horizontal line `t` away
    /// from the center.
    fn segment_area(&self, t: f64) -> f64 {
        let chord_length = 2.0 * (self.radius_squared - t * t).sqrt();
        let half_chord = chord_length / 2.0;
        let interior_angle = 2.0 * (half_chord / t).atan();
        self.radius_squared * (interior_angle - interior_angle.sin()) / 2.0
    }
}

impl FlowGeometry for CircularPipe {
    fn flow_rate(&self, depth: f64, velocity: f64) -> f64 {
        if depth > self.radius {
            if depth < self.radius * 2.0 {
                // Above half full: whole circle minus the dry segment at
                // the crown.
                let segment = self.segment_area(depth - self.radius);
                (self.circle_area - segment) * velocity * 1000.0
            } else {
                // Surcharged
                self.circle_area * velocity * 1000.0
            }
        } else if depth == self.radius {
            self.circle_area / 2.0 * velocity * 1000.0
        } else if depth > 0.0 {
            self.segment_area(self.radius - depth) * velocity * 1000.0
        } else {
            0.0
        }
    }
}
