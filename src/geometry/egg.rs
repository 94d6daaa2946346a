//! Egg-shaped cross-sections.
//!
//! All three egg profiles share the classic three-radius construction: a
//! small invert arc (r1), a crown arc of half the width (r2), and large
//! side arcs (r3) joining them. The types differ only in how the radii are
//! derived from the overall dimensions.

use std::f64::consts::PI;

use crate::geometry::{FlowGeometry, GeometryError};

/// Resolved egg profile geometry (all lengths in meters).
#[derive(Debug, Clone, Copy)]
struct EggProfile {
    height: f64,
    radius1: f64,
    radius2: f64,
    radius3: f64,
    offset: f64,
    h1: f64,
    h2: f64,
}

impl EggProfile {
    fn new(height: f64, radius1: f64, radius2: f64, radius3: f64, offset: f64) -> Self {
        let h2 = height - radius2;
        let h1 = h2 - radius3 * ((h2 - radius1) / offset).atan().sin();
        Self {
            height,
            radius1,
            radius2,
            radius3,
            offset,
            h1,
            h2,
        }
    }

    fn flow_rate(&self, depth: f64, velocity: f64) -> f64 {
        let (area, _perimeter) = wetted_area(self, depth);
        (area * velocity * 1000.0).max(0.0)
    }
}

/// Wetted area and perimeter of an egg profile at the given water depth.
///
/// Depth is clamped just below the crown; the section is split into the
/// invert segment (below h1), the side-arc band (h1..h2), and the crown
/// segment (above h2).
fn wetted_area(profile: &EggProfile, depth_of_water: f64) -> (f64, f64) {
    let EggProfile {
        height,
        radius1,
        radius2,
        radius3,
        offset,
        h1,
        h2,
    } = *profile;

    let depth = depth_of_water.min(height * 0.9999);

    let psi = ((h2 - radius1) / offset).atan();
    let area1 = 0.25 * radius3.powi(2) * (2.0 * psi - (2.0 * psi).sin());
    let inner_rect = (radius1.powi(2) - (radius1 - h1).powi(2)).sqrt();

    if depth <= h1 {
        let theta = 2.0 * ((radius1 - depth) / radius1).acos();
        let area = 0.5 * (theta - theta.sin()) * radius1.powi(2);
        let perimeter = 2.0 * radius1 * ((radius1 - depth) / radius1).acos();
        (area, perimeter)
    } else if depth <= h2 {
        let z = h2 - depth;
        let phi = (z / radius3).asin();
        let area2 = 0.25 * radius3.powi(2) * (2.0 * phi - (2.0 * phi).sin());
        let x1 = (radius3.powi(2) - z.powi(2)).sqrt();
        let m = depth - h1;
        let p = x1 - offset - inner_rect;
        let area3 = m * inner_rect;
        let area4 = p * (h2 - depth);
        let area5 = area1 - area2 - area4;
        let theta = 2.0 * ((radius1 - h1) / radius1).acos();
        let area_lower_segment = 0.5 * (theta - theta.sin()) * radius1.powi(2);
        let area = area_lower_segment + 2.0 * (area5 + area3);

        let alpha = psi - phi;
        let perimeter2 = radius3 * alpha * 2.0;
        let perimeter3 = 2.0 * radius1 * ((radius1 - h1) / radius1).acos();
        (area, perimeter3 + perimeter2)
    } else {
        let i = depth - h1;
        let area6 = i * inner_rect;
        let area_middle_segment = 2.0 * (area1 + area6);
        let theta = 2.0 * ((radius1 - h1) / radius1).acos();
        let area_lower_segment = 0.5 * (theta - theta.sin()) * radius1.powi(2);

        let area8 = PI * radius2 * radius2 / 2.0;
        let z = radius2 * 2.0 - (depth - h2 + radius2);
        let gamma = 2.0 * ((radius2 - z) / radius2).acos();
        let area9 = PI * radius2 * radius2 - radius2 * radius2 * (gamma - gamma.sin()) / 2.0;
        let area_upper_segment = area9 - area8;

        let perimeter4 = PI * radius2 - radius2 * gamma;
        let area = area_lower_segment + area_middle_segment + area_upper_segment;
        let perimeter5 = radius3 * psi * 2.0;
        let perimeter6 = 2.0 * radius1 * ((radius1 - h1) / radius1).acos();
        (area, perimeter6 + perimeter5 + perimeter4)
    }
}

fn validate(label: &str, value: f64) -> Result<f64, GeometryError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(GeometryError::InvalidDimension(format!("{label} {value}")));
    }
    Ok(value)
}

/// Standard egg: invert radius (height - width) / 2, crown radius width / 2,
/// side radius supplied (typically from the R3 solver).
#[derive(Debug, Clone)]
pub struct EggType1 {
    profile: EggProfile,
}

impl EggType1 {
    pub fn new(width: f64, height: f64, radius3: f64) -> Result<Self, GeometryError> {
        let width = validate("width", width)?;
        let height = validate("height", height)?;
        let radius3 = validate("radius3", radius3)?;
        if height <= width {
            return Err(GeometryError::InvalidDimension(format!(
                "height {height} must exceed width {width}"
            )));
        }
        let radius2 = width / 2.0;
        if radius3 <= radius2 {
            return Err(GeometryError::InvalidDimension(format!(
                "radius3 {radius3} must exceed half the width"
            )));
        }
        let radius1 = (height - width) / 2.0;
        Ok(Self {
            profile: EggProfile::new(height, radius1, radius2, radius3, radius3 - radius2),
        })
    }
}

impl FlowGeometry for EggType1 {
    fn flow_rate(&self, depth: f64, velocity: f64) -> f64 {
        self.profile.flow_rate(depth, velocity)
    }
}

/// Proportioned egg derived from the height alone: r1 = h/12, r2 = h/3,
/// r3 = 8h/9.
#[derive(Debug, Clone)]
pub struct EggType2 {
    profile: EggProfile,
}

impl EggType2 {
    pub fn new(height: f64) -> Result<Self, GeometryError> {
        let height = validate("height", height)?;
        let radius1 = height / 12.0;
        let radius2 = height / 3.0;
        let radius3 = 8.0 * height / 9.0;
        let offset = 5.0 * height / 9.0;
        Ok(Self {
            profile: EggProfile::new(height, radius1, radius2, radius3, offset),
        })
    }
}

impl FlowGeometry for EggType2 {
    fn flow_rate(&self, depth: f64, velocity: f64) -> f64 {
        self.profile.flow_rate(depth, velocity)
    }
}

/// Flatter egg variant: invert radius (height - width) / 4.
#[derive(Debug, Clone)]
pub struct EggType2a {
    profile: EggProfile,
}

impl EggType2a {
    pub fn new(width: f64, height: f64, radius3: f64) -> Result<Self, GeometryError> {
        let width = validate("width", width)?;
        let height = validate("height", height)?;
        let radius3 = validate("radius3", radius3)?;
        if height <= width {
            return Err(GeometryError::InvalidDimension(format!(
                "height {height} must exceed width {width}"
            )));
        }
        let radius2 = width / 2.0;
        if radius3 <= radius2 {
            return Err(GeometryError::InvalidDimension(format!(
                "radius3 {radius3} must exceed half the width"
            )));
        }
        let radius1 = (height - width) / 4.0;
        Ok(Self {
            profile: EggProfile::new(height, radius1, radius2, radius3, radius3 - radius2),
        })
    }
}

impl FlowGeometry for EggType2a {
    fn flow_rate(&self, depth: f64, velocity: f64) -> f64 {
        self.profile.flow_rate(depth, velocity)
    }
}
