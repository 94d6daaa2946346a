use tracing::debug;

use crate::geometry::GeometryError;

const MAX_ITERATIONS: usize = 1000;
const PRECISION: f64 = 1e-5;

/// Which egg construction the solved radius is for. The forms differ in how
/// the invert radius is derived from the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EggForm {
    /// Invert radius (height - width) / 2
    Type1,
    /// Invert radius (height - width) / 4
    Type2,
}

/// Solve the side-arc radius r3 of an egg-shaped section from its overall
/// width and height.
///
/// Fixed-point iteration on the tangency condition between the side arc and
/// the invert arc: starting from r3 = height, step by a tenth of the residual
/// until it drops below 1e-5.
pub fn solve_r3(width: f64, height: f64, egg_form: EggForm) -> Result<f64, GeometryError> {
    if !width.is_finite() || !height.is_finite() || width <= 0.0 || height <= width {
        return Err(GeometryError::InvalidDimension(format!(
            "width {width}, height {height}"
        )));
    }

    let r2 = width / 2.0;
    let r1 = match egg_form {
        EggForm::Type1 => (height - width) / 2.0,
        EggForm::Type2 => (height - width) / 4.0,
    };
    let h2 = height - r2;

    let mut r3 = height;
    let mut diff = 1.0f64;
    let mut iterations = 0;

    while diff.abs() > PRECISION && iterations < MAX_ITERATIONS {
        let offset = r3 - r2;
        let square_term = (r3 - r1).powi(2) - (h2 - r1).powi(2);

        if square_term < 0.0 {
            return Err(GeometryError::MathDomain);
        }

        diff = offset - square_term.sqrt();
        r3 += diff / 10.0;
        iterations += 1;
    }

    if iterations >= MAX_ITERATIONS {
        return Err(GeometryError::NonConvergence(MAX_ITERATIONS));
    }

    debug!("r3 converged to {} after {} iterations", r3, iterations);
    Ok(r3)
}
