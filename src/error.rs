//! Error types for ribbon-motion.
//!
//! Almost nothing in the motion core can fail: bad parameters are corrected
//! with a warning and degenerate geometry falls back to inert defaults. The
//! one exception is building a curve from caller-supplied control points,
//! where there is no sensible substitute for an empty list.

use std::fmt;

/// Errors that can occur while constructing a curve.
#[derive(Debug, Clone, PartialEq)]
pub enum CurveError {
    /// The curve was given no control points at all.
    NoControlPoints,
    /// A control point contained NaN or infinite components.
    NonFiniteControlPoint(usize),
}

impl fmt::Display for CurveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurveError::NoControlPoints => write!(f, "Curve requires at least one control point"),
            CurveError::NonFiniteControlPoint(index) => {
                write!(f, "Control point {} has a non-finite component", index)
            }
        }
    }
}

impl std::error::Error for CurveError {}

/// Reject empty or non-finite control point lists.
pub(crate) fn validate_control_points(points: &[glam::Vec3]) -> Result<(), CurveError> {
    if points.is_empty() {
        return Err(CurveError::NoControlPoints);
    }
    match points.iter().position(|p| !p.is_finite()) {
        Some(index) => Err(CurveError::NonFiniteControlPoint(index)),
        None => Ok(()),
    }
}
