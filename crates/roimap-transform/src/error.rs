use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum TransformError {
    /// The session lacks the pose or intrinsics the operation needs.
    #[error("not calibrated: {missing} is not available")]
    NotCalibrated { missing: &'static str },

    #[error("no valid depth at ({x}, {y})")]
    MissingDepth { x: f64, y: f64 },

    #[error("point lands behind camera 2 (z = {z})")]
    BehindCamera { z: f64 },

    #[error("only {valid} region corners could be mapped, need {required}")]
    InsufficientCorners { valid: usize, required: usize },

    #[error(
        "mapped region ({min_x:.1}, {min_y:.1})..({max_x:.1}, {max_y:.1}) does not fit in pixel coordinates"
    )]
    RegionOutOfRange {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },

    #[error("plane homography is singular (H[2,2] = {h22:e})")]
    SingularHomography { h22: f64 },

    #[error("corner {corner} maps to infinity under the plane homography")]
    PointAtInfinity { corner: usize },

    #[error("invalid input: {what}")]
    InvalidInput { what: &'static str },

    #[error("corner {corner} could not be projected: {source}")]
    CornerFailed {
        corner: usize,
        #[source]
        source: Box<TransformError>,
    },
}
