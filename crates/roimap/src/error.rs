use roimap_calib::CalibError;
use roimap_core::GeometryError;
use roimap_frame::FrameError;
use roimap_transform::{RecordIoError, TransformError};

/// Which camera of the rig an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Camera {
    /// The depth-capable camera regions are located in.
    Camera1,
    /// The 2D reader camera regions are mapped into.
    Camera2,
}

impl std::fmt::Display for Camera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Camera::Camera1 => f.write_str("camera 1"),
            Camera::Camera2 => f.write_str("camera 2"),
        }
    }
}

/// Coarse error category, stable across the per-crate error types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input bytes, records or configuration.
    Format,
    /// The calibration target was not found.
    Detection,
    /// The calibration solve could not produce a result, or too few image
    /// pairs were usable.
    Calibration,
    /// The requested mapping has no geometric solution.
    GeometricInfeasibility,
    /// A required input or calibration state is missing.
    Precondition,
}

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Calib(#[from] CalibError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Record(#[from] RecordIoError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("config I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("chessboard not found in {camera} image{}", pair_suffix(.pair))]
    TargetNotFound { camera: Camera, pair: Option<usize> },

    #[error("frame has no {section} section")]
    MissingSection { section: &'static str },

    #[error("no image pairs supplied")]
    NoImagePairs,
}

fn pair_suffix(pair: &Option<usize>) -> String {
    pair.map(|p| format!(" of pair {p}")).unwrap_or_default()
}

fn transform_kind(e: &TransformError) -> ErrorKind {
    match e {
        TransformError::NotCalibrated { .. }
        | TransformError::MissingDepth { .. }
        | TransformError::InvalidInput { .. } => ErrorKind::Precondition,
        TransformError::CornerFailed { source, .. } => transform_kind(source),
        _ => ErrorKind::GeometricInfeasibility,
    }
}

fn calib_kind(e: &CalibError) -> ErrorKind {
    match e {
        CalibError::EmptyCorrespondences
        | CalibError::MismatchedLengths { .. }
        | CalibError::ViewLengthMismatch { .. }
        | CalibError::TooFewPoints { .. }
        | CalibError::NoViews
        | CalibError::Geometry(_) => ErrorKind::Precondition,
        _ => ErrorKind::Calibration,
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Frame(_) | Error::Json(_) | Error::MissingSection { .. } => ErrorKind::Format,
            Error::Calib(e) => calib_kind(e),
            Error::Transform(e) => transform_kind(e),
            Error::Record(RecordIoError::Json(_) | RecordIoError::Geometry(_)) => ErrorKind::Format,
            Error::Record(_) => ErrorKind::Precondition,
            Error::Geometry(_) | Error::Io(_) | Error::NoImagePairs => ErrorKind::Precondition,
            Error::TargetNotFound { .. } => ErrorKind::Detection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_corner_failure_keeps_inner_kind() {
        let e = Error::from(TransformError::CornerFailed {
            corner: 1,
            source: Box::new(TransformError::BehindCamera { z: -3.0 }),
        });
        assert_eq!(e.kind(), ErrorKind::GeometricInfeasibility);
        let e = Error::from(TransformError::NotCalibrated {
            missing: "extrinsic pose",
        });
        assert_eq!(e.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn detection_and_calibration_kinds() {
        let e = Error::TargetNotFound {
            camera: Camera::Camera2,
            pair: Some(3),
        };
        assert_eq!(e.kind(), ErrorKind::Detection);
        assert_eq!(e.to_string(), "chessboard not found in camera 2 image of pair 3");
        assert_eq!(
            Error::from(CalibError::NoUsablePairs { skipped: 4 }).kind(),
            ErrorKind::Calibration
        );
        assert_eq!(
            Error::from(CalibError::InsufficientPairs {
                found: 2,
                required: 3
            })
            .kind(),
            ErrorKind::Calibration
        );
        assert_eq!(Error::from(CalibError::SingularSystem).kind(), ErrorKind::Calibration);
    }

    #[test]
    fn malformed_frames_are_format_errors() {
        let e = Error::from(FrameError::UnsupportedFormat { tag: *b"NOTAFRAM" });
        assert_eq!(e.kind(), ErrorKind::Format);
    }
}
