use roimap_core::GeometryError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CalibError {
    #[error("correspondence set is empty")]
    EmptyCorrespondences,

    #[error(
        "correspondence lengths disagree (camera1 {camera1}, camera2 {camera2}, object {object})"
    )]
    MismatchedLengths {
        camera1: usize,
        camera2: usize,
        object: usize,
    },

    #[error("view has {image} image points but {object} object points")]
    ViewLengthMismatch { image: usize, object: usize },

    #[error("need at least {required} points per view, got {found}")]
    TooFewPoints { found: usize, required: usize },

    #[error("no calibration views supplied")]
    NoViews,

    #[error("no usable image pairs ({skipped} skipped)")]
    NoUsablePairs { skipped: usize },

    #[error("insufficient image pairs: {found} usable, {required} required")]
    InsufficientPairs { found: usize, required: usize },

    #[error("invalid intrinsics (fx={fx}, fy={fy})")]
    InvalidIntrinsics { fx: f64, fy: f64 },

    #[error("could not initialise the board pose of view {view}")]
    PoseInitFailed { view: usize },

    #[error("linear system is singular")]
    SingularSystem,

    #[error("optimisation produced non-finite parameters")]
    NonFinite,

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}
