//! Camera calibration for the dual-camera rig.
//!
//! - [`object_points`] / [`TargetSpec`]: planar grid coordinates in detector order.
//! - [`estimate_intrinsics`]: single-camera intrinsics and Brown-Conrady
//!   distortion, with plausibility fallbacks ([`IntrinsicsSource`]).
//! - [`calibrate_stereo_pair`] / [`calibrate_stereo_pairs`]: the camera-1 →
//!   camera-2 [`ExtrinsicPose`](roimap_core::ExtrinsicPose) with both
//!   cameras' intrinsics held fixed.
//!
//! All solves run Levenberg-Marquardt through [`SolveOptions`] and report a
//! per-point RMS reprojection error. No quality threshold is enforced here.
//!
//! ```
//! use roimap_calib::{object_points, TargetSpec};
//!
//! let target = TargetSpec::new(9, 6, 25.0);
//! let pts = object_points(target.cols, target.rows, target.square_size);
//! assert_eq!(pts.len(), 54);
//! assert_eq!(pts[10].x, 25.0);
//! assert_eq!(pts[10].y, 25.0);
//! ```

mod error;
mod mono;
mod object;
mod planar_pose;
pub mod solver;
mod stereo;
mod zhang;

pub use error::CalibError;
pub use mono::{
    check_plausibility, estimate_intrinsics, IntrinsicsSource, MonoCalibParams, MonoCalibration,
    PlausibilityParams, MIN_VIEWS_FULL_MODEL,
};
pub use object::{object_points, CorrespondenceSet, PlanarView, TargetSpec, MIN_POINTS_PER_VIEW};
pub use planar_pose::{estimate_board_pose, pose_from_homography};
pub use solver::{ResidualProblem, SolveOptions, SolveReport};
pub use stereo::{calibrate_stereo_pair, calibrate_stereo_pairs, StereoCalibration, StereoParams};
pub use zhang::zhang_intrinsics;
