//! Map camera-1 pixels and regions into camera 2.
//!
//! A [`CalibrationSession`] owns the extrinsic pose and both cameras'
//! intrinsics. Transforms borrow it immutably:
//!
//! - [`CalibrationSession::transform_point`]: one pixel with known depth.
//! - [`CalibrationSession::transform_region`]: a rectangle, using per-corner
//!   depth from a [`DepthMap`](roimap_frame::DepthMap).
//! - [`CalibrationSession::transform_region_planar`]: a rectangle assumed to
//!   lie on a [`Plane`], via the plane-induced homography.
//!
//! Sessions persist as a [`CalibrationRecord`] in JSON.
//!
//! ```
//! use roimap_core::{CameraModel, ExtrinsicPose, Intrinsics, Pt2, Vec3};
//! use roimap_transform::CalibrationSession;
//!
//! let cam = CameraModel::pinhole(Intrinsics::new(800.0, 800.0, 320.0, 240.0));
//! let pose = ExtrinsicPose::from_axis_angle(Vec3::zeros(), Vec3::new(-100.0, 0.0, 0.0));
//! let session = CalibrationSession::with_calibration(pose, Some(cam), Some(cam));
//!
//! let p = session.transform_point(Pt2::new(320.0, 240.0), 1000.0).unwrap();
//! assert!((p.x - 240.0).abs() < 1e-9 && (p.y - 240.0).abs() < 1e-9);
//! ```

mod error;
mod io;
mod planar;
mod point;
mod quad;
mod region;
mod session;

pub use error::TransformError;
pub use io::{CalibrationRecord, RecordIoError, DEFAULT_CALIBRATION_FILE};
pub use planar::Plane;
pub use quad::roi_inside_quad;
pub use region::{estimate_plane_depth, PlaneDepth, RegionMapping, Roi};
pub use session::{CalibrationSession, TransformParams};
