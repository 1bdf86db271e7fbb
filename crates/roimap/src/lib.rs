//! Dual-camera calibration and region-of-interest transfer.
//!
//! A depth camera ("camera 1") locates regions of interest; a 2D reader
//! camera ("camera 2") reads them. This crate ties the workspace together:
//!
//! - [`frame`]: EpicRaw1/EpicRaw2 decoding and point-cloud reconstruction.
//! - [`chessboard`]: ordered chessboard corners with sub-pixel refinement.
//! - [`calib`]: monocular intrinsics and the stereo extrinsic pose.
//! - [`transform`]: the [`CalibrationSession`] and point / region transforms.
//! - [`calibrate_rig`] / [`calibrate_rig_multi`]: detection through to an
//!   installed calibration.
//!
//! Every tunable lives in [`RoimapConfig`]; every failure is an [`Error`]
//! with a coarse [`ErrorKind`].
//!
//! ## Quickstart
//!
//! ```no_run
//! use roimap::{calibrate_rig, detect, RoimapConfig};
//! use image::ImageReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let left = ImageReader::open("camera1.png")?.decode()?.to_luma8();
//! let right = ImageReader::open("camera2.png")?.decode()?.to_luma8();
//! let config = RoimapConfig::default();
//!
//! let rig = calibrate_rig(&detect::image_pair(&left, &right), None, None, &config)?;
//! println!("rms {:.3}px", rig.stereo.rms);
//!
//! let session = rig.into_session(None);
//! session.save_json(roimap::transform::DEFAULT_CALIBRATION_FILE)?;
//! let p = session.transform_point(roimap::core::Pt2::new(320.0, 240.0), 1000.0)?;
//! println!("camera 2: ({:.1}, {:.1})", p.x, p.y);
//! # Ok(())
//! # }
//! ```

pub use roimap_calib as calib;
pub use roimap_chessboard as chessboard;
pub use roimap_core as core;
pub use roimap_frame as frame;
pub use roimap_transform as transform;

pub use roimap_core::{
    init_with_level, CameraModel, Distortion, ExtrinsicPose, Intrinsics, LogBuilder,
};
pub use roimap_transform::{CalibrationSession, Plane, Roi, TransformParams};

mod config;
mod error;
mod workflow;

#[cfg(feature = "image")]
pub mod detect;

pub use config::RoimapConfig;
pub use error::{Camera, Error, ErrorKind};
pub use workflow::{
    calibrate_rig, calibrate_rig_multi, calibrate_with_frame, detect_correspondences,
    reconstruct_frame_points, ImagePair, IntrinsicsOrigin, RigCalibration,
};
