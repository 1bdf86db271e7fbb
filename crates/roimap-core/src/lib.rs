//! Shared geometric primitives for dual-camera ROI mapping.
//!
//! This crate is intentionally small and purely geometric: pinhole
//! intrinsics, Brown-Conrady distortion, the rigid camera-1 → camera-2
//! pose, plane homographies and lightweight grayscale image views. It does
//! *not* know about frame formats, target detection or optimisation.
//!
//! All geometry is `f64`; image samples are `u8`.

mod camera;
mod error;
mod homography;
mod image;
mod logger;
mod math;
mod pose;

pub use camera::{CameraModel, Distortion, Intrinsics, UNDISTORT_ITERATIONS};
pub use error::GeometryError;
pub use homography::{estimate_homography, Homography};
pub use image::{sample_bilinear, GrayImage, GrayImageView};
pub use math::{Iso3, Mat3, Mat4, Pt2, Pt3, Real, Vec2, Vec3};
pub use pose::{ExtrinsicPose, ROTATION_TOLERANCE};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, LogBuilder, LOG_ENV};
