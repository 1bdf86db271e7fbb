use crate::TransformError;
use roimap_core::{CameraModel, ExtrinsicPose};
use roimap_frame::DepthMap;
use serde::{Deserialize, Serialize};

/// Tunables of the coordinate transformer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformParams {
    /// Half-size of the window averaged when a corner has no valid depth.
    pub neighborhood_radius: u32,
    /// Minimum number of mapped corners for a depth-based region transform.
    pub min_region_corners: usize,
    /// Plane homographies with `|H[2,2]|` below this are refused.
    pub homography_epsilon: f64,
    /// Warn when the spread of corner depths exceeds this (depth units).
    pub plane_depth_std_warning: f64,
    /// Warn when `|t| / d` exceeds this.
    pub translation_ratio_warning: f64,
    /// Warn when the homography condition number exceeds this.
    pub condition_warning: f64,
    /// Overlap ratio used by [`CalibrationSession::roi_inside_projection`].
    pub quad_min_ratio: f64,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            neighborhood_radius: 5,
            min_region_corners: 2,
            homography_epsilon: 1e-10,
            plane_depth_std_warning: 50.0,
            translation_ratio_warning: 1.0,
            condition_warning: 1e10,
            quad_min_ratio: 0.8,
        }
    }
}

/// Calibration state shared by all transform calls.
///
/// Transforms borrow the session immutably; installing a new calibration
/// needs `&mut`, so a write can never overlap a read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalibrationSession {
    pose: Option<ExtrinsicPose>,
    camera1: Option<CameraModel>,
    camera2: Option<CameraModel>,
    reference_depth: Option<DepthMap>,
}

/// Everything a transform needs, borrowed from a calibrated session.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Calibrated<'a> {
    pub pose: &'a ExtrinsicPose,
    pub camera1: &'a CameraModel,
    pub camera2: &'a CameraModel,
}

impl CalibrationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calibration(
        pose: ExtrinsicPose,
        camera1: Option<CameraModel>,
        camera2: Option<CameraModel>,
    ) -> Self {
        Self {
            pose: Some(pose),
            camera1,
            camera2,
            reference_depth: None,
        }
    }

    /// Replace the pose and both cameras in one step.
    pub fn install(
        &mut self,
        pose: ExtrinsicPose,
        camera1: Option<CameraModel>,
        camera2: Option<CameraModel>,
    ) {
        self.pose = Some(pose);
        self.camera1 = camera1;
        self.camera2 = camera2;
    }

    pub fn set_pose(&mut self, pose: ExtrinsicPose) {
        self.pose = Some(pose);
    }

    pub fn set_camera1(&mut self, camera: Option<CameraModel>) {
        self.camera1 = camera;
    }

    pub fn set_camera2(&mut self, camera: Option<CameraModel>) {
        self.camera2 = camera;
    }

    /// Keep a depth map for later region transforms.
    pub fn set_reference_depth(&mut self, depth: Option<DepthMap>) {
        self.reference_depth = depth;
    }

    /// Drop the pose; cached intrinsics and depth are kept.
    pub fn clear_pose(&mut self) {
        self.pose = None;
    }

    pub fn is_calibrated(&self) -> bool {
        self.pose.is_some()
    }

    pub fn pose(&self) -> Option<&ExtrinsicPose> {
        self.pose.as_ref()
    }

    pub fn camera1(&self) -> Option<&CameraModel> {
        self.camera1.as_ref()
    }

    pub fn camera2(&self) -> Option<&CameraModel> {
        self.camera2.as_ref()
    }

    pub fn reference_depth(&self) -> Option<&DepthMap> {
        self.reference_depth.as_ref()
    }

    pub(crate) fn calibrated(&self) -> Result<Calibrated<'_>, TransformError> {
        let pose = self.pose.as_ref().ok_or(TransformError::NotCalibrated {
            missing: "extrinsic pose",
        })?;
        let camera1 = self.camera1.as_ref().ok_or(TransformError::NotCalibrated {
            missing: "camera 1 intrinsics",
        })?;
        let camera2 = self.camera2.as_ref().ok_or(TransformError::NotCalibrated {
            missing: "camera 2 intrinsics",
        })?;
        Ok(Calibrated {
            pose,
            camera1,
            camera2,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roimap_core::Intrinsics;

    #[test]
    fn empty_session_is_not_calibrated() {
        let s = CalibrationSession::new();
        assert!(!s.is_calibrated());
        assert_eq!(
            s.calibrated().unwrap_err(),
            TransformError::NotCalibrated {
                missing: "extrinsic pose"
            }
        );
    }

    #[test]
    fn missing_intrinsics_are_reported() {
        let cam = CameraModel::pinhole(Intrinsics::new(800.0, 800.0, 320.0, 240.0));
        let s = CalibrationSession::with_calibration(ExtrinsicPose::identity(), Some(cam), None);
        assert!(s.is_calibrated());
        assert_eq!(
            s.calibrated().unwrap_err(),
            TransformError::NotCalibrated {
                missing: "camera 2 intrinsics"
            }
        );
    }

    #[test]
    fn install_replaces_previous_state() {
        let cam = CameraModel::pinhole(Intrinsics::new(800.0, 800.0, 320.0, 240.0));
        let mut s = CalibrationSession::new();
        s.install(ExtrinsicPose::identity(), Some(cam), Some(cam));
        assert!(s.calibrated().is_ok());
        s.clear_pose();
        assert!(!s.is_calibrated());
        assert_eq!(s.camera1(), Some(&cam));
    }
}
