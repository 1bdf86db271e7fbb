//! JSON persistence of a calibration session.

use crate::CalibrationSession;
use log::{info, warn};
use roimap_core::{CameraModel, Distortion, ExtrinsicPose, GeometryError, Intrinsics};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// File name used when the caller does not pick one.
pub const DEFAULT_CALIBRATION_FILE: &str = "transfer_smore_calib.json";

#[derive(thiserror::Error, Debug)]
pub enum RecordIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid calibration record: {0}")]
    Geometry(#[from] GeometryError),
    #[error("session has no extrinsic pose to save")]
    MissingPose,
}

/// On-disk calibration: the extrinsic matrix plus optional intrinsics.
///
/// Matrices are row-major nested arrays; distortion vectors are in
/// `(k1, k2, p1, p2, k3)` order and may be shorter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub extrinsic_matrix: [[f64; 4]; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera1_matrix: Option<[[f64; 3]; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera1_distortion: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera2_matrix: Option<[[f64; 3]; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera2_distortion: Option<Vec<f64>>,
}

impl CalibrationRecord {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, RecordIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), RecordIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

fn camera_from_record(
    matrix: Option<[[f64; 3]; 3]>,
    distortion: Option<&[f64]>,
) -> Result<Option<CameraModel>, GeometryError> {
    let Some(rows) = matrix else {
        if distortion.is_some() {
            warn!("calibration record has distortion without a camera matrix; ignored");
        }
        return Ok(None);
    };
    let intrinsics = Intrinsics::from_rows(rows);
    intrinsics.validate()?;
    let distortion = distortion.map(Distortion::from_coeffs).unwrap_or_default();
    Ok(Some(CameraModel::new(intrinsics, distortion)))
}

fn camera_to_record(camera: Option<&CameraModel>) -> (Option<[[f64; 3]; 3]>, Option<Vec<f64>>) {
    match camera {
        Some(c) => (
            Some(c.intrinsics.to_rows()),
            Some(c.distortion.to_coeffs().to_vec()),
        ),
        None => (None, None),
    }
}

impl CalibrationSession {
    /// Build a session from a record, validating the pose and intrinsics.
    pub fn from_record(record: &CalibrationRecord) -> Result<Self, RecordIoError> {
        let pose = ExtrinsicPose::from_rows(record.extrinsic_matrix)?;
        let camera1 =
            camera_from_record(record.camera1_matrix, record.camera1_distortion.as_deref())?;
        let camera2 =
            camera_from_record(record.camera2_matrix, record.camera2_distortion.as_deref())?;
        info!(
            "loaded calibration: |t| = {:.2}, camera 1 {}, camera 2 {}",
            pose.translation().norm(),
            if camera1.is_some() { "set" } else { "missing" },
            if camera2.is_some() { "set" } else { "missing" }
        );
        Ok(Self::with_calibration(pose, camera1, camera2))
    }

    /// Snapshot of the pose and intrinsics; `None` without a pose.
    pub fn to_record(&self) -> Option<CalibrationRecord> {
        let pose = self.pose()?;
        let (camera1_matrix, camera1_distortion) = camera_to_record(self.camera1());
        let (camera2_matrix, camera2_distortion) = camera_to_record(self.camera2());
        Some(CalibrationRecord {
            extrinsic_matrix: pose.to_rows(),
            camera1_matrix,
            camera1_distortion,
            camera2_matrix,
            camera2_distortion,
        })
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, RecordIoError> {
        Self::from_record(&CalibrationRecord::load_json(path)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), RecordIoError> {
        self.to_record()
            .ok_or(RecordIoError::MissingPose)?
            .save_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIFTED: [[f64; 4]; 4] = [
        [1.0, 0.0, 0.0, -100.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];

    #[test]
    fn pose_only_record_parses() {
        let json = r#"{"extrinsic_matrix": [[1,0,0,-100],[0,1,0,0],[0,0,1,0],[0,0,0,1]]}"#;
        let record: CalibrationRecord = serde_json::from_str(json).expect("parse");
        assert_eq!(record.extrinsic_matrix, SHIFTED);
        let session = CalibrationSession::from_record(&record).expect("valid");
        assert!(session.is_calibrated());
        assert!(session.camera1().is_none() && session.camera2().is_none());
    }

    #[test]
    fn bad_bottom_row_is_rejected() {
        let mut m = SHIFTED;
        m[3][3] = 2.0;
        let record = CalibrationRecord {
            extrinsic_matrix: m,
            camera1_matrix: None,
            camera1_distortion: None,
            camera2_matrix: None,
            camera2_distortion: None,
        };
        assert!(matches!(
            CalibrationSession::from_record(&record),
            Err(RecordIoError::Geometry(GeometryError::BadBottomRow { .. }))
        ));
    }

    #[test]
    fn non_positive_focal_is_rejected() {
        let record = CalibrationRecord {
            extrinsic_matrix: SHIFTED,
            camera1_matrix: Some([[0.0, 0.0, 320.0], [0.0, 800.0, 240.0], [0.0, 0.0, 1.0]]),
            camera1_distortion: None,
            camera2_matrix: None,
            camera2_distortion: None,
        };
        assert!(matches!(
            CalibrationSession::from_record(&record),
            Err(RecordIoError::Geometry(GeometryError::NonPositiveFocal { .. }))
        ));
    }

    #[test]
    fn absent_keys_are_not_serialized() {
        let session = CalibrationSession::from_record(&CalibrationRecord {
            extrinsic_matrix: SHIFTED,
            camera1_matrix: None,
            camera1_distortion: None,
            camera2_matrix: None,
            camera2_distortion: None,
        })
        .expect("valid");
        let json = serde_json::to_string(&session.to_record().expect("pose")).expect("json");
        assert!(!json.contains("camera1_matrix"));
        assert!(CalibrationSession::new().to_record().is_none());
    }
}
