//! Relative pose between two calibrated cameras.

use crate::solver::{rms_from_cost, ResidualProblem, SolveOptions, SolveReport};
use crate::mono::reprojection_residual;
use crate::object::CorrespondenceSet;
use crate::planar_pose::{estimate_board_pose, pose_from_params, pose_to_params};
use crate::CalibError;
use log::{debug, info, warn};
use nalgebra::{DVector, Quaternion, Translation3, UnitQuaternion, Vector4};
use roimap_core::{CameraModel, ExtrinsicPose, Iso3, Vec3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StereoParams {
    /// Minimum usable pairs for [`calibrate_stereo_pairs`].
    pub min_pairs: usize,
    pub solver: SolveOptions,
}

impl Default for StereoParams {
    fn default() -> Self {
        Self {
            min_pairs: 3,
            solver: SolveOptions {
                ftol: 1e-5,
                ..SolveOptions::default()
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StereoCalibration {
    /// Camera-1 → camera-2 transform.
    pub pose: ExtrinsicPose,
    /// Per-point RMS reprojection error (px) over both cameras.
    pub rms: f64,
    pub pairs_used: usize,
    pub pairs_skipped: usize,
    pub report: SolveReport,
}

/// Quaternion mean with hemisphere alignment and arithmetic translation mean.
fn average_isometries(poses: &[Iso3]) -> Option<Iso3> {
    let first = poses.first()?;
    let t = poses
        .iter()
        .fold(Vec3::zeros(), |acc, p| acc + p.translation.vector)
        / poses.len() as f64;

    let q0 = first.rotation.coords;
    let mut acc = Vector4::<f64>::zeros();
    for p in poses {
        let c = p.rotation.coords;
        acc += if q0.dot(&c) < 0.0 { -c } else { c };
    }
    let rotation = if acc.norm_squared() == 0.0 {
        UnitQuaternion::identity()
    } else {
        UnitQuaternion::from_quaternion(Quaternion::from_vector(acc))
    };
    Some(Iso3::from_parts(Translation3::from(t), rotation))
}

struct StereoProblem<'a> {
    sets: &'a [&'a CorrespondenceSet],
    cam1: &'a CameraModel,
    cam2: &'a CameraModel,
    num_points: usize,
}

impl ResidualProblem for StereoProblem<'_> {
    fn num_residuals(&self) -> usize {
        4 * self.num_points
    }

    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        let p = params.as_slice();
        let mut out = DVector::zeros(self.num_residuals());
        let relative = pose_from_params(&p[0..6]);
        let mut row = 0;
        for (v, set) in self.sets.iter().enumerate() {
            let o = 6 + 6 * v;
            let board1 = pose_from_params(&p[o..o + 6]);
            let board2 = relative * board1;
            for ((obj, c1), c2) in set.object().iter().zip(set.camera1()).zip(set.camera2()) {
                let r1 = reprojection_residual(self.cam1, &board1.transform_point(obj), c1);
                let r2 = reprojection_residual(self.cam2, &board2.transform_point(obj), c2);
                out[row] = r1[0];
                out[row + 1] = r1[1];
                out[row + 2] = r2[0];
                out[row + 3] = r2[1];
                row += 4;
            }
        }
        out
    }
}

fn solve(
    sets: &[&CorrespondenceSet],
    cam1: &CameraModel,
    cam2: &CameraModel,
    params: &StereoParams,
    pairs_skipped: usize,
) -> Result<StereoCalibration, CalibError> {
    cam1.intrinsics.validate()?;
    cam2.intrinsics.validate()?;

    let mut board_poses = Vec::with_capacity(sets.len());
    let mut candidates = Vec::with_capacity(sets.len());
    for (v, set) in sets.iter().enumerate() {
        let t1 = estimate_board_pose(cam1, set.camera1(), set.object())
            .ok_or(CalibError::PoseInitFailed { view: v })?;
        let t2 = estimate_board_pose(cam2, set.camera2(), set.object())
            .ok_or(CalibError::PoseInitFailed { view: v })?;
        candidates.push(t2 * t1.inverse());
        board_poses.push(t1);
    }
    let initial = average_isometries(&candidates).ok_or(CalibError::NoUsablePairs {
        skipped: pairs_skipped,
    })?;
    debug!(
        "initial relative pose: t = {:?}, angle {:.4} rad",
        initial.translation.vector.as_slice(),
        initial.rotation.angle()
    );

    let mut x0 = Vec::with_capacity(6 + 6 * sets.len());
    x0.extend_from_slice(&pose_to_params(&initial));
    for b in &board_poses {
        x0.extend_from_slice(&pose_to_params(b));
    }

    let problem = StereoProblem {
        sets,
        cam1,
        cam2,
        num_points: sets.iter().map(|s| s.len()).sum(),
    };
    let (x, report) = params.solver.minimize(&problem, DVector::from_vec(x0))?;
    if !report.converged {
        warn!(
            "stereo solve stopped without converging after {} evaluations",
            report.evaluations
        );
    }

    let pose = ExtrinsicPose::from_isometry(pose_from_params(&x.as_slice()[0..6]));
    let rms = rms_from_cost(report.final_cost, 2 * problem.num_points);
    info!(
        "stereo calibration: {} pairs, rms {:.4}px, |t| = {:.2}, angle {:.4} rad",
        sets.len(),
        rms,
        pose.translation().norm(),
        pose.angle()
    );
    Ok(StereoCalibration {
        pose,
        rms,
        pairs_used: sets.len(),
        pairs_skipped,
        report,
    })
}

/// Relative pose from a single image pair. Intrinsics are held fixed.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(points = set.len()))
)]
pub fn calibrate_stereo_pair(
    set: &CorrespondenceSet,
    cam1: &CameraModel,
    cam2: &CameraModel,
    params: &StereoParams,
) -> Result<StereoCalibration, CalibError> {
    solve(&[set], cam1, cam2, params, 0)
}

/// Relative pose from several image pairs.
///
/// `None` entries are pairs where detection failed in either camera; they are
/// skipped and counted. At least `params.min_pairs` usable pairs are required.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(pairs = sets.len()))
)]
pub fn calibrate_stereo_pairs(
    sets: &[Option<CorrespondenceSet>],
    cam1: &CameraModel,
    cam2: &CameraModel,
    params: &StereoParams,
) -> Result<StereoCalibration, CalibError> {
    let usable: Vec<&CorrespondenceSet> = sets.iter().flatten().collect();
    let skipped = sets.len() - usable.len();
    if skipped > 0 {
        info!("{skipped} of {} image pairs skipped", sets.len());
    }
    if usable.is_empty() {
        return Err(CalibError::NoUsablePairs { skipped });
    }
    let required = params.min_pairs.max(1);
    if usable.len() < required {
        return Err(CalibError::InsufficientPairs {
            found: usable.len(),
            required,
        });
    }
    solve(&usable, cam1, cam2, params, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averaging_handles_quaternion_sign_flip() {
        let a = Iso3::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 0.1));
        let mut b = a;
        b.rotation = UnitQuaternion::new_unchecked(-a.rotation.into_inner());
        b.translation.vector = Vec3::new(3.0, 0.0, 0.0);
        let avg = average_isometries(&[a, b]).expect("non-empty");
        assert!(avg.rotation.angle_to(&a.rotation) < 1e-7);
        assert!((avg.translation.vector - Vec3::new(2.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn empty_pose_list_has_no_average() {
        assert!(average_isometries(&[]).is_none());
    }
}
