//! Single-camera intrinsic estimation from planar target views.

use crate::solver::{rms_from_cost, ResidualProblem, SolveOptions, SolveReport};
use crate::object::PlanarView;
use crate::planar_pose::{estimate_board_pose, pose_from_params, pose_to_params};
use crate::zhang::zhang_intrinsics;
use crate::CalibError;
use log::{debug, info, warn};
use nalgebra::DVector;
use roimap_core::{estimate_homography, CameraModel, Distortion, Intrinsics, Mat3, Pt2, Vec2};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Residual assigned to points that fall behind the camera during a solve.
pub(crate) const BEHIND_CAMERA_PENALTY: f64 = 1e3;

/// Sanity bounds applied to an optimised camera matrix.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlausibilityParams {
    /// Focal lengths below `min_focal_ratio * size` are rejected.
    pub min_focal_ratio: f64,
    /// Focal lengths above `max_focal_ratio * size` are rejected.
    pub max_focal_ratio: f64,
    /// Hard upper bound, checked after the principal point test.
    pub absolute_max_focal_ratio: f64,
    /// Focal lengths above `warn_focal_ratio * width` are accepted with a warning.
    pub warn_focal_ratio: f64,
}

impl Default for PlausibilityParams {
    fn default() -> Self {
        Self {
            min_focal_ratio: 0.3,
            max_focal_ratio: 3.0,
            absolute_max_focal_ratio: 10.0,
            warn_focal_ratio: 5.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonoCalibParams {
    pub solver: SolveOptions,
    pub plausibility: PlausibilityParams,
    /// Keep `cx, cy` at their initial values.
    pub fix_principal_point: bool,
    /// Keep `p1, p2` at zero.
    pub fix_tangential: bool,
    /// Keep `k3` at zero.
    pub fix_k3: bool,
}

impl Default for MonoCalibParams {
    fn default() -> Self {
        Self {
            solver: SolveOptions::with_tolerance(100, 1e-10),
            plausibility: PlausibilityParams::default(),
            fix_principal_point: false,
            fix_tangential: false,
            fix_k3: false,
        }
    }
}

/// How the returned intrinsics were obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntrinsicsSource {
    Optimized,
    /// The optimised focal length or principal point was implausible; the
    /// initial guess with zero distortion is returned instead.
    Fallback,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MonoCalibration {
    pub camera: CameraModel,
    /// Per-point RMS reprojection error (px) of the optimised model.
    pub rms: f64,
    pub source: IntrinsicsSource,
    /// Intrinsics the solve started from.
    pub initial: Intrinsics,
    pub report: SolveReport,
}

/// Minimum view count for a free principal point.
pub const MIN_VIEWS_FULL_MODEL: usize = 3;

// fx, fy, cx, cy, k1, k2, p1, p2, k3
const FX: usize = 0;
const FY: usize = 1;
const CX: usize = 2;
const CY: usize = 3;
const K1: usize = 4;
const K2: usize = 5;
const P1: usize = 6;
const P2: usize = 7;
const K3: usize = 8;

fn model_from_array(a: &[f64; 9]) -> CameraModel {
    CameraModel::new(
        Intrinsics::new(a[FX], a[FY], a[CX], a[CY]),
        Distortion::from_coeffs(&a[K1..=K3]),
    )
}

/// Project a board point through `model` after applying `pose`.
///
/// Writes a constant penalty when the point is behind the camera.
pub(crate) fn reprojection_residual(
    model: &CameraModel,
    p_cam: &roimap_core::Pt3,
    observed: &Pt2,
) -> [f64; 2] {
    if p_cam.z <= 1e-9 {
        return [BEHIND_CAMERA_PENALTY, BEHIND_CAMERA_PENALTY];
    }
    let n = Vec2::new(p_cam.x / p_cam.z, p_cam.y / p_cam.z);
    let d = model.distortion.distort(&n);
    let px = model.intrinsics.denormalize(&d);
    [px.x - observed.x, px.y - observed.y]
}

struct MonoProblem<'a> {
    views: &'a [PlanarView],
    base: [f64; 9],
    free: Vec<usize>,
    num_points: usize,
}

impl MonoProblem<'_> {
    fn model(&self, params: &DVector<f64>) -> CameraModel {
        let mut a = self.base;
        for (slot, &idx) in self.free.iter().enumerate() {
            a[idx] = params[slot];
        }
        model_from_array(&a)
    }

    fn pose_offset(&self, view: usize) -> usize {
        self.free.len() + 6 * view
    }
}

impl ResidualProblem for MonoProblem<'_> {
    fn num_residuals(&self) -> usize {
        2 * self.num_points
    }

    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        let model = self.model(params);
        let mut out = DVector::zeros(self.num_residuals());
        let mut row = 0;
        for (v, view) in self.views.iter().enumerate() {
            let o = self.pose_offset(v);
            let pose = pose_from_params(&params.as_slice()[o..o + 6]);
            for (obj, img) in view.object.iter().zip(&view.image) {
                let r = reprojection_residual(&model, &pose.transform_point(obj), img);
                out[row] = r[0];
                out[row + 1] = r[1];
                row += 2;
            }
        }
        out
    }
}

fn within_focal_bounds(k: &Intrinsics, width: f64, height: f64, p: &PlausibilityParams) -> bool {
    k.fx.is_finite()
        && k.fy.is_finite()
        && k.fx >= p.min_focal_ratio * width
        && k.fx <= p.max_focal_ratio * width
        && k.fy >= p.min_focal_ratio * height
        && k.fy <= p.max_focal_ratio * height
}

fn principal_point_inside(k: &Intrinsics, width: f64, height: f64) -> bool {
    (0.0..=width).contains(&k.cx) && (0.0..=height).contains(&k.cy)
}

/// Apply the plausibility rules to an optimised camera.
///
/// Returns the camera to use and how it was obtained. Only a non-positive
/// focal length in the final result is an error.
pub fn check_plausibility(
    optimized: &CameraModel,
    fallback: &Intrinsics,
    width: u32,
    height: u32,
    params: &PlausibilityParams,
) -> Result<(CameraModel, IntrinsicsSource), CalibError> {
    let (w, h) = (width as f64, height as f64);
    let k = optimized.intrinsics;

    let (mut camera, mut source) = if !within_focal_bounds(&k, w, h, params) {
        warn!(
            "implausible focal length fx={:.2} fy={:.2} for {}x{} image; falling back to initial guess",
            k.fx, k.fy, width, height
        );
        (CameraModel::pinhole(*fallback), IntrinsicsSource::Fallback)
    } else if !principal_point_inside(&k, w, h) {
        warn!(
            "principal point ({:.2}, {:.2}) outside {}x{} image; falling back to initial guess",
            k.cx, k.cy, width, height
        );
        (CameraModel::pinhole(*fallback), IntrinsicsSource::Fallback)
    } else {
        (*optimized, IntrinsicsSource::Optimized)
    };

    let f = camera.intrinsics;
    if f.fx > params.absolute_max_focal_ratio * w || f.fy > params.absolute_max_focal_ratio * h {
        warn!(
            "focal length fx={:.2} fy={:.2} exceeds {}x image size; falling back to initial guess",
            f.fx, f.fy, params.absolute_max_focal_ratio
        );
        camera = CameraModel::pinhole(*fallback);
        source = IntrinsicsSource::Fallback;
    }

    let f = camera.intrinsics;
    if f.validate().is_err() {
        return Err(CalibError::InvalidIntrinsics { fx: f.fx, fy: f.fy });
    }
    if f.fx > params.warn_focal_ratio * w {
        warn!(
            "focal length fx={:.2} is more than {}x the image width",
            f.fx, params.warn_focal_ratio
        );
    }
    Ok((camera, source))
}

fn initial_intrinsics(
    views: &[PlanarView],
    width: u32,
    height: u32,
    guess: Option<Intrinsics>,
    plausibility: &PlausibilityParams,
) -> Intrinsics {
    if let Some(g) = guess {
        return g;
    }
    let default = Intrinsics::initial_guess(width, height);
    if views.len() < MIN_VIEWS_FULL_MODEL {
        return default;
    }

    let homographies: Vec<Mat3> = views
        .iter()
        .filter_map(|v| {
            let src: Vec<Pt2> = v.object.iter().map(|p| Pt2::new(p.x, p.y)).collect();
            estimate_homography(&src, &v.image).map(|h| h.h)
        })
        .collect();
    match zhang_intrinsics(&homographies) {
        Some(k)
            if within_focal_bounds(&k, width as f64, height as f64, plausibility)
                && principal_point_inside(&k, width as f64, height as f64) =>
        {
            debug!(
                "closed-form seed fx={:.2} fy={:.2} cx={:.2} cy={:.2}",
                k.fx, k.fy, k.cx, k.cy
            );
            k
        }
        _ => {
            debug!("closed-form seed unavailable; using default guess");
            default
        }
    }
}

/// Estimate intrinsics and distortion of one camera from planar target views.
///
/// `guess` seeds the solve when given; otherwise a closed-form estimate (three
/// or more views) or `fx = fy = 0.8·max(w, h)` at the image centre is used.
/// The optimised result is checked by [`check_plausibility`].
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(views, guess, params), fields(views = views.len()))
)]
pub fn estimate_intrinsics(
    views: &[PlanarView],
    width: u32,
    height: u32,
    guess: Option<Intrinsics>,
    params: &MonoCalibParams,
) -> Result<MonoCalibration, CalibError> {
    if views.is_empty() {
        return Err(CalibError::NoViews);
    }
    let default = Intrinsics::initial_guess(width, height);
    default
        .validate()
        .map_err(|_| CalibError::InvalidIntrinsics {
            fx: default.fx,
            fy: default.fy,
        })?;

    let init = initial_intrinsics(views, width, height, guess, &params.plausibility);
    init.validate()?;
    let fallback = guess.unwrap_or(default);

    let full_model = views.len() >= MIN_VIEWS_FULL_MODEL;
    let mut free = vec![FX, FY];
    if full_model && !params.fix_principal_point {
        free.extend([CX, CY]);
    }
    free.extend([K1, K2]);
    if full_model && !params.fix_tangential {
        free.extend([P1, P2]);
    }
    if full_model && !params.fix_k3 {
        free.push(K3);
    }
    debug!("{} views, {} free intrinsic parameters", views.len(), free.len());

    let init_camera = CameraModel::pinhole(init);
    let mut x0 = Vec::with_capacity(free.len() + 6 * views.len());
    let base = [init.fx, init.fy, init.cx, init.cy, 0.0, 0.0, 0.0, 0.0, 0.0];
    x0.extend(free.iter().map(|&i| base[i]));
    for (v, view) in views.iter().enumerate() {
        let pose = estimate_board_pose(&init_camera, &view.image, &view.object)
            .ok_or(CalibError::PoseInitFailed { view: v })?;
        x0.extend_from_slice(&pose_to_params(&pose));
    }

    let problem = MonoProblem {
        views,
        base,
        free,
        num_points: views.iter().map(PlanarView::len).sum(),
    };
    let (x, report) = params.solver.minimize(&problem, DVector::from_vec(x0))?;

    let optimized = problem.model(&x);
    let rms = rms_from_cost(report.final_cost, problem.num_points);
    info!(
        "monocular solve: fx={:.2} fy={:.2} cx={:.2} cy={:.2}, rms {:.4}px after {} evaluations (converged: {})",
        optimized.intrinsics.fx,
        optimized.intrinsics.fy,
        optimized.intrinsics.cx,
        optimized.intrinsics.cy,
        rms,
        report.evaluations,
        report.converged
    );

    let (camera, source) =
        check_plausibility(&optimized, &fallback, width, height, &params.plausibility)?;
    Ok(MonoCalibration {
        camera,
        rms,
        source,
        initial: init,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> CameraModel {
        CameraModel::pinhole(Intrinsics::new(800.0, 800.0, 320.0, 240.0))
    }

    #[test]
    fn plausible_result_is_kept() {
        let fallback = Intrinsics::initial_guess(640, 480);
        let (cam, src) =
            check_plausibility(&camera(), &fallback, 640, 480, &PlausibilityParams::default())
                .expect("ok");
        assert_eq!(src, IntrinsicsSource::Optimized);
        assert_eq!(cam, camera());
    }

    #[test]
    fn tiny_focal_falls_back_with_zero_distortion() {
        let mut bad = camera();
        bad.intrinsics.fx = 100.0;
        bad.distortion.k1 = 0.3;
        let fallback = Intrinsics::initial_guess(640, 480);
        let (cam, src) =
            check_plausibility(&bad, &fallback, 640, 480, &PlausibilityParams::default())
                .expect("ok");
        assert_eq!(src, IntrinsicsSource::Fallback);
        assert_eq!(cam.intrinsics, fallback);
        assert!(!cam.distortion.is_present());
    }

    #[test]
    fn huge_focal_falls_back() {
        let mut bad = camera();
        bad.intrinsics.fy = 2000.0;
        let fallback = Intrinsics::initial_guess(640, 480);
        let (_, src) =
            check_plausibility(&bad, &fallback, 640, 480, &PlausibilityParams::default())
                .expect("ok");
        assert_eq!(src, IntrinsicsSource::Fallback);
    }

    #[test]
    fn principal_point_outside_falls_back_with_zero_distortion() {
        let mut bad = camera();
        bad.intrinsics.cx = -15.0;
        bad.distortion.k1 = -0.1;
        let fallback = Intrinsics::new(700.0, 700.0, 320.0, 240.0);
        let (cam, src) =
            check_plausibility(&bad, &fallback, 640, 480, &PlausibilityParams::default())
                .expect("ok");
        assert_eq!(src, IntrinsicsSource::Fallback);
        assert_eq!(cam.intrinsics, fallback);
        assert!(!cam.distortion.is_present());
    }

    #[test]
    fn zero_sized_image_is_invalid() {
        let view = PlanarView {
            image: vec![Pt2::origin(); 4],
            object: crate::object_points(2, 2, 1.0),
        };
        let err = estimate_intrinsics(&[view], 0, 0, None, &MonoCalibParams::default())
            .unwrap_err();
        assert!(matches!(err, CalibError::InvalidIntrinsics { .. }));
    }

    #[test]
    fn no_views_is_an_error() {
        assert_eq!(
            estimate_intrinsics(&[], 640, 480, None, &MonoCalibParams::default()).unwrap_err(),
            CalibError::NoViews
        );
    }
}
