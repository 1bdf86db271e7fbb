//! End-to-end rig calibration: detect, fill in missing intrinsics, solve the pose.

use crate::error::{Camera, Error};
use crate::RoimapConfig;
use log::{info, warn};
use roimap_calib::{
    calibrate_stereo_pair, calibrate_stereo_pairs, estimate_intrinsics, CalibError,
    CorrespondenceSet, MonoCalibParams, MonoCalibration, PlanarView, StereoCalibration,
};
use roimap_chessboard::ChessboardDetector;
use roimap_core::{CameraModel, ExtrinsicPose, GrayImageView};
use roimap_frame::{reconstruct_from_frame, DepthMap, PointMap, RawFrame, UndistortLut};
use roimap_transform::CalibrationSession;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Simultaneous captures of the calibration board by both cameras.
#[derive(Clone, Copy, Debug)]
pub struct ImagePair<'a> {
    pub camera1: GrayImageView<'a>,
    pub camera2: GrayImageView<'a>,
}

impl<'a> ImagePair<'a> {
    pub fn new(camera1: GrayImageView<'a>, camera2: GrayImageView<'a>) -> Self {
        Self { camera1, camera2 }
    }
}

/// Where a camera model used for the stereo solve came from.
#[derive(Clone, Debug, PartialEq)]
pub enum IntrinsicsOrigin {
    /// Passed in by the caller (factory values or an earlier calibration).
    Supplied,
    /// Estimated from the calibration views.
    Estimated(MonoCalibration),
}

/// Outcome of a rig calibration.
#[derive(Clone, Debug, PartialEq)]
pub struct RigCalibration {
    pub camera1: CameraModel,
    pub camera2: CameraModel,
    pub camera1_origin: IntrinsicsOrigin,
    pub camera2_origin: IntrinsicsOrigin,
    pub stereo: StereoCalibration,
}

impl RigCalibration {
    pub fn pose(&self) -> &ExtrinsicPose {
        &self.stereo.pose
    }

    /// Install the pose and both cameras into an existing session.
    pub fn install(&self, session: &mut CalibrationSession) {
        session.install(self.stereo.pose, Some(self.camera1), Some(self.camera2));
    }

    /// A fresh session holding this calibration and an optional reference depth map.
    pub fn into_session(self, reference_depth: Option<DepthMap>) -> CalibrationSession {
        let mut session = CalibrationSession::with_calibration(
            self.stereo.pose,
            Some(self.camera1),
            Some(self.camera2),
        );
        session.set_reference_depth(reference_depth);
        session
    }
}

/// Detect the board in both images of a pair.
pub fn detect_correspondences(
    detector: &ChessboardDetector,
    pair: &ImagePair<'_>,
    config: &RoimapConfig,
    index: Option<usize>,
) -> Result<CorrespondenceSet, Error> {
    let size = config.board_size();
    let c1 = detector
        .detect(&pair.camera1, size)
        .ok_or(Error::TargetNotFound {
            camera: Camera::Camera1,
            pair: index,
        })?;
    let c2 = detector
        .detect(&pair.camera2, size)
        .ok_or(Error::TargetNotFound {
            camera: Camera::Camera2,
            pair: index,
        })?;
    Ok(CorrespondenceSet::from_target(
        &config.target,
        c1.corners,
        c2.corners,
    )?)
}

fn warn_if_principal_point_outside(camera: Camera, model: &CameraModel, img: &GrayImageView<'_>) {
    let k = &model.intrinsics;
    if k.cx < 0.0 || k.cx > img.width as f64 || k.cy < 0.0 || k.cy > img.height as f64 {
        warn!(
            "{camera} principal point ({:.1}, {:.1}) lies outside the {}x{} image",
            k.cx, k.cy, img.width, img.height
        );
    }
}

fn resolve_camera(
    camera: Camera,
    supplied: Option<CameraModel>,
    views: &[PlanarView],
    img: &GrayImageView<'_>,
    params: &MonoCalibParams,
) -> Result<(CameraModel, IntrinsicsOrigin), Error> {
    if let Some(model) = supplied {
        model.intrinsics.validate()?;
        warn_if_principal_point_outside(camera, &model, img);
        return Ok((model, IntrinsicsOrigin::Supplied));
    }
    info!("{camera} has no intrinsics; estimating from {} views", views.len());
    let mono = estimate_intrinsics(views, img.width as u32, img.height as u32, None, params)?;
    info!("{camera} intrinsics estimated, rms {:.4}px ({:?})", mono.rms, mono.source);
    Ok((mono.camera, IntrinsicsOrigin::Estimated(mono)))
}

/// Camera 1 keeps its principal point at the image centre when estimated.
fn camera1_params(config: &RoimapConfig) -> MonoCalibParams {
    MonoCalibParams {
        fix_principal_point: true,
        ..config.mono
    }
}

/// Calibrate the rig from a single image pair.
///
/// Cameras without supplied intrinsics are calibrated from this one view
/// first; the stereo solve then holds both cameras fixed.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
pub fn calibrate_rig(
    pair: &ImagePair<'_>,
    camera1: Option<CameraModel>,
    camera2: Option<CameraModel>,
    config: &RoimapConfig,
) -> Result<RigCalibration, Error> {
    let detector = ChessboardDetector::new(config.chessboard.clone());
    let set = detect_correspondences(&detector, pair, config, None)?;

    let (camera1, camera1_origin) = resolve_camera(
        Camera::Camera1,
        camera1,
        &[set.view1()],
        &pair.camera1,
        &camera1_params(config),
    )?;
    let (camera2, camera2_origin) = resolve_camera(
        Camera::Camera2,
        camera2,
        &[set.view2()],
        &pair.camera2,
        &config.mono,
    )?;

    let stereo = calibrate_stereo_pair(&set, &camera1, &camera2, &config.stereo)?;
    Ok(RigCalibration {
        camera1,
        camera2,
        camera1_origin,
        camera2_origin,
        stereo,
    })
}

/// Calibrate the rig from several image pairs.
///
/// Pairs where either camera misses the board are skipped. At least
/// `config.stereo.min_pairs` usable pairs are required; missing intrinsics
/// are estimated from all usable views before the stereo solve.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(pairs = pairs.len()))
)]
pub fn calibrate_rig_multi(
    pairs: &[ImagePair<'_>],
    camera1: Option<CameraModel>,
    camera2: Option<CameraModel>,
    config: &RoimapConfig,
) -> Result<RigCalibration, Error> {
    let first = pairs.first().ok_or(Error::NoImagePairs)?;
    let detector = ChessboardDetector::new(config.chessboard.clone());

    let sets: Vec<Option<CorrespondenceSet>> = pairs
        .iter()
        .enumerate()
        .map(|(i, pair)| match detect_correspondences(&detector, pair, config, Some(i)) {
            Ok(set) => Ok(Some(set)),
            Err(e @ Error::TargetNotFound { .. }) => {
                warn!("{e}; pair skipped");
                Ok(None)
            }
            Err(e) => Err(e),
        })
        .collect::<Result<_, Error>>()?;

    let usable: Vec<&CorrespondenceSet> = sets.iter().flatten().collect();
    let skipped = sets.len() - usable.len();
    if usable.is_empty() {
        return Err(CalibError::NoUsablePairs { skipped }.into());
    }
    let required = config.stereo.min_pairs.max(1);
    if usable.len() < required {
        return Err(CalibError::InsufficientPairs {
            found: usable.len(),
            required,
        }
        .into());
    }

    let views1: Vec<PlanarView> = usable.iter().map(|s| s.view1()).collect();
    let views2: Vec<PlanarView> = usable.iter().map(|s| s.view2()).collect();
    let (camera1, camera1_origin) = resolve_camera(
        Camera::Camera1,
        camera1,
        &views1,
        &first.camera1,
        &camera1_params(config),
    )?;
    let (camera2, camera2_origin) =
        resolve_camera(Camera::Camera2, camera2, &views2, &first.camera2, &config.mono)?;

    let stereo = calibrate_stereo_pairs(&sets, &camera1, &camera2, &config.stereo)?;
    Ok(RigCalibration {
        camera1,
        camera2,
        camera1_origin,
        camera2_origin,
        stereo,
    })
}

/// Camera-1 points of a decoded frame, keeping depths inside `config.depth_bounds`.
pub fn reconstruct_frame_points(
    frame: &RawFrame,
    lut: Option<&UndistortLut>,
    config: &RoimapConfig,
) -> Result<PointMap, Error> {
    let points = reconstruct_from_frame(frame, lut, config.depth_bounds)
        .ok_or(Error::MissingSection { section: "depth" })??;
    info!(
        "reconstructed {} of {} points within {:?}",
        points.valid_count(),
        frame.pixel_count(),
        config.depth_bounds
    );
    Ok(points)
}

/// Calibrate from a decoded camera-1 frame and a camera-2 image.
///
/// The frame's factory intrinsics are used for camera 1 when they are valid.
/// The returned session keeps the frame's depth map as the reference depth.
pub fn calibrate_with_frame(
    frame: &RawFrame,
    camera2_image: GrayImageView<'_>,
    camera2: Option<CameraModel>,
    config: &RoimapConfig,
) -> Result<(RigCalibration, CalibrationSession), Error> {
    let gray = frame.gray().ok_or(Error::MissingSection { section: "image" })?;
    let factory = frame.camera();
    let camera1 = match factory.intrinsics.validate() {
        Ok(()) => Some(factory),
        Err(e) => {
            warn!("frame intrinsics unusable ({e}); camera 1 will be estimated");
            None
        }
    };
    let pair = ImagePair::new(gray.view(), camera2_image);
    let rig = calibrate_rig(&pair, camera1, camera2, config)?;
    let session = rig.clone().into_session(frame.depth.clone());
    Ok((rig, session))
}
