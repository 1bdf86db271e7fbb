use crate::region::Roi;
use crate::{CalibrationSession, TransformError, TransformParams};
use log::{debug, warn};
use roimap_core::{Homography, Pt2, Vec3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Scene plane `nᵀX + d = 0` in camera-1 coordinates.
///
/// `normal` points from the plane toward camera 1 and `distance` is the
/// plane's (positive) distance from the camera-1 centre. A plane facing the
/// camera therefore has a normal with negative `z`; `(0, 0, 1)` with the same
/// distance describes the plane `z = -d`, behind the camera.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f64,
}

impl Plane {
    /// The plane `z = distance`, perpendicular to the camera-1 optical axis,
    /// with normal `(0, 0, -1)`.
    pub fn fronto_parallel(distance: f64) -> Self {
        Self {
            normal: -Vec3::z(),
            distance,
        }
    }
}

impl CalibrationSession {
    /// `H = K2 (R - t nᵀ / d) K1⁻¹`, normalised so `H[2,2] = 1`.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, params)))]
    pub fn plane_homography(
        &self,
        plane: &Plane,
        params: &TransformParams,
    ) -> Result<Homography, TransformError> {
        let cal = self.calibrated()?;
        if !plane.distance.is_finite() || plane.distance <= 0.0 {
            return Err(TransformError::InvalidInput {
                what: "plane distance must be positive",
            });
        }
        let norm = plane.normal.norm();
        if !norm.is_finite() || norm <= f64::EPSILON {
            return Err(TransformError::InvalidInput {
                what: "plane normal must be non-zero",
            });
        }
        let n = plane.normal / norm;
        let d = plane.distance;

        let r = cal.pose.rotation_matrix();
        let t = cal.pose.translation();
        let h = cal.camera2.intrinsics.matrix()
            * (r - t * n.transpose() / d)
            * cal.camera1.intrinsics.inverse_matrix();

        let h22 = h[(2, 2)];
        let Some(normalized) = Homography::new(h).normalized(params.homography_epsilon) else {
            warn!("plane homography is singular (H[2,2] = {h22:.3e}, d = {d})");
            return Err(TransformError::SingularHomography { h22 });
        };

        let ratio = t.norm() / d;
        if ratio > params.translation_ratio_warning {
            warn!(
                "baseline to plane distance ratio |t|/d = {ratio:.3}; the plane depth may be wrong"
            );
        }
        let cond = normalized.condition_number();
        if cond > params.condition_warning {
            warn!("plane homography is ill-conditioned (condition number {cond:.2e})");
        }
        debug!("plane homography at d = {d}: {:?}", normalized.to_rows());
        Ok(normalized)
    }

    /// Map a camera-1 rectangle into camera 2 assuming it lies on `plane`.
    ///
    /// Corners are undistorted with camera-1 distortion (staying in pixel
    /// units) before the homography is applied. The output box has an origin
    /// of at least zero and a size of at least one pixel.
    pub fn transform_region_planar(
        &self,
        roi: &Roi,
        plane: &Plane,
        params: &TransformParams,
    ) -> Result<Roi, TransformError> {
        let h = self.plane_homography(plane, params)?;
        let cal = self.calibrated()?;

        let mut mapped = [Pt2::origin(); 4];
        for (k, corner) in roi.corners().iter().enumerate() {
            let undistorted = cal.camera1.undistort_pixel(corner);
            if !undistorted.x.is_finite() || !undistorted.y.is_finite() {
                return Err(TransformError::InvalidInput {
                    what: "undistorted corner is not finite",
                });
            }
            mapped[k] = h
                .apply(&undistorted)
                .ok_or(TransformError::PointAtInfinity { corner: k })?;
        }

        // rough image extent from the principal point
        let est_w = 2.0 * cal.camera2.intrinsics.cx;
        let est_h = 2.0 * cal.camera2.intrinsics.cy;
        let outside = mapped.iter().any(|p| {
            p.x < -0.5 * est_w || p.x > 1.5 * est_w || p.y < -0.5 * est_h || p.y > 1.5 * est_h
        });
        if outside {
            warn!(
                "planar ROI lands well outside the estimated {est_w:.0}x{est_h:.0} camera-2 image (d = {})",
                plane.distance
            );
        }

        Roi::bounding(&mapped, 1)
    }
}
