use crate::session::Calibrated;
use crate::{roi_inside_quad, CalibrationSession, Roi, TransformError, TransformParams};
use log::debug;
use roimap_core::{Pt2, Pt3};

#[cfg(feature = "tracing")]
use tracing::instrument;

impl Calibrated<'_> {
    pub(crate) fn to_camera2(&self, pixel: &Pt2, depth: f64) -> Result<Pt3, TransformError> {
        if !pixel.x.is_finite() || !pixel.y.is_finite() {
            return Err(TransformError::InvalidInput {
                what: "non-finite pixel coordinate",
            });
        }
        if !depth.is_finite() || depth <= 0.0 {
            return Err(TransformError::MissingDepth {
                x: pixel.x,
                y: pixel.y,
            });
        }
        let p1 = self.camera1.backproject(pixel, depth);
        Ok(self.pose.transform_point(&p1))
    }

    pub(crate) fn map_point(&self, pixel: &Pt2, depth: f64) -> Result<Pt2, TransformError> {
        let p2 = self.to_camera2(pixel, depth)?;
        if p2.z <= 0.0 {
            debug!("pixel ({:.1}, {:.1}) lands behind camera 2", pixel.x, pixel.y);
            return Err(TransformError::BehindCamera { z: p2.z });
        }
        self.camera2
            .project(&p2)
            .ok_or(TransformError::InvalidInput {
                what: "projection is not finite",
            })
    }
}

impl CalibrationSession {
    /// Map a camera-1 pixel with known depth into camera 2.
    ///
    /// The pixel is undistorted when camera 1 has distortion, back-projected,
    /// moved by the extrinsic pose and projected with camera-2 distortion.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn transform_point(&self, pixel: Pt2, depth: f64) -> Result<Pt2, TransformError> {
        self.calibrated()?.map_point(&pixel, depth)
    }

    /// The 3D point in the camera-2 frame for a camera-1 pixel and depth.
    pub fn point_in_camera2(&self, pixel: Pt2, depth: f64) -> Result<Pt3, TransformError> {
        self.calibrated()?.to_camera2(&pixel, depth)
    }

    /// Map four `(u, v, depth)` corners; the error names the first corner that failed.
    pub fn project_corners(&self, corners: &[(f64, f64, f64); 4]) -> Result<[Pt2; 4], TransformError> {
        let cal = self.calibrated()?;
        let mut out = [Pt2::origin(); 4];
        for (k, &(u, v, z)) in corners.iter().enumerate() {
            out[k] = cal
                .map_point(&Pt2::new(u, v), z)
                .map_err(|e| TransformError::CornerFailed {
                    corner: k,
                    source: Box::new(e),
                })?;
        }
        Ok(out)
    }

    /// Project four `(u, v, depth)` corners and test whether more than
    /// `params.quad_min_ratio` of `roi` lies inside the projected quad.
    pub fn roi_inside_projection(
        &self,
        corners: &[(f64, f64, f64); 4],
        roi: &Roi,
        params: &TransformParams,
    ) -> Result<bool, TransformError> {
        let quad = self.project_corners(corners)?;
        Ok(roi_inside_quad(&quad, roi, params.quad_min_ratio))
    }
}
