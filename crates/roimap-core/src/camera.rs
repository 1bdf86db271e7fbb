use crate::{GeometryError, Mat3, Pt2, Pt3, Vec2};
use log::warn;
use serde::{Deserialize, Serialize};

/// Fixed-point iterations used when inverting the distortion model.
pub const UNDISTORT_ITERATIONS: usize = 5;

/// Pinhole intrinsics in pixel units. Skew is not modelled.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Intrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Placeholder intrinsics for an uncalibrated camera:
    /// `fx = fy = 0.8 * max(w, h)` with the principal point at the image centre.
    pub fn initial_guess(width: u32, height: u32) -> Self {
        let f = 0.8 * width.max(height) as f64;
        Self::new(f, f, width as f64 / 2.0, height as f64 / 2.0)
    }

    /// Read `fx, fy, cx, cy` from a 3×3 camera matrix; skew and the last row are ignored.
    pub fn from_matrix(k: &Mat3) -> Self {
        Self::new(k[(0, 0)], k[(1, 1)], k[(0, 2)], k[(1, 2)])
    }

    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self::new(rows[0][0], rows[1][1], rows[0][2], rows[1][2])
    }

    pub fn matrix(&self) -> Mat3 {
        Mat3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        [
            [self.fx, 0.0, self.cx],
            [0.0, self.fy, self.cy],
            [0.0, 0.0, 1.0],
        ]
    }

    pub fn inverse_matrix(&self) -> Mat3 {
        Mat3::new(
            1.0 / self.fx,
            0.0,
            -self.cx / self.fx,
            0.0,
            1.0 / self.fy,
            -self.cy / self.fy,
            0.0,
            0.0,
            1.0,
        )
    }

    /// Pixel → normalised image coordinates (no distortion handling).
    #[inline]
    pub fn normalize(&self, px: &Pt2) -> Vec2 {
        Vec2::new((px.x - self.cx) / self.fx, (px.y - self.cy) / self.fy)
    }

    /// Normalised image coordinates → pixel.
    #[inline]
    pub fn denormalize(&self, n: &Vec2) -> Pt2 {
        Pt2::new(self.fx * n.x + self.cx, self.fy * n.y + self.cy)
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        let all = [self.fx, self.fy, self.cx, self.cy];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(GeometryError::NonFinite { what: "intrinsics" });
        }
        if self.fx <= 0.0 || self.fy <= 0.0 {
            return Err(GeometryError::NonPositiveFocal {
                fx: self.fx,
                fy: self.fy,
            });
        }
        Ok(())
    }
}

/// Brown-Conrady lens distortion in OpenCV coefficient order `(k1, k2, p1, p2, k3)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl Distortion {
    pub const NONE: Distortion = Distortion {
        k1: 0.0,
        k2: 0.0,
        p1: 0.0,
        p2: 0.0,
        k3: 0.0,
    };

    /// Build from a variable-length coefficient vector.
    ///
    /// Missing trailing coefficients are zero. Rational and thin-prism terms
    /// beyond the fifth coefficient are not modelled and are dropped.
    pub fn from_coeffs(coeffs: &[f64]) -> Self {
        let at = |i: usize| coeffs.get(i).copied().unwrap_or(0.0);
        if coeffs.iter().skip(5).any(|c| *c != 0.0) {
            warn!(
                "distortion vector has {} coefficients; only (k1, k2, p1, p2, k3) are used",
                coeffs.len()
            );
        }
        Self {
            k1: at(0),
            k2: at(1),
            p1: at(2),
            p2: at(3),
            k3: at(4),
        }
    }

    pub fn to_coeffs(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    /// True when any coefficient is non-zero.
    pub fn is_present(&self) -> bool {
        self.to_coeffs().iter().any(|c| *c != 0.0)
    }

    #[inline]
    fn radial_and_tangential(&self, x: f64, y: f64) -> (f64, f64, f64) {
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;
        let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        (radial, dx, dy)
    }

    /// Apply distortion to undistorted normalised coordinates.
    pub fn distort(&self, n: &Vec2) -> Vec2 {
        let (radial, dx, dy) = self.radial_and_tangential(n.x, n.y);
        Vec2::new(n.x * radial + dx, n.y * radial + dy)
    }

    /// Invert [`Distortion::distort`] with [`UNDISTORT_ITERATIONS`] fixed-point steps.
    pub fn undistort(&self, n: &Vec2) -> Vec2 {
        self.undistort_with(n, UNDISTORT_ITERATIONS)
    }

    pub fn undistort_with(&self, n: &Vec2, iterations: usize) -> Vec2 {
        let (mut x, mut y) = (n.x, n.y);
        for _ in 0..iterations {
            let (radial, dx, dy) = self.radial_and_tangential(x, y);
            if radial.abs() < f64::EPSILON || !radial.is_finite() {
                break;
            }
            x = (n.x - dx) / radial;
            y = (n.y - dy) / radial;
        }
        Vec2::new(x, y)
    }
}

/// Intrinsics plus distortion of a single camera.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    pub intrinsics: Intrinsics,
    #[serde(default)]
    pub distortion: Distortion,
}

impl CameraModel {
    pub fn new(intrinsics: Intrinsics, distortion: Distortion) -> Self {
        Self {
            intrinsics,
            distortion,
        }
    }

    pub fn pinhole(intrinsics: Intrinsics) -> Self {
        Self::new(intrinsics, Distortion::NONE)
    }

    /// Pixel → undistorted normalised coordinates.
    pub fn unproject(&self, px: &Pt2) -> Vec2 {
        let n = self.intrinsics.normalize(px);
        if self.distortion.is_present() {
            self.distortion.undistort(&n)
        } else {
            n
        }
    }

    /// Pixel → undistorted pixel in the same camera (new camera matrix = K).
    pub fn undistort_pixel(&self, px: &Pt2) -> Pt2 {
        if !self.distortion.is_present() {
            return *px;
        }
        self.intrinsics.denormalize(&self.unproject(px))
    }

    /// Pixel plus depth along the optical axis → 3D point in this camera's frame.
    pub fn backproject(&self, px: &Pt2, depth: f64) -> Pt3 {
        let n = self.unproject(px);
        Pt3::new(n.x * depth, n.y * depth, depth)
    }

    /// 3D point in this camera's frame → distorted pixel.
    ///
    /// Returns `None` for points on or behind the image plane.
    pub fn project(&self, p: &Pt3) -> Option<Pt2> {
        if p.z <= 0.0 || !p.z.is_finite() {
            return None;
        }
        let n = Vec2::new(p.x / p.z, p.y / p.z);
        let d = if self.distortion.is_present() {
            self.distortion.distort(&n)
        } else {
            n
        };
        let px = self.intrinsics.denormalize(&d);
        (px.x.is_finite() && px.y.is_finite()).then_some(px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_camera() -> CameraModel {
        CameraModel::new(
            Intrinsics::new(800.0, 780.0, 320.0, 240.0),
            Distortion {
                k1: -0.12,
                k2: 0.03,
                p1: 0.001,
                p2: -0.0005,
                k3: 0.0,
            },
        )
    }

    #[test]
    fn initial_guess_uses_longest_side() {
        let k = Intrinsics::initial_guess(1280, 1024);
        assert_abs_diff_eq!(k.fx, 1024.0);
        assert_abs_diff_eq!(k.fy, 1024.0);
        assert_abs_diff_eq!(k.cx, 640.0);
        assert_abs_diff_eq!(k.cy, 512.0);
    }

    #[test]
    fn matrix_round_trips_through_rows() {
        let k = Intrinsics::new(910.5, 905.25, 641.0, 359.5);
        let back = Intrinsics::from_rows(k.to_rows());
        assert_eq!(k, back);
        let m = k.matrix() * k.inverse_matrix();
        assert_abs_diff_eq!(m, Mat3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn short_coefficient_vectors_are_zero_padded() {
        let d = Distortion::from_coeffs(&[0.1, -0.2, 0.0, 0.0]);
        assert_eq!(d.to_coeffs(), [0.1, -0.2, 0.0, 0.0, 0.0]);
        assert!(d.is_present());
        assert!(!Distortion::from_coeffs(&[]).is_present());
    }

    #[test]
    fn undistort_inverts_mild_distortion() {
        let cam = sample_camera();
        for n in [Vec2::new(0.0, 0.0), Vec2::new(0.1, -0.05), Vec2::new(-0.2, 0.15)] {
            let d = cam.distortion.distort(&n);
            let u = cam.distortion.undistort_with(&d, 20);
            assert_abs_diff_eq!(u, n, epsilon = 1e-9);
        }
    }

    #[test]
    fn project_and_backproject_are_consistent() {
        let cam = sample_camera();
        let px = Pt2::new(400.0, 200.0);
        let p = cam.backproject(&px, 1500.0);
        assert_abs_diff_eq!(p.z, 1500.0);
        let back = cam.project(&p).expect("in front of camera");
        assert_abs_diff_eq!(back.x, px.x, epsilon = 1e-3);
        assert_abs_diff_eq!(back.y, px.y, epsilon = 1e-3);
    }

    #[test]
    fn points_behind_camera_do_not_project() {
        let cam = CameraModel::pinhole(Intrinsics::new(800.0, 800.0, 320.0, 240.0));
        assert!(cam.project(&Pt3::new(0.0, 0.0, -1.0)).is_none());
        assert!(cam.project(&Pt3::new(0.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn validate_rejects_non_positive_focal() {
        assert!(Intrinsics::new(0.0, 800.0, 1.0, 1.0).validate().is_err());
        assert!(Intrinsics::new(800.0, f64::NAN, 1.0, 1.0).validate().is_err());
        assert!(Intrinsics::new(800.0, 800.0, 1.0, 1.0).validate().is_ok());
    }
}
