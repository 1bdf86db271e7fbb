use crate::{GeometryError, Iso3, Mat3, Mat4, Pt3, Vec3};
use nalgebra::{Rotation3, Translation3, UnitQuaternion};

/// Maximum tolerated `|RᵀR - I|` entry when importing a rotation matrix.
pub const ROTATION_TOLERANCE: f64 = 1e-4;

/// Rigid transform taking points from the camera-1 frame into the camera-2 frame.
///
/// The homogeneous form always has bottom row `[0, 0, 0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtrinsicPose {
    iso: Iso3,
}

impl ExtrinsicPose {
    pub fn identity() -> Self {
        Self {
            iso: Iso3::identity(),
        }
    }

    pub fn from_isometry(iso: Iso3) -> Self {
        Self { iso }
    }

    pub fn from_parts(rotation: Rotation3<f64>, translation: Vec3) -> Self {
        Self {
            iso: Iso3::from_parts(
                Translation3::from(translation),
                UnitQuaternion::from_rotation_matrix(&rotation),
            ),
        }
    }

    /// `rvec` is a scaled rotation axis (Rodrigues vector).
    pub fn from_axis_angle(rvec: Vec3, translation: Vec3) -> Self {
        Self {
            iso: Iso3::new(translation, rvec),
        }
    }

    /// Validate and import a homogeneous 4×4 matrix.
    pub fn from_matrix(m: &Mat4) -> Result<Self, GeometryError> {
        if m.iter().any(|v| !v.is_finite()) {
            return Err(GeometryError::NonFinite {
                what: "extrinsic matrix",
            });
        }
        let row = [m[(3, 0)], m[(3, 1)], m[(3, 2)], m[(3, 3)]];
        let expected = [0.0, 0.0, 0.0, 1.0];
        if row
            .iter()
            .zip(expected.iter())
            .any(|(a, b)| (a - b).abs() > 1e-9)
        {
            return Err(GeometryError::BadBottomRow { row });
        }

        let r: Mat3 = m.fixed_view::<3, 3>(0, 0).into_owned();
        let orthogonality_error = (r.transpose() * r - Mat3::identity()).amax();
        let determinant = r.determinant();
        if orthogonality_error > ROTATION_TOLERANCE || determinant <= 0.0 {
            return Err(GeometryError::NotARotation {
                orthogonality_error,
                determinant,
            });
        }

        let t = Vec3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
        let rotation = UnitQuaternion::from_matrix(&r);
        Ok(Self {
            iso: Iso3::from_parts(Translation3::from(t), rotation),
        })
    }

    pub fn from_rows(rows: [[f64; 4]; 4]) -> Result<Self, GeometryError> {
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Self::from_matrix(&Mat4::from_row_slice(&flat))
    }

    pub fn isometry(&self) -> &Iso3 {
        &self.iso
    }

    pub fn to_matrix(&self) -> Mat4 {
        self.iso.to_homogeneous()
    }

    pub fn to_rows(&self) -> [[f64; 4]; 4] {
        let m = self.to_matrix();
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = m[(r, c)];
            }
        }
        rows
    }

    pub fn rotation_matrix(&self) -> Mat3 {
        self.iso.rotation.to_rotation_matrix().into_inner()
    }

    pub fn translation(&self) -> Vec3 {
        self.iso.translation.vector
    }

    /// Rodrigues vector and translation.
    pub fn to_axis_angle(&self) -> (Vec3, Vec3) {
        (self.iso.rotation.scaled_axis(), self.translation())
    }

    pub fn inverse(&self) -> Self {
        Self {
            iso: self.iso.inverse(),
        }
    }

    #[inline]
    pub fn transform_point(&self, p: &Pt3) -> Pt3 {
        self.iso.transform_point(p)
    }

    /// Rotation angle in radians.
    pub fn angle(&self) -> f64 {
        self.iso.rotation.angle()
    }
}

impl Default for ExtrinsicPose {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_pose() -> ExtrinsicPose {
        ExtrinsicPose::from_axis_angle(Vec3::new(0.02, -0.15, 0.01), Vec3::new(-120.0, 4.0, 15.0))
    }

    #[test]
    fn matrix_round_trip_keeps_bottom_row() {
        let pose = sample_pose();
        let rows = pose.to_rows();
        assert_eq!(rows[3], [0.0, 0.0, 0.0, 1.0]);
        let back = ExtrinsicPose::from_rows(rows).expect("valid pose");
        assert_abs_diff_eq!(back.to_matrix(), pose.to_matrix(), epsilon = 1e-12);
    }

    #[test]
    fn rejects_bad_bottom_row() {
        let mut rows = ExtrinsicPose::identity().to_rows();
        rows[3][0] = 0.5;
        assert!(matches!(
            ExtrinsicPose::from_rows(rows),
            Err(GeometryError::BadBottomRow { .. })
        ));
    }

    #[test]
    fn rejects_scaled_or_mirrored_rotation() {
        let mut rows = ExtrinsicPose::identity().to_rows();
        rows[0][0] = 2.0;
        assert!(matches!(
            ExtrinsicPose::from_rows(rows),
            Err(GeometryError::NotARotation { .. })
        ));

        let mut rows = ExtrinsicPose::identity().to_rows();
        rows[2][2] = -1.0;
        assert!(matches!(
            ExtrinsicPose::from_rows(rows),
            Err(GeometryError::NotARotation { .. })
        ));
    }

    #[test]
    fn inverse_undoes_transform() {
        let pose = sample_pose();
        let p = Pt3::new(12.0, -40.0, 950.0);
        let q = pose.inverse().transform_point(&pose.transform_point(&p));
        assert_abs_diff_eq!(q, p, epsilon = 1e-9);
    }

    #[test]
    fn axis_angle_round_trip() {
        let pose = sample_pose();
        let (r, t) = pose.to_axis_angle();
        let back = ExtrinsicPose::from_axis_angle(r, t);
        assert_abs_diff_eq!(back.to_matrix(), pose.to_matrix(), epsilon = 1e-12);
    }
}
