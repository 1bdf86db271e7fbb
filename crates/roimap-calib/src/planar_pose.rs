//! Board pose initialisation from a plane homography.

use nalgebra::{Rotation3, Translation3, UnitQuaternion};
use roimap_core::{estimate_homography, CameraModel, Iso3, Mat3, Pt2, Pt3, Vec3};

/// Decompose `H = K [r1 r2 t]` (board plane `Z = 0` → pixels) into the board pose.
///
/// The rotation is projected onto SO(3) by SVD; the sign of `H` is chosen so
/// the board lies in front of the camera.
pub fn pose_from_homography(k: &Mat3, h: &Mat3) -> Option<Iso3> {
    let k_inv = k.try_inverse()?;
    let a1 = k_inv * h.column(0);
    let a2 = k_inv * h.column(1);
    let a3 = k_inv * h.column(2);

    let scale = 0.5 * (a1.norm() + a2.norm());
    if !scale.is_finite() || scale <= f64::EPSILON {
        return None;
    }
    let mut lambda = 1.0 / scale;
    if a3.z * lambda < 0.0 {
        lambda = -lambda;
    }

    let r1 = a1 * lambda;
    let r2 = a2 * lambda;
    let r3 = r1.cross(&r2);
    let r = Mat3::from_columns(&[r1, r2, r3]);

    let svd = r.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    let t: Vec3 = a3 * lambda;
    let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r_orth));
    Some(Iso3::from_parts(Translation3::from(t), rot))
}

/// Board-to-camera pose from planar correspondences.
///
/// Pixels are undistorted into normalised coordinates first, so the
/// homography is fitted against an identity camera matrix.
pub fn estimate_board_pose(camera: &CameraModel, image: &[Pt2], object: &[Pt3]) -> Option<Iso3> {
    if image.len() != object.len() || image.len() < 4 {
        return None;
    }
    let src: Vec<Pt2> = object.iter().map(|p| Pt2::new(p.x, p.y)).collect();
    let dst: Vec<Pt2> = image
        .iter()
        .map(|px| {
            let n = camera.unproject(px);
            Pt2::new(n.x, n.y)
        })
        .collect();
    let h = estimate_homography(&src, &dst)?;
    pose_from_homography(&Mat3::identity(), &h.h)
}

/// `[rx, ry, rz, tx, ty, tz]` with a Rodrigues rotation vector.
pub(crate) fn pose_to_params(iso: &Iso3) -> [f64; 6] {
    let r = iso.rotation.scaled_axis();
    let t = iso.translation.vector;
    [r.x, r.y, r.z, t.x, t.y, t.z]
}

pub(crate) fn pose_from_params(p: &[f64]) -> Iso3 {
    Iso3::new(Vec3::new(p[3], p[4], p[5]), Vec3::new(p[0], p[1], p[2]))
}
