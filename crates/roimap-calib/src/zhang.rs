use nalgebra::{DMatrix, SVector};
use roimap_core::{Intrinsics, Mat3};

fn v_ij(h: &Mat3, i: usize, j: usize) -> SVector<f64, 6> {
    let hi = h.column(i);
    let hj = h.column(j);
    SVector::<f64, 6>::from_row_slice(&[
        hi[0] * hj[0],
        hi[0] * hj[1] + hi[1] * hj[0],
        hi[1] * hj[1],
        hi[2] * hj[0] + hi[0] * hj[2],
        hi[2] * hj[1] + hi[1] * hj[2],
        hi[2] * hj[2],
    ])
}

/// Closed-form intrinsics from plane homographies (Zhang 2000), skew dropped.
///
/// Each `H` maps board `(X, Y, 1)` to pixels. Needs at least three views in
/// general position; returns `None` for degenerate configurations.
pub fn zhang_intrinsics(homographies: &[Mat3]) -> Option<Intrinsics> {
    if homographies.len() < 3 {
        return None;
    }

    let m = homographies.len();
    let mut v = DMatrix::<f64>::zeros(2 * m, 6);
    for (k, h) in homographies.iter().enumerate() {
        let v11 = v_ij(h, 0, 0);
        let v22 = v_ij(h, 1, 1);
        let v12 = v_ij(h, 0, 1);
        v.row_mut(2 * k).copy_from(&v12.transpose());
        v.row_mut(2 * k + 1).copy_from(&(v11 - v22).transpose());
    }

    let svd = v.svd(false, true);
    let v_t = svd.v_t?;
    let b = v_t.row(v_t.nrows() - 1);
    let (b11, b12, b22, b13, b23, b33) = (b[0], b[1], b[2], b[3], b[4], b[5]);

    let denom = b11 * b22 - b12 * b12;
    let denom_norm = b11 * b11 + b22 * b22;
    if denom_norm <= 0.0 || denom.abs() / denom_norm <= 1e-6 {
        return None;
    }

    let v0 = (b12 * b13 - b11 * b23) / denom;
    let lambda = b33 - (b13 * b13 + v0 * (b12 * b13 - b11 * b23)) / b11;
    if lambda.signum() != b11.signum() {
        return None;
    }

    let alpha = (lambda / b11).sqrt();
    let beta = (lambda * b11 / denom).sqrt();
    let gamma = -b12 * alpha * alpha * beta / lambda;
    let u0 = gamma * v0 / beta - b13 * alpha * alpha / lambda;

    let k = Intrinsics::new(alpha, beta, u0, v0);
    k.validate().ok().map(|_| k)
}
