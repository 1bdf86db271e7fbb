//! Iterative sub-pixel corner refinement.
//!
//! At the true corner `q`, every image gradient `g(p)` in a small window is
//! orthogonal to `p - q`. Each iteration solves the weighted normal equations
//! `Σ w g gᵀ · q = Σ w g gᵀ · p` for a new estimate.

use crate::params::SubPixParams;
use nalgebra::{Matrix2, Point2, Vector2};
use roimap_core::{sample_bilinear, GrayImageView};

/// Refine a single corner; returns the input unchanged if the system is
/// degenerate or the estimate leaves the search window.
pub fn refine_corner(
    img: &GrayImageView<'_>,
    initial: Point2<f64>,
    params: &SubPixParams,
) -> Point2<f64> {
    let hw = params.half_window as i32;
    if hw == 0 {
        return initial;
    }
    let norm = hw as f64;
    let mut q = initial;

    for _ in 0..params.max_iterations {
        let mut a = Matrix2::<f64>::zeros();
        let mut b = Vector2::<f64>::zeros();

        for dy in -hw..=hw {
            let wy = (-(dy as f64 / norm).powi(2)).exp();
            for dx in -hw..=hw {
                let wx = (-(dx as f64 / norm).powi(2)).exp();
                let w = wx * wy;
                let px = q.x + dx as f64;
                let py = q.y + dy as f64;

                let gx = 0.5
                    * (sample_bilinear(img, px + 1.0, py) - sample_bilinear(img, px - 1.0, py));
                let gy = 0.5
                    * (sample_bilinear(img, px, py + 1.0) - sample_bilinear(img, px, py - 1.0));

                let gxx = w * gx * gx;
                let gxy = w * gx * gy;
                let gyy = w * gy * gy;
                a[(0, 0)] += gxx;
                a[(0, 1)] += gxy;
                a[(1, 0)] += gxy;
                a[(1, 1)] += gyy;
                b[0] += gxx * px + gxy * py;
                b[1] += gxy * px + gyy * py;
            }
        }

        let det = a.determinant();
        if det.abs() < 1e-9 {
            break;
        }
        let Some(next) = a.try_inverse().map(|inv| inv * b) else {
            break;
        };
        let moved = ((next.x - q.x).powi(2) + (next.y - q.y).powi(2)).sqrt();
        q = Point2::new(next.x, next.y);
        if moved < params.epsilon {
            break;
        }
    }

    let escaped = (q.x - initial.x).abs() > norm || (q.y - initial.y).abs() > norm;
    if escaped || !q.x.is_finite() || !q.y.is_finite() {
        return initial;
    }
    q
}

/// Refine every corner in place.
pub fn refine_corners(
    img: &GrayImageView<'_>,
    corners: &mut [Point2<f64>],
    params: &SubPixParams,
) {
    for c in corners.iter_mut() {
        *c = refine_corner(img, *c, params);
    }
}
