use nalgebra::Vector2;
use std::f32::consts::{FRAC_PI_2, PI};

/// Absolute difference between two angles (radians), normalised into `[0, π]`.
pub fn angle_diff_abs(a: f32, b: f32) -> f32 {
    let two_pi = 2.0 * PI;
    let mut diff = (b - a).rem_euclid(two_pi);
    if diff >= PI {
        diff -= two_pi;
    }
    diff.abs()
}

/// Distance of `angle` from the nearest multiple of π/2.
pub fn axis_deviation(angle: f32) -> f32 {
    let r = angle.rem_euclid(FRAC_PI_2);
    r.min(FRAC_PI_2 - r)
}

/// Dominant grid direction of a set of edge vectors, modulo π/2.
///
/// Grid edges come in four directions 90° apart; averaging in quadruple-angle
/// space folds them onto one. Returns an angle in `(-π/4, π/4]`, or `None`
/// when the edges do not agree on any direction.
pub fn dominant_grid_angle(edges: &[Vector2<f32>]) -> Option<f32> {
    let mut sum = Vector2::<f32>::zeros();
    let mut weight = 0.0f32;
    for e in edges {
        let n = e.norm();
        if n <= f32::EPSILON {
            continue;
        }
        let theta4 = 4.0 * e.y.atan2(e.x);
        sum += Vector2::new(theta4.cos(), theta4.sin());
        weight += 1.0;
    }
    if weight <= 0.0 {
        return None;
    }
    let mean = sum / weight;
    if mean.norm_squared() < 1e-4 {
        return None;
    }
    Some(0.25 * mean.y.atan2(mean.x))
}

#[inline]
pub fn rotate(v: &Vector2<f32>, angle: f32) -> Vector2<f32> {
    let (s, c) = angle.sin_cos();
    Vector2::new(c * v.x - s * v.y, s * v.x + c * v.y)
}
