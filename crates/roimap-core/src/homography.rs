use crate::{Mat3, Pt2};
use nalgebra::{DMatrix, Vector3};

/// Projective 2D transform `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Mat3,
}

impl Homography {
    /// Smallest homogeneous scale accepted by [`Homography::apply`].
    pub const MIN_W: f64 = 1e-6;

    pub fn new(h: Mat3) -> Self {
        Self { h }
    }

    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Mat3::from_row_slice(&[
            rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
            rows[2][1], rows[2][2],
        ]))
    }

    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        [
            [self.h[(0, 0)], self.h[(0, 1)], self.h[(0, 2)]],
            [self.h[(1, 0)], self.h[(1, 1)], self.h[(1, 2)]],
            [self.h[(2, 0)], self.h[(2, 1)], self.h[(2, 2)]],
        ]
    }

    /// Scale so that `H[2,2] = 1`; `None` when `|H[2,2]| < eps` or H is not finite.
    pub fn normalized(&self, eps: f64) -> Option<Self> {
        normalize_homography(self.h, eps).map(Self::new)
    }

    /// Map a point; `None` when the homogeneous scale collapses.
    #[inline]
    pub fn apply(&self, p: &Pt2) -> Option<Pt2> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        let w = v[2];
        if w.abs() < Self::MIN_W || !w.is_finite() {
            return None;
        }
        let out = Pt2::new(v[0] / w, v[1] / w);
        (out.x.is_finite() && out.y.is_finite()).then_some(out)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }

    /// Ratio of the largest to the smallest singular value.
    pub fn condition_number(&self) -> f64 {
        let s = self.h.singular_values();
        let max = s.max();
        let min = s.min();
        if min <= 0.0 {
            f64::INFINITY
        } else {
            max / min
        }
    }
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Mat3 {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };

    Mat3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn normalize_points(pts: &[Pt2]) -> (Vec<Pt2>, Mat3) {
    // translate to centroid, scale so mean distance = sqrt(2)
    let n = pts.len() as f64;
    let (sx, sy) = pts
        .iter()
        .fold((0.0, 0.0), |(ax, ay), p| (ax + p.x, ay + p.y));
    let (cx, cy) = (sx / n, sy / n);

    let mean_dist = pts
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    let t = hartley_normalization(cx, cy, mean_dist);
    let out = pts
        .iter()
        .map(|p| {
            let v = t * Vector3::new(p.x, p.y, 1.0);
            Pt2::new(v[0], v[1])
        })
        .collect();
    (out, t)
}

fn normalize_homography(h: Mat3, eps: f64) -> Option<Mat3> {
    if h.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let s = h[(2, 2)];
    if s.abs() < eps {
        return None;
    }
    Some(h / s)
}

/// Estimate H such that `dst ~ H * src` with the normalised DLT.
///
/// Needs at least four correspondences; degenerate input yields `None`.
pub fn estimate_homography(src: &[Pt2], dst: &[Pt2]) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }

    let (s, ts) = normalize_points(src);
    let (d, td) = normalize_points(dst);

    let n = src.len();
    // at least 9 rows so the SVD exposes a full V^T
    let rows = (2 * n).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);

    for k in 0..n {
        let (x, y) = (s[k].x, s[k].y);
        let (u, v) = (d[k].x, d[k].y);

        // [ -x -y -1   0  0  0   u*x u*y u ]
        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        // [ 0  0  0  -x -y -1   v*x v*y v ]
        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    let svd = a.svd(false, true);
    let vt = svd.v_t?;
    let (idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = vt.row(idx);

    let hn = Mat3::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    // H = Td^{-1} * Hn * Ts
    let td_inv = td.try_inverse()?;
    let h_den = normalize_homography(td_inv * hn * ts, 1e-12)?;
    Some(Homography::new(h_den))
}
