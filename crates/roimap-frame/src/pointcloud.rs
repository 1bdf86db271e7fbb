use crate::bytes::{f32_values, payload_len};
use crate::{DepthMap, FrameError, RawFrame};
use roimap_core::{Intrinsics, Pt3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Physical depth range of the sensor; samples outside it are invalid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthBounds {
    pub min: f32,
    pub max: f32,
}

impl Default for DepthBounds {
    fn default() -> Self {
        Self {
            min: 0.1,
            max: 6000.0,
        }
    }
}

impl DepthBounds {
    #[inline]
    pub fn contains(&self, d: f32) -> bool {
        !(d.is_nan() || d < self.min || d > self.max)
    }
}

/// Per-pixel remap grid giving the undistorted `(u', v')` of each pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct UndistortLut {
    width: usize,
    height: usize,
    uv: Vec<[f32; 2]>,
}

impl UndistortLut {
    /// Pixel coordinates map to themselves.
    pub fn identity(width: usize, height: usize) -> Self {
        let uv = (0..height)
            .flat_map(|v| (0..width).map(move |u| [u as f32, v as f32]))
            .collect();
        Self { width, height, uv }
    }

    pub fn new(width: usize, height: usize, uv: Vec<[f32; 2]>) -> Option<Self> {
        (width.checked_mul(height) == Some(uv.len())).then_some(Self { width, height, uv })
    }

    /// Parse a raw little-endian float32 `h×w×2` table.
    pub fn from_bytes(width: usize, height: usize, bytes: &[u8]) -> Result<Self, FrameError> {
        let expected = payload_len("undistortion table", width, height, 2 * 4)?;
        if bytes.len() != expected {
            return Err(FrameError::SectionSize {
                section: "undistortion table",
                expected,
                got: bytes.len(),
            });
        }
        let uv = f32_values(bytes)
            .chunks_exact(2)
            .map(|c| [c[0], c[1]])
            .collect();
        Ok(Self { width, height, uv })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, u: usize, v: usize) -> [f32; 2] {
        self.uv[v * self.width + u]
    }
}

/// Row-major per-pixel 3D points; invalid pixels hold NaN in every coordinate.
#[derive(Clone, Debug)]
pub struct PointMap {
    pub width: usize,
    pub height: usize,
    pub points: Vec<Pt3>,
}

impl PointMap {
    pub fn get(&self, u: usize, v: usize) -> Option<&Pt3> {
        if u >= self.width || v >= self.height {
            return None;
        }
        Some(&self.points[v * self.width + u])
    }

    /// Point at `(u, v)` when it carries a valid measurement.
    pub fn valid(&self, u: usize, v: usize) -> Option<&Pt3> {
        self.get(u, v).filter(|p| !p.z.is_nan())
    }

    pub fn valid_count(&self) -> usize {
        self.points.iter().filter(|p| !p.z.is_nan()).count()
    }
}

/// Back-project every depth sample through the camera matrix.
///
/// `x = (u' - cx) * d / fx`, `y = (v' - cy) * d / fy`, `z = d`, where
/// `(u', v')` comes from `lut` (identity when `None`). Samples outside
/// `bounds` become NaN points; they are never clamped.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(w = depth.width(), h = depth.height()))
)]
pub fn reconstruct_points(
    depth: &DepthMap,
    intrinsics: &Intrinsics,
    lut: Option<&UndistortLut>,
    bounds: DepthBounds,
) -> Result<PointMap, FrameError> {
    let (w, h) = (depth.width(), depth.height());
    if let Some(lut) = lut {
        if lut.width() != w || lut.height() != h {
            return Err(FrameError::SectionSize {
                section: "undistortion table",
                expected: w * h,
                got: lut.width() * lut.height(),
            });
        }
    }

    let nan = Pt3::new(f64::NAN, f64::NAN, f64::NAN);
    let samples = depth.as_slice();
    let mut points = Vec::with_capacity(w * h);
    for v in 0..h {
        for u in 0..w {
            let d = samples[v * w + u];
            if !bounds.contains(d) {
                points.push(nan);
                continue;
            }
            let [uu, vv] = match lut {
                Some(lut) => lut.get(u, v),
                None => [u as f32, v as f32],
            };
            let d = d as f64;
            points.push(Pt3::new(
                (uu as f64 - intrinsics.cx) * d / intrinsics.fx,
                (vv as f64 - intrinsics.cy) * d / intrinsics.fy,
                d,
            ));
        }
    }

    Ok(PointMap {
        width: w,
        height: h,
        points,
    })
}

/// [`reconstruct_points`] on a decoded frame; `None` when the frame has no depth.
pub fn reconstruct_from_frame(
    frame: &RawFrame,
    lut: Option<&UndistortLut>,
    bounds: DepthBounds,
) -> Option<Result<PointMap, FrameError>> {
    let depth = frame.depth.as_ref()?;
    Some(reconstruct_points(depth, &frame.intrinsics(), lut, bounds))
}
