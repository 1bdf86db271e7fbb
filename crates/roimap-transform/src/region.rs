use crate::{CalibrationSession, TransformError, TransformParams};
use log::{debug, info, warn};
use roimap_core::Pt2;
use roimap_frame::{DepthMap, DepthStats};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Coordinates within this of an integer are treated as that integer when bounding.
const SNAP: f64 = 1e-6;

/// Axis-aligned pixel rectangle, origin top-left.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Roi {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Roi {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// `(x, y), (x + w, y), (x + w, y + h), (x, y + h)`.
    pub fn corners(&self) -> [Pt2; 4] {
        let (x0, y0) = (self.x as f64, self.y as f64);
        let (x1, y1) = (x0 + self.width as f64, y0 + self.height as f64);
        [
            Pt2::new(x0, y0),
            Pt2::new(x1, y0),
            Pt2::new(x1, y1),
            Pt2::new(x0, y1),
        ]
    }

    pub fn area(&self) -> f64 {
        self.width as f64 * self.height as f64
    }

    /// Smallest integer box covering `points`, with the origin clamped at zero
    /// and sizes of at least `min_size`.
    ///
    /// Fails when the box cannot be expressed in `i32` pixel coordinates.
    pub(crate) fn bounding(points: &[Pt2], min_size: i32) -> Result<Self, TransformError> {
        let first = points.first().ok_or(TransformError::InsufficientCorners {
            valid: 0,
            required: 1,
        })?;
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
        let (x0, x1) = ((min_x + SNAP).floor(), (max_x - SNAP).ceil());
        let (y0, y1) = ((min_y + SNAP).floor(), (max_y - SNAP).ceil());
        let fits = |v: f64| v.is_finite() && v >= i32::MIN as f64 && v <= i32::MAX as f64;
        if ![x0, x1, y0, y1, x1 - x0, y1 - y0].into_iter().all(fits) {
            return Err(TransformError::RegionOutOfRange {
                min_x,
                min_y,
                max_x,
                max_y,
            });
        }
        Ok(Self {
            x: (x0 as i32).max(0),
            y: (y0 as i32).max(0),
            width: ((x1 - x0) as i32).max(min_size),
            height: ((y1 - y0) as i32).max(min_size),
        })
    }
}

/// Result of a depth-based region transform.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionMapping {
    pub roi: Roi,
    /// Camera-2 positions of the corners that mapped, in corner order.
    pub corners: Vec<Pt2>,
    /// Indices (0..4) of the corners that failed.
    pub failed: Vec<usize>,
    /// How many corners used the neighbourhood depth fallback.
    pub depth_fallbacks: usize,
}

/// Depth assumed for the planar path, estimated from ROI corner depths.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneDepth {
    pub depth: f64,
    pub stats: DepthStats,
}

fn corner_depth(
    depth: &DepthMap,
    corner: &Pt2,
    index: usize,
    radius: u32,
) -> Option<(f64, bool)> {
    let (u, v) = (corner.x.trunc() as i64, corner.y.trunc() as i64);
    let sample = depth.sample_or_neighborhood(u, v, radius);
    match sample {
        Some((d, true)) => {
            warn!(
                "corner {index} at ({u}, {v}) has no depth; using neighbourhood mean {d:.1} (radius {radius})"
            );
        }
        None => debug!("corner {index} at ({u}, {v}) has no depth in a radius of {radius}"),
        _ => {}
    }
    sample
}

impl CalibrationSession {
    /// Map a camera-1 rectangle into camera 2 using per-corner depth.
    ///
    /// Each corner takes the depth at its integer pixel, or the mean of valid
    /// depths within `params.neighborhood_radius` when that sample is
    /// invalid. At least `params.min_region_corners` corners must map; the
    /// result is the bounding box of the ones that did.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, depth, params)))]
    pub fn transform_region(
        &self,
        roi: &Roi,
        depth: &DepthMap,
        params: &TransformParams,
    ) -> Result<RegionMapping, TransformError> {
        let cal = self.calibrated()?;
        let mut corners = Vec::with_capacity(4);
        let mut failed = Vec::new();
        let mut depth_fallbacks = 0;

        for (k, corner) in roi.corners().iter().enumerate() {
            let Some((d, fallback)) = corner_depth(depth, corner, k, params.neighborhood_radius)
            else {
                failed.push(k);
                continue;
            };
            if fallback {
                depth_fallbacks += 1;
            }
            match cal.map_point(corner, d) {
                Ok(p) => corners.push(p),
                Err(e) => {
                    debug!("corner {k} failed: {e}");
                    failed.push(k);
                }
            }
        }

        let required = params.min_region_corners.max(1);
        if corners.len() < required {
            return Err(TransformError::InsufficientCorners {
                valid: corners.len(),
                required,
            });
        }
        let out = Roi::bounding(&corners, 0)?;
        info!(
            "region ({}, {}, {}, {}) -> ({}, {}, {}, {}) from {} corners",
            roi.x,
            roi.y,
            roi.width,
            roi.height,
            out.x,
            out.y,
            out.width,
            out.height,
            corners.len()
        );
        Ok(RegionMapping {
            roi: out,
            corners,
            failed,
            depth_fallbacks,
        })
    }

    /// [`CalibrationSession::transform_region`] against the cached reference depth map.
    pub fn transform_region_with_reference(
        &self,
        roi: &Roi,
        params: &TransformParams,
    ) -> Result<RegionMapping, TransformError> {
        let depth = self.reference_depth().ok_or(TransformError::MissingDepth {
            x: roi.x as f64,
            y: roi.y as f64,
        })?;
        self.transform_region(roi, depth, params)
    }
}

/// Mean depth at the ROI corners, for use as the planar-path plane distance.
///
/// Warns when the corners disagree by more than `params.plane_depth_std_warning`.
pub fn estimate_plane_depth(
    depth: &DepthMap,
    roi: &Roi,
    params: &TransformParams,
) -> Result<PlaneDepth, TransformError> {
    let samples: Vec<f64> = roi
        .corners()
        .iter()
        .enumerate()
        .filter_map(|(k, c)| corner_depth(depth, c, k, params.neighborhood_radius))
        .map(|(d, _)| d)
        .collect();
    let stats = DepthStats::from_samples(&samples).ok_or(TransformError::MissingDepth {
        x: roi.x as f64,
        y: roi.y as f64,
    })?;
    if stats.std_dev > params.plane_depth_std_warning {
        warn!(
            "ROI corner depths vary by {:.1} (mean {:.1}); the region may not be planar",
            stats.std_dev, stats.mean
        );
    }
    Ok(PlaneDepth {
        depth: stats.mean,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_follow_clockwise_order() {
        let c = Roi::new(10, 20, 30, 40).corners();
        assert_eq!(c[0], Pt2::new(10.0, 20.0));
        assert_eq!(c[1], Pt2::new(40.0, 20.0));
        assert_eq!(c[2], Pt2::new(40.0, 60.0));
        assert_eq!(c[3], Pt2::new(10.0, 60.0));
    }

    #[test]
    fn bounding_box_covers_points_and_clamps_origin() {
        let pts = [Pt2::new(-5.7, 3.2), Pt2::new(20.9, 14.8)];
        let r = Roi::bounding(&pts, 0).expect("non-empty");
        assert_eq!(r, Roi::new(0, 3, 27, 12));
        let noisy = [Pt2::new(219.9999999999, 40.0), Pt2::new(260.0000000001, 41.0)];
        assert_eq!(Roi::bounding(&noisy, 0), Ok(Roi::new(220, 40, 40, 1)));
        let single = Roi::bounding(&pts[..1], 1).expect("non-empty");
        assert_eq!((single.width, single.height), (1, 1));
    }

    #[test]
    fn unrepresentable_box_is_an_error() {
        let far = [Pt2::new(-3.0e9, 10.0), Pt2::new(3.0e9, 20.0)];
        assert!(matches!(
            Roi::bounding(&far, 0),
            Err(TransformError::RegionOutOfRange { .. })
        ));
        // each end fits in i32 but the width does not
        let wide = [Pt2::new(-2.0e9, 0.0), Pt2::new(2.0e9, 1.0)];
        assert!(Roi::bounding(&wide, 0).is_err());
        assert!(Roi::bounding(&[Pt2::new(f64::INFINITY, 0.0)], 0).is_err());
        assert!(Roi::bounding(&[], 0).is_err());
    }

    #[test]
    fn plane_depth_is_corner_mean() {
        let mut data = vec![0.0f32; 50 * 50];
        data[10 * 50 + 10] = 900.0;
        data[10 * 50 + 30] = 1000.0;
        data[30 * 50 + 30] = 1100.0;
        data[30 * 50 + 10] = 1000.0;
        let depth = DepthMap::new(50, 50, data).expect("size");
        let params = TransformParams {
            neighborhood_radius: 0,
            ..TransformParams::default()
        };
        let est = estimate_plane_depth(&depth, &Roi::new(10, 10, 20, 20), &params).expect("depth");
        assert!((est.depth - 1000.0).abs() < 1e-9);
        assert_eq!(est.stats.count, 4);
    }

    #[test]
    fn plane_depth_without_samples_fails() {
        let depth = DepthMap::filled(20, 20, 0.0);
        assert!(matches!(
            estimate_plane_depth(&depth, &Roi::new(2, 2, 5, 5), &TransformParams::default()),
            Err(TransformError::MissingDepth { .. })
        ));
    }
}
