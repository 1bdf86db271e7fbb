use crate::geom::dominant_grid_angle;
use crate::gridgraph::{
    assign_grid_coordinates, connected_components, estimate_spacing, nearest_edges, GridGraph,
};
use crate::params::ChessboardParams;
use crate::subpix::refine_corners;
use chess_corners::{find_chess_corners_image, ChessConfig, CornerDescriptor};
use log::{debug, info};
use nalgebra::Point2;
use roimap_core::GrayImageView;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Interior-corner layout of a chessboard target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSize {
    pub cols: u32,
    pub rows: u32,
}

impl BoardSize {
    pub fn new(cols: u32, rows: u32) -> Self {
        Self { cols, rows }
    }

    pub fn corner_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }
}

/// A fully detected board.
#[derive(Clone, Debug, PartialEq)]
pub struct ChessboardDetection {
    pub size: BoardSize,
    /// `cols * rows` corners in raster order: index `i + j * cols`.
    pub corners: Vec<Point2<f64>>,
    /// Estimated square size in pixels.
    pub spacing_px: f32,
}

/// Chessboard detector: ChESS candidates → neighbour graph → ordered grid → sub-pixel refinement.
pub struct ChessboardDetector {
    pub params: ChessboardParams,
}

impl ChessboardDetector {
    pub fn new(params: ChessboardParams) -> Self {
        Self { params }
    }

    fn chess_config(&self) -> ChessConfig {
        let mut cfg = ChessConfig::single_scale();
        cfg.params.threshold_rel = self.params.response.threshold_rel;
        cfg.params.nms_radius = self.params.response.nms_radius;
        cfg.params.min_cluster_size = self.params.response.min_cluster_size;
        cfg
    }

    /// Raw X-junction candidates.
    pub fn candidates(&self, img: &GrayImageView<'_>) -> Vec<Point2<f32>> {
        let Some(buffer) =
            image::GrayImage::from_raw(img.width as u32, img.height as u32, img.data.to_vec())
        else {
            return Vec::new();
        };
        find_chess_corners_image(&buffer, &self.chess_config())
            .iter()
            .map(|c: &CornerDescriptor| Point2::new(c.x, c.y))
            .collect()
    }

    /// Find the board in `img`. `None` means "not found", which is an expected outcome.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, img),
            fields(width = img.width, height = img.height, cols = size.cols, rows = size.rows)
        )
    )]
    pub fn detect(&self, img: &GrayImageView<'_>, size: BoardSize) -> Option<ChessboardDetection> {
        let candidates = self.candidates(img);
        let mut detection = self.detect_from_points(&candidates, size)?;
        if !self.params.skip_refinement {
            refine_corners(img, &mut detection.corners, &self.params.subpix);
        }
        Some(detection)
    }

    /// Assemble already-detected candidate points into an ordered board.
    pub fn detect_from_points(
        &self,
        points: &[Point2<f32>],
        size: BoardSize,
    ) -> Option<ChessboardDetection> {
        let needed = size.corner_count();
        if needed == 0 || points.len() < needed {
            debug!(
                "fast reject: {} candidates for a {}x{} board",
                points.len(),
                size.cols,
                size.rows
            );
            return None;
        }

        let spacing = estimate_spacing(points)?;
        let Some(grid_angle) = dominant_grid_angle(&nearest_edges(points)) else {
            debug!("no dominant grid direction among {} candidates", points.len());
            return None;
        };
        debug!(
            "{} candidates, spacing {:.1}px, grid angle {:.1}°",
            points.len(),
            spacing,
            grid_angle.to_degrees()
        );

        let graph = GridGraph::new(points, &self.params.graph, spacing, grid_angle);
        let mut components = connected_components(&graph);
        components.sort_by_key(|c| std::cmp::Reverse(c.len()));

        for component in components.iter().filter(|c| c.len() == needed) {
            let Some(coords) = assign_grid_coordinates(&graph, component) else {
                continue;
            };
            if let Some(corners) = order_corners(points, &coords, size) {
                info!(
                    "chessboard {}x{} found ({} candidates)",
                    size.cols,
                    size.rows,
                    points.len()
                );
                return Some(ChessboardDetection {
                    size,
                    corners,
                    spacing_px: spacing,
                });
            }
        }

        debug!(
            "no component matches {}x{} (largest has {} nodes)",
            size.cols,
            size.rows,
            components.first().map_or(0, Vec::len)
        );
        None
    }
}

/// Map BFS coordinates to raster order.
///
/// When the board appears rotated by 90° (its `cols` run along the image
/// y-axis), the grid frame is rotated so `i` follows `cols`.
fn order_corners(
    points: &[Point2<f32>],
    coords: &[(usize, i32, i32)],
    size: BoardSize,
) -> Option<Vec<Point2<f64>>> {
    let (min_i, max_i) = coords.iter().fold((i32::MAX, i32::MIN), |(lo, hi), c| {
        (lo.min(c.1), hi.max(c.1))
    });
    let (min_j, max_j) = coords.iter().fold((i32::MAX, i32::MIN), |(lo, hi), c| {
        (lo.min(c.2), hi.max(c.2))
    });
    let extent = ((max_i - min_i + 1) as u32, (max_j - min_j + 1) as u32);

    let transposed = if extent == (size.cols, size.rows) {
        false
    } else if extent == (size.rows, size.cols) {
        true
    } else {
        return None;
    };

    let cols = size.cols as usize;
    let mut out = vec![Point2::new(f64::NAN, f64::NAN); size.corner_count()];
    for &(node, i, j) in coords {
        let (gi, gj) = if transposed {
            ((j - min_j) as usize, (max_i - i) as usize)
        } else {
            ((i - min_i) as usize, (j - min_j) as usize)
        };
        let p = points[node];
        out[gi + gj * cols] = Point2::new(p.x as f64, p.y as f64);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice(cols: usize, rows: usize, spacing: f32, angle: f32) -> Vec<Point2<f32>> {
        let (s, c) = angle.sin_cos();
        let mut pts = Vec::new();
        for j in 0..rows {
            for i in 0..cols {
                let (x, y) = (i as f32 * spacing, j as f32 * spacing);
                pts.push(Point2::new(200.0 + c * x - s * y, 150.0 + s * x + c * y));
            }
        }
        pts
    }

    #[test]
    fn fast_rejection_when_too_few_candidates() {
        let det = ChessboardDetector::new(ChessboardParams::default());
        let pts = lattice(3, 3, 20.0, 0.0);
        assert!(det.detect_from_points(&pts, BoardSize::new(4, 3)).is_none());
    }

    #[test]
    fn ordered_output_is_row_major() {
        let det = ChessboardDetector::new(ChessboardParams::default());
        let mut pts = lattice(6, 4, 25.0, 0.2);
        pts.reverse();
        let found = det
            .detect_from_points(&pts, BoardSize::new(6, 4))
            .expect("board");
        let truth = lattice(6, 4, 25.0, 0.2);
        for (a, b) in found.corners.iter().zip(truth.iter()) {
            assert!((a.x - b.x as f64).abs() < 1e-4 && (a.y - b.y as f64).abs() < 1e-4);
        }
    }

    #[test]
    fn transposed_board_is_rotated_into_cols_first_order() {
        let det = ChessboardDetector::new(ChessboardParams::default());
        // 4 columns along x in the image, but the target has 6 cols and 4 rows
        let pts = lattice(4, 6, 25.0, 0.0);
        let found = det
            .detect_from_points(&pts, BoardSize::new(6, 4))
            .expect("board");
        assert_eq!(found.corners.len(), 24);
        // consecutive indices within a row follow the image y-axis
        let d = found.corners[1] - found.corners[0];
        assert!(d.x.abs() < 1e-4 && (d.y - 25.0).abs() < 1e-4);
        assert!(found.corners.iter().all(|p| p.x.is_finite()));
    }

    #[test]
    fn clutter_far_from_the_board_is_ignored() {
        let det = ChessboardDetector::new(ChessboardParams::default());
        let mut pts = lattice(5, 4, 30.0, -0.15);
        pts.push(Point2::new(10.0, 10.0));
        pts.push(Point2::new(600.0, 20.0));
        let found = det.detect_from_points(&pts, BoardSize::new(5, 4));
        assert!(found.is_some());
    }
}
