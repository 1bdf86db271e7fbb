use serde::{Deserialize, Serialize};

/// Settings forwarded to the ChESS corner response stage.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChessResponseParams {
    /// Response threshold relative to the strongest response in the image.
    pub threshold_rel: f32,
    /// Non-maximum suppression radius in pixels.
    pub nms_radius: u32,
    /// Minimum number of above-threshold pixels forming a corner blob.
    pub min_cluster_size: u32,
}

impl Default for ChessResponseParams {
    fn default() -> Self {
        Self {
            threshold_rel: 0.2,
            nms_radius: 2,
            min_cluster_size: 2,
        }
    }
}

/// Neighbour graph settings used to assemble raw corners into a grid.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GridGraphParams {
    /// Accepted neighbour distance, as a fraction of the estimated square size.
    pub min_spacing_ratio: f32,
    pub max_spacing_ratio: f32,
    /// Number of nearest candidates examined per corner.
    pub k_neighbors: usize,
    /// Maximum deviation of an edge from the local grid axes.
    pub direction_tolerance_deg: f32,
}

impl Default for GridGraphParams {
    fn default() -> Self {
        Self {
            min_spacing_ratio: 0.6,
            max_spacing_ratio: 1.5,
            k_neighbors: 8,
            direction_tolerance_deg: 25.0,
        }
    }
}

/// Iterative sub-pixel refinement settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SubPixParams {
    /// Half-size of the search window; the window spans `2 * half_window + 1` pixels.
    pub half_window: u32,
    pub max_iterations: u32,
    /// Stop once a refinement step moves the corner less than this (pixels).
    pub epsilon: f64,
}

impl Default for SubPixParams {
    fn default() -> Self {
        Self {
            half_window: 5,
            max_iterations: 30,
            epsilon: 0.001,
        }
    }
}

/// Parameters of the chessboard detector.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChessboardParams {
    pub response: ChessResponseParams,
    pub graph: GridGraphParams,
    pub subpix: SubPixParams,
    /// Skip sub-pixel refinement and return ChESS positions directly.
    pub skip_refinement: bool,
}
