//! Aggregated tunables, loadable from a JSON file.

use crate::Error;
use roimap_calib::{MonoCalibParams, StereoParams, TargetSpec};
use roimap_chessboard::{BoardSize, ChessboardParams};
use roimap_frame::DepthBounds;
use roimap_transform::TransformParams;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Every configurable threshold of the calibration and transform pipeline.
///
/// Missing keys take their defaults, so a file only needs the values it
/// overrides:
///
/// ```
/// let cfg: roimap::RoimapConfig =
///     serde_json::from_str(r#"{ "target": { "cols": 7, "rows": 5, "square_size": 30.0 } }"#)
///         .unwrap();
/// assert_eq!(cfg.target.cols, 7);
/// assert_eq!(cfg.stereo.min_pairs, 3);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoimapConfig {
    pub target: TargetSpec,
    pub chessboard: ChessboardParams,
    pub depth_bounds: DepthBounds,
    /// Camera-2 (and multi-view camera-1) intrinsic estimation.
    pub mono: MonoCalibParams,
    pub stereo: StereoParams,
    pub transform: TransformParams,
}

impl RoimapConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, Error> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn board_size(&self) -> BoardSize {
        BoardSize::new(self.target.cols, self.target.rows)
    }
}
