//! Ordered chessboard detection for the dual-camera calibration workflow.
//!
//! ## Quickstart
//!
//! ```
//! use roimap_chessboard::{BoardSize, ChessboardDetector, ChessboardParams};
//! use roimap_core::GrayImage;
//!
//! let detector = ChessboardDetector::new(ChessboardParams::default());
//! let blank = GrayImage::new(64, 48);
//! assert!(detector.detect(&blank.view(), BoardSize::new(9, 6)).is_none());
//! ```
//!
//! Pipeline:
//! 1. ChESS X-junction candidates from `chess-corners`.
//! 2. Square size from the median nearest-neighbour distance.
//! 3. Dominant grid direction from nearest-neighbour edges (modulo 90°).
//! 4. Reciprocal right/left/up/down links in the grid-aligned frame.
//! 5. BFS over each connected component to assign integer `(i, j)`.
//! 6. Keep the component whose extent matches `cols x rows` (up to a swap).
//! 7. Iterative sub-pixel refinement in a `11 x 11` window.
//!
//! A missing board is reported as `None`, never as an error.

mod detector;
mod geom;
mod gridgraph;
mod params;
mod subpix;

pub use detector::{BoardSize, ChessboardDetection, ChessboardDetector};
pub use params::{ChessResponseParams, ChessboardParams, GridGraphParams, SubPixParams};
pub use subpix::{refine_corner, refine_corners};
