//! Helpers for callers holding `image::GrayImage` buffers.

use crate::workflow::ImagePair;
use roimap_chessboard::{BoardSize, ChessboardDetection, ChessboardDetector, ChessboardParams};
use roimap_core::GrayImageView;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Borrow an `image::GrayImage` as a [`GrayImageView`].
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Pair two `image` buffers for the calibration workflow.
pub fn image_pair<'a>(
    camera1: &'a ::image::GrayImage,
    camera2: &'a ::image::GrayImage,
) -> ImagePair<'a> {
    ImagePair::new(gray_view(camera1), gray_view(camera2))
}

/// Run the chessboard detector on an `image::GrayImage`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, params), fields(width = img.width(), height = img.height()))
)]
pub fn detect_chessboard(
    img: &::image::GrayImage,
    params: ChessboardParams,
    size: BoardSize,
) -> Option<ChessboardDetection> {
    ChessboardDetector::new(params).detect(&gray_view(img), size)
}
