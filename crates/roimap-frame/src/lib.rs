//! EpicRaw frame container support.
//!
//! A depth camera delivers each capture as a single little-endian binary
//! blob holding the colour image, a float32 depth map and the camera's
//! factory intrinsics. Two container revisions exist:
//!
//! - **EpicRaw1**: fixed 168-byte header, RGB24 image.
//! - **EpicRaw2**: 40-byte header with length-prefixed sections
//!   (matrix, distortion, JSON config, depth, image), RGB48 image.
//!
//! [`decode_frame`] sniffs the revision from the 8-byte tag and returns a
//! [`RawFrame`]. Sections with a zero length are reported as absent rather
//! than as errors. [`reconstruct_points`] turns a depth map into a per-pixel
//! 3D point map.
//!
//! ```
//! use roimap_frame::{decode_frame, encode_frame, FrameFormat, RawFrame, DepthMap};
//!
//! let mut frame = RawFrame::empty(FrameFormat::EpicRaw2, 2, 1);
//! frame.depth = Some(DepthMap::new(2, 1, vec![1000.0, f32::NAN]).unwrap());
//! let bytes = encode_frame(&frame).unwrap();
//! let decoded = decode_frame(&bytes).unwrap();
//! assert_eq!(decoded.depth.unwrap().get(0, 0), Some(1000.0));
//! ```

mod bytes;
mod decode;
mod depth;
mod encode;
mod error;
mod format;
mod pointcloud;
mod record;

pub use decode::{decode_epicraw1, decode_epicraw2, decode_frame, peek_dimensions};
pub use depth::{DepthMap, DepthStats};
pub use encode::{encode_epicraw1, encode_epicraw2, encode_frame};
pub use error::FrameError;
pub use format::{FrameFormat, EPICRAW1_HEADER_LEN, EPICRAW2_HEADER_LEN};
pub use pointcloud::{
    reconstruct_from_frame, reconstruct_points, DepthBounds, PointMap, UndistortLut,
};
pub use record::{CaptureConfig, FrameImage, LegacyCaptureConfig, RawFrame, TEN_BIT_TO_U8};
