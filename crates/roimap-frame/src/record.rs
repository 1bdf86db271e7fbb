use crate::{DepthMap, FrameFormat};
use roimap_core::{CameraModel, Distortion, GrayImage, Intrinsics};
use serde::{Deserialize, Serialize};

/// Scale applied to 16-bit samples when producing 8-bit previews; the sensor
/// delivers 10 significant bits.
pub const TEN_BIT_TO_U8: f32 = 255.0 / 1024.0;

/// Interleaved RGB pixels; the sample width depends on the container revision.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameImage {
    Rgb8(Vec<u8>),
    Rgb16(Vec<u16>),
}

impl FrameImage {
    pub fn len(&self) -> usize {
        match self {
            Self::Rgb8(v) => v.len(),
            Self::Rgb16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// BT.601 luminance; 16-bit samples are scaled by `scale16` and saturated.
    pub fn to_gray(&self, width: usize, height: usize, scale16: f32) -> Option<GrayImage> {
        if width.checked_mul(height).and_then(|n| n.checked_mul(3)) != Some(self.len()) {
            return None;
        }
        let luma = |r: f32, g: f32, b: f32| (0.299 * r + 0.587 * g + 0.114 * b).round();
        let data = match self {
            Self::Rgb8(px) => px
                .chunks_exact(3)
                .map(|c| luma(c[0] as f32, c[1] as f32, c[2] as f32).clamp(0.0, 255.0) as u8)
                .collect(),
            Self::Rgb16(px) => px
                .chunks_exact(3)
                .map(|c| {
                    let l = luma(c[0] as f32, c[1] as f32, c[2] as f32);
                    (l * scale16).round().clamp(0.0, 255.0) as u8
                })
                .collect(),
        };
        GrayImage::from_raw(width, height, data)
    }
}

/// Fixed capture settings block of an EpicRaw1 header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyCaptureConfig {
    pub projector_brightness: u32,
    pub exposure_2d: f32,
    pub exposure_3d: f32,
    pub use_hdr: u32,
    pub exposure_hdr: f32,
    pub use_pf: u32,
    pub use_sf: u32,
}

/// Capture settings embedded in a frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CaptureConfig {
    Legacy(LegacyCaptureConfig),
    /// Free-form JSON document of an EpicRaw2 frame.
    Json(serde_json::Value),
    None,
}

/// A decoded capture.
#[derive(Clone, Debug, PartialEq)]
pub struct RawFrame {
    pub format: FrameFormat,
    pub width: u32,
    pub height: u32,
    /// EpicRaw2 `data_type` header field; zero for EpicRaw1.
    pub data_type: i32,
    /// Row-major 3×3 camera matrix.
    pub camera_matrix: [[f64; 3]; 3],
    pub distortion: Vec<f64>,
    pub config: CaptureConfig,
    pub depth: Option<DepthMap>,
    pub image: Option<FrameImage>,
}

impl RawFrame {
    /// A frame with no payloads, identity camera matrix and no distortion.
    pub fn empty(format: FrameFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
            data_type: 0,
            camera_matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            distortion: match format {
                FrameFormat::EpicRaw1 => vec![0.0; 5],
                FrameFormat::EpicRaw2 => Vec::new(),
            },
            config: match format {
                FrameFormat::EpicRaw1 => CaptureConfig::Legacy(LegacyCaptureConfig::default()),
                FrameFormat::EpicRaw2 => CaptureConfig::None,
            },
            depth: None,
            image: None,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn intrinsics(&self) -> Intrinsics {
        Intrinsics::from_rows(self.camera_matrix)
    }

    pub fn camera(&self) -> CameraModel {
        CameraModel::new(self.intrinsics(), Distortion::from_coeffs(&self.distortion))
    }

    /// 8-bit luminance of the colour image, if present.
    pub fn gray(&self) -> Option<GrayImage> {
        self.image.as_ref()?.to_gray(
            self.width as usize,
            self.height as usize,
            TEN_BIT_TO_U8,
        )
    }
}
