use crate::bytes::{
    f32_values, f64_values, payload_len, read_f32, read_i32, read_u32, section, section_len,
    u16_values,
};
use crate::format::{EPICRAW1_HEADER_LEN, EPICRAW2_HEADER_LEN};
use crate::{CaptureConfig, DepthMap, FrameError, FrameFormat, FrameImage, LegacyCaptureConfig, RawFrame};
use log::debug;

#[cfg(feature = "tracing")]
use tracing::instrument;

const MATRIX_BYTES: usize = 9 * 8;

// EpicRaw1 header offsets
const R1_MATRIX: usize = 16;
const R1_DISTORTION: usize = 88;
const R1_DISTORTION_COUNT: usize = 5;
const R1_CONFIG: usize = 128;
const R1_DEPTH_LEN: usize = 160;
const R1_IMAGE_LEN: usize = 164;

/// Decode a frame of either revision.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(bytes), fields(len = bytes.len()))
)]
pub fn decode_frame(bytes: &[u8]) -> Result<RawFrame, FrameError> {
    match FrameFormat::detect(bytes)? {
        FrameFormat::EpicRaw1 => decode_epicraw1(bytes),
        FrameFormat::EpicRaw2 => decode_epicraw2(bytes),
    }
}

/// Width and height from the header without touching the payloads.
pub fn peek_dimensions(bytes: &[u8]) -> Result<(u32, u32), FrameError> {
    FrameFormat::detect(bytes)?;
    dimensions(bytes)
}

fn dimensions(bytes: &[u8]) -> Result<(u32, u32), FrameError> {
    let width = read_i32(bytes, 8, "frame width")?;
    let height = read_i32(bytes, 12, "frame height")?;
    if width <= 0 || height <= 0 {
        return Err(FrameError::InvalidDimensions {
            width: width as i64,
            height: height as i64,
        });
    }
    Ok((width as u32, height as u32))
}

fn matrix_rows(raw: &[u8]) -> Result<[[f64; 3]; 3], FrameError> {
    if raw.len() != MATRIX_BYTES {
        return Err(FrameError::SectionSize {
            section: "camera matrix",
            expected: MATRIX_BYTES,
            got: raw.len(),
        });
    }
    let v = f64_values(raw);
    Ok([[v[0], v[1], v[2]], [v[3], v[4], v[5]], [v[6], v[7], v[8]]])
}

fn depth_section(raw: &[u8], width: usize, height: usize) -> Result<Option<DepthMap>, FrameError> {
    if raw.is_empty() {
        return Ok(None);
    }
    let expected = payload_len("depth", width, height, 4)?;
    if raw.len() != expected {
        return Err(FrameError::SectionSize {
            section: "depth",
            expected,
            got: raw.len(),
        });
    }
    Ok(DepthMap::new(width, height, f32_values(raw)))
}

fn image_section(
    raw: &[u8],
    width: usize,
    height: usize,
    format: FrameFormat,
) -> Result<Option<FrameImage>, FrameError> {
    if raw.is_empty() {
        return Ok(None);
    }
    let expected = payload_len("image", width, height, 3 * format.image_sample_size())?;
    if raw.len() != expected {
        return Err(FrameError::SectionSize {
            section: "image",
            expected,
            got: raw.len(),
        });
    }
    Ok(Some(match format {
        FrameFormat::EpicRaw1 => FrameImage::Rgb8(raw.to_vec()),
        FrameFormat::EpicRaw2 => FrameImage::Rgb16(u16_values(raw)),
    }))
}

/// Decode the fixed-header revision.
///
/// Layout: tag, width, height, 3×3 f64 matrix, five f64 distortion
/// coefficients, 28-byte capture settings, 4 reserved bytes, depth and image
/// lengths; the depth payload follows the header and the RGB24 image follows
/// the depth payload.
pub fn decode_epicraw1(bytes: &[u8]) -> Result<RawFrame, FrameError> {
    section(bytes, 0, EPICRAW1_HEADER_LEN, "EpicRaw1 header")?;
    let (width, height) = dimensions(bytes)?;
    let (w, h) = (width as usize, height as usize);

    let camera_matrix = matrix_rows(section(bytes, R1_MATRIX, MATRIX_BYTES, "camera matrix")?)?;
    let distortion = f64_values(section(
        bytes,
        R1_DISTORTION,
        R1_DISTORTION_COUNT * 8,
        "distortion",
    )?);

    let c = R1_CONFIG;
    let config = LegacyCaptureConfig {
        projector_brightness: read_u32(bytes, c, "capture config")?,
        exposure_2d: read_f32(bytes, c + 4, "capture config")?,
        exposure_3d: read_f32(bytes, c + 8, "capture config")?,
        use_hdr: read_u32(bytes, c + 12, "capture config")?,
        exposure_hdr: read_f32(bytes, c + 16, "capture config")?,
        use_pf: read_u32(bytes, c + 20, "capture config")?,
        use_sf: read_u32(bytes, c + 24, "capture config")?,
    };

    let depth_len = section_len(read_i32(bytes, R1_DEPTH_LEN, "depth length")?, "depth")?;
    let image_len = section_len(read_i32(bytes, R1_IMAGE_LEN, "image length")?, "image")?;

    let depth_raw = section(bytes, EPICRAW1_HEADER_LEN, depth_len, "depth payload")?;
    let image_raw = section(bytes, EPICRAW1_HEADER_LEN + depth_len, image_len, "image payload")?;

    debug!(
        "EpicRaw1 frame {}x{}: depth {} bytes, image {} bytes",
        width, height, depth_len, image_len
    );

    Ok(RawFrame {
        format: FrameFormat::EpicRaw1,
        width,
        height,
        data_type: 0,
        camera_matrix,
        distortion,
        config: CaptureConfig::Legacy(config),
        depth: depth_section(depth_raw, w, h)?,
        image: image_section(image_raw, w, h, FrameFormat::EpicRaw1)?,
    })
}

/// Decode the sectioned revision.
///
/// The header holds nine little-endian fields after the tag: width, height,
/// data type and the byte lengths of the matrix, distortion, config, depth
/// and image sections, which follow the header in that order.
pub fn decode_epicraw2(bytes: &[u8]) -> Result<RawFrame, FrameError> {
    section(bytes, 0, EPICRAW2_HEADER_LEN, "EpicRaw2 header")?;
    let (width, height) = dimensions(bytes)?;
    let (w, h) = (width as usize, height as usize);

    let data_type = read_i32(bytes, 16, "data type")?;
    let matrix_len = section_len(read_i32(bytes, 20, "matrix length")?, "camera matrix")?;
    let distortion_len = section_len(read_i32(bytes, 24, "distortion length")?, "distortion")?;
    let config_len = section_len(read_i32(bytes, 28, "config length")?, "config")?;
    let depth_len = section_len(read_i32(bytes, 32, "depth length")?, "depth")?;
    let image_len = section_len(read_i32(bytes, 36, "image length")?, "image")?;

    if distortion_len % 8 != 0 {
        return Err(FrameError::SectionSize {
            section: "distortion",
            expected: distortion_len / 8 * 8,
            got: distortion_len,
        });
    }

    let mut offset = EPICRAW2_HEADER_LEN;
    let mut next = |len: usize, what: &'static str| {
        let s = section(bytes, offset, len, what);
        offset += len;
        s
    };

    let matrix_raw = next(matrix_len, "camera matrix")?;
    let distortion_raw = next(distortion_len, "distortion")?;
    let config_raw = next(config_len, "config")?;
    let depth_raw = next(depth_len, "depth payload")?;
    let image_raw = next(image_len, "image payload")?;

    let config = if config_raw.is_empty() {
        CaptureConfig::None
    } else {
        let text = std::str::from_utf8(config_raw).map_err(|_| FrameError::ConfigEncoding)?;
        CaptureConfig::Json(serde_json::from_str(text)?)
    };

    debug!(
        "EpicRaw2 frame {}x{} type {}: depth {} bytes, image {} bytes, config {} bytes",
        width, height, data_type, depth_len, image_len, config_len
    );

    Ok(RawFrame {
        format: FrameFormat::EpicRaw2,
        width,
        height,
        data_type,
        camera_matrix: matrix_rows(matrix_raw)?,
        distortion: f64_values(distortion_raw),
        config,
        depth: depth_section(depth_raw, w, h)?,
        image: image_section(image_raw, w, h, FrameFormat::EpicRaw2)?,
    })
}
