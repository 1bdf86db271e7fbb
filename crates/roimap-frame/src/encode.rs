use crate::bytes::{payload_len, LeWriter};
use crate::format::{EPICRAW1_HEADER_LEN, EPICRAW2_HEADER_LEN};
use crate::{CaptureConfig, FrameError, FrameFormat, FrameImage, LegacyCaptureConfig, RawFrame};

fn checked_i32(len: usize, what: &'static str, format: &'static str) -> Result<i32, FrameError> {
    i32::try_from(len).map_err(|_| FrameError::Unencodable { what, format })
}

fn check_payload_sizes(frame: &RawFrame) -> Result<(), FrameError> {
    let n = frame.pixel_count();
    if let Some(depth) = &frame.depth {
        if depth.as_slice().len() != n {
            return Err(FrameError::SectionSize {
                section: "depth",
                expected: n,
                got: depth.as_slice().len(),
            });
        }
    }
    if let Some(image) = &frame.image {
        let expected = payload_len("image", frame.width as usize, frame.height as usize, 3)?;
        if image.len() != expected {
            return Err(FrameError::SectionSize {
                section: "image",
                expected,
                got: image.len(),
            });
        }
    }
    Ok(())
}

fn write_matrix(w: &mut LeWriter, rows: &[[f64; 3]; 3]) {
    for v in rows.iter().flatten() {
        w.f64(*v);
    }
}

fn depth_bytes(frame: &RawFrame) -> Vec<u8> {
    frame
        .depth
        .as_ref()
        .map(|d| d.as_slice().iter().flat_map(|v| v.to_le_bytes()).collect())
        .unwrap_or_default()
}

/// Serialise into the fixed-header revision.
///
/// The image must be RGB8 and at most five distortion coefficients fit.
pub fn encode_epicraw1(frame: &RawFrame) -> Result<Vec<u8>, FrameError> {
    const FORMAT: &str = "EpicRaw1";
    check_payload_sizes(frame)?;
    if frame.distortion.len() > 5 {
        return Err(FrameError::Unencodable {
            what: "more than five distortion coefficients",
            format: FORMAT,
        });
    }
    let image: &[u8] = match &frame.image {
        Some(FrameImage::Rgb8(px)) => px,
        Some(FrameImage::Rgb16(_)) => {
            return Err(FrameError::Unencodable {
                what: "a 16-bit image",
                format: FORMAT,
            })
        }
        None => &[],
    };
    let config = match &frame.config {
        CaptureConfig::Legacy(c) => *c,
        _ => LegacyCaptureConfig::default(),
    };
    let depth = depth_bytes(frame);

    let mut w = LeWriter::with_capacity(EPICRAW1_HEADER_LEN + depth.len() + image.len());
    w.bytes(FrameFormat::EpicRaw1.tag());
    w.i32(checked_i32(frame.width as usize, "width", FORMAT)?);
    w.i32(checked_i32(frame.height as usize, "height", FORMAT)?);
    write_matrix(&mut w, &frame.camera_matrix);
    for i in 0..5 {
        w.f64(frame.distortion.get(i).copied().unwrap_or(0.0));
    }
    w.u32(config.projector_brightness);
    w.f32(config.exposure_2d);
    w.f32(config.exposure_3d);
    w.u32(config.use_hdr);
    w.f32(config.exposure_hdr);
    w.u32(config.use_pf);
    w.u32(config.use_sf);
    w.bytes(&[0; 4]);
    w.i32(checked_i32(depth.len(), "depth payload", FORMAT)?);
    w.i32(checked_i32(image.len(), "image payload", FORMAT)?);
    debug_assert_eq!(w.len(), EPICRAW1_HEADER_LEN);

    w.bytes(&depth);
    w.bytes(image);
    Ok(w.buf)
}

/// Serialise into the sectioned revision. The image must be RGB16.
pub fn encode_epicraw2(frame: &RawFrame) -> Result<Vec<u8>, FrameError> {
    const FORMAT: &str = "EpicRaw2";
    check_payload_sizes(frame)?;
    let image: Vec<u8> = match &frame.image {
        Some(FrameImage::Rgb16(px)) => px.iter().flat_map(|v| v.to_le_bytes()).collect(),
        Some(FrameImage::Rgb8(_)) => {
            return Err(FrameError::Unencodable {
                what: "an 8-bit image",
                format: FORMAT,
            })
        }
        None => Vec::new(),
    };
    let config = match &frame.config {
        CaptureConfig::Json(v) => serde_json::to_vec(v)?,
        CaptureConfig::Legacy(c) => serde_json::to_vec(c)?,
        CaptureConfig::None => Vec::new(),
    };
    let depth = depth_bytes(frame);
    let distortion_len = frame.distortion.len() * 8;

    let mut w = LeWriter::with_capacity(
        EPICRAW2_HEADER_LEN + 72 + distortion_len + config.len() + depth.len() + image.len(),
    );
    w.bytes(FrameFormat::EpicRaw2.tag());
    w.i32(checked_i32(frame.width as usize, "width", FORMAT)?);
    w.i32(checked_i32(frame.height as usize, "height", FORMAT)?);
    w.i32(frame.data_type);
    w.i32(72);
    w.i32(checked_i32(distortion_len, "distortion", FORMAT)?);
    w.i32(checked_i32(config.len(), "config", FORMAT)?);
    w.i32(checked_i32(depth.len(), "depth payload", FORMAT)?);
    w.i32(checked_i32(image.len(), "image payload", FORMAT)?);
    debug_assert_eq!(w.len(), EPICRAW2_HEADER_LEN);

    write_matrix(&mut w, &frame.camera_matrix);
    for v in &frame.distortion {
        w.f64(*v);
    }
    w.bytes(&config);
    w.bytes(&depth);
    w.bytes(&image);
    Ok(w.buf)
}

/// Serialise using the revision recorded in `frame.format`.
pub fn encode_frame(frame: &RawFrame) -> Result<Vec<u8>, FrameError> {
    match frame.format {
        FrameFormat::EpicRaw1 => encode_epicraw1(frame),
        FrameFormat::EpicRaw2 => encode_epicraw2(frame),
    }
}
