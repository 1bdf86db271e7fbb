use roimap_frame::{
    decode_frame, encode_epicraw1, encode_epicraw2, encode_frame, peek_dimensions,
    reconstruct_from_frame, CaptureConfig, DepthBounds, DepthMap, FrameError, FrameFormat,
    FrameImage, LegacyCaptureConfig, RawFrame, EPICRAW1_HEADER_LEN, EPICRAW2_HEADER_LEN,
};

const W: u32 = 7;
const H: u32 = 5;

fn camera_matrix() -> [[f64; 3]; 3] {
    [
        [2315.25, 0.0, 1024.5],
        [0.0, 2314.75, 767.125],
        [0.0, 0.0, 1.0],
    ]
}

fn depth_samples() -> Vec<f32> {
    (0..W * H)
        .map(|i| match i % 6 {
            0 => 0.0,
            1 => f32::NAN,
            _ => 500.0 + i as f32 * 3.25,
        })
        .collect()
}

fn synthetic_raw1() -> RawFrame {
    let n = (W * H) as usize;
    RawFrame {
        format: FrameFormat::EpicRaw1,
        width: W,
        height: H,
        data_type: 0,
        camera_matrix: camera_matrix(),
        distortion: vec![-0.071, 0.125, 0.0004, -0.0002, -0.03],
        config: CaptureConfig::Legacy(LegacyCaptureConfig {
            projector_brightness: 200,
            exposure_2d: 12.5,
            exposure_3d: 8.0,
            use_hdr: 1,
            exposure_hdr: 30.0,
            use_pf: 0,
            use_sf: 1,
        }),
        depth: DepthMap::new(W as usize, H as usize, depth_samples()),
        image: Some(FrameImage::Rgb8((0..n * 3).map(|i| (i * 7 % 256) as u8).collect())),
    }
}

fn synthetic_raw2() -> RawFrame {
    let n = (W * H) as usize;
    RawFrame {
        format: FrameFormat::EpicRaw2,
        width: W,
        height: H,
        data_type: 3,
        camera_matrix: camera_matrix(),
        distortion: vec![0.01, -0.02, 0.0, 0.0, 0.003, 0.0, 0.0, 0.0],
        config: CaptureConfig::Json(serde_json::json!({
            "exposure": 15.0,
            "hdr": false,
            "name": "bench-left"
        })),
        depth: DepthMap::new(W as usize, H as usize, depth_samples()),
        image: Some(FrameImage::Rgb16(
            (0..n * 3).map(|i| (i * 977 % 65536) as u16).collect(),
        )),
    }
}

fn assert_depth_bit_exact(a: &RawFrame, b: &RawFrame) {
    let da = a.depth.as_ref().expect("depth").as_slice();
    let db = b.depth.as_ref().expect("depth").as_slice();
    assert_eq!(da.len(), db.len());
    for (x, y) in da.iter().zip(db) {
        assert_eq!(x.to_bits(), y.to_bits());
    }
}

#[test]
fn epicraw1_round_trip_is_exact() {
    let frame = synthetic_raw1();
    let bytes = encode_epicraw1(&frame).expect("encode");
    assert_eq!(
        bytes.len(),
        EPICRAW1_HEADER_LEN + (W * H * 4 + W * H * 3) as usize
    );
    let decoded = decode_frame(&bytes).expect("decode");
    assert_eq!(decoded.format, FrameFormat::EpicRaw1);
    assert_eq!(decoded.camera_matrix, frame.camera_matrix);
    assert_eq!(decoded.distortion, frame.distortion);
    assert_eq!(decoded.config, frame.config);
    assert_eq!(decoded.image, frame.image);
    assert_depth_bit_exact(&decoded, &frame);
}

#[test]
fn epicraw2_round_trip_is_exact() {
    let frame = synthetic_raw2();
    let bytes = encode_epicraw2(&frame).expect("encode");
    let decoded = decode_frame(&bytes).expect("decode");
    assert_eq!(decoded.format, FrameFormat::EpicRaw2);
    assert_eq!(decoded.data_type, 3);
    assert_eq!(decoded.camera_matrix, frame.camera_matrix);
    assert_eq!(decoded.distortion, frame.distortion);
    assert_eq!(decoded.config, frame.config);
    assert_eq!(decoded.image, frame.image);
    assert_depth_bit_exact(&decoded, &frame);
    assert_eq!(peek_dimensions(&bytes).unwrap(), (W, H));
}

#[test]
fn legacy_tag_decodes_as_first_revision() {
    let mut bytes = encode_epicraw1(&synthetic_raw1()).expect("encode");
    bytes[..8].copy_from_slice(b"EPICRAW\0");
    let decoded = decode_frame(&bytes).expect("decode");
    assert_eq!(decoded.format, FrameFormat::EpicRaw1);
    assert_eq!(decoded.width, W);
}

#[test]
fn zero_length_sections_are_absent() {
    for format in [FrameFormat::EpicRaw1, FrameFormat::EpicRaw2] {
        let frame = RawFrame::empty(format, W, H);
        let bytes = encode_frame(&frame).expect("encode");
        assert!(bytes.len() >= EPICRAW2_HEADER_LEN);
        let decoded = decode_frame(&bytes).expect("decode");
        assert!(decoded.depth.is_none(), "{format:?}");
        assert!(decoded.image.is_none(), "{format:?}");
        assert!(decoded.gray().is_none());
        assert!(reconstruct_from_frame(&decoded, None, DepthBounds::default()).is_none());
    }
}

#[test]
fn unknown_tag_is_a_format_error() {
    let mut bytes = encode_epicraw2(&synthetic_raw2()).expect("encode");
    bytes[..8].copy_from_slice(b"NOTAFRAM");
    assert!(matches!(
        decode_frame(&bytes),
        Err(FrameError::UnsupportedFormat { .. })
    ));
}

#[test]
fn truncated_payload_is_reported() {
    let bytes = encode_epicraw1(&synthetic_raw1()).expect("encode");
    let cut = &bytes[..bytes.len() - 10];
    assert!(matches!(
        decode_frame(cut),
        Err(FrameError::Truncated { .. })
    ));
    assert!(matches!(
        decode_frame(&bytes[..100]),
        Err(FrameError::Truncated { .. })
    ));
}

#[test]
fn negative_section_length_is_reported() {
    let mut bytes = encode_epicraw2(&synthetic_raw2()).expect("encode");
    bytes[32..36].copy_from_slice(&(-4i32).to_le_bytes());
    assert!(matches!(
        decode_frame(&bytes),
        Err(FrameError::NegativeLength { section: "depth", .. })
    ));
}

#[test]
fn depth_size_mismatch_is_reported() {
    let mut frame = synthetic_raw1();
    frame.width = W + 1;
    frame.image = None;
    // payload still sized for W x H
    let mut bytes = encode_epicraw1(&synthetic_raw1()).expect("encode");
    bytes[8..12].copy_from_slice(&((W + 1) as i32).to_le_bytes());
    assert!(matches!(
        decode_frame(&bytes),
        Err(FrameError::SectionSize { section: "depth", .. })
    ));
    assert!(matches!(
        encode_epicraw1(&frame),
        Err(FrameError::SectionSize { section: "depth", .. })
    ));
}

#[test]
fn oversized_header_dimensions_are_reported() {
    let frame = RawFrame {
        image: Some(FrameImage::Rgb16(vec![1, 2, 3])),
        ..RawFrame::empty(FrameFormat::EpicRaw2, 1, 1)
    };
    let mut bytes = encode_epicraw2(&frame).expect("encode");
    bytes[8..12].copy_from_slice(&i32::MAX.to_le_bytes());
    bytes[12..16].copy_from_slice(&i32::MAX.to_le_bytes());
    assert!(matches!(
        decode_frame(&bytes),
        Err(FrameError::PayloadOverflow { section: "image", .. })
    ));

    let frame = RawFrame {
        depth: DepthMap::new(1, 1, vec![750.0]),
        ..RawFrame::empty(FrameFormat::EpicRaw1, 1, 1)
    };
    let mut bytes = encode_epicraw1(&frame).expect("encode");
    bytes[8..12].copy_from_slice(&i32::MAX.to_le_bytes());
    bytes[12..16].copy_from_slice(&i32::MAX.to_le_bytes());
    assert!(matches!(
        decode_frame(&bytes),
        Err(FrameError::SectionSize { section: "depth", got: 4, .. })
    ));
}

#[test]
fn image_bit_depth_must_match_revision() {
    let mut frame = synthetic_raw1();
    frame.image = synthetic_raw2().image;
    assert!(matches!(
        encode_epicraw1(&frame),
        Err(FrameError::Unencodable { .. })
    ));
}

#[test]
fn decoded_frame_feeds_point_reconstruction() {
    let decoded = decode_frame(&encode_epicraw2(&synthetic_raw2()).unwrap()).unwrap();
    let points = reconstruct_from_frame(&decoded, None, DepthBounds::default())
        .expect("depth present")
        .expect("sizes agree");
    let expected_valid = depth_samples()
        .iter()
        .filter(|d| DepthBounds::default().contains(**d))
        .count();
    assert_eq!(points.valid_count(), expected_valid);
    let camera = decoded.camera();
    assert_eq!(camera.intrinsics.fx, 2315.25);
    assert!(camera.distortion.is_present());
}
