use roimap_chessboard::{BoardSize, ChessboardDetector, ChessboardParams};
use roimap_core::GrayImage;

/// Render a fronto-parallel chessboard with `cols x rows` interior corners.
///
/// Square `(0, 0)` is dark; the board sits on a white margin. Pixel centres
/// are at integer coordinates.
fn render_board(cols: usize, rows: usize, square: f64, origin: (f64, f64)) -> GrayImage {
    let (w, h) = (640usize, 480usize);
    let ss = 4;
    let mut img = GrayImage::new(w, h);
    let board_w = (cols + 1) as f64 * square;
    let board_h = (rows + 1) as f64 * square;
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for sy in 0..ss {
                for sx in 0..ss {
                    let u = x as f64 + (sx as f64 + 0.5) / ss as f64 - 0.5 - origin.0;
                    let v = y as f64 + (sy as f64 + 0.5) / ss as f64 - 0.5 - origin.1;
                    let white = if u < 0.0 || v < 0.0 || u >= board_w || v >= board_h {
                        true
                    } else {
                        let (ci, cj) = ((u / square) as usize, (v / square) as usize);
                        (ci + cj) % 2 == 1
                    };
                    if white {
                        acc += 1.0;
                    }
                }
            }
            img.data[y * w + x] = (20.0 + 215.0 * acc / (ss * ss) as f64).round() as u8;
        }
    }
    img
}

#[test]
fn detects_and_orders_rendered_board() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (cols, rows, square) = (7usize, 5usize, 40.0);
    let origin = (150.3, 110.7);
    let img = render_board(cols, rows, square, origin);

    let detector = ChessboardDetector::new(ChessboardParams::default());
    let found = detector
        .detect(&img.view(), BoardSize::new(cols as u32, rows as u32))
        .expect("board should be found");

    assert_eq!(found.corners.len(), cols * rows);

    // Ordering: first corner nearest the top-left, x grows along a row.
    let first = found.corners[0];
    let expected_first = (origin.0 + square, origin.1 + square);
    assert!((first.x - expected_first.0).abs() < 0.5, "x {}", first.x);
    assert!((first.y - expected_first.1).abs() < 0.5, "y {}", first.y);

    for j in 0..rows {
        for i in 0..cols {
            let c = found.corners[i + j * cols];
            let ex = origin.0 + (i + 1) as f64 * square;
            let ey = origin.1 + (j + 1) as f64 * square;
            assert!(
                (c.x - ex).abs() < 0.5 && (c.y - ey).abs() < 0.5,
                "corner ({i}, {j}) at ({:.2}, {:.2}), expected ({ex:.2}, {ey:.2})",
                c.x,
                c.y
            );
        }
    }
}

#[test]
fn wrong_board_size_is_not_found() {
    let img = render_board(7, 5, 40.0, (150.0, 110.0));
    let detector = ChessboardDetector::new(ChessboardParams::default());
    assert!(detector.detect(&img.view(), BoardSize::new(9, 6)).is_none());
}

#[test]
fn blank_image_is_not_found() {
    let img = GrayImage::from_raw(320, 240, vec![200; 320 * 240]).expect("buffer");
    let detector = ChessboardDetector::new(ChessboardParams::default());
    assert!(detector.detect(&img.view(), BoardSize::new(4, 3)).is_none());
}

#[test]
fn params_deserialize_with_defaults() {
    let params: ChessboardParams =
        serde_json::from_str(r#"{ "subpix": { "half_window": 3 } }"#).expect("json");
    assert_eq!(params.subpix.half_window, 3);
    assert_eq!(params.subpix.max_iterations, 30);
    assert!(!params.skip_refinement);
}
