use std::fs;

use digit_extractor::config::{FINAL_H, FINAL_W, NUM_SEGMENTS, SEGMENT_SIZE};
use digit_extractor::geometry::order_points;
use digit_extractor::saver::save_segments;
use digit_extractor::segment::segment_strip;
use digit_extractor::utils::{read_color, rotate_image, write_image};
use digit_extractor::warp::{warp_strip, WarpParams};
use digit_extractor::ExtractorError;
use opencv::core::{self, Mat, Point, Point2f, Scalar, CV_8UC3};
use opencv::imgproc;
use opencv::prelude::*;

/// White page with a 500x100 strip at (50, 40); a vertical stroke is drawn
/// in the middle of every cell listed in `inked`.
fn photo(inked: &[usize]) -> Mat {
    let mut page = Mat::new_rows_cols_with_default(200, 600, CV_8UC3, Scalar::all(255.0)).unwrap();
    for &cell in inked {
        let x = 50 + cell as i32 * 100 + 50;
        imgproc::line(
            &mut page,
            Point::new(x, 60),
            Point::new(x, 120),
            Scalar::all(0.0),
            6,
            imgproc::LINE_8,
            0,
        )
        .unwrap();
    }
    page
}

fn clicked_corners() -> Vec<Point2f> {
    // deliberately not in TL, TR, BR, BL order
    vec![
        Point2f::new(549.0, 139.0),
        Point2f::new(50.0, 40.0),
        Point2f::new(50.0, 139.0),
        Point2f::new(549.0, 40.0),
    ]
}

fn cell_mean(cell: &Mat) -> f64 {
    core::mean(cell, &core::no_array()).unwrap()[0]
}

#[test]
fn inked_cells_are_darker_than_blank_ones() {
    let quad = order_points(&clicked_corners()).unwrap();
    let strip = warp_strip(&photo(&[1, 3]), &quad, &WarpParams::default()).unwrap();
    assert_eq!((strip.cols(), strip.rows()), (FINAL_W, FINAL_H));

    let cells = segment_strip(&strip, NUM_SEGMENTS).unwrap();
    let means: Vec<f64> = cells.iter().map(cell_mean).collect();
    for blank in [0, 2, 4] {
        assert_eq!(means[blank], 255.0, "cell {blank} should be empty: {means:?}");
    }
    for inked in [1, 3] {
        assert!(means[inked] < 250.0, "cell {inked} lost its stroke: {means:?}");
    }
}

#[test]
fn saves_cells_into_label_folders() {
    let dir = tempfile::tempdir().unwrap();
    let quad = order_points(&clicked_corners()).unwrap();
    let strip = warp_strip(&photo(&[0, 2]), &quad, &WarpParams::default()).unwrap();
    let cells = segment_strip(&strip, NUM_SEGMENTS).unwrap();

    let report = save_segments(dir.path(), " 7A7b0 ", &cells).unwrap();
    assert_eq!(report.written.len(), NUM_SEGMENTS);
    assert_eq!(report.folders, vec!['0', '7', 'A', 'b']);
    assert_eq!(fs::read_dir(dir.path().join("7")).unwrap().count(), 2);

    for path in &report.written {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("segment_") && name.ends_with(".png"), "{name}");
        let decoded = image::open(path).unwrap();
        assert_eq!(
            (decoded.width(), decoded.height()),
            (SEGMENT_SIZE as u32, SEGMENT_SIZE as u32)
        );
    }
}

#[test]
fn wrong_label_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cells = segment_strip(
        &Mat::new_rows_cols_with_default(FINAL_H, FINAL_W, core::CV_8UC1, Scalar::all(255.0)).unwrap(),
        NUM_SEGMENTS,
    )
    .unwrap();

    let err = save_segments(dir.path(), "123", &cells).unwrap_err();
    assert!(matches!(err, ExtractorError::LabelLength { expected: 5, actual: 3 }));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn rotated_photo_is_extracted_after_rotating_back() {
    let dir = tempfile::tempdir().unwrap();
    let upright = photo(&[4]);
    let sideways = rotate_image(&upright, -90.0).unwrap();
    let path = dir.path().join("sideways.png");
    write_image(&path, &sideways).unwrap();

    let restored = rotate_image(&read_color(&path).unwrap(), 90.0).unwrap();
    assert_eq!((restored.cols(), restored.rows()), (600, 200));

    let quad = order_points(&clicked_corners()).unwrap();
    let strip = warp_strip(&restored, &quad, &WarpParams::default()).unwrap();
    let cells = segment_strip(&strip, NUM_SEGMENTS).unwrap();
    assert!(cell_mean(&cells[4]) < 250.0);
    assert_eq!(cell_mean(&cells[0]), 255.0);
}

#[test]
fn click_order_does_not_change_the_strip() {
    let page = photo(&[2]);
    let mut corners = clicked_corners();
    let first = warp_strip(&page, &order_points(&corners).unwrap(), &WarpParams::default()).unwrap();
    corners.rotate_left(1);
    corners.swap(0, 2);
    let second = warp_strip(&page, &order_points(&corners).unwrap(), &WarpParams::default()).unwrap();
    assert_eq!(first.data_bytes().unwrap(), second.data_bytes().unwrap());
}
