use std::path::{Path, PathBuf};

use egui::ColorImage;
use log::debug;
use opencv::{
    core::{self, Mat, Point2f, Scalar, Size, Vector},
    imgcodecs,
    imgproc::{self, COLOR_BGR2RGBA, COLOR_BGRA2RGBA, COLOR_GRAY2RGBA},
    prelude::*,
};

use crate::error::{ExtractorError, Result};

pub fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| ExtractorError::NonUtf8Path(path.to_path_buf()))
}

/// Read an image as 3-channel BGR.
pub fn read_color(path: &Path) -> Result<Mat> {
    read_with(path, imgcodecs::IMREAD_COLOR)
}

/// Read an image keeping its channel layout.
pub fn read_unchanged(path: &Path) -> Result<Mat> {
    read_with(path, imgcodecs::IMREAD_UNCHANGED)
}

fn read_with(path: &Path, flags: i32) -> Result<Mat> {
    let image = imgcodecs::imread(path_str(path)?, flags)?;
    if image.empty() {
        return Err(ExtractorError::UnreadableImage(path.to_path_buf()));
    }
    debug!(
        "read {} ({}x{}, {} channels)",
        path.display(),
        image.cols(),
        image.rows(),
        image.channels()
    );
    Ok(image)
}

pub fn write_image(path: &Path, image: &Mat) -> Result<()> {
    if !imgcodecs::imwrite(path_str(path)?, image, &Vector::default())? {
        return Err(ExtractorError::WriteFailed(PathBuf::from(path)));
    }
    Ok(())
}

/// Convert a 1, 3 or 4 channel Mat into an egui texture source.
pub fn to_color_image(image: &Mat) -> Result<ColorImage> {
    let code = match image.channels() {
        1 => COLOR_GRAY2RGBA,
        4 => COLOR_BGRA2RGBA,
        _ => COLOR_BGR2RGBA,
    };
    let mut rgba = Mat::default();
    imgproc::cvt_color_def(image, &mut rgba, code)?;
    if !rgba.is_continuous() {
        rgba = rgba.try_clone()?;
    }
    Ok(ColorImage::from_rgba_unmultiplied(
        [rgba.cols() as usize, rgba.rows() as usize],
        rgba.data_bytes()?,
    ))
}

/// Rotate counter-clockwise by `degrees` about the centre, growing the
/// canvas so no corner of the source is cut off. Uncovered pixels are black.
pub fn rotate_image(image: &Mat, degrees: f64) -> Result<Mat> {
    let normalized = degrees.rem_euclid(360.0);
    if normalized == 0.0 {
        return Ok(image.try_clone()?);
    }

    let (w, h) = (image.cols() as f64, image.rows() as f64);
    // pixel centres run 0..=w-1, so the middle of the image is (w-1)/2
    let center = Point2f::new(((w - 1.0) / 2.0) as f32, ((h - 1.0) / 2.0) as f32);
    let mut m = imgproc::get_rotation_matrix_2d(center, normalized, 1.0)?;

    let cos = m.at_2d::<f64>(0, 0)?.abs();
    let sin = m.at_2d::<f64>(0, 1)?.abs();
    let new_w = (h * sin + w * cos).round();
    let new_h = (h * cos + w * sin).round();
    *m.at_2d_mut::<f64>(0, 2)? += (new_w - 1.0) / 2.0 - (w - 1.0) / 2.0;
    *m.at_2d_mut::<f64>(1, 2)? += (new_h - 1.0) / 2.0 - (h - 1.0) / 2.0;

    let mut rotated = Mat::default();
    imgproc::warp_affine(
        image,
        &mut rotated,
        &m,
        Size::new(new_w as i32, new_h as i32),
        imgproc::INTER_LINEAR,
        core::BORDER_CONSTANT,
        Scalar::all(0.0),
    )?;
    Ok(rotated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::prelude::*;
    use opencv::core::CV_8UC3;

    fn blank(rows: i32, cols: i32) -> Mat {
        Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(255.0)).unwrap()
    }

    #[test]
    fn rotate_by_zero_keeps_size() {
        let rotated = rotate_image(&blank(40, 100), 0.0).unwrap();
        assert_eq!((rotated.cols(), rotated.rows()), (100, 40));
    }

    const RED: core::Vec3b = core::VecN([0, 0, 255]);
    const BLUE: core::Vec3b = core::VecN([255, 0, 0]);

    /// 40x100 white image with a red first column and a blue last column.
    fn edged() -> Mat {
        let mut image = blank(40, 100);
        for y in 0..40 {
            *image.at_2d_mut::<core::Vec3b>(y, 0).unwrap() = RED;
            *image.at_2d_mut::<core::Vec3b>(y, 99).unwrap() = BLUE;
        }
        image
    }

    fn row(image: &Mat, y: i32) -> Vec<core::Vec3b> {
        (0..image.cols())
            .map(|x| *image.at_2d::<core::Vec3b>(y, x).unwrap())
            .collect()
    }

    #[test]
    fn rotate_by_quarter_turn_swaps_dimensions() {
        let rotated = rotate_image(&blank(40, 100), 90.0).unwrap();
        assert_eq!((rotated.cols(), rotated.rows()), (40, 100));
        let rotated = rotate_image(&blank(40, 100), -90.0).unwrap();
        assert_eq!((rotated.cols(), rotated.rows()), (40, 100));
    }

    #[test]
    fn counter_clockwise_quarter_turn_loses_no_pixels() {
        let rotated = rotate_image(&edged(), 90.0).unwrap();
        // last source column becomes the top row, first column the bottom row
        assert!(row(&rotated, 0).iter().all(|&px| px == BLUE));
        assert!(row(&rotated, 99).iter().all(|&px| px == RED));
        // the rightmost column is source row 39, white between the edges
        for y in 1..99 {
            assert_eq!(*rotated.at_2d::<core::Vec3b>(y, 39).unwrap(), core::Vec3b::all(255));
        }
    }

    #[test]
    fn clockwise_quarter_turn_loses_no_pixels() {
        let rotated = rotate_image(&edged(), -90.0).unwrap();
        assert!(row(&rotated, 0).iter().all(|&px| px == RED));
        assert!(row(&rotated, 99).iter().all(|&px| px == BLUE));
        for y in 1..99 {
            assert_eq!(*rotated.at_2d::<core::Vec3b>(y, 39).unwrap(), core::Vec3b::all(255));
            assert_eq!(*rotated.at_2d::<core::Vec3b>(y, 0).unwrap(), core::Vec3b::all(255));
        }
    }

    #[test]
    fn rotate_by_diagonal_grows_canvas() {
        let rotated = rotate_image(&blank(100, 100), 45.0).unwrap();
        assert_eq!(rotated.cols(), 141);
        assert_eq!(rotated.rows(), 141);
        // corners of the grown canvas are not covered by the source
        assert_eq!(*rotated.at_2d::<core::Vec3b>(0, 0).unwrap(), core::Vec3b::all(0));
    }

    #[test]
    fn color_image_matches_mat_size() {
        let color = to_color_image(&blank(12, 34)).unwrap();
        assert_eq!(color.size, [34, 12]);
        assert_eq!(color.pixels[0], egui::Color32::WHITE);
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = read_color(Path::new("/nonexistent/nothing.png")).unwrap_err();
        assert!(matches!(err, ExtractorError::UnreadableImage(_)));
    }
}
