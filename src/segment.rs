use opencv::{
    core::{Mat, Rect},
    prelude::*,
};

use crate::error::{ExtractorError, Result};

/// Slice a strip into `count` equal-width cells, left to right.
pub fn segment_strip(strip: &Mat, count: usize) -> Result<Vec<Mat>> {
    let width = strip.cols();
    if count == 0 || width % count as i32 != 0 {
        return Err(ExtractorError::SegmentCount { width, count });
    }
    let cell_w = width / count as i32;
    (0..count as i32)
        .map(|i| {
            let cell = strip.roi(Rect::new(i * cell_w, 0, cell_w, strip.rows()))?;
            Ok(cell.clone_pointee())
        })
        .collect()
}
