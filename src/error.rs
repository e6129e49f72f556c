use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = ExtractorError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("opencv: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot read image {}", .0.display())]
    UnreadableImage(PathBuf),

    #[error("path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error("failed to write image {}", .0.display())]
    WriteFailed(PathBuf),

    #[error("expected 4 points, got {0}")]
    PointCount(usize),

    #[error("selected points do not form a usable quadrilateral: {0}")]
    DegenerateQuad(String),

    #[error("label must be exactly {expected} characters, got {actual}")]
    LabelLength { expected: usize, actual: usize },

    #[error("label character {0:?} cannot be used as a folder name")]
    LabelCharacter(char),

    #[error("cannot split a strip of width {width} into {count} cells")]
    SegmentCount { width: i32, count: usize },

    #[error("nothing extracted yet; extract an image first")]
    NoSegments,

    #[error("no output directory selected")]
    NoOutputDir,

    #[error("invalid value {value:?} for {key}: {reason}")]
    Config {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("background job ended without a result")]
    JobAborted,
}
