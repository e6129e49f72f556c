use std::path::PathBuf;

use log::debug;

use crate::error::{ExtractorError, Result};
use crate::warp::WarpParams;

/// High-res buffer the selected quad is warped into before thresholding.
pub const WARP_HI_W: i32 = 500;
pub const WARP_HI_H: i32 = 100;

/// Final strip size, one cell per character.
pub const FINAL_W: i32 = 140;
pub const FINAL_H: i32 = 28;
pub const SEGMENT_SIZE: i32 = 28;
pub const NUM_SEGMENTS: usize = 5;

/// Screen pixels.
pub const HANDLE_RADIUS: f32 = 7.0;
pub const ZOOM_STEP: f32 = 1.15;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp"];

const INPUT_DIR: &str = "DIGIT_EXTRACTOR_INPUT_DIR";
const OUTPUT_DIR: &str = "DIGIT_EXTRACTOR_OUTPUT_DIR";
const BLOCK_SIZE: &str = "DIGIT_EXTRACTOR_BLOCK_SIZE";
const THRESHOLD_C: &str = "DIGIT_EXTRACTOR_THRESHOLD_C";
const MEDIAN_KSIZE: &str = "DIGIT_EXTRACTOR_MEDIAN_KSIZE";

/// Runtime settings, read from the environment after `.env` is loaded.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub warp: WarpParams,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };

        let mut warp = WarpParams::default();
        if let Some(raw) = lookup(BLOCK_SIZE) {
            warp.block_size = parse_odd_aperture(BLOCK_SIZE, &raw)?;
        }
        if let Some(raw) = lookup(THRESHOLD_C) {
            warp.threshold_c = raw.trim().parse().map_err(|e| ExtractorError::Config {
                key: THRESHOLD_C,
                value: raw.clone(),
                reason: format!("{e}"),
            })?;
        }
        if let Some(raw) = lookup(MEDIAN_KSIZE) {
            warp.median_ksize = parse_odd_aperture(MEDIAN_KSIZE, &raw)?;
        }

        let config = Self {
            input_dir: path(INPUT_DIR),
            output_dir: path(OUTPUT_DIR),
            warp,
        };
        debug!("loaded config: {:?}", config);
        Ok(config)
    }
}

fn parse_odd_aperture(key: &'static str, raw: &str) -> Result<i32> {
    let invalid = |reason: String| ExtractorError::Config {
        key,
        value: raw.to_string(),
        reason,
    };
    let value: i32 = raw.trim().parse().map_err(|e| invalid(format!("{e}")))?;
    if value < 3 || value % 2 == 0 {
        return Err(invalid("must be an odd number >= 3".into()));
    }
    Ok(value)
}
