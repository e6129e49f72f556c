use std::fs;
use std::path::Path;

use log::{info, warn};
use opencv::core::{self, Mat};

use crate::browser::is_image_file;
use crate::error::Result;
use crate::utils::{read_unchanged, write_image};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvertReport {
    pub folders: usize,
    pub written: usize,
    pub skipped: usize,
}

fn is_digit_folder(name: &str) -> bool {
    name.len() == 1 && name.as_bytes()[0].is_ascii_digit()
}

pub fn invert_image(image: &Mat) -> Result<Mat> {
    let mut inverted = Mat::default();
    core::bitwise_not(image, &mut inverted, &core::no_array())?;
    Ok(inverted)
}

/// Mirror `input/<digit>/*` into `output/<digit>/*` with every image inverted.
pub fn invert_dataset(input: &Path, output: &Path) -> Result<InvertReport> {
    let mut report = InvertReport::default();

    let mut folders: Vec<_> = fs::read_dir(input)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect();
    folders.sort();

    for folder in folders {
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !folder.is_dir() || !is_digit_folder(&name) {
            warn!("skipping {}: not a single-digit folder", folder.display());
            continue;
        }

        let target = output.join(&name);
        fs::create_dir_all(&target)?;
        report.folders += 1;

        let mut files: Vec<_> = fs::read_dir(&folder)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        for file in files {
            if !is_image_file(&file) {
                warn!("skipping {}: not an image", file.display());
                report.skipped += 1;
                continue;
            }
            let inverted = match read_unchanged(&file).and_then(|image| invert_image(&image)) {
                Ok(inverted) => inverted,
                Err(e) => {
                    warn!("skipping {}: {}", file.display(), e);
                    report.skipped += 1;
                    continue;
                }
            };
            if let Some(file_name) = file.file_name() {
                write_image(&target.join(file_name), &inverted)?;
                report.written += 1;
            }
        }
    }

    info!(
        "inverted {} images across {} folders ({} skipped) into {}",
        report.written,
        report.folders,
        report.skipped,
        output.display()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_folder_names() {
        assert!(is_digit_folder("0"));
        assert!(is_digit_folder("9"));
        assert!(!is_digit_folder("10"));
        assert!(!is_digit_folder("a"));
        assert!(!is_digit_folder(""));
        assert!(!is_digit_folder("٣"));
    }
}
