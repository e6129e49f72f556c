use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use opencv::core::Mat;
use uuid::Uuid;

use crate::error::{ExtractorError, Result};
use crate::utils::write_image;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub written: Vec<PathBuf>,
    /// Distinct character folders touched, sorted.
    pub folders: Vec<char>,
}

/// Trim the label and check it names one folder per segment.
pub fn validate_label(label: &str, expected: usize) -> Result<Vec<char>> {
    let chars: Vec<char> = label.trim().chars().collect();
    if chars.len() != expected {
        return Err(ExtractorError::LabelLength {
            expected,
            actual: chars.len(),
        });
    }
    if let Some(&bad) = chars
        .iter()
        .find(|c| matches!(c, '/' | '\\' | '.') || c.is_control() || c.is_whitespace())
    {
        return Err(ExtractorError::LabelCharacter(bad));
    }
    Ok(chars)
}

/// Write segment `i` into `root/<label[i]>/segment_<id>.png`.
pub fn save_segments(root: &Path, label: &str, segments: &[Mat]) -> Result<SaveReport> {
    let chars = validate_label(label, segments.len())?;

    let mut written = Vec::with_capacity(segments.len());
    for (ch, segment) in chars.iter().zip(segments) {
        let dir = root.join(ch.to_string());
        fs::create_dir_all(&dir)?;
        let path = dir.join(segment_file_name());
        write_image(&path, segment)?;
        debug!("saved {}", path.display());
        written.push(path);
    }

    let folders: Vec<char> = chars.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    info!(
        "saved {} segments for label '{}' into {}",
        written.len(),
        label.trim(),
        root.display()
    );
    Ok(SaveReport { written, folders })
}

fn segment_file_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("segment_{}.png", &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_is_trimmed() {
        assert_eq!(validate_label("  A8B3Z ", 5).unwrap(), vec!['A', '8', 'B', '3', 'Z']);
    }

    #[test]
    fn label_length_counts_characters() {
        assert!(validate_label("ÄÖÜßé", 5).is_ok());
        assert!(matches!(
            validate_label("1234", 5),
            Err(ExtractorError::LabelLength { expected: 5, actual: 4 })
        ));
    }

    #[test]
    fn label_rejects_path_characters() {
        for label in ["12/45", "1.345", "12\\45", "12 45"] {
            assert!(
                matches!(validate_label(label, 5), Err(ExtractorError::LabelCharacter(_))),
                "{label} accepted"
            );
        }
    }

    #[test]
    fn file_names_are_short_and_unique() {
        let a = segment_file_name();
        let b = segment_file_name();
        assert_eq!(a.len(), "segment_".len() + 8 + ".png".len());
        assert_ne!(a, b);
    }
}
