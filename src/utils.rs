//! # Utility Functions Module
//!
//! Small helpers shared by the CLI and the reporting code.

use std::path::{Path, PathBuf};

/// Formats a byte count in a human-readable form (B, KB, MB, GB, TB).
///
/// # Example
/// ```rust
/// use smart_image_compressor::utils::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(51_200), "50.00 KB");
/// ```
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Percentage saved going from `original_size` to `new_size`; negative when the output grew.
pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
    if original_size == 0 {
        0.0
    } else {
        ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
    }
}

/// `photo.png` + `webp` → `photo_compressed.webp`, next to the input.
pub fn default_output_path(input: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("{}_compressed.{}", stem, extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/tmp/shots/photo.png"), "webp"),
            PathBuf::from("/tmp/shots/photo_compressed.webp")
        );
        assert_eq!(
            default_output_path(Path::new("banner.final.jpg"), "jpg"),
            PathBuf::from("banner.final_compressed.jpg")
        );
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(200 * 1024), "200.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024 / 2), "1.50 MB");
    }

    #[test]
    fn test_calculate_reduction() {
        assert_eq!(calculate_reduction(0, 10), 0.0);
        assert_eq!(calculate_reduction(1000, 250), 75.0);
        assert_eq!(calculate_reduction(100, 150), -50.0);
    }
}
