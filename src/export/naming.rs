//! Collision-safe filenames for extracted attachments.
//!
//! A derived name is `{stem}_{timestamp}.{ext}`, e.g.
//! `invoice_2024-01-15_10-30-00.pdf`. Timestamps have second resolution, so
//! two files with the same stem extracted within the same second map to
//! the same name. [`CollisionPolicy`] decides what happens then.

use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Timestamp inserted between stem and extension.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Longest sanitized source filename kept before the timestamp is added.
const MAX_NAME_LEN: usize = 150;

/// What to do when the derived path already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Write over the existing file without checking.
    #[default]
    Overwrite,
    /// Append `_1`, `_2`, … to the stem until the name is free.
    Suffix,
}

/// Source of extraction timestamps.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time, truncated to whole seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        let now = Local::now().naive_local();
        now.with_nanosecond(0).unwrap_or(now)
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Lower-case an extension and strip any leading dots: `".PDF"` → `"pdf"`.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Case-insensitive suffix match of `filename` against `.{ext}`.
pub fn matches_extension(filename: &str, ext: &str) -> bool {
    let ext = normalize_extension(ext);
    if ext.is_empty() {
        return false;
    }
    filename
        .trim()
        .to_lowercase()
        .ends_with(&format!(".{ext}"))
}

/// Sanitize a string for use in filenames.
///
/// Replaces invalid characters with `_` and truncates to `max_len`.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized
    }
}

/// Split into stem and extension at the last dot.
///
/// A leading dot does not start an extension (`.hidden` has none).
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext),
        _ => (name, ""),
    }
}

/// Format `at`, falling back to [`DEFAULT_TIMESTAMP_FORMAT`] if `format` is invalid.
pub fn format_timestamp(at: NaiveDateTime, format: &str) -> String {
    let valid = !StrftimeItems::new(format).any(|item| matches!(item, Item::Error));
    let format = if valid {
        format
    } else {
        tracing::warn!(format, "Invalid timestamp format, using default");
        DEFAULT_TIMESTAMP_FORMAT
    };
    sanitize_filename_part(&at.format(format).to_string(), 64)
}

/// Derive the on-disk name for an attachment called `original`.
///
/// Only the stem is truncated, so a long name keeps its extension.
pub fn derive_filename(original: &str, at: NaiveDateTime, timestamp_format: &str) -> String {
    let (stem, ext) = split_name(original.trim());
    let stem = sanitize_filename_part(stem, MAX_NAME_LEN);
    let ext = if ext.is_empty() {
        String::new()
    } else {
        sanitize_filename_part(ext, MAX_NAME_LEN)
    };
    let stamp = format_timestamp(at, timestamp_format);
    if ext.is_empty() {
        format!("{stem}_{stamp}")
    } else {
        format!("{stem}_{stamp}.{ext}")
    }
}

/// Resolve the final path for a derived name under `policy`.
pub fn resolve_path(dir: &Path, filename: &str, policy: CollisionPolicy) -> PathBuf {
    let path = dir.join(filename);
    match policy {
        CollisionPolicy::Overwrite => path,
        CollisionPolicy::Suffix => unique_path(&path),
    }
}

/// If `path` already exists, append a counter to make it unique.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    for i in 1..1000 {
        let candidate = if ext.is_empty() {
            parent.join(format!("{stem}_{i}"))
        } else {
            parent.join(format!("{stem}_{i}.{ext}"))
        };
        if !candidate.exists() {
            return candidate;
        }
    }

    // Every counter taken
    if ext.is_empty() {
        parent.join(format!("{stem}_dup"))
    } else {
        parent.join(format!("{stem}_dup.{ext}"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_derive_filename() {
        assert_eq!(
            derive_filename("invoice.pdf", at(10, 30, 0), DEFAULT_TIMESTAMP_FORMAT),
            "invoice_2024-01-15_10-30-00.pdf"
        );
        assert_eq!(
            derive_filename("Report.PDF", at(9, 5, 7), DEFAULT_TIMESTAMP_FORMAT),
            "Report_2024-01-15_09-05-07.PDF"
        );
        assert_eq!(
            derive_filename("archive.tar.pdf", at(0, 0, 0), DEFAULT_TIMESTAMP_FORMAT),
            "archive.tar_2024-01-15_00-00-00.pdf"
        );
        assert_eq!(
            derive_filename("README", at(0, 0, 0), DEFAULT_TIMESTAMP_FORMAT),
            "README_2024-01-15_00-00-00"
        );
    }

    #[test]
    fn test_derive_filename_strips_path_components() {
        let name = derive_filename("../../etc/q1 report.pdf", at(1, 2, 3), DEFAULT_TIMESTAMP_FORMAT);
        assert!(!name.contains('/'));
        assert!(name.ends_with("q1_report_2024-01-15_01-02-03.pdf"));
    }

    #[test]
    fn test_long_name_keeps_extension() {
        let original = format!("{}.pdf", "x".repeat(160));
        let name = derive_filename(&original, at(10, 30, 0), DEFAULT_TIMESTAMP_FORMAT);
        assert!(name.ends_with("_2024-01-15_10-30-00.pdf"));
        assert!(matches_extension(&name, "pdf"));
        let (stem, _) = name.split_once('_').unwrap();
        assert_eq!(stem.len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_derive_filename_without_extension() {
        assert_eq!(
            derive_filename("notes.", at(0, 0, 0), DEFAULT_TIMESTAMP_FORMAT),
            "notes_2024-01-15_00-00-00"
        );
        assert_eq!(
            derive_filename(".pdf", at(0, 0, 0), DEFAULT_TIMESTAMP_FORMAT),
            ".pdf_2024-01-15_00-00-00"
        );
    }

    #[test]
    fn test_unique_path_exhausted_without_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("README_2024-01-15_00-00-00");
        std::fs::write(&base, b"x").unwrap();
        for i in 1..1000 {
            std::fs::write(tmp.path().join(format!("README_2024-01-15_00-00-00_{i}")), b"x")
                .unwrap();
        }

        let path = unique_path(&base);
        assert_eq!(path, tmp.path().join("README_2024-01-15_00-00-00_dup"));
    }

    #[test]
    fn test_invalid_format_falls_back() {
        assert_eq!(format_timestamp(at(1, 2, 3), "%Q"), "2024-01-15_01-02-03");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename_part("hello world", 20), "hello_world");
        assert_eq!(sanitize_filename_part("a/b\\c:d*e", 20), "a_b_c_d_e");
        assert_eq!(sanitize_filename_part("", 20), "unknown");
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("a.pdf"), ("a", "pdf"));
        assert_eq!(split_name(".pdf"), (".pdf", ""));
        assert_eq!(split_name("noext"), ("noext", ""));
    }

    #[test]
    fn test_matches_extension() {
        assert!(matches_extension("Report.PDF", "pdf"));
        assert!(matches_extension("report.pdf", ".PDF"));
        assert!(!matches_extension("report.pdf.exe", "pdf"));
        assert!(!matches_extension("pdf", "pdf"));
        assert!(!matches_extension("report.pdf", ""));
    }

    #[test]
    fn test_resolve_path_suffix() {
        let tmp = tempfile::tempdir().unwrap();
        let name = "a_2024-01-15_00-00-00.pdf";
        let first = resolve_path(tmp.path(), name, CollisionPolicy::Suffix);
        assert_eq!(first, tmp.path().join(name));
        std::fs::write(&first, b"x").unwrap();

        let second = resolve_path(tmp.path(), name, CollisionPolicy::Suffix);
        assert_eq!(second, tmp.path().join("a_2024-01-15_00-00-00_1.pdf"));

        let overwrite = resolve_path(tmp.path(), name, CollisionPolicy::Overwrite);
        assert_eq!(overwrite, first);
    }
}
