use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::AppError;

// @module: File and directory utilities

// @const: Extensions of text subtitle files this tool writes
const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass", "ssa", "vtt"];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @generates: Filename of an extracted track
    // @params: prefix, dense index, language tag, extension
    pub fn subtitle_filename(prefix: &str, index: usize, language: &str, extension: &str) -> String {
        // Region tags keep their hyphen; anything path-like is flattened
        let language: String = language
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let language = if language.is_empty() { "unknown".to_string() } else { language };

        format!("{}_{}_{}.{}", prefix, index, language, extension)
    }

    /// Lower-cased extension without the dot, empty when there is none
    pub fn get_file_extension(filename: &str) -> String {
        Path::new(filename)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    /// Reject files whose extension is not in `allowed`
    pub fn validate_file_extension(filename: &str, allowed: &[String]) -> Result<(), AppError> {
        let ext = Self::get_file_extension(filename);
        if allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)) {
            Ok(())
        } else {
            Err(AppError::File(format!(
                "Unsupported file type '{}' for {} (expected one of: {})",
                ext,
                filename,
                allowed.join(", ")
            )))
        }
    }

    /// Reject files larger than `max_bytes`
    pub fn validate_file_size(size: u64, max_bytes: u64) -> Result<(), AppError> {
        if size <= max_bytes {
            Ok(())
        } else {
            Err(AppError::File(format!(
                "File is too large: {} (limit {})",
                Self::format_file_size(size),
                Self::format_file_size(max_bytes)
            )))
        }
    }

    /// Human readable size: `512 B`, `1.5 KB`, `700.0 MB`, `1.25 GB`
    pub fn format_file_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        match bytes {
            b if b < KB => format!("{} B", b),
            b if b < MB => format!("{:.1} KB", b as f64 / KB as f64),
            b if b < GB => format!("{:.1} MB", b as f64 / MB as f64),
            b => format!("{:.2} GB", b as f64 / GB as f64),
        }
    }

    /// Find video files under `dir`, recursively, sorted by path
    pub fn find_video_files<P: AsRef<Path>>(dir: P, extensions: &[String]) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() && Self::detect_file_type(path, extensions) == FileType::Video {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Classify a path by its extension
    pub fn detect_file_type<P: AsRef<Path>>(path: P, video_extensions: &[String]) -> FileType {
        let ext = path
            .as_ref()
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if ext.is_empty() {
            FileType::Unknown
        } else if SUBTITLE_EXTENSIONS.contains(&ext.as_str()) {
            FileType::Subtitle
        } else if video_extensions.iter().any(|v| v.eq_ignore_ascii_case(&ext)) {
            FileType::Video
        } else {
            FileType::Unknown
        }
    }
}

/// Enum representing different file types
#[derive(Debug, PartialEq, Eq)]
pub enum FileType {
    /// Text subtitle file
    Subtitle,
    /// Video container
    Video,
    /// Unknown file type
    Unknown,
}
