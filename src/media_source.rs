use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

// @module: User-supplied media file handed to the extraction pipeline

/// An in-memory video file: name, byte size and content accessor.
///
/// Cloning is cheap; the bytes are shared.
#[derive(Debug, Clone)]
pub struct MediaSource {
    name: String,
    data: Arc<[u8]>,
}

impl MediaSource {
    /// Wrap bytes that are already in memory
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Read a file from the host filesystem
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read media file: {:?}", path))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "input.mkv".to_string());

        Ok(Self::from_bytes(name, data))
    }

    /// Original file name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Raw content
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Lower-cased extension of the file name, defaulting to `mkv`
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "mkv".to_string())
    }
}
