/*!
 * Error types for the scriptum library.
 *
 * This module contains custom error types for the media engine and the
 * subtitle extraction pipeline, using the thiserror crate for ergonomic
 * error definitions.
 */

use serde::Serialize;
use thiserror::Error;

use crate::extraction::TrackFailure;

/// Errors raised by a media engine backend
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine binary or runtime could not be found
    #[error("Media engine is not available: {0}")]
    Unavailable(String),

    /// Fetching or installing the engine runtime failed
    #[error("Media engine asset loading failed: {0}")]
    AssetLoad(String),

    /// An operation was attempted before `load` completed
    #[error("Media engine is not loaded")]
    NotLoaded,

    /// A virtual path escaped the engine workspace or was empty
    #[error("Invalid virtual path: {0}")]
    InvalidPath(String),

    /// The requested virtual file does not exist
    #[error("Virtual file not found: {0}")]
    FileNotFound(String),

    /// Error from the engine's backing storage
    #[error("Virtual filesystem error: {0}")]
    Io(#[from] std::io::Error),

    /// An invocation exceeded its time budget
    #[error("Engine invocation timed out after {0} seconds")]
    Timeout(u64),

    /// The invocation could not be started at all
    #[error("Engine invocation failed: {0}")]
    Exec(String),
}

/// Stable, machine-readable classification of an [`ExtractionError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EngineInit,
    UnreadableSource,
    NoSubtitles,
    ExtractionFailed,
    Cancelled,
    Engine,
}

impl ErrorKind {
    /// String code for logs and JSON output
    pub fn code(&self) -> &'static str {
        match self {
            Self::EngineInit => "engine_init",
            Self::UnreadableSource => "unreadable_source",
            Self::NoSubtitles => "no_subtitles",
            Self::ExtractionFailed => "extraction_failed",
            Self::Cancelled => "cancelled",
            Self::Engine => "engine",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors that terminate a subtitle extraction run
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The engine could not be initialized; the next call retries
    #[error("Media engine initialization failed: {0}")]
    EngineInit(#[source] EngineError),

    /// The engine did not recognize the source as a media file
    #[error("Source file could not be read by the media engine: {0}")]
    UnreadableSource(String),

    /// Discovery matched zero subtitle stream headers
    #[error("No subtitle streams found in {0}")]
    NoSubtitlesFound(String),

    /// Discovery found streams but none of them could be materialized
    #[error("Subtitle extraction failed: none of the {attempted} subtitle stream(s) could be extracted")]
    ExtractionFailed {
        /// Number of descriptors attempted
        attempted: usize,
        /// Why each one failed
        failures: Vec<TrackFailure>,
    },

    /// The caller aborted the run between two engine invocations
    #[error("Subtitle extraction was cancelled")]
    Cancelled,

    /// Staging or cleanup against the engine failed
    #[error("Media engine error: {0}")]
    Engine(#[from] EngineError),
}

impl ExtractionError {
    /// Structured kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EngineInit(_) => ErrorKind::EngineInit,
            Self::UnreadableSource(_) => ErrorKind::UnreadableSource,
            Self::NoSubtitlesFound(_) => ErrorKind::NoSubtitles,
            Self::ExtractionFailed { .. } => ErrorKind::ExtractionFailed,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Engine(_) => ErrorKind::Engine,
        }
    }

    /// True when the error only means "this file has nothing to offer"
    pub fn is_no_subtitles(&self) -> bool {
        matches!(self, Self::NoSubtitlesFound(_))
    }
}

/// Application-level error raised by input file checks
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),
}
