use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Media engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Extraction and output settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Language picked first when a single track is requested (ISO)
    #[serde(default = "default_preferred_language")]
    pub preferred_language: String,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Output subtitle format
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    // @format: SubRip
    #[default]
    Srt,
    // @format: Advanced SubStation Alpha
    Ass,
    // @format: WebVTT
    WebVtt,
}

impl SubtitleFormat {
    // @returns: ffmpeg subtitle encoder name
    pub fn codec(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Ass => "ass",
            Self::WebVtt => "webvtt",
        }
    }

    // @returns: File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Ass => "ass",
            Self::WebVtt => "vtt",
        }
    }
}

impl std::fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.codec())
    }
}

impl std::str::FromStr for SubtitleFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "srt" | "subrip" => Ok(Self::Srt),
            "ass" | "ssa" => Ok(Self::Ass),
            "webvtt" | "vtt" => Ok(Self::WebVtt),
            _ => Err(anyhow!("Invalid subtitle format: {}", s)),
        }
    }
}

/// Media engine configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    // @field: ffmpeg binary name or path
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    // @field: Seconds allowed for engine initialization
    #[serde(default = "default_load_timeout_secs")]
    pub load_timeout_secs: u64,

    // @field: Seconds allowed for each engine invocation
    #[serde(default = "default_exec_timeout_secs")]
    pub exec_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            load_timeout_secs: default_load_timeout_secs(),
            exec_timeout_secs: default_exec_timeout_secs(),
        }
    }
}

/// Extraction configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExtractionConfig {
    /// Text format every track is converted to
    #[serde(default)]
    pub output_format: SubtitleFormat,

    /// Prefix of synthesized filenames: `<prefix>_<index>_<language>.<ext>`
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,

    /// Largest source accepted, in megabytes
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    /// Extensions treated as video files when scanning a folder
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            output_format: SubtitleFormat::default(),
            filename_prefix: default_filename_prefix(),
            max_file_size_mb: default_max_file_size_mb(),
            video_extensions: default_video_extensions(),
        }
    }
}

impl ExtractionConfig {
    /// Maximum source size in bytes
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: Matching `log` crate filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_load_timeout_secs() -> u64 {
    30
}

fn default_exec_timeout_secs() -> u64 {
    300 // whole-file demux of a large MKV
}

fn default_filename_prefix() -> String {
    "subtitle".to_string()
}

fn default_max_file_size_mb() -> u64 {
    500
}

fn default_video_extensions() -> Vec<String> {
    ["mkv", "mp4", "m4v", "mov", "webm", "avi", "ts", "m2ts"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_preferred_language() -> String {
    "pt".to_string()
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::get_language_name(&self.preferred_language)
            .context("Invalid preferred language")?;

        if self.engine.ffmpeg_path.trim().is_empty() {
            return Err(anyhow!("Engine ffmpeg_path must not be empty"));
        }

        if self.engine.load_timeout_secs == 0 || self.engine.exec_timeout_secs == 0 {
            return Err(anyhow!("Engine timeouts must be greater than zero"));
        }

        let prefix = &self.extraction.filename_prefix;
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            return Err(anyhow!("Invalid filename prefix: {:?}", prefix));
        }

        if self.extraction.max_file_size_mb == 0 {
            return Err(anyhow!("max_file_size_mb must be greater than zero"));
        }

        if self.extraction.video_extensions.is_empty() {
            return Err(anyhow!("At least one video extension is required"));
        }

        Ok(())
    }

    /// Read a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {:?}", path))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Read a configuration file, writing the defaults there first if it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        log::warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;

        std::fs::write(path.as_ref(), config_json)
            .with_context(|| format!("Failed to write config to file: {:?}", path.as_ref()))
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            engine: EngineConfig::default(),
            extraction: ExtractionConfig::default(),
            preferred_language: default_preferred_language(),
            log_level: LogLevel::default(),
        }
    }
}
