/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use std::str::FromStr;
use scriptum::app_config::{Config, LogLevel, SubtitleFormat};
use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.engine.ffmpeg_path, "ffmpeg");
    assert_eq!(config.extraction.output_format, SubtitleFormat::Srt);
    assert_eq!(config.extraction.filename_prefix, "subtitle");
    assert_eq!(config.extraction.max_file_size_mb, 500);
    assert_eq!(config.extraction.max_file_size_bytes(), 500 * 1024 * 1024);
    assert!(config.extraction.video_extensions.contains(&"mkv".to_string()));
    assert_eq!(config.preferred_language, "pt");
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();

    config.preferred_language = "xx".to_string();
    assert!(config.validate().is_err());
    config.preferred_language = "pt-BR".to_string();
    assert!(config.validate().is_ok());

    config.extraction.filename_prefix = "../escape".to_string();
    assert!(config.validate().is_err());
    config.extraction.filename_prefix = "subtitle".to_string();

    config.engine.exec_timeout_secs = 0;
    assert!(config.validate().is_err());
    config.engine.exec_timeout_secs = 60;

    config.engine.ffmpeg_path = "  ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_json_withPartialSections_shouldFillDefaults() -> Result<()> {
    let json = r#"{
        "extraction": { "output_format": "webvtt" },
        "log_level": "debug"
    }"#;

    let config: Config = serde_json::from_str(json)?;

    assert_eq!(config.extraction.output_format, SubtitleFormat::WebVtt);
    assert_eq!(config.extraction.filename_prefix, "subtitle");
    assert_eq!(config.engine.ffmpeg_path, "ffmpeg");
    assert_eq!(config.preferred_language, "pt");
    assert_eq!(config.log_level, LogLevel::Debug);
    Ok(())
}

#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let created = Config::load_or_create(&path)?;
    assert!(path.exists());

    let reloaded = Config::from_file(&path)?;
    assert_eq!(reloaded.extraction.filename_prefix, created.extraction.filename_prefix);
    assert_eq!(reloaded.engine.exec_timeout_secs, created.engine.exec_timeout_secs);
    Ok(())
}

#[test]
fn test_from_file_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", b"{ not json")?;

    assert!(Config::from_file(&path).is_err());
    Ok(())
}

#[test]
fn test_subtitle_format_withNames_shouldMapCodecAndExtension() -> Result<()> {
    assert_eq!(SubtitleFormat::from_str("SRT")?, SubtitleFormat::Srt);
    assert_eq!(SubtitleFormat::from_str("vtt")?, SubtitleFormat::WebVtt);
    assert!(SubtitleFormat::from_str("pgs").is_err());

    assert_eq!(SubtitleFormat::WebVtt.codec(), "webvtt");
    assert_eq!(SubtitleFormat::WebVtt.extension(), "vtt");
    assert_eq!(SubtitleFormat::Ass.extension(), "ass");
    assert_eq!(SubtitleFormat::Srt.to_string(), "srt");
    Ok(())
}

#[test]
fn test_log_level_withEachVariant_shouldMapToFilter() {
    assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
    assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
}
