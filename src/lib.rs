/*!
 * # Scriptum - subtitle extraction for MKV and other containers
 *
 * A Rust library that lists the subtitle streams of a video file, extracts
 * each of them to a text subtitle format and describes their language for
 * display.
 *
 * ## Features
 *
 * - Lazily loaded, shared media engine (native ffmpeg or an in-memory mock)
 * - Subtitle stream discovery from the engine's diagnostic output
 * - Per-track extraction to SRT, ASS or WebVTT with partial-failure reporting
 * - Cooperative cancellation and non-decreasing progress reporting
 * - Language/badge classification with regional variants and
 *   SDH / Forced / CC flags
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `engine`: media engine trait, loader, log observers and backends:
 *   - `engine::ffmpeg`: native ffmpeg process
 *   - `engine::mock`: scriptable in-memory engine
 * - `discovery`: subtitle stream discovery from engine log lines
 * - `extraction`: the extraction pipeline and its report
 * - `subtitle_languages`: display name, flag and badge classification
 * - `subtitle_summary`: cue counts of extracted payloads
 * - `app_config`: Configuration management
 * - `app_controller`: Main application controller
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `media_source`: In-memory video files
 * - `progress`: Progress milestones and cancellation
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod discovery;
pub mod engine;
pub mod errors;
pub mod extraction;
pub mod file_utils;
pub mod language_utils;
pub mod media_source;
pub mod progress;
pub mod subtitle_languages;
pub mod subtitle_summary;

// Re-export main types for easier usage
pub use app_config::{Config, SubtitleFormat};
pub use discovery::{SubtitleStreamDescriptor, discover_streams, parse_stream_log};
pub use engine::{EngineHandle, EngineLoader, MediaEngine};
pub use errors::{AppError, EngineError, ErrorKind, ExtractionError};
pub use extraction::{ExtractedSubtitleTrack, ExtractionReport, SubtitleExtractor};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use media_source::MediaSource;
pub use progress::CancellationToken;
pub use subtitle_languages::{SubtitleLanguageInfo, classify, classify_stream};
