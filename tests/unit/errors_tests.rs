/*!
 * Tests for error types and conversions
 */

use scriptum::errors::{AppError, EngineError, ErrorKind, ExtractionError};
use scriptum::extraction::TrackFailure;

#[test]
fn test_extractionError_kinds_shouldHaveStableCodes() {
    let cases = vec![
        (ExtractionError::EngineInit(EngineError::NotLoaded), "engine_init"),
        (ExtractionError::UnreadableSource("x.mkv".to_string()), "unreadable_source"),
        (ExtractionError::NoSubtitlesFound("x.mkv".to_string()), "no_subtitles"),
        (
            ExtractionError::ExtractionFailed { attempted: 1, failures: Vec::new() },
            "extraction_failed",
        ),
        (ExtractionError::Cancelled, "cancelled"),
        (ExtractionError::Engine(EngineError::Timeout(5)), "engine"),
    ];

    for (error, code) in cases {
        assert_eq!(error.kind().code(), code);
        assert_eq!(error.kind().to_string(), code);
    }
}

#[test]
fn test_errorKind_serialize_shouldUseSnakeCase() {
    let json = serde_json::to_string(&ErrorKind::NoSubtitles).unwrap();
    assert_eq!(json, "\"no_subtitles\"");
}

#[test]
fn test_extractionFailed_display_shouldMentionAttemptCount() {
    let error = ExtractionError::ExtractionFailed {
        attempted: 3,
        failures: vec![TrackFailure {
            index: 0,
            stream_index: 2,
            reason: "ffmpeg exited with status 1".to_string(),
        }],
    };
    assert!(error.to_string().contains("3 subtitle stream(s)"));
    assert!(!error.is_no_subtitles());
}

#[test]
fn test_noSubtitlesFound_shouldBeDistinctFromExtractionFailed() {
    let none = ExtractionError::NoSubtitlesFound("movie.mkv".to_string());
    assert!(none.is_no_subtitles());
    assert_ne!(none.kind(), ErrorKind::ExtractionFailed);
}

#[test]
fn test_engineError_fromIo_shouldWrapSource() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let engine: EngineError = io.into();
    assert!(engine.to_string().contains("denied"));

    let extraction: ExtractionError = engine.into();
    assert_eq!(extraction.kind(), ErrorKind::Engine);
}

#[test]
fn test_appError_file_shouldDisplayDetail() {
    let error = AppError::File("Unsupported file type: txt".to_string());
    assert_eq!(error.to_string(), "File error: Unsupported file type: txt");
}
