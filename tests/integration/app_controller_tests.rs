/*!
 * Integration tests for the application controller
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;

use scriptum::app_config::Config;
use scriptum::app_controller::{Controller, FolderSummary};
use scriptum::engine::mock::MockEngine;
use scriptum::errors::ExtractionError;
use scriptum::progress::CancellationToken;
use crate::common;

fn controller_for(engine: MockEngine) -> (Arc<MockEngine>, Controller) {
    controller_with_config(engine, Config::default())
}

fn controller_with_config(engine: MockEngine, config: Config) -> (Arc<MockEngine>, Controller) {
    common::init_test_logger();
    let engine = Arc::new(engine);
    let controller = Controller::with_loader(config, common::mock_loader(Arc::clone(&engine)))
        .with_progress_bar(false);
    (engine, controller)
}

#[tokio::test]
async fn test_extract_file_withThreeTracks_shouldWriteEverySubtitle() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "movie.mkv", b"fake matroska")?;
    let output_dir = temp_dir.path().join("subs");
    let (_, controller) = controller_for(common::three_track_engine());

    let extraction = controller.extract_file(&input, &output_dir, None, false).await?;

    let names: Vec<&str> = extraction.written.iter().map(|w| w.filename.as_str()).collect();
    // Every track is converted to the configured format, whatever its codec
    assert_eq!(names, vec!["subtitle_0_eng.srt", "subtitle_1_pt-BR.srt", "subtitle_2_spa.srt"]);
    let written = fs::read_to_string(output_dir.join("subtitle_0_eng.srt"))?;
    assert!(written.contains("Hello again"));

    let english = &extraction.written[0];
    assert_eq!(english.summary.cue_count, 2);
    assert!(english.display.is_sdh);

    let brazilian = &extraction.written[1];
    assert_eq!(brazilian.display.variant, Some("Brazil"));
    assert!(extraction.written[2].display.is_forced);
    assert!(extraction.skipped.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_extract_file_withExistingOutput_shouldSkipUnlessForced() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "movie.mkv", b"fake matroska")?;
    let existing = common::create_test_file(temp_dir.path(), "subtitle_0_eng.srt", b"old")?;
    let (_, controller) = controller_for(common::three_track_engine());

    let first = controller.extract_file(&input, temp_dir.path(), None, false).await?;
    assert_eq!(first.skipped, vec![existing.clone()]);
    assert_eq!(first.written.len(), 2);
    assert_eq!(fs::read_to_string(&existing)?, "old");

    let forced = controller.extract_file(&input, temp_dir.path(), None, true).await?;
    assert!(forced.skipped.is_empty());
    assert_eq!(forced.written.len(), 3);
    assert!(fs::read_to_string(&existing)?.contains("Hello"));
    Ok(())
}

#[tokio::test]
async fn test_extract_file_withLanguage_shouldWriteOnlySelectedTrack() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "movie.mkv", b"fake matroska")?;
    let (_, controller) = controller_for(common::three_track_engine());

    let extraction = controller.extract_file(&input, temp_dir.path(), Some("es"), false).await?;

    assert_eq!(extraction.written.len(), 1);
    assert_eq!(extraction.written[0].filename, "subtitle_2_spa.srt");
    assert_eq!(extraction.report.tracks.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_extract_file_withNoSubtitles_shouldReturnTypedError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "movie.mkv", b"fake matroska")?;
    let (_, controller) = controller_for(
        MockEngine::new().with_probe_log(common::probe_log_without_subtitles()),
    );

    let error = controller
        .extract_file(&input, temp_dir.path(), None, false)
        .await
        .unwrap_err();

    let extraction_error = error.downcast_ref::<ExtractionError>().unwrap();
    assert!(extraction_error.is_no_subtitles());
    Ok(())
}

#[tokio::test]
async fn test_probe_file_withDefaultConfig_shouldPickPreferredLanguage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "movie.mkv", b"fake matroska")?;
    let (engine, controller) = controller_for(common::three_track_engine());

    let probe = controller.probe_file(&input).await?;

    assert_eq!(probe.source_name, "movie.mkv");
    assert_eq!(probe.size, 13);
    assert_eq!(probe.streams.len(), 3);
    assert_eq!(probe.streams[1].descriptor.stream_index, 5);
    assert!(probe.streams.iter().all(|s| s.text_based));
    // Default preferred language is Portuguese
    assert_eq!(probe.preferred_index, Some(1));
    assert!(engine.files().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_load_source_withWrongExtension_shouldReject() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "notes.txt", b"text")?;
    let (engine, controller) = controller_for(common::three_track_engine());

    assert!(controller.probe_file(&input).await.is_err());
    assert_eq!(engine.load_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_load_source_withOversizeFile_shouldReject() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "big.mkv", &vec![0u8; 1024 * 1024 + 1])?;
    let mut config = Config::default();
    config.extraction.max_file_size_mb = 1;
    let (_, controller) = controller_with_config(common::three_track_engine(), config);

    let error = controller.load_source(&input).await.unwrap_err();
    assert!(error.to_string().contains("too large"));
    Ok(())
}

#[tokio::test]
async fn test_load_source_withMissingFile_shouldReject() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let (_, controller) = controller_for(common::three_track_engine());

    assert!(controller.load_source(&temp_dir.path().join("missing.mkv")).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_run_folder_withVideos_shouldWriteNextToEachVideo() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(root, "a.mkv", b"fake")?;
    common::create_test_file(root, "season1/b.mp4", b"fake")?;
    common::create_test_file(root, "readme.txt", b"not a video")?;
    let (_, controller) = controller_for(common::three_track_engine());

    let summary = controller.run_folder(root, None, false).await?;

    assert_eq!(
        summary,
        FolderSummary {
            processed: 2,
            without_subtitles: 0,
            failed: 0,
            files_written: 6,
        }
    );
    assert!(root.join("subtitle_0_eng.srt").exists());
    assert!(root.join("season1/subtitle_2_spa.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_folder_withoutSubtitles_shouldCountSeparatelyFromFailures() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "a.mkv", b"fake")?;
    common::create_test_file(temp_dir.path(), "b.mkv", b"fake")?;
    let (_, controller) = controller_for(
        MockEngine::new().with_probe_log(common::probe_log_without_subtitles()),
    );

    let summary = controller.run_folder(temp_dir.path(), None, false).await?;

    assert_eq!(summary.without_subtitles, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.processed, 0);
    Ok(())
}

#[tokio::test]
async fn test_run_folder_withCorruptVideos_shouldCountFailures() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "a.mkv", b"garbage")?;
    let (_, controller) = controller_for(
        MockEngine::new().with_probe_log(common::probe_log_corrupt_input()),
    );

    let summary = controller.run_folder(temp_dir.path(), None, false).await?;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.without_subtitles, 0);
    Ok(())
}

#[tokio::test]
async fn test_run_folder_withCancelledToken_shouldStop() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "a.mkv", b"fake")?;
    let token = CancellationToken::new();
    token.cancel();
    let (engine, controller) = controller_for(common::three_track_engine());
    let controller = controller.with_cancellation(token);

    let error = controller.run_folder(temp_dir.path(), None, false).await.unwrap_err();

    assert!(matches!(
        error.downcast_ref::<ExtractionError>(),
        Some(ExtractionError::Cancelled)
    ));
    assert!(engine.history().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_run_folder_withEmptyDirectory_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let (_, controller) = controller_for(common::three_track_engine());

    assert!(controller.run_folder(temp_dir.path(), None, false).await.is_err());
    Ok(())
}
