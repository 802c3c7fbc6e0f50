/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::path::Path;
use scriptum::errors::AppError;
use scriptum::file_utils::{FileManager, FileType};
use crate::common;

fn video_extensions() -> Vec<String> {
    vec!["mkv".to_string(), "mp4".to_string()]
}

#[test]
fn test_subtitle_filename_withLanguage_shouldFollowPattern() {
    assert_eq!(FileManager::subtitle_filename("subtitle", 0, "eng", "srt"), "subtitle_0_eng.srt");
    assert_eq!(FileManager::subtitle_filename("subtitle", 2, "pt-BR", "vtt"), "subtitle_2_pt-BR.vtt");
}

#[test]
fn test_subtitle_filename_withUnsafeLanguage_shouldFlatten() {
    assert_eq!(FileManager::subtitle_filename("sub", 1, "../x", "srt"), "sub_1____x.srt");
    assert_eq!(FileManager::subtitle_filename("sub", 1, "", "srt"), "sub_1_unknown.srt");
}

#[test]
fn test_format_file_size_withVariousSizes_shouldBeHumanReadable() {
    assert_eq!(FileManager::format_file_size(0), "0 B");
    assert_eq!(FileManager::format_file_size(512), "512 B");
    assert_eq!(FileManager::format_file_size(1536), "1.5 KB");
    assert_eq!(FileManager::format_file_size(700 * 1024 * 1024), "700.0 MB");
    assert_eq!(FileManager::format_file_size(1024 * 1024 * 1024 + 256 * 1024 * 1024), "1.25 GB");
}

#[test]
fn test_get_file_extension_withVariousNames_shouldReturnLowercase() {
    assert_eq!(FileManager::get_file_extension("Movie.MKV"), "mkv");
    assert_eq!(FileManager::get_file_extension("archive.tar.gz"), "gz");
    assert_eq!(FileManager::get_file_extension("noext"), "");
}

#[test]
fn test_validate_file_extension_withDisallowedType_shouldReturnFileError() {
    assert!(FileManager::validate_file_extension("movie.mkv", &video_extensions()).is_ok());
    assert!(FileManager::validate_file_extension("MOVIE.MP4", &video_extensions()).is_ok());

    let error = FileManager::validate_file_extension("notes.txt", &video_extensions()).unwrap_err();
    assert!(matches!(error, AppError::File(_)));
    assert!(error.to_string().contains("txt"));
}

#[test]
fn test_validate_file_size_withLimit_shouldRejectLargerFiles() {
    assert!(FileManager::validate_file_size(1024, 1024).is_ok());
    let error = FileManager::validate_file_size(2048, 1024).unwrap_err();
    assert!(error.to_string().contains("2.0 KB"));
}

#[test]
fn test_detect_file_type_withExtensions_shouldClassify() {
    let extensions = video_extensions();
    assert_eq!(FileManager::detect_file_type("a/movie.mkv", &extensions), FileType::Video);
    assert_eq!(FileManager::detect_file_type("a/movie.srt", &extensions), FileType::Subtitle);
    assert_eq!(FileManager::detect_file_type("a/movie.avi", &extensions), FileType::Unknown);
    assert_eq!(FileManager::detect_file_type("a/movie", &extensions), FileType::Unknown);
}

#[test]
fn test_find_video_files_withNestedFolders_shouldFindSortedVideos() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(root, "b.mkv", b"x")?;
    common::create_test_file(root, "season1/a.mp4", b"x")?;
    common::create_test_file(root, "season1/a.srt", b"x")?;
    common::create_test_file(root, "readme.txt", b"x")?;

    let found = FileManager::find_video_files(root, &video_extensions())?;
    let names: Vec<_> = found
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
        .collect();

    assert_eq!(names, vec![Path::new("b.mkv").to_path_buf(), Path::new("season1/a.mp4").to_path_buf()]);
    Ok(())
}

#[test]
fn test_write_to_file_withMissingParent_shouldCreateIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("out/nested/subtitle_0_eng.srt");

    FileManager::write_to_file(&path, "1\n")?;

    assert!(FileManager::file_exists(&path));
    assert!(FileManager::dir_exists(temp_dir.path().join("out/nested")));
    Ok(())
}
