use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::Config;
use crate::discovery::SubtitleStreamDescriptor;
use crate::engine::ffmpeg::FfmpegEngine;
use crate::engine::{EngineLoader, MediaEngine};
use crate::errors::ExtractionError;
use crate::extraction::{self, ExtractionOptions, ExtractionReport, SubtitleExtractor};
use crate::file_utils::FileManager;
use crate::media_source::MediaSource;
use crate::progress::{CancellationToken, ProgressFn};
use crate::subtitle_languages::SubtitleLanguageInfo;
use crate::subtitle_summary::SubtitleSummary;

// @module: Application controller for subtitle extraction

/// One discovered stream with its display metadata
#[derive(Debug, Clone, Serialize)]
pub struct ProbedStream {
    #[serde(flatten)]
    pub descriptor: SubtitleStreamDescriptor,
    pub display: SubtitleLanguageInfo,
    pub text_based: bool,
}

/// Result of probing one file
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub source_name: String,
    pub size: u64,
    pub streams: Vec<ProbedStream>,
    /// Dense index of the stream picked for the preferred language
    pub preferred_index: Option<usize>,
}

/// One subtitle file written by [`Controller::extract_file`]
#[derive(Debug, Clone, Serialize)]
pub struct WrittenSubtitle {
    pub index: usize,
    pub language: String,
    pub title: Option<String>,
    pub codec: String,
    pub filename: String,
    pub path: PathBuf,
    pub display: SubtitleLanguageInfo,
    pub summary: SubtitleSummary,
}

/// Result of extracting one file
#[derive(Debug, Clone, Serialize)]
pub struct FileExtraction {
    pub written: Vec<WrittenSubtitle>,
    /// Outputs left alone because they already existed
    pub skipped: Vec<PathBuf>,
    pub report: ExtractionReport,
}

/// Counters of a folder run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FolderSummary {
    pub processed: usize,
    pub without_subtitles: usize,
    pub failed: usize,
    pub files_written: usize,
}

/// Main application controller for subtitle extraction
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Pipeline bound to a shared engine loader
    extractor: SubtitleExtractor,

    // @field: Draw a progress bar while extracting
    show_progress: bool,
}

impl Controller {
    // @method: Create a new controller backed by the native ffmpeg engine
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;

        let engine_config = config.engine.clone();
        let loader = EngineLoader::new(move || {
            Arc::new(FfmpegEngine::new(&engine_config)) as Arc<dyn MediaEngine>
        });

        Ok(Self::with_loader(config, Arc::new(loader)))
    }

    // @method: Create a controller around an existing engine loader
    pub fn with_loader(config: Config, loader: Arc<EngineLoader>) -> Self {
        let extractor = SubtitleExtractor::new(loader)
            .with_options(ExtractionOptions::from_config(&config.extraction));

        Self {
            config,
            extractor,
            show_progress: true,
        }
    }

    /// Abort runs when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        let options = self.extractor.options().clone().with_cancellation(token);
        self.extractor = self.extractor.with_options(options);
        self
    }

    /// Enable or disable the terminal progress bar
    pub fn with_progress_bar(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn extractor(&self) -> &SubtitleExtractor {
        &self.extractor
    }

    /// Read a source file after checking its extension and size
    pub async fn load_source(&self, path: &Path) -> Result<MediaSource> {
        if !FileManager::file_exists(path) {
            return Err(anyhow!("Input file does not exist: {:?}", path));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        FileManager::validate_file_extension(&name, &self.config.extraction.video_extensions)?;

        let size = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to read metadata: {:?}", path))?
            .len();
        FileManager::validate_file_size(size, self.config.extraction.max_file_size_bytes())?;

        MediaSource::from_path(path).await
    }

    /// List the subtitle streams of a file
    pub async fn probe_file(&self, input_file: &Path) -> Result<ProbeResult> {
        let source = self.load_source(input_file).await?;
        let discovery = self.extractor.probe(&source).await?;

        let preferred_index =
            extraction::select_subtitle_stream(&discovery.descriptors, &self.config.preferred_language)
                .map(|d| d.index);

        let streams = discovery
            .descriptors
            .into_iter()
            .map(|descriptor| ProbedStream {
                display: descriptor.classify(),
                text_based: descriptor.is_text_based(),
                descriptor,
            })
            .collect();

        Ok(ProbeResult {
            source_name: source.name().to_string(),
            size: source.size(),
            streams,
            preferred_index,
        })
    }

    /// Extract the subtitles of one file into `output_dir`
    ///
    /// With `language` set, only the track selected for that language is
    /// written; otherwise every extracted track is.
    pub async fn extract_file(
        &self,
        input_file: &Path,
        output_dir: &Path,
        language: Option<&str>,
        force_overwrite: bool,
    ) -> Result<FileExtraction> {
        let start_time = std::time::Instant::now();
        let source = self.load_source(input_file).await?;
        info!(
            "Extracting subtitles from {} ({})",
            source.name(),
            FileManager::format_file_size(source.size())
        );

        let progress_bar = self.create_progress_bar();
        let pb = progress_bar.clone();
        let on_progress = move |percent: u8, message: &str| {
            pb.set_position(percent as u64);
            pb.set_message(message.to_string());
        };

        let result = self
            .extractor
            .extract_subtitles(&source, Some(&on_progress as &ProgressFn<'_>))
            .await;
        progress_bar.finish_and_clear();
        let report = result?;

        FileManager::ensure_dir(output_dir)?;

        let selected: Vec<_> = match language {
            Some(lang) => report.select_track(lang).into_iter().collect(),
            None => report.tracks.iter().collect(),
        };

        let prefix = &self.config.extraction.filename_prefix;
        let mut written = Vec::new();
        let mut skipped = Vec::new();

        for track in selected {
            let filename = track.filename(prefix);
            let path = output_dir.join(&filename);

            if path.exists() && !force_overwrite {
                warn!("Skipping {:?}, file already exists (use -f to force overwrite)", path);
                skipped.push(path);
                continue;
            }

            FileManager::write_to_file(&path, &track.content)?;

            let display = track.classify();
            let summary = SubtitleSummary::from_content(&track.content);
            let badges: Vec<&str> = display.badges().iter().map(|b| b.label()).collect();
            info!(
                "{} {}{} -> {} ({})",
                display.flag,
                display.display_name,
                if badges.is_empty() { String::new() } else { format!(" [{}]", badges.join(", ")) },
                filename,
                summary
            );

            written.push(WrittenSubtitle {
                index: track.index(),
                language: track.language().to_string(),
                title: track.title().map(str::to_string),
                codec: track.codec().to_string(),
                filename,
                path,
                display,
                summary,
            });
        }

        debug!(
            "Extraction of {} finished in {}",
            source.name(),
            Self::format_duration(start_time.elapsed())
        );

        Ok(FileExtraction {
            written,
            skipped,
            report,
        })
    }

    /// Extract every video under `input_dir`, next to each video
    ///
    /// Best effort: a file that fails is logged and counted, and the run
    /// moves on to the next one.
    pub async fn run_folder(
        &self,
        input_dir: &Path,
        language: Option<&str>,
        force_overwrite: bool,
    ) -> Result<FolderSummary> {
        if !FileManager::dir_exists(input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let video_files =
            FileManager::find_video_files(input_dir, &self.config.extraction.video_extensions)?;
        if video_files.is_empty() {
            return Err(anyhow!("No video files found in directory: {:?}", input_dir));
        }

        info!("Found {} video file(s) in {:?}", video_files.len(), input_dir);
        let mut summary = FolderSummary::default();

        for video_file in &video_files {
            let output_dir = video_file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| input_dir.to_path_buf());

            match self
                .extract_file(video_file, &output_dir, language, force_overwrite)
                .await
            {
                Ok(extraction) => {
                    summary.processed += 1;
                    summary.files_written += extraction.written.len();
                }
                Err(e) => match e.downcast_ref::<ExtractionError>() {
                    Some(ExtractionError::Cancelled) => return Err(e),
                    Some(extraction_error) if extraction_error.is_no_subtitles() => {
                        info!("No subtitles in {:?}", video_file);
                        summary.without_subtitles += 1;
                    }
                    _ => {
                        error!("Error processing {:?}: {}", video_file, e);
                        summary.failed += 1;
                    }
                },
            }
        }

        info!(
            "Processed {} file(s): {} without subtitles, {} failed, {} subtitle file(s) written",
            summary.processed, summary.without_subtitles, summary.failed, summary.files_written
        );

        Ok(summary)
    }

    fn create_progress_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress_bar = ProgressBar::new(100);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {percent}% {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar
    }

    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
