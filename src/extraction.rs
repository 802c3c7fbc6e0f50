/*!
 * Subtitle track extraction pipeline.
 *
 * One run takes a [`MediaSource`] through four stages against a shared
 * engine:
 *
 * 1. make sure the engine is loaded
 * 2. stage the source bytes in a run-private namespace of the engine's
 *    virtual filesystem
 * 3. discover the subtitle streams
 * 4. extract every stream, in discovery order, to a text subtitle format
 *
 * A stream that cannot be extracted is logged, recorded in the
 * [`ExtractionReport`] and skipped. Only a run where nothing at all could be
 * extracted fails as a whole. Staged input and per-track outputs are removed
 * before the run returns, whatever the outcome.
 */

use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::app_config::{ExtractionConfig, SubtitleFormat};
use crate::discovery::{self, StreamDiscovery, StreamIndexMap, SubtitleStreamDescriptor};
use crate::engine::{EngineHandle, EngineLoader, LogCapture, MediaEngine, RunWorkspace};
use crate::errors::{EngineError, ExtractionError};
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::media_source::MediaSource;
use crate::progress::{
    CancellationToken, EngineProgressFn, PROGRESS_DONE, PROGRESS_ENGINE_LOAD_START, PROGRESS_ENGINE_LOADED,
    PROGRESS_SOURCE_WRITTEN, PROGRESS_STREAMS_DISCOVERED, ProgressFn, ProgressReporter,
};
use crate::subtitle_languages::SubtitleLanguageInfo;

/// Why one subtitle stream could not be extracted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackFailure {
    /// Dense subtitle index
    pub index: usize,
    /// Global container stream number
    pub stream_index: usize,
    pub reason: String,
}

/// One extracted subtitle stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedSubtitleTrack {
    #[serde(flatten)]
    pub descriptor: SubtitleStreamDescriptor,
    /// Format `content` is encoded in
    pub format: SubtitleFormat,
    /// Full text payload
    pub content: String,
}

impl ExtractedSubtitleTrack {
    pub fn index(&self) -> usize {
        self.descriptor.index
    }

    /// Normalized language tag or `unknown`
    pub fn language(&self) -> &str {
        self.descriptor.language_tag()
    }

    pub fn title(&self) -> Option<&str> {
        self.descriptor.title.as_deref()
    }

    pub fn codec(&self) -> &str {
        &self.descriptor.codec
    }

    /// `<prefix>_<index>_<language>.<ext>`
    pub fn filename(&self, prefix: &str) -> String {
        FileManager::subtitle_filename(prefix, self.index(), self.language(), self.format.extension())
    }

    /// Display metadata for this track
    pub fn classify(&self) -> SubtitleLanguageInfo {
        self.descriptor.classify()
    }
}

/// Outcome of a run that produced at least one track
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    /// Name of the source file
    pub source_name: String,
    /// Extracted tracks in discovery order
    pub tracks: Vec<ExtractedSubtitleTrack>,
    /// Streams that were discovered but could not be extracted
    pub failures: Vec<TrackFailure>,
}

impl ExtractionReport {
    /// Number of discovered streams
    pub fn attempted(&self) -> usize {
        self.tracks.len() + self.failures.len()
    }

    /// Whether some discovered streams are missing from `tracks`
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Pick one track: preferred language, then English, then the first track
    pub fn select_track(&self, preferred_language: &str) -> Option<&ExtractedSubtitleTrack> {
        let descriptors: Vec<SubtitleStreamDescriptor> =
            self.tracks.iter().map(|t| t.descriptor.clone()).collect();
        let selected = select_subtitle_stream(&descriptors, preferred_language)?;
        self.tracks.iter().find(|t| t.index() == selected.index)
    }
}

/// Choose the stream matching `preferred_language`
///
/// Matches the language tag with ISO 639-1/639-2 awareness, then the English
/// language name inside the title. Falls back to English and then to the
/// first stream.
pub fn select_subtitle_stream<'a>(
    descriptors: &'a [SubtitleStreamDescriptor],
    preferred_language: &str,
) -> Option<&'a SubtitleStreamDescriptor> {
    fn is_match(descriptor: &SubtitleStreamDescriptor, code: &str, name: Option<&str>) -> bool {
        if let Some(language) = &descriptor.language {
            if language_utils::language_codes_match(language, code) {
                return true;
            }
        }
        match (&descriptor.title, name) {
            (Some(title), Some(name)) => title.to_lowercase().contains(&name.to_lowercase()),
            _ => false,
        }
    }

    let preferred_name = language_utils::get_language_name(preferred_language).ok();
    if let Some(found) = descriptors
        .iter()
        .find(|d| is_match(d, preferred_language, preferred_name.as_deref()))
    {
        return Some(found);
    }

    if !language_utils::language_codes_match(preferred_language, "en") {
        if let Some(found) = descriptors
            .iter()
            .find(|d| is_match(d, "en", Some("English")))
        {
            return Some(found);
        }
    }

    descriptors.first()
}

/// Per-run settings
#[derive(Debug, Clone, Default)]
pub struct ExtractionOptions {
    /// Text format every stream is converted to
    pub format: SubtitleFormat,
    /// Checked before staging, before discovery and before every track
    pub cancellation: Option<CancellationToken>,
}

impl ExtractionOptions {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            format: config.output_format,
            cancellation: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn check_cancelled(&self) -> Result<(), ExtractionError> {
        match &self.cancellation {
            Some(token) if token.is_cancelled() => Err(ExtractionError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Tracks and failures of one [`extract_all`] pass
#[derive(Debug, Default)]
pub struct TrackOutcomes {
    pub tracks: Vec<ExtractedSubtitleTrack>,
    pub failures: Vec<TrackFailure>,
}

/// Arguments of one extraction invocation
///
/// The stream is selected by its dense subtitle-only index, which is what
/// `0:s:<n>` addresses.
pub fn extraction_args(input_path: &str, index: usize, format: SubtitleFormat, output_path: &str) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-y".to_string(),
        "-i".to_string(),
        input_path.to_string(),
        "-map".to_string(),
        format!("0:s:{}", index),
        "-c:s".to_string(),
        format.codec().to_string(),
        output_path.to_string(),
    ]
}

/// Extract every discovered stream in ascending order
///
/// Per-stream failures are collected, never returned. Each output is deleted
/// right after it has been read. The staged input is left to the caller.
pub async fn extract_all(
    engine: &dyn MediaEngine,
    workspace: &RunWorkspace,
    discovery: &StreamDiscovery,
    options: &ExtractionOptions,
    reporter: &ProgressReporter<'_>,
) -> Result<TrackOutcomes, ExtractionError> {
    let total = discovery.descriptors.len();
    let mut outcomes = TrackOutcomes::default();

    for (done, descriptor) in discovery.descriptors.iter().enumerate() {
        options.check_cancelled()?;

        match extract_track(engine, workspace, descriptor, &discovery.index_map, options.format).await {
            Ok(content) => {
                debug!(
                    "Extracted subtitle stream {} ({}, {} bytes)",
                    descriptor.index,
                    descriptor.language_tag(),
                    content.len()
                );
                outcomes.tracks.push(ExtractedSubtitleTrack {
                    descriptor: descriptor.clone(),
                    format: options.format,
                    content,
                });
            }
            Err(reason) => {
                warn!(
                    "Skipping subtitle stream {} ({}): {}",
                    descriptor.index,
                    descriptor.language_tag(),
                    reason
                );
                outcomes.failures.push(TrackFailure {
                    index: descriptor.index,
                    stream_index: descriptor.stream_index,
                    reason,
                });
            }
        }

        reporter.report(
            ProgressReporter::track_milestone(done + 1, total),
            &format!("Extracted subtitle {}/{}", done + 1, total),
        );
    }

    Ok(outcomes)
}

/// Extract one stream; the error is a human-readable reason
async fn extract_track(
    engine: &dyn MediaEngine,
    workspace: &RunWorkspace,
    descriptor: &SubtitleStreamDescriptor,
    index_map: &StreamIndexMap,
    format: SubtitleFormat,
) -> Result<String, String> {
    if !index_map.is_consistent(descriptor) {
        return Err(format!(
            "dense index {} does not map to stream #{}",
            descriptor.index, descriptor.stream_index
        ));
    }
    if !descriptor.is_text_based() {
        return Err(format!(
            "bitmap codec {} cannot be converted to text",
            descriptor.codec
        ));
    }

    let output_path = workspace.output_path(descriptor.index, format.extension());
    let args = extraction_args(workspace.input_path(), descriptor.index, format, &output_path);

    let capture = LogCapture::attach(engine.log_observers());
    let status = engine.exec(&args).await;
    let log = capture.finish();

    let read = engine.read_file(&output_path).await;
    remove_artifact(engine, &output_path).await;

    let status = status.map_err(|e| e.to_string())?;
    if status != 0 {
        let detail = log
            .iter()
            .rev()
            .find(|line| !line.trim().is_empty())
            .map(|line| format!(": {}", line.trim()))
            .unwrap_or_default();
        return Err(format!("ffmpeg exited with status {}{}", status, detail));
    }

    let bytes = read.map_err(|e| e.to_string())?;
    let content = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!(
                "Subtitle stream {} is not valid UTF-8, replacing invalid sequences",
                descriptor.index
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    // A stream without events extracts to an empty file; that is still a track
    Ok(content)
}

/// Delete a virtual file; a file that is already gone is fine
async fn remove_artifact(engine: &dyn MediaEngine, path: &str) {
    match engine.delete_file(path).await {
        Ok(()) | Err(EngineError::FileNotFound(_)) => {}
        Err(e) => warn!("Failed to remove {}: {}", path, e),
    }
}

/// Drives extraction runs against an engine provided by an [`EngineLoader`]
#[derive(Debug, Clone)]
pub struct SubtitleExtractor {
    // @field: Shared engine loader
    loader: Arc<EngineLoader>,

    // @field: Per-run settings
    options: ExtractionOptions,
}

impl SubtitleExtractor {
    pub fn new(loader: Arc<EngineLoader>) -> Self {
        Self {
            loader,
            options: ExtractionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExtractionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn loader(&self) -> &Arc<EngineLoader> {
        &self.loader
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    async fn engine(&self, reporter: &ProgressReporter<'_>) -> Result<EngineHandle, ExtractionError> {
        let on_engine_progress = |percent: u8| {
            reporter.report(
                ProgressReporter::scaled(PROGRESS_ENGINE_LOAD_START, PROGRESS_ENGINE_LOADED, percent),
                "Loading subtitle engine",
            );
        };

        self.loader
            .ensure_loaded(Some(&on_engine_progress as &EngineProgressFn<'_>))
            .await
            .map_err(ExtractionError::EngineInit)
    }

    /// List the subtitle streams of `source` without extracting them
    ///
    /// An empty list is a valid answer here; only an input the engine cannot
    /// read is an error.
    pub async fn probe(&self, source: &MediaSource) -> Result<StreamDiscovery, ExtractionError> {
        let reporter = ProgressReporter::new(None);
        let handle = self.engine(&reporter).await?;
        let _run = handle.lock_run().await;
        let engine = handle.engine();

        let workspace = RunWorkspace::new(&source.extension());
        let outcome = async {
            self.options.check_cancelled()?;
            engine.write_file(workspace.input_path(), source.bytes()).await?;
            self.options.check_cancelled()?;
            let discovery = discovery::discover_streams(engine, workspace.input_path()).await?;
            ensure_readable(source, &discovery)?;
            Ok::<_, ExtractionError>(discovery)
        }
        .await;

        remove_artifact(engine, workspace.input_path()).await;
        outcome
    }

    /// Extract every subtitle stream of `source` as text
    ///
    /// # Arguments
    /// * `source` - The video file
    /// * `on_progress` - Optional `(percent, message)` callback; percentages
    ///   never decrease within the run
    ///
    /// # Returns
    /// The extracted tracks plus the streams that could not be extracted
    pub async fn extract_subtitles(
        &self,
        source: &MediaSource,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<ExtractionReport, ExtractionError> {
        let reporter = ProgressReporter::new(on_progress);
        reporter.report(PROGRESS_ENGINE_LOAD_START, "Loading subtitle engine");

        let handle = self.engine(&reporter).await?;
        reporter.report(PROGRESS_ENGINE_LOADED, "Subtitle engine ready");

        let _run = handle.lock_run().await;
        let engine = handle.engine();
        let workspace = RunWorkspace::new(&source.extension());
        debug!(
            "Extracting subtitles from {} ({}) in {}",
            source.name(),
            FileManager::format_file_size(source.size()),
            workspace.namespace()
        );

        let outcome = self.run_staged(engine, &workspace, source, &reporter).await;
        remove_artifact(engine, workspace.input_path()).await;

        let report = outcome?;
        reporter.report(PROGRESS_DONE, "Done");
        Ok(report)
    }

    async fn run_staged(
        &self,
        engine: &dyn MediaEngine,
        workspace: &RunWorkspace,
        source: &MediaSource,
        reporter: &ProgressReporter<'_>,
    ) -> Result<ExtractionReport, ExtractionError> {
        self.options.check_cancelled()?;
        engine.write_file(workspace.input_path(), source.bytes()).await?;
        reporter.report(PROGRESS_SOURCE_WRITTEN, "Video loaded");

        self.options.check_cancelled()?;
        let discovery = discovery::discover_streams(engine, workspace.input_path()).await?;
        ensure_readable(source, &discovery)?;
        if discovery.is_empty() {
            info!("No subtitle streams found in {}", source.name());
            return Err(ExtractionError::NoSubtitlesFound(source.name().to_string()));
        }

        let attempted = discovery.descriptors.len();
        info!("Found {} subtitle stream(s) in {}", attempted, source.name());
        reporter.report(
            PROGRESS_STREAMS_DISCOVERED,
            &format!("Found {} subtitle stream(s)", attempted),
        );

        let outcomes = extract_all(engine, workspace, &discovery, &self.options, reporter).await?;
        if outcomes.tracks.is_empty() {
            return Err(ExtractionError::ExtractionFailed {
                attempted,
                failures: outcomes.failures,
            });
        }

        if !outcomes.failures.is_empty() {
            warn!(
                "Extracted {} of {} subtitle stream(s) from {}",
                outcomes.tracks.len(),
                attempted,
                source.name()
            );
        }

        Ok(ExtractionReport {
            source_name: source.name().to_string(),
            tracks: outcomes.tracks,
            failures: outcomes.failures,
        })
    }
}

/// Zero streams on an input the engine never described means it could not read it
fn ensure_readable(source: &MediaSource, discovery: &StreamDiscovery) -> Result<(), ExtractionError> {
    if discovery.is_empty() && !discovery.input_recognized {
        let detail = discovery
            .input_error
            .clone()
            .unwrap_or_else(|| "input was not recognized".to_string());
        return Err(ExtractionError::UnreadableSource(format!(
            "{}: {}",
            source.name(),
            detail
        )));
    }
    Ok(())
}
