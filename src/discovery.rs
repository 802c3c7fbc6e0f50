/*!
 * Subtitle stream discovery.
 *
 * The engine has no structured probing API, so discovery runs a bare
 * `-hide_banner -i <input>` invocation and scrapes the diagnostic lines
 * ffmpeg prints while describing the input. The grammar the parser relies
 * on is small:
 *
 * ```text
 * Input #0, matroska,webm, from 'input.mkv':
 *   Stream #0:2(eng): Subtitle: subrip (default)
 *     Metadata:
 *       title           : English (SDH)
 *   Stream #0:3[0x4](PT-br): Subtitle: hdmv_pgs_subtitle (pgssub), 1920x1080
 * ```
 *
 * - a subtitle header line starts a new stream accumulator and flushes the
 *   previous one
 * - any other `Stream #` header closes the current accumulator
 * - a `title : value` line overwrites the title of the open accumulator
 *
 * Subtitle streams get a dense 0-based index in header order, independent of
 * the container's global stream numbers. [`StreamIndexMap`] records the
 * correspondence so extraction can verify it selects the stream discovery saw.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::engine::{LogCapture, MediaEngine};
use crate::errors::EngineError;
use crate::subtitle_languages::{self, SubtitleLanguageInfo};

// @const: Subtitle stream header: global index, optional stream id, optional language, codec, optional annotation
static SUBTITLE_HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*Stream #(\d+):(\d+)(?:\[0x[0-9a-fA-F]+\])?(?:\(([^)]*)\))?:\s*Subtitle:\s*([A-Za-z0-9_]+)(?:\s*\(([^)]*)\))?",
    )
    .unwrap()
});

// @const: Any stream header
static STREAM_HEADER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*Stream #\d+:\d+").unwrap());

// @const: Metadata title key-value line
static TITLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*title\s*:\s*(.*?)\s*$").unwrap());

// @const: Input description header
static INPUT_HEADER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Input #\d+,").unwrap());

/// Messages ffmpeg prints when it cannot open or demux the input
const INPUT_ERROR_MARKERS: &[&str] = &[
    "Invalid data found when processing input",
    "No such file or directory",
    "Error opening input",
    "EBML header parsing failed",
    "moov atom not found",
];

/// Parenthesized header words that are dispositions, not codec annotations
const DISPOSITION_WORDS: &[&str] = &["default", "forced", "hearing impaired", "visual impaired", "original", "dub", "comment"];

/// Codecs that carry images rather than text
const BITMAP_CODECS: &[&str] = &["hdmv_pgs_subtitle", "dvd_subtitle", "dvb_subtitle", "xsub"];

/// Disposition flags printed at the end of a stream header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamDisposition {
    pub default: bool,
    pub forced: bool,
    pub hearing_impaired: bool,
}

impl StreamDisposition {
    fn from_header(line: &str) -> Self {
        Self {
            default: line.contains("(default)"),
            forced: line.contains("(forced)"),
            hearing_impaired: line.contains("(hearing impaired)"),
        }
    }
}

/// One subtitle stream found in a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleStreamDescriptor {
    /// Dense 0-based position among subtitle streams
    pub index: usize,
    /// Global container stream number as printed by the engine
    pub stream_index: usize,
    /// Normalized language tag, if the container has one
    pub language: Option<String>,
    /// Metadata title
    pub title: Option<String>,
    /// Codec name, e.g. `subrip`, `ass`
    pub codec: String,
    /// First parenthesized annotation after the codec
    pub annotation: Option<String>,
    pub disposition: StreamDisposition,
}

impl SubtitleStreamDescriptor {
    /// Language tag or `unknown`
    pub fn language_tag(&self) -> &str {
        self.language.as_deref().unwrap_or("unknown")
    }

    /// Whether the stream can be converted to a text subtitle format
    pub fn is_text_based(&self) -> bool {
        !BITMAP_CODECS.contains(&self.codec.as_str())
    }

    /// Display metadata for this stream's language and title
    ///
    /// Container dispositions set the forced and SDH badges even when the
    /// title does not mention them.
    pub fn classify(&self) -> SubtitleLanguageInfo {
        let mut info = subtitle_languages::classify_stream(self.language.as_deref(), self.title.as_deref());
        info.is_forced |= self.disposition.forced;
        info.is_sdh |= self.disposition.hearing_impaired;
        info
    }
}

/// Lower-case a language tag and upper-case its region subtag
///
/// `PT-br` becomes `pt-BR`; `ENG` becomes `eng`. Blank input yields `None`.
pub fn normalize_language_tag(tag: &str) -> Option<String> {
    let tag = tag.trim();
    if tag.is_empty() {
        return None;
    }

    match tag.split_once('-') {
        Some((base, region)) => Some(format!(
            "{}-{}",
            base.to_lowercase(),
            region.to_uppercase()
        )),
        None => Some(tag.to_lowercase()),
    }
}

/// Dense subtitle index to global container stream index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamIndexMap {
    global: Vec<usize>,
}

impl StreamIndexMap {
    /// Build the map from descriptors in discovery order
    pub fn from_descriptors(descriptors: &[SubtitleStreamDescriptor]) -> Self {
        Self {
            global: descriptors.iter().map(|d| d.stream_index).collect(),
        }
    }

    /// Global stream number of the `dense`-th subtitle stream
    pub fn global_index(&self, dense: usize) -> Option<usize> {
        self.global.get(dense).copied()
    }

    /// Dense subtitle index of a global stream number
    pub fn dense_index(&self, global: usize) -> Option<usize> {
        self.global.iter().position(|g| *g == global)
    }

    /// Whether `descriptor` still sits where discovery put it
    pub fn is_consistent(&self, descriptor: &SubtitleStreamDescriptor) -> bool {
        self.global_index(descriptor.index) == Some(descriptor.stream_index)
    }

    pub fn len(&self) -> usize {
        self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }
}

/// Result of one discovery pass
#[derive(Debug, Clone, Default)]
pub struct StreamDiscovery {
    pub descriptors: Vec<SubtitleStreamDescriptor>,
    pub index_map: StreamIndexMap,
    /// Whether the engine printed an `Input #` description
    pub input_recognized: bool,
    /// Last line that reported a problem opening the input
    pub input_error: Option<String>,
}

impl StreamDiscovery {
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Incremental parser over engine diagnostic lines
#[derive(Debug, Default)]
pub struct StreamLogParser {
    current: Option<SubtitleStreamDescriptor>,
    descriptors: Vec<SubtitleStreamDescriptor>,
    input_recognized: bool,
    input_error: Option<String>,
}

impl StreamLogParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one line
    pub fn feed(&mut self, line: &str) {
        if INPUT_HEADER_REGEX.is_match(line) {
            self.input_recognized = true;
            return;
        }

        if let Some(caps) = SUBTITLE_HEADER_REGEX.captures(line) {
            self.flush();
            let stream_index = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or_default();
            self.current = Some(SubtitleStreamDescriptor {
                index: self.descriptors.len(),
                stream_index,
                language: caps.get(3).and_then(|m| normalize_language_tag(m.as_str())),
                title: None,
                codec: caps.get(4).map(|m| m.as_str().to_string()).unwrap_or_default(),
                annotation: caps
                    .get(5)
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|a| !a.is_empty() && !DISPOSITION_WORDS.contains(&a.as_str())),
                disposition: StreamDisposition::from_header(line),
            });
            return;
        }

        if STREAM_HEADER_REGEX.is_match(line) {
            // Audio, video or attachment: its metadata is not ours
            self.flush();
            return;
        }

        if let Some(current) = self.current.as_mut() {
            if let Some(caps) = TITLE_REGEX.captures(line) {
                let title = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                current.title = (!title.is_empty()).then(|| title.to_string());
                return;
            }
        }

        if INPUT_ERROR_MARKERS.iter().any(|marker| line.contains(marker)) {
            self.input_error = Some(line.trim().to_string());
        }
    }

    fn flush(&mut self) {
        if let Some(descriptor) = self.current.take() {
            self.descriptors.push(descriptor);
        }
    }

    /// Flush the last accumulator and return the discovery
    pub fn finish(mut self) -> StreamDiscovery {
        self.flush();
        let index_map = StreamIndexMap::from_descriptors(&self.descriptors);
        StreamDiscovery {
            descriptors: self.descriptors,
            index_map,
            input_recognized: self.input_recognized,
            input_error: self.input_error,
        }
    }
}

/// Parse a complete sequence of diagnostic lines
pub fn parse_stream_log<I, S>(lines: I) -> StreamDiscovery
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = StreamLogParser::new();
    for line in lines {
        parser.feed(line.as_ref());
    }
    parser.finish()
}

/// Arguments of the inspection invocation
pub fn probe_args(input_path: &str) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-i".to_string(),
        input_path.to_string(),
    ]
}

/// Probe a staged input and parse its subtitle streams
///
/// The probe names no output file, so ffmpeg exits with a failure status even
/// for a perfectly valid input; the status is only logged.
pub async fn discover_streams(
    engine: &dyn MediaEngine,
    input_path: &str,
) -> Result<StreamDiscovery, EngineError> {
    let capture = LogCapture::attach(engine.log_observers());
    let status = engine.exec(&probe_args(input_path)).await?;
    let lines = capture.finish();

    debug!(
        "Probe of {} exited with status {} after {} log line(s)",
        input_path,
        status,
        lines.len()
    );

    let discovery = parse_stream_log(&lines);
    debug!("Found {} subtitle stream(s)", discovery.descriptors.len());
    Ok(discovery)
}
