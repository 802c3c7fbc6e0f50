use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

// @module: Cue count and time span of an extracted text subtitle

// @const: SRT/WebVTT cue timing line; WebVTT may omit the hours
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:(\d{2,}):)?(\d{2}):(\d{2})[,.](\d{3})\s+-->\s+(?:(\d{2,}):)?(\d{2}):(\d{2})[,.](\d{3})",
    )
    .unwrap()
});

// @const: ASS event line: `Dialogue: layer,start,end,...`
static ASS_DIALOGUE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Dialogue:\s*[^,]*,(\d+):(\d{2}):(\d{2})\.(\d{2}),(\d+):(\d{2}):(\d{2})\.(\d{2}),")
        .unwrap()
});

// @struct: Summary of one subtitle payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubtitleSummary {
    // @field: Number of timed cues
    pub cue_count: usize,

    // @field: Start of the earliest cue in ms
    pub first_start_ms: Option<u64>,

    // @field: End of the latest cue in ms
    pub last_end_ms: Option<u64>,
}

impl SubtitleSummary {
    /// Summarize SRT, WebVTT or ASS text
    pub fn from_content(content: &str) -> Self {
        let mut summary = Self::default();

        for line in content.lines() {
            let line = line.trim();
            let span = if let Some(caps) = TIMESTAMP_REGEX.captures(line) {
                Some((millis(&caps, 1, 1), millis(&caps, 5, 1)))
            } else {
                ASS_DIALOGUE_REGEX
                    .captures(line)
                    .map(|caps| (millis(&caps, 1, 10), millis(&caps, 5, 10)))
            };

            if let Some((start, end)) = span {
                summary.cue_count += 1;
                summary.first_start_ms = Some(summary.first_start_ms.map_or(start, |s| s.min(start)));
                summary.last_end_ms = Some(summary.last_end_ms.map_or(end, |e| e.max(end)));
            }
        }

        summary
    }

    pub fn is_empty(&self) -> bool {
        self.cue_count == 0
    }

    /// Format a timestamp in milliseconds as `HH:MM:SS,mmm`
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

/// Milliseconds from four consecutive groups starting at `start`
///
/// A missing hours group counts as zero. `scale` converts the fractional
/// group to milliseconds (ASS uses centiseconds).
fn millis(caps: &regex::Captures, start: usize, scale: u64) -> u64 {
    let group = |i: usize| -> u64 {
        caps.get(start + i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    // Hours are unbounded in the pattern; saturate instead of overflowing
    group(0)
        .saturating_mul(3_600_000)
        .saturating_add(group(1) * 60_000)
        .saturating_add(group(2) * 1_000)
        .saturating_add(group(3) * scale)
}

impl fmt::Display for SubtitleSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.first_start_ms, self.last_end_ms) {
            (Some(first), Some(last)) => write!(
                f,
                "{} cue(s), {} -> {}",
                self.cue_count,
                Self::format_timestamp(first),
                Self::format_timestamp(last)
            ),
            _ => write!(f, "no cues"),
        }
    }
}
