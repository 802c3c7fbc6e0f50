/*!
 * Mock engine implementation for testing.
 *
 * The mock keeps its virtual filesystem in memory and answers invocations
 * from a script:
 * - a probe invocation (`-i <input>` without `-map`) replays the scripted
 *   diagnostic lines and exits with status 1, like real ffmpeg does when no
 *   output file is given
 * - an extraction invocation (`-map 0:s:<n> ... <output>`) writes the scripted
 *   content for stream `n` to `<output>` and exits 0, or fails if the stream
 *   is scripted to fail
 * - loading can be scripted to fail a number of times first
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::engine::{LogObservers, MediaEngine};
use crate::errors::EngineError;
use crate::progress::EngineProgressFn;

/// Scripted outcome for one dense subtitle index
#[derive(Debug, Clone, PartialEq)]
pub enum MockTrack {
    /// Extraction succeeds and writes this text
    Content(String),
    /// Extraction succeeds but writes raw bytes
    Bytes(Vec<u8>),
    /// ffmpeg exits with a non-zero status and writes nothing
    Fail,
    /// ffmpeg exits 0 but produces no output file
    Missing,
}

/// Scriptable in-memory engine
#[derive(Debug, Default)]
pub struct MockEngine {
    probe_log: Vec<String>,
    tracks: HashMap<usize, MockTrack>,
    load_failures: AtomicUsize,
    load_log: Vec<String>,
    load_calls: AtomicUsize,
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    history: Mutex<Vec<Vec<String>>>,
    observers: LogObservers,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines replayed by every probe invocation
    pub fn with_probe_log<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.probe_log = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Script the outcome of extracting dense subtitle index `index`
    pub fn with_track(mut self, index: usize, track: MockTrack) -> Self {
        self.tracks.insert(index, track);
        self
    }

    /// Fail the first `count` load attempts
    pub fn failing_loads(self, count: usize) -> Self {
        self.load_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Lines emitted while loading (must not reach discovery)
    pub fn with_load_log<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.load_log = lines.into_iter().map(Into::into).collect();
        self
    }

    /// How many times `load` was called
    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    /// Paths currently present in the virtual filesystem
    pub fn files(&self) -> Vec<String> {
        self.files.lock().keys().cloned().collect()
    }

    /// Every invocation received, in order
    pub fn history(&self) -> Vec<Vec<String>> {
        self.history.lock().clone()
    }

    /// Dense subtitle index selected by an extraction invocation
    fn mapped_subtitle_index(args: &[String]) -> Option<usize> {
        let position = args.iter().position(|a| a == "-map")?;
        args.get(position + 1)?
            .strip_prefix("0:s:")?
            .parse()
            .ok()
    }

    fn input_path(args: &[String]) -> Option<&str> {
        let position = args.iter().position(|a| a == "-i")?;
        args.get(position + 1).map(String::as_str)
    }
}

#[async_trait]
impl MediaEngine for MockEngine {
    async fn load(&self, on_progress: Option<&EngineProgressFn<'_>>) -> Result<(), EngineError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        for line in &self.load_log {
            self.observers.emit(line);
        }

        let remaining = self.load_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.load_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(EngineError::AssetLoad("mock asset fetch failed".to_string()));
        }

        if let Some(callback) = on_progress {
            callback(50);
            callback(100);
        }
        Ok(())
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<(), EngineError> {
        if path.is_empty() {
            return Err(EngineError::InvalidPath(path.to_string()));
        }
        self.files.lock().insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, EngineError> {
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| EngineError::FileNotFound(path.to_string()))
    }

    async fn delete_file(&self, path: &str) -> Result<(), EngineError> {
        self.files
            .lock()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| EngineError::FileNotFound(path.to_string()))
    }

    async fn exec(&self, args: &[String]) -> Result<i32, EngineError> {
        self.history.lock().push(args.to_vec());

        let input_exists = Self::input_path(args)
            .map(|input| self.files.lock().contains_key(input))
            .unwrap_or(false);
        if !input_exists {
            self.observers.emit("input: No such file or directory");
            return Ok(1);
        }

        let Some(index) = Self::mapped_subtitle_index(args) else {
            for line in &self.probe_log {
                self.observers.emit(line);
            }
            self.observers
                .emit("At least one output file must be specified");
            return Ok(1);
        };

        let output = args.last().cloned().unwrap_or_default();
        match self.tracks.get(&index) {
            Some(MockTrack::Content(text)) => {
                self.files.lock().insert(output, text.as_bytes().to_vec());
                self.observers.emit("size=       1kB time=00:00:10.00");
                Ok(0)
            }
            Some(MockTrack::Bytes(bytes)) => {
                self.files.lock().insert(output, bytes.clone());
                Ok(0)
            }
            Some(MockTrack::Missing) => Ok(0),
            Some(MockTrack::Fail) | None => {
                self.observers
                    .emit(&format!("Stream map '0:s:{}' matches no streams.", index));
                Ok(1)
            }
        }
    }

    fn log_observers(&self) -> &LogObservers {
        &self.observers
    }
}
