/*!
 * Media engine abstraction.
 *
 * The extraction pipeline never talks to ffmpeg directly. It drives a
 * [`MediaEngine`]: something that can be loaded once, owns a virtual
 * filesystem for staging input and output artifacts, runs ffmpeg-style
 * invocations and publishes every diagnostic line it prints to a set of
 * [`LogObservers`].
 *
 * - `ffmpeg`: native ffmpeg process with a temp-dir backed virtual filesystem
 * - `mock`: scriptable in-memory engine used by the tests
 *
 * [`EngineLoader`] owns the lazily-initialized engine and hands out shared
 * [`EngineHandle`]s.
 */

use async_trait::async_trait;
use log::{debug, trace};
use parking_lot::{Mutex, RwLock};
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{MutexGuard, OnceCell};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::progress::EngineProgressFn;

pub mod ffmpeg;
pub mod mock;

/// Common trait for media engine backends
///
/// Paths are virtual: relative, `/`-separated and interpreted inside the
/// engine's own workspace.
#[async_trait]
pub trait MediaEngine: Send + Sync + Debug {
    /// Fetch and install the engine runtime
    ///
    /// # Arguments
    /// * `on_progress` - Optional callback receiving the load percentage
    async fn load(&self, on_progress: Option<&EngineProgressFn<'_>>) -> Result<(), EngineError>;

    /// Write a file into the virtual filesystem, creating parent directories
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<(), EngineError>;

    /// Read a file from the virtual filesystem
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, EngineError>;

    /// Delete a file from the virtual filesystem
    async fn delete_file(&self, path: &str) -> Result<(), EngineError>;

    /// Run one invocation and return its exit code
    ///
    /// Every diagnostic line is published to [`MediaEngine::log_observers`]
    /// in emission order before this returns.
    async fn exec(&self, args: &[String]) -> Result<i32, EngineError>;

    /// Registry of log-line observers for this engine
    fn log_observers(&self) -> &LogObservers;
}

/// Identifier returned by [`LogObservers::attach`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type LogObserver = Arc<dyn Fn(&str) + Send + Sync>;

/// Attach/detach registry of diagnostic line observers
#[derive(Default)]
pub struct LogObservers {
    next_id: AtomicU64,
    observers: RwLock<Vec<(ObserverId, LogObserver)>>,
}

impl LogObservers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer; it receives every line emitted until detached
    pub fn attach(&self, observer: LogObserver) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.observers.write().push((id, observer));
        id
    }

    /// Remove an observer; returns false if it was not attached
    pub fn detach(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Publish one line to every attached observer
    pub fn emit(&self, line: &str) {
        // Snapshot so observers may attach/detach while being called
        let snapshot: Vec<LogObserver> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in snapshot {
            observer(line);
        }
    }

    /// Number of attached observers
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Debug for LogObservers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogObservers")
            .field("attached", &self.len())
            .finish()
    }
}

/// Scoped observer that records lines until finished or dropped
pub struct LogCapture<'a> {
    observers: &'a LogObservers,
    id: ObserverId,
    lines: Arc<Mutex<Vec<String>>>,
    detached: bool,
}

impl<'a> LogCapture<'a> {
    /// Start capturing lines from `observers`
    pub fn attach(observers: &'a LogObservers) -> Self {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let id = observers.attach(Arc::new(move |line: &str| {
            sink.lock().push(line.to_string());
        }));

        Self {
            observers,
            id,
            lines,
            detached: false,
        }
    }

    /// Detach and return the captured lines in emission order
    pub fn finish(mut self) -> Vec<String> {
        self.detach();
        std::mem::take(&mut *self.lines.lock())
    }

    fn detach(&mut self) {
        if !self.detached {
            self.observers.detach(self.id);
            self.detached = true;
        }
    }
}

impl Drop for LogCapture<'_> {
    fn drop(&mut self) {
        self.detach();
    }
}

struct EngineInner {
    engine: Arc<dyn MediaEngine>,
    run_lock: tokio::sync::Mutex<()>,
}

/// Shared handle to a loaded engine
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<EngineInner>,
}

impl EngineHandle {
    fn new(engine: Arc<dyn MediaEngine>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                engine,
                run_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// The underlying engine
    pub fn engine(&self) -> &dyn MediaEngine {
        self.inner.engine.as_ref()
    }

    /// Serialize pipeline runs against this engine instance
    ///
    /// Held for the whole run so that one run's discovery capture never sees
    /// another run's diagnostic lines.
    pub async fn lock_run(&self) -> MutexGuard<'_, ()> {
        self.inner.run_lock.lock().await
    }

    /// Whether two handles point at the same engine instance
    pub fn same_engine(&self, other: &EngineHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("engine", &self.inner.engine)
            .finish()
    }
}

type EngineFactory = Box<dyn Fn() -> Arc<dyn MediaEngine> + Send + Sync>;

/// Lazily constructs and loads an engine exactly once.
///
/// A failed load leaves the loader empty, so the next caller constructs a
/// fresh engine and retries.
pub struct EngineLoader {
    factory: EngineFactory,
    handle: OnceCell<EngineHandle>,
}

impl EngineLoader {
    /// Create a loader around an engine constructor
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn MediaEngine> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            handle: OnceCell::new(),
        }
    }

    /// Return the ready engine, constructing and loading it on first use
    pub async fn ensure_loaded(
        &self,
        on_progress: Option<&EngineProgressFn<'_>>,
    ) -> Result<EngineHandle, EngineError> {
        let handle = self
            .handle
            .get_or_try_init(|| async {
                let engine = (self.factory)();
                debug!("Loading media engine: {:?}", engine);

                let tracer = engine.log_observers().attach(Arc::new(|line: &str| {
                    trace!("[ffmpeg] {}", line);
                }));

                if let Err(e) = engine.load(on_progress).await {
                    engine.log_observers().detach(tracer);
                    return Err(e);
                }
                debug!("Media engine ready");
                Ok::<_, EngineError>(EngineHandle::new(engine))
            })
            .await?;

        Ok(handle.clone())
    }

    /// Whether an engine has been loaded successfully
    pub fn is_ready(&self) -> bool {
        self.handle.initialized()
    }
}

impl Debug for EngineLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineLoader")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Per-run namespace inside the engine's virtual filesystem
#[derive(Debug, Clone)]
pub struct RunWorkspace {
    namespace: String,
    input_path: String,
}

impl RunWorkspace {
    /// Allocate a fresh namespace for one run over a source with `extension`
    pub fn new(extension: &str) -> Self {
        let namespace = format!("run-{}", Uuid::new_v4().simple());
        let input_path = format!("{}/input.{}", namespace, extension);
        Self {
            namespace,
            input_path,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Virtual path of the staged source
    pub fn input_path(&self) -> &str {
        &self.input_path
    }

    /// Virtual path of the output for dense subtitle index `index`
    pub fn output_path(&self, index: usize, extension: &str) -> String {
        format!("{}/output_{}.{}", self.namespace, index, extension)
    }
}
