/*!
 * Native ffmpeg engine.
 *
 * Runs the host's ffmpeg binary. The virtual filesystem is a private
 * temporary directory created at load time; every virtual path resolves
 * inside it and ffmpeg runs with it as working directory, so invocations
 * can use the same relative paths the pipeline stages files under.
 */

use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::Mutex;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;

use crate::app_config::EngineConfig;
use crate::engine::{LogObservers, MediaEngine};
use crate::errors::EngineError;
use crate::progress::EngineProgressFn;

/// ffmpeg process engine with a temp-dir virtual filesystem
#[derive(Debug)]
pub struct FfmpegEngine {
    // @field: ffmpeg binary name or path
    binary: String,

    // @field: Timeout for the version check performed by load
    load_timeout: Duration,

    // @field: Timeout for each invocation
    exec_timeout: Duration,

    // @field: Virtual filesystem root, present once loaded
    workspace: Mutex<Option<Arc<TempDir>>>,

    observers: LogObservers,
}

impl FfmpegEngine {
    /// Create an engine from configuration; nothing is touched until `load`
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            binary: config.ffmpeg_path.clone(),
            load_timeout: Duration::from_secs(config.load_timeout_secs),
            exec_timeout: Duration::from_secs(config.exec_timeout_secs),
            workspace: Mutex::new(None),
            observers: LogObservers::new(),
        }
    }

    fn root(&self) -> Result<Arc<TempDir>, EngineError> {
        self.workspace.lock().clone().ok_or(EngineError::NotLoaded)
    }

    /// Map a virtual path to a host path inside the workspace
    fn resolve(&self, virtual_path: &str) -> Result<PathBuf, EngineError> {
        let relative = Path::new(virtual_path);
        if virtual_path.trim().is_empty() {
            return Err(EngineError::InvalidPath(virtual_path.to_string()));
        }
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(EngineError::InvalidPath(virtual_path.to_string()));
        }

        Ok(self.root()?.path().join(relative))
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn load(&self, on_progress: Option<&EngineProgressFn<'_>>) -> Result<(), EngineError> {
        let report = |p: u8| {
            if let Some(callback) = on_progress {
                callback(p);
            }
        };
        report(0);

        let version_future = Command::new(&self.binary).arg("-version").output();
        let output = tokio::select! {
            result = version_future => {
                result.map_err(|e| EngineError::Unavailable(format!("{}: {}", self.binary, e)))?
            },
            _ = tokio::time::sleep(self.load_timeout) => {
                return Err(EngineError::AssetLoad(format!(
                    "{} -version did not answer within {} seconds",
                    self.binary,
                    self.load_timeout.as_secs()
                )));
            }
        };

        if !output.status.success() {
            return Err(EngineError::AssetLoad(format!(
                "{} -version exited with {}",
                self.binary, output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = stdout.lines().next().unwrap_or_default().trim().to_string();
        if !version.starts_with("ffmpeg version") {
            warn!("Unexpected ffmpeg version banner: {}", version);
        }
        debug!("Using {}", version);
        report(50);

        let workspace = tempfile::Builder::new()
            .prefix("scriptum-vfs-")
            .tempdir()
            .map_err(|e| EngineError::AssetLoad(format!("Failed to create workspace: {}", e)))?;

        *self.workspace.lock() = Some(Arc::new(workspace));
        report(100);

        Ok(())
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<(), EngineError> {
        let host_path = self.resolve(path)?;
        if let Some(parent) = host_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&host_path, data).await?;
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, EngineError> {
        let host_path = self.resolve(path)?;
        match tokio::fs::read(&host_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(EngineError::FileNotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_file(&self, path: &str) -> Result<(), EngineError> {
        let host_path = self.resolve(path)?;
        match tokio::fs::remove_file(&host_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(EngineError::FileNotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exec(&self, args: &[String]) -> Result<i32, EngineError> {
        let root = self.root()?;

        // Invocations never wait for interactive input
        let ffmpeg_future = Command::new(&self.binary)
            .arg("-nostdin")
            .args(args)
            .current_dir(root.path())
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            result = ffmpeg_future => {
                result.map_err(|e| EngineError::Exec(format!("{}: {}", self.binary, e)))?
            },
            _ = tokio::time::sleep(self.exec_timeout) => {
                return Err(EngineError::Timeout(self.exec_timeout.as_secs()));
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines() {
            self.observers.emit(line);
        }

        // Killed by a signal: no exit code
        Ok(output.status.code().unwrap_or(-1))
    }

    fn log_observers(&self) -> &LogObservers {
        &self.observers
    }
}
