//! Controller-side capture lifecycle: spawn the worker, request shutdown,
//! read the session log back.
//!
//! The worker is a separate process because the system input hook must run
//! its own event loop. The two processes share exactly two channels: the
//! session's JSONL event store (worker writes, controller reads after exit)
//! and the worker's stdin pipe, whose closure is the shutdown request.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::CaptureConfig;
use crate::enrich::tag_followup_keys;
use crate::error::{EncoreError, Result};
use crate::model::CapturedEvent;
use crate::store::EventStore;

/// Result of a start request. Starting while already capturing is a
/// reported no-op, never an error.
#[derive(Debug)]
pub enum StartOutcome {
    Started { pid: Option<u32>, store_path: PathBuf },
    AlreadyCapturing,
}

/// Result of a stop request. `clean_exit` is false when the worker had to
/// be killed after the shutdown timeout.
#[derive(Debug)]
pub enum StopOutcome {
    Stopped {
        events: Vec<CapturedEvent>,
        store_path: PathBuf,
        clean_exit: bool,
    },
    NotCapturing,
}

struct ActiveCapture {
    child: tokio::process::Child,
    stdin: Option<tokio::process::ChildStdin>,
    store: EventStore,
}

/// Two-state capture session: idle or capturing.
pub struct CaptureSession {
    config: CaptureConfig,
    session_dir: PathBuf,
    active: Option<ActiveCapture>,
}

impl CaptureSession {
    pub fn new(config: CaptureConfig, session_dir: PathBuf) -> Self {
        Self {
            config,
            session_dir,
            active: None,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.active.is_some()
    }

    /// Spawn the worker against a fresh session store. The worker holds the
    /// read end of a stdin pipe; closing our write end later is the
    /// shutdown request.
    pub fn start(&mut self) -> Result<StartOutcome> {
        if self.active.is_some() {
            return Ok(StartOutcome::AlreadyCapturing);
        }

        let worker = self.resolve_worker_binary()?;
        std::fs::create_dir_all(&self.session_dir)?;
        let store_path = self
            .session_dir
            .join(format!("session-{}.jsonl", uuid::Uuid::new_v4()));

        let mut child = tokio::process::Command::new(&worker)
            .arg(&store_path)
            .stdin(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| {
                EncoreError::Capture(format!(
                    "failed to spawn capture worker '{}': {e}",
                    worker.display()
                ))
            })?;
        let stdin = child.stdin.take();
        let pid = child.id();

        tracing::info!(?pid, store = %store_path.display(), "capture worker started");

        self.active = Some(ActiveCapture {
            child,
            stdin,
            store: EventStore::new(&store_path),
        });
        Ok(StartOutcome::Started { pid, store_path })
    }

    /// Request shutdown and collect the session's events.
    ///
    /// Protocol: close the worker's stdin (the terminate request), wait up
    /// to `shutdown_timeout_ms` for it to exit on EOF, then escalate to a
    /// hard kill. A store that cannot be read back yields an empty event
    /// log with a warning, not a failed stop.
    pub async fn stop(&mut self) -> Result<StopOutcome> {
        let Some(mut active) = self.active.take() else {
            return Ok(StopOutcome::NotCapturing);
        };

        // Terminate request: drop our end of the pipe, worker sees EOF.
        drop(active.stdin.take());

        let timeout = Duration::from_millis(self.config.shutdown_timeout_ms);
        let clean_exit = match tokio::time::timeout(timeout, active.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!(?status, "capture worker exited");
                status.success()
            }
            Ok(Err(e)) => {
                tracing::warn!("failed to wait on capture worker: {e}");
                false
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.shutdown_timeout_ms,
                    "capture worker ignored shutdown request, killing"
                );
                // Stop must still return to idle even if the kill fails
                // (e.g. the worker exited in the meantime).
                if let Err(e) = active.child.kill().await {
                    tracing::warn!("failed to kill capture worker: {e}");
                }
                false
            }
        };

        let mut events = match active.store.load_all() {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!("failed to read session events: {e}");
                Vec::new()
            }
        };

        if self.config.followup_tagging {
            tag_followup_keys(&mut events);
        }

        tracing::info!(count = events.len(), clean_exit, "capture stopped");
        Ok(StopOutcome::Stopped {
            events,
            store_path: active.store.path().to_path_buf(),
            clean_exit,
        })
    }

    fn resolve_worker_binary(&self) -> Result<PathBuf> {
        if let Some(ref configured) = self.config.worker_binary {
            return Ok(PathBuf::from(configured));
        }

        // Sibling of the controller binary, then $PATH.
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let sibling = dir.join("encore-capture");
                if sibling.exists() {
                    return Ok(sibling);
                }
            }
        }

        which::which("encore-capture").map_err(|_| {
            EncoreError::Capture(
                "capture worker binary 'encore-capture' not found \
                 (set capture.worker_binary)"
                    .into(),
            )
        })
    }
}
