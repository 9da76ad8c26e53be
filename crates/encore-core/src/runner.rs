//! Script execution: write to a scratch file, run the interpreter, report
//! the outcome.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::RunnerConfig;
use crate::error::Result;

/// Result of one script execution. `success` mirrors the process exit
/// status; a timeout, a missing interpreter, or any other launch failure is
/// a failed outcome, not an error — the caller always gets something it can
/// record in the corpus.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stderr: String,
    /// Where the scratch script was written. The file is already removed by
    /// the time the outcome is returned.
    pub script_path: PathBuf,
}

impl RunOutcome {
    fn launch_failed(stderr: String, script_path: PathBuf) -> Self {
        Self {
            success: false,
            exit_code: None,
            stderr,
            script_path,
        }
    }

    fn timed_out(secs: u64, script_path: PathBuf) -> Self {
        Self::launch_failed(
            format!("script exceeded the {secs}s execution timeout and was killed"),
            script_path,
        )
    }
}

/// Runs generated scripts through the configured interpreter.
pub struct CodeRunner {
    interpreter: String,
    timeout: Duration,
}

impl CodeRunner {
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Write `code` to a scratch file and execute it. The file is removed on
    /// every exit path (RAII). Only scratch-file I/O can error here; an
    /// interpreter missing from $PATH, a failed spawn, a non-zero exit, and
    /// a timeout are all normal failed outcomes.
    pub async fn run(&self, code: &str) -> Result<RunOutcome> {
        let mut script = tempfile::Builder::new()
            .prefix("encore-")
            .suffix(script_suffix(&self.interpreter))
            .tempfile()?;
        script.write_all(code.as_bytes())?;
        script.flush()?;
        let script_path = script.path().to_path_buf();

        let interpreter = match which::which(&self.interpreter) {
            Ok(p) => p,
            Err(_) => {
                tracing::warn!(interpreter = %self.interpreter, "interpreter not found");
                return Ok(RunOutcome::launch_failed(
                    format!("interpreter '{}' not found on $PATH", self.interpreter),
                    script_path,
                ));
            }
        };

        tracing::info!(
            interpreter = %self.interpreter,
            path = %script_path.display(),
            "executing script"
        );

        let child = tokio::process::Command::new(interpreter)
            .arg(script.path())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::warn!(interpreter = %self.interpreter, error = %e, "failed to launch interpreter");
                return Ok(RunOutcome::launch_failed(
                    format!("failed to launch '{}': {e}", self.interpreter),
                    script_path,
                ));
            }
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "script timed out");
                return Ok(RunOutcome::timed_out(self.timeout.as_secs(), script_path));
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let outcome = RunOutcome {
            success: output.status.success(),
            exit_code: output.status.code(),
            stderr,
            script_path,
        };

        if outcome.success {
            tracing::info!("script succeeded");
        } else {
            tracing::warn!(exit_code = ?outcome.exit_code, "script failed");
        }
        Ok(outcome)
    }
}

fn script_suffix(interpreter: &str) -> &'static str {
    match interpreter {
        "osascript" => ".applescript",
        "python3" | "python" => ".py",
        _ => ".script",
    }
}
