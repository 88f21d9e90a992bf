//! Script execution seam.
//!
//! The engine treats `pre.sh`/`post.sh` as opaque: run a script with an
//! environment, get back exit code and captured output. [`Executor`] is the
//! injectable boundary; [`SystemExecutor`] is the real implementation.
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Runs step scripts.
///
/// A non-zero exit is *not* an error at this layer; callers inspect
/// [`ExecResult::success`]. `Err` means the process could not be started.
#[cfg_attr(test, mockall::automock)]
pub trait Executor: Send + Sync {
    /// Run `script` with the shell, in `dir`, with `env` added to the
    /// inherited environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell cannot be spawned.
    fn run_script(&self, script: &Path, dir: &Path, env: &[(String, String)])
    -> Result<ExecResult>;

    /// Check if a program is available on `PATH`.
    fn which(&self, program: &str) -> bool;
}

/// [`Executor`] backed by real processes.
#[derive(Debug, Clone)]
pub struct SystemExecutor {
    shell: PathBuf,
}

impl Default for SystemExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemExecutor {
    /// Locate `bash` on `PATH`, falling back to `sh`.
    #[must_use]
    pub fn new() -> Self {
        let shell = which::which("bash").unwrap_or_else(|_| PathBuf::from("sh"));
        Self { shell }
    }

    /// Shell used to interpret scripts.
    #[must_use]
    pub fn shell(&self) -> &Path {
        &self.shell
    }
}

impl Executor for SystemExecutor {
    fn run_script(
        &self,
        script: &Path,
        dir: &Path,
        env: &[(String, String)],
    ) -> Result<ExecResult> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg(script).current_dir(dir);
        for (k, v) in env {
            cmd.env(k, v);
        }
        let output = cmd.output().with_context(|| {
            format!(
                "failed to execute {} {}",
                self.shell.display(),
                script.display()
            )
        })?;
        Ok(ExecResult::from(output))
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}
