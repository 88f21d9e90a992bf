//! Execution context shared by every step of a run.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::exec::Executor;
use crate::logging::Log;
use crate::platform::Platform;
use crate::template::Builtins;

/// Shared context for step execution.
pub struct Context {
    /// Detected platform information.
    pub platform: Arc<Platform>,
    /// Logger for output and step recording.
    pub log: Arc<dyn Log>,
    /// Whether to perform a dry run (preview changes without applying).
    pub dry_run: bool,
    /// Directory file targets are resolved against.
    pub home: PathBuf,
    /// Values for `${HOME}` and `${USER}`.
    pub builtins: Builtins,
    /// Script executor (for testing or real processes).
    pub executor: Arc<dyn Executor>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("platform", &self.platform)
            .field("log", &"<dyn Log>")
            .field("dry_run", &self.dry_run)
            .field("home", &self.home)
            .field("builtins", &self.builtins)
            .field("executor", &"<dyn Executor>")
            .finish()
    }
}

impl Context {
    /// Creates a context rooted at the user's home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the HOME (or USERPROFILE on Windows) environment
    /// variable is not set.
    pub fn new(
        platform: Arc<Platform>,
        log: Arc<dyn Log>,
        dry_run: bool,
        executor: Arc<dyn Executor>,
    ) -> Result<Self> {
        let home = if cfg!(target_os = "windows") {
            std::env::var("USERPROFILE")
                .or_else(|_| std::env::var("HOME"))
                .map_err(|_| {
                    anyhow::anyhow!("neither USERPROFILE nor HOME environment variable is set")
                })?
        } else {
            std::env::var("HOME")
                .map_err(|_| anyhow::anyhow!("HOME environment variable is not set"))?
        };
        let builtins = Builtins::new(home.clone(), std::env::var("USER").unwrap_or_default());

        Ok(Self {
            platform,
            log,
            dry_run,
            home: PathBuf::from(home),
            builtins,
            executor,
        })
    }

    /// Create a copy of this context with a different logger.
    #[must_use]
    pub fn with_log(&self, log: Arc<dyn Log>) -> Self {
        Self {
            platform: Arc::clone(&self.platform),
            log,
            dry_run: self.dry_run,
            home: self.home.clone(),
            builtins: self.builtins.clone(),
            executor: Arc::clone(&self.executor),
        }
    }
}
