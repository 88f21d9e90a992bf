//! Subcommand orchestration.
pub mod install;
pub mod list;
pub mod push;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::exec::SystemExecutor;
use crate::logging::Log;
use crate::platform::Platform;
use crate::runner::Context;
use crate::settings::Settings;
use crate::steps::validation::validate_steps;
use crate::steps::{StepSet, discover_steps};

/// Environment variable naming the steps directory.
pub const STEPS_DIR_ENV: &str = "BOOTI_STEPS_DIR";

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates platform detection, settings loading, and step discovery so
/// that each command does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Detected host platform.
    pub platform: Arc<Platform>,
    /// Loaded settings file (defaults when absent).
    pub settings: Settings,
    /// Canonical steps directory.
    pub steps_dir: PathBuf,
    /// Discovered steps in discovery order.
    pub steps: StepSet,
}

impl CommandSetup {
    /// Detect the platform, load settings, and discover steps.
    ///
    /// Descriptor and validation problems are logged as warnings; they never
    /// abort setup.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file is malformed, the steps
    /// directory cannot be determined, or it cannot be walked.
    pub fn init(global: &GlobalOpts, log: &dyn Log) -> Result<Self> {
        let platform = Arc::new(Platform::detect());

        let settings = match global.config.clone().or_else(Settings::default_path) {
            Some(path) => Settings::load(&path)?,
            None => Settings::default(),
        };
        let steps_dir = resolve_steps_dir(global, &settings)?;

        log.stage("Discovering steps");
        log.debug(&format!("steps directory: {}", steps_dir.display()));
        let discovery = discover_steps(&steps_dir)?;
        log.info(&format!(
            "found {} step(s) in {}",
            discovery.steps.len(),
            steps_dir.display()
        ));

        let mut warnings = discovery.warnings;
        warnings.extend(validate_steps(&discovery.steps));
        if !warnings.is_empty() {
            log.warn(&format!("found {} step warning(s):", warnings.len()));
            for warning in &warnings {
                log.warn(&format!("  {warning}"));
            }
        }

        Ok(Self {
            platform,
            settings,
            steps_dir,
            steps: discovery.steps,
        })
    }

    /// Build the execution context for this run.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn context(&self, log: Arc<dyn Log>, dry_run: bool) -> Result<Context> {
        Context::new(
            Arc::clone(&self.platform),
            log,
            dry_run,
            Arc::new(SystemExecutor::new()),
        )
    }
}

/// Resolve the steps directory from CLI arguments, environment, settings, or
/// auto-detection.
///
/// # Errors
///
/// Returns an error if no candidate exists.
pub fn resolve_steps_dir(global: &GlobalOpts, settings: &Settings) -> Result<PathBuf> {
    let from_env = std::env::var(STEPS_DIR_ENV).ok().filter(|v| !v.is_empty());
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let cwd = std::env::current_dir()?;
    let dir = pick_steps_dir(global, settings, from_env, exe_dir.as_deref(), &cwd)?;
    dunce::canonicalize(&dir)
        .with_context(|| format!("cannot resolve steps directory {}", dir.display()))
}

fn pick_steps_dir(
    global: &GlobalOpts,
    settings: &Settings,
    from_env: Option<String>,
    exe_dir: Option<&Path>,
    cwd: &Path,
) -> Result<PathBuf> {
    if let Some(dir) = &global.steps_dir {
        return Ok(dir.clone());
    }
    if let Some(dir) = from_env {
        return Ok(PathBuf::from(dir));
    }
    if let Some(dir) = &settings.steps_dir {
        return Ok(dir.clone());
    }

    if let Some(parent) = exe_dir {
        let candidates = [
            parent.join("../steps"),       // bin/ → repo root
            parent.join("../../../steps"), // target/release/ → repo root
        ];
        if let Some(found) = candidates.into_iter().find(|c| c.is_dir()) {
            return Ok(found);
        }
    }

    let local = cwd.join("steps");
    if local.is_dir() {
        return Ok(local);
    }

    anyhow::bail!("cannot determine steps directory. Use --steps-dir or set {STEPS_DIR_ENV}");
}
