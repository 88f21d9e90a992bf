//! Optional user settings file.
//!
//! ```toml
//! steps_dir = "~/src/bootstrap/steps"
//! non_interactive = false
//!
//! [variables]
//! GIT_USER_NAME = "Ada Lovelace"
//! ```
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Settings loaded from `config.toml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Steps directory used when neither `--steps-dir` nor
    /// `BOOTI_STEPS_DIR` is given.
    pub steps_dir: Option<PathBuf>,
    /// Never prompt; fall back to extracted values and defaults.
    pub non_interactive: bool,
    /// Variable values applied as explicit overrides (below `--var`).
    pub variables: BTreeMap<String, String>,
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let mut settings: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;
        settings.steps_dir = settings.steps_dir.map(|p| expand_tilde(&p));
        Ok(settings)
    }

    /// Default settings location: `$XDG_CONFIG_HOME/booti/config.toml`,
    /// else `~/.config/booti/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var("XDG_CONFIG_HOME")
            && !dir.is_empty()
        {
            return Some(PathBuf::from(dir).join("booti").join("config.toml"));
        }
        std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(".config/booti/config.toml"))
    }
}

/// Replace a leading `~/` with `$HOME/`.
fn expand_tilde(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var("HOME")) {
        (Ok(rest), Ok(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}
