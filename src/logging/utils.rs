//! Log file location, ANSI stripping and timestamps.
use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

#[allow(clippy::expect_used)]
static ANSI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b(?:\[[0-?]*[ -/]*[@-~]|[@-Z\\-_])").expect("ANSI pattern is valid")
});

/// Remove colour and cursor escapes so the log file stays plain text.
pub(super) fn strip_ansi(s: &str) -> String {
    ANSI.replace_all(s, "").into_owned()
}

/// Directory holding booti's log files, from `XDG_CACHE_HOME`, then
/// `HOME`/`USERPROFILE` plus `.cache`, then the working directory.
pub(super) fn cache_dir(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    let base = env("XDG_CACHE_HOME")
        .filter(|v| !v.is_empty())
        .map_or_else(
            || {
                env("HOME")
                    .or_else(|| env("USERPROFILE"))
                    .map_or_else(|| PathBuf::from("."), PathBuf::from)
                    .join(".cache")
            },
            PathBuf::from,
        );
    base.join("booti")
}

/// `<cache dir>/<command>.log` for the current process, creating the
/// directory. `None` when it cannot be created.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let dir = cache_dir(|name| std::env::var(name).ok());
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// Header line opening each run in the log file.
pub(super) fn run_header(command: &str, version: &str, at: DateTime<Utc>) -> String {
    let rule = "=".repeat(42);
    format!(
        "{rule}\nbooti {version} {command} {}\n{rule}\n",
        at.format("%Y-%m-%d %H:%M:%S")
    )
}

/// `HH:MM:SS` prefix for one log line.
pub(super) fn line_time(at: DateTime<Utc>) -> String {
    at.format("%H:%M:%S").to_string()
}
