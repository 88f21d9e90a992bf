//! The process-wide [`Log`] implementation.
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET, STEP_TARGET, SUCCESS_TARGET};
use super::types::{Log, StepEntry, StepStatus};
use super::utils::log_file_path;

/// Implement the message methods of [`Log`] by delegating to inherent
/// methods of the same name.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Sends messages to [`tracing`] and keeps step outcomes for the summary
/// printed at the end of `install`.
#[derive(Debug)]
pub struct Logger {
    steps: Mutex<Vec<StepEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Logger for one `command` run. The file itself is written by the
    /// subscriber; only its path is kept here for the summary footer.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            steps: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header.
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a completed action.
    pub fn success(&self, msg: &str) {
        tracing::info!(target: SUCCESS_TARGET, "{msg}");
    }

    /// Log a debug message.
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log what a dry run would have done.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Keep a step outcome for the summary and note it in the log file.
    pub fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>) {
        let entry = StepEntry {
            name: name.to_string(),
            status,
            message: message.map(String::from),
        };
        tracing::info!(target: STEP_TARGET, "{}", step_line(&entry));
        if let Ok(mut guard) = self.steps.lock() {
            guard.push(entry);
        }
    }

    /// Recorded step outcomes in execution order.
    #[must_use]
    pub fn step_entries(&self) -> Vec<StepEntry> {
        self.steps.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Number of steps recorded as failed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.step_entries()
            .iter()
            .filter(|e| e.status == StepStatus::Failed)
            .count()
    }

    /// Print one line per recorded step, the totals, and the log file path.
    pub fn print_summary(&self) {
        let entries = self.step_entries();
        if entries.is_empty() {
            return;
        }
        self.stage("Summary");
        for entry in &entries {
            let (glyph, colour) = entry.status.glyph();
            let line = step_line(entry);
            self.info(&format!("\x1b[{colour}m{glyph} {line}\x1b[0m"));
        }
        self.info(&totals_line(&entries));
        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

/// `<id>: <status>` plus the reason in parentheses, if any.
fn step_line(entry: &StepEntry) -> String {
    let reason = entry
        .message
        .as_deref()
        .map_or_else(String::new, |m| format!(" ({m})"));
    format!("{}: {}{reason}", entry.name, entry.status.label())
}

/// `"<n> steps: <count> <label>, ..."`, listing only statuses that occurred.
fn totals_line(entries: &[StepEntry]) -> String {
    const ORDER: [StepStatus; 5] = [
        StepStatus::Ok,
        StepStatus::NotApplicable,
        StepStatus::DryRun,
        StepStatus::Failed,
        StepStatus::NotRun,
    ];
    let parts: Vec<String> = ORDER
        .iter()
        .filter_map(|status| {
            let n = entries.iter().filter(|e| e.status == *status).count();
            (n > 0).then(|| format!("{n} {}", status.label()))
        })
        .collect();
    format!("{} steps: {}", entries.len(), parts.join(", "))
}

impl Log for Logger {
    forward_log_methods!(stage, info, success, debug, warn, error, dry_run);

    fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>) {
        self.record_step(name, status, message);
    }
}
