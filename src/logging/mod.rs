//! Logging infrastructure for structured console and file output.

mod logger;
mod subscriber;
mod types;
mod utils;

pub use logger::Logger;
pub use subscriber::init_subscriber;
pub use types::{Log, StepEntry, StepStatus};

/// In-memory [`Log`] for unit tests that assert on emitted messages.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryLog {
    lines: std::sync::Mutex<Vec<(&'static str, String)>>,
    steps: std::sync::Mutex<Vec<StepEntry>>,
}

#[cfg(test)]
impl MemoryLog {
    fn push(&self, level: &'static str, msg: &str) {
        if let Ok(mut g) = self.lines.lock() {
            g.push((level, msg.to_string()));
        }
    }

    /// Messages logged at `level` (`"warn"`, `"dry_run"`, ...).
    pub(crate) fn messages(&self, level: &str) -> Vec<String> {
        self.lines.lock().map_or_else(
            |_| vec![],
            |g| {
                g.iter()
                    .filter(|(l, _)| *l == level)
                    .map(|(_, m)| m.clone())
                    .collect()
            },
        )
    }

    /// Recorded step entries.
    pub(crate) fn steps(&self) -> Vec<StepEntry> {
        self.steps.lock().map_or_else(|_| vec![], |g| g.clone())
    }
}

#[cfg(test)]
impl Log for MemoryLog {
    fn stage(&self, msg: &str) {
        self.push("stage", msg);
    }
    fn info(&self, msg: &str) {
        self.push("info", msg);
    }
    fn success(&self, msg: &str) {
        self.push("success", msg);
    }
    fn debug(&self, msg: &str) {
        self.push("debug", msg);
    }
    fn warn(&self, msg: &str) {
        self.push("warn", msg);
    }
    fn error(&self, msg: &str) {
        self.push("error", msg);
    }
    fn dry_run(&self, msg: &str) {
        self.push("dry_run", msg);
    }
    fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>) {
        if let Ok(mut g) = self.steps.lock() {
            g.push(StepEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }
}
