//! Step records and the [`Log`] trait every component logs through.

/// One step's outcome, kept for the end-of-run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEntry {
    /// Step id.
    pub name: String,
    /// Final status of the step.
    pub status: StepStatus,
    /// Platform reason, failure message, or halt reason.
    pub message: Option<String>,
}

/// Status of a step at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Scripts and template sync completed.
    Ok,
    /// Step does not target the current platform.
    NotApplicable,
    /// Step ran in dry-run mode; no changes were applied.
    DryRun,
    /// A script exited non-zero or sync aborted.
    Failed,
    /// Step never started because an earlier step failed.
    NotRun,
}

impl StepStatus {
    /// Plain word used in the log file and the summary counts.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NotApplicable => "n/a",
            Self::DryRun => "dry-run",
            Self::Failed => "failed",
            Self::NotRun => "not run",
        }
    }

    /// Console glyph and its SGR colour code.
    #[must_use]
    pub const fn glyph(self) -> (&'static str, &'static str) {
        match self {
            Self::Ok => ("✓", "32"),
            Self::NotApplicable => ("·", "2"),
            Self::DryRun => ("~", "37"),
            Self::Failed => ("✗", "31"),
            Self::NotRun => ("-", "2"),
        }
    }
}

/// Sink for everything the runner and commands report.
///
/// Components hold an `Arc<dyn Log>` so tests can swap in a recorder.
pub trait Log: Send + Sync {
    /// A phase header such as "Collecting variables".
    fn stage(&self, msg: &str);
    /// An informational message.
    fn info(&self, msg: &str);
    /// A completed write, merge or commit.
    fn success(&self, msg: &str);
    /// Detail shown only with `--verbose` (always kept in the log file).
    fn debug(&self, msg: &str);
    /// A recoverable problem.
    fn warn(&self, msg: &str);
    /// A failure.
    fn error(&self, msg: &str);
    /// What a dry run would have done.
    fn dry_run(&self, msg: &str);
    /// Record a step outcome for the summary.
    fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>);
}
