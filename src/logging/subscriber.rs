//! Where log events go: a styled console and a plain per-command log file.
//!
//! Every [`Logger`](super::Logger) method maps to a tracing target below.
//! Both sinks classify events into a [`Kind`] and render it their own way.
use std::fs;
use std::io::Write as _;
use std::sync::Mutex;

use tracing::Level;

use super::utils::{line_time, log_file_path, run_header, strip_ansi};

/// Target used for stage headers.
pub(super) const STAGE_TARGET: &str = "booti::stage";
/// Target used for completed actions.
pub(super) const SUCCESS_TARGET: &str = "booti::success";
/// Target used for dry-run reporting.
pub(super) const DRY_RUN_TARGET: &str = "booti::dry_run";
/// Target used for recorded step outcomes.
pub(super) const STEP_TARGET: &str = "booti::step";

/// Presentation class of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Stage,
    Success,
    DryRun,
    Step,
    Error,
    Warn,
    Info,
    Debug,
}

impl Kind {
    fn of(level: Level, target: &str) -> Self {
        match (level, target) {
            (Level::ERROR, _) => Self::Error,
            (Level::WARN, _) => Self::Warn,
            (Level::INFO, STAGE_TARGET) => Self::Stage,
            (Level::INFO, SUCCESS_TARGET) => Self::Success,
            (Level::INFO, DRY_RUN_TARGET) => Self::DryRun,
            (Level::INFO, STEP_TARGET) => Self::Step,
            (Level::INFO, _) => Self::Info,
            _ => Self::Debug,
        }
    }

    /// Console rendering. Step records are left to the summary.
    fn console(self, msg: &str) -> Option<String> {
        let line = match self {
            Self::Stage => format!("\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
            Self::Success => format!("  \x1b[32m✓\x1b[0m {msg}"),
            Self::DryRun => format!("  \x1b[33m[dry-run]\x1b[0m {msg}"),
            Self::Error => format!("\x1b[31merror:\x1b[0m {msg}"),
            Self::Warn => format!("\x1b[33mwarning:\x1b[0m {msg}"),
            Self::Info => format!("  {msg}"),
            Self::Debug => format!("  \x1b[2m{msg}\x1b[0m"),
            Self::Step => return None,
        };
        Some(line)
    }

    /// Log file rendering, without the timestamp.
    fn file(self, msg: &str) -> String {
        let msg = strip_ansi(msg);
        match self {
            Self::Stage => format!("==> {msg}"),
            Self::Success => format!("    ok       {msg}"),
            Self::DryRun => format!("    dry-run  {msg}"),
            Self::Step => format!("    step     {msg}"),
            Self::Error => format!("    error    {msg}"),
            Self::Warn => format!("    warn     {msg}"),
            Self::Info => format!("             {msg}"),
            Self::Debug => format!("    debug    {msg}"),
        }
    }
}

/// Pulls the `message` field out of an event.
#[derive(Default)]
struct Message(String);

impl tracing::field::Visit for Message {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.0 = value.to_string();
        }
    }
}

fn classify(event: &tracing::Event<'_>) -> (Kind, String) {
    let metadata = event.metadata();
    let mut message = Message::default();
    event.record(&mut message);
    (Kind::of(*metadata.level(), metadata.target()), message.0)
}

/// Appends every event to `<cache>/booti/<command>.log`, truncated at the
/// start of each run.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Open the log for `command` and write the run header. `None` when the
    /// file cannot be created.
    pub(super) fn new(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        let version =
            option_env!("BOOTI_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        fs::write(&path, run_header(command, version, chrono::Utc::now())).ok()?;
        let file = fs::OpenOptions::new().append(true).open(&path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let (kind, msg) = classify(event);
        let line = format!("[{}] {}", line_time(chrono::Utc::now()), kind.file(&msg));
        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "{line}").ok();
        }
    }
}

/// Console [`FormatEvent`](tracing_subscriber::fmt::FormatEvent) for booti.
struct ConsoleFormat;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormat
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let (kind, msg) = classify(event);
        kind.console(&msg)
            .map_or(Ok(()), |line| writeln!(writer, "{line}"))
    }
}

/// Install the global subscriber for one `command` run.
///
/// Warnings and errors go to stderr, everything else to stdout; `debug` only
/// reaches the console with `verbose`. The log file always records `debug`
/// and above. Call once, before anything logs.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let make_writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));

    let console = fmt::layer()
        .event_format(ConsoleFormat)
        .with_writer(make_writer)
        .with_filter(console_level);
    let file = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry().with(console).with(file).init();
}
