// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed steps repository, a fake home
// directory, and recording collaborators so each integration test can run
// commands end to end without touching the real machine.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use booti_cli::exec::{ExecResult, Executor};
use booti_cli::logging::{Log, StepEntry, StepStatus};
use booti_cli::platform::{Os, Platform};
use booti_cli::runner::Context;
use booti_cli::steps::{StepSet, discover_steps};
use booti_cli::template::Builtins;
use booti_cli::variables::{PromptRequest, Prompter};

/// [`Log`] that keeps every message for later assertions.
#[derive(Debug, Default)]
pub struct RecordingLog {
    lines: Mutex<Vec<(&'static str, String)>>,
    steps: Mutex<Vec<StepEntry>>,
}

impl RecordingLog {
    fn push(&self, level: &'static str, msg: &str) {
        self.lines.lock().unwrap().push((level, msg.to_string()));
    }

    /// Messages logged at `level`.
    pub fn messages(&self, level: &str) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// `(step id, status)` pairs in recording order.
    pub fn statuses(&self) -> Vec<(String, StepStatus)> {
        self.steps
            .lock()
            .unwrap()
            .iter()
            .map(|e| (e.name.clone(), e.status))
            .collect()
    }
}

impl Log for RecordingLog {
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
        self.steps.lock().unwrap().push(StepEntry {
            name: name.to_string(),
            status,
            message: message.map(String::from),
        });
    }
}

/// One recorded script invocation.
#[derive(Debug, Clone)]
pub struct ScriptCall {
    /// Script file name (`pre.sh` / `post.sh`).
    pub script: String,
    /// Working directory.
    pub dir: PathBuf,
    /// Environment passed to the script.
    pub env: Vec<(String, String)>,
}

/// [`Executor`] that records calls and fails scripts of chosen steps.
#[derive(Debug, Default)]
pub struct FakeExecutor {
    calls: Mutex<Vec<ScriptCall>>,
    failing_dirs: Vec<String>,
}

impl FakeExecutor {
    /// Fail every script run in a directory ending with one of `steps`.
    pub fn failing(steps: &[&str]) -> Self {
        Self {
            calls: Mutex::default(),
            failing_dirs: steps.iter().map(ToString::to_string).collect(),
        }
    }

    /// Calls made so far.
    pub fn calls(&self) -> Vec<ScriptCall> {
        self.calls.lock().unwrap().clone()
    }

    /// `<step dir name>/<script>` for every call.
    pub fn call_labels(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| {
                let dir = c.dir.file_name().unwrap().to_string_lossy();
                format!("{dir}/{}", c.script)
            })
            .collect()
    }
}

impl Executor for FakeExecutor {
    fn run_script(
        &self,
        script: &Path,
        dir: &Path,
        env: &[(String, String)],
    ) -> anyhow::Result<ExecResult> {
        self.calls.lock().unwrap().push(ScriptCall {
            script: script.file_name().unwrap().to_string_lossy().into_owned(),
            dir: dir.to_path_buf(),
            env: env.to_vec(),
        });
        let fail = self.failing_dirs.iter().any(|s| dir.ends_with(s));
        Ok(ExecResult {
            stdout: String::new(),
            stderr: if fail { "boom".to_string() } else { String::new() },
            success: !fail,
            code: Some(i32::from(fail)),
        })
    }

    fn which(&self, _program: &str) -> bool {
        true
    }
}

/// [`Prompter`] that must never be asked.
#[derive(Debug)]
pub struct NoPrompt;

impl Prompter for NoPrompt {
    fn ask(&self, request: &PromptRequest) -> anyhow::Result<String> {
        anyhow::bail!("unexpected prompt for {}", request.name)
    }
}

/// An isolated steps repository plus a fake home directory.
pub struct TestBed {
    /// Temporary directory holding `steps/` and `home/`.
    pub root: tempfile::TempDir,
}

impl TestBed {
    /// Create empty `steps/` and `home/` directories.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(root.path().join("steps")).expect("create steps dir");
        std::fs::create_dir_all(root.path().join("home")).expect("create home dir");
        Self { root }
    }

    /// The steps directory.
    pub fn steps_dir(&self) -> PathBuf {
        self.root.path().join("steps")
    }

    /// The fake home directory.
    pub fn home(&self) -> PathBuf {
        self.root.path().join("home")
    }

    /// Start a step directory named `id`.
    pub fn step(&self, id: &str) -> StepBuilder {
        StepBuilder {
            dir: self.steps_dir().join(id),
        }
    }

    /// Write a file under the fake home.
    pub fn write_home(&self, rel: &str, content: &str) {
        let path = self.home().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    /// Read a file under the fake home.
    pub fn read_home(&self, rel: &str) -> String {
        std::fs::read_to_string(self.home().join(rel)).unwrap()
    }

    /// Discover the steps written so far.
    pub fn discover(&self) -> StepSet {
        discover_steps(&self.steps_dir()).expect("discover steps").steps
    }

    /// A context for `os` with the fake home and the given collaborators.
    pub fn context(
        &self,
        os: Os,
        log: Arc<RecordingLog>,
        executor: Arc<FakeExecutor>,
        dry_run: bool,
    ) -> Context {
        let home = self.home();
        Context {
            platform: Arc::new(Platform::new(os)),
            log,
            dry_run,
            builtins: Builtins::new(home.display().to_string(), "tester"),
            home,
            executor,
        }
    }
}

/// Fluent writer for one step directory.
pub struct StepBuilder {
    dir: PathBuf,
}

impl StepBuilder {
    /// Write `step.json`.
    pub fn descriptor(self, json: &str) -> Self {
        std::fs::create_dir_all(&self.dir).unwrap();
        std::fs::write(self.dir.join("step.json"), json).unwrap();
        self
    }

    /// Write `templates/<rel>`.
    pub fn template(self, rel: &str, content: &str) -> Self {
        let path = self.dir.join("templates").join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
        self
    }

    /// Write `post.sh` (the fake executor never runs it).
    pub fn post_script(self) -> Self {
        std::fs::create_dir_all(&self.dir).unwrap();
        std::fs::write(self.dir.join("post.sh"), "#!/bin/sh\ntrue\n").unwrap();
        self
    }

    /// Path of `templates/<rel>`.
    pub fn template_path(&self, rel: &str) -> PathBuf {
        self.dir.join("templates").join(rel)
    }
}
