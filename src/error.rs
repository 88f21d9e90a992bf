//! Domain-specific error types for the bootstrap engine.
//!
//! Library modules return the typed errors below; command handlers at the
//! CLI boundary convert them to [`anyhow::Error`] via the `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! BootiError
//! ├── Discovery(DiscoveryError) # steps directory and descriptor loading
//! ├── Graph(GraphError)        # unknown selections, dependency cycles
//! ├── Step(StepError)          # script failures, setup I/O
//! ├── Template(TemplateError)  # per-file sync / backup failures
//! └── Git(GitError)            # push hygiene
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the bootstrap engine.
#[derive(Error, Debug)]
pub enum BootiError {
    /// Step discovery failed.
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// The dependency graph could not be ordered.
    #[error("Dependency error: {0}")]
    Graph(#[from] GraphError),

    /// A step failed while executing.
    #[error("Step error: {0}")]
    Step(#[from] StepError),

    /// A template could not be rendered, merged, or backed up.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// A version-control operation failed.
    #[error("Git error: {0}")]
    Git(#[from] GitError),
}

/// Errors raised while locating and loading step descriptors.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The discovery root does not exist or is not a directory.
    #[error("Steps directory not found: {}", .0.display())]
    RootMissing(PathBuf),

    /// A directory could not be listed.
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        /// Directory or file being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A `step.json` did not match the descriptor schema.
    #[error("Invalid step descriptor {}: {message}", path.display())]
    InvalidDescriptor {
        /// Path of the offending `step.json`.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}

/// Errors raised while ordering steps.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A step is reachable from itself.
    #[error("Dependency cycle detected at '{step}': {}", chain.join(" -> "))]
    Cycle {
        /// The step found in progress a second time.
        step: String,
        /// Traversal path that closed the cycle, ending with `step`.
        chain: Vec<String>,
    },

    /// A step explicitly selected by the caller was never discovered.
    #[error("Unknown step '{0}'")]
    UnknownStep(String),
}

/// Errors that abort a step.
#[derive(Error, Debug)]
pub enum StepError {
    /// A `pre.sh`/`post.sh` script exited non-zero.
    #[error("Step '{step}' {script} exited with code {code}: {stderr}")]
    ScriptFailed {
        /// Step id.
        step: String,
        /// Script file name.
        script: String,
        /// Exit code (`-1` when terminated by a signal).
        code: i32,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// A directory required for writing could not be created.
    #[error("Cannot create {}: {source}", path.display())]
    Setup {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Per-file template errors. These are recoverable: the file is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The template file declared in `files[]` is absent.
    #[error("Template not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A `jq-merge` file config has no `jq_path`.
    #[error("Missing jq_path for jq-merge file {0}")]
    MissingJqPath(String),

    /// Content that must be JSON could not be parsed.
    #[error("Invalid JSON in {}: {message}", path.display())]
    InvalidJson {
        /// File being parsed.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A JSON document has no value at the configured path.
    #[error("No value at {jq_path} in {}", path.display())]
    PathNotFound {
        /// File being narrowed.
        path: PathBuf,
        /// The dot-delimited path.
        jq_path: String,
    },

    /// The local file diverged from its template and no placeholder values
    /// could be recovered.
    #[error("Structural mismatch between {} and its template", .0.display())]
    StructuralMismatch(PathBuf),

    /// Reading or writing a file failed.
    #[error("IO error on {}: {message}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Rendered I/O error.
        message: String,
    },
}

/// Errors raised by the push flow's version-control hygiene.
#[derive(Error, Debug)]
pub enum GitError {
    /// No repository encloses the given path.
    #[error("No git repository found at {}", path.display())]
    NotARepository {
        /// Path searched from.
        path: PathBuf,
        /// Underlying libgit2 error.
        source: git2::Error,
    },

    /// The repository is bare and has no working tree.
    #[error("Repository has no working directory")]
    BareRepository,

    /// The working tree has uncommitted changes.
    #[error("Working tree is not clean ({} changed path(s)): {}", .0.len(), .0.join(", "))]
    DirtyWorkingTree(Vec<String>),

    /// Any other libgit2 failure.
    #[error("{context}: {source}")]
    Operation {
        /// What was being attempted.
        context: String,
        /// Underlying libgit2 error.
        source: git2::Error,
    },
}

impl GitError {
    /// Build an [`GitError::Operation`] closure for `map_err`.
    pub fn op(context: impl Into<String>) -> impl FnOnce(git2::Error) -> Self {
        let context = context.into();
        move |source| Self::Operation { context, source }
    }
}
