//! Target files a step writes into the home directory.
//!
//! A [`Resource`] is one rendered template paired with its destination. The
//! sync loop asks for its [`TargetState`] first and only writes when the
//! target is missing or stale.
pub mod helpers;
pub mod template_file;

use anyhow::Result;

pub use template_file::{JsonMergeFile, ReplaceFile};

/// What the destination holds compared with the rendered template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetState {
    /// Nothing at the destination yet.
    Missing,
    /// Destination already holds the rendered result.
    UpToDate,
    /// Destination exists with other content.
    Stale {
        /// Why it differs, for dry-run output.
        detail: String,
    },
    /// Destination cannot be written at all.
    Blocked {
        /// Why, e.g. a directory sits at the target path.
        reason: String,
    },
}

/// A rendered template bound to its destination.
pub trait Resource {
    /// The destination path, for log lines.
    fn description(&self) -> String;

    /// Compare the destination with the rendered result.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination exists but cannot be read.
    fn current_state(&self) -> Result<TargetState>;

    /// Write the rendered result to the destination.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Setup`](crate::error::StepError::Setup) when the
    /// parent directory cannot be created, and a plain error when the file
    /// itself cannot be written.
    fn apply(&self) -> Result<()>;
}
