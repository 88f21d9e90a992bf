//! Rendered templates as resources.
use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::helpers::fs::{backup_copy, ensure_parent_dir, write_file};
use super::{Resource, TargetState};
use crate::template::json_path;

/// Suffix of the single-generation backup kept by [`ReplaceFile`].
pub const BACKUP_SUFFIX: &str = ".bak";
/// Suffix given to an unparsable document before [`JsonMergeFile`]
/// replaces it.
pub const CORRUPT_SUFFIX: &str = ".corrupt.bak";

/// Whole-file replacement.
#[derive(Debug, Clone)]
pub struct ReplaceFile {
    /// Target path.
    pub target: PathBuf,
    /// Rendered content.
    pub content: String,
}

impl ReplaceFile {
    /// Create a replace resource.
    #[must_use]
    pub const fn new(target: PathBuf, content: String) -> Self {
        Self { target, content }
    }
}

impl Resource for ReplaceFile {
    fn description(&self) -> String {
        self.target.display().to_string()
    }

    fn current_state(&self) -> Result<TargetState> {
        if self.target.is_dir() {
            return Ok(TargetState::Blocked {
                reason: "target is a directory".to_string(),
            });
        }
        if !self.target.exists() {
            return Ok(TargetState::Missing);
        }
        let current = std::fs::read(&self.target)?;
        if current == self.content.as_bytes() {
            Ok(TargetState::UpToDate)
        } else {
            Ok(TargetState::Stale {
                detail: "content differs".to_string(),
            })
        }
    }

    fn apply(&self) -> Result<()> {
        ensure_parent_dir(&self.target)?;
        backup_copy(&self.target, BACKUP_SUFFIX)?;
        write_file(&self.target, &self.content)?;
        Ok(())
    }
}

/// What a merge target currently holds.
#[derive(Debug, Clone, PartialEq)]
enum Existing {
    Missing,
    Valid(Value),
    Corrupt,
}

/// Structural JSON merge of a subtree into a target document.
#[derive(Debug, Clone)]
pub struct JsonMergeFile {
    /// Target path.
    pub target: PathBuf,
    /// Object keys leading to the merge point; empty for the root.
    pub path: Vec<String>,
    /// Rendered subtree to merge.
    pub source: Value,
}

impl JsonMergeFile {
    /// Create a merge resource for `source` at `jq_path`.
    #[must_use]
    pub fn new(target: PathBuf, jq_path: &str, source: Value) -> Self {
        Self {
            target,
            path: json_path::parse(jq_path),
            source,
        }
    }

    fn existing(&self) -> Result<Existing> {
        if !self.target.exists() {
            return Ok(Existing::Missing);
        }
        let content = std::fs::read_to_string(&self.target)?;
        Ok(serde_json::from_str(&content).map_or(Existing::Corrupt, Existing::Valid))
    }

    /// The document after merging into `base`.
    #[must_use]
    pub fn merged(&self, base: Option<Value>) -> Value {
        let mut doc = base.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        json_path::merge_at(&mut doc, &self.path, self.source.clone());
        doc
    }

    /// Whether the target exists but does not parse.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be read.
    pub fn is_corrupt(&self) -> Result<bool> {
        Ok(self.existing()? == Existing::Corrupt)
    }
}

impl Resource for JsonMergeFile {
    fn description(&self) -> String {
        self.target.display().to_string()
    }

    fn current_state(&self) -> Result<TargetState> {
        if self.target.is_dir() {
            return Ok(TargetState::Blocked {
                reason: "target is a directory".to_string(),
            });
        }
        match self.existing()? {
            Existing::Missing => Ok(TargetState::Missing),
            Existing::Corrupt => Ok(TargetState::Stale {
                detail: "unparsable JSON".to_string(),
            }),
            Existing::Valid(doc) => {
                if self.merged(Some(doc.clone())) == doc {
                    Ok(TargetState::UpToDate)
                } else {
                    Ok(TargetState::Stale {
                        detail: "merge pending".to_string(),
                    })
                }
            }
        }
    }

    fn apply(&self) -> Result<()> {
        ensure_parent_dir(&self.target)?;
        let base = match self.existing()? {
            Existing::Valid(doc) => Some(doc),
            Existing::Corrupt => {
                backup_copy(&self.target, CORRUPT_SUFFIX)?;
                None
            }
            Existing::Missing => None,
        };
        let merged = self.merged(base);
        write_file(&self.target, &pretty(&merged, &self.target)?)?;
        Ok(())
    }
}

fn pretty(value: &Value, path: &Path) -> Result<String> {
    Ok(crate::template::backup::to_pretty(value, path)?)
}
