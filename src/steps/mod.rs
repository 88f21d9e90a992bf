//! Step records: descriptor schema, discovery, and validation.
pub mod descriptor;
pub mod discovery;
pub mod validation;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use descriptor::{FileConfig, StepDescriptor, Strategy, VarType, Variable};
pub use discovery::{Discovery, discover_steps};

use crate::platform::Os;

/// A discovered step. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Name of the containing directory; unique per discovery root.
    pub id: String,
    /// Step directory.
    pub dir: PathBuf,
    /// Display name.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// Ids of steps that must run first.
    pub dependencies: Vec<String>,
    /// Variables in declaration order.
    pub variables: Vec<(String, Variable)>,
    /// File templates in declaration order.
    pub files: Vec<FileConfig>,
    /// Targeted platforms.
    pub platforms: Vec<Os>,
    /// Reserved.
    pub condition: Option<String>,
    /// `pre.sh`, when present.
    pub pre_script: Option<PathBuf>,
    /// `post.sh`, when present.
    pub post_script: Option<PathBuf>,
    /// `templates/`, when present.
    pub templates_dir: Option<PathBuf>,
}

impl Step {
    /// Build a step from its directory and parsed descriptor, probing for
    /// the optional scripts and template directory.
    #[must_use]
    pub fn from_descriptor(dir: &Path, descriptor: StepDescriptor) -> Self {
        let id = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let optional_file = |name: &str| {
            let p = dir.join(name);
            p.is_file().then_some(p)
        };
        let templates = dir.join("templates");
        Self {
            id,
            dir: dir.to_path_buf(),
            name: descriptor.name,
            description: descriptor.description,
            dependencies: descriptor.dependencies,
            variables: descriptor.variables,
            files: descriptor.files,
            platforms: descriptor.platforms,
            condition: descriptor.condition,
            pre_script: optional_file("pre.sh"),
            post_script: optional_file("post.sh"),
            templates_dir: templates.is_dir().then_some(templates),
        }
    }

    /// Where the template for `file` lives, if the step has a template tree.
    #[must_use]
    pub fn template_path(&self, file: &FileConfig) -> Option<PathBuf> {
        self.templates_dir.as_ref().map(|t| t.join(&file.path))
    }

    /// Look up one of this step's variable definitions.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables
            .iter()
            .find_map(|(n, v)| (n == name).then_some(v))
    }
}

/// Discovered steps in discovery order, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct StepSet {
    steps: Vec<Step>,
    index: HashMap<String, usize>,
}

impl StepSet {
    /// Build a set from steps in discovery order.
    ///
    /// Ids must already be unique; a repeated id replaces the earlier entry
    /// in the index but both stay in iteration order.
    #[must_use]
    pub fn new(steps: Vec<Step>) -> Self {
        let index = steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        Self { steps, index }
    }

    /// Step by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Step> {
        self.index.get(id).and_then(|&i| self.steps.get(i))
    }

    /// Whether a step with `id` was discovered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Steps in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    /// Step ids in discovery order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.id.as_str())
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no steps were discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
pub mod test_helpers {
    //! Builders for in-memory steps used across unit tests.
    use super::*;

    /// A Darwin+Linux step with no files, variables or scripts.
    #[must_use]
    pub fn step(id: &str, deps: &[&str]) -> Step {
        Step {
            id: id.to_string(),
            dir: PathBuf::from("/steps").join(id),
            name: id.to_string(),
            description: String::new(),
            dependencies: deps.iter().map(ToString::to_string).collect(),
            variables: Vec::new(),
            files: Vec::new(),
            platforms: vec![Os::Darwin, Os::Linux],
            condition: None,
            pre_script: None,
            post_script: None,
            templates_dir: None,
        }
    }

    /// Add a variable definition to `step`.
    #[must_use]
    pub fn with_var(mut step: Step, name: &str, var: Variable) -> Step {
        step.variables.push((name.to_string(), var));
        step
    }
}
