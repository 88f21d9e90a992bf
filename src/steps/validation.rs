//! Non-fatal checks over discovered steps.
//!
//! Nothing here stops a run; the warnings are logged once at setup so a
//! broken descriptor is visible before any step executes.
use std::path::Path;

use super::{Step, StepSet, Strategy};

/// A problem found in a step descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Where the problem was found (a `step.json` path).
    pub source: String,
    /// The step or file entry that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Build a warning.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.source, self.item, self.message)
    }
}

/// Check every step in `steps`.
#[must_use]
pub fn validate_steps(steps: &StepSet) -> Vec<ValidationWarning> {
    steps
        .iter()
        .flat_map(|step| validate_step(step, steps))
        .collect()
}

/// Check one step against the rest of the set.
#[must_use]
pub fn validate_step(step: &Step, steps: &StepSet) -> Vec<ValidationWarning> {
    let source = step.dir.join(super::discovery::STEP_FILE).display().to_string();
    let mut warnings = Vec::new();

    for dep in &step.dependencies {
        if !steps.contains(dep) {
            warnings.push(ValidationWarning::new(
                &source,
                &step.id,
                format!("dependency '{dep}' was not discovered and will be ignored"),
            ));
        }
    }

    for file in &step.files {
        let item = format!("{}:{}", step.id, file.path);

        if Path::new(&file.path).is_absolute() {
            warnings.push(ValidationWarning::new(
                &source,
                &item,
                "file path must be relative to the home directory",
            ));
        }

        match (&file.strategy, file.jq_path.as_deref()) {
            (Strategy::JqMerge, None | Some("")) => {
                warnings.push(ValidationWarning::new(
                    &source,
                    &item,
                    "jq-merge requires jq_path; file will be skipped",
                ));
            }
            (_, Some(p)) if !p.is_empty() && !p.starts_with('.') => {
                warnings.push(ValidationWarning::new(
                    &source,
                    &item,
                    format!("jq_path '{p}' should start with '.'"),
                ));
            }
            _ => {}
        }

        match step.template_path(file) {
            Some(t) if t.is_file() => {}
            _ => warnings.push(ValidationWarning::new(
                &source,
                &item,
                "template file not found under templates/",
            )),
        }
    }

    warnings
}
