//! Run-scoped variable values.
//!
//! Definitions are merged across the steps of a run, resolved once before
//! any step executes, and then only read: by template rendering and by the
//! environment handed to step scripts.
pub mod collect;
pub mod prompt;

use std::collections::BTreeMap;
use std::fmt;

pub use collect::{CollectOptions, collect_variables};
pub use prompt::{DialoguerPrompter, PromptRequest, Prompter};

use crate::steps::{Step, Variable};
use crate::template::Lookup;

/// Where a collected value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableSource {
    /// An explicit override (`--var`, settings file) or the environment.
    Existing,
    /// Read from an already-materialized local file.
    Extracted,
    /// The definition's default, or empty.
    Default,
    /// Typed by the user.
    Prompt,
}

impl fmt::Display for VariableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Existing => write!(f, "existing"),
            Self::Extracted => write!(f, "extracted"),
            Self::Default => write!(f, "default"),
            Self::Prompt => write!(f, "prompt"),
        }
    }
}

/// A resolved value together with its provenance and definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedVariable {
    /// Resolved value.
    pub value: String,
    /// Provenance.
    pub source: VariableSource,
    /// The winning definition.
    pub variable: Variable,
}

/// Every variable value for one run, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedVariables {
    vars: BTreeMap<String, CollectedVariable>,
}

impl CollectedVariables {
    /// Empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value. The first insert for a name wins.
    pub fn insert(&mut self, name: impl Into<String>, collected: CollectedVariable) {
        self.vars.entry(name.into()).or_insert(collected);
    }

    /// Collected entry for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CollectedVariable> {
        self.vars.get(name)
    }

    /// Value for `name`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(|c| c.value.as_str())
    }

    /// Entries sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CollectedVariable)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl Lookup for CollectedVariables {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.value(name)
    }
}

/// A logical variable after merging same-named definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSpec {
    /// Variable name.
    pub name: String,
    /// First definition seen in execution order.
    pub definition: Variable,
    /// Ids of steps declaring the variable, in execution order.
    pub used_by: Vec<String>,
}

/// Merge definitions of `steps`, which must be in execution order.
///
/// The first definition of a name wins on type, description and default;
/// later steps only extend `used_by`.
#[must_use]
pub fn merge_definitions<'a>(steps: impl IntoIterator<Item = &'a Step>) -> Vec<VariableSpec> {
    let mut specs: Vec<VariableSpec> = Vec::new();
    for step in steps {
        for (name, var) in &step.variables {
            match specs.iter_mut().find(|s| s.name == *name) {
                Some(spec) => {
                    if !spec.used_by.contains(&step.id) {
                        spec.used_by.push(step.id.clone());
                    }
                }
                None => specs.push(VariableSpec {
                    name: name.clone(),
                    definition: var.clone(),
                    used_by: vec![step.id.clone()],
                }),
            }
        }
    }
    specs
}

/// `BOOTI_<STEP_ID>__<NAME>` with the id upper-cased and every
/// non-alphanumeric character turned into `_`.
#[must_use]
pub fn scoped_name(step_id: &str, name: &str) -> String {
    let id: String = step_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("BOOTI_{id}__{name}")
}

/// Environment for one of `step`'s scripts.
///
/// Every collected value is exported under its bare name; the step's own
/// variables are also exported under their [`scoped_name`].
#[must_use]
pub fn script_env(step: &Step, vars: &CollectedVariables, dry_run: bool) -> Vec<(String, String)> {
    let mut env: Vec<(String, String)> = vars
        .iter()
        .map(|(name, c)| (name.to_string(), c.value.clone()))
        .collect();
    for (name, _) in &step.variables {
        if let Some(value) = vars.value(name) {
            env.push((scoped_name(&step.id, name), value.to_string()));
        }
    }
    env.push(("BOOTI_STEP_ID".to_string(), step.id.clone()));
    env.push(("BOOTI_STEP_DIR".to_string(), step.dir.display().to_string()));
    env.push(("BOOTI_DRY_RUN".to_string(), if dry_run { "1" } else { "0" }.to_string()));
    env
}
