//! `step.json` schema.
//!
//! Enum-constrained strings become Rust enums and optional fields get
//! explicit defaults, so a descriptor is validated once, when it is parsed.
use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::platform::Os;

/// Parsed contents of one `step.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StepDescriptor {
    /// Display name.
    pub name: String,
    /// One-line description.
    #[serde(default)]
    pub description: String,
    /// Ids (directory names) of steps that must run first.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Variables in declaration order.
    #[serde(default, deserialize_with = "ordered_variables")]
    pub variables: Vec<(String, Variable)>,
    /// File templates owned by the step.
    #[serde(default)]
    pub files: Vec<FileConfig>,
    /// Platforms the step targets.
    #[serde(default = "default_platforms")]
    pub platforms: Vec<Os>,
    /// Reserved; parsed but not evaluated.
    #[serde(default)]
    pub condition: Option<String>,
}

/// Kind of value a variable holds. Only affects prompting and display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    /// Free-form text.
    #[default]
    String,
    /// `true` / `false`.
    Boolean,
    /// Text that is never echoed.
    Secret,
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Boolean => write!(f, "boolean"),
            Self::Secret => write!(f, "secret"),
        }
    }
}

/// A variable definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Variable {
    /// Value kind.
    #[serde(rename = "type", default)]
    pub kind: VarType,
    /// Prompt text.
    #[serde(default)]
    pub description: String,
    /// Fallback value. Booleans and numbers are kept as their string form.
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub default: Option<String>,
    /// Advisory: an unmet required variable only produces a warning.
    #[serde(default = "default_true")]
    pub required: bool,
}

impl Default for Variable {
    fn default() -> Self {
        Self {
            kind: VarType::String,
            description: String::new(),
            default: None,
            required: true,
        }
    }
}

/// How a rendered template reaches its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Overwrite the whole file, keeping a `.bak` of the previous one.
    #[default]
    Replace,
    /// Deep-merge a JSON subtree into the target document.
    JqMerge,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace => write!(f, "replace"),
            Self::JqMerge => write!(f, "jq-merge"),
        }
    }
}

/// One file template owned by a step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileConfig {
    /// Path relative to both `templates/` and the home directory.
    pub path: String,
    /// Sync strategy.
    #[serde(default)]
    pub strategy: Strategy,
    /// Dot-delimited JSON path; required for [`Strategy::JqMerge`].
    #[serde(default)]
    pub jq_path: Option<String>,
    /// Optional human description.
    #[serde(default)]
    pub description: Option<String>,
}

fn default_platforms() -> Vec<Os> {
    vec![Os::Darwin]
}

const fn default_true() -> bool {
    true
}

/// Deserialize a JSON object into a `Vec` keeping key order.
fn ordered_variables<'de, D>(deserializer: D) -> Result<Vec<(String, Variable)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderedVisitor;

    impl<'de> Visitor<'de> for OrderedVisitor {
        type Value = Vec<(String, Variable)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of variable name to definition")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut out: Vec<(String, Variable)> = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, var)) = map.next_entry::<String, Variable>()? {
                if out.iter().any(|(n, _)| *n == name) {
                    return Err(de::Error::custom(format!("duplicate variable `{name}`")));
                }
                out.push((name, var));
            }
            Ok(out)
        }
    }

    deserializer.deserialize_map(OrderedVisitor)
}

/// Accept a string, boolean or number and keep its string form.
fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "default must be a string, boolean or number, got {other}"
        ))),
    }
}
