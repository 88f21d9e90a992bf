//! Resolve one value per logical variable.
//!
//! Precedence, first match wins: explicit override, environment, value
//! extracted from an existing file (the answer outright only when
//! non-interactive), prompt, default, empty.
use std::collections::BTreeMap;

use anyhow::Result;

use super::prompt::{PromptRequest, Prompter};
use super::{CollectedVariable, CollectedVariables, VariableSource, VariableSpec};
use crate::logging::Log;
use crate::template::extract::FoundValue;

/// Inputs that shape collection.
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// Values that win over everything else.
    pub overrides: BTreeMap<String, String>,
    /// Never prompt.
    pub non_interactive: bool,
}

/// Resolve every variable in `specs`.
///
/// `env` looks up process environment variables; an empty value counts as
/// unset. `extracted` holds values already found on disk.
///
/// # Errors
///
/// Returns an error only if an interactive prompt fails.
pub fn collect_variables(
    specs: &[VariableSpec],
    extracted: &BTreeMap<String, FoundValue>,
    env: impl Fn(&str) -> Option<String>,
    opts: &CollectOptions,
    prompter: &dyn Prompter,
    log: &dyn Log,
) -> Result<CollectedVariables> {
    let mut collected = CollectedVariables::new();

    for spec in specs {
        let (value, source) = resolve(spec, extracted, &env, opts, prompter, log)?;
        log.debug(&format!("{} = {} ({source})", spec.name, display_value(spec, &value)));
        collected.insert(
            spec.name.clone(),
            CollectedVariable {
                value,
                source,
                variable: spec.definition.clone(),
            },
        );
    }
    Ok(collected)
}

fn resolve(
    spec: &VariableSpec,
    extracted: &BTreeMap<String, FoundValue>,
    env: &impl Fn(&str) -> Option<String>,
    opts: &CollectOptions,
    prompter: &dyn Prompter,
    log: &dyn Log,
) -> Result<(String, VariableSource)> {
    if let Some(v) = opts.overrides.get(&spec.name) {
        return Ok((v.clone(), VariableSource::Existing));
    }
    if let Some(v) = env(&spec.name).filter(|v| !v.is_empty()) {
        return Ok((v, VariableSource::Existing));
    }

    let found = extracted.get(&spec.name);
    let default = spec.definition.default.as_ref();

    if opts.non_interactive {
        if let Some(f) = found {
            return Ok((f.value.clone(), VariableSource::Extracted));
        }
        if let Some(d) = default {
            return Ok((d.clone(), VariableSource::Default));
        }
        if spec.definition.required {
            log.warn(&format!(
                "required variable {} has no value (used by {})",
                spec.name,
                spec.used_by.join(", ")
            ));
        }
        return Ok((String::new(), VariableSource::Default));
    }

    if let Some(f) = found {
        log.info(&format!(
            "{}: found existing value in {}",
            spec.name,
            f.source.display()
        ));
    }
    let request = PromptRequest {
        name: spec.name.clone(),
        kind: spec.definition.kind,
        description: spec.definition.description.clone(),
        fallback: found.map(|f| f.value.clone()).or_else(|| default.cloned()),
    };
    let answer = prompter.ask(&request)?;

    let source = if found.is_some_and(|f| f.value == answer) {
        VariableSource::Extracted
    } else {
        VariableSource::Prompt
    };
    Ok((answer, source))
}

fn display_value(spec: &VariableSpec, value: &str) -> String {
    if spec.definition.kind == crate::steps::VarType::Secret && !value.is_empty() {
        "********".to_string()
    } else {
        format!("{value:?}")
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::logging::MemoryLog;
    use crate::steps::{VarType, Variable};
    use crate::variables::prompt::MockPrompter;

    fn spec(name: &str, default: Option<&str>) -> VariableSpec {
        VariableSpec {
            name: name.to_string(),
            definition: Variable {
                default: default.map(String::from),
                ..Variable::default()
            },
            used_by: vec!["git".to_string()],
        }
    }

    fn found(value: &str) -> FoundValue {
        FoundValue {
            value: value.to_string(),
            source: PathBuf::from("/home/ada/.gitconfig"),
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn non_interactive() -> CollectOptions {
        CollectOptions {
            non_interactive: true,
            ..CollectOptions::default()
        }
    }

    fn never_prompt() -> MockPrompter {
        let mut p = MockPrompter::new();
        p.expect_ask().never();
        p
    }

    #[test]
    fn override_beats_environment_and_extracted() {
        let mut opts = non_interactive();
        opts.overrides.insert("NAME".to_string(), "cli".to_string());
        let extracted = BTreeMap::from([("NAME".to_string(), found("disk"))]);
        let log = MemoryLog::default();

        let vars = collect_variables(
            &[spec("NAME", Some("dflt"))],
            &extracted,
            |_| Some("env".to_string()),
            &opts,
            &never_prompt(),
            &log,
        )
        .unwrap();
        let v = vars.get("NAME").unwrap();
        assert_eq!(v.value, "cli");
        assert_eq!(v.source, VariableSource::Existing);
    }

    #[test]
    fn environment_beats_extracted() {
        let extracted = BTreeMap::from([("NAME".to_string(), found("disk"))]);
        let log = MemoryLog::default();
        let vars = collect_variables(
            &[spec("NAME", None)],
            &extracted,
            |n| (n == "NAME").then(|| "env".to_string()),
            &non_interactive(),
            &never_prompt(),
            &log,
        )
        .unwrap();
        assert_eq!(vars.value("NAME"), Some("env"));
        assert_eq!(vars.get("NAME").unwrap().source, VariableSource::Existing);
    }

    #[test]
    fn empty_environment_value_is_unset() {
        let log = MemoryLog::default();
        let vars = collect_variables(
            &[spec("NAME", Some("dflt"))],
            &BTreeMap::new(),
            |_| Some(String::new()),
            &non_interactive(),
            &never_prompt(),
            &log,
        )
        .unwrap();
        assert_eq!(vars.value("NAME"), Some("dflt"));
    }

    #[test]
    fn non_interactive_uses_extracted_then_default() {
        let extracted = BTreeMap::from([("A".to_string(), found("disk"))]);
        let log = MemoryLog::default();
        let vars = collect_variables(
            &[spec("A", Some("x")), spec("B", Some("dflt"))],
            &extracted,
            no_env,
            &non_interactive(),
            &never_prompt(),
            &log,
        )
        .unwrap();
        assert_eq!(vars.get("A").unwrap().source, VariableSource::Extracted);
        assert_eq!(vars.value("A"), Some("disk"));
        assert_eq!(vars.get("B").unwrap().source, VariableSource::Default);
    }

    #[test]
    fn non_interactive_required_without_value_warns() {
        let log = MemoryLog::default();
        let mut optional = spec("OPT", None);
        optional.definition.required = false;
        let vars = collect_variables(
            &[spec("REQ", None), optional],
            &BTreeMap::new(),
            no_env,
            &non_interactive(),
            &never_prompt(),
            &log,
        )
        .unwrap();
        assert_eq!(vars.value("REQ"), Some(""));
        let warnings = log.messages("warn");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("REQ"));
    }

    #[test]
    fn prompt_prefills_extracted_and_tags_unchanged_answer() {
        let extracted = BTreeMap::from([("NAME".to_string(), found("disk"))]);
        let mut prompter = MockPrompter::new();
        prompter
            .expect_ask()
            .withf(|r| r.name == "NAME" && r.fallback.as_deref() == Some("disk"))
            .times(1)
            .returning(|r| Ok(r.fallback.clone().unwrap_or_default()));
        let log = MemoryLog::default();

        let vars = collect_variables(
            &[spec("NAME", Some("dflt"))],
            &extracted,
            no_env,
            &CollectOptions::default(),
            &prompter,
            &log,
        )
        .unwrap();
        assert_eq!(vars.value("NAME"), Some("disk"));
        assert_eq!(vars.get("NAME").unwrap().source, VariableSource::Extracted);
    }

    #[test]
    fn prompt_answer_is_tagged_prompt() {
        let mut prompter = MockPrompter::new();
        prompter
            .expect_ask()
            .returning(|_| Ok("typed".to_string()));
        let log = MemoryLog::default();
        let vars = collect_variables(
            &[spec("NAME", Some("dflt"))],
            &BTreeMap::new(),
            no_env,
            &CollectOptions::default(),
            &prompter,
            &log,
        )
        .unwrap();
        assert_eq!(vars.get("NAME").unwrap().source, VariableSource::Prompt);
    }

    #[test]
    fn prompt_keeping_default_is_still_a_prompt_answer() {
        let mut prompter = MockPrompter::new();
        prompter
            .expect_ask()
            .returning(|r| Ok(r.fallback.clone().unwrap_or_default()));
        let log = MemoryLog::default();
        let vars = collect_variables(
            &[spec("NAME", Some("dflt"))],
            &BTreeMap::new(),
            no_env,
            &CollectOptions::default(),
            &prompter,
            &log,
        )
        .unwrap();
        let v = vars.get("NAME").unwrap();
        assert_eq!(v.value, "dflt");
        assert_eq!(v.source, VariableSource::Prompt);
    }

    #[test]
    fn secrets_are_masked_in_debug_output() {
        let mut s = spec("TOKEN", Some("hunter2"));
        s.definition.kind = VarType::Secret;
        let log = MemoryLog::default();
        collect_variables(
            &[s],
            &BTreeMap::new(),
            no_env,
            &non_interactive(),
            &never_prompt(),
            &log,
        )
        .unwrap();
        let debug = log.messages("debug").join("\n");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("********"));
    }
}
