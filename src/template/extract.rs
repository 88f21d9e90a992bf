//! Recover variable values from files that were already materialized.
//!
//! Text extraction turns the template into an anchored regex: literal spans
//! are escaped, each placeholder becomes a lazy capture. The local file has
//! to match as a whole; a file whose surrounding text has drifted yields
//! nothing rather than a partial answer.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::Value;

use super::{Builtins, find_placeholders, json_path};
use crate::steps::{FileConfig, StepSet, Strategy};

/// Values recovered from one file, keyed by variable name.
pub type Extracted = BTreeMap<String, String>;

/// Compile `template` into an anchored pattern with one capture group per
/// placeholder. Returns the pattern and the placeholder names in group
/// order, or `None` if the template has no placeholders.
#[must_use]
pub fn build_extraction_regex(template: &str) -> Option<(Regex, Vec<String>)> {
    let mut pattern = String::from(r"(?s)\A");
    let mut names = Vec::new();
    let mut cursor = 0;

    for p in find_placeholders(template) {
        pattern.push_str(&regex::escape(template.get(cursor..p.start)?));
        pattern.push_str("(.+?)");
        names.push(p.name.to_string());
        cursor = p.end;
    }
    if names.is_empty() {
        return None;
    }
    pattern.push_str(&regex::escape(template.get(cursor..)?));
    pattern.push_str(r"\z");

    Regex::new(&pattern).ok().map(|re| (re, names))
}

/// Match `local` against `template` (with `HOME`/`USER` already filled in)
/// and return the captured values. A repeated placeholder keeps its first
/// capture.
#[must_use]
pub fn extract_from_text(template: &str, local: &str, builtins: &Builtins) -> Extracted {
    let prepared = builtins.apply(template);
    let Some((re, names)) = build_extraction_regex(&prepared) else {
        return Extracted::new();
    };
    let Some(caps) = re.captures(local) else {
        return Extracted::new();
    };

    let mut out = Extracted::new();
    for (i, name) in names.into_iter().enumerate() {
        if let Some(m) = caps.get(i + 1) {
            out.entry(name).or_insert_with(|| m.as_str().to_string());
        }
    }
    out
}

/// Narrow both documents to `jq_path`, then read the local value at the
/// key path of every placeholder in the template subtree.
///
/// Only objects are walked. A string that is exactly one placeholder takes
/// the local string; a string mixing text and placeholders is matched with
/// [`extract_from_text`]. Missing keys and type mismatches are skipped.
#[must_use]
pub fn extract_from_json(
    template: &Value,
    local: &Value,
    jq_path: &str,
    builtins: &Builtins,
) -> Extracted {
    let path = json_path::parse(jq_path);
    let mut out = Extracted::new();
    if let (Some(t), Some(l)) = (json_path::get(template, &path), json_path::get(local, &path)) {
        walk_json(t, l, builtins, &mut out);
    }
    out
}

fn walk_json(template: &Value, local: &Value, builtins: &Builtins, out: &mut Extracted) {
    match (template, local) {
        (Value::Object(t), Value::Object(l)) => {
            for (key, t_value) in t {
                if let Some(l_value) = l.get(key) {
                    walk_json(t_value, l_value, builtins, out);
                }
            }
        }
        (Value::String(t), Value::String(l)) => {
            let prepared = builtins.apply(t);
            let mut found = find_placeholders(&prepared);
            match (found.next(), found.next()) {
                (Some(p), None) if p.start == 0 && p.end == prepared.len() => {
                    if !l.is_empty() {
                        out.entry(p.name.to_string()).or_insert_with(|| l.clone());
                    }
                }
                (Some(_), _) => {
                    for (name, value) in extract_from_text(&prepared, l, builtins) {
                        out.entry(name).or_insert(value);
                    }
                }
                (None, _) => {}
            }
        }
        _ => {}
    }
}

/// Extract values from one local file using its template and strategy.
///
/// Unreadable or unparsable files yield nothing.
#[must_use]
pub fn extract_from_file(
    file: &FileConfig,
    template_path: &Path,
    local_path: &Path,
    builtins: &Builtins,
) -> Extracted {
    let (Ok(template), Ok(local)) = (
        std::fs::read_to_string(template_path),
        std::fs::read_to_string(local_path),
    ) else {
        return Extracted::new();
    };

    match (file.strategy, file.jq_path.as_deref()) {
        (Strategy::JqMerge, Some(jq_path)) => {
            let (Ok(t), Ok(l)) = (
                serde_json::from_str::<Value>(&template),
                serde_json::from_str::<Value>(&local),
            ) else {
                return Extracted::new();
            };
            extract_from_json(&t, &l, jq_path, builtins)
        }
        (Strategy::JqMerge, None) => Extracted::new(),
        (Strategy::Replace, _) => extract_from_text(&template, &local, builtins),
    }
}

/// A value found on disk, with the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundValue {
    /// The extracted value, never empty.
    pub value: String,
    /// Local file the value was read from.
    pub source: PathBuf,
}

/// Look for existing values of `names` across every step's files.
///
/// Candidates are tried in discovery order; for each variable the first
/// existing file yielding a non-empty value wins. Files whose template does
/// not mention any still-missing name are not read.
#[must_use]
pub fn find_existing_values(
    steps: &StepSet,
    names: &[String],
    home: &Path,
    builtins: &Builtins,
) -> BTreeMap<String, FoundValue> {
    let mut found: BTreeMap<String, FoundValue> = BTreeMap::new();

    for step in steps.iter() {
        for file in &step.files {
            if names.iter().all(|n| found.contains_key(n)) {
                return found;
            }
            let Some(template_path) = step.template_path(file) else {
                continue;
            };
            let local_path = home.join(&file.path);
            if !local_path.is_file() {
                continue;
            }
            let Ok(template) = std::fs::read_to_string(&template_path) else {
                continue;
            };
            let wanted = find_placeholders(&template)
                .any(|p| names.iter().any(|n| n == p.name) && !found.contains_key(p.name));
            if !wanted {
                continue;
            }

            for (name, value) in extract_from_file(file, &template_path, &local_path, builtins) {
                if value.is_empty() || !names.contains(&name) || found.contains_key(&name) {
                    continue;
                }
                found.insert(
                    name,
                    FoundValue {
                        value,
                        source: local_path.clone(),
                    },
                );
            }
        }
    }
    found
}
