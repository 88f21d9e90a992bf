//! Reverse sync: rebuild templates from edited local files.
//!
//! The values a local file currently holds are learned by extraction against
//! the existing template, then written back into the local content as
//! placeholders. When no values can be learned and the file has drifted, the
//! template is left alone and the file is reported as a structural mismatch.
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::extract::{extract_from_json, extract_from_text};
use super::{Builtins, Restore, is_builtin, json_path, placeholder_names, sanitize};
use crate::error::TemplateError;
use crate::steps::{FileConfig, Step, StepSet, Strategy};

/// Outcome of backing up one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBackup {
    /// Owning step id.
    pub step_id: String,
    /// `files[].path` (relative to home and `templates/`).
    pub path: String,
    /// Template file that was (or would be) rewritten.
    pub template: PathBuf,
    /// Whether the template content changed.
    pub changed: bool,
    /// Number of concrete values turned back into placeholders.
    pub replacements: usize,
    /// Why the file could not be backed up.
    pub error: Option<String>,
}

impl FileBackup {
    fn new(step: &Step, file: &FileConfig, template: PathBuf) -> Self {
        Self {
            step_id: step.id.clone(),
            path: file.path.clone(),
            template,
            changed: false,
            replacements: 0,
            error: None,
        }
    }

    /// Neither changed nor failed.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        !self.changed && self.error.is_none()
    }
}

/// Run-level totals for a backup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupSummary {
    /// Templates rewritten.
    pub files_updated: usize,
    /// Files with no change or no local copy.
    pub files_skipped: usize,
    /// `"<step>/<path>: <reason>"` for every failed file.
    pub errors: Vec<String>,
}

impl BackupSummary {
    /// Tally a list of per-file results.
    #[must_use]
    pub fn from_results(results: &[FileBackup]) -> Self {
        let mut summary = Self::default();
        for r in results {
            if let Some(err) = &r.error {
                summary.errors.push(format!("{}/{}: {err}", r.step_id, r.path));
            } else if r.changed {
                summary.files_updated += 1;
            } else {
                summary.files_skipped += 1;
            }
        }
        summary
    }
}

/// What a rebuilt template looks like before it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rebuilt {
    /// New template content.
    pub content: String,
    /// Whether it differs from the existing template.
    pub changed: bool,
    /// Values turned back into placeholders.
    pub replacements: usize,
}

/// Why a template was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// No values were recovered and the local file has drifted.
    StructuralMismatch,
    /// The template has no value at `jq_path`.
    PathNotFound,
}

/// Rebuild a text template from `local`.
///
/// # Errors
///
/// Returns [`Refusal::StructuralMismatch`] when no values could be
/// recovered and `local` differs from the template with `HOME`/`USER`
/// filled in. This includes templates without any placeholders.
pub fn rebuild_text(template: &str, local: &str, builtins: &Builtins) -> Result<Rebuilt, Refusal> {
    let values = extract_from_text(template, local, builtins);
    if values.is_empty() {
        return if local == builtins.apply(template) {
            Ok(Rebuilt {
                content: template.to_string(),
                changed: false,
                replacements: 0,
            })
        } else {
            Err(Refusal::StructuralMismatch)
        };
    }

    let restores = restores(values, &placeholder_names(template), builtins);
    let (content, replacements) = sanitize(local, &restores);
    Ok(Rebuilt {
        changed: content != template,
        content,
        replacements,
    })
}

/// Rebuild a JSON template from `local`, touching only the subtree at
/// `jq_path`. Changes are decided by value equality, not formatting.
/// Returns `None` when `local` has nothing at `jq_path`.
///
/// # Errors
///
/// Returns [`Refusal::PathNotFound`] when the template has no value at
/// `jq_path` and [`Refusal::StructuralMismatch`] under the same conditions
/// as [`rebuild_text`].
pub fn rebuild_json(
    template: &Value,
    local: &Value,
    jq_path: &str,
    builtins: &Builtins,
) -> Result<Option<(Value, usize)>, Refusal> {
    let path = json_path::parse(jq_path);
    let template_sub = json_path::get(template, &path).ok_or(Refusal::PathNotFound)?;
    let Some(local_sub) = json_path::get(local, &path) else {
        return Ok(None);
    };

    let values = extract_from_json(template, local, jq_path, builtins);
    if values.is_empty() {
        return if *local_sub == apply_builtins_json(template_sub, builtins) {
            Ok(Some((template.clone(), 0)))
        } else {
            Err(Refusal::StructuralMismatch)
        };
    }

    let restores = restores(values, &json_placeholder_names(template_sub), builtins);
    let mut replacements = 0;
    let new_sub = sanitize_json(local_sub, &restores, &mut replacements);
    let mut rebuilt = template.clone();
    json_path::set(&mut rebuilt, &path, new_sub);
    Ok(Some((rebuilt, replacements)))
}

/// Back up one file of `step`: read both sides, rebuild, and write the
/// template unless `dry_run`.
#[must_use]
pub fn backup_file(
    step: &Step,
    file: &FileConfig,
    home: &Path,
    builtins: &Builtins,
    dry_run: bool,
) -> FileBackup {
    let template_path = step
        .template_path(file)
        .unwrap_or_else(|| step.dir.join("templates").join(&file.path));
    let mut result = FileBackup::new(step, file, template_path.clone());

    match try_backup(file, &template_path, &home.join(&file.path), builtins, dry_run) {
        Ok(Some((changed, replacements))) => {
            result.changed = changed;
            result.replacements = replacements;
        }
        Ok(None) => {}
        Err(e) => result.error = Some(e.to_string()),
    }
    result
}

fn try_backup(
    file: &FileConfig,
    template_path: &Path,
    local_path: &Path,
    builtins: &Builtins,
    dry_run: bool,
) -> Result<Option<(bool, usize)>, TemplateError> {
    if !template_path.is_file() {
        return Err(TemplateError::NotFound(template_path.to_path_buf()));
    }
    if !local_path.is_file() {
        return Ok(None);
    }
    let template = read(template_path)?;
    let local = read(local_path)?;

    let (content, changed, replacements) = match file.strategy {
        Strategy::Replace => {
            let r = rebuild_text(&template, &local, builtins)
                .map_err(|_| TemplateError::StructuralMismatch(local_path.to_path_buf()))?;
            (r.content, r.changed, r.replacements)
        }
        Strategy::JqMerge => {
            let jq_path = file
                .jq_path
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| TemplateError::MissingJqPath(file.path.clone()))?;
            let t = parse_json(&template, template_path)?;
            let l = parse_json(&local, local_path)?;
            let rebuilt = rebuild_json(&t, &l, jq_path, builtins).map_err(|r| match r {
                Refusal::StructuralMismatch => {
                    TemplateError::StructuralMismatch(local_path.to_path_buf())
                }
                Refusal::PathNotFound => TemplateError::PathNotFound {
                    path: template_path.to_path_buf(),
                    jq_path: jq_path.to_string(),
                },
            })?;
            let Some((rebuilt, replacements)) = rebuilt else {
                return Ok(None);
            };
            let changed = rebuilt != t;
            (to_pretty(&rebuilt, template_path)?, changed, replacements)
        }
    };

    if changed && !dry_run {
        std::fs::write(template_path, content).map_err(|e| TemplateError::Io {
            path: template_path.to_path_buf(),
            message: e.to_string(),
        })?;
    }
    Ok(Some((changed, replacements)))
}

/// Back up every file of every step in discovery order.
#[must_use]
pub fn backup_all(
    steps: &StepSet,
    home: &Path,
    builtins: &Builtins,
    dry_run: bool,
) -> (Vec<FileBackup>, BackupSummary) {
    let results: Vec<FileBackup> = steps
        .iter()
        .flat_map(|step| {
            step.files
                .iter()
                .map(move |file| backup_file(step, file, home, builtins, dry_run))
        })
        .collect();
    let summary = BackupSummary::from_results(&results);
    (results, summary)
}

/// Extracted values, plus the built-ins the template referenced. Built-ins
/// are restored only where they stand alone so a short `USER` does not
/// rewrite every word containing it.
fn restores(
    values: super::extract::Extracted,
    names: &[String],
    builtins: &Builtins,
) -> Vec<Restore> {
    let mut restores: Vec<Restore> = values
        .into_iter()
        .map(|(name, value)| Restore::anywhere(name, value))
        .collect();
    for name in names.iter().filter(|n| is_builtin(n)) {
        if let Some(v) = builtins.get(name) {
            restores.push(Restore::bounded(name.clone(), v));
        }
    }
    restores
}

fn json_placeholder_names(value: &Value) -> Vec<String> {
    let mut names = Vec::new();
    collect_json_names(value, &mut names);
    names
}

fn collect_json_names(value: &Value, names: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            for n in placeholder_names(s) {
                if !names.contains(&n) {
                    names.push(n);
                }
            }
        }
        Value::Object(map) => map.values().for_each(|v| collect_json_names(v, names)),
        Value::Array(items) => items.iter().for_each(|v| collect_json_names(v, names)),
        _ => {}
    }
}

fn apply_builtins_json(value: &Value, builtins: &Builtins) -> Value {
    match value {
        Value::String(s) => Value::String(builtins.apply(s)),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), apply_builtins_json(v, builtins)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| apply_builtins_json(v, builtins))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn sanitize_json(value: &Value, restores: &[Restore], count: &mut usize) -> Value {
    match value {
        Value::String(s) => {
            let (out, n) = sanitize(s, restores);
            *count += n;
            Value::String(out)
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), sanitize_json(v, restores, count)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| sanitize_json(v, restores, count))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn read(path: &Path) -> Result<String, TemplateError> {
    std::fs::read_to_string(path).map_err(|e| TemplateError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn parse_json(content: &str, path: &Path) -> Result<Value, TemplateError> {
    serde_json::from_str(content).map_err(|e| TemplateError::InvalidJson {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Pretty JSON with a trailing newline.
pub(crate) fn to_pretty(value: &Value, path: &Path) -> Result<String, TemplateError> {
    serde_json::to_string_pretty(value)
        .map(|s| s + "\n")
        .map_err(|e| TemplateError::InvalidJson {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}
