//! Render a step's templates into the home directory.
//!
//! Each file becomes a [`Resource`]; the loop below checks its state and
//! applies it, or only reports the change in dry-run mode. Problems with one
//! file skip that file. Only a directory that cannot be created aborts the
//! step.
use anyhow::Result;
use serde_json::Value;

use super::context::Context;
use crate::error::StepError;
use crate::resources::template_file::{BACKUP_SUFFIX, CORRUPT_SUFFIX};
use crate::resources::{JsonMergeFile, ReplaceFile, Resource, TargetState};
use crate::steps::{FileConfig, Step, Strategy};
use crate::template::{json_path, render};
use crate::variables::CollectedVariables;

/// Counters for a step's file sync.
///
/// # Examples
///
/// ```
/// use booti_cli::runner::SyncStats;
///
/// let stats = SyncStats { changed: 1, already_ok: 2, skipped: 3 };
/// assert_eq!(stats.summary(false), "1 changed, 2 already ok, 3 skipped");
/// assert_eq!(stats.summary(true), "1 would change, 2 already ok, 3 skipped");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Files written (or that would be written).
    pub changed: u32,
    /// Files already in the desired state.
    pub already_ok: u32,
    /// Files skipped because of a problem.
    pub skipped: u32,
}

impl SyncStats {
    /// Create a new empty stats counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Format the summary string (e.g. "3 changed, 10 already ok, 1 skipped").
    #[must_use]
    pub fn summary(&self, dry_run: bool) -> String {
        let verb = if dry_run { "would change" } else { "changed" };
        if self.skipped > 0 {
            format!(
                "{} {verb}, {} already ok, {} skipped",
                self.changed, self.already_ok, self.skipped
            )
        } else {
            format!("{} {verb}, {} already ok", self.changed, self.already_ok)
        }
    }

    /// Whether no file was considered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.changed == 0 && self.already_ok == 0 && self.skipped == 0
    }
}

impl std::ops::AddAssign for SyncStats {
    fn add_assign(&mut self, other: Self) {
        self.changed += other.changed;
        self.already_ok += other.already_ok;
        self.skipped += other.skipped;
    }
}

/// Sync every file of `step`.
///
/// # Errors
///
/// Returns an error only when a target's parent directory cannot be
/// created; every other problem is logged and counted as skipped.
pub fn sync_files(ctx: &Context, step: &Step, vars: &CollectedVariables) -> Result<SyncStats> {
    let mut stats = SyncStats::new();
    for file in &step.files {
        stats += sync_file(ctx, step, file, vars)?;
    }
    Ok(stats)
}

fn sync_file(
    ctx: &Context,
    step: &Step,
    file: &FileConfig,
    vars: &CollectedVariables,
) -> Result<SyncStats> {
    match build_resource(ctx, step, file, vars) {
        Ok(SyncResource::Replace(r)) => process_single(ctx, &r, "write"),
        Ok(SyncResource::Merge(r)) => {
            if ctx.dry_run && r.is_corrupt().unwrap_or(false) {
                ctx.log.dry_run(&format!(
                    "would back up unparsable {} to {CORRUPT_SUFFIX}",
                    r.description()
                ));
            }
            process_single(ctx, &r, "merge")
        }
        Err(reason) => {
            ctx.log.warn(&format!("skipping {}: {reason}", file.path));
            Ok(SyncStats {
                skipped: 1,
                ..SyncStats::new()
            })
        }
    }
}

enum SyncResource {
    Replace(ReplaceFile),
    Merge(JsonMergeFile),
}

/// Read and render the template for `file`. An `Err` is a skip reason.
fn build_resource(
    ctx: &Context,
    step: &Step,
    file: &FileConfig,
    vars: &CollectedVariables,
) -> Result<SyncResource, String> {
    let template_path = step
        .template_path(file)
        .filter(|p| p.is_file())
        .ok_or_else(|| "template not found".to_string())?;
    let content = std::fs::read_to_string(&template_path)
        .map_err(|e| format!("cannot read {}: {e}", template_path.display()))?;
    let rendered = render(&content, vars, &ctx.builtins);
    let target = ctx.home.join(&file.path);

    match file.strategy {
        Strategy::Replace => Ok(SyncResource::Replace(ReplaceFile::new(target, rendered))),
        Strategy::JqMerge => {
            let jq_path = file
                .jq_path
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| "jq-merge requires jq_path".to_string())?;
            let doc: Value = serde_json::from_str(&rendered)
                .map_err(|e| format!("rendered template is not valid JSON: {e}"))?;
            let subtree = json_path::get(&doc, &json_path::parse(jq_path))
                .ok_or_else(|| format!("template has no value at {jq_path}"))?;
            Ok(SyncResource::Merge(JsonMergeFile::new(
                target,
                jq_path,
                subtree.clone(),
            )))
        }
    }
}

/// Check one resource and apply it if needed, returning a stats delta.
fn process_single<R: Resource>(ctx: &Context, resource: &R, verb: &str) -> Result<SyncStats> {
    let desc = resource.description();
    let mut delta = SyncStats::new();

    let state = match resource.current_state() {
        Ok(state) => state,
        Err(e) => {
            ctx.log.warn(&format!("cannot check {desc}: {e:#}"));
            delta.skipped += 1;
            return Ok(delta);
        }
    };

    match state {
        TargetState::UpToDate => {
            ctx.log.debug(&format!("ok: {desc}"));
            delta.already_ok += 1;
        }
        TargetState::Blocked { reason } => {
            ctx.log.warn(&format!("skipping {desc}: {reason}"));
            delta.skipped += 1;
        }
        TargetState::Missing if ctx.dry_run => {
            ctx.log.dry_run(&format!("would {verb}: {desc}"));
            delta.changed += 1;
        }
        TargetState::Stale { detail } if ctx.dry_run => {
            ctx.log
                .dry_run(&format!("would {verb} {desc} (currently {detail})"));
            delta.changed += 1;
        }
        state => delta += apply_resource(ctx, resource, verb, &state)?,
    }
    Ok(delta)
}

/// Write a single missing or stale target, returning a stats delta.
fn apply_resource<R: Resource>(
    ctx: &Context,
    resource: &R,
    verb: &str,
    state: &TargetState,
) -> Result<SyncStats> {
    let desc = resource.description();
    let mut delta = SyncStats::new();
    if let Err(e) = resource.apply() {
        if e.downcast_ref::<StepError>().is_some() {
            return Err(e);
        }
        ctx.log.warn(&format!("failed to {verb} {desc}: {e:#}"));
        delta.skipped += 1;
        return Ok(delta);
    }

    if verb == "write" && matches!(state, TargetState::Stale { .. }) {
        ctx.log
            .debug(&format!("previous content kept as {desc}{BACKUP_SUFFIX}"));
    }
    ctx.log.success(&format!("{verb}: {desc}"));
    delta.changed += 1;
    Ok(delta)
}
