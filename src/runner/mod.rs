//! Step execution: platform gate, `pre.sh`, template sync, `post.sh`.
//!
//! Steps run strictly one after another in dependency order. A failing step
//! halts the run; steps that already completed are left as they are.
mod context;
pub mod graph;
pub mod sync;

pub use context::Context;
pub use graph::{DependencyGraph, resolve};
pub use sync::{SyncStats, sync_files};

use std::path::Path;

use anyhow::Result;

use crate::error::StepError;
use crate::logging::StepStatus;
use crate::steps::{Step, StepSet};
use crate::variables::{CollectedVariables, script_env};

/// Outcome of one step.
///
/// # Examples
///
/// ```
/// use booti_cli::runner::StepResult;
///
/// let skipped = StepResult::not_applicable("homebrew", "linux");
/// assert!(skipped.success && skipped.skipped);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    /// Step id.
    pub step_id: String,
    /// `false` only when the step failed.
    pub success: bool,
    /// The step did not run on this platform.
    pub skipped: bool,
    /// Skip reason or failure description.
    pub message: Option<String>,
    /// File sync counters.
    pub stats: SyncStats,
}

impl StepResult {
    /// A step that does not target `os`.
    #[must_use]
    pub fn not_applicable(step_id: &str, os: impl std::fmt::Display) -> Self {
        Self {
            step_id: step_id.to_string(),
            success: true,
            skipped: true,
            message: Some(format!("platform {os} not targeted")),
            stats: SyncStats::new(),
        }
    }

    fn completed(step_id: &str, stats: SyncStats) -> Self {
        Self {
            step_id: step_id.to_string(),
            success: true,
            skipped: false,
            message: None,
            stats,
        }
    }

    fn failed(step_id: &str, message: String) -> Self {
        Self {
            step_id: step_id.to_string(),
            success: false,
            skipped: false,
            message: Some(message),
            stats: SyncStats::new(),
        }
    }
}

/// Execute one step, recording the result in the logger.
#[must_use]
pub fn execute_step(ctx: &Context, step: &Step, vars: &CollectedVariables) -> StepResult {
    if !ctx.platform.supports(&step.platforms) {
        let result = StepResult::not_applicable(&step.id, ctx.platform.os);
        ctx.log
            .debug(&format!("skipping step: {} (not applicable)", step.id));
        ctx.log
            .record_step(&step.id, StepStatus::NotApplicable, result.message.as_deref());
        return result;
    }

    ctx.log.stage(&step.name);

    match run_phases(ctx, step, vars) {
        Ok(stats) => {
            if !stats.is_empty() {
                ctx.log.info(&stats.summary(ctx.dry_run));
            }
            let status = if ctx.dry_run {
                StepStatus::DryRun
            } else {
                StepStatus::Ok
            };
            ctx.log.record_step(&step.id, status, None);
            StepResult::completed(&step.id, stats)
        }
        Err(e) => {
            let message = format!("{e:#}");
            ctx.log.error(&format!("{}: {message}", step.id));
            ctx.log
                .record_step(&step.id, StepStatus::Failed, Some(&message));
            StepResult::failed(&step.id, message)
        }
    }
}

fn run_phases(ctx: &Context, step: &Step, vars: &CollectedVariables) -> Result<SyncStats> {
    if let Some(script) = &step.pre_script {
        run_script(ctx, step, script, vars)?;
    }
    let stats = sync_files(ctx, step, vars)?;
    if let Some(script) = &step.post_script {
        run_script(ctx, step, script, vars)?;
    }
    Ok(stats)
}

fn run_script(ctx: &Context, step: &Step, script: &Path, vars: &CollectedVariables) -> Result<()> {
    let name = script
        .file_name()
        .map_or_else(|| script.display().to_string(), |n| n.to_string_lossy().into_owned());

    if ctx.dry_run {
        ctx.log.dry_run(&format!("would run {name}"));
        return Ok(());
    }

    ctx.log.debug(&format!("running {}", script.display()));
    let env = script_env(step, vars, ctx.dry_run);
    let result = ctx.executor.run_script(script, &step.dir, &env)?;
    for line in result.stdout.lines() {
        ctx.log.debug(line);
    }
    if !result.success {
        return Err(StepError::ScriptFailed {
            step: step.id.clone(),
            script: name,
            code: result.code.unwrap_or(-1),
            stderr: result.stderr.trim().to_string(),
        }
        .into());
    }
    ctx.log.success(&format!("{name} completed"));
    Ok(())
}

/// Run `order` to completion or until a step fails.
///
/// Steps after a failure are recorded as not run.
pub fn run_steps(
    ctx: &Context,
    steps: &StepSet,
    order: &[String],
    vars: &CollectedVariables,
) -> Vec<StepResult> {
    let mut results = Vec::with_capacity(order.len());
    let mut halted = false;

    for id in order {
        let Some(step) = steps.get(id) else {
            continue;
        };
        if halted {
            ctx.log
                .record_step(&step.id, StepStatus::NotRun, Some("earlier step failed"));
            continue;
        }
        let result = execute_step(ctx, step, vars);
        halted = !result.success;
        results.push(result);
    }
    results
}
