//! `booti push`: write local edits back into templates on a fresh branch.
//!
//! The steps repository must be clean. Outside dry-run a branch is created
//! at `HEAD`, every step file is backed up, and the rewritten templates are
//! committed. A run that changes nothing leaves no branch behind.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use git2::Oid;

use super::CommandSetup;
use crate::cli::{GlobalOpts, PushOpts};
use crate::git;
use crate::logging::{Log, Logger};
use crate::runner::Context;
use crate::steps::StepSet;
use crate::template::backup::{BackupSummary, FileBackup, backup_all};

/// Everything a push run produced.
#[derive(Debug)]
pub struct PushReport {
    /// Per-file outcomes in discovery order.
    pub files: Vec<FileBackup>,
    /// Run totals.
    pub summary: BackupSummary,
    /// Branch holding the changes, if one was kept.
    pub branch: Option<String>,
    /// Commit created for the changes.
    pub commit: Option<Oid>,
}

/// Run the push command.
///
/// # Errors
///
/// Returns an error if setup fails, the repository is missing or dirty, a
/// git operation fails, or any file could not be backed up.
pub fn run(global: &GlobalOpts, opts: &PushOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(global, log.as_ref())?;
    let ctx = setup.context(Arc::clone(log) as Arc<dyn Log>, global.dry_run)?;

    let branch = opts
        .branch
        .clone()
        .unwrap_or_else(|| git::default_branch_name(&chrono::Local::now()));
    let report = push(&ctx, &setup.steps, &setup.steps_dir, &branch, opts.no_commit)?;

    let errors = report.summary.errors.len();
    if errors > 0 {
        anyhow::bail!("{errors} file(s) could not be backed up");
    }
    Ok(())
}

/// Back up every step file into its template inside the git repository
/// holding `steps_dir`.
///
/// # Errors
///
/// Returns an error if the repository is missing or dirty or a git
/// operation fails. Per-file problems are reported in the returned
/// [`PushReport`].
pub fn push(
    ctx: &Context,
    steps: &StepSet,
    steps_dir: &Path,
    branch: &str,
    no_commit: bool,
) -> Result<PushReport> {
    let log = ctx.log.as_ref();

    log.stage("Checking repository");
    let repo = git::discover(steps_dir)?;
    let root = git::workdir(&repo)?;
    log.debug(&format!("repository: {}", root.display()));
    git::ensure_clean(&repo)?;

    let original = git::current_branch(&repo)?;
    if ctx.dry_run {
        log.dry_run(&format!("would create branch {branch}"));
    } else {
        git::create_and_switch(&repo, branch)?;
        log.info(&format!("created branch {branch}"));
    }

    log.stage("Backing up files");
    let (files, summary) = backup_all(steps, &ctx.home, &ctx.builtins, ctx.dry_run);
    report_files(log, &files, ctx.dry_run);
    log.info(&format!(
        "{} updated, {} skipped, {} error(s)",
        summary.files_updated,
        summary.files_skipped,
        summary.errors.len()
    ));
    for error in &summary.errors {
        log.error(error);
    }

    if ctx.dry_run {
        return Ok(PushReport {
            files,
            summary,
            branch: None,
            commit: None,
        });
    }

    if summary.files_updated == 0 {
        discard_branch(&repo, original.as_deref(), branch, log)?;
        return Ok(PushReport {
            files,
            summary,
            branch: None,
            commit: None,
        });
    }

    let commit = if no_commit {
        log.info(&format!("templates updated on {branch}; commit skipped"));
        None
    } else {
        let changed: Vec<PathBuf> = files
            .iter()
            .filter(|f| f.changed)
            .map(|f| f.template.clone())
            .collect();
        let message = format!("Back up {} template(s) from local files", changed.len());
        let oid = git::commit_paths(&repo, &changed, &message)
            .with_context(|| format!("failed to commit on {branch}"))?;
        log.success(&format!("committed {} on {branch}", short_id(oid)));
        Some(oid)
    };

    Ok(PushReport {
        files,
        summary,
        branch: Some(branch.to_string()),
        commit,
    })
}

fn report_files(log: &dyn Log, files: &[FileBackup], dry_run: bool) {
    for f in files {
        let label = format!("{}/{}", f.step_id, f.path);
        if f.error.is_some() {
            continue;
        }
        if !f.changed {
            log.debug(&format!("{label}: unchanged"));
        } else if dry_run {
            log.dry_run(&format!(
                "would update {} ({} value(s) restored)",
                f.template.display(),
                f.replacements
            ));
        } else {
            log.success(&format!("{label}: updated ({} value(s) restored)", f.replacements));
        }
    }
}

fn discard_branch(
    repo: &git2::Repository,
    original: Option<&str>,
    branch: &str,
    log: &dyn Log,
) -> Result<()> {
    let Some(original) = original else {
        log.warn(&format!("HEAD was detached; leaving empty branch {branch}"));
        return Ok(());
    };
    git::switch_to(repo, original)?;
    git::delete_branch(repo, branch)?;
    log.info(&format!("nothing to push; removed branch {branch}"));
    Ok(())
}

fn short_id(oid: Oid) -> String {
    oid.to_string().chars().take(7).collect()
}
