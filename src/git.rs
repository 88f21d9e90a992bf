//! Version-control hygiene for `push`.
//!
//! Thin wrappers over `git2`: find the repository holding the steps, make
//! sure it is clean, move to a fresh branch, and commit rewritten templates.
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use git2::{BranchType, Oid, Repository, Status, StatusOptions};

use crate::error::GitError;

/// Branch name used when `--branch` is not given.
#[must_use]
pub fn default_branch_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("booti/push-{}", now.format("%Y%m%d-%H%M%S"))
}

/// Find the repository enclosing `path`.
///
/// # Errors
///
/// Returns [`GitError::NotARepository`] if none is found.
pub fn discover(path: &Path) -> Result<Repository, GitError> {
    Repository::discover(path).map_err(|source| GitError::NotARepository {
        path: path.to_path_buf(),
        source,
    })
}

/// Root of the working tree.
///
/// # Errors
///
/// Returns [`GitError::BareRepository`] for a bare repository.
pub fn workdir(repo: &Repository) -> Result<PathBuf, GitError> {
    repo.workdir()
        .map(Path::to_path_buf)
        .ok_or(GitError::BareRepository)
}

/// Paths with staged, unstaged or untracked changes, sorted.
///
/// # Errors
///
/// Returns an error if the status cannot be read.
pub fn changed_paths(repo: &Repository) -> Result<Vec<String>, GitError> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .exclude_submodules(true);
    let statuses = repo
        .statuses(Some(&mut opts))
        .map_err(GitError::op("read repository status"))?;

    let mut paths: Vec<String> = statuses
        .iter()
        .filter(|e| !e.status().is_empty() && !e.status().contains(Status::IGNORED))
        .filter_map(|e| e.path().map(String::from))
        .collect();
    paths.sort();
    paths.dedup();
    Ok(paths)
}

/// Fail unless the working tree is clean.
///
/// # Errors
///
/// Returns [`GitError::DirtyWorkingTree`] listing the changed paths.
pub fn ensure_clean(repo: &Repository) -> Result<(), GitError> {
    let changed = changed_paths(repo)?;
    if changed.is_empty() {
        Ok(())
    } else {
        Err(GitError::DirtyWorkingTree(changed))
    }
}

/// Current branch name, `None` when HEAD is detached.
///
/// # Errors
///
/// Returns an error if HEAD cannot be read.
pub fn current_branch(repo: &Repository) -> Result<Option<String>, GitError> {
    let head = repo.head().map_err(GitError::op("read HEAD"))?;
    Ok(if head.is_branch() {
        head.shorthand().map(String::from)
    } else {
        None
    })
}

/// Create `name` at HEAD and make it the current branch.
///
/// The working tree is not touched since the new branch points at the same
/// commit.
///
/// # Errors
///
/// Returns an error if the branch exists or HEAD cannot be updated.
pub fn create_and_switch(repo: &Repository, name: &str) -> Result<(), GitError> {
    let head = repo
        .head()
        .and_then(|h| h.peel_to_commit())
        .map_err(GitError::op("resolve HEAD commit"))?;
    repo.branch(name, &head, false)
        .map_err(GitError::op(format!("create branch {name}")))?;
    switch_to(repo, name)
}

/// Point HEAD at branch `name` without touching the working tree.
///
/// # Errors
///
/// Returns an error if HEAD cannot be updated.
pub fn switch_to(repo: &Repository, name: &str) -> Result<(), GitError> {
    repo.set_head(&format!("refs/heads/{name}"))
        .map_err(GitError::op(format!("switch to {name}")))
}

/// Delete local branch `name`.
///
/// # Errors
///
/// Returns an error if the branch is missing or checked out.
pub fn delete_branch(repo: &Repository, name: &str) -> Result<(), GitError> {
    repo.find_branch(name, BranchType::Local)
        .and_then(|mut b| b.delete())
        .map_err(GitError::op(format!("delete branch {name}")))
}

/// Stage exactly `paths` (absolute or relative to the working tree) and
/// commit them on the current branch with the configured signature.
///
/// # Errors
///
/// Returns an error if a path lies outside the working tree, no signature is
/// configured, or any libgit2 call fails.
pub fn commit_paths(repo: &Repository, paths: &[PathBuf], message: &str) -> Result<Oid, GitError> {
    let root = workdir(repo)?;
    let root = dunce::canonicalize(&root).unwrap_or(root);
    let mut index = repo.index().map_err(GitError::op("open index"))?;

    for path in paths {
        let absolute = dunce::canonicalize(path).unwrap_or_else(|_| path.clone());
        let relative = absolute.strip_prefix(&root).unwrap_or(path);
        index
            .add_path(relative)
            .map_err(GitError::op(format!("stage {}", relative.display())))?;
    }
    index.write().map_err(GitError::op("write index"))?;

    let tree_id = index.write_tree().map_err(GitError::op("write tree"))?;
    let tree = repo.find_tree(tree_id).map_err(GitError::op("find tree"))?;
    let signature = repo
        .signature()
        .map_err(GitError::op("read user.name / user.email"))?;
    let parent = repo
        .head()
        .and_then(|h| h.peel_to_commit())
        .map_err(GitError::op("resolve HEAD commit"))?;

    repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        message,
        &tree,
        &[&parent],
    )
    .map_err(GitError::op("commit"))
}
