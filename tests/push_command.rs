#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the `push` command.
//!
//! The steps directory is a real git repository; the fake home directory
//! lives outside it so local files never dirty the working tree.

mod common;

use std::path::Path;
use std::sync::Arc;

use booti_cli::commands::push::push;
use booti_cli::error::GitError;
use booti_cli::git;
use booti_cli::platform::Os;
use common::*;
use git2::Repository;

const BRANCH: &str = "booti/push-test";

fn init_repo(dir: &Path) -> Repository {
    let repo = Repository::init(dir).unwrap();
    {
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
    }
    {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = repo.signature().unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
    }
    repo
}

fn head_message(repo: &Repository) -> String {
    repo.head()
        .unwrap()
        .peel_to_commit()
        .unwrap()
        .message()
        .unwrap()
        .to_string()
}

fn token_step(bed: &TestBed) -> StepBuilder {
    bed.step("gh")
        .descriptor(
            r#"{
                "name": "GitHub CLI",
                "platforms": ["linux", "darwin"],
                "variables": { "TOK": { "type": "secret" } },
                "files": [{ "path": "config.json" }]
            }"#,
        )
        .template("config.json", r#"{"token":"${TOK}"}"#)
}

#[test]
fn already_placeholdered_file_is_unchanged_and_branch_removed() {
    let bed = TestBed::new();
    let step = token_step(&bed);
    bed.write_home("config.json", r#"{"token":"secret123"}"#);
    let repo = init_repo(&bed.steps_dir());
    let original = git::current_branch(&repo).unwrap();

    let log = Arc::new(RecordingLog::default());
    let ctx = bed.context(Os::Linux, log, Arc::new(FakeExecutor::default()), false);
    let report = push(&ctx, &bed.discover(), &bed.steps_dir(), BRANCH, false).unwrap();

    assert_eq!(report.files.len(), 1);
    assert!(!report.files[0].changed);
    assert_eq!(report.files[0].replacements, 1);
    assert_eq!(report.summary.files_updated, 0);
    assert_eq!(report.summary.files_skipped, 1);
    assert!(report.summary.errors.is_empty());
    assert!(report.branch.is_none());
    assert_eq!(git::current_branch(&repo).unwrap(), original);
    assert!(repo.find_branch(BRANCH, git2::BranchType::Local).is_err());
    assert_eq!(
        std::fs::read_to_string(step.template_path("config.json")).unwrap(),
        r#"{"token":"${TOK}"}"#
    );
}

#[test]
fn nested_secret_maps_back_to_its_placeholder() {
    let bed = TestBed::new();
    bed.step("gh")
        .descriptor(
            r#"{
                "name": "GitHub",
                "platforms": ["linux", "darwin"],
                "variables": { "GITHUB_TOKEN": { "type": "secret" } },
                "files": [{ "path": "hosts.json" }]
            }"#,
        )
        .template("hosts.json", r#"{"auth":{"token":"${GITHUB_TOKEN}"}}"#);
    bed.write_home("hosts.json", r#"{"auth":{"token":"ghp_abc"}}"#);
    init_repo(&bed.steps_dir());

    let ctx = bed.context(
        Os::Linux,
        Arc::new(RecordingLog::default()),
        Arc::new(FakeExecutor::default()),
        false,
    );
    let report = push(&ctx, &bed.discover(), &bed.steps_dir(), BRANCH, false).unwrap();

    assert!(!report.files[0].changed);
    assert_eq!(report.files[0].replacements, 1);
    assert!(report.summary.errors.is_empty());
}

fn editor_step(bed: &TestBed) -> StepBuilder {
    bed.step("editor")
        .descriptor(
            r#"{
                "name": "Editor",
                "platforms": ["linux", "darwin"],
                "variables": { "NAME": {} },
                "files": [{ "path": "settings.json", "strategy": "jq-merge", "jq_path": ".editor" }]
            }"#,
        )
        .template("settings.json", r#"{"editor":{"user":"${NAME}","fontSize":12}}"#)
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn edited_files_are_committed_on_new_branch() {
    let bed = TestBed::new();
    let editor = editor_step(&bed);
    let zed = bed
        .step("zed")
        .descriptor(
            r#"{
                "name": "Zed",
                "platforms": ["linux", "darwin"],
                "variables": { "THEME": {} },
                "files": [{ "path": ".config/zed/settings.json", "strategy": "jq-merge", "jq_path": ".theme" }]
            }"#,
        )
        .template(
            ".config/zed/settings.json",
            r#"{"theme":{"name":"${THEME}","dir":"${HOME}/.config/zed/themes"}}"#,
        );
    let home = bed.home().display().to_string();
    bed.write_home(
        "settings.json",
        r#"{"editor":{"user":"ada","fontSize":14},"telemetry":false}"#,
    );
    bed.write_home(
        ".config/zed/settings.json",
        &format!(r#"{{"theme":{{"name":"one","dir":"{home}/themes","mode":"dark"}}}}"#),
    );
    let repo = init_repo(&bed.steps_dir());

    let log = Arc::new(RecordingLog::default());
    let ctx = bed.context(Os::Linux, log, Arc::new(FakeExecutor::default()), false);
    let report = push(&ctx, &bed.discover(), &bed.steps_dir(), BRANCH, false).unwrap();

    assert_eq!(report.summary.files_updated, 2);
    assert!(report.summary.errors.is_empty());
    assert_eq!(report.branch.as_deref(), Some(BRANCH));
    assert!(report.commit.is_some());
    assert_eq!(git::current_branch(&repo).unwrap().as_deref(), Some(BRANCH));
    assert_eq!(head_message(&repo), "Back up 2 template(s) from local files");
    assert!(git::changed_paths(&repo).unwrap().is_empty());

    assert_eq!(
        read_json(&editor.template_path("settings.json")),
        serde_json::json!({ "editor": { "user": "${NAME}", "fontSize": 14 } })
    );
    assert_eq!(
        read_json(&zed.template_path(".config/zed/settings.json")),
        serde_json::json!({
            "theme": { "name": "${THEME}", "dir": "${HOME}/themes", "mode": "dark" }
        })
    );
}

#[test]
fn no_commit_leaves_changes_on_branch() {
    let bed = TestBed::new();
    let editor = editor_step(&bed);
    bed.write_home("settings.json", r#"{"editor":{"user":"ada","fontSize":16}}"#);
    let repo = init_repo(&bed.steps_dir());

    let ctx = bed.context(
        Os::Linux,
        Arc::new(RecordingLog::default()),
        Arc::new(FakeExecutor::default()),
        false,
    );
    let report = push(&ctx, &bed.discover(), &bed.steps_dir(), BRANCH, true).unwrap();

    assert!(report.commit.is_none());
    assert_eq!(report.branch.as_deref(), Some(BRANCH));
    assert_eq!(head_message(&repo), "initial");
    assert_eq!(
        read_json(&editor.template_path("settings.json")),
        serde_json::json!({ "editor": { "user": "${NAME}", "fontSize": 16 } })
    );
    assert_eq!(
        git::changed_paths(&repo).unwrap(),
        vec!["editor/templates/settings.json"]
    );
}

#[test]
fn edited_plain_template_is_refused_and_branch_removed() {
    let bed = TestBed::new();
    let vim = bed
        .step("vim")
        .descriptor(
            r#"{"name":"Vim","platforms":["linux","darwin"],"files":[{"path":".vimrc"}]}"#,
        )
        .template(".vimrc", "set number\n");
    bed.write_home(".vimrc", "set nonumber\nrm -rf\n");
    let repo = init_repo(&bed.steps_dir());
    let original = git::current_branch(&repo).unwrap();

    let ctx = bed.context(
        Os::Linux,
        Arc::new(RecordingLog::default()),
        Arc::new(FakeExecutor::default()),
        false,
    );
    let report = push(&ctx, &bed.discover(), &bed.steps_dir(), BRANCH, false).unwrap();

    assert_eq!(report.summary.files_updated, 0);
    assert_eq!(report.summary.errors.len(), 1);
    assert!(report.summary.errors[0].starts_with("vim/.vimrc: Structural mismatch"));
    assert_eq!(
        std::fs::read_to_string(vim.template_path(".vimrc")).unwrap(),
        "set number\n"
    );
    assert!(report.branch.is_none());
    assert_eq!(git::current_branch(&repo).unwrap(), original);
    assert!(repo.find_branch(BRANCH, git2::BranchType::Local).is_err());
}

#[test]
fn structural_mismatch_is_reported_and_template_kept() {
    let bed = TestBed::new();
    let git_step = bed
        .step("git")
        .descriptor(
            r#"{
                "name": "Git",
                "platforms": ["linux", "darwin"],
                "variables": { "NAME": {} },
                "files": [{ "path": ".gitconfig" }]
            }"#,
        )
        .template(".gitconfig", "# managed\n[user]\n\tname = ${NAME}\n");
    bed.write_home(".gitconfig", "[user]\n\tname = Ada\n");
    let repo = init_repo(&bed.steps_dir());
    let original = git::current_branch(&repo).unwrap();

    let ctx = bed.context(
        Os::Linux,
        Arc::new(RecordingLog::default()),
        Arc::new(FakeExecutor::default()),
        false,
    );
    let report = push(&ctx, &bed.discover(), &bed.steps_dir(), BRANCH, false).unwrap();

    assert_eq!(report.summary.errors.len(), 1);
    assert!(report.summary.errors[0].starts_with("git/.gitconfig: Structural mismatch"));
    assert_eq!(
        std::fs::read_to_string(git_step.template_path(".gitconfig")).unwrap(),
        "# managed\n[user]\n\tname = ${NAME}\n"
    );
    assert_eq!(git::current_branch(&repo).unwrap(), original);
}

#[test]
fn missing_local_file_is_skipped() {
    let bed = TestBed::new();
    token_step(&bed);
    init_repo(&bed.steps_dir());

    let ctx = bed.context(
        Os::Linux,
        Arc::new(RecordingLog::default()),
        Arc::new(FakeExecutor::default()),
        false,
    );
    let report = push(&ctx, &bed.discover(), &bed.steps_dir(), BRANCH, false).unwrap();
    assert_eq!(report.summary.files_skipped, 1);
    assert!(report.summary.errors.is_empty());
}

#[test]
fn dry_run_touches_neither_templates_nor_branches() {
    let bed = TestBed::new();
    let editor = editor_step(&bed);
    bed.write_home("settings.json", r#"{"editor":{"user":"ada","fontSize":16}}"#);
    let repo = init_repo(&bed.steps_dir());

    let log = Arc::new(RecordingLog::default());
    let ctx = bed.context(Os::Linux, log.clone(), Arc::new(FakeExecutor::default()), true);
    let report = push(&ctx, &bed.discover(), &bed.steps_dir(), BRANCH, false).unwrap();

    assert_eq!(report.summary.files_updated, 1);
    assert_eq!(
        std::fs::read_to_string(editor.template_path("settings.json")).unwrap(),
        r#"{"editor":{"user":"${NAME}","fontSize":12}}"#
    );
    assert!(repo.find_branch(BRANCH, git2::BranchType::Local).is_err());
    let dry = log.messages("dry_run");
    assert!(dry.iter().any(|m| m == &format!("would create branch {BRANCH}")));
    assert!(dry.iter().any(|m| m.starts_with("would update")));
}

#[test]
fn dirty_repository_is_refused() {
    let bed = TestBed::new();
    token_step(&bed);
    bed.write_home("config.json", r#"{"token":"secret123"}"#);
    let repo = init_repo(&bed.steps_dir());
    std::fs::write(bed.steps_dir().join("notes.txt"), "wip").unwrap();

    let ctx = bed.context(
        Os::Linux,
        Arc::new(RecordingLog::default()),
        Arc::new(FakeExecutor::default()),
        false,
    );
    let err = push(&ctx, &bed.discover(), &bed.steps_dir(), BRANCH, false).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<GitError>(),
        Some(GitError::DirtyWorkingTree(paths)) if paths == &["notes.txt"]
    ));
    assert!(repo.find_branch(BRANCH, git2::BranchType::Local).is_err());
}

#[test]
fn steps_outside_a_repository_are_refused() {
    let bed = TestBed::new();
    token_step(&bed);

    let ctx = bed.context(
        Os::Linux,
        Arc::new(RecordingLog::default()),
        Arc::new(FakeExecutor::default()),
        false,
    );
    let err = push(&ctx, &bed.discover(), &bed.steps_dir(), BRANCH, false).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GitError>(),
        Some(GitError::NotARepository { .. })
    ));
}
