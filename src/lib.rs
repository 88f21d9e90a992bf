//! Declarative machine bootstrap runner.
//!
//! Discovers steps (`step.json` descriptors with templates and optional
//! `pre.sh`/`post.sh` scripts), orders them by dependency, collects the
//! variables their templates need, and syncs the rendered files into the
//! home directory. `push` runs the other way: it turns edited local files
//! back into templates.
//!
//! The public API is organised into layers:
//!
//! - **[`steps`]**: descriptor parsing, discovery and validation
//! - **[`template`]**: placeholders, extraction, JSON paths and reverse backup
//! - **[`variables`]**: definition merging, precedence and prompting
//! - **[`resources`]**: idempotent `check + apply` file primitives
//! - **[`runner`]**: dependency graph and per-step execution
//! - **[`commands`]**: top-level subcommand orchestration (`install`, `list`, `push`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod exec;
pub mod git;
pub mod logging;
pub mod platform;
pub mod resources;
pub mod runner;
pub mod settings;
pub mod steps;
pub mod template;
pub mod variables;
