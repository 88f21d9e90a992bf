//! `booti list`: show discovered steps.
use anyhow::Result;

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::logging::Log;
use crate::platform::Platform;
use crate::steps::{Step, StepSet};

/// Run the list command.
///
/// # Errors
///
/// Returns an error if setup fails.
pub fn run(global: &GlobalOpts, log: &dyn Log) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    log.stage("Steps");
    for line in describe(&setup.steps, &setup.platform) {
        log.info(&line);
    }
    Ok(())
}

/// One line per step in discovery order.
#[must_use]
pub fn describe(steps: &StepSet, platform: &Platform) -> Vec<String> {
    steps.iter().map(|s| describe_step(s, platform)).collect()
}

fn describe_step(step: &Step, platform: &Platform) -> String {
    let platforms: Vec<String> = step.platforms.iter().map(ToString::to_string).collect();
    let mut line = format!("{} ({}) [{}]", step.id, step.name, platforms.join(", "));
    if !step.dependencies.is_empty() {
        line.push_str(&format!(" after {}", step.dependencies.join(", ")));
    }
    if !step.variables.is_empty() {
        let names: Vec<&str> = step.variables.iter().map(|(n, _)| n.as_str()).collect();
        line.push_str(&format!(" vars: {}", names.join(", ")));
    }
    if !step.files.is_empty() {
        line.push_str(&format!(" files: {}", step.files.len()));
    }
    if !platform.supports(&step.platforms) {
        line.push_str(" (n/a on this host)");
    }
    line
}
