//! `booti install`: plan, collect variables, run steps.
use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::Result;

use super::CommandSetup;
use crate::cli::{GlobalOpts, InstallOpts};
use crate::logging::{Log, Logger};
use crate::runner::{self, Context, DependencyGraph, StepResult};
use crate::steps::StepSet;
use crate::template::extract::find_existing_values;
use crate::variables::{
    CollectOptions, CollectedVariables, DialoguerPrompter, Prompter, collect_variables,
    merge_definitions,
};

/// What to install and how to resolve variables.
#[derive(Debug, Clone, Default)]
pub struct InstallRequest {
    /// Selected step ids; empty means every step.
    pub only: Vec<String>,
    /// Explicit variable values.
    pub overrides: BTreeMap<String, String>,
    /// Never prompt.
    pub non_interactive: bool,
}

/// Everything an install run produced.
#[derive(Debug)]
pub struct InstallReport {
    /// The execution plan.
    pub graph: DependencyGraph,
    /// Resolved variable values.
    pub variables: CollectedVariables,
    /// Per-step outcomes, in execution order.
    pub results: Vec<StepResult>,
}

impl InstallReport {
    /// Whether any step failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| !r.success)
    }
}

/// Run the install command.
///
/// # Errors
///
/// Returns an error if setup fails, the dependency graph has a cycle or names
/// an unknown step, a prompt fails, or any step fails.
pub fn run(global: &GlobalOpts, opts: &InstallOpts, log: &Arc<Logger>) -> Result<()> {
    let version = option_env!("BOOTI_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    log.info(&format!("booti {version}"));

    let setup = CommandSetup::init(global, log.as_ref())?;
    let ctx = setup.context(Arc::clone(log) as Arc<dyn Log>, global.dry_run)?;

    let mut overrides = setup.settings.variables.clone();
    overrides.extend(opts.vars.iter().cloned());
    let request = InstallRequest {
        only: opts.only.clone(),
        overrides,
        non_interactive: opts.non_interactive
            || setup.settings.non_interactive
            || !std::io::stdin().is_terminal(),
    };

    let report = install(
        &ctx,
        &setup.steps,
        &request,
        |name| std::env::var(name).ok(),
        &DialoguerPrompter,
    )?;

    log.print_summary();

    let count = log.failure_count();
    if count > 0 || report.has_failures() {
        anyhow::bail!("{} step(s) failed", count.max(1));
    }
    Ok(())
}

/// Plan, collect variables, and execute.
///
/// `env` looks up process environment variables.
///
/// # Errors
///
/// Returns an error if planning fails or a prompt fails. Step failures are
/// reported in the returned [`InstallReport`].
pub fn install(
    ctx: &Context,
    steps: &StepSet,
    request: &InstallRequest,
    env: impl Fn(&str) -> Option<String>,
    prompter: &dyn Prompter,
) -> Result<InstallReport> {
    let log = ctx.log.as_ref();

    log.stage("Resolving dependencies");
    let selected = (!request.only.is_empty()).then_some(request.only.as_slice());
    let graph = runner::resolve(steps, selected)?;
    for id in &graph.auto_included {
        let needed_by: Vec<&str> = graph
            .dependents
            .get(id)
            .map(|d| d.iter().map(String::as_str).collect())
            .unwrap_or_default();
        log.info(&format!(
            "auto-including {id} (required by {})",
            needed_by.join(", ")
        ));
    }
    log.info(&format!("execution order: {}", graph.order.join(" → ")));

    let planned = graph.order.iter().filter_map(|id| steps.get(id));
    let specs = merge_definitions(planned);

    let variables = if specs.is_empty() {
        CollectedVariables::new()
    } else {
        log.stage("Collecting variables");
        let unresolved: Vec<String> = specs
            .iter()
            .filter(|s| {
                !request.overrides.contains_key(&s.name)
                    && env(&s.name).is_none_or(|v| v.is_empty())
            })
            .map(|s| s.name.clone())
            .collect();
        let extracted = if unresolved.is_empty() {
            BTreeMap::new()
        } else {
            find_existing_values(steps, &unresolved, &ctx.home, &ctx.builtins)
        };
        let opts = CollectOptions {
            overrides: request.overrides.clone(),
            non_interactive: request.non_interactive,
        };
        collect_variables(&specs, &extracted, env, &opts, prompter, log)?
    };

    let results = runner::run_steps(ctx, steps, &graph.order, &variables);

    Ok(InstallReport {
        graph,
        variables,
        results,
    })
}
