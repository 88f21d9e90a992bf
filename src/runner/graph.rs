//! Step dependency graph and execution order.
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::GraphError;
use crate::steps::StepSet;

/// Ordered execution plan derived from step dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    /// Step ids, every dependency before its dependents.
    pub order: Vec<String>,
    /// For each step, the steps in the plan that depend on it.
    pub dependents: BTreeMap<String, Vec<String>>,
    /// Steps in the plan only because a selected step needs them.
    pub auto_included: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Compute the execution plan.
///
/// With `selected`, the plan is the selected steps plus the transitive
/// closure of their dependencies and nothing else. Without it, every
/// discovered step is planned. Roots are visited in discovery order and
/// dependencies in declaration order, so the result is deterministic.
/// Dependencies that were never discovered are ignored.
///
/// # Errors
///
/// Returns [`GraphError::UnknownStep`] for a selected id that was not
/// discovered and [`GraphError::Cycle`] if a step can reach itself.
pub fn resolve(steps: &StepSet, selected: Option<&[String]>) -> Result<DependencyGraph, GraphError> {
    let (universe, auto_included) = match selected {
        Some(ids) => selection_closure(steps, ids)?,
        None => (steps.ids().map(String::from).collect(), Vec::new()),
    };

    let mut marks: HashMap<String, Mark> = HashMap::new();
    let mut stack: Vec<String> = Vec::new();
    let mut order: Vec<String> = Vec::new();

    for id in steps.ids().filter(|id| universe.contains(*id)) {
        visit(id, steps, &universe, &mut marks, &mut stack, &mut order)?;
    }

    let mut dependents: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for id in &order {
        if let Some(step) = steps.get(id) {
            for dep in step.dependencies.iter().filter(|d| universe.contains(*d)) {
                dependents.entry(dep.clone()).or_default().push(id.clone());
            }
        }
    }

    Ok(DependencyGraph {
        order,
        dependents,
        auto_included,
    })
}

fn visit(
    id: &str,
    steps: &StepSet,
    universe: &HashSet<String>,
    marks: &mut HashMap<String, Mark>,
    stack: &mut Vec<String>,
    order: &mut Vec<String>,
) -> Result<(), GraphError> {
    match marks.get(id) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::InProgress) => {
            let start = stack.iter().position(|s| s == id).unwrap_or(0);
            let mut chain: Vec<String> = stack.get(start..).unwrap_or_default().to_vec();
            chain.push(id.to_string());
            return Err(GraphError::Cycle {
                step: id.to_string(),
                chain,
            });
        }
        None => {}
    }
    let Some(step) = steps.get(id) else {
        return Ok(());
    };

    marks.insert(id.to_string(), Mark::InProgress);
    stack.push(id.to_string());
    for dep in &step.dependencies {
        if universe.contains(dep) {
            visit(dep, steps, universe, marks, stack, order)?;
        }
    }
    stack.pop();
    marks.insert(id.to_string(), Mark::Done);
    order.push(id.to_string());
    Ok(())
}

/// Selected ids plus every discovered transitive dependency, and the
/// dependencies alone in the order they were first reached.
fn selection_closure(
    steps: &StepSet,
    selected: &[String],
) -> Result<(HashSet<String>, Vec<String>), GraphError> {
    if let Some(unknown) = selected.iter().find(|id| !steps.contains(id)) {
        return Err(GraphError::UnknownStep(unknown.clone()));
    }

    let mut universe: HashSet<String> = selected.iter().cloned().collect();
    let mut auto_included = Vec::new();
    let mut pending: Vec<&str> = selected.iter().map(String::as_str).collect();
    pending.reverse();

    while let Some(id) = pending.pop() {
        let Some(step) = steps.get(id) else {
            continue;
        };
        for dep in step.dependencies.iter().rev() {
            if steps.contains(dep) && universe.insert(dep.clone()) {
                auto_included.push(dep.clone());
                pending.push(dep);
            }
        }
    }
    Ok((universe, auto_included))
}
