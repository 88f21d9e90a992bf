//! Turn a directory tree of step folders into [`Step`] records.
use std::fs;
use std::path::{Path, PathBuf};

use super::validation::ValidationWarning;
use super::{Step, StepDescriptor, StepSet};
use crate::error::DiscoveryError;

/// Descriptor file that marks a directory as a step.
pub const STEP_FILE: &str = "step.json";

/// Result of scanning a steps directory.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Valid steps in discovery order.
    pub steps: StepSet,
    /// Directories excluded from the run, with the reason.
    pub warnings: Vec<ValidationWarning>,
}

/// Scan `root` for step directories.
///
/// A directory containing `step.json` is a step and is not searched further;
/// any other non-hidden directory is descended into. Entries are visited in
/// sorted order. Invalid descriptors and repeated ids are excluded and
/// reported in [`Discovery::warnings`]; the first directory seen for an id
/// keeps it.
///
/// # Errors
///
/// Returns an error if `root` is missing or a directory cannot be listed.
pub fn discover_steps(root: &Path) -> Result<Discovery, DiscoveryError> {
    if !root.is_dir() {
        return Err(DiscoveryError::RootMissing(root.to_path_buf()));
    }

    let mut candidates = Vec::new();
    collect_step_dirs(root, &mut candidates)?;

    let mut steps: Vec<Step> = Vec::new();
    let mut warnings = Vec::new();

    for dir in candidates {
        let descriptor_path = dir.join(STEP_FILE);
        let step = match load_descriptor(&descriptor_path) {
            Ok(descriptor) => Step::from_descriptor(&dir, descriptor),
            Err(e) => {
                warnings.push(ValidationWarning::new(
                    descriptor_path.display().to_string(),
                    dir_name(&dir),
                    format!("step excluded: {e}"),
                ));
                continue;
            }
        };

        if let Some(first) = steps.iter().find(|s| s.id == step.id) {
            warnings.push(ValidationWarning::new(
                descriptor_path.display().to_string(),
                &step.id,
                format!(
                    "duplicate step id; already defined by {}",
                    first.dir.display()
                ),
            ));
            continue;
        }
        steps.push(step);
    }

    Ok(Discovery {
        steps: StepSet::new(steps),
        warnings,
    })
}

/// Parse one `step.json`.
///
/// # Errors
///
/// Returns [`DiscoveryError::Io`] if the file cannot be read and
/// [`DiscoveryError::InvalidDescriptor`] if it does not match the schema.
pub fn load_descriptor(path: &Path) -> Result<StepDescriptor, DiscoveryError> {
    let content = fs::read_to_string(path).map_err(|source| DiscoveryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| DiscoveryError::InvalidDescriptor {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn collect_step_dirs(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), DiscoveryError> {
    let io_err = |source| DiscoveryError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut children: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_err)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter(|p| !dir_name(p).starts_with('.'))
        .collect();
    children.sort();

    for child in children {
        if child.join(STEP_FILE).is_file() {
            out.push(child);
        } else {
            collect_step_dirs(&child, out)?;
        }
    }
    Ok(())
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
