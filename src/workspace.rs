//! Workspace staging.
//!
//! Each run of a test case executes against an isolated copy of the case's
//! source tree under the results root, never against the original. The copy
//! mirrors the case's path relative to the test root, so distinct cases can
//! never collide. The staged tree is left behind for post-mortem inspection.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::descriptor::TestType;
use crate::diagnostics::HarnessError;
use crate::discovery::TestCase;

/// A staged copy of one test case, owned exclusively by the run that made it.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Root of the staged copy.
    pub root: PathBuf,
}

impl Workspace {
    /// The per-type directory: execute-stage cwd, home of baseline, actual
    /// output, and include files.
    pub fn active_dir(&self, test_type: TestType) -> PathBuf {
        self.root.join(test_type.dir_name())
    }
}

/// Clones the case's tree to `<resultsRoot>/<relativePath>`.
///
/// A previous staged copy is removed first so every run starts from the
/// canonical sources. If the removal fails transiently the copy proceeds over
/// the old tree instead; stale generated files are then cleaned selectively
/// by the per-type delete lists.
pub fn stage(
    case: &TestCase,
    test_root: &Path,
    results_root: &Path,
) -> Result<Workspace, HarnessError> {
    let relative = case.source_dir.strip_prefix(test_root).map_err(|_| {
        HarnessError::internal(format!(
            "test case {} lies outside the test root {}",
            case.source_dir.display(),
            test_root.display()
        ))
    })?;
    let destination = results_root.join(relative);

    if destination.exists() {
        if let Err(e) = fs::remove_dir_all(&destination) {
            warn!(
                path = %destination.display(),
                error = %e,
                "could not remove previous staged copy; overwriting in place"
            );
        }
    }
    deep_copy(&case.source_dir, &destination)?;
    Ok(Workspace { root: destination })
}

/// Recursively copies `src` into `dst`, overwriting files that exist.
pub fn deep_copy(src: &Path, dst: &Path) -> Result<(), HarnessError> {
    for entry in WalkDir::new(src) {
        let entry =
            entry.map_err(|e| HarnessError::internal(format!("failed to walk {}: {e}", src.display())))?;
        let relative = entry.path().strip_prefix(src).map_err(|_| {
            HarnessError::internal(format!(
                "walked entry {} escapes {}",
                entry.path().display(),
                src.display()
            ))
        })?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| HarnessError::io(&target, e))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| HarnessError::io(parent, e))?;
            }
            fs::copy(entry.path(), &target).map_err(|e| HarnessError::io(&target, e))?;
        }
    }
    Ok(())
}

/// Removes the stale files a descriptor asks to clear before a run.
pub fn apply_deletes(active_dir: &Path, deletes: &[String]) -> Result<(), HarnessError> {
    for name in deletes {
        let path = active_dir.join(name);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| HarnessError::io(&path, e))?;
        }
    }
    Ok(())
}
