//! Baseline comparison and rebaseline.
//!
//! The stored baseline (`acc_0.txt`) and the actual transcript are both
//! newline-canonicalized, then compared byte for byte. In reset mode a
//! mismatch rewrites the baseline under the original test directory; in
//! normal mode it persists the actual output beside the staged baseline and
//! appends a ready-made diff command to the shared log.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::HarnessConfig;
use crate::descriptor::TestType;
use crate::diagnostics::HarnessError;
use crate::discovery::TestCase;
use crate::transcript::{normalize_newlines, Transcript};
use crate::workspace::Workspace;

/// Conventional name of the stored baseline ("acceptor").
pub const BASELINE_FILE: &str = "acc_0.txt";
/// Actual transcript persisted beside the baseline on mismatch.
pub const ACTUAL_FILE: &str = "actual_0.txt";
/// Shared log of diff commands, one line per mismatch across the run.
pub const DIFF_LOG_FILE: &str = "display-diffs.log";

/// Outcome of checking one (case, type) transcript. Mismatch is a recorded
/// outcome, never an error: the run continues.
#[derive(Debug, Clone)]
pub enum TypeOutcome {
    Passed,
    Rebaselined,
    Mismatch { expected: String, actual: String },
}

/// The shared diff-command log. The single cross-case writer, so appends are
/// serialized behind a lock.
#[derive(Debug)]
pub struct DiffLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl DiffLog {
    /// Creates (truncating) the log file for this run.
    pub fn create(path: PathBuf) -> Result<Self, HarnessError> {
        let file = File::create(&path).map_err(|e| HarnessError::io(&path, e))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one `difftool <baseline> <actual>` invocation.
    pub fn append(
        &self,
        diff_tool: &str,
        baseline: &Path,
        actual: &Path,
    ) -> Result<(), HarnessError> {
        let mut file = self.file.lock();
        writeln!(
            file,
            "{} {} {}",
            diff_tool,
            baseline.display(),
            actual.display()
        )
        .map_err(|e| HarnessError::io(&self.path, e))
    }
}

/// Checks a finished transcript against the baseline for `test_type`.
///
/// Reads the baseline from the staged copy; reset-mode rewrites target the
/// original test directory so they survive the next staging.
pub fn check(
    config: &HarnessConfig,
    diff_log: &DiffLog,
    case: &TestCase,
    workspace: &Workspace,
    test_type: TestType,
    transcript: &Transcript,
) -> Result<TypeOutcome, HarnessError> {
    let active = workspace.active_dir(test_type);
    let baseline_path = active.join(BASELINE_FILE);
    let actual = transcript.normalized();

    if config.reset {
        // A baseline that does not exist yet reads as empty and gets created.
        let stored = match fs::read_to_string(&baseline_path) {
            Ok(text) => normalize_newlines(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(HarnessError::io(&baseline_path, e)),
        };
        if stored == actual {
            return Ok(TypeOutcome::Passed);
        }
        let target = case
            .source_dir
            .join(test_type.dir_name())
            .join(BASELINE_FILE);
        fs::write(&target, &actual).map_err(|e| HarnessError::io(&target, e))?;
        return Ok(TypeOutcome::Rebaselined);
    }

    let stored = match fs::read_to_string(&baseline_path) {
        Ok(text) => normalize_newlines(&text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(HarnessError::MissingBaseline {
                path: baseline_path,
            })
        }
        Err(e) => return Err(HarnessError::io(&baseline_path, e)),
    };
    if stored == actual {
        return Ok(TypeOutcome::Passed);
    }

    let actual_path = active.join(ACTUAL_FILE);
    fs::write(&actual_path, &actual).map_err(|e| HarnessError::io(&actual_path, e))?;
    diff_log.append(&config.tools.diff_tool, &baseline_path, &actual_path)?;
    Ok(TypeOutcome::Mismatch {
        expected: stored,
        actual,
    })
}
