//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use regatta::compiler::{CompileRequest, CompilerService, LinkRequest};
use regatta::config::HarnessConfig;
use regatta::diagnostics::HarnessError;
use regatta::discovery::{Discovery, TestCase};
use regatta::transcript::Transcript;
use regatta::workspace::{self, Workspace};

/// Baseline for a CompileOnly pipeline whose compile succeeds silently.
pub const PASSING_COMPILE_BASELINE: &str =
    "=================================\n         Console output          \n=================================\nEXIT: 0\n";

/// Writes a file, creating parent directories as needed.
pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture directory");
    }
    fs::write(path, contents).expect("write fixture file");
}

/// Lays out one test case: a source program plus, per entry, a test-type
/// subdirectory with its descriptor and optional baseline.
pub fn make_case(
    test_root: &Path,
    category: &str,
    name: &str,
    types: &[(&str, &str, Option<&str>)],
) -> PathBuf {
    let case_dir = test_root.join(category).join(name);
    write_file(
        &case_dir.join(format!("{name}.mica")),
        "machine Main { start state Init { } }\n",
    );
    for (type_dir, descriptor, baseline) in types {
        write_file(&case_dir.join(type_dir).join("testconfig.yaml"), descriptor);
        if let Some(baseline) = baseline {
            write_file(&case_dir.join(type_dir).join("acc_0.txt"), baseline);
        }
    }
    case_dir
}

/// Discovers the fixture tree and stages the named case.
pub fn discover_and_stage(config: &HarnessConfig, name: &str) -> (TestCase, Workspace) {
    fs::create_dir_all(&config.results_root).expect("create results root");
    let cases = Discovery::new(&config.test_root)
        .exclude(&config.results_root)
        .cases()
        .expect("discovery should succeed");
    let case = cases
        .into_iter()
        .find(|case| case.name == name)
        .expect("fixture case should be discovered");
    let workspace =
        workspace::stage(&case, &config.test_root, &config.results_root).expect("staging");
    (case, workspace)
}

/// In-memory compiler double with queued per-stage results.
///
/// Stages default to success once the queues run dry; `emits` are written
/// into the output directory on every successful compile, standing in for
/// generated backend artifacts.
pub struct ScriptedCompiler {
    pub compile_results: VecDeque<bool>,
    pub link_results: VecDeque<bool>,
    pub emits: Vec<(String, String)>,
    /// Console output the fake compiler prints while compiling.
    pub compile_output: Option<String>,
    pub compile_calls: usize,
    pub link_calls: usize,
}

impl ScriptedCompiler {
    pub fn succeeding() -> Self {
        Self {
            compile_results: VecDeque::new(),
            link_results: VecDeque::new(),
            emits: Vec::new(),
            compile_output: None,
            compile_calls: 0,
            link_calls: 0,
        }
    }

    pub fn failing_compile() -> Self {
        let mut compiler = Self::succeeding();
        compiler.compile_results.push_back(false);
        compiler
    }

    pub fn failing_link() -> Self {
        let mut compiler = Self::succeeding();
        compiler.link_results.push_back(false);
        compiler
    }

    pub fn with_emits(mut self, emits: &[(&str, &str)]) -> Self {
        self.emits = emits
            .iter()
            .map(|(name, contents)| (name.to_string(), contents.to_string()))
            .collect();
        self
    }
}

impl CompilerService for ScriptedCompiler {
    fn compile(
        &mut self,
        request: &CompileRequest,
        transcript: &mut Transcript,
    ) -> Result<bool, HarnessError> {
        self.compile_calls += 1;
        if let Some(output) = &self.compile_output {
            transcript.raw(output);
        }
        let ok = self.compile_results.pop_front().unwrap_or(true);
        if ok {
            for (name, contents) in &self.emits {
                write_file(&request.output_dir.join(name), contents);
            }
        }
        Ok(ok)
    }

    fn link(
        &mut self,
        _request: &LinkRequest,
        _transcript: &mut Transcript,
    ) -> Result<bool, HarnessError> {
        self.link_calls += 1;
        Ok(self.link_results.pop_front().unwrap_or(true))
    }
}

/// Drops an executable `/bin/sh` script into `dir` and returns its path.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write fixture script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("mark script executable");
    path
}
