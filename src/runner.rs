//! Suite orchestration.
//!
//! Discovers cases, stages each into its own workspace, runs the configured
//! pipelines sequentially within a case, and records one outcome per
//! (case, type). Independent cases may run on a worker pool; every worker
//! owns its own compiler instance, and the only shared writer is the
//! lock-guarded diff log.

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::baseline::{self, DiffLog, TypeOutcome, DIFF_LOG_FILE};
use crate::compiler::CompilerService;
use crate::config::HarnessConfig;
use crate::descriptor::{TestConfig, TestType};
use crate::diagnostics::HarnessError;
use crate::discovery::{Discovery, TestCase};
use crate::pipeline::PipelineExecutor;
use crate::workspace;

/// Builds one `CompilerService` per pool worker.
pub type CompilerFactory<'a> =
    &'a (dyn Fn() -> Result<Box<dyn CompilerService>, HarnessError> + Sync);

/// Recorded result of one test case.
#[derive(Debug)]
pub struct CaseReport {
    pub name: String,
    pub outcomes: Vec<(TestType, TypeOutcome)>,
    /// Rendered infrastructure failure that aborted the case's remaining
    /// test types, if any.
    pub infra: Option<String>,
}

#[derive(Debug)]
pub struct SuiteReport {
    /// Per-case reports, sorted by case name.
    pub cases: Vec<CaseReport>,
    pub diff_log: PathBuf,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.count(|outcome| matches!(outcome, TypeOutcome::Passed))
    }

    pub fn mismatched(&self) -> usize {
        self.count(|outcome| matches!(outcome, TypeOutcome::Mismatch { .. }))
    }

    pub fn rebaselined(&self) -> usize {
        self.count(|outcome| matches!(outcome, TypeOutcome::Rebaselined))
    }

    pub fn infra_failures(&self) -> usize {
        self.cases.iter().filter(|case| case.infra.is_some()).count()
    }

    pub fn is_success(&self) -> bool {
        self.mismatched() == 0 && self.infra_failures() == 0
    }

    fn count(&self, predicate: impl Fn(&TypeOutcome) -> bool) -> usize {
        self.cases
            .iter()
            .flat_map(|case| case.outcomes.iter())
            .filter(|(_, outcome)| predicate(outcome))
            .count()
    }
}

/// Runs the whole suite under `config`.
pub fn run_suite(
    config: &HarnessConfig,
    factory: CompilerFactory<'_>,
) -> Result<SuiteReport, HarnessError> {
    if config.results_root.exists() {
        fs::remove_dir_all(&config.results_root)
            .map_err(|e| HarnessError::io(&config.results_root, e))?;
    }
    fs::create_dir_all(&config.results_root)
        .map_err(|e| HarnessError::io(&config.results_root, e))?;

    let cases = Discovery::new(&config.test_root)
        .exclude(&config.results_root)
        .cases()?;
    info!(count = cases.len(), root = %config.test_root.display(), "discovered test cases");

    let diff_log = DiffLog::create(config.results_root.join(DIFF_LOG_FILE))?;

    let mut reports = if config.jobs <= 1 || cases.len() <= 1 {
        let mut compiler = factory()?;
        cases
            .iter()
            .map(|case| run_case(config, compiler.as_mut(), &diff_log, case))
            .collect()
    } else {
        run_pooled(config, factory, &diff_log, &cases)?
    };
    reports.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(SuiteReport {
        cases: reports,
        diff_log: diff_log.path().to_path_buf(),
    })
}

/// Fans the cases out over `config.jobs` workers.
fn run_pooled(
    config: &HarnessConfig,
    factory: CompilerFactory<'_>,
    diff_log: &DiffLog,
    cases: &[TestCase],
) -> Result<Vec<CaseReport>, HarnessError> {
    let workers = config.jobs.min(cases.len());
    // Constructed up front so a broken toolchain fails the run before any
    // case starts.
    let mut compilers = Vec::with_capacity(workers);
    for _ in 0..workers {
        compilers.push(factory()?);
    }

    let queue: Mutex<VecDeque<&TestCase>> = Mutex::new(cases.iter().collect());
    let reports: Mutex<Vec<CaseReport>> = Mutex::new(Vec::with_capacity(cases.len()));
    let queue = &queue;
    let reports = &reports;

    thread::scope(|scope| {
        for mut compiler in compilers {
            scope.spawn(move || loop {
                let Some(case) = queue.lock().pop_front() else {
                    break;
                };
                let report = run_case(config, compiler.as_mut(), diff_log, case);
                reports.lock().push(report);
            });
        }
    });

    let collected = reports.lock().drain(..).collect();
    Ok(collected)
}

/// Runs every configured test type of one case against a fresh workspace.
/// An infrastructure failure aborts the case's remaining types; a baseline
/// mismatch does not.
fn run_case(
    config: &HarnessConfig,
    compiler: &mut dyn CompilerService,
    diff_log: &DiffLog,
    case: &TestCase,
) -> CaseReport {
    let mut outcomes = Vec::new();

    let workspace = match workspace::stage(case, &config.test_root, &config.results_root) {
        Ok(workspace) => workspace,
        Err(e) => {
            return CaseReport {
                name: case.name.clone(),
                outcomes,
                infra: Some(e.to_string()),
            }
        }
    };

    let mut infra = None;
    for (test_type, test_config) in &case.configs {
        if !config.types.contains(test_type) {
            continue;
        }
        info!(
            case = %case.name,
            test_type = %test_type,
            description = %test_config.description,
            "running pipeline"
        );
        if let Err(e) = run_type(
            config,
            compiler,
            diff_log,
            case,
            &workspace,
            *test_type,
            test_config,
            &mut outcomes,
        ) {
            infra = Some(e.to_string());
            break;
        }
    }

    CaseReport {
        name: case.name.clone(),
        outcomes,
        infra,
    }
}

#[allow(clippy::too_many_arguments)]
fn run_type(
    config: &HarnessConfig,
    compiler: &mut dyn CompilerService,
    diff_log: &DiffLog,
    case: &TestCase,
    workspace: &workspace::Workspace,
    test_type: TestType,
    test_config: &TestConfig,
    outcomes: &mut Vec<(TestType, TypeOutcome)>,
) -> Result<(), HarnessError> {
    workspace::apply_deletes(&workspace.active_dir(test_type), &test_config.deletes)?;

    let mut executor = PipelineExecutor::new(config, compiler);
    let transcript = executor.run(case, workspace, test_type, test_config)?;
    debug!(
        case = %case.name,
        test_type = %test_type,
        transcript = %transcript.as_str(),
        "pipeline transcript"
    );

    let outcome = baseline::check(config, diff_log, case, workspace, test_type, &transcript)?;
    outcomes.push((test_type, outcome));
    Ok(())
}
