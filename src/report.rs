//! Result reporting: console summary and machine-readable output.
//!
//! One colored line per executed (case, type) pair, inline diffs for
//! mismatches, a summary, and a `results.json` blob in the results root.
//! Infrastructure failures are reported distinctly from product regressions.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use difference::{Changeset, Difference};
use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::baseline::TypeOutcome;
use crate::config::HarnessConfig;
use crate::descriptor::TestType;
use crate::diagnostics::HarnessError;
use crate::runner::SuiteReport;

/// Machine-readable summary file written into the results root.
pub const RESULTS_FILE: &str = "results.json";

/// Prints the per-case outcomes and the suite summary to stdout.
pub fn print(report: &SuiteReport, config: &HarnessConfig) -> io::Result<()> {
    let choice = if config.use_colors {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut out = StandardStream::stdout(choice);

    for case in &report.cases {
        for (test_type, outcome) in &case.outcomes {
            match outcome {
                TypeOutcome::Passed => {
                    tag(&mut out, "PASS", Color::Green)?;
                    writeln!(out, " {} :: {}", case.name, test_type)?;
                }
                TypeOutcome::Rebaselined => {
                    tag(&mut out, "RESET", Color::Yellow)?;
                    writeln!(out, " {} :: {} (baseline rewritten)", case.name, test_type)?;
                }
                TypeOutcome::Mismatch { expected, actual } => {
                    tag(&mut out, "FAIL", Color::Red)?;
                    writeln!(out, " {} :: {} (baseline mismatch)", case.name, test_type)?;
                    print_diff(&mut out, expected, actual)?;
                }
            }
        }
        if let Some(infra) = &case.infra {
            tag(&mut out, "ERROR", Color::Red)?;
            writeln!(out, " {}: {}", case.name, infra)?;
        }
    }

    writeln!(
        out,
        "\nsuite summary: {} cases, {} passed, {} failed, {} rebaselined, {} infrastructure errors",
        report.cases.len(),
        report.passed(),
        report.mismatched(),
        report.rebaselined(),
        report.infra_failures(),
    )?;
    if report.mismatched() > 0 {
        writeln!(out, "diff commands logged to {}", report.diff_log.display())?;
    }
    Ok(())
}

fn tag(out: &mut StandardStream, label: &str, color: Color) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{label}")?;
    out.reset()
}

/// Line diff of a mismatch: `-` baseline lines, `+` actual lines.
fn print_diff(out: &mut StandardStream, expected: &str, actual: &str) -> io::Result<()> {
    let changeset = Changeset::new(expected, actual, "\n");
    for diff in &changeset.diffs {
        match diff {
            Difference::Same(block) => {
                for line in block.lines() {
                    writeln!(out, "      {line}")?;
                }
            }
            Difference::Rem(block) => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
                for line in block.lines() {
                    writeln!(out, "    - {line}")?;
                }
                out.reset()?;
            }
            Difference::Add(block) => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                for line in block.lines() {
                    writeln!(out, "    + {line}")?;
                }
                out.reset()?;
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    cases: usize,
    passed: usize,
    failed: usize,
    rebaselined: usize,
    infrastructure_errors: usize,
    results: Vec<JsonCase<'a>>,
}

#[derive(Serialize)]
struct JsonCase<'a> {
    name: &'a str,
    outcomes: Vec<JsonOutcome<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    infrastructure_error: Option<&'a str>,
}

#[derive(Serialize)]
struct JsonOutcome<'a> {
    test_type: TestType,
    outcome: &'a str,
}

/// Writes the machine-readable run summary.
pub fn write_json(report: &SuiteReport, path: &Path) -> Result<(), HarnessError> {
    let summary = JsonSummary {
        cases: report.cases.len(),
        passed: report.passed(),
        failed: report.mismatched(),
        rebaselined: report.rebaselined(),
        infrastructure_errors: report.infra_failures(),
        results: report
            .cases
            .iter()
            .map(|case| JsonCase {
                name: &case.name,
                outcomes: case
                    .outcomes
                    .iter()
                    .map(|(test_type, outcome)| JsonOutcome {
                        test_type: *test_type,
                        outcome: match outcome {
                            TypeOutcome::Passed => "passed",
                            TypeOutcome::Rebaselined => "rebaselined",
                            TypeOutcome::Mismatch { .. } => "failed",
                        },
                    })
                    .collect(),
                infrastructure_error: case.infra.as_deref(),
            })
            .collect(),
    };
    let text = serde_json::to_string_pretty(&summary)
        .map_err(|e| HarnessError::internal(format!("failed to encode run summary: {e}")))?;
    fs::write(path, text).map_err(|e| HarnessError::io(path, e))
}
