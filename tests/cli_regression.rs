//! CLI regression: argument validation, structured errors, and an
//! end-to-end run against a fake compiler.

mod common;

use assert_cmd::Command;
use predicates::str::contains;

use common::make_case;

fn regatta() -> Command {
    Command::cargo_bin("regatta").expect("harness binary")
}

#[test]
fn unknown_flag_hits_the_single_usage_path() {
    regatta()
        .arg("run")
        .arg("--bogus")
        .assert()
        .failure()
        .stderr(contains("Usage"));
}

#[test]
fn missing_test_root_is_a_structured_error() {
    regatta()
        .arg("run")
        .arg("--test-root")
        .arg("/definitely/not/a/test/tree")
        .assert()
        .code(2)
        .stderr(contains("invalid configuration"));
}

#[test]
fn zero_jobs_is_rejected_before_anything_runs() {
    let dir = tempfile::tempdir().expect("tempdir");
    regatta()
        .arg("run")
        .arg("--test-root")
        .arg(dir.path())
        .arg("--jobs")
        .arg("0")
        .assert()
        .code(2)
        .stderr(contains("jobs must be at least 1"));
}

#[test]
fn list_prints_discovered_cases() {
    let dir = tempfile::tempdir().expect("tempdir");
    make_case(
        dir.path(),
        "Correctness",
        "ping",
        &[("CompileOnly", "description: compiles", None)],
    );

    regatta()
        .arg("list")
        .arg("--test-root")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(contains("ping [CompileOnly]"))
        .stdout(contains("1 test cases"));
}

#[cfg(unix)]
mod end_to_end {
    use super::*;
    use crate::common::{write_file, write_script, PASSING_COMPILE_BASELINE};
    use std::fs;

    #[test]
    fn compile_only_suite_passes_fails_and_rebaselines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let case_dir = make_case(
            dir.path(),
            "Correctness",
            "ping",
            &[(
                "CompileOnly",
                "description: compiles",
                Some(PASSING_COMPILE_BASELINE),
            )],
        );
        let compiler = write_script(dir.path(), "fake-micac", "exit 0");

        // Passing run.
        regatta()
            .arg("run")
            .arg("--test-root")
            .arg(dir.path())
            .arg("--compiler")
            .arg(&compiler)
            .arg("--no-color")
            .assert()
            .success()
            .stdout(contains("PASS ping :: CompileOnly"))
            .stdout(contains("1 cases, 1 passed, 0 failed"));

        // Drifted baseline: the run fails and leaves diffing breadcrumbs.
        let baseline = case_dir.join("CompileOnly").join("acc_0.txt");
        write_file(&baseline, "EXIT: 1\n");
        regatta()
            .arg("run")
            .arg("--test-root")
            .arg(dir.path())
            .arg("--compiler")
            .arg(&compiler)
            .arg("--no-color")
            .assert()
            .code(1)
            .stdout(contains("FAIL ping :: CompileOnly"))
            .stdout(contains("diff commands logged to"));

        let results_root = dir.path().join("TestResult_Debug_x64");
        let diff_log = fs::read_to_string(results_root.join("display-diffs.log"))
            .expect("diff log written");
        assert!(diff_log.contains("acc_0.txt"));
        assert!(diff_log.contains("actual_0.txt"));
        let summary =
            fs::read_to_string(results_root.join("results.json")).expect("results.json written");
        assert!(summary.contains("\"failed\": 1"));

        // Rebaseline, then a clean run again.
        regatta()
            .arg("run")
            .arg("--test-root")
            .arg(dir.path())
            .arg("--compiler")
            .arg(&compiler)
            .arg("--reset")
            .arg("--no-color")
            .assert()
            .success()
            .stdout(contains("RESET ping :: CompileOnly"));
        assert_eq!(
            fs::read_to_string(&baseline).expect("rewritten baseline"),
            PASSING_COMPILE_BASELINE
        );

        regatta()
            .arg("run")
            .arg("--test-root")
            .arg(dir.path())
            .arg("--compiler")
            .arg(&compiler)
            .arg("--no-color")
            .assert()
            .success()
            .stdout(contains("PASS ping :: CompileOnly"));
    }

    #[test]
    fn unresolvable_compiler_is_reported_with_searched_locations() {
        let dir = tempfile::tempdir().expect("tempdir");
        make_case(
            dir.path(),
            "Correctness",
            "ping",
            &[(
                "CompileOnly",
                "description: compiles",
                Some(PASSING_COMPILE_BASELINE),
            )],
        );

        regatta()
            .arg("run")
            .arg("--test-root")
            .arg(dir.path())
            .arg("--compiler")
            .arg("no-such-compiler-xyzzy")
            .assert()
            .code(2)
            .stderr(contains("no-such-compiler-xyzzy"))
            .stderr(contains("PATH"));
    }
}
