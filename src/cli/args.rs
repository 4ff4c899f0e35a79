//! Defines the command-line arguments and subcommands for the regatta CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::descriptor::TestType;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "regatta",
    version,
    about = "Regression harness for the mica compiler backends."
)]
pub struct RegattaArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Discover, stage, and execute the regression suite.
    Run(RunArgs),
    /// List the discovered test cases without running anything.
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Root directory of the test tree.
    #[arg(long, default_value = "Tst")]
    pub test_root: PathBuf,

    /// Where staged copies are written; defaults to
    /// TestResult_<configuration>_<platform> under the test root.
    #[arg(long)]
    pub results_root: Option<PathBuf>,

    /// Test types to run, comma separated; defaults to all of them.
    #[arg(long, value_delimiter = ',')]
    pub types: Vec<TestType>,

    /// Overwrite baselines with actual output instead of failing.
    #[arg(long)]
    pub reset: bool,

    /// Worker threads; each gets its own compiler instance.
    #[arg(long, default_value_t = 1)]
    pub jobs: usize,

    /// Build configuration for drop-path resolution and tester output.
    #[arg(long, default_value = "Debug")]
    pub configuration: String,

    /// Build platform for drop-path resolution and tester output.
    #[arg(long, default_value = "x64")]
    pub platform: String,

    /// Compiler executable under test.
    #[arg(long, default_value = "micac")]
    pub compiler: String,

    /// Root of the toolchain drop tree, searched before PATH.
    #[arg(long)]
    pub drop_root: Option<PathBuf>,

    /// Kill an external tool after this many seconds; unbounded if unset.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Root directory of the test tree.
    #[arg(long, default_value = "Tst")]
    pub test_root: PathBuf,
}
