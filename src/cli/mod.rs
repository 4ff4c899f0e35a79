//! The regatta command-line interface.
//!
//! Parses arguments, assembles and validates the immutable run
//! configuration, and dispatches to the library. All invalid input funnels
//! through one structured-error path; infrastructure failures are rendered
//! as miette reports.

use std::process;
use std::time::Duration;

use clap::Parser;

use crate::compiler::{CommandCompiler, CompilerService};
use crate::config::{default_results_root, HarnessConfig};
use crate::descriptor::TestType;
use crate::diagnostics::HarnessError;
use crate::discovery::Discovery;
use crate::report;
use crate::runner;

pub mod args;

use crate::cli::args::{Command, ListArgs, RegattaArgs, RunArgs};

/// The main entry point for the CLI. Exits the process.
pub fn run() {
    let args = RegattaArgs::parse();

    let result = match args.command {
        Command::Run(run_args) => handle_run(run_args),
        Command::List(list_args) => handle_list(list_args),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            report_error(e);
            process::exit(2);
        }
    }
}

/// Prints a HarnessError with full miette diagnostics.
fn report_error(error: HarnessError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}

fn handle_run(args: RunArgs) -> Result<i32, HarnessError> {
    let config = config_from_args(args);
    config.validate()?;

    let factory = || -> Result<Box<dyn CompilerService>, HarnessError> {
        Ok(Box::new(CommandCompiler::from_config(&config)?))
    };
    let suite = runner::run_suite(&config, &factory)?;

    report::print(&suite, &config)
        .map_err(|e| HarnessError::internal(format!("failed to write report: {e}")))?;
    report::write_json(&suite, &config.results_root.join(report::RESULTS_FILE))?;

    Ok(if suite.is_success() { 0 } else { 1 })
}

fn handle_list(args: ListArgs) -> Result<i32, HarnessError> {
    let results_root = default_results_root(&args.test_root, "Debug", "x64");
    let cases = Discovery::new(&args.test_root)
        .exclude(results_root)
        .cases()?;
    for case in &cases {
        let types: Vec<&str> = case.configs.keys().map(|ty| ty.dir_name()).collect();
        println!("{} [{}]", case.name, types.join(", "));
    }
    println!("{} test cases", cases.len());
    Ok(0)
}

fn config_from_args(args: RunArgs) -> HarnessConfig {
    let results_root = args.results_root.unwrap_or_else(|| {
        default_results_root(&args.test_root, &args.configuration, &args.platform)
    });
    let types = if args.types.is_empty() {
        TestType::ALL.to_vec()
    } else {
        args.types
    };
    let mut config = HarnessConfig::new(args.test_root);
    config.results_root = results_root;
    config.configuration = args.configuration;
    config.platform = args.platform;
    config.drop_root = args.drop_root;
    config.tools.compiler = args.compiler;
    config.types = types;
    config.reset = args.reset;
    config.jobs = args.jobs;
    config.tool_timeout = args.timeout.map(Duration::from_secs);
    config.use_colors = !args.no_color && atty::is(atty::Stream::Stdout);
    config
}
