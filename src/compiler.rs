//! The seam to the compiler under test.
//!
//! The harness drives the compiler through [`CompilerService`]: boolean
//! success or failure, console output streamed into the transcript, no exit
//! codes. The default implementation shells out to the `micac` executable.
//!
//! A service instance may carry mutable state between calls, so concurrent
//! pipelines must never share one; the runner builds one instance per pool
//! worker from a factory.

use std::path::PathBuf;

use crate::config::HarnessConfig;
use crate::diagnostics::HarnessError;
use crate::tools::{self, ToolRunner};
use crate::transcript::Transcript;

/// Which target artifact a compile request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Native,
    Interop,
    ModelIr,
}

impl Backend {
    pub fn flag(self) -> &'static str {
        match self {
            Backend::Native => "native",
            Backend::Interop => "interop",
            Backend::ModelIr => "model",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompileRequest {
    /// Every source file of the case; the first entry is the primary input.
    pub sources: Vec<PathBuf>,
    pub output_dir: PathBuf,
    /// Link-unit file the compiler writes, derived from the primary source.
    pub unit: PathBuf,
    pub backend: Backend,
    /// Liveness checking, meaningful for the model-checker backend only.
    pub liveness: bool,
}

#[derive(Debug, Clone)]
pub struct LinkRequest {
    pub unit: PathBuf,
    /// Optional per-test link file from the descriptor.
    pub link_file: Option<PathBuf>,
    pub output_dir: PathBuf,
}

/// Boolean-success contract with the compiler.
///
/// Console output lands in the transcript; `Ok(false)` is an expected
/// compile/link failure, `Err` an infrastructure failure.
pub trait CompilerService: Send {
    fn compile(
        &mut self,
        request: &CompileRequest,
        transcript: &mut Transcript,
    ) -> Result<bool, HarnessError>;

    fn link(
        &mut self,
        request: &LinkRequest,
        transcript: &mut Transcript,
    ) -> Result<bool, HarnessError>;
}

/// Default service: drives the compiler executable and maps exit 0 to
/// success. Everything the compiler prints is captured into the transcript.
pub struct CommandCompiler {
    executable: PathBuf,
    runner: ToolRunner,
}

impl CommandCompiler {
    pub fn from_config(config: &HarnessConfig) -> Result<Self, HarnessError> {
        let executable = tools::resolve_tool(config, &config.tools.compiler)?;
        Ok(Self {
            executable,
            runner: ToolRunner::new(config.tool_timeout),
        })
    }
}

impl CompilerService for CommandCompiler {
    fn compile(
        &mut self,
        request: &CompileRequest,
        transcript: &mut Transcript,
    ) -> Result<bool, HarnessError> {
        let mut args: Vec<String> = request
            .sources
            .iter()
            .map(|source| source.display().to_string())
            .collect();
        args.push(format!("-outputDir:{}", request.output_dir.display()));
        args.push(format!("-unit:{}", request.unit.display()));
        args.push(format!("-backend:{}", request.backend.flag()));
        if request.liveness {
            args.push("-liveness".to_string());
        }
        let output = self.runner.run(&self.executable, &request.output_dir, &args)?;
        transcript.raw(&output.stdout);
        transcript.raw(&output.stderr);
        Ok(output.succeeded())
    }

    fn link(
        &mut self,
        request: &LinkRequest,
        transcript: &mut Transcript,
    ) -> Result<bool, HarnessError> {
        let mut args = vec![
            "-link".to_string(),
            format!("-unit:{}", request.unit.display()),
            format!("-outputDir:{}", request.output_dir.display()),
        ];
        if let Some(link_file) = &request.link_file {
            args.push(link_file.display().to_string());
        }
        let output = self.runner.run(&self.executable, &request.output_dir, &args)?;
        transcript.raw(&output.stdout);
        transcript.raw(&output.stderr);
        Ok(output.succeeded())
    }
}
