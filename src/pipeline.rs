//! Per-backend execution pipelines.
//!
//! Each test type runs a fixed, linear stage sequence against the staged
//! workspace. Compile and link report boolean success through the compiler
//! seam; their failure is expected data (`EXIT: -1`) that skips the dependent
//! stages. Secondary toolchains building harness-generated input must always
//! succeed, so their nonzero exits raise infrastructure failures. Executed
//! programs encode pass/fail of the product itself, so their exit codes are
//! recorded verbatim.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::compiler::{Backend, CompileRequest, CompilerService, LinkRequest};
use crate::config::HarnessConfig;
use crate::descriptor::{TestConfig, TestType};
use crate::diagnostics::HarnessError;
use crate::discovery::TestCase;
use crate::tools::{self, ToolRunner};
use crate::transcript::Transcript;
use crate::workspace::{self, Workspace};

/// Interop failure output is trimmed to the first line carrying this marker
/// and everything after it.
const ERROR_MARKER: &str = "ERROR";
/// Includes with this name suffix are optional trace captures.
const TRACE_SUFFIX: &str = "trace";
/// Fixed name of the generated link-unit source consumed by the secondary
/// compile.
const LINK_UNIT_SOURCE: &str = "linker.cs";

pub struct PipelineExecutor<'a> {
    config: &'a HarnessConfig,
    runner: ToolRunner,
    compiler: &'a mut dyn CompilerService,
}

impl<'a> PipelineExecutor<'a> {
    pub fn new(config: &'a HarnessConfig, compiler: &'a mut dyn CompilerService) -> Self {
        Self {
            config,
            runner: ToolRunner::new(config.tool_timeout),
            compiler,
        }
    }

    /// Runs the fixed stage sequence for one (case, type) pair.
    pub fn run(
        &mut self,
        case: &TestCase,
        workspace: &Workspace,
        test_type: TestType,
        test_config: &TestConfig,
    ) -> Result<Transcript, HarnessError> {
        let active = workspace.active_dir(test_type);
        let mut transcript = Transcript::new();
        transcript.banner();

        match test_type {
            TestType::CompileOnly => {
                let request = compile_request(case, workspace, Backend::Native, test_config);
                let ok = self.compiler.compile(&request, &mut transcript)?;
                transcript.exit(if ok { 0 } else { -1 });
            }
            TestType::NativeRuntime => {
                if self.compile_and_link(
                    case,
                    workspace,
                    &active,
                    Backend::Native,
                    test_config,
                    &mut transcript,
                )? {
                    transcript.banner();
                    self.native_runtime(workspace, &active, test_config, &mut transcript)?;
                }
            }
            TestType::Interop => {
                if self.compile_and_link(
                    case,
                    workspace,
                    &active,
                    Backend::Interop,
                    test_config,
                    &mut transcript,
                )? {
                    transcript.banner();
                    self.interop(case, workspace, &active, test_config, &mut transcript)?;
                }
            }
            TestType::ModelCheck => {
                if self.compile_and_link(
                    case,
                    workspace,
                    &active,
                    Backend::ModelIr,
                    test_config,
                    &mut transcript,
                )? {
                    transcript.banner();
                    self.model_check(case, workspace, &active, test_config, &mut transcript)?;
                }
            }
        }
        Ok(transcript)
    }

    /// Compile then link. `Ok(false)` means an expected failure was recorded
    /// as `EXIT: -1` and the caller must skip the remaining stages.
    fn compile_and_link(
        &mut self,
        case: &TestCase,
        workspace: &Workspace,
        active: &Path,
        backend: Backend,
        test_config: &TestConfig,
        transcript: &mut Transcript,
    ) -> Result<bool, HarnessError> {
        let request = compile_request(case, workspace, backend, test_config);
        if !self.compiler.compile(&request, transcript)? {
            transcript.exit(-1);
            return Ok(false);
        }

        let link = LinkRequest {
            unit: request.unit,
            link_file: test_config.link.as_ref().map(|name| active.join(name)),
            output_dir: workspace.root.clone(),
        };
        if !self.compiler.link(&link, transcript)? {
            transcript.exit(-1);
            return Ok(false);
        }
        transcript.exit(0);
        Ok(true)
    }

    /// SecondaryBuild(clean) → SecondaryBuild(build) → Execute(tester).
    fn native_runtime(
        &self,
        workspace: &Workspace,
        active: &Path,
        test_config: &TestConfig,
        transcript: &mut Transcript,
    ) -> Result<(), HarnessError> {
        let scaffold = self.config.test_root.join(&self.config.tools.tester_dir);
        workspace::deep_copy(&scaffold, &workspace.root)?;

        let project = workspace.root.join(&self.config.tools.tester_project);
        let build_tool = tools::resolve_tool(self.config, &self.config.tools.build_tool)?;
        self.build_tester(&build_tool, &project, active, true)?;
        self.build_tester(&build_tool, &project, active, false)?;

        let tester = workspace
            .root
            .join(&self.config.configuration)
            .join(&self.config.platform)
            .join(&self.config.tools.native_tester);
        let output = self.runner.run(&tester, active, &test_config.arguments)?;
        transcript.raw(&output.stdout);
        transcript.raw(&output.stderr);
        transcript.exit(output.exit_code);
        Ok(())
    }

    fn build_tester(
        &self,
        build_tool: &Path,
        project: &Path,
        active: &Path,
        clean: bool,
    ) -> Result<(), HarnessError> {
        let args = vec![
            project.display().to_string(),
            if clean { "-t:Clean" } else { "-t:Build" }.to_string(),
            format!("-p:Configuration={}", self.config.configuration),
            format!("-p:Platform={}", self.config.platform),
            "-nologo".to_string(),
        ];
        let output = self.runner.run(build_tool, active, &args)?;
        if !output.succeeded() {
            return Err(HarnessError::SecondaryToolFailed {
                tool: self.config.tools.build_tool.clone(),
                exit_code: output.exit_code,
                output: output.combined(),
            });
        }
        Ok(())
    }

    /// SecondaryCompile → AppendIncludes → Execute(host).
    fn interop(
        &self,
        case: &TestCase,
        workspace: &Workspace,
        active: &Path,
        test_config: &TestConfig,
        transcript: &mut Transcript,
    ) -> Result<(), HarnessError> {
        let generated = workspace.root.join(
            test_config
                .generated
                .clone()
                .unwrap_or_else(|| format!("{}.cs", case.name)),
        );
        if !generated.is_file() {
            return Err(HarnessError::MissingGenerated { path: generated });
        }
        let link_unit = workspace.root.join(LINK_UNIT_SOURCE);
        if !link_unit.is_file() {
            return Err(HarnessError::MissingGenerated { path: link_unit });
        }
        let runtime = tools::resolve_tool(self.config, &self.config.tools.runtime_library)?;
        let artifact = workspace.root.join(format!("{}.dll", case.name));
        remove_stale_artifacts(&workspace.root, &case.name)?;

        let secondary = tools::resolve_tool(self.config, &self.config.tools.secondary_compiler)?;
        let mut args = test_config.arguments.clone();
        args.extend([
            "-debug".to_string(),
            "-target:library".to_string(),
            format!("-reference:{}", runtime.display()),
            format!("-out:{}", artifact.display()),
            generated.display().to_string(),
            link_unit.display().to_string(),
        ]);
        let output = self.runner.run(&secondary, active, &args)?;
        let label = tool_label(&self.config.tools.secondary_compiler);
        transcript.labeled_exit(label, output.exit_code);
        if !output.succeeded() {
            return Err(HarnessError::SecondaryToolFailed {
                tool: label.to_string(),
                exit_code: output.exit_code,
                output: output.combined(),
            });
        }

        append_includes(test_config, active, transcript)?;

        let host = tools::resolve_tool(self.config, &self.config.tools.interop_host)?;
        let mut host_args = test_config.arguments.clone();
        host_args.push(artifact.display().to_string());
        let run = self.runner.run(&host, active, &host_args)?;
        if run.succeeded() {
            transcript.raw(&run.stdout);
        } else {
            // Informational lines before the first ERROR are dropped so the
            // baseline pins the failure report, not incidental chatter.
            for line in error_tail(&run.stdout) {
                transcript.line(line);
            }
        }
        transcript.raw(&run.stderr);
        transcript.exit(run.exit_code);
        Ok(())
    }

    /// Execute(model checker) → AppendIncludes.
    fn model_check(
        &self,
        case: &TestCase,
        workspace: &Workspace,
        active: &Path,
        test_config: &TestConfig,
        transcript: &mut Transcript,
    ) -> Result<(), HarnessError> {
        let checker = tools::resolve_tool(self.config, &self.config.tools.model_checker)?;
        let model = workspace.root.join(
            test_config
                .generated
                .clone()
                .unwrap_or_else(|| format!("{}.mdl", case.name)),
        );
        if !model.is_file() {
            return Err(HarnessError::MissingGenerated { path: model });
        }

        let mut args = test_config.arguments.clone();
        args.push(model.display().to_string());
        let output = self.runner.run(&checker, active, &args)?;
        transcript.raw(&output.stdout);
        transcript.raw(&output.stderr);
        transcript.exit(output.exit_code);

        append_includes(test_config, active, transcript)?;
        Ok(())
    }
}

/// The compile request for one (case, type) pair. The unit name derives from
/// the primary source; liveness is requested for the model backend when the
/// descriptor arguments carry `-liveness`.
fn compile_request(
    case: &TestCase,
    workspace: &Workspace,
    backend: Backend,
    test_config: &TestConfig,
) -> CompileRequest {
    let sources: Vec<PathBuf> = case
        .sources
        .iter()
        .map(|name| workspace.root.join(name))
        .collect();
    let unit = workspace.root.join(case.primary_source()).with_extension("unit");
    let liveness = backend == Backend::ModelIr
        && test_config.arguments.iter().any(|arg| arg == "-liveness");
    CompileRequest {
        sources,
        output_dir: workspace.root.clone(),
        unit,
        backend,
        liveness,
    }
}

/// Appends each configured include as a labeled section. Missing trace files
/// are tolerated; any other missing include is fatal.
fn append_includes(
    test_config: &TestConfig,
    active: &Path,
    transcript: &mut Transcript,
) -> Result<(), HarnessError> {
    for include in &test_config.includes {
        let path = active.join(include);
        match fs::read_to_string(&path) {
            Ok(contents) => transcript.include_section(include, &contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if !include.ends_with(TRACE_SUFFIX) {
                    return Err(HarnessError::MissingInclude { path });
                }
            }
            Err(e) => return Err(HarnessError::io(&path, e)),
        }
    }
    Ok(())
}

/// Short tool name for transcript labels, even when the tool is configured
/// by path.
fn tool_label(tool: &str) -> &str {
    Path::new(tool)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(tool)
}

/// Lines from the first one containing the error marker onward.
fn error_tail(stdout: &str) -> impl Iterator<Item = &str> + '_ {
    let mut copying = false;
    stdout.lines().filter(move |line| {
        if line.contains(ERROR_MARKER) {
            copying = true;
        }
        copying
    })
}

/// Leftover managed artifacts from a previous host run.
fn remove_stale_artifacts(root: &Path, case_name: &str) -> Result<(), HarnessError> {
    for extension in ["dll", "pdb"] {
        let path = root.join(format!("{case_name}.{extension}"));
        if path.exists() {
            fs::remove_file(&path).map_err(|e| HarnessError::io(&path, e))?;
        }
    }
    Ok(())
}
