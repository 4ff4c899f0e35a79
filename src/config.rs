//! Run configuration.
//!
//! One immutable [`HarnessConfig`] value is assembled by the CLI, validated
//! once, and passed by reference through every call. Nothing in the harness
//! reads ambient process-wide state after startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::descriptor::TestType;
use crate::diagnostics::HarnessError;

/// Names of the external toolchain pieces the pipelines invoke.
///
/// Bare names resolve through the drop-path convention and then `PATH`
/// (see `tools::resolve_tool`); explicit paths are used as-is.
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    /// The mica compiler under test.
    pub compiler: String,
    /// Managed-code compiler building the Interop backend's output.
    pub secondary_compiler: String,
    /// Build tool driving the native tester project.
    pub build_tool: String,
    /// Model checker consuming the ModelCheck backend's IR.
    pub model_checker: String,
    /// Host executable running the compiled managed artifact.
    pub interop_host: String,
    /// Tester executable produced by the native tester project.
    pub native_tester: String,
    /// Tester scaffold directory under the test root.
    pub tester_dir: String,
    /// Project file of the native tester scaffold.
    pub tester_project: String,
    /// Managed runtime library referenced by the secondary compile.
    pub runtime_library: String,
    /// Comparison tool recorded in the diff log, never invoked by the harness.
    pub diff_tool: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: "micac".to_string(),
            secondary_compiler: "csc".to_string(),
            build_tool: "msbuild".to_string(),
            model_checker: "mcheck".to_string(),
            interop_host: "mica-host".to_string(),
            native_tester: "tester".to_string(),
            tester_dir: "NativeTester".to_string(),
            tester_project: "tester.proj".to_string(),
            runtime_library: "MicaRt.dll".to_string(),
            diff_tool: "diff".to_string(),
        }
    }
}

/// Immutable configuration for one harness run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Root of the test tree being scanned.
    pub test_root: PathBuf,
    /// Root the staged workspaces are written under.
    pub results_root: PathBuf,
    /// Build configuration, used in the drop path and tester output layout.
    pub configuration: String,
    /// Build platform, used in the drop path and tester output layout.
    pub platform: String,
    /// Toolchain drop root searched before `PATH`.
    pub drop_root: Option<PathBuf>,
    pub tools: ToolchainConfig,
    /// Which pipelines run; test types a case configures but this list omits
    /// are skipped silently.
    pub types: Vec<TestType>,
    /// Rebaseline mode: mismatches overwrite stored baselines.
    pub reset: bool,
    /// Worker-pool width. Each worker owns its own compiler instance.
    pub jobs: usize,
    /// External-tool timeout; `None` blocks without bound.
    pub tool_timeout: Option<Duration>,
    pub use_colors: bool,
}

impl HarnessConfig {
    /// A configuration with conventional defaults rooted at `test_root`.
    pub fn new(test_root: impl Into<PathBuf>) -> Self {
        let test_root = test_root.into();
        let configuration = "Debug".to_string();
        let platform = "x64".to_string();
        let results_root = default_results_root(&test_root, &configuration, &platform);
        Self {
            test_root,
            results_root,
            configuration,
            platform,
            drop_root: None,
            tools: ToolchainConfig::default(),
            types: TestType::ALL.to_vec(),
            reset: false,
            jobs: 1,
            tool_timeout: None,
            use_colors: false,
        }
    }

    /// Validates the assembled configuration before anything acts on it.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if !self.test_root.is_dir() {
            return Err(HarnessError::InvalidConfig {
                message: format!("test root {} is not a directory", self.test_root.display()),
            });
        }
        if self.results_root == self.test_root {
            return Err(HarnessError::InvalidConfig {
                message: "results root must differ from the test root".to_string(),
            });
        }
        if self.types.is_empty() {
            return Err(HarnessError::InvalidConfig {
                message: "at least one test type must be selected".to_string(),
            });
        }
        if self.jobs == 0 {
            return Err(HarnessError::InvalidConfig {
                message: "jobs must be at least 1".to_string(),
            });
        }
        if self.tool_timeout == Some(Duration::ZERO) {
            return Err(HarnessError::InvalidConfig {
                message: "timeout must be nonzero; omit it for unbounded waiting".to_string(),
            });
        }
        Ok(())
    }
}

/// `TestResult_<Configuration>_<Platform>` under the test root.
pub fn default_results_root(test_root: &Path, configuration: &str, platform: &str) -> PathBuf {
    test_root.join(format!("TestResult_{configuration}_{platform}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_results_root_is_under_test_root() {
        let root = default_results_root(Path::new("Tst"), "Debug", "x64");
        assert_eq!(root, Path::new("Tst").join("TestResult_Debug_x64"));
    }

    #[test]
    fn validate_rejects_missing_test_root() {
        let config = HarnessConfig::new("does/not/exist");
        assert!(matches!(
            config.validate(),
            Err(HarnessError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn validate_rejects_degenerate_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = HarnessConfig::new(dir.path());

        config.jobs = 0;
        assert!(config.validate().is_err());
        config.jobs = 1;

        config.types.clear();
        assert!(config.validate().is_err());
        config.types = TestType::ALL.to_vec();

        config.tool_timeout = Some(Duration::ZERO);
        assert!(config.validate().is_err());
        config.tool_timeout = None;

        config.results_root = config.test_root.clone();
        assert!(config.validate().is_err());
        config.results_root = dir.path().join("TestResult_Debug_x64");

        assert!(config.validate().is_ok());
    }
}
