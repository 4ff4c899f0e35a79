//! Test descriptors: which pipelines a test case runs and how.
//!
//! Every test-type subdirectory of a test case carries a `testconfig.yaml`
//! descriptor. The descriptor is loaded exactly once at discovery time and is
//! immutable afterwards. A descriptor that fails to parse marks a broken test
//! fixture and is fatal to the whole run, not just to the owning case.

use std::fmt;
use std::fs;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::diagnostics::HarnessError;

/// Conventional descriptor file name inside a test-type subdirectory.
pub const DESCRIPTOR_FILE: &str = "testconfig.yaml";

/// Which pipeline variant applies to a test-type subdirectory.
///
/// The declaration order is the execution order within a test case.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, ValueEnum,
)]
pub enum TestType {
    CompileOnly,
    NativeRuntime,
    Interop,
    ModelCheck,
}

impl TestType {
    pub const ALL: [TestType; 4] = [
        TestType::CompileOnly,
        TestType::NativeRuntime,
        TestType::Interop,
        TestType::ModelCheck,
    ];

    /// Fixed subdirectory name for this test type.
    pub fn dir_name(self) -> &'static str {
        match self {
            TestType::CompileOnly => "CompileOnly",
            TestType::NativeRuntime => "NativeRuntime",
            TestType::Interop => "Interop",
            TestType::ModelCheck => "ModelCheck",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Per-(case, type) configuration, fixed after loading.
///
/// `generated` records the name of the compiler-generated artifact the
/// secondary stage consumes (`<case>.cs` for Interop, `<case>.mdl` for
/// ModelCheck when absent), so the pipeline never has to scan the workspace
/// for a plausible file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    #[serde(default)]
    pub description: String,
    /// Extra arguments forwarded to the execute-stage tools.
    #[serde(default)]
    pub arguments: Vec<String>,
    /// Auxiliary files appended to the transcript after the execute stage.
    #[serde(default)]
    pub includes: Vec<String>,
    /// Stale files removed from the active directory before the run.
    #[serde(default)]
    pub deletes: Vec<String>,
    /// Optional link-unit file handed to the compiler's link step.
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub generated: Option<String>,
}

impl TestConfig {
    /// Loads a descriptor file. Parse failures are fatal.
    pub fn load(path: &Path) -> Result<TestConfig, HarnessError> {
        let text = fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        serde_yaml::from_str(&text).map_err(|source| HarnessError::MalformedDescriptor {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_order_is_execution_order() {
        let mut types = TestType::ALL;
        types.sort();
        assert_eq!(types, TestType::ALL);
        assert!(TestType::CompileOnly < TestType::ModelCheck);
    }

    #[test]
    fn dir_names_round_trip_display() {
        for ty in TestType::ALL {
            assert_eq!(ty.to_string(), ty.dir_name());
        }
    }

    #[test]
    fn parses_full_descriptor() {
        let yaml = r#"
description: liveness violation is reported
arguments: ["-liveness"]
includes: ["run.trace"]
deletes: ["stale.mdl"]
link: "override.link"
generated: "custom.mdl"
"#;
        let config: TestConfig = serde_yaml::from_str(yaml).expect("descriptor should parse");
        assert_eq!(config.description, "liveness violation is reported");
        assert_eq!(config.arguments, vec!["-liveness"]);
        assert_eq!(config.includes, vec!["run.trace"]);
        assert_eq!(config.deletes, vec!["stale.mdl"]);
        assert_eq!(config.link.as_deref(), Some("override.link"));
        assert_eq!(config.generated.as_deref(), Some("custom.mdl"));
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let config: TestConfig = serde_yaml::from_str("description: minimal").expect("parse");
        assert!(config.arguments.is_empty());
        assert!(config.includes.is_empty());
        assert!(config.deletes.is_empty());
        assert!(config.link.is_none());
        assert!(config.generated.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<TestConfig, _> = serde_yaml::from_str("argumennts: [\"-x\"]");
        assert!(result.is_err());
    }
}
