//! Test-case discovery.
//!
//! Walks the test root and yields one record per test-case directory, i.e.
//! any directory with at least one test-type subdirectory containing a
//! descriptor. Directories without descriptors are skipped silently; a
//! descriptor that fails to parse, or a recognized case with no source
//! program, is a broken fixture and fatal to discovery.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::descriptor::{TestConfig, TestType, DESCRIPTOR_FILE};
use crate::diagnostics::HarnessError;

/// File extension of mica source programs.
pub const SOURCE_EXTENSION: &str = "mica";

/// One discovered test case, immutable after creation.
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Human-readable name: the case directory's name.
    pub name: String,
    /// The original (unstaged) case directory.
    pub source_dir: PathBuf,
    /// Source file names relative to the case directory, sorted. Never
    /// empty; the first entry is the primary input.
    pub sources: Vec<String>,
    /// Per-type configuration, iterated in fixed execution order.
    pub configs: BTreeMap<TestType, TestConfig>,
}

impl TestCase {
    pub fn primary_source(&self) -> &str {
        &self.sources[0]
    }
}

/// Walks a test root for test cases.
#[derive(Debug)]
pub struct Discovery {
    root: PathBuf,
    excluded: Vec<PathBuf>,
}

impl Discovery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excluded: Vec::new(),
        }
    }

    /// Prunes a directory from the walk. Used for the results root, so a
    /// previous run's staged copies are never rediscovered as cases.
    pub fn exclude(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded.push(dir.into());
        self
    }

    /// Lazily yields test cases in sorted directory order.
    pub fn iter(&self) -> impl Iterator<Item = Result<TestCase, HarnessError>> + '_ {
        let excluded = self.excluded.clone();
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !excluded.iter().any(|ex| entry.path() == ex))
            .filter_map(|entry| match entry {
                Ok(entry) if entry.file_type().is_dir() => load_case(entry.path()).transpose(),
                Ok(_) => None,
                Err(e) => Some(Err(HarnessError::internal(format!(
                    "failed to walk test root: {e}"
                )))),
            })
    }

    /// Collects every case; the first malformed fixture aborts discovery.
    pub fn cases(&self) -> Result<Vec<TestCase>, HarnessError> {
        self.iter().collect()
    }
}

/// Reads one directory as a test case, or `None` if it has no descriptors.
fn load_case(dir: &Path) -> Result<Option<TestCase>, HarnessError> {
    let mut configs = BTreeMap::new();
    for test_type in TestType::ALL {
        let descriptor = dir.join(test_type.dir_name()).join(DESCRIPTOR_FILE);
        if descriptor.is_file() {
            configs.insert(test_type, TestConfig::load(&descriptor)?);
        }
    }
    if configs.is_empty() {
        return Ok(None);
    }

    let name = match dir.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => {
            return Err(HarnessError::internal(format!(
                "test case directory {} has no name",
                dir.display()
            )))
        }
    };
    let sources = source_files(dir)?;
    Ok(Some(TestCase {
        name,
        source_dir: dir.to_path_buf(),
        sources,
        configs,
    }))
}

/// The case's source file names, sorted so the primary input is stable.
fn source_files(dir: &Path) -> Result<Vec<String>, HarnessError> {
    let mut files = Vec::new();
    let entries = fs::read_dir(dir).map_err(|e| HarnessError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| HarnessError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION) {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    files.sort();
    if files.is_empty() {
        return Err(HarnessError::MissingSource {
            dir: dir.to_path_buf(),
        });
    }
    Ok(files)
}
