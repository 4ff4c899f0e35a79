//! External tool invocation and resolution.
//!
//! Tools are invoked synchronously with their full stdout and stderr captured
//! as text. A nonzero exit code is ordinary return data; the only failures
//! raised here are an unresolvable executable and, when a timeout is
//! configured, a tool that outlives it.

use std::env;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::HarnessConfig;
use crate::diagnostics::HarnessError;

/// Captured result of one external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ToolOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout and stderr concatenated, for error reporting.
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        text.push_str(&self.stderr);
        text
    }
}

/// Runs external executables, optionally bounded by a timeout.
#[derive(Debug, Clone, Default)]
pub struct ToolRunner {
    timeout: Option<Duration>,
}

impl ToolRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Invokes `executable` in `working_dir`, blocking until it terminates.
    pub fn run(
        &self,
        executable: &Path,
        working_dir: &Path,
        args: &[String],
    ) -> Result<ToolOutput, HarnessError> {
        let mut child = Command::new(executable)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => HarnessError::ToolNotFound {
                    name: executable.display().to_string(),
                    searched: vec![executable.display().to_string()],
                },
                _ => HarnessError::io(executable, e),
            })?;

        // Pipes are drained on their own threads so a chatty tool cannot
        // deadlock against a full pipe buffer while we wait on it.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match self.timeout {
            None => child
                .wait()
                .map_err(|e| HarnessError::io(executable, e))?,
            Some(limit) => {
                let started = Instant::now();
                loop {
                    match child
                        .try_wait()
                        .map_err(|e| HarnessError::io(executable, e))?
                    {
                        Some(status) => break status,
                        None if started.elapsed() >= limit => {
                            let _ = child.kill();
                            let _ = child.wait();
                            return Err(HarnessError::ToolTimedOut {
                                name: executable.display().to_string(),
                                seconds: limit.as_secs(),
                            });
                        }
                        None => thread::sleep(Duration::from_millis(20)),
                    }
                }
            }
        };

        let stdout = String::from_utf8_lossy(&stdout.join().unwrap_or_default()).into_owned();
        let stderr = String::from_utf8_lossy(&stderr.join().unwrap_or_default()).into_owned();
        Ok(ToolOutput {
            stdout,
            stderr,
            // A child killed by a signal has no code; -1 is the sentinel the
            // surrounding tooling already understands.
            exit_code: status.code().unwrap_or(-1),
        })
    }
}

fn drain<R: Read + Send + 'static>(reader: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut reader) = reader {
            let _ = reader.read_to_end(&mut buf);
        }
        buf
    })
}

/// Scans the process search path for an executable.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// `<dropRoot>/Bld/Drops/<Configuration>/<Platform>/Binaries`, the
/// conventional location of freshly built toolchain binaries.
pub fn drop_binaries_dir(drop_root: &Path, configuration: &str, platform: &str) -> PathBuf {
    drop_root
        .join("Bld")
        .join("Drops")
        .join(configuration)
        .join(platform)
        .join("Binaries")
}

/// Resolves a toolchain executable or library.
///
/// Explicit paths (anything with a separator) must exist as given. Bare names
/// are searched first in the configured drop layout, then on `PATH`. Failure
/// reports every location that was tried.
pub fn resolve_tool(config: &HarnessConfig, name: &str) -> Result<PathBuf, HarnessError> {
    let direct = Path::new(name);
    if direct.components().count() > 1 || direct.is_absolute() {
        if direct.is_file() {
            return Ok(direct.to_path_buf());
        }
        return Err(HarnessError::ToolNotFound {
            name: name.to_string(),
            searched: vec![name.to_string()],
        });
    }

    let mut searched = Vec::new();
    if let Some(drop_root) = &config.drop_root {
        let candidate =
            drop_binaries_dir(drop_root, &config.configuration, &config.platform).join(name);
        if candidate.is_file() {
            return Ok(candidate);
        }
        searched.push(candidate.display().to_string());
    }
    if let Some(found) = find_on_path(name) {
        return Ok(found);
    }
    searched.push("PATH".to_string());
    Err(HarnessError::ToolNotFound {
        name: name.to_string(),
        searched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_must_exist() {
        let config = HarnessConfig::new(".");
        let result = resolve_tool(&config, "/definitely/not/here/tool");
        match result {
            Err(HarnessError::ToolNotFound { name, searched }) => {
                assert_eq!(name, "/definitely/not/here/tool");
                assert_eq!(searched, vec!["/definitely/not/here/tool".to_string()]);
            }
            other => panic!("expected ToolNotFound, got {other:?}"),
        }
    }

    #[test]
    fn bare_name_reports_drop_and_path_locations() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = HarnessConfig::new(dir.path());
        config.drop_root = Some(dir.path().to_path_buf());
        let result = resolve_tool(&config, "no-such-tool-xyzzy");
        match result {
            Err(HarnessError::ToolNotFound { searched, .. }) => {
                assert_eq!(searched.len(), 2);
                assert!(searched[0].contains("Binaries"));
                assert_eq!(searched[1], "PATH");
            }
            other => panic!("expected ToolNotFound, got {other:?}"),
        }
    }

    #[test]
    fn drop_layout_is_preferred_over_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = HarnessConfig::new(dir.path());
        config.drop_root = Some(dir.path().to_path_buf());
        let binaries = drop_binaries_dir(dir.path(), &config.configuration, &config.platform);
        std::fs::create_dir_all(&binaries).expect("create drop layout");
        let tool = binaries.join("made-up-tool");
        std::fs::write(&tool, "").expect("create tool file");
        let resolved = resolve_tool(&config, "made-up-tool").expect("should resolve");
        assert_eq!(resolved, tool);
    }

    #[test]
    fn tool_output_success_is_exit_zero() {
        let output = ToolOutput {
            stdout: "a".into(),
            stderr: "b".into(),
            exit_code: 0,
        };
        assert!(output.succeeded());
        assert_eq!(output.combined(), "ab");
    }
}
