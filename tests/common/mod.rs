//! Common test utilities for the diwire test suites

// Not every suite uses every helper
#![allow(dead_code)]

use anyhow::{Context, Result};
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use diwire::test_utils::ContainerFixture;

/// Output of one CLI run.
#[derive(Debug)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// A temporary directory holding container files and an (absent by default)
/// compiler configuration.
pub struct TestProject {
    temp_dir: TempDir,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new().context("Failed to create temp dir")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Compiler configuration used by [`Self::run_diwire`]. The file only exists
    /// after [`Self::write_config`].
    pub fn config_path(&self) -> PathBuf {
        self.path().join("diwire-config.toml")
    }

    pub fn write_config(&self, content: &str) -> Result<PathBuf> {
        let path = self.config_path();
        fs::write(&path, content).context("Failed to write compiler config")?;
        Ok(path)
    }

    /// Write `content` to `name` relative to the project, creating directories.
    pub fn write(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn write_fixture(&self, fixture: &ContainerFixture) -> Result<PathBuf> {
        fixture.write_to(self.path())
    }

    /// Run the binary in the project directory with an isolated environment.
    pub fn run_diwire(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = Command::cargo_bin("diwire")
            .context("Failed to locate diwire binary")?
            .current_dir(self.path())
            .env("DIWIRE_CONFIG_PATH", self.config_path())
            .env("NO_COLOR", "1")
            .env_remove("DIWIRE_DEBUG_DUMP")
            .env_remove("DIWIRE_FROZEN_EVENTS")
            .env_remove("RUST_LOG")
            .args(args)
            .output()
            .context("Failed to run diwire")?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
