//! Common test utilities for writenode integration tests
//!
//! Command-line tests run the real binary against a configuration written
//! into a temporary directory.

// Allow dead code because these utilities are used across different test files
// and not all utilities are used in every test file
#![allow(dead_code)]

use anyhow::{Context, Result};
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use writenode::test_utils::PipelineFixture;

/// Captured result of one binary invocation.
#[derive(Debug)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// A temporary directory holding a pipeline configuration.
pub struct TestProject {
    dir: TempDir,
    config_path: PathBuf,
}

impl TestProject {
    /// A project whose templates live inside the temporary directory.
    pub fn new(fixture: PipelineFixture) -> Result<Self> {
        let dir = TempDir::new().context("Failed to create temp dir")?;
        let fixture = fixture.at_root(dir.path());
        let config_path = fixture.write_to(dir.path())?;
        Ok(Self {
            dir,
            config_path,
        })
    }

    /// A project with the configuration left at the fixture's `/proj` root.
    pub fn with_fixed_root(fixture: &PipelineFixture) -> Result<Self> {
        let dir = TempDir::new().context("Failed to create temp dir")?;
        let config_path = fixture.write_to(dir.path())?;
        Ok(Self {
            dir,
            config_path,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// The root as it appears inside rendered paths.
    pub fn root_str(&self) -> String {
        self.dir.path().to_string_lossy().replace('\\', "/")
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Creates an empty file at `relative` below the root.
    pub fn touch(&self, relative: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, b"").with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// The binary with `--config` pointing at this project.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("writenode").expect("writenode binary is built");
        cmd.env_remove("WRITENODE_CONFIG")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .arg("--config")
            .arg(&self.config_path);
        cmd
    }

    /// Runs the binary with `args` and captures its output.
    pub fn run_writenode(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self.command().args(args).output().context("Failed to run writenode")?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
