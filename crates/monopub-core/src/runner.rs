//! External command execution.
//!
//! Commands are described as data ([`CommandSpec`]) so the decision engine
//! stays pure; a [`CommandRunner`] capability executes them, with the
//! production implementation spawning real processes.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::error::{MonopubError, Result};

/// Role of a command within a package's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStage {
    /// Dependency installation; never receives the dry-run flag.
    Install,
    /// The publish itself, tagged with the content fingerprint.
    Publish,
    /// Promotion of the fingerprint tag to the `latest` dist-tag.
    TagPromote,
    /// Verification script for changed-but-unreleased packages.
    Verify,
}

impl CommandStage {
    pub fn name(&self) -> &'static str {
        match self {
            CommandStage::Install => "install",
            CommandStage::Publish => "publish",
            CommandStage::TagPromote => "tag-promote",
            CommandStage::Verify => "verify",
        }
    }
}

/// One external command, bound to a working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub stage: CommandStage,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl CommandSpec {
    pub fn new(
        stage: CommandStage,
        program: impl Into<String>,
        args: &[&str],
        cwd: PathBuf,
    ) -> Self {
        Self {
            stage,
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd,
        }
    }

    /// Shell-style rendering for the report.
    pub fn rendered(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured outcome of one executed command.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub stage: CommandStage,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Capability: run one command to completion, capturing its output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<ExecOutput>;
}

/// Production runner spawning real processes.
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<ExecOutput> {
        let start = Instant::now();
        debug!(stage = spec.stage.name(), command = %spec.rendered(), cwd = %spec.cwd.display(), "executing");

        let child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                MonopubError::Command(format!("failed to spawn {}: {e}", spec.rendered()))
            })?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| MonopubError::Command(format!("failed to wait for {}: {e}", spec.rendered())))?;

        Ok(ExecOutput {
            stage: spec.stage,
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_rendered_command_line() {
        let spec = CommandSpec::new(
            CommandStage::Publish,
            "npm",
            &["publish", "--tag", "MPabc"],
            PathBuf::from("."),
        );
        assert_eq!(spec.rendered(), "npm publish --tag MPabc");
    }

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let spec = CommandSpec::new(
            CommandStage::Verify,
            "echo",
            &["hello"],
            PathBuf::from("."),
        );
        let output = ProcessRunner::new().run(&spec).await.unwrap();
        assert!(output.success());
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_run_reports_nonzero_exit() {
        let spec = CommandSpec::new(CommandStage::Install, "false", &[], PathBuf::from("."));
        let output = ProcessRunner::new().run(&spec).await.unwrap();
        assert!(!output.success());
        assert_ne!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn test_run_missing_binary_is_error() {
        let spec = CommandSpec::new(
            CommandStage::Install,
            "definitely-not-a-real-binary",
            &[],
            PathBuf::from("."),
        );
        assert!(ProcessRunner::new().run(&spec).await.is_err());
    }
}
