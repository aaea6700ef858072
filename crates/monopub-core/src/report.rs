//! Run reporting: the stdout text contract.
//!
//! Diagnostics go through `tracing`; everything here is the
//! externally-observable report. Line rendering is pure so tests can
//! assert on the contract; printing is a thin wrapper. Each package's
//! block is printed from one call, so concurrent pipeline completions
//! never interleave within a block.

use crate::decision::{Action, Decision};
use crate::domain::options::RunOptions;
use crate::domain::package::PackageRecord;
use crate::orchestrate::{PipelineKind, PipelineOutcome};

const INDENT: &str = "    ";

/// Stdout reporter for a single run.
#[derive(Debug, Clone)]
pub struct Reporter {
    show_ignored: bool,
    dry_run: bool,
}

impl Reporter {
    pub fn new(options: &RunOptions) -> Self {
        Self {
            show_ignored: options.show_ignored,
            dry_run: options.dry_run,
        }
    }

    /// Report one package's decision.
    pub fn package_decision(&self, record: &PackageRecord, decision: &Decision) {
        for line in self.decision_lines(record, decision) {
            println!("{line}");
        }
    }

    /// Render a package's report block. Empty for ignored packages unless
    /// `--showIgnored` was given.
    pub fn decision_lines(&self, record: &PackageRecord, decision: &Decision) -> Vec<String> {
        let mut lines = Vec::new();

        if let Action::Ignored { opted_out } = decision.action {
            if self.show_ignored {
                lines.push(record.path.display().to_string());
                let reason = if opted_out {
                    "Ignored (publish disabled in configuration)"
                } else {
                    "Ignored (no publish configuration)"
                };
                lines.push(format!("{INDENT}{reason}"));
            }
            return lines;
        }

        lines.push(record.path.display().to_string());

        lines.push(format!(
            "{INDENT}{}",
            if decision.commit_already_published {
                "Up to date"
            } else {
                "Changes detected"
            }
        ));

        if let Some(manifest) = &record.manifest {
            let name = manifest.name.as_deref().unwrap_or("?");
            let version = manifest.version.as_deref().unwrap_or("?");
            let registry = match record.registry_info.as_ref().and_then(|i| i.latest()) {
                Some(latest) => format!("{name}@{latest}"),
                None => "(not published)".to_string(),
            };
            lines.push(format!("{INDENT}source {name}@{version} | registry {registry}"));
        }

        if let Some(message) = &decision.vcs_gate.message {
            lines.push(format!("{INDENT}{message}"));
        }

        match decision.action {
            Action::UpToDate => lines.push(format!("{INDENT}No changes")),
            Action::ChangedNotReleased => lines.push(format!(
                "{INDENT}Code has changed since last publish, but version has not."
            )),
            Action::Verify => lines.push(format!(
                "{INDENT}Code has changed since last publish, but version has not. \
                 --verifyModified flag set, running prepublishOnly"
            )),
            _ => {}
        }

        if decision.forced {
            lines.push(format!("{INDENT}Overriding non-publishable status with --force"));
        }

        for command in &decision.commands {
            lines.push(format!(
                "{INDENT}{INDENT}Running command {}",
                command.rendered()
            ));
        }

        if !record.load_exceptions.is_empty() {
            lines.push(format!("{INDENT}Exceptions occurred collecting information: "));
            for exception in &record.load_exceptions {
                lines.push(format!("{INDENT}{} -> {}", exception.kind, exception.error));
            }
        }

        lines
    }

    /// Report a completed pipeline: stage output, then a success or
    /// failure line naming the package. Failure diagnostics go to stderr.
    pub fn pipeline_outcome(&self, outcome: &PipelineOutcome) {
        for line in self.outcome_lines(outcome) {
            println!("{line}");
        }
        for line in self.outcome_error_lines(outcome) {
            eprintln!("{line}");
        }
    }

    /// Stdout lines for a completed pipeline.
    pub fn outcome_lines(&self, outcome: &PipelineOutcome) -> Vec<String> {
        let mut lines = Vec::new();
        for stage in &outcome.stages {
            if !stage.stdout.is_empty() {
                lines.push(stage.stdout.trim_end().to_string());
            }
        }
        if outcome.success() {
            match outcome.kind {
                PipelineKind::Publish => {
                    if self.dry_run {
                        lines.push(format!("{INDENT} --- dry-run ---"));
                    }
                    lines.push(format!("{INDENT}Published {}", outcome.path.display()));
                }
                PipelineKind::Verify => {
                    lines.push(format!(
                        "{INDENT}Prepublish successful {}",
                        outcome.path.display()
                    ));
                }
            }
        }
        lines
    }

    /// Stderr lines for a failed pipeline; empty on success. The failing
    /// stage's diagnostics are never suppressed.
    pub fn outcome_error_lines(&self, outcome: &PipelineOutcome) -> Vec<String> {
        if outcome.success() {
            return Vec::new();
        }
        let mut lines = match outcome.kind {
            PipelineKind::Publish => vec![format!("Failed to publish {}!", outcome.path.display())],
            PipelineKind::Verify => vec![format!("Failed to build {}!", outcome.path.display())],
        };
        if let Some(failed) = outcome.stages.last() {
            if !failed.stderr.is_empty() {
                lines.push(failed.stderr.trim_end().to_string());
            }
        }
        lines
    }

    /// Final summary line; always printed exactly once.
    pub fn summary(&self, package_count: usize) {
        println!("{}", self.summary_line(package_count));
    }

    pub fn summary_line(&self, package_count: usize) -> String {
        if package_count == 0 {
            "No packages found to publish".to_string()
        } else {
            format!("Found package count: {package_count}")
        }
    }
}
