//! Concurrent execution of per-package command pipelines.
//!
//! Every decided package becomes one pipeline task. Stages inside a
//! pipeline run strictly in sequence; pipelines themselves run with no
//! ordering guarantee between packages. A failing stage aborts only its own
//! package's remaining stages.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{debug, error};

use crate::report::Reporter;
use crate::runner::{CommandRunner, CommandSpec, CommandStage, ExecOutput};

/// Process-wide exit status. Ordering is severity: a worse status never
/// downgrades once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExitStatus {
    /// Every requested action succeeded, or nothing was requested.
    Success,
    /// A requested publish was gated off for at least one package.
    PublishGated,
    /// An executed command exited non-zero.
    CommandFailed,
}

impl ExitStatus {
    /// The process exit code reported to the caller.
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::PublishGated => -1,
            ExitStatus::CommandFailed => -10,
        }
    }
}

/// Shared worse-wins exit accumulator. Completions from concurrent
/// pipelines may record in any order.
#[derive(Debug)]
pub struct ExitTracker {
    worst: Mutex<ExitStatus>,
}

impl ExitTracker {
    pub fn new() -> Self {
        Self {
            worst: Mutex::new(ExitStatus::Success),
        }
    }

    pub fn record(&self, status: ExitStatus) {
        let mut worst = self.worst.lock().expect("exit tracker poisoned");
        if status > *worst {
            *worst = status;
        }
    }

    pub fn worst(&self) -> ExitStatus {
        *self.worst.lock().expect("exit tracker poisoned")
    }
}

impl Default for ExitTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Which pipeline shape a package runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Publish,
    Verify,
}

/// One package's planned command sequence.
#[derive(Debug, Clone)]
pub struct PipelinePlan {
    /// Package path, used in success/failure lines.
    pub path: PathBuf,
    pub kind: PipelineKind,
    pub commands: Vec<CommandSpec>,
}

/// Completed pipeline: executed stages plus the stage that failed, if any.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub path: PathBuf,
    pub kind: PipelineKind,
    pub stages: Vec<ExecOutput>,
    pub failed_stage: Option<CommandStage>,
}

impl PipelineOutcome {
    pub fn success(&self) -> bool {
        self.failed_stage.is_none()
    }
}

/// Execute all pipelines concurrently and return their outcomes.
///
/// Each completion reports through the shared `reporter` and records into
/// the shared `tracker` as it happens; ordering between packages is
/// whatever the scheduler produces.
pub async fn execute_pipelines(
    plans: Vec<PipelinePlan>,
    runner: Arc<dyn CommandRunner>,
    reporter: Arc<Reporter>,
    tracker: Arc<ExitTracker>,
) -> anyhow::Result<Vec<PipelineOutcome>> {
    let mut tasks = Vec::new();
    for plan in plans {
        let runner = Arc::clone(&runner);
        let reporter = Arc::clone(&reporter);
        let tracker = Arc::clone(&tracker);
        tasks.push(tokio::spawn(async move {
            let outcome = run_pipeline(plan, runner.as_ref()).await;
            if !outcome.success() {
                tracker.record(ExitStatus::CommandFailed);
            }
            reporter.pipeline_outcome(&outcome);
            outcome
        }));
    }

    let mut outcomes = Vec::new();
    for task in tasks {
        outcomes.push(task.await?);
    }
    Ok(outcomes)
}

/// Run one package's stages in order, stopping at the first failure.
async fn run_pipeline(plan: PipelinePlan, runner: &dyn CommandRunner) -> PipelineOutcome {
    let mut stages = Vec::new();
    let mut failed_stage = None;

    for command in &plan.commands {
        debug!(package = %plan.path.display(), stage = command.stage.name(), "running stage");
        match runner.run(command).await {
            Ok(output) => {
                let ok = output.success();
                let stage = output.stage;
                stages.push(output);
                if !ok {
                    failed_stage = Some(stage);
                    break;
                }
            }
            Err(e) => {
                // Spawn failures have no exit code; synthesize one so the
                // outcome still carries the diagnostics.
                error!(package = %plan.path.display(), error = %e, "stage could not be executed");
                stages.push(ExecOutput {
                    stage: command.stage,
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: e.to_string(),
                    duration_ms: 0,
                });
                failed_stage = Some(command.stage);
                break;
            }
        }
    }

    PipelineOutcome {
        path: plan.path,
        kind: plan.kind,
        stages,
        failed_stage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_codes() {
        assert_eq!(ExitStatus::Success.code(), 0);
        assert_eq!(ExitStatus::PublishGated.code(), -1);
        assert_eq!(ExitStatus::CommandFailed.code(), -10);
    }

    #[test]
    fn test_exit_tracker_worse_wins() {
        let tracker = ExitTracker::new();
        assert_eq!(tracker.worst(), ExitStatus::Success);

        tracker.record(ExitStatus::PublishGated);
        assert_eq!(tracker.worst(), ExitStatus::PublishGated);

        tracker.record(ExitStatus::CommandFailed);
        assert_eq!(tracker.worst(), ExitStatus::CommandFailed);

        // A later, better status never downgrades the result.
        tracker.record(ExitStatus::Success);
        tracker.record(ExitStatus::PublishGated);
        assert_eq!(tracker.worst(), ExitStatus::CommandFailed);
    }
}
