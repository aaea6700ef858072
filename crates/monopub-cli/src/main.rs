//! Monopub - monorepo release helper CLI
//!
//! Scans a monorepo for packages, decides per package whether a publish is
//! due, and runs the resulting install/publish/verify pipelines.
//!
//! Publishes only from the release branch with a clean index and all
//! changes pushed, unless `--force` is given.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, Level};

use monopub_core::orchestrate::{PipelineKind, PipelinePlan};
use monopub_core::{
    aggregate_packages, decide, init_tracing, scan_packages, Action, ExitTracker, GitCli,
    HttpRegistryClient, ProcessRunner, Reporter, RunOptions,
};

#[derive(Parser)]
#[command(name = "monopub")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Monorepo release helper", long_about = None)]
#[command(after_help = "Will publish only from the master branch with a clean \
index and all changes pushed.\n\nExamples:\n  $ monopub . --publish --dryrun    \
# See what would be published.")]
struct Cli {
    /// Root directory of the monorepo structure (default: current
    /// directory, or the nearest ancestor containing a package manifest)
    path: Option<PathBuf>,

    /// Perform publish actions (absent: inspection only)
    #[arg(short, long)]
    publish: bool,

    /// Run to the end without permanent damage; the package manager
    /// simulates publish and tag operations
    #[arg(long)]
    dryrun: bool,

    /// Force publishing over normal objections. Has no effect if the
    /// current version is already published
    #[arg(long)]
    force: bool,

    /// Run the verification script on modified packages whose version was
    /// not bumped
    #[arg(short, long = "verifyModified")]
    verify_modified: bool,

    /// Declare the git branch explicitly (detached-checkout CI)
    #[arg(long = "gitBranch")]
    git_branch: Option<String>,

    /// Report packages that are present but not opted in to publishing
    #[arg(long = "showIgnored")]
    show_ignored: bool,

    /// Debug output
    #[arg(short, long)]
    debug: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    let options = RunOptions {
        publish_requested: cli.publish,
        force: cli.force,
        dry_run: cli.dryrun,
        verify_modified: cli.verify_modified,
        override_branch: cli.git_branch.clone(),
        show_ignored: cli.show_ignored,
    };
    debug!(?options, "starting monopub run");

    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let root = match cli.path {
        Some(path) => path
            .canonicalize()
            .with_context(|| format!("Cannot read root directory {}", path.display()))?,
        None => monopub_core::scan::default_root(&cwd),
    };

    let scanned = scan_packages(&root)
        .with_context(|| format!("Cannot read root directory {}", root.display()))?;

    let registry = Arc::new(HttpRegistryClient::from_env().context("Failed to create registry client")?);
    let vcs = Arc::new(GitCli::new());
    let records = aggregate_packages(scanned, registry, vcs)
        .await
        .context("Package aggregation failed")?;

    let reporter = Arc::new(Reporter::new(&options));
    let tracker = Arc::new(ExitTracker::new());

    let mut plans = Vec::new();
    for record in &records {
        let decision = decide(record, &options);
        tracker.record(decision.exit);
        reporter.package_decision(record, &decision);

        if !decision.commands.is_empty() {
            let kind = match decision.action {
                Action::Verify => PipelineKind::Verify,
                _ => PipelineKind::Publish,
            };
            plans.push(PipelinePlan {
                path: record.path.clone(),
                kind,
                commands: decision.commands,
            });
        }
    }

    reporter.summary(records.len());

    let runner = Arc::new(ProcessRunner::new());
    execute_pipelines_and_wait(plans, runner, Arc::clone(&reporter), Arc::clone(&tracker)).await?;

    std::process::exit(tracker.worst().code());
}

async fn execute_pipelines_and_wait(
    plans: Vec<PipelinePlan>,
    runner: Arc<ProcessRunner>,
    reporter: Arc<Reporter>,
    tracker: Arc<ExitTracker>,
) -> Result<()> {
    if plans.is_empty() {
        return Ok(());
    }
    monopub_core::execute_pipelines(plans, runner, reporter, tracker)
        .await
        .context("Pipeline execution failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_parse() {
        let cli = Cli::try_parse_from([
            "monopub",
            ".",
            "--publish",
            "--dryrun",
            "--verifyModified",
            "--gitBranch",
            "master",
            "--showIgnored",
        ])
        .unwrap();

        assert_eq!(cli.path.as_deref(), Some(std::path::Path::new(".")));
        assert!(cli.publish);
        assert!(cli.dryrun);
        assert!(cli.verify_modified);
        assert_eq!(cli.git_branch.as_deref(), Some("master"));
        assert!(cli.show_ignored);
        assert!(!cli.force);
    }

    #[test]
    fn test_path_defaults_to_none() {
        let cli = Cli::try_parse_from(["monopub"]).unwrap();
        assert!(cli.path.is_none());
        assert!(!cli.publish);
    }
}
