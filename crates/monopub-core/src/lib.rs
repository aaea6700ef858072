//! Monopub Core Library
//!
//! Re-exports the building blocks of the monopub release helper:
//! package discovery, metadata aggregation, the publish decision engine
//! and the concurrent pipeline orchestrator.

pub mod aggregate;
pub mod decision;
pub mod domain;
pub mod fakes;
pub mod fingerprint;
pub mod orchestrate;
pub mod registry;
pub mod report;
pub mod runner;
pub mod scan;
pub mod telemetry;
pub mod vcs;

pub use aggregate::aggregate_packages;
pub use decision::{decide, Action, Decision, VcsGate};
pub use domain::{
    LoadException, Manifest, MonopubError, PackageRecord, PublishConfig, RegistryInfo, Result,
    RunOptions, VcsStatus,
};
pub use orchestrate::{execute_pipelines, ExitStatus, ExitTracker, PipelineOutcome};
pub use registry::{HttpRegistryClient, RegistryClient};
pub use report::Reporter;
pub use runner::{CommandRunner, CommandSpec, CommandStage, ExecOutput, ProcessRunner};
pub use scan::{scan_packages, ScannedDir};
pub use telemetry::init_tracing;
pub use vcs::{GitCli, VcsStatusProvider};
