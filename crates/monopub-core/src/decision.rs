//! Publish decision engine.
//!
//! Pure rules combining a package's aggregated metadata with run-wide
//! options into a publish/verify/skip decision and the exact commands to
//! run. No I/O happens here: lockfile presence and VCS state arrive on the
//! [`PackageRecord`] and everything is derived from that.

use crate::domain::options::RunOptions;
use crate::domain::package::{PackageRecord, VcsStatus, LATEST_TAG, RELEASE_BRANCH};
use crate::orchestrate::ExitStatus;
use crate::runner::{CommandSpec, CommandStage};

const PACKAGE_LOCKFILE: &str = "package-lock.json";
const YARN_LOCKFILE: &str = "yarn.lock";
const MODULES_DIR: &str = "node_modules";

/// What a run should do with one package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Not opted in to publishing. `opted_out` distinguishes an explicit
    /// `publish != true` configuration from no configuration at all.
    Ignored { opted_out: bool },

    /// A release is due but this run is not publishing it (not requested,
    /// or gated by VCS state).
    Skip,

    /// Declared version already published and content unchanged.
    UpToDate,

    /// Content changed since last publish but the version was not bumped;
    /// nothing to run.
    ChangedNotReleased,

    /// Same as [`Action::ChangedNotReleased`] but running the verification
    /// pipeline.
    Verify,

    /// Run the full install/publish/tag-promote pipeline.
    Publish,
}

/// Outcome of the VCS eligibility check, with a reason when ineligible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsGate {
    pub allows_publish: bool,
    pub message: Option<String>,
}

/// The decision for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    pub will_publish: bool,
    pub commit_already_published: bool,
    pub version_already_published: bool,
    pub vcs_gate: VcsGate,
    /// `--force` overrode a gating objection.
    pub forced: bool,
    /// This package's contribution to the process exit status.
    pub exit: ExitStatus,
    /// Commands to run, in order. Empty for no-op decisions.
    pub commands: Vec<CommandSpec>,
}

/// Decide what to do with one package. Deterministic: identical inputs
/// always produce the identical decision.
pub fn decide(record: &PackageRecord, opts: &RunOptions) -> Decision {
    let vcs_gate = check_vcs_gate(record.vcs_status.as_ref(), opts.override_branch.as_deref());

    // Opt-in comes first and nothing overrides it, force included.
    match record.publish_config {
        None => return ignored(false, vcs_gate),
        Some(config) if !config.publish => return ignored(true, vcs_gate),
        Some(_) => {}
    }

    let commit_already_published = match (&record.registry_info, record.fingerprint_tag()) {
        (Some(info), Some(tag)) => info.has_tag(&tag),
        _ => false,
    };
    let declared_version = record
        .manifest
        .as_ref()
        .and_then(|m| m.version.as_deref());
    let version_already_published = match (&record.registry_info, declared_version) {
        (Some(info), Some(version)) => info.latest() == Some(version),
        _ => false,
    };

    if version_already_published {
        // No version bump happened; at most verify the changed content.
        if commit_already_published {
            return Decision {
                action: Action::UpToDate,
                will_publish: false,
                commit_already_published,
                version_already_published,
                vcs_gate,
                forced: false,
                exit: ExitStatus::Success,
                commands: Vec::new(),
            };
        }
        let (action, commands) = if opts.verify_modified {
            (Action::Verify, verify_commands(record))
        } else {
            (Action::ChangedNotReleased, Vec::new())
        };
        return Decision {
            action,
            will_publish: false,
            commit_already_published,
            version_already_published,
            vcs_gate,
            forced: false,
            exit: ExitStatus::Success,
            commands,
        };
    }

    // A release is due.
    let mut will_publish = opts.publish_requested;
    if commit_already_published {
        // Identical content already published under another version tag;
        // republishing takes an explicit force.
        will_publish = opts.publish_requested && opts.force;
    }
    if !opts.force {
        will_publish = will_publish && vcs_gate.allows_publish;
    }
    let mut forced = false;
    if !will_publish && opts.force {
        forced = true;
        will_publish = true;
    }

    let exit = if opts.publish_requested && !will_publish {
        ExitStatus::PublishGated
    } else {
        ExitStatus::Success
    };

    let commands = if will_publish && opts.publish_requested {
        publish_commands(record, opts)
    } else {
        Vec::new()
    };
    let action = if commands.is_empty() {
        Action::Skip
    } else {
        Action::Publish
    };

    Decision {
        action,
        will_publish,
        commit_already_published,
        version_already_published,
        vcs_gate,
        forced,
        exit,
        commands,
    }
}

fn ignored(opted_out: bool, vcs_gate: VcsGate) -> Decision {
    Decision {
        action: Action::Ignored { opted_out },
        will_publish: false,
        commit_already_published: false,
        version_already_published: false,
        vcs_gate,
        forced: false,
        exit: ExitStatus::Success,
        commands: Vec::new(),
    }
}

/// VCS eligibility. An explicit branch override substitutes the detected
/// branch (detached-checkout CI); each ineligible state gets its own
/// reason string.
pub fn check_vcs_gate(status: Option<&VcsStatus>, override_branch: Option<&str>) -> VcsGate {
    let Some(status) = status else {
        return VcsGate {
            allows_publish: false,
            message: Some("No git status found".to_string()),
        };
    };

    let branch = override_branch.unwrap_or(&status.branch);
    if branch != RELEASE_BRANCH {
        return VcsGate {
            allows_publish: false,
            message: Some(format!(
                "Not on {RELEASE_BRANCH} branch, will only publish from {RELEASE_BRANCH} branch (current branch: {branch})."
            )),
        };
    }
    if status.modified() {
        let message = if status.ahead_count > 0 {
            "Unpushed changes in project. Execute git status for details."
        } else {
            "Uncommitted changes in project. Execute git status for details."
        };
        return VcsGate {
            allows_publish: false,
            message: Some(message.to_string()),
        };
    }
    VcsGate {
        allows_publish: true,
        message: None,
    }
}

/// Installer choice: reproducible install when a lockfile exists, plain
/// install otherwise, nothing at all when dependencies are already
/// materialized.
fn install_command(record: &PackageRecord) -> Option<CommandSpec> {
    if record.has_entry(MODULES_DIR) {
        return None;
    }
    let spec = if record.has_entry(PACKAGE_LOCKFILE) {
        CommandSpec::new(CommandStage::Install, "npm", &["ci"], record.path.clone())
    } else if record.has_entry(YARN_LOCKFILE) {
        CommandSpec::new(
            CommandStage::Install,
            "yarn",
            &["install", "--frozen-lockfile"],
            record.path.clone(),
        )
    } else {
        CommandSpec::new(
            CommandStage::Install,
            "npm",
            &["install"],
            record.path.clone(),
        )
    };
    Some(spec)
}

/// Install + publish + tag-promote. The publish and tag-promote commands
/// carry the dry-run flag when requested; the install never does. Packages
/// without a declared name/version or without a fingerprint are excluded
/// from the publish/tag stages.
fn publish_commands(record: &PackageRecord, opts: &RunOptions) -> Vec<CommandSpec> {
    let mut commands = Vec::new();
    commands.extend(install_command(record));

    if let (Some((name, version)), Some(tag)) = (record.name_and_version(), record.fingerprint_tag())
    {
        let mut publish_args = vec!["publish".to_string(), "--tag".to_string(), tag];
        if opts.dry_run {
            publish_args.push("--dry-run".to_string());
        }
        commands.push(CommandSpec {
            stage: CommandStage::Publish,
            program: "npm".to_string(),
            args: publish_args,
            cwd: record.path.clone(),
        });

        let mut tag_args = vec![
            "dist-tag".to_string(),
            "add".to_string(),
            format!("{name}@{version}"),
            LATEST_TAG.to_string(),
        ];
        if opts.dry_run {
            tag_args.push("--dry-run".to_string());
        }
        commands.push(CommandSpec {
            stage: CommandStage::TagPromote,
            program: "npm".to_string(),
            args: tag_args,
            cwd: record.path.clone(),
        });
    }

    commands
}

/// Install + verification script, no publish.
fn verify_commands(record: &PackageRecord) -> Vec<CommandSpec> {
    let mut commands = Vec::new();
    commands.extend(install_command(record));
    commands.push(CommandSpec::new(
        CommandStage::Verify,
        "npm",
        &["run", "prepublishOnly"],
        record.path.clone(),
    ));
    commands
}
