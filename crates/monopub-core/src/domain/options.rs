//! Run-wide options, resolved once from the CLI surface.

use serde::{Deserialize, Serialize};

/// Options governing a single monopub run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Publish actions were requested (`--publish`). Absent means dry
    /// inspection only, independent of `dry_run`.
    pub publish_requested: bool,

    /// Override VCS-eligibility gating. Never overrides per-package opt-in.
    pub force: bool,

    /// Pass the package manager's no-op flag to publish and tag-promote
    /// commands (never to install).
    pub dry_run: bool,

    /// Run the verification script for packages whose content changed while
    /// the declared version did not.
    pub verify_modified: bool,

    /// Branch name declared explicitly, for detached checkouts where the
    /// probe cannot detect one. Takes precedence over the detected branch.
    pub override_branch: Option<String>,

    /// Emit a line for packages that are present but not opted in.
    pub show_ignored: bool,
}
