//! Content fingerprinting for package directories.
//!
//! The fingerprint is a SHA-256 digest over the sorted `git ls-files -s`
//! listing of a directory: it changes exactly when tracked file content or
//! the tracked file set changes, and ignores untracked files entirely.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::process::Command;
use tracing::debug;

use crate::domain::error::{MonopubError, Result};

/// Compute the content fingerprint of all tracked files under `dir`.
///
/// Fails when the directory is not inside a git work tree or git itself is
/// unavailable; callers record that as a `git-sha-load` exception and move
/// on with no fingerprint.
pub async fn content_fingerprint(dir: &Path) -> Result<String> {
    let output = Command::new("git")
        .args(["ls-files", "-s", "."])
        .current_dir(dir)
        .output()
        .await
        .map_err(|e| MonopubError::Git(format!("failed to run git ls-files: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MonopubError::Git(format!(
            "git ls-files failed in {}: {}",
            dir.display(),
            stderr.trim()
        )));
    }

    let listing = String::from_utf8_lossy(&output.stdout);
    let fingerprint = digest_listing(&listing);
    debug!(dir = %dir.display(), fingerprint = %fingerprint, "computed content fingerprint");
    Ok(fingerprint)
}

/// Hash a tracked-file listing. Lines are sorted first so the digest is
/// independent of enumeration order.
fn digest_listing(listing: &str) -> String {
    let mut lines: Vec<&str> = listing.lines().filter(|l| !l.is_empty()).collect();
    lines.sort_unstable();

    let mut hasher = Sha256::new();
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
