//! Version-control status probing.
//!
//! The probe is a capability trait so runs can be driven by the system git
//! in production and by fakes in tests.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::error::{MonopubError, Result};
use crate::domain::package::VcsStatus;

/// Capability: report version-control state for a directory.
#[async_trait]
pub trait VcsStatusProvider: Send + Sync {
    /// `Ok(None)` means the directory is not under version control, which
    /// is a valid state, not an error.
    async fn status(&self, dir: &Path) -> Result<Option<VcsStatus>>;
}

/// Production probe backed by the system `git` binary.
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    async fn git(dir: &Path, args: &[&str]) -> Result<std::process::Output> {
        Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .await
            .map_err(|e| MonopubError::Git(format!("failed to run git: {e}")))
    }

    async fn branch_name(dir: &Path) -> Result<String> {
        let output = Self::git(dir, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MonopubError::Git(format!(
                "git rev-parse --abbrev-ref HEAD failed: {}",
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Count commits the local branch is ahead of its upstream. A branch
    /// with no upstream configured counts as zero.
    async fn ahead_count(dir: &Path) -> u32 {
        let output = Self::git(dir, &["rev-list", "--count", "@{upstream}..HEAD"]).await;
        match output {
            Ok(o) if o.status.success() => String::from_utf8_lossy(&o.stdout)
                .trim()
                .parse()
                .unwrap_or(0),
            _ => 0,
        }
    }

    async fn porcelain_counts(dir: &Path) -> Result<(u32, u32)> {
        let output = Self::git(dir, &["status", "--porcelain"]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MonopubError::Git(format!(
                "git status --porcelain failed: {}",
                stderr.trim()
            )));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let mut dirty = 0u32;
        let mut untracked = 0u32;
        for line in text.lines() {
            if line.is_empty() {
                continue;
            }
            if line.starts_with("??") {
                untracked += 1;
            } else {
                dirty += 1;
            }
        }
        Ok((dirty, untracked))
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VcsStatusProvider for GitCli {
    async fn status(&self, dir: &Path) -> Result<Option<VcsStatus>> {
        let inside = Self::git(dir, &["rev-parse", "--is-inside-work-tree"]).await?;
        if !inside.status.success() {
            return Ok(None);
        }

        let branch = Self::branch_name(dir).await?;
        let (dirty, untracked) = Self::porcelain_counts(dir).await?;
        let ahead = Self::ahead_count(dir).await;

        let status = VcsStatus {
            branch,
            is_dirty: dirty > 0,
            ahead_count: ahead,
            untracked_count: untracked,
        };
        debug!(dir = %dir.display(), ?status, "probed vcs status");
        Ok(Some(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::process::Command as StdCommand;

    fn run_git(repo_dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn make_git_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run_git(dir.path(), &["init", "-b", "master"]);
        run_git(dir.path(), &["config", "user.name", "test-user"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["commit", "--allow-empty", "-m", "initial"]);
        dir
    }

    #[tokio::test]
    async fn test_status_outside_repo_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let status = GitCli::new().status(dir.path()).await.unwrap();
        assert!(status.is_none());
    }

    #[tokio::test]
    async fn test_clean_repo_status() {
        let repo = make_git_repo();
        let status = GitCli::new().status(repo.path()).await.unwrap().unwrap();
        assert_eq!(status.branch, "master");
        assert!(!status.is_dirty);
        assert_eq!(status.untracked_count, 0);
        assert!(!status.modified());
    }

    #[tokio::test]
    async fn test_untracked_file_is_counted() {
        let repo = make_git_repo();
        fs::write(repo.path().join("new.js"), "x").unwrap();

        let status = GitCli::new().status(repo.path()).await.unwrap().unwrap();
        assert_eq!(status.untracked_count, 1);
        assert!(status.modified());
    }

    #[tokio::test]
    async fn test_staged_change_is_dirty() {
        let repo = make_git_repo();
        fs::write(repo.path().join("a.js"), "x").unwrap();
        run_git(repo.path(), &["add", "a.js"]);

        let status = GitCli::new().status(repo.path()).await.unwrap().unwrap();
        assert!(status.is_dirty);
    }
}
