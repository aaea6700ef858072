//! In-memory fakes for the capability traits (testing only).
//!
//! Provides `MemoryRegistry`, `StaticVcs` and `ScriptedRunner` so decision
//! and orchestration behavior can be exercised without a network, a git
//! checkout or a package manager on PATH.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::error::{MonopubError, Result};
use crate::domain::package::{RegistryInfo, VcsStatus};
use crate::registry::RegistryClient;
use crate::runner::{CommandRunner, CommandSpec, CommandStage, ExecOutput};
use crate::vcs::VcsStatusProvider;

/// In-memory registry keyed by package name. Unknown names answer
/// not-found; names registered via [`MemoryRegistry::with_error`] fail the
/// lookup instead.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    packages: HashMap<String, RegistryInfo>,
    errors: HashMap<String, String>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(mut self, name: &str, info: RegistryInfo) -> Self {
        self.packages.insert(name.to_string(), info);
        self
    }

    pub fn with_error(mut self, name: &str, message: &str) -> Self {
        self.errors.insert(name.to_string(), message.to_string());
        self
    }
}

#[async_trait]
impl RegistryClient for MemoryRegistry {
    async fn package_info(&self, name: &str) -> Result<Option<RegistryInfo>> {
        if let Some(message) = self.errors.get(name) {
            return Err(MonopubError::Registry(message.clone()));
        }
        Ok(self.packages.get(name).cloned())
    }
}

/// VCS probe answering the same status for every directory.
#[derive(Debug, Default)]
pub struct StaticVcs {
    status: Option<VcsStatus>,
    failure: Option<String>,
}

impl StaticVcs {
    pub fn new(status: Option<VcsStatus>) -> Self {
        Self {
            status,
            failure: None,
        }
    }

    /// A probe whose every call fails.
    pub fn failing(message: &str) -> Self {
        Self {
            status: None,
            failure: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl VcsStatusProvider for StaticVcs {
    async fn status(&self, _dir: &Path) -> Result<Option<VcsStatus>> {
        if let Some(message) = &self.failure {
            return Err(MonopubError::Git(message.clone()));
        }
        Ok(self.status.clone())
    }
}

/// Command runner that records every invocation and optionally fails one
/// stage with a scripted exit code.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    fail_on: Option<(CommandStage, i32)>,
    invocations: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(stage: CommandStage, exit_code: i32) -> Self {
        Self {
            fail_on: Some((stage, exit_code)),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Everything run so far, in invocation order.
    pub fn invocations(&self) -> Vec<CommandSpec> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<ExecOutput> {
        self.invocations.lock().unwrap().push(spec.clone());

        let exit_code = match self.fail_on {
            Some((stage, code)) if stage == spec.stage => code,
            _ => 0,
        };
        Ok(ExecOutput {
            stage: spec.stage,
            exit_code,
            stdout: format!("ran {}", spec.rendered()),
            stderr: if exit_code == 0 {
                String::new()
            } else {
                format!("scripted failure for {}", spec.stage.name())
            },
            duration_ms: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_memory_registry_round_trip() {
        let mut dist_tags = BTreeMap::new();
        dist_tags.insert("latest".to_string(), "1.0.0".to_string());
        let registry = MemoryRegistry::new()
            .with_package("known", RegistryInfo { dist_tags })
            .with_error("broken", "boom");

        assert!(registry.package_info("known").await.unwrap().is_some());
        assert!(registry.package_info("unknown").await.unwrap().is_none());
        assert!(registry.package_info("broken").await.is_err());
    }

    #[tokio::test]
    async fn test_scripted_runner_fails_selected_stage() {
        let runner = ScriptedRunner::failing_at(CommandStage::Publish, 7);
        let install = CommandSpec::new(CommandStage::Install, "npm", &["ci"], PathBuf::from("."));
        let publish =
            CommandSpec::new(CommandStage::Publish, "npm", &["publish"], PathBuf::from("."));

        assert!(runner.run(&install).await.unwrap().success());
        let failed = runner.run(&publish).await.unwrap();
        assert_eq!(failed.exit_code, 7);
        assert_eq!(runner.invocations().len(), 2);
    }
}
