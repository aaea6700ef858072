//! Package records and the metadata collected for each discovered package.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::domain::error::{MonopubError, Result};

/// Manifest file that marks a directory as a package.
pub const MANIFEST_FILE: &str = "package.json";

/// Sidecar configuration file; overrides the inline manifest key.
pub const SIDECAR_CONFIG_FILE: &str = "monopub.json";

/// Key in the manifest carrying inline monopub configuration.
pub const INLINE_CONFIG_KEY: &str = "monopub";

/// Prefix for fingerprint-derived registry dist-tags.
pub const FINGERPRINT_TAG_PREFIX: &str = "MP";

/// The only branch publishes are allowed from (without `--force`).
pub const RELEASE_BRANCH: &str = "master";

/// Registry dist-tag naming the current release.
pub const LATEST_TAG: &str = "latest";

/// Exception kinds recorded during metadata aggregation.
pub mod exception {
    pub const MANIFEST_LOAD: &str = "manifest-load";
    pub const PUBLISH_CONFIG_LOAD: &str = "publish-config-load";
    pub const GIT_SHA_LOAD: &str = "git-sha-load";
    pub const REGISTRY_PACKAGE_INFO: &str = "registry-package-info";
    pub const VCS_STATUS: &str = "vcs-status";
    pub const NO_DIST_TAGS: &str = "package-no-dist-tags";
}

/// Parsed package manifest. Name and version are optional: an incomplete
/// manifest still flows through install/verify handling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
}

impl Manifest {
    /// Parse manifest text, returning the manifest plus any inline
    /// monopub configuration found under [`INLINE_CONFIG_KEY`].
    pub fn parse(text: &str) -> Result<(Manifest, Option<PublishConfig>)> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let inline = value
            .get(INLINE_CONFIG_KEY)
            .cloned()
            .map(serde_json::from_value::<PublishConfig>)
            .transpose()
            .map_err(|e| MonopubError::Manifest(format!("invalid {INLINE_CONFIG_KEY} key: {e}")))?;
        let manifest: Manifest = serde_json::from_value(value)?;
        Ok((manifest, inline))
    }
}

/// Per-package publish opt-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub publish: bool,
}

/// Resolve the effective publish configuration from its two optional
/// sources. The sidecar file wins over the inline manifest key.
pub fn resolve_publish_config(
    inline: Option<PublishConfig>,
    sidecar: Option<PublishConfig>,
) -> Option<PublishConfig> {
    sidecar.or(inline)
}

/// Registry metadata for a published package. Only the dist-tags mapping is
/// consumed; the rest of the registry document is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryInfo {
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: BTreeMap<String, String>,
}

impl RegistryInfo {
    /// Version currently published under the `latest` tag.
    pub fn latest(&self) -> Option<&str> {
        self.dist_tags.get(LATEST_TAG).map(String::as_str)
    }

    /// Whether a dist-tag with this exact name exists. The tag's value is
    /// irrelevant; presence of the key is the published-fingerprint marker.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.dist_tags.contains_key(tag)
    }
}

/// Version-control state of a package directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsStatus {
    /// Branch name, or `HEAD` for a detached checkout.
    pub branch: String,

    /// Tracked files with uncommitted modifications exist.
    pub is_dirty: bool,

    /// Commits not pushed to the upstream branch.
    pub ahead_count: u32,

    /// Files not known to version control.
    pub untracked_count: u32,
}

impl VcsStatus {
    /// Whether the working tree deviates from the pushed upstream state.
    pub fn modified(&self) -> bool {
        self.is_dirty || self.ahead_count > 0 || self.untracked_count > 0
    }
}

/// A non-fatal failure captured while collecting package metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadException {
    /// One of the [`exception`] kinds.
    pub kind: &'static str,

    /// Human-readable failure description.
    pub error: String,
}

/// One discovered package and everything collected about it.
///
/// Records are created from scanner output, enriched stage by stage in the
/// aggregator and then consumed by the decision engine. They do not outlive
/// a single run.
#[derive(Debug, Clone)]
pub struct PackageRecord {
    /// Absolute package directory; identity key within a run.
    pub path: PathBuf,

    /// Path relative to the scanned root, for display.
    pub relative_path: PathBuf,

    /// Directory entry names captured by the scanner (lockfile and
    /// node_modules probes for the decision engine).
    pub entries: Vec<String>,

    pub manifest: Option<Manifest>,
    pub publish_config: Option<PublishConfig>,
    pub content_fingerprint: Option<String>,
    pub vcs_status: Option<VcsStatus>,
    pub registry_info: Option<RegistryInfo>,

    /// Non-fatal data-collection failures, in the order they occurred.
    pub load_exceptions: Vec<LoadException>,
}

impl PackageRecord {
    pub fn new(path: PathBuf, relative_path: PathBuf, entries: Vec<String>) -> Self {
        Self {
            path,
            relative_path,
            entries,
            manifest: None,
            publish_config: None,
            content_fingerprint: None,
            vcs_status: None,
            registry_info: None,
            load_exceptions: Vec::new(),
        }
    }

    /// Whether the scanner saw a directory entry with this exact name.
    pub fn has_entry(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e == name)
    }

    pub fn push_exception(&mut self, kind: &'static str, error: impl Into<String>) {
        self.load_exceptions.push(LoadException {
            kind,
            error: error.into(),
        });
    }

    /// Manifest name and version when both are declared.
    pub fn name_and_version(&self) -> Option<(&str, &str)> {
        let manifest = self.manifest.as_ref()?;
        Some((
            manifest.name.as_deref()?,
            manifest.version.as_deref()?,
        ))
    }

    /// The registry dist-tag marking this package's current content.
    pub fn fingerprint_tag(&self) -> Option<String> {
        self.content_fingerprint
            .as_deref()
            .map(|sha| format!("{FINGERPRINT_TAG_PREFIX}{sha}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_parse_extracts_inline_config() {
        let text = r#"{"name": "pkg-a", "version": "1.2.3", "monopub": {"publish": true}}"#;
        let (manifest, inline) = Manifest::parse(text).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("pkg-a"));
        assert_eq!(manifest.version.as_deref(), Some("1.2.3"));
        assert_eq!(inline, Some(PublishConfig { publish: true }));
    }

    #[test]
    fn test_manifest_parse_tolerates_missing_fields() {
        let (manifest, inline) = Manifest::parse(r#"{"private": true}"#).unwrap();
        assert!(manifest.name.is_none());
        assert!(manifest.version.is_none());
        assert!(inline.is_none());
    }

    #[test]
    fn test_manifest_parse_rejects_bad_json() {
        assert!(Manifest::parse("{not json").is_err());
    }

    #[test]
    fn test_sidecar_config_wins_over_inline() {
        let inline = Some(PublishConfig { publish: true });
        let sidecar = Some(PublishConfig { publish: false });
        assert_eq!(resolve_publish_config(inline, sidecar), sidecar);
        assert_eq!(resolve_publish_config(inline, None), inline);
        assert_eq!(resolve_publish_config(None, None), None);
    }

    #[test]
    fn test_registry_info_tag_presence() {
        let doc = r#"{"name": "pkg-a", "dist-tags": {"latest": "1.0.0", "MPabc123": "0.9.0"}}"#;
        let info: RegistryInfo = serde_json::from_str(doc).unwrap();
        assert_eq!(info.latest(), Some("1.0.0"));
        assert!(info.has_tag("MPabc123"));
        assert!(!info.has_tag("MPother"));
    }

    #[test]
    fn test_vcs_status_modified() {
        let clean = VcsStatus {
            branch: "master".to_string(),
            is_dirty: false,
            ahead_count: 0,
            untracked_count: 0,
        };
        assert!(!clean.modified());

        let ahead = VcsStatus {
            ahead_count: 2,
            ..clean.clone()
        };
        assert!(ahead.modified());

        let untracked = VcsStatus {
            untracked_count: 1,
            ..clean
        };
        assert!(untracked.modified());
    }

    #[test]
    fn test_fingerprint_tag() {
        let mut record = PackageRecord::new(
            PathBuf::from("/repo/pkg-a"),
            PathBuf::from("pkg-a"),
            vec![],
        );
        assert!(record.fingerprint_tag().is_none());
        record.content_fingerprint = Some("abc123".to_string());
        assert_eq!(record.fingerprint_tag().as_deref(), Some("MPabc123"));
    }
}
