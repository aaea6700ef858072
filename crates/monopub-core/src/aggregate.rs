//! Metadata aggregation.
//!
//! Turns scanner output into fully populated [`PackageRecord`]s by
//! threading each record through a fixed stage order: manifest →
//! publish-config → fingerprint → registry → VCS status. Stages are
//! owned-value transforms; a failing stage appends a [`LoadException`] and
//! hands the record on otherwise unchanged. One package's failure never
//! blocks another's aggregation.

use std::sync::Arc;

use tracing::debug;

use crate::domain::package::{
    exception, resolve_publish_config, Manifest, PackageRecord, PublishConfig,
    MANIFEST_FILE, SIDECAR_CONFIG_FILE,
};
use crate::fingerprint::content_fingerprint;
use crate::registry::RegistryClient;
use crate::scan::ScannedDir;
use crate::vcs::VcsStatusProvider;

/// Aggregate all scanned packages concurrently, one task per package.
///
/// The returned batch preserves scan order, so reporting stays stable
/// regardless of which package finished its lookups first.
pub async fn aggregate_packages(
    scanned: Vec<ScannedDir>,
    registry: Arc<dyn RegistryClient>,
    vcs: Arc<dyn VcsStatusProvider>,
) -> anyhow::Result<Vec<PackageRecord>> {
    let mut tasks = Vec::new();
    for dir in scanned {
        let registry = Arc::clone(&registry);
        let vcs = Arc::clone(&vcs);
        tasks.push(tokio::spawn(async move {
            augment(dir, registry.as_ref(), vcs.as_ref()).await
        }));
    }

    let records = futures::future::join_all(tasks)
        .await
        .into_iter()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Run one package through the augmentation stages.
async fn augment(
    dir: ScannedDir,
    registry: &dyn RegistryClient,
    vcs: &dyn VcsStatusProvider,
) -> PackageRecord {
    let record = PackageRecord::new(dir.path, dir.relative_path, dir.entries);
    let record = load_manifest(record).await;
    let record = load_publish_config(record).await;
    let record = add_fingerprint(record).await;
    let record = add_registry_info(record, registry).await;
    let record = add_vcs_status(record, vcs).await;
    debug!(package = %record.path.display(), exceptions = record.load_exceptions.len(), "aggregation complete");
    record
}

/// Stage 1: parse the manifest; inline publish configuration rides along.
async fn load_manifest(mut record: PackageRecord) -> PackageRecord {
    let manifest_path = record.path.join(MANIFEST_FILE);
    let text = match tokio::fs::read_to_string(&manifest_path).await {
        Ok(text) => text,
        Err(e) => {
            record.push_exception(exception::MANIFEST_LOAD, e.to_string());
            return record;
        }
    };
    match Manifest::parse(&text) {
        Ok((manifest, inline_config)) => {
            if manifest.name.is_none() || manifest.version.is_none() {
                record.push_exception(
                    exception::MANIFEST_LOAD,
                    format!("{} declares no name or no version", manifest_path.display()),
                );
            }
            record.manifest = Some(manifest);
            record.publish_config = inline_config;
        }
        Err(e) => record.push_exception(exception::MANIFEST_LOAD, e.to_string()),
    }
    record
}

/// Stage 2: resolve the effective publish configuration. The sidecar file
/// overrides the inline key captured in stage 1.
async fn load_publish_config(mut record: PackageRecord) -> PackageRecord {
    let sidecar_path = record.path.join(SIDECAR_CONFIG_FILE);
    let sidecar = if record.has_entry(SIDECAR_CONFIG_FILE) {
        match tokio::fs::read_to_string(&sidecar_path).await {
            Ok(text) => match serde_json::from_str::<PublishConfig>(&text) {
                Ok(config) => Some(config),
                Err(e) => {
                    record.push_exception(exception::PUBLISH_CONFIG_LOAD, e.to_string());
                    None
                }
            },
            Err(e) => {
                record.push_exception(exception::PUBLISH_CONFIG_LOAD, e.to_string());
                None
            }
        }
    } else {
        None
    };
    record.publish_config = resolve_publish_config(record.publish_config, sidecar);
    record
}

/// Stage 3: content fingerprint from the tracked-file listing.
async fn add_fingerprint(mut record: PackageRecord) -> PackageRecord {
    match content_fingerprint(&record.path).await {
        Ok(fingerprint) => record.content_fingerprint = Some(fingerprint),
        Err(e) => record.push_exception(exception::GIT_SHA_LOAD, e.to_string()),
    }
    record
}

/// Stage 4: registry lookup. Not-found is the valid never-published state;
/// only other failures become exceptions. Skipped when the manifest gave
/// us no name to query.
async fn add_registry_info(mut record: PackageRecord, registry: &dyn RegistryClient) -> PackageRecord {
    let Some(name) = record.manifest.as_ref().and_then(|m| m.name.clone()) else {
        return record;
    };
    match registry.package_info(&name).await {
        Ok(Some(info)) => {
            if info.dist_tags.is_empty() {
                record.push_exception(
                    exception::NO_DIST_TAGS,
                    format!("{} ({name}) has no dist-tags", record.path.display()),
                );
            }
            record.registry_info = Some(info);
        }
        Ok(None) => {}
        Err(e) => record.push_exception(exception::REGISTRY_PACKAGE_INFO, e.to_string()),
    }
    record
}

/// Stage 5: VCS status probe.
async fn add_vcs_status(mut record: PackageRecord, vcs: &dyn VcsStatusProvider) -> PackageRecord {
    match vcs.status(&record.path).await {
        Ok(status) => record.vcs_status = status,
        Err(e) => record.push_exception(exception::VCS_STATUS, e.to_string()),
    }
    record
}
