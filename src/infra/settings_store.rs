//! Persistence for the settings document and the default host document.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::config::{RawSettings, settings_document_path};
use crate::purge::DEFAULT_HOSTS_JSON;

use super::error::InfraError;

/// Host document location written next to a reset settings document.
const DEFAULT_HOSTS_FILE: &str = "hosts.json";

/// Rewrite the site's settings document under `root` with factory defaults and
/// create the default host document when none exists.
///
/// Returns the settings path that was written.
pub async fn factory_reset(root: &Path, site_id: Option<&str>) -> Result<PathBuf, InfraError> {
    let path = root.join(settings_document_path(site_id));
    let document = toml::to_string_pretty(&RawSettings::factory_defaults())?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&path, document).await?;

    info!(
        target = "edgepurge::settings",
        path = %path.display(),
        "settings reset to factory defaults"
    );

    ensure_hosts_document(&root.join(DEFAULT_HOSTS_FILE)).await?;
    Ok(path)
}

/// Write the default host document to `path` unless a file already exists.
///
/// Returns `true` when the document was created.
pub async fn ensure_hosts_document(path: &Path) -> Result<bool, InfraError> {
    if fs::try_exists(path).await? {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, DEFAULT_HOSTS_JSON).await?;

    info!(
        target = "edgepurge::settings",
        path = %path.display(),
        "default host document created"
    );
    Ok(true)
}
