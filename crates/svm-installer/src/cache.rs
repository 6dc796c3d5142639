use std::path::{Path, PathBuf};

use anyhow::Result;
use svm_config::{ConfigStore, SdkKey, VersionRecord};
use svm_core::has_installer_extension;
use tracing::debug;

/// Downloaded archives by (toolchain, version), persisted in the config.
///
/// Entries are never evicted here.
pub struct CacheStore<'a> {
    config: &'a mut ConfigStore,
}

impl<'a> CacheStore<'a> {
    pub fn new(config: &'a mut ConfigStore) -> Self {
        Self { config }
    }

    /// A recorded archive that is still on disk and safe to reuse unattended.
    pub fn get(&self, key: &SdkKey, version: &str) -> Option<PathBuf> {
        let record = self.config.version_info(key, version)?;
        if !record.has_cache_file() {
            return None;
        }

        let path = &record.cache_file_path;
        if !path.is_file() {
            debug!(%key, version, path = %path.display(), "cached archive vanished");
            return None;
        }
        if has_installer_extension(path) {
            debug!(%key, version, path = %path.display(), "installer downloads are not reused");
            return None;
        }
        Some(path.clone())
    }

    /// Records `path` for `version`, keeping any install dir already recorded.
    pub fn put(&mut self, key: &SdkKey, version: &str, path: &Path) -> Result<()> {
        let install_dir = self
            .config
            .version_info(key, version)
            .map(|record| record.install_dir.clone())
            .unwrap_or_default();
        self.config.set_version_info(
            key,
            version,
            VersionRecord {
                install_dir,
                cache_file_path: path.to_path_buf(),
            },
        )
    }
}
