use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::{ArchiveKind, EnvVar, HostPlatform, VersionPrefix};

/// Ecosystem-specific facts consumed by the installer.
///
/// Catalog lists are returned newest first; the resolver relies on that
/// order for its fallbacks.
pub trait ProviderAdapter {
    /// Toolchain name, also the install-root directory and config key.
    fn name(&self) -> &str;

    fn version_prefix(&self) -> VersionPrefix {
        VersionPrefix::Bare
    }

    /// One entry per release line, newest patch only.
    fn list_filtered(&self) -> Result<Vec<String>>;

    /// Every published version.
    fn list_all(&self) -> Result<Vec<String>>;

    /// `Ok(None)` when upstream publishes nothing for this platform.
    fn download_url(&self, version: &str, platform: &HostPlatform) -> Result<Option<String>>;

    fn expected_sha256(&self, _version: &str, _platform: &HostPlatform) -> Result<Option<String>> {
        Ok(None)
    }

    fn archive_kind(&self) -> ArchiveKind;

    /// Consulted when [`ProviderAdapter::archive_kind`] is `Auto`.
    fn archive_kind_for_file(&self, path: &Path) -> Option<ArchiveKind> {
        ArchiveKind::infer_from_path(path)
    }

    /// Directory inside the extracted tree whose contents belong at the
    /// install root.
    fn extract_subdir(&self, _version: &str, _archive: &Path) -> Option<String> {
        None
    }

    fn bin_dir(&self, install_root: &Path) -> PathBuf;

    fn configure_env(&self, version: &str, install_root: &Path) -> Result<Vec<EnvVar>>;

    fn pre_install(&self, _version: &str) -> Result<()> {
        Ok(())
    }

    fn post_install(&self, _version: &str, _install_root: &Path) -> Result<()> {
        Ok(())
    }

    fn components(&self) -> Option<&dyn HasComponents> {
        None
    }
}

/// Toolchains that ship several independently activated parts under one
/// umbrella (an SDK next to its runtimes).
pub trait HasComponents {
    fn component(&self) -> &str;

    fn supported_components(&self) -> &'static [&'static str];
}
