use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use svm_config::{ConfigStore, SdkKey, VersionRecord};
use svm_core::{
    is_download_failure, ArchiveKind, HostPlatform, ProviderAdapter, SvmError, Transport,
};
use svm_resolver::{next_older_candidate, resolve_version};
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::checksum::verify_sha256;
use crate::extract::extract_archive;
use crate::fs_utils::{flatten_subdir, remove_file_if_exists, remove_path, reset_dir};
use crate::layout::{cache_file_path, ToolchainLayout};
use crate::sdk_key;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub version: String,
    pub install_dir: PathBuf,
    /// Candidates abandoned after a download failure, newest first.
    pub skipped: Vec<String>,
}

struct PreparedDir {
    dir: PathBuf,
    created: bool,
}

/// Drives resolve, prepare, fetch, extract, flatten and post-install for one
/// provider, stepping down to older candidates when a download fails.
pub struct Installer<'a> {
    provider: &'a dyn ProviderAdapter,
    transport: &'a dyn Transport,
    platform: HostPlatform,
}

impl<'a> Installer<'a> {
    pub fn new(
        provider: &'a dyn ProviderAdapter,
        transport: &'a dyn Transport,
        platform: HostPlatform,
    ) -> Self {
        Self {
            provider,
            transport,
            platform,
        }
    }

    pub fn provider(&self) -> &'a dyn ProviderAdapter {
        self.provider
    }

    pub fn key(&self) -> SdkKey {
        sdk_key(self.provider)
    }

    pub fn layout(&self, config: &ConfigStore) -> ToolchainLayout {
        ToolchainLayout::for_key(config, &self.key())
    }

    /// Filtered catalog, newest first.
    pub fn candidates(&self) -> Result<Vec<String>> {
        self.provider.list_filtered().map_err(|err| {
            SvmError::CatalogFetch {
                toolchain: self.provider.name().to_string(),
                message: format!("{err:#}"),
            }
            .into()
        })
    }

    pub fn install(&self, config: &mut ConfigStore, requested: &str) -> Result<InstallOutcome> {
        let candidates = self.candidates()?;
        let prefix = self.provider.version_prefix();
        let normalized = prefix.add(requested.trim());
        let strip = prefix.strip_token(&normalized);
        let resolution = resolve_version(&normalized, &candidates, &strip)
            .ok_or_else(|| SvmError::Resolution {
                toolchain: self.key().to_string(),
                requested: requested.to_string(),
            })?;
        if resolution.version != normalized {
            info!(
                requested,
                resolved = %resolution.version,
                rule = ?resolution.rule,
                "resolved version request"
            );
        }
        self.install_resolved(config, requested, &candidates, &resolution.version)
    }

    /// Installs `version`, falling back through older `candidates` while
    /// downloads fail.
    pub fn install_resolved(
        &self,
        config: &mut ConfigStore,
        requested: &str,
        candidates: &[String],
        version: &str,
    ) -> Result<InstallOutcome> {
        let mut version = version.to_string();
        let mut skipped = Vec::new();
        loop {
            if let Some(install_dir) = self.installed_dir(config, &version) {
                debug!(version = %version, dir = %install_dir.display(), "already installed");
                return Ok(InstallOutcome {
                    version,
                    install_dir,
                    skipped,
                });
            }
            match self.install_version(config, &version) {
                Ok(install_dir) => {
                    return Ok(InstallOutcome {
                        version,
                        install_dir,
                        skipped,
                    });
                }
                Err(err) if is_download_failure(&err) => {
                    warn!(
                        version = %version,
                        error = %format!("{err:#}"),
                        "download failed, trying an older version"
                    );
                    let next = next_older_candidate(&version, candidates).map(str::to_string);
                    skipped.push(version);
                    match next {
                        Some(next) => version = next,
                        None => {
                            return Err(SvmError::NoInstallableVersion {
                                toolchain: self.key().to_string(),
                                requested: requested.to_string(),
                            }
                            .into());
                        }
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// The recorded install dir of `version`, when it is still on disk.
    fn installed_dir(&self, config: &ConfigStore, version: &str) -> Option<PathBuf> {
        config
            .version_info(&self.key(), version)
            .filter(|record| record.is_installed() && record.install_dir.is_dir())
            .map(|record| record.install_dir.clone())
    }

    /// One pass of the state machine for a concrete version. A download
    /// failure discards the version dir only when this pass created it.
    pub fn install_version(&self, config: &mut ConfigStore, version: &str) -> Result<PathBuf> {
        self.provider.pre_install(version)?;
        let prepared = self.prepare_dir(config, version)?;
        let result = self.obtain_archive(config, version).and_then(|archive| {
            self.unpack(version, &archive, &prepared.dir)?;
            self.provider.post_install(version, &prepared.dir)
        });

        match result {
            Ok(()) => {
                info!(toolchain = %self.key(), version, dir = %prepared.dir.display(), "installed");
                Ok(prepared.dir)
            }
            Err(err) => {
                if is_download_failure(&err) {
                    self.discard_attempt(config, version, &prepared)?;
                }
                Err(err)
            }
        }
    }

    fn prepare_dir(&self, config: &mut ConfigStore, version: &str) -> Result<PreparedDir> {
        let key = self.key();
        let existing = config.version_info(&key, version).cloned().unwrap_or_default();
        if existing.is_installed() && existing.install_dir.is_dir() {
            debug!(dir = %existing.install_dir.display(), "reusing recorded install dir");
            return Ok(PreparedDir {
                dir: existing.install_dir,
                created: false,
            });
        }

        let install_dir = self.layout(config).version_dir(version);
        reset_dir(&install_dir)?;
        config.set_version_info(
            &key,
            version,
            VersionRecord {
                install_dir: install_dir.clone(),
                cache_file_path: existing.cache_file_path,
            },
        )?;
        Ok(PreparedDir {
            dir: install_dir,
            created: true,
        })
    }

    fn obtain_archive(&self, config: &mut ConfigStore, version: &str) -> Result<PathBuf> {
        let key = self.key();
        if let Some(path) = CacheStore::new(config).get(&key, version) {
            debug!(path = %path.display(), "using cached archive");
            return Ok(path);
        }

        let url = match self.provider.download_url(version, &self.platform) {
            Ok(Some(url)) if !url.trim().is_empty() => url,
            Ok(_) => {
                return Err(self.download_error(version, "no download available for this platform"));
            }
            Err(err) => return Err(self.download_error(version, format!("{err:#}"))),
        };

        let dest = cache_file_path(&config.cache_dir(), self.provider.name(), &url);
        info!(url = %url, "downloading");
        self.transport
            .download(&url, &dest)
            .map_err(|err| self.download_error(version, format!("{err:#}")))?;

        let expected = self
            .provider
            .expected_sha256(version, &self.platform)
            .unwrap_or_else(|err| {
                warn!(error = %format!("{err:#}"), "checksum lookup failed");
                None
            });
        if let Some(expected) = expected {
            if let Err(err) = verify_sha256(&dest, &expected) {
                let _ = remove_file_if_exists(&dest);
                return Err(self.download_error(version, format!("{err:#}")));
            }
        }

        CacheStore::new(config).put(&key, version, &dest)?;
        Ok(dest)
    }

    fn unpack(&self, version: &str, archive: &Path, install_dir: &Path) -> Result<()> {
        let kind = match self.provider.archive_kind() {
            ArchiveKind::Auto => self.provider.archive_kind_for_file(archive).ok_or_else(|| {
                SvmError::Extraction {
                    path: archive.to_path_buf(),
                    message: "unsupported archive type".to_string(),
                }
            })?,
            kind => kind,
        };

        match kind {
            ArchiveKind::Zip | ArchiveKind::TarGz => extract_archive(archive, install_dir, kind)?,
            ArchiveKind::PlatformInstaller => {
                let name = archive.file_name().ok_or_else(|| SvmError::Extraction {
                    path: archive.to_path_buf(),
                    message: "installer path has no file name".to_string(),
                })?;
                let target = install_dir.join(name);
                fs::copy(archive, &target).with_context(|| {
                    format!("failed to copy {} to {}", archive.display(), target.display())
                })?;
            }
            ArchiveKind::Auto => {
                return Err(SvmError::Extraction {
                    path: archive.to_path_buf(),
                    message: "archive type could not be determined".to_string(),
                }
                .into());
            }
        }

        if let Some(subdir) = self
            .provider
            .extract_subdir(version, archive)
            .filter(|subdir| !subdir.is_empty())
        {
            flatten_subdir(install_dir, &subdir)?;
        }
        Ok(())
    }

    /// Undoes a failed pass: the dir it created goes, and so does the
    /// record. A `current` link naming the version is removed with the
    /// binding. A dir reused from an earlier install is left alone.
    fn discard_attempt(
        &self,
        config: &mut ConfigStore,
        version: &str,
        prepared: &PreparedDir,
    ) -> Result<()> {
        if !prepared.created {
            debug!(dir = %prepared.dir.display(), "keeping existing install dir");
            return Ok(());
        }

        let key = self.key();
        remove_path(&prepared.dir)?;
        if config.current_version(&key) == Some(version) {
            remove_path(&self.layout(config).current_link())?;
        }
        config.remove_version_info(&key, version)
    }

    fn download_error(&self, version: &str, message: impl Into<String>) -> anyhow::Error {
        SvmError::Download {
            toolchain: self.key().to_string(),
            version: version.to_string(),
            message: message.into(),
        }
        .into()
    }
}
