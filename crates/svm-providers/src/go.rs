use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::Deserialize;
use svm_core::{ArchiveKind, EnvVar, HostArch, HostOs, HostPlatform, ProviderAdapter, Transport};

use crate::catalog::{fetch_json, newest_per_line, sorted_desc};

const CATALOG_URL: &str = "https://go.dev/dl/?mode=json&include=all";
const DOWNLOAD_URL: &str = "https://dl.google.com/go";

#[derive(Debug, Clone, Deserialize)]
struct GoRelease {
    version: String,
    #[serde(default)]
    stable: bool,
    #[serde(default)]
    files: Vec<GoFile>,
}

#[derive(Debug, Clone, Deserialize)]
struct GoFile {
    filename: String,
    #[serde(default)]
    sha256: String,
}

impl GoRelease {
    fn bare_version(&self) -> &str {
        self.version.strip_prefix("go").unwrap_or(&self.version)
    }
}

/// Stable Go releases; the catalog also carries each archive's SHA-256.
pub struct GoProvider<'a> {
    transport: &'a dyn Transport,
    platform: HostPlatform,
    releases: OnceCell<Vec<GoRelease>>,
}

impl<'a> GoProvider<'a> {
    pub fn new(transport: &'a dyn Transport, platform: HostPlatform) -> Self {
        Self {
            transport,
            platform,
            releases: OnceCell::new(),
        }
    }

    fn stable_releases(&self) -> Result<&[GoRelease]> {
        if let Some(releases) = self.releases.get() {
            return Ok(releases);
        }
        let catalog: Vec<GoRelease> = fetch_json(self.transport, self.name(), CATALOG_URL)?;
        let stable = catalog.into_iter().filter(|release| release.stable).collect();
        Ok(self.releases.get_or_init(|| stable))
    }

    fn stable_versions(&self) -> Result<Vec<String>> {
        Ok(self
            .stable_releases()?
            .iter()
            .map(|release| release.bare_version().to_string())
            .collect())
    }

    fn file_name(&self, version: &str, platform: &HostPlatform) -> String {
        let ext = if platform.is_windows() { "zip" } else { "tar.gz" };
        format!(
            "go{version}.{}-{}.{ext}",
            os_token(platform.os),
            arch_token(platform.arch)
        )
    }
}

fn os_token(os: HostOs) -> &'static str {
    match os {
        HostOs::Windows => "windows",
        HostOs::Darwin => "darwin",
        HostOs::Linux => "linux",
    }
}

fn arch_token(arch: HostArch) -> &'static str {
    match arch {
        HostArch::X64 => "amd64",
        HostArch::X86 => "386",
        HostArch::Arm64 => "arm64",
        HostArch::Arm => "armv6l",
    }
}

impl ProviderAdapter for GoProvider<'_> {
    fn name(&self) -> &str {
        "go"
    }

    fn list_filtered(&self) -> Result<Vec<String>> {
        Ok(newest_per_line(self.stable_versions()?, 2))
    }

    fn list_all(&self) -> Result<Vec<String>> {
        Ok(sorted_desc(self.stable_versions()?))
    }

    fn download_url(&self, version: &str, platform: &HostPlatform) -> Result<Option<String>> {
        Ok(Some(format!(
            "{DOWNLOAD_URL}/{}",
            self.file_name(version, platform)
        )))
    }

    fn expected_sha256(&self, version: &str, platform: &HostPlatform) -> Result<Option<String>> {
        let file_name = self.file_name(version, platform);
        let checksum = self
            .stable_releases()?
            .iter()
            .filter(|release| release.bare_version() == version)
            .flat_map(|release| release.files.iter())
            .find(|file| file.filename == file_name)
            .map(|file| file.sha256.trim().to_string())
            .filter(|sha256| !sha256.is_empty());
        Ok(checksum)
    }

    fn archive_kind(&self) -> ArchiveKind {
        if self.platform.is_windows() {
            ArchiveKind::Zip
        } else {
            ArchiveKind::TarGz
        }
    }

    fn extract_subdir(&self, _version: &str, _archive: &Path) -> Option<String> {
        Some("go".to_string())
    }

    fn bin_dir(&self, install_root: &Path) -> PathBuf {
        install_root.join("bin")
    }

    fn configure_env(&self, _version: &str, install_root: &Path) -> Result<Vec<EnvVar>> {
        let bin_dir = self.bin_dir(install_root);
        if !bin_dir.is_dir() {
            bail!("Go bin directory is missing: {}", bin_dir.display());
        }
        Ok(vec![
            EnvVar::new("GOROOT", install_root.display().to_string()),
            EnvVar::path(&[bin_dir]),
            EnvVar::exclude_keywords(&["golang", "go"]),
        ])
    }
}
