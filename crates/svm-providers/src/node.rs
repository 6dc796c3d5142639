use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use svm_core::{
    ArchiveKind, EnvVar, HostArch, HostOs, HostPlatform, ProviderAdapter, Transport,
    VersionPrefix,
};

use crate::catalog::{fetch_json, newest_per_line, sorted_desc};

const INDEX_URL: &str = "https://nodejs.org/dist/index.json";
const DIST_URL: &str = "https://nodejs.org/dist";

#[derive(Debug, Deserialize)]
struct NodeRelease {
    version: String,
}

/// Node.js releases from the official distribution index.
pub struct NodeProvider<'a> {
    transport: &'a dyn Transport,
    platform: HostPlatform,
    releases: OnceCell<Vec<String>>,
}

impl<'a> NodeProvider<'a> {
    pub fn new(transport: &'a dyn Transport, platform: HostPlatform) -> Self {
        Self {
            transport,
            platform,
            releases: OnceCell::new(),
        }
    }

    fn releases(&self) -> Result<&[String]> {
        if let Some(releases) = self.releases.get() {
            return Ok(releases);
        }
        let index: Vec<NodeRelease> = fetch_json(self.transport, self.name(), INDEX_URL)?;
        let versions = index.into_iter().map(|release| release.version).collect();
        Ok(self.releases.get_or_init(|| versions))
    }

    /// `node-v20.11.1-linux-x64`, the top directory of every archive.
    fn dist_name(&self, version: &str, platform: &HostPlatform) -> String {
        format!(
            "node-{}-{}-{}",
            self.version_prefix().add(version),
            os_token(platform.os),
            arch_token(platform.arch)
        )
    }
}

fn os_token(os: HostOs) -> &'static str {
    match os {
        HostOs::Windows => "win",
        HostOs::Darwin => "darwin",
        HostOs::Linux => "linux",
    }
}

fn arch_token(arch: HostArch) -> &'static str {
    match arch {
        HostArch::X64 => "x64",
        HostArch::X86 => "x86",
        HostArch::Arm64 => "arm64",
        HostArch::Arm => "armv7l",
    }
}

impl ProviderAdapter for NodeProvider<'_> {
    fn name(&self) -> &str {
        "node"
    }

    fn version_prefix(&self) -> VersionPrefix {
        VersionPrefix::Letter('v')
    }

    fn list_filtered(&self) -> Result<Vec<String>> {
        Ok(newest_per_line(self.releases()?.iter().cloned(), 1))
    }

    fn list_all(&self) -> Result<Vec<String>> {
        Ok(sorted_desc(self.releases()?.iter().cloned()))
    }

    fn download_url(&self, version: &str, platform: &HostPlatform) -> Result<Option<String>> {
        let ext = if platform.is_windows() { "zip" } else { "tar.gz" };
        Ok(Some(format!(
            "{DIST_URL}/{}/{}.{ext}",
            self.version_prefix().add(version),
            self.dist_name(version, platform)
        )))
    }

    fn archive_kind(&self) -> ArchiveKind {
        if self.platform.is_windows() {
            ArchiveKind::Zip
        } else {
            ArchiveKind::TarGz
        }
    }

    fn extract_subdir(&self, version: &str, _archive: &Path) -> Option<String> {
        Some(self.dist_name(version, &self.platform))
    }

    fn bin_dir(&self, install_root: &Path) -> PathBuf {
        if self.platform.is_windows() {
            install_root.to_path_buf()
        } else {
            install_root.join("bin")
        }
    }

    fn configure_env(&self, _version: &str, install_root: &Path) -> Result<Vec<EnvVar>> {
        Ok(vec![
            EnvVar::new("NODE_HOME", install_root.display().to_string()),
            EnvVar::path(&[self.bin_dir(install_root)]),
            EnvVar::exclude_keywords(&["node"]),
        ])
    }
}
