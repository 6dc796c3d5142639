use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use svm_core::{ArchiveKind, EnvVar, HostArch, HostOs, HostPlatform, ProviderAdapter, Transport};
use svm_installer::merge_dir_into;
use tracing::debug;

use crate::catalog::{fetch_json, sorted_desc};

const RELEASES_URL: &str = "https://api.adoptium.net/v3/info/available_releases";
const ASSETS_URL: &str = "https://api.adoptium.net/v3/assets/latest";

#[derive(Debug, Deserialize)]
struct AvailableReleases {
    #[serde(default)]
    available_releases: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct AssetEntry {
    #[serde(default)]
    binary: Option<AssetBinary>,
    #[serde(default)]
    binary_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssetBinary {
    #[serde(default)]
    package: Option<AssetPackage>,
}

#[derive(Debug, Deserialize)]
struct AssetPackage {
    link: String,
    #[serde(default)]
    checksum: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct JdkPackage {
    link: String,
    checksum: Option<String>,
}

/// Eclipse Temurin JDKs, one version per feature release.
pub struct JavaProvider<'a> {
    transport: &'a dyn Transport,
    platform: HostPlatform,
    packages: RefCell<BTreeMap<String, Option<JdkPackage>>>,
}

impl<'a> JavaProvider<'a> {
    pub fn new(transport: &'a dyn Transport, platform: HostPlatform) -> Self {
        Self {
            transport,
            platform,
            packages: RefCell::new(BTreeMap::new()),
        }
    }

    fn package(&self, version: &str, platform: &HostPlatform) -> Result<Option<JdkPackage>> {
        let url = format!(
            "{ASSETS_URL}/{version}/hotspot?architecture={}&os={}&image_type=jdk&vendor=eclipse",
            arch_token(platform.arch),
            os_token(platform.os)
        );
        if let Some(package) = self.packages.borrow().get(&url) {
            return Ok(package.clone());
        }

        let entries: Vec<AssetEntry> = fetch_json(self.transport, self.name(), &url)?;
        let package = entries.into_iter().find_map(|entry| {
            match entry.binary.and_then(|binary| binary.package) {
                Some(package) => Some(JdkPackage {
                    link: package.link,
                    checksum: package.checksum,
                }),
                None => entry.binary_link.map(|link| JdkPackage {
                    link,
                    checksum: None,
                }),
            }
        });
        self.packages.borrow_mut().insert(url, package.clone());
        Ok(package)
    }
}

fn os_token(os: HostOs) -> &'static str {
    match os {
        HostOs::Windows => "windows",
        HostOs::Darwin => "mac",
        HostOs::Linux => "linux",
    }
}

fn arch_token(arch: HostArch) -> &'static str {
    match arch {
        HostArch::X64 => "x64",
        HostArch::X86 => "x86",
        HostArch::Arm64 => "aarch64",
        HostArch::Arm => "arm",
    }
}

/// The extracted JDK directory: the first one named like a JDK, else the
/// first directory at all.
fn find_jdk_dir(install_root: &Path) -> Result<Option<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(install_root)
        .with_context(|| format!("failed to read {}", install_root.display()))?
    {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();

    let named = dirs.iter().find(|dir| {
        dir.file_name()
            .and_then(|name| name.to_str())
            .map(str::to_lowercase)
            .is_some_and(|name| name.contains("jdk") || name.contains("java"))
    });
    Ok(named.or(dirs.first()).cloned())
}

impl ProviderAdapter for JavaProvider<'_> {
    fn name(&self) -> &str {
        "java"
    }

    fn list_filtered(&self) -> Result<Vec<String>> {
        let releases: AvailableReleases = fetch_json(self.transport, self.name(), RELEASES_URL)?;
        Ok(sorted_desc(
            releases
                .available_releases
                .into_iter()
                .map(|release| release.to_string()),
        ))
    }

    fn list_all(&self) -> Result<Vec<String>> {
        self.list_filtered()
    }

    fn download_url(&self, version: &str, platform: &HostPlatform) -> Result<Option<String>> {
        Ok(self
            .package(version, platform)?
            .map(|package| package.link))
    }

    fn expected_sha256(&self, version: &str, platform: &HostPlatform) -> Result<Option<String>> {
        Ok(self
            .package(version, platform)?
            .and_then(|package| package.checksum)
            .filter(|checksum| !checksum.trim().is_empty()))
    }

    fn archive_kind(&self) -> ArchiveKind {
        ArchiveKind::Auto
    }

    fn bin_dir(&self, install_root: &Path) -> PathBuf {
        install_root.join("bin")
    }

    fn configure_env(&self, _version: &str, install_root: &Path) -> Result<Vec<EnvVar>> {
        let bin_dir = self.bin_dir(install_root);
        if !bin_dir.is_dir() {
            bail!("Java bin directory is missing: {}", bin_dir.display());
        }
        Ok(vec![
            EnvVar::new("JAVA_HOME", install_root.display().to_string()),
            EnvVar::path(&[bin_dir]),
            EnvVar::exclude_keywords(&["java", "jdk", "openjdk"]),
        ])
    }

    /// Archives unpack to `jdk-21.0.2+13/`; macOS builds nest the home
    /// under `Contents/Home`.
    fn post_install(&self, _version: &str, install_root: &Path) -> Result<()> {
        if !install_root.join("bin").is_dir() {
            if let Some(jdk_dir) = find_jdk_dir(install_root)? {
                debug!(from = %jdk_dir.display(), "flattening JDK directory");
                merge_dir_into(&jdk_dir, install_root)?;
            }
        }

        let mac_home = install_root.join("Contents").join("Home");
        if mac_home.join("bin").is_dir() {
            merge_dir_into(&mac_home, install_root)?;
            let contents = install_root.join("Contents");
            fs::remove_dir_all(&contents)
                .with_context(|| format!("failed to remove {}", contents.display()))?;
        }

        if !install_root.join("bin").is_dir() {
            bail!(
                "JDK layout not recognized under {}",
                install_root.display()
            );
        }
        Ok(())
    }
}
