use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use svm_core::{
    ArchiveKind, EnvVar, HasComponents, HostArch, HostOs, HostPlatform, ProviderAdapter,
    Transport,
};
use svm_installer::{make_executable, merge_dir_into, remove_path, run_command};
use tracing::{debug, info, warn};

use crate::catalog::{fetch_json, sorted_desc};

const RELEASES_INDEX_URL: &str =
    "https://dotnetcli.blob.core.windows.net/dotnet/release-metadata/releases-index.json";
const SUPPORTED_PHASES: &[&str] = &["preview", "active"];

pub const DOTNET_COMPONENTS: &[&str] = &["sdk", "runtime", "asp-core", "desktop"];

/// Independently activated parts of a .NET release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DotnetComponent {
    Sdk,
    Runtime,
    AspCore,
    Desktop,
}

impl DotnetComponent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sdk => "sdk",
            Self::Runtime => "runtime",
            Self::AspCore => "asp-core",
            Self::Desktop => "desktop",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "sdk" => Some(Self::Sdk),
            "runtime" => Some(Self::Runtime),
            "asp-core" | "aspnetcore" => Some(Self::AspCore),
            "desktop" | "windowsdesktop" => Some(Self::Desktop),
            _ => None,
        }
    }

    /// Whether a release file name belongs to this component.
    fn matches_file(self, name: &str) -> bool {
        match self {
            Self::Sdk => name.contains("sdk"),
            Self::Runtime => {
                name.contains("runtime")
                    && !name.contains("aspnetcore")
                    && !name.contains("windowsdesktop")
            }
            Self::AspCore => name.contains("aspnetcore"),
            Self::Desktop => name.contains("windowsdesktop"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReleasesIndex {
    #[serde(rename = "releases-index", default)]
    channels: Vec<ChannelInfo>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChannelInfo {
    #[serde(rename = "channel-version", default)]
    channel_version: String,
    #[serde(rename = "latest-release", default)]
    latest_release: String,
    #[serde(rename = "support-phase", default)]
    support_phase: String,
    #[serde(rename = "releases.json", default)]
    releases_json: String,
}

#[derive(Debug, Deserialize)]
struct ChannelReleases {
    #[serde(default)]
    releases: Vec<ReleaseDetail>,
}

#[derive(Debug, Clone, Deserialize)]
struct ReleaseDetail {
    #[serde(rename = "release-version", default)]
    release_version: String,
    #[serde(default)]
    runtime: Option<ComponentInfo>,
    #[serde(default)]
    sdk: Option<ComponentInfo>,
    #[serde(rename = "aspnetcore-runtime", default)]
    aspnetcore_runtime: Option<ComponentInfo>,
    #[serde(default)]
    windowsdesktop: Option<ComponentInfo>,
    #[serde(default)]
    files: Vec<ReleaseFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ComponentInfo {
    #[serde(default)]
    files: Vec<ReleaseFile>,
}

#[derive(Debug, Clone, Deserialize)]
struct ReleaseFile {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
}

impl ReleaseDetail {
    /// The component's own files, or the release-wide list when it has none.
    fn files_for(&self, component: DotnetComponent) -> &[ReleaseFile] {
        let info = match component {
            DotnetComponent::Sdk => &self.sdk,
            DotnetComponent::Runtime => &self.runtime,
            DotnetComponent::AspCore => &self.aspnetcore_runtime,
            DotnetComponent::Desktop => &self.windowsdesktop,
        };
        match info {
            Some(info) if !info.files.is_empty() => &info.files,
            _ => &self.files,
        }
    }
}

/// .NET SDK and runtimes. Each component has its own slot under the
/// toolchain root, so an SDK and a runtime can be active side by side.
pub struct DotnetProvider<'a> {
    transport: &'a dyn Transport,
    platform: HostPlatform,
    component: DotnetComponent,
    channels: OnceCell<Vec<ChannelInfo>>,
}

impl<'a> DotnetProvider<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        platform: HostPlatform,
        component: DotnetComponent,
    ) -> Self {
        Self {
            transport,
            platform,
            component,
            channels: OnceCell::new(),
        }
    }

    fn supported_channels(&self) -> Result<&[ChannelInfo]> {
        if let Some(channels) = self.channels.get() {
            return Ok(channels);
        }
        let index: ReleasesIndex = fetch_json(self.transport, self.name(), RELEASES_INDEX_URL)?;
        let channels = index
            .channels
            .into_iter()
            .filter(|channel| SUPPORTED_PHASES.contains(&channel.support_phase.as_str()))
            .collect();
        Ok(self.channels.get_or_init(|| channels))
    }

    fn channel_releases(&self, channel: &ChannelInfo) -> Result<Vec<ReleaseDetail>> {
        let releases: ChannelReleases =
            fetch_json(self.transport, self.name(), &channel.releases_json)?;
        Ok(releases.releases)
    }

    /// Looks in the version's own channel first, then every other one.
    fn find_release(&self, version: &str) -> Result<Option<ReleaseDetail>> {
        let channel_key = channel_of(version);
        let is_own = |channel: &&ChannelInfo| {
            Some(channel.channel_version.as_str()) == channel_key.as_deref()
        };
        let channels = self.supported_channels()?;
        let (own, others): (Vec<_>, Vec<_>) = channels.iter().partition(is_own);

        for channel in own.into_iter().chain(others) {
            let releases = match self.channel_releases(channel) {
                Ok(releases) => releases,
                Err(err) => {
                    warn!(
                        channel = %channel.channel_version,
                        error = %format!("{err:#}"),
                        "skipping channel"
                    );
                    continue;
                }
            };
            if let Some(release) = releases
                .into_iter()
                .find(|release| release.release_version == version)
            {
                return Ok(Some(release));
            }
        }
        Ok(None)
    }

    fn executable_name(&self) -> &'static str {
        if self.platform.is_windows() {
            "dotnet.exe"
        } else {
            "dotnet"
        }
    }

    /// Unpacks a macOS installer package in place: every `Payload` it
    /// contains is merged into the install root.
    fn expand_pkg(&self, pkg: &Path, install_root: &Path) -> Result<()> {
        let staging = install_root.join(".svm-pkg");
        remove_path(&staging)?;
        info!(pkg = %pkg.display(), "expanding installer package");
        run_command(
            Command::new("pkgutil").arg("--expand-full").arg(pkg).arg(&staging),
            "failed to expand .NET installer package",
        )?;

        for entry in fs::read_dir(&staging)
            .with_context(|| format!("failed to read {}", staging.display()))?
        {
            let payload = entry?.path().join("Payload");
            if payload.is_dir() {
                debug!(payload = %payload.display(), "merging payload");
                merge_dir_into(&payload, install_root)?;
            }
        }
        remove_path(&staging)?;
        remove_path(pkg)
    }
}

/// `8.0` for `8.0.11` and `9.0.0-rc.1.24431.7`.
pub(crate) fn channel_of(version: &str) -> Option<String> {
    let mut parts = version.split(['.', '-']);
    let major = parts.next()?;
    let minor = parts.next()?;
    Some(format!("{major}.{minor}"))
}

pub(crate) fn runtime_identifier(platform: &HostPlatform) -> Option<&'static str> {
    let rid = match (platform.os, platform.arch) {
        (HostOs::Windows, HostArch::X64) => "win-x64",
        (HostOs::Windows, HostArch::X86) => "win-x86",
        (HostOs::Windows, HostArch::Arm64) => "win-arm64",
        (HostOs::Darwin, HostArch::X64) => "osx-x64",
        (HostOs::Darwin, HostArch::Arm64) => "osx-arm64",
        (HostOs::Linux, HostArch::X64) => "linux-x64",
        (HostOs::Linux, HostArch::X86) => "linux-x86",
        (HostOs::Linux, HostArch::Arm64) => "linux-arm64",
        (HostOs::Linux, HostArch::Arm) => "linux-arm",
        _ => return None,
    };
    Some(rid)
}

/// Ranks a release file for this host. Files for another platform and
/// formats the installer cannot unpack score `None`.
pub(crate) fn score_file(
    name: &str,
    rid: &str,
    component: DotnetComponent,
    version: &str,
    os: HostOs,
) -> Option<u32> {
    let is_zip = name.ends_with(".zip");
    let is_tar = name.ends_with(".tar.gz");
    let is_pkg = name.ends_with(".pkg");
    if !(is_zip || is_tar || is_pkg) || !name.contains(rid) {
        return None;
    }

    let mut score = 10;
    if component.matches_file(name) {
        score += 5;
    }
    if name.contains(version) {
        score += 3;
    }
    score += match os {
        HostOs::Windows if is_zip => 5,
        HostOs::Darwin if is_pkg => 5,
        HostOs::Darwin if is_tar => 3,
        HostOs::Linux if is_tar => 5,
        _ => 0,
    };
    Some(score)
}

/// Finds `name` anywhere under `dir`, shallowest first.
fn find_file(dir: &Path, name: &str) -> Result<Option<PathBuf>> {
    let mut pending = vec![dir.to_path_buf()];
    while !pending.is_empty() {
        let mut next = Vec::new();
        for current in pending {
            let mut entries = fs::read_dir(&current)
                .with_context(|| format!("failed to read {}", current.display()))?
                .collect::<std::io::Result<Vec<_>>>()?;
            entries.sort_by_key(|entry| entry.file_name());
            for entry in entries {
                let path = entry.path();
                let file_type = entry.file_type()?;
                if file_type.is_file() && entry.file_name() == name {
                    return Ok(Some(path));
                }
                if file_type.is_dir() {
                    next.push(path);
                }
            }
        }
        pending = next;
    }
    Ok(None)
}

impl ProviderAdapter for DotnetProvider<'_> {
    fn name(&self) -> &str {
        "dotnet"
    }

    fn list_filtered(&self) -> Result<Vec<String>> {
        Ok(sorted_desc(
            self.supported_channels()?
                .iter()
                .map(|channel| channel.latest_release.clone())
                .filter(|version| !version.is_empty()),
        ))
    }

    fn list_all(&self) -> Result<Vec<String>> {
        let mut versions = Vec::new();
        for channel in self.supported_channels()? {
            match self.channel_releases(channel) {
                Ok(releases) => versions.extend(
                    releases
                        .into_iter()
                        .map(|release| release.release_version)
                        .filter(|version| !version.is_empty()),
                ),
                Err(err) => warn!(
                    channel = %channel.channel_version,
                    error = %format!("{err:#}"),
                    "skipping channel"
                ),
            }
        }
        Ok(sorted_desc(versions))
    }

    fn download_url(&self, version: &str, platform: &HostPlatform) -> Result<Option<String>> {
        let Some(rid) = runtime_identifier(platform) else {
            return Ok(None);
        };
        let Some(release) = self.find_release(version)? else {
            return Ok(None);
        };

        let mut best: Option<(u32, &ReleaseFile)> = None;
        for file in release.files_for(self.component) {
            let Some(score) = score_file(&file.name, rid, self.component, version, platform.os)
            else {
                continue;
            };
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, file));
            }
        }
        Ok(best
            .map(|(_, file)| file.url.clone())
            .filter(|url| !url.is_empty()))
    }

    fn archive_kind(&self) -> ArchiveKind {
        ArchiveKind::Auto
    }

    fn bin_dir(&self, install_root: &Path) -> PathBuf {
        install_root.to_path_buf()
    }

    /// `install_root` is the component's `current` link.
    fn configure_env(&self, _version: &str, install_root: &Path) -> Result<Vec<EnvVar>> {
        let component_dir = install_root.parent().unwrap_or(install_root);
        let toolchain_root = component_dir.parent().unwrap_or(component_dir);

        let mut vars = Vec::new();
        if self.component == DotnetComponent::Sdk {
            vars.push(EnvVar::new(
                "DOTNET_ROOT",
                install_root.display().to_string(),
            ));
        }
        vars.push(EnvVar::path(&[install_root.to_path_buf()]));
        let toolchain_root = toolchain_root.display().to_string();
        let component_dir = component_dir.display().to_string();
        vars.push(EnvVar::exclude_keywords(&[&toolchain_root, &component_dir]));
        Ok(vars)
    }

    fn post_install(&self, _version: &str, install_root: &Path) -> Result<()> {
        let pkg = fs::read_dir(install_root)
            .with_context(|| format!("failed to read {}", install_root.display()))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .find(|path| path.extension().is_some_and(|ext| ext == "pkg"));
        if let Some(pkg) = pkg {
            self.expand_pkg(&pkg, install_root)?;
        }

        let executable = install_root.join(self.executable_name());
        if !executable.is_file() {
            let Some(found) = find_file(install_root, self.executable_name())? else {
                bail!(
                    "installation looks incomplete: {} not found under {}",
                    self.executable_name(),
                    install_root.display()
                );
            };
            if let Some(found_dir) = found.parent() {
                debug!(from = %found_dir.display(), "moving .NET files to the install root");
                merge_dir_into(found_dir, install_root)?;
            }
        }

        make_executable(&executable)
    }

    fn components(&self) -> Option<&dyn HasComponents> {
        Some(self)
    }
}

impl HasComponents for DotnetProvider<'_> {
    fn component(&self) -> &str {
        self.component.as_str()
    }

    fn supported_components(&self) -> &'static [&'static str] {
        DOTNET_COMPONENTS
    }
}
