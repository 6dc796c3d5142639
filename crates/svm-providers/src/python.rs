use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use regex::Regex;
use svm_core::{ArchiveKind, EnvVar, HostArch, HostOs, HostPlatform, ProviderAdapter, Transport};
use svm_installer::{remove_path, run_command};
use tracing::{debug, info, warn};

use crate::catalog::{catalog_error, fetch_text, newest_per_line, sorted_desc};

const FTP_URL: &str = "https://www.python.org/ftp/python";
const GET_PIP_URL: &str = "https://bootstrap.pypa.io/get-pip.py";

/// CPython from python.org: Windows zip distributions, macOS installer
/// packages and Linux source builds.
pub struct PythonProvider<'a> {
    transport: &'a dyn Transport,
    platform: HostPlatform,
    versions: OnceCell<Vec<String>>,
}

impl<'a> PythonProvider<'a> {
    pub fn new(transport: &'a dyn Transport, platform: HostPlatform) -> Self {
        Self {
            transport,
            platform,
            versions: OnceCell::new(),
        }
    }

    fn versions(&self) -> Result<&[String]> {
        if let Some(versions) = self.versions.get() {
            return Ok(versions);
        }
        let listing = fetch_text(self.transport, self.name(), &format!("{FTP_URL}/"))?;
        let versions = scrape_versions(&listing).map_err(|err| catalog_error(self.name(), err))?;
        Ok(self.versions.get_or_init(|| versions))
    }

    /// Picks a zip from the release directory listing: the full
    /// distribution for the arch first, the embeddable one second, then
    /// probes the conventional file names.
    fn windows_zip_url(&self, version: &str, arch: HostArch) -> Result<String> {
        let suffix = windows_arch_suffix(arch);
        let base = format!("{FTP_URL}/{version}");

        match self.transport.fetch_text(&format!("{base}/")) {
            Ok(listing) => {
                if let Some(name) = pick_windows_zip(&listing, suffix)? {
                    return Ok(format!("{base}/{name}"));
                }
            }
            Err(err) => debug!(error = %format!("{err:#}"), "release listing unavailable"),
        }

        let regular = format!("{base}/python-{version}{suffix}.zip");
        if self.transport.exists(&regular).unwrap_or(false) {
            return Ok(regular);
        }
        let embed = format!("{base}/python-{version}-embed{suffix}.zip");
        if self.transport.exists(&embed).unwrap_or(false) {
            return Ok(embed);
        }
        Ok(regular)
    }

    fn enable_embedded_pip(&self, install_root: &Path, pth_file: &Path) -> Result<()> {
        let content = fs::read_to_string(pth_file)
            .with_context(|| format!("failed to read {}", pth_file.display()))?;
        fs::write(pth_file, content.replacen("#import site", "import site", 1))
            .with_context(|| format!("failed to write {}", pth_file.display()))?;

        let get_pip = install_root.join("get-pip.py");
        let script = self.transport.fetch_bytes(GET_PIP_URL)?;
        fs::write(&get_pip, script)
            .with_context(|| format!("failed to write {}", get_pip.display()))?;

        run_command(
            Command::new(install_root.join("python.exe"))
                .arg(&get_pip)
                .arg("--no-warn-script-location"),
            "failed to bootstrap pip",
        )?;
        let scripts = install_root.join("Scripts");
        fs::create_dir_all(&scripts)
            .with_context(|| format!("failed to create {}", scripts.display()))
    }
}

fn scrape_versions(listing: &str) -> Result<Vec<String>> {
    let primary = Regex::new(r#"href="(\d+\.\d+\.\d+)/""#)?;
    let fallback = Regex::new(r">(\d+\.\d+\.\d+)/<")?;

    let mut versions: Vec<String> = primary
        .captures_iter(listing)
        .map(|captures| captures[1].to_string())
        .collect();
    if versions.is_empty() {
        versions = fallback
            .captures_iter(listing)
            .map(|captures| captures[1].to_string())
            .collect();
    }
    Ok(sorted_desc(versions))
}

fn windows_arch_suffix(arch: HostArch) -> &'static str {
    match arch {
        HostArch::X64 => "-amd64",
        HostArch::Arm64 | HostArch::Arm => "-arm64",
        HostArch::X86 => "-win32",
    }
}

fn pick_windows_zip(listing: &str, suffix: &str) -> Result<Option<String>> {
    let zip = Regex::new(r#"href="([^"]+\.zip)""#)?;
    let mut embed = None;
    for captures in zip.captures_iter(listing) {
        let name = &captures[1];
        if !name.contains(suffix) {
            continue;
        }
        if name.contains("embed") {
            embed.get_or_insert_with(|| name.to_string());
        } else {
            return Ok(Some(name.to_string()));
        }
    }
    Ok(embed)
}

fn find_entry(dir: &Path, matches: impl Fn(&str) -> bool) -> Result<Option<PathBuf>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            if matches(name) {
                names.push(entry.path());
            }
        }
    }
    names.sort();
    Ok(names.into_iter().next())
}

impl ProviderAdapter for PythonProvider<'_> {
    fn name(&self) -> &str {
        "python"
    }

    fn list_filtered(&self) -> Result<Vec<String>> {
        Ok(newest_per_line(self.versions()?.iter().cloned(), 2))
    }

    fn list_all(&self) -> Result<Vec<String>> {
        Ok(self.versions()?.to_vec())
    }

    fn download_url(&self, version: &str, platform: &HostPlatform) -> Result<Option<String>> {
        let url = match platform.os {
            HostOs::Windows => self.windows_zip_url(version, platform.arch)?,
            HostOs::Darwin if platform.arch == HostArch::Arm64 => {
                format!("{FTP_URL}/{version}/python-{version}-macos11.pkg")
            }
            HostOs::Darwin => format!("{FTP_URL}/{version}/python-{version}-macosx10.9.pkg"),
            HostOs::Linux => format!("{FTP_URL}/{version}/Python-{version}.tgz"),
        };
        Ok(Some(url))
    }

    fn archive_kind(&self) -> ArchiveKind {
        ArchiveKind::Auto
    }

    fn bin_dir(&self, install_root: &Path) -> PathBuf {
        if self.platform.is_windows() {
            install_root.to_path_buf()
        } else {
            install_root.join("bin")
        }
    }

    fn configure_env(&self, _version: &str, install_root: &Path) -> Result<Vec<EnvVar>> {
        let mut path = vec![install_root.to_path_buf()];
        path.extend(
            ["Scripts", "bin"]
                .into_iter()
                .map(|dir| install_root.join(dir))
                .filter(|dir| dir.is_dir()),
        );
        Ok(vec![
            EnvVar::new("PYTHONHOME", install_root.display().to_string()),
            EnvVar::path(&path),
            EnvVar::exclude_keywords(&["python"]),
        ])
    }

    fn post_install(&self, version: &str, install_root: &Path) -> Result<()> {
        match self.platform.os {
            HostOs::Windows => {
                let pth = find_entry(install_root, |name| {
                    name.ends_with("._pth") && name.contains("python")
                })?;
                if let Some(pth) = pth {
                    info!("embedded distribution detected, bootstrapping pip");
                    if let Err(err) = self.enable_embedded_pip(install_root, &pth) {
                        warn!(error = %format!("{err:#}"), "pip bootstrap failed");
                    }
                    return Ok(());
                }

                let scripts = install_root.join("Scripts");
                let full = install_root.join("Lib").is_dir() && scripts.is_dir();
                if full && !scripts.join("pip.exe").exists() {
                    let ensured = run_command(
                        Command::new(install_root.join("python.exe"))
                            .args(["-m", "ensurepip", "--upgrade"]),
                        "failed to install pip",
                    );
                    if let Err(err) = ensured {
                        warn!(error = %format!("{err:#}"), "ensurepip failed");
                    }
                }
                Ok(())
            }
            HostOs::Darwin => {
                let Some(pkg) = find_entry(install_root, |name| {
                    name.ends_with(".pkg") && name.contains("python")
                })?
                else {
                    return Ok(());
                };
                info!(pkg = %pkg.display(), "running the Python installer package");
                run_command(
                    Command::new("installer")
                        .arg("-pkg")
                        .arg(&pkg)
                        .args(["-target", "CurrentUserHomeDirectory"]),
                    "failed to install Python package",
                )
            }
            HostOs::Linux => {
                let source = install_root.join(format!("Python-{version}"));
                if !source.join("configure").is_file() {
                    return Ok(());
                }
                info!(source = %source.display(), "building Python from source");
                let mut prefix = std::ffi::OsString::from("--prefix=");
                prefix.push(install_root);
                run_command(
                    Command::new("./configure").arg(prefix).current_dir(&source),
                    "failed to configure Python",
                )?;
                run_command(
                    Command::new("make").current_dir(&source),
                    "failed to build Python",
                )?;
                run_command(
                    Command::new("make").arg("install").current_dir(&source),
                    "failed to install Python",
                )?;
                if let Err(err) = remove_path(&source) {
                    warn!(error = %format!("{err:#}"), "failed to remove Python sources");
                }
                Ok(())
            }
        }
    }
}
