use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use svm_config::ConfigStore;
use svm_core::{EnvVar, SvmError};
use svm_resolver::resolve_latest_matching;
use tracing::{debug, info, warn};

use crate::command::run_command;
use crate::env::{EnvTarget, EnvironmentApplier};
use crate::fs_utils::{copy_dir_recursive, remove_path};
use crate::layout::{ToolchainLayout, CURRENT_LINK_NAME};
use crate::orchestrator::{InstallOutcome, Installer};

/// How the `current` entry refers to the active version directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStrategy {
    Symlink,
    /// Directory junction; needs no elevation on Windows.
    Junction,
    /// Full copy of the version directory.
    Copy,
}

impl LinkStrategy {
    pub fn for_host() -> Self {
        if cfg!(windows) {
            Self::Junction
        } else {
            Self::Symlink
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Symlink => "symlink",
            Self::Junction => "junction",
            Self::Copy => "copy",
        }
    }

    /// Creates `link` for `target`, degrading to a copy when the preferred
    /// kind of link cannot be made. Returns the strategy that succeeded.
    pub fn create(self, target: &Path, link: &Path) -> Result<Self> {
        let attempt = match self {
            Self::Symlink => create_symlink(target, link),
            Self::Junction => create_junction(target, link),
            Self::Copy => return copy_dir_recursive(target, link).map(|_| Self::Copy),
        };

        match attempt {
            Ok(()) => Ok(self),
            Err(err) => {
                warn!(
                    strategy = self.as_str(),
                    error = %format!("{err:#}"),
                    "link creation failed, copying instead"
                );
                remove_path(link)?;
                copy_dir_recursive(target, link)?;
                Ok(Self::Copy)
            }
        }
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link).with_context(|| {
        format!(
            "failed to create symlink {} -> {}",
            link.display(),
            target.display()
        )
    })
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::windows::fs::symlink_dir(target, link).with_context(|| {
        format!(
            "failed to create symlink {} -> {}",
            link.display(),
            target.display()
        )
    })
}

fn create_junction(target: &Path, link: &Path) -> Result<()> {
    run_command(
        Command::new("cmd")
            .args(["/c", "mklink", "/J"])
            .arg(link)
            .arg(target),
        "failed to create directory junction",
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub version: String,
    pub version_dir: PathBuf,
    pub link: PathBuf,
    pub strategy: LinkStrategy,
    pub env_vars: Vec<EnvVar>,
    /// Present when the version had to be installed first.
    pub installed: Option<InstallOutcome>,
}

/// Binds a toolchain slot's `current` entry to one installed version.
pub struct ActivationManager<'a> {
    installer: Installer<'a>,
    strategy: LinkStrategy,
}

impl<'a> ActivationManager<'a> {
    pub fn new(installer: Installer<'a>) -> Self {
        Self {
            installer,
            strategy: LinkStrategy::for_host(),
        }
    }

    pub fn with_strategy(mut self, strategy: LinkStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Activates `requested`, installing it first when no matching version
    /// directory exists. Re-activating the current version repeats every
    /// step, which repairs a broken link or stale environment.
    pub fn activate<T: EnvTarget>(
        &self,
        config: &mut ConfigStore,
        env: &mut EnvironmentApplier<T>,
        requested: &str,
    ) -> Result<Activation> {
        let provider = self.installer.provider();
        let key = self.installer.key();
        let layout = self.installer.layout(config);

        let (version, version_dir, installed) = match self.locate(config, &layout, requested) {
            Some((version, dir)) => (version, dir, None),
            None => {
                let outcome = self.install_for_use(config, &layout, requested)?;
                (
                    outcome.version.clone(),
                    outcome.install_dir.clone(),
                    Some(outcome),
                )
            }
        };
        if !version_dir.is_dir() {
            return Err(self.activation_error(&version, "install directory is missing"));
        }

        let link = layout.current_link();
        remove_path(&link)?;
        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let strategy = self
            .strategy
            .create(&version_dir, &link)
            .map_err(|err| self.activation_error(&version, format!("{err:#}")))?;
        debug!(link = %link.display(), strategy = strategy.as_str(), "current link created");

        let marker = layout.marker_path();
        fs::write(&marker, &version)
            .with_context(|| format!("failed to write {}", marker.display()))?;

        let env_vars = provider.configure_env(&version, &link)?;
        env.apply(&env_vars, &provider.bin_dir(&link))?;
        config.set_active(&key, &version, env_vars.clone())?;
        info!(toolchain = %key, version = %version, "activated");

        Ok(Activation {
            version,
            version_dir,
            link,
            strategy,
            env_vars,
            installed,
        })
    }

    /// An installed directory for `requested` as typed or with the
    /// toolchain's prefix applied or removed.
    fn locate(
        &self,
        config: &ConfigStore,
        layout: &ToolchainLayout,
        requested: &str,
    ) -> Option<(String, PathBuf)> {
        let key = self.installer.key();
        let prefix = self.installer.provider().version_prefix();
        let requested = requested.trim();
        let spellings = [
            requested.to_string(),
            prefix.add(requested),
            prefix.remove(requested).to_string(),
        ];

        spellings
            .into_iter()
            .filter(|version| !version.is_empty() && version != CURRENT_LINK_NAME)
            .find_map(|version| {
                let recorded = config
                    .version_info(&key, &version)
                    .filter(|record| record.is_installed() && record.install_dir.is_dir())
                    .map(|record| record.install_dir.clone());
                let dir = recorded.or_else(|| {
                    let dir = layout.version_dir(&version);
                    dir.is_dir().then_some(dir)
                })?;
                Some((version, dir))
            })
    }

    fn install_for_use(
        &self,
        config: &mut ConfigStore,
        layout: &ToolchainLayout,
        requested: &str,
    ) -> Result<InstallOutcome> {
        let candidates = self.installer.candidates()?;
        let prefix = self.installer.provider().version_prefix();
        let normalized = prefix.add(requested.trim());
        let strip = prefix.strip_token(&normalized);
        let resolution =
            resolve_latest_matching(&normalized, &candidates, &strip).ok_or_else(|| {
                SvmError::Resolution {
                    toolchain: self.installer.key().to_string(),
                    requested: requested.to_string(),
                }
            })?;

        let existing = layout.version_dir(&resolution.version);
        if existing.is_dir() {
            return Ok(InstallOutcome {
                version: resolution.version,
                install_dir: existing,
                skipped: Vec::new(),
            });
        }

        info!(requested, resolved = %resolution.version, "installing before activation");
        self.installer
            .install_resolved(config, requested, &candidates, &resolution.version)
    }

    fn activation_error(&self, version: &str, message: impl Into<String>) -> anyhow::Error {
        SvmError::Activation {
            toolchain: self.installer.key().to_string(),
            version: version.to_string(),
            message: message.into(),
        }
        .into()
    }
}
