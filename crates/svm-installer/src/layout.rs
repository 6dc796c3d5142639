use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use svm_config::{ConfigStore, SdkKey};
use svm_core::sort_versions_desc;

pub const CURRENT_LINK_NAME: &str = "current";
pub const VERSION_MARKER_NAME: &str = ".version";

/// On-disk shape of one activation slot:
/// `install_root[/component]/<version>` plus the `current` link next to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainLayout {
    install_root: PathBuf,
    component: Option<String>,
}

impl ToolchainLayout {
    pub fn new(install_root: impl Into<PathBuf>, component: Option<&str>) -> Self {
        Self {
            install_root: install_root.into(),
            component: component.map(str::to_string),
        }
    }

    pub fn for_key(config: &ConfigStore, key: &SdkKey) -> Self {
        Self::new(
            config.install_root(&key.toolchain),
            key.component.as_deref(),
        )
    }

    pub fn slot_dir(&self) -> PathBuf {
        match &self.component {
            Some(component) => self.install_root.join(component),
            None => self.install_root.clone(),
        }
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.slot_dir().join(version)
    }

    pub fn current_link(&self) -> PathBuf {
        self.slot_dir().join(CURRENT_LINK_NAME)
    }

    pub fn marker_path(&self) -> PathBuf {
        self.current_link().join(VERSION_MARKER_NAME)
    }

    /// Version directories present on disk, newest first.
    pub fn installed_versions(&self) -> Result<Vec<String>> {
        let slot = self.slot_dir();
        if !slot.exists() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in
            fs::read_dir(&slot).with_context(|| format!("failed to read {}", slot.display()))?
        {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == CURRENT_LINK_NAME || name.starts_with('.') {
                continue;
            }
            let file_type = entry
                .file_type()
                .with_context(|| format!("failed to stat {}", entry.path().display()))?;
            if file_type.is_dir() {
                versions.push(name);
            }
        }
        sort_versions_desc(&mut versions);
        Ok(versions)
    }
}

/// Cached archive location for a download URL: `cache_dir/<toolchain>/<file name>`.
pub fn cache_file_path(cache_dir: &Path, toolchain: &str, url: &str) -> PathBuf {
    cache_dir.join(toolchain).join(file_name_from_url(url))
}

pub fn file_name_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .filter(|segment| !segment.contains(':'))
        .unwrap_or("download")
        .to_string()
}
