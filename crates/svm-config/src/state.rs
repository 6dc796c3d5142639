use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use svm_core::EnvVar;

/// Where a downloaded version lives on disk.
///
/// An empty `install_dir` means "not installed" even when the cached archive
/// is still around; the two lifecycles are independent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    #[serde(default)]
    pub install_dir: PathBuf,
    #[serde(default)]
    pub cache_file_path: PathBuf,
}

impl VersionRecord {
    pub fn is_installed(&self) -> bool {
        !self.install_dir.as_os_str().is_empty()
    }

    pub fn has_cache_file(&self) -> bool {
        !self.cache_file_path.as_os_str().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkState {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_vars: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub version_cache: BTreeMap<String, VersionRecord>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, SdkState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_dir: Option<PathBuf>,
    #[serde(default)]
    pub sdks: BTreeMap<String, SdkState>,
}

/// Addresses one activation slot: a toolchain, or one component of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SdkKey {
    pub toolchain: String,
    pub component: Option<String>,
}

impl SdkKey {
    pub fn new(toolchain: impl Into<String>) -> Self {
        Self {
            toolchain: toolchain.into(),
            component: None,
        }
    }

    pub fn with_component(toolchain: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            toolchain: toolchain.into(),
            component: Some(component.into()),
        }
    }
}

impl fmt::Display for SdkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.component {
            Some(component) => write!(f, "{} {}", self.toolchain, component),
            None => f.write_str(&self.toolchain),
        }
    }
}

impl ConfigFile {
    pub(crate) fn sdk(&self, key: &SdkKey) -> Option<&SdkState> {
        let sdk = self.sdks.get(&key.toolchain)?;
        match &key.component {
            Some(component) => sdk.components.get(component),
            None => Some(sdk),
        }
    }

    pub(crate) fn sdk_mut(&mut self, key: &SdkKey) -> &mut SdkState {
        let sdk = self.sdks.entry(key.toolchain.clone()).or_default();
        match &key.component {
            Some(component) => sdk.components.entry(component.clone()).or_default(),
            None => sdk,
        }
    }
}
