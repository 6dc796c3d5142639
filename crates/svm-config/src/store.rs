use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use svm_core::EnvVar;
use tracing::debug;

use crate::{ConfigFile, SdkKey, VersionRecord};

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const HOME_ENV: &str = "SVM_HOME";
const CACHE_DIR_NAME: &str = "cache";

/// Persisted settings for one command invocation.
///
/// Opening takes an exclusive advisory lock on `config.json.lock`, released
/// when the store is dropped. Every setter writes the file before returning.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    state: ConfigFile,
    _lock: File,
}

impl ConfigStore {
    /// `$SVM_HOME/config.json`, else `~/.svm/config.json`.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
            return Ok(PathBuf::from(home).join(CONFIG_FILE_NAME));
        }
        let home = dirs::home_dir().context("could not determine the home directory")?;
        Ok(home.join(".svm").join(CONFIG_FILE_NAME))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let parent = config_parent(&path);
        fs::create_dir_all(&parent)
            .with_context(|| format!("failed to create config dir: {}", parent.display()))?;

        let lock_path = lock_path_for(&path);
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("failed to open config lock: {}", lock_path.display()))?;
        lock.lock_exclusive()
            .with_context(|| format!("failed to lock {}", lock_path.display()))?;
        debug!(path = %path.display(), "config locked");

        let state = load_state(&path)?;
        Ok(Self {
            path,
            state,
            _lock: lock,
        })
    }

    /// The configured install dir, or the config file's own directory.
    pub fn install_dir(&self) -> PathBuf {
        match &self.state.install_dir {
            Some(dir) if !dir.as_os_str().is_empty() => dir.clone(),
            _ => config_parent(&self.path),
        }
    }

    pub fn set_install_dir(&mut self, dir: impl Into<PathBuf>) -> Result<()> {
        self.state.install_dir = Some(dir.into());
        self.save()
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.install_dir().join(CACHE_DIR_NAME)
    }

    pub fn install_root(&self, toolchain: &str) -> PathBuf {
        self.install_dir().join(toolchain)
    }

    pub fn current_version(&self, key: &SdkKey) -> Option<&str> {
        self.state
            .sdk(key)
            .map(|sdk| sdk.current_version.as_str())
            .filter(|version| !version.is_empty())
    }

    pub fn set_current_version(&mut self, key: &SdkKey, version: &str) -> Result<()> {
        self.state.sdk_mut(key).current_version = version.to_string();
        self.save()
    }

    pub fn version_info(&self, key: &SdkKey, version: &str) -> Option<&VersionRecord> {
        self.state.sdk(key)?.version_cache.get(version)
    }

    pub fn set_version_info(
        &mut self,
        key: &SdkKey,
        version: &str,
        record: VersionRecord,
    ) -> Result<()> {
        self.state
            .sdk_mut(key)
            .version_cache
            .insert(version.to_string(), record);
        self.save()
    }

    /// Drops the record; an active binding naming `version` goes with it.
    pub fn remove_version_info(&mut self, key: &SdkKey, version: &str) -> Result<()> {
        let sdk = self.state.sdk_mut(key);
        sdk.version_cache.remove(version);
        if sdk.current_version == version {
            sdk.current_version.clear();
            sdk.env_vars.clear();
        }
        self.save()
    }

    pub fn env_vars(&self, key: &SdkKey) -> &[EnvVar] {
        self.state
            .sdk(key)
            .map(|sdk| sdk.env_vars.as_slice())
            .unwrap_or_default()
    }

    pub fn set_env_vars(&mut self, key: &SdkKey, vars: Vec<EnvVar>) -> Result<()> {
        self.state.sdk_mut(key).env_vars = vars;
        self.save()
    }

    /// Records the activation in one write: the binding and its env snapshot.
    pub fn set_active(&mut self, key: &SdkKey, version: &str, vars: Vec<EnvVar>) -> Result<()> {
        let sdk = self.state.sdk_mut(key);
        sdk.current_version = version.to_string();
        sdk.env_vars = vars;
        self.save()
    }

    pub fn clear_active(&mut self, key: &SdkKey) -> Result<()> {
        let sdk = self.state.sdk_mut(key);
        sdk.current_version.clear();
        sdk.env_vars.clear();
        self.save()
    }

    /// Versions whose record still names an install dir, in key order.
    pub fn installed_versions(&self, key: &SdkKey) -> Vec<String> {
        self.state
            .sdk(key)
            .map(|sdk| {
                sdk.version_cache
                    .iter()
                    .filter(|(_, record)| record.is_installed())
                    .map(|(version, _)| version.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn save(&self) -> Result<()> {
        save_state(&self.path, &self.state)
    }
}

fn config_parent(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| CONFIG_FILE_NAME.into());
    name.push(".lock");
    path.with_file_name(name)
}

fn load_state(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed reading config: {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_json::from_str(&content)
        .with_context(|| format!("failed parsing config: {}", path.display()))
}

fn save_state(path: &Path, state: &ConfigFile) -> Result<()> {
    let content = serde_json::to_vec_pretty(state)
        .with_context(|| format!("failed serializing config: {}", path.display()))?;

    let mut tmp_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| CONFIG_FILE_NAME.into());
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, content)
        .with_context(|| format!("failed writing config: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("failed replacing config: {}", path.display()))
}
