use std::path::PathBuf;

use anyhow::Result;
use svm_config::{ConfigStore, VersionRecord};
use svm_core::{ProviderAdapter, SvmError};
use tracing::info;

use crate::fs_utils::remove_path;
use crate::layout::ToolchainLayout;
use crate::sdk_key;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub version: String,
    pub install_dir: PathBuf,
    pub was_active: bool,
}

/// Deletes an installed version. An active binding is cleared, together
/// with its `current` link, before the directory goes; the cached archive
/// path stays recorded for a later reinstall.
pub fn remove_version(
    config: &mut ConfigStore,
    provider: &dyn ProviderAdapter,
    requested: &str,
) -> Result<Removal> {
    let key = sdk_key(provider);
    let layout = ToolchainLayout::for_key(config, &key);
    let requested = requested.trim();
    let spellings = [
        requested.to_string(),
        provider.version_prefix().add(requested),
    ];

    let found = spellings.iter().find_map(|version| {
        let recorded = config
            .version_info(&key, version)
            .filter(|record| record.is_installed())
            .map(|record| record.install_dir.clone());
        let dir = recorded.or_else(|| {
            let dir = layout.version_dir(version);
            dir.is_dir().then_some(dir)
        })?;
        Some((version.clone(), dir))
    });
    let Some((version, install_dir)) = found else {
        return Err(SvmError::NotInstalled {
            toolchain: key.to_string(),
            version: requested.to_string(),
        }
        .into());
    };

    let was_active = config.current_version(&key) == Some(version.as_str());
    if was_active {
        remove_path(&layout.current_link())?;
        config.clear_active(&key)?;
    }

    remove_path(&install_dir)?;
    let cache_file_path = config
        .version_info(&key, &version)
        .map(|record| record.cache_file_path.clone())
        .unwrap_or_default();
    config.set_version_info(
        &key,
        &version,
        VersionRecord {
            install_dir: PathBuf::new(),
            cache_file_path,
        },
    )?;
    info!(toolchain = %key, version = %version, was_active, "removed");

    Ok(Removal {
        version,
        install_dir,
        was_active,
    })
}
