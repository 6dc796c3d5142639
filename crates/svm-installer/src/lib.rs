mod activation;
mod cache;
mod checksum;
mod command;
mod download;
mod env;
mod extract;
mod fs_utils;
mod layout;
mod orchestrator;
mod removal;

use svm_config::SdkKey;
use svm_core::ProviderAdapter;

pub use activation::{Activation, ActivationManager, LinkStrategy};
pub use cache::CacheStore;
pub use checksum::{sha256_file, verify_sha256};
pub use command::run_command;
pub use download::HttpTransport;
pub use env::{
    rewrite_path, EnvPlan, EnvTarget, EnvironmentApplier, MachineEnv, MemoryEnv, ProcessEnv,
};
pub use extract::extract_archive;
pub use fs_utils::{
    copy_dir_recursive, dir_is_empty, flatten_subdir, make_executable, merge_dir_into,
    remove_file_if_exists, remove_path, reset_dir,
};
pub use layout::{
    cache_file_path, file_name_from_url, ToolchainLayout, CURRENT_LINK_NAME, VERSION_MARKER_NAME,
};
pub use orchestrator::{InstallOutcome, Installer};
pub use removal::{remove_version, Removal};

/// Config key of the slot a provider installs into.
pub fn sdk_key(provider: &dyn ProviderAdapter) -> SdkKey {
    match provider.components() {
        Some(components) => SdkKey::with_component(provider.name(), components.component()),
        None => SdkKey::new(provider.name()),
    }
}
