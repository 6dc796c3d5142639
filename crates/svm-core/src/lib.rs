mod archive;
mod env;
mod error;
mod platform;
mod provider;
mod transport;
mod version;

pub use archive::{has_installer_extension, ArchiveKind};
pub use env::{EnvVar, EXCLUDE_KEYWORDS_KEY, HOME_SUFFIX, PATH_KEY, PATH_LIST_SEPARATOR};
pub use error::{is_download_failure, SvmError};
pub use platform::{HostArch, HostOs, HostPlatform};
pub use provider::{HasComponents, ProviderAdapter};
pub use transport::Transport;
pub use version::{
    compare_versions, sort_versions_desc, ParsedVersion, VersionParseError, VersionPrefix,
};
