use std::path::PathBuf;

use thiserror::Error;

/// Terminal and recoverable failure classes of install, activation and removal.
///
/// Raised wrapped in `anyhow::Error`; callers that need to branch (the
/// install fallback loop, the CLI's privilege hint) use `downcast_ref`.
#[derive(Debug, Error)]
pub enum SvmError {
    #[error("failed to fetch the {toolchain} version catalog: {message}")]
    CatalogFetch { toolchain: String, message: String },

    #[error("no {toolchain} version matches '{requested}'")]
    Resolution {
        toolchain: String,
        requested: String,
    },

    #[error("failed to download {toolchain} {version}: {message}")]
    Download {
        toolchain: String,
        version: String,
        message: String,
    },

    #[error("no installable {toolchain} version found for '{requested}'")]
    NoInstallableVersion {
        toolchain: String,
        requested: String,
    },

    #[error("failed to extract {}: {message}", path.display())]
    Extraction { path: PathBuf, message: String },

    #[error("filesystem operation failed on {}: {message}", path.display())]
    Filesystem { path: PathBuf, message: String },

    #[error("failed to activate {toolchain} {version}: {message}")]
    Activation {
        toolchain: String,
        version: String,
        message: String,
    },

    #[error(
        "administrator privileges are required to update machine environment variables \
         (re-run from an elevated shell or accept the UAC prompt): {message}"
    )]
    Privilege { message: String },

    #[error("{toolchain} {version} is not installed")]
    NotInstalled { toolchain: String, version: String },
}

impl SvmError {
    pub fn is_download(&self) -> bool {
        matches!(self, Self::Download { .. })
    }
}

/// `true` when any error in the chain is a download failure.
pub fn is_download_failure(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<SvmError>()
            .is_some_and(SvmError::is_download)
    })
}
