use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
    /// Vendor installer (`.pkg`, `.exe`, `.msi`) copied into the version
    /// directory for the adapter's post-install hook to run.
    PlatformInstaller,
    /// Decided per downloaded file through the adapter.
    Auto,
}

impl ArchiveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
            Self::PlatformInstaller => "installer",
            Self::Auto => "auto",
        }
    }

    pub fn infer_from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        Self::infer_from_name(name)
    }

    pub fn infer_from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let without_query = lower.split(['?', '#']).next().unwrap_or(&lower);
        if without_query.ends_with(".zip") {
            return Some(Self::Zip);
        }
        if without_query.ends_with(".tar.gz") || without_query.ends_with(".tgz") {
            return Some(Self::TarGz);
        }
        if without_query.ends_with(".pkg")
            || without_query.ends_with(".exe")
            || without_query.ends_with(".msi")
        {
            return Some(Self::PlatformInstaller);
        }
        None
    }
}

/// `.exe`/`.msi` downloads are interactive installers and never reused from cache.
pub fn has_installer_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("exe") || ext.eq_ignore_ascii_case("msi"))
        .unwrap_or(false)
}
