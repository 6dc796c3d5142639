use std::fs::{self, File};
use std::io;
use std::path::{Component, Path};

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use svm_core::{ArchiveKind, SvmError};
use tar::Archive;
use tracing::debug;

/// Unpacks `archive` under `dest`, keeping the archive's own directory
/// structure and unix permissions.
pub fn extract_archive(archive: &Path, dest: &Path, kind: ArchiveKind) -> Result<()> {
    debug!(
        archive = %archive.display(),
        dest = %dest.display(),
        kind = kind.as_str(),
        "extracting"
    );
    fs::create_dir_all(dest).with_context(|| format!("failed to create {}", dest.display()))?;

    let result = match kind {
        ArchiveKind::Zip => extract_zip(archive, dest),
        ArchiveKind::TarGz => extract_tar_gz(archive, dest),
        ArchiveKind::PlatformInstaller | ArchiveKind::Auto => Err(anyhow::anyhow!(
            "archive kind '{}' cannot be extracted",
            kind.as_str()
        )),
    };

    result.map_err(|err| {
        SvmError::Extraction {
            path: archive.to_path_buf(),
            message: format!("{err:#}"),
        }
        .into()
    })
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file).context("not a valid zip archive")?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .with_context(|| format!("failed to read zip entry {index}"))?;
        let relative = entry
            .enclosed_name()
            .with_context(|| format!("refusing unsafe zip entry path: {}", entry.name()))?;
        ensure_relative(&relative)?;

        let output = dest.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&output)
                .with_context(|| format!("failed to create {}", output.display()))?;
            continue;
        }

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut outfile = File::create(&output)
            .with_context(|| format!("failed to create {}", output.display()))?;
        io::copy(&mut entry, &mut outfile)
            .with_context(|| format!("failed to extract {}", output.display()))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&output, fs::Permissions::from_mode(mode & 0o7777))
                .with_context(|| format!("failed to chmod {}", output.display()))?;
        }
    }
    Ok(())
}

fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open {}", archive_path.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    for entry in archive.entries().context("not a valid tar.gz archive")? {
        let mut entry = entry.context("failed to read tar entry")?;
        let relative = entry.path().context("invalid tar entry path")?.into_owned();
        ensure_relative(&relative)?;
        let unpacked = entry
            .unpack_in(dest)
            .with_context(|| format!("failed to extract {}", relative.display()))?;
        if !unpacked {
            anyhow::bail!("refusing tar entry outside destination: {}", relative.display());
        }
    }
    Ok(())
}

fn ensure_relative(path: &Path) -> Result<()> {
    let escapes = path.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        anyhow::bail!(
            "refusing archive path with parent or absolute reference: {}",
            path.display()
        );
    }
    Ok(())
}
