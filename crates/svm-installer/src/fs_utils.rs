use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use svm_core::SvmError;

pub fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Removes whatever sits at `path`: a link is unlinked without touching its
/// target, a real directory is deleted recursively. Missing paths are fine.
pub fn remove_path(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to stat {}", path.display()));
        }
    };

    let result = if metadata.file_type().is_symlink() {
        remove_link(path)
    } else if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|err| {
        SvmError::Filesystem {
            path: path.to_path_buf(),
            message: format!("failed to remove: {err}"),
        }
        .into()
    })
}

#[cfg(windows)]
fn remove_link(path: &Path) -> io::Result<()> {
    fs::remove_dir(path).or_else(|_| fs::remove_file(path))
}

#[cfg(not(windows))]
fn remove_link(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

/// Deletes every entry inside `dir`, creating it when missing.
pub fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?
        {
            remove_path(&entry?.path())?;
        }
    }
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))
}

pub fn dir_is_empty(dir: &Path) -> Result<bool> {
    if !dir.exists() {
        return Ok(true);
    }
    let mut entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    Ok(entries.next().is_none())
}

/// Moves `<root>/<subdir>/*` up into `root`, overwriting collisions, and
/// removes the emptied subdirectory.
pub fn flatten_subdir(root: &Path, subdir: &str) -> Result<()> {
    let nested = root.join(subdir);
    if !nested.is_dir() {
        return Err(SvmError::Filesystem {
            path: nested,
            message: "expected directory is missing after extraction".to_string(),
        }
        .into());
    }

    // The nested tree may itself contain an entry named like `subdir`.
    let staged = root.join(format!(".svm-flatten-{}", std::process::id()));
    remove_path(&staged)?;
    fs::rename(&nested, &staged).or_else(|_| -> Result<()> {
        copy_dir_recursive(&nested, &staged)?;
        fs::remove_dir_all(&nested)
            .with_context(|| format!("failed to cleanup {}", nested.display()))
    })?;
    merge_dir_into(&staged, root)
}

/// Merges `src` into `dst`, preferring entries from `src`. Each entry is
/// renamed when possible and copied then deleted otherwise, for example
/// across filesystems. `src` is gone afterwards.
pub fn merge_dir_into(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).with_context(|| format!("failed to create {}", dst.display()))?;

    for entry in fs::read_dir(src).with_context(|| format!("failed to read {}", src.display()))? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let src_is_dir = fs::symlink_metadata(&src_path)
            .with_context(|| format!("failed to stat {}", src_path.display()))?
            .is_dir();
        let dst_is_dir = fs::symlink_metadata(&dst_path)
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false);

        if src_is_dir && dst_is_dir {
            merge_dir_into(&src_path, &dst_path)?;
            continue;
        }

        remove_path(&dst_path)?;
        move_entry(&src_path, &dst_path, src_is_dir)?;
    }

    fs::remove_dir_all(src).with_context(|| format!("failed to cleanup {}", src.display()))
}

fn move_entry(src: &Path, dst: &Path, is_dir: bool) -> Result<()> {
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    if is_dir {
        copy_dir_recursive(src, dst)?;
        fs::remove_dir_all(src).with_context(|| format!("failed to cleanup {}", src.display()))
    } else {
        fs::copy(src, dst).with_context(|| {
            format!("failed to copy {} to {}", src.display(), dst.display())
        })?;
        fs::remove_file(src).with_context(|| format!("failed to cleanup {}", src.display()))
    }
}

pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).with_context(|| format!("failed to create {}", dst.display()))?;
    for entry in fs::read_dir(src).with_context(|| format!("failed to read {}", src.display()))? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let metadata = fs::symlink_metadata(&src_path)
            .with_context(|| format!("failed to stat {}", src_path.display()))?;
        if metadata.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
            continue;
        }

        #[cfg(unix)]
        if metadata.file_type().is_symlink() {
            let target = fs::read_link(&src_path)
                .with_context(|| format!("failed to read symlink {}", src_path.display()))?;
            std::os::unix::fs::symlink(&target, &dst_path).with_context(|| {
                format!(
                    "failed to create symlink {} -> {}",
                    dst_path.display(),
                    target.display()
                )
            })?;
            continue;
        }

        fs::copy(&src_path, &dst_path).with_context(|| {
            format!(
                "failed to copy {} to {}",
                src_path.display(),
                dst_path.display()
            )
        })?;
    }
    Ok(())
}

#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions)
        .with_context(|| format!("failed to chmod {}", path.display()))
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
