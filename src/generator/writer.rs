//! All-or-nothing writing of a generated server to disk

use std::fs;
use std::path::{Path, PathBuf};

use super::GeneratedServer;
use crate::error::{Error, Result};

/// Write every file into a sibling staging directory, then move it into place.
/// A failure leaves no staging directory and no partial target behind, and an
/// existing output is only removed once the new one is in place.
pub fn write_server(server: &GeneratedServer, dir: &Path, overwrite: bool) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    write_from(server, dir, overwrite, &cwd)
}

fn write_from(server: &GeneratedServer, dir: &Path, overwrite: bool, cwd: &Path) -> Result<PathBuf> {
    if dir.exists() && !dir.is_dir() {
        return Err(Error::Generation(format!(
            "output path {} exists and is not a directory",
            dir.display()
        )));
    }
    if is_non_empty_dir(dir) && !overwrite {
        return Err(Error::Generation(format!(
            "output directory {} is not empty (use --force to overwrite)",
            dir.display()
        )));
    }

    let target = resolve_target(dir, cwd)?;
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let dir_name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| server.package_name.clone());
    let staging = parent.join(format!(".{}.staging-{}", dir_name, std::process::id()));
    let backup = parent.join(format!(".{}.backup-{}", dir_name, std::process::id()));
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }

    if let Err(e) =
        stage_files(server, &staging).and_then(|_| swap_into_place(&staging, &target, &backup))
    {
        if staging.exists() {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                tracing::warn!(
                    path = %staging.display(),
                    error = %cleanup,
                    "failed to remove staging directory"
                );
            }
        }
        return Err(e);
    }

    tracing::info!(dir = %dir.display(), files = server.files.len(), "wrote server");
    Ok(dir.to_path_buf())
}

/// Canonical form of an existing output directory. The working directory and
/// its ancestors are refused since they cannot be swapped out from under us.
fn resolve_target(dir: &Path, cwd: &Path) -> Result<PathBuf> {
    if !dir.exists() {
        return Ok(dir.to_path_buf());
    }
    let target = dir.canonicalize()?;
    let cwd = cwd.canonicalize()?;
    if target.parent().is_none() || cwd.starts_with(&target) {
        return Err(Error::Generation(format!(
            "refusing to replace {}: it contains the working directory",
            dir.display()
        )));
    }
    Ok(target)
}

fn is_non_empty_dir(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn stage_files(server: &GeneratedServer, staging: &Path) -> Result<()> {
    fs::create_dir_all(staging)?;
    for file in &server.files {
        let relative = Path::new(&file.path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(Error::Generation(format!(
                "refusing to write outside the output directory: {}",
                file.path
            )));
        }
        let path = staging.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &file.content)?;
        if file.executable {
            set_executable(&path)?;
        }
    }
    Ok(())
}

/// Move the old output aside, put staging in its place, then drop the old
/// output. The old output is restored if the second rename fails.
fn swap_into_place(staging: &Path, dir: &Path, backup: &Path) -> Result<()> {
    if !dir.exists() {
        fs::rename(staging, dir)?;
        return Ok(());
    }

    if backup.exists() {
        fs::remove_dir_all(backup)?;
    }
    fs::rename(dir, backup)?;
    if let Err(e) = fs::rename(staging, dir) {
        if let Err(restore) = fs::rename(backup, dir) {
            tracing::error!(
                backup = %backup.display(),
                error = %restore,
                "failed to restore previous output"
            );
        }
        return Err(e.into());
    }
    if let Err(e) = fs::remove_dir_all(backup) {
        tracing::warn!(path = %backup.display(), error = %e, "failed to remove previous output");
    }
    Ok(())
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}
