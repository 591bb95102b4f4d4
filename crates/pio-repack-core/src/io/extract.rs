//! Archive extraction module
//!
//! Handles zip, tar.gz and plain tar archives. The format is chosen from the
//! file extension.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;

/// Errors raised while unpacking an archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Reading the archive or writing its contents failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The file extension is not a supported archive type.
    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    /// The archive is corrupt or contains an unsafe entry.
    #[error("Archive error: {0}")]
    Archive(String),
}

/// Archive formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.zip`
    Zip,
    /// `.tar.gz` or `.tgz`
    TarGz,
    /// `.tar`
    Tar,
}

/// Detect archive format from file extension
pub fn detect_format(path: &Path) -> Option<ArchiveFormat> {
    let path_str = path.to_string_lossy().to_lowercase();

    if path_str.ends_with(".tar.gz") || path_str.ends_with(".tgz") {
        Some(ArchiveFormat::TarGz)
    } else if path_str.ends_with(".tar") {
        Some(ArchiveFormat::Tar)
    } else if path_str.ends_with(".zip") {
        Some(ArchiveFormat::Zip)
    } else {
        None
    }
}

/// Extract an archive into `dest_dir`, auto-detecting its format.
///
/// Returns the number of entries (files, directories and links) written.
///
/// # Errors
///
/// Returns [`ExtractError::UnsupportedFormat`] for unknown extensions, and
/// [`ExtractError::Archive`] for corrupt archives or entries that would land
/// outside `dest_dir`.
pub fn extract_auto(archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractError> {
    let format = detect_format(archive_path)
        .ok_or_else(|| ExtractError::UnsupportedFormat(archive_path.display().to_string()))?;

    tracing::debug!(archive = %archive_path.display(), ?format, "extracting");

    match format {
        ArchiveFormat::Zip => extract_zip(archive_path, dest_dir),
        ArchiveFormat::TarGz => extract_tar_gz(archive_path, dest_dir),
        ArchiveFormat::Tar => {
            let file = File::open(archive_path)?;
            extract_tar(BufReader::new(file), dest_dir)
        }
    }
}

/// Extract a tar.gz archive to a destination directory
///
/// # Errors
///
/// Returns an error if the archive is unreadable or holds an unsafe path.
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractError> {
    let file = File::open(archive_path)?;
    let reader = BufReader::new(file);
    let gz_decoder = flate2::read::GzDecoder::new(reader);

    extract_tar(gz_decoder, dest_dir)
}

/// Extract a tar archive from a reader
fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<usize, ExtractError> {
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(reader);
    let mut count = 0;
    // Directory modes applied after all entries, so read-only directories
    // can still receive their children.
    let mut dir_modes: Vec<(PathBuf, u32)> = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let relative_path = sanitize(&entry.path()?)?;
        if relative_path.as_os_str().is_empty() {
            continue;
        }
        let dir_mode = if entry.header().entry_type().is_dir() {
            entry.header().mode().ok()
        } else {
            None
        };

        // unpack_in creates parent directories and refuses to write through
        // symlinks that point outside dest_dir.
        if !entry.unpack_in(dest_dir)? {
            return Err(ExtractError::Archive(format!(
                "Invalid path in archive: {}",
                relative_path.display()
            )));
        }
        if let Some(mode) = dir_mode {
            let path = dest_dir.join(&relative_path);
            make_writable(&path)?;
            dir_modes.push((path, mode));
        }
        count += 1;
    }

    // Deepest first, so a parent never turns read-only before its children.
    for (path, mode) in dir_modes.into_iter().rev() {
        set_mode(&path, mode)?;
    }

    Ok(count)
}

#[cfg(unix)]
fn make_writable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = fs::metadata(path)?.permissions().mode();
    fs::set_permissions(path, fs::Permissions::from_mode(mode | 0o700))
}

#[cfg(not(unix))]
fn make_writable(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// Extract a zip archive
///
/// # Errors
///
/// Returns an error if the archive is unreadable or holds an unsafe path.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| ExtractError::Archive(e.to_string()))?;

    fs::create_dir_all(dest_dir)?;
    let mut count = 0;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;
        let Some(relative_path) = file.enclosed_name() else {
            return Err(ExtractError::Archive(format!(
                "Invalid path in archive: {}",
                file.name()
            )));
        };

        let absolute_path = dest_dir.join(&relative_path);

        if file.is_dir() {
            fs::create_dir_all(&absolute_path)?;
            count += 1;
            continue;
        }

        if let Some(p) = absolute_path.parent() {
            fs::create_dir_all(p)?;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut file, &mut outfile)?;

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode & 0o7777))?;
        }

        count += 1;
    }

    Ok(count)
}

/// Normalise an entry path, rejecting anything that could escape the root.
fn sanitize(path: &Path) -> Result<PathBuf, ExtractError> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::Archive(format!(
                    "Invalid path in archive: {}",
                    path.display()
                )));
            }
        }
    }
    Ok(clean)
}
