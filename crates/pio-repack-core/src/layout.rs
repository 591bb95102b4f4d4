//! Unpacked directory layout normalization.
//!
//! Many release archives wrap their payload in a single top-level folder
//! (`wchisp-linux-x64/wchisp`). `PlatformIO` expects the tool at the package
//! root, so when the unpacked directory holds exactly one subdirectory and
//! no files, that subdirectory's contents are moved up one level.
//!
//! This is a single pass. A wrapper nested inside the wrapper is left as is.

use std::fs;
use std::io;
use std::path::Path;

/// Hoist the contents of a lone wrapper directory into `root`.
///
/// Returns `true` if the layout was changed. Roots with several entries, a
/// top-level file or symlink, or no entries at all are left untouched.
///
/// # Errors
///
/// Returns an error if `root` cannot be read or an entry cannot be moved.
pub fn normalize_layout(root: &Path) -> io::Result<bool> {
    let mut dirs = Vec::new();
    let mut files = 0usize;

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        // file_type() does not follow symlinks, so a link to a directory
        // counts as a file here.
        if entry.file_type()?.is_dir() {
            dirs.push(entry.file_name());
        } else {
            files += 1;
        }
    }

    if dirs.len() != 1 || files != 0 {
        return Ok(false);
    }

    let wrapper_name = &dirs[0];

    // Move the wrapper aside first: it may contain an entry with its own
    // name (e.g. `wchisp/wchisp`), which would otherwise collide with it.
    let mut staging_name = std::ffi::OsString::from(".");
    staging_name.push(wrapper_name);
    staging_name.push(".hoist");
    let staging = root.join(&staging_name);
    fs::rename(root.join(wrapper_name), &staging)?;

    let mut moved = 0usize;
    for entry in fs::read_dir(&staging)? {
        let entry = entry?;
        fs::rename(entry.path(), root.join(entry.file_name()))?;
        moved += 1;
    }
    fs::remove_dir(&staging)?;

    tracing::debug!(
        root = %root.display(),
        wrapper = %wrapper_name.to_string_lossy(),
        moved,
        "hoisted wrapper directory"
    );

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn names(dir: &Path) -> Vec<String> {
        let mut v: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        v.sort();
        v
    }

    fn scratch() -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("tool.zip_unpacked");
        fs::create_dir(&root).unwrap();
        (tmp, root)
    }

    #[test]
    fn test_single_wrapper_is_hoisted() {
        let (_tmp, root) = scratch();
        fs::create_dir_all(root.join("wchisp-win-x64/docs")).unwrap();
        fs::write(root.join("wchisp-win-x64/wchisp.exe"), b"MZ").unwrap();
        fs::write(root.join("wchisp-win-x64/docs/README"), b"r").unwrap();

        assert!(normalize_layout(&root).unwrap());

        assert_eq!(names(&root), ["docs", "wchisp.exe"]);
        assert_eq!(fs::read(root.join("docs/README")).unwrap(), b"r");
    }

    #[test]
    fn test_child_named_like_wrapper() {
        let (_tmp, root) = scratch();
        fs::create_dir(root.join("wchisp")).unwrap();
        fs::write(root.join("wchisp/wchisp"), b"ELF").unwrap();
        fs::write(root.join("wchisp/LICENSE"), b"GPL").unwrap();

        assert!(normalize_layout(&root).unwrap());

        assert_eq!(names(&root), ["LICENSE", "wchisp"]);
        assert!(root.join("wchisp").is_file());
    }

    #[test]
    fn test_top_level_file_is_noop() {
        let (_tmp, root) = scratch();
        fs::create_dir(root.join("lib")).unwrap();
        fs::write(root.join("wchisp"), b"ELF").unwrap();

        assert!(!normalize_layout(&root).unwrap());
        assert_eq!(names(&root), ["lib", "wchisp"]);
    }

    #[test]
    fn test_multiple_dirs_is_noop() {
        let (_tmp, root) = scratch();
        fs::create_dir(root.join("bin")).unwrap();
        fs::create_dir(root.join("share")).unwrap();

        assert!(!normalize_layout(&root).unwrap());
        assert_eq!(names(&root), ["bin", "share"]);
    }

    #[test]
    fn test_empty_root_is_noop() {
        let (_tmp, root) = scratch();
        assert!(!normalize_layout(&root).unwrap());
    }

    #[test]
    fn test_only_one_level_is_collapsed() {
        let (_tmp, root) = scratch();
        fs::create_dir_all(root.join("outer/inner")).unwrap();
        fs::write(root.join("outer/inner/tool"), b"x").unwrap();

        assert!(normalize_layout(&root).unwrap());
        assert_eq!(names(&root), ["inner"]);
        assert!(root.join("inner/tool").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_dir_counts_as_file() {
        let (tmp, root) = scratch();
        let target = tmp.path().join("elsewhere");
        fs::create_dir(&target).unwrap();
        std::os::unix::fs::symlink(&target, root.join("link")).unwrap();

        assert!(!normalize_layout(&root).unwrap());
        assert_eq!(names(&root), ["link"]);
    }
}
