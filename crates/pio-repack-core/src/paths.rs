//! Path conventions for downloads and working directories.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Extract the filename from a URL, ignoring any query string or fragment.
pub fn filename_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or("");
    path.split('/').next_back().unwrap_or("")
}

/// Working directory for a package: `<work_root>/<name>`
pub fn package_work_dir(work_root: &Path, name: &str) -> PathBuf {
    work_root.join(name)
}

/// Extraction directory for a downloaded archive: `<archive>_unpacked`
pub fn unpacked_dir(archive: &Path) -> PathBuf {
    let mut name = OsString::from(archive.as_os_str());
    name.push("_unpacked");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("https://github.com/ch32-rs/wchisp/releases/download/nightly/wchisp-win-x64.zip"),
            "wchisp-win-x64.zip"
        );
        assert_eq!(filename_from_url("https://example.com/a.tar.gz?raw=1"), "a.tar.gz");
        assert_eq!(filename_from_url("https://example.com/"), "");
    }

    #[test]
    fn test_unpacked_dir() {
        let dir = unpacked_dir(Path::new("/tmp/tool/wchisp-linux-x64.tar.gz"));
        assert_eq!(dir, PathBuf::from("/tmp/tool/wchisp-linux-x64.tar.gz_unpacked"));
    }
}
