//! Archive discovery and publish lines.
//!
//! Publishing is manual: the tool only prints the `pio pkg publish` lines
//! for the archives a run produced.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A `pio pkg publish` invocation for one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishCommand {
    /// Registry owner (organisation) to publish under.
    pub owner: String,
    /// Archive to upload.
    pub archive: PathBuf,
}

impl PublishCommand {
    /// Publish `archive` under `owner`.
    pub fn new(owner: impl Into<String>, archive: impl Into<PathBuf>) -> Self {
        Self {
            owner: owner.into(),
            archive: archive.into(),
        }
    }
}

impl std::fmt::Display for PublishCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pio pkg publish --type tool --owner \"{}\" --notify \"{}\"",
            self.owner,
            self.archive.display()
        )
    }
}

/// Identity of an archive on disk, used to tell fresh output from stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    modified: Option<SystemTime>,
    len: u64,
}

/// Snapshot of the archives matching a package's pattern in a directory.
#[derive(Debug, Clone, Default)]
pub struct ArchiveSnapshot {
    entries: BTreeMap<PathBuf, Stamp>,
}

impl ArchiveSnapshot {
    /// Record every file in `dir` matching `pattern` (e.g. `tool-x-*.tar.gz`).
    ///
    /// A missing or unreadable directory yields an empty snapshot.
    pub fn scan(dir: &Path, pattern: &str) -> Self {
        let full = Path::new(&glob::Pattern::escape(&dir.to_string_lossy())).join(pattern);
        let mut entries = BTreeMap::new();

        let Ok(paths) = glob::glob(&full.to_string_lossy()) else {
            return Self { entries };
        };

        for path in paths.filter_map(Result::ok) {
            let Ok(meta) = std::fs::metadata(&path) else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            entries.insert(
                path,
                Stamp {
                    modified: meta.modified().ok(),
                    len: meta.len(),
                },
            );
        }

        Self { entries }
    }

    /// Archives in `self` that are absent from, or changed since, `before`.
    pub fn changed_since(&self, before: &ArchiveSnapshot) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter(|(path, stamp)| before.entries.get(*path) != Some(*stamp))
            .map(|(path, _)| path.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_publish_line_format() {
        let cmd = PublishCommand::new(
            "community-ch32v",
            "/out/tool-wchisp-linux_x86_64-0.23.240307.tar.gz",
        );
        assert_eq!(
            cmd.to_string(),
            "pio pkg publish --type tool --owner \"community-ch32v\" --notify \"/out/tool-wchisp-linux_x86_64-0.23.240307.tar.gz\""
        );
    }

    #[test]
    fn test_scan_matches_pattern_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tool-demo-linux-1.0.1.tar.gz"), b"a").unwrap();
        fs::write(dir.path().join("tool-other-linux-1.0.1.tar.gz"), b"b").unwrap();
        fs::write(dir.path().join("tool-demo-notes.txt"), b"c").unwrap();

        let snap = ArchiveSnapshot::scan(dir.path(), "tool-demo-*.tar.gz");
        assert_eq!(
            snap.changed_since(&ArchiveSnapshot::default()),
            vec![dir.path().join("tool-demo-linux-1.0.1.tar.gz")]
        );
    }

    #[test]
    fn test_changed_since_detects_new_and_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("tool-demo-a-1.0.1.tar.gz");
        let rewritten = dir.path().join("tool-demo-b-1.0.1.tar.gz");
        fs::write(&old, b"old").unwrap();
        fs::write(&rewritten, b"v1").unwrap();

        let before = ArchiveSnapshot::scan(dir.path(), "tool-demo-*.tar.gz");

        let fresh = dir.path().join("tool-demo-c-1.0.1.tar.gz");
        fs::write(&fresh, b"new").unwrap();
        fs::write(&rewritten, b"version two").unwrap();

        let after = ArchiveSnapshot::scan(dir.path(), "tool-demo-*.tar.gz");
        assert_eq!(after.changed_since(&before), vec![rewritten, fresh]);
    }

    #[test]
    fn test_scan_missing_dir_is_empty() {
        let snap = ArchiveSnapshot::scan(Path::new("/definitely/not/here"), "x-*.tar.gz");
        assert!(snap.changed_since(&ArchiveSnapshot::default()).is_empty());
    }
}
