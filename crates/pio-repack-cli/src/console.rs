//! Plain stdout reporter.

use std::path::Path;

use pio_repack_core::builder::{FixupStatus, PackOutcome};
use pio_repack_core::{PlatformKey, PlatformReport, Reporter};

/// Prints build progress to standard output, one line per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        println!("=== {title} ===");
    }

    fn platform_started(&self, platform: &PlatformKey, url: &str) {
        println!("Key: {platform} URL: {url}");
    }

    fn downloading(&self, platform: &PlatformKey, current: u64, total: Option<u64>) {
        tracing::trace!(%platform, current, ?total, "download progress");
        if total == Some(current) && current > 0 {
            println!("  downloaded {current} bytes");
        }
    }

    fn extracted(&self, _platform: &PlatformKey, dir: &Path, entries: usize) {
        println!("  unpacked {entries} entries into {}", dir.display());
    }

    fn platform_finished(&self, report: &PlatformReport) {
        if let FixupStatus::Failed { command, .. } = &report.fixup {
            println!("  fix-up `{command}` failed, packaged anyway");
        }
        match &report.outcome {
            PackOutcome::Packaged { archives } => {
                for archive in archives {
                    println!("  packed {} ({})", archive.display(), report.version);
                }
            }
            PackOutcome::Failed { .. } => println!("  skipped {}", report.platform),
        }
    }

    fn info(&self, msg: &str) {
        println!("{msg}");
    }

    fn warning(&self, msg: &str) {
        println!("warning: {msg}");
    }

    fn error(&self, msg: &str) {
        println!("{msg}");
    }
}
