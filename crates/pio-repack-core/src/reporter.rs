//! Reporter trait for dependency injection
//!
//! This trait allows the builder to report progress and status without
//! being coupled to a specific console implementation.

use std::path::Path;

use crate::builder::PlatformReport;
use crate::types::PlatformKey;

/// Receives progress events from a build.
pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Downloading tool-wchisp").
    fn section(&self, title: &str);

    /// Processing of a platform has started.
    fn platform_started(&self, platform: &PlatformKey, url: &str);

    /// Updates the progress of a download.
    fn downloading(&self, platform: &PlatformKey, current: u64, total: Option<u64>);

    /// The archive for a platform has been unpacked into `dir`.
    fn extracted(&self, platform: &PlatformKey, dir: &Path, entries: usize);

    /// Processing of a platform has finished, successfully or not.
    fn platform_finished(&self, report: &PlatformReport);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn platform_started(&self, _: &PlatformKey, _: &str) {}
    fn downloading(&self, _: &PlatformKey, _: u64, _: Option<u64>) {}
    fn extracted(&self, _: &PlatformKey, _: &Path, _: usize) {}
    fn platform_finished(&self, _: &PlatformReport) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
}
