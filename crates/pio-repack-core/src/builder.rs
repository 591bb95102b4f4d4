//! Build orchestration for repackaged tools.
//!
//! [`PackageBuilder::build`] walks every platform of a [`PackageDescriptor`]
//! in order and, for each one:
//!
//! 1. downloads the upstream archive into `<work_root>/<name>/`,
//! 2. unpacks it into `<archive>_unpacked/`,
//! 3. hoists a lone wrapper directory (see [`crate::layout`]),
//! 4. writes a `package.json` stamped with `MAJOR.MINOR.YYMMDD` and the
//!    platform key,
//! 5. runs the platform's fix-up command, if any,
//! 6. hands the directory to the [`Packager`].
//!
//! ## Failure policy
//!
//! | Step | On failure |
//! |---|---|
//! | download, extract, layout, manifest | abort the build ([`BuildError`]) |
//! | fix-up | log, record [`FixupStatus::Failed`], keep going |
//! | package | log, record [`PackOutcome::Failed`], next platform |

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use reqwest::Client;

use crate::command::{Packager, ShellRunner};
use crate::descriptor::PackageDescriptor;
use crate::error::BuildError;
use crate::io::download::{build_client, download_to_file};
use crate::io::extract::extract_auto;
use crate::layout::normalize_layout;
use crate::paths::{filename_from_url, package_work_dir, unpacked_dir};
use crate::publish::{ArchiveSnapshot, PublishCommand};
use crate::reporter::Reporter;
use crate::types::PlatformKey;

/// Knobs for a build run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Parent of the per-package working directory.
    pub work_root: PathBuf,
    /// Directory the packager writes archives into.
    pub output_dir: PathBuf,
    /// Build date for the version stamp; `None` means today (local time).
    pub date: Option<NaiveDate>,
    /// Restrict the run to these platforms; `None` builds all of them.
    pub platforms: Option<Vec<PlatformKey>>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            work_root: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            date: None,
            platforms: None,
        }
    }
}

/// What happened to a platform's fix-up command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixupStatus {
    /// The descriptor has no command for this platform.
    NotConfigured,
    /// The command ran and exited zero.
    Succeeded,
    /// The command could not run or exited non-zero.
    Failed {
        /// The command line.
        command: String,
        /// Error detail.
        reason: String,
    },
}

/// What happened when packing a platform's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackOutcome {
    /// The packager succeeded; `archives` are the files it wrote.
    Packaged {
        /// New or rewritten archives in the output directory.
        archives: Vec<PathBuf>,
    },
    /// The packager failed; the platform contributes nothing to publish.
    Failed {
        /// Error detail.
        reason: String,
    },
}

/// Collapsed view of a platform's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformStatus {
    /// Everything ran cleanly.
    Success,
    /// The fix-up failed but the package was still produced.
    FixupFailedButContinued,
    /// Packaging failed; the platform was skipped.
    PackagingFailedAndSkipped,
}

/// Result of processing one platform.
#[derive(Debug, Clone)]
pub struct PlatformReport {
    /// Platform key.
    pub platform: PlatformKey,
    /// Downloaded upstream archive.
    pub download_path: PathBuf,
    /// Normalized extraction directory holding `package.json`.
    pub unpacked_dir: PathBuf,
    /// Version written into the manifest.
    pub version: String,
    /// Fix-up result.
    pub fixup: FixupStatus,
    /// Packaging result.
    pub outcome: PackOutcome,
}

impl PlatformReport {
    /// Collapse fix-up and packaging results into one status.
    pub fn status(&self) -> PlatformStatus {
        match (&self.fixup, &self.outcome) {
            (_, PackOutcome::Failed { .. }) => PlatformStatus::PackagingFailedAndSkipped,
            (FixupStatus::Failed { .. }, PackOutcome::Packaged { .. }) => {
                PlatformStatus::FixupFailedButContinued
            }
            _ => PlatformStatus::Success,
        }
    }

    /// Archives produced for this platform (empty if packaging failed).
    pub fn archives(&self) -> &[PathBuf] {
        match &self.outcome {
            PackOutcome::Packaged { archives } => archives,
            PackOutcome::Failed { .. } => &[],
        }
    }
}

/// Result of a whole build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Package name.
    pub package: String,
    /// Working directory that holds downloads and unpacked trees.
    pub work_dir: PathBuf,
    /// Directory archives were written to.
    pub output_dir: PathBuf,
    /// Per-platform results, in processing order.
    pub platforms: Vec<PlatformReport>,
}

impl BuildReport {
    /// Archives from every successfully packaged platform, in order.
    pub fn published_archives(&self) -> Vec<&Path> {
        self.platforms
            .iter()
            .flat_map(|p| p.archives().iter().map(PathBuf::as_path))
            .collect()
    }

    /// One publish command per produced archive.
    pub fn publish_commands(&self, owner: &str) -> Vec<PublishCommand> {
        self.published_archives()
            .into_iter()
            .map(|archive| PublishCommand::new(owner, archive))
            .collect()
    }

    /// Platforms whose packaging step failed.
    pub fn failed_platforms(&self) -> Vec<&PlatformKey> {
        self.platforms
            .iter()
            .filter(|p| p.status() == PlatformStatus::PackagingFailedAndSkipped)
            .map(|p| &p.platform)
            .collect()
    }

    /// Look up the report for `platform`.
    pub fn platform(&self, platform: &str) -> Option<&PlatformReport> {
        self.platforms.iter().find(|p| p.platform == platform)
    }
}

/// Drives a descriptor through download, repack and packaging.
pub struct PackageBuilder<'a> {
    client: Client,
    shell: &'a dyn ShellRunner,
    packager: &'a dyn Packager,
    reporter: &'a dyn Reporter,
    options: BuildOptions,
}

impl std::fmt::Debug for PackageBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageBuilder")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a> PackageBuilder<'a> {
    /// Create a builder with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Client`] if the HTTP client cannot be created.
    pub fn new(
        shell: &'a dyn ShellRunner,
        packager: &'a dyn Packager,
        reporter: &'a dyn Reporter,
        options: BuildOptions,
    ) -> Result<Self, BuildError> {
        let client = build_client().map_err(BuildError::Client)?;
        Ok(Self::with_client(client, shell, packager, reporter, options))
    }

    /// Create a builder around an existing HTTP client.
    pub fn with_client(
        client: Client,
        shell: &'a dyn ShellRunner,
        packager: &'a dyn Packager,
        reporter: &'a dyn Reporter,
        options: BuildOptions,
    ) -> Self {
        Self {
            client,
            shell,
            packager,
            reporter,
            options,
        }
    }

    /// Build every selected platform of `descriptor`.
    ///
    /// The working directory `<work_root>/<name>` is deleted and recreated
    /// first. Platforms are processed one after another.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if a requested platform is unknown, or if a
    /// download, extraction, layout or manifest step fails for any platform.
    /// Fix-up and packaging failures are not errors; see [`BuildReport`].
    pub async fn build(&self, descriptor: &PackageDescriptor) -> Result<BuildReport, BuildError> {
        let platforms = self.select_platforms(descriptor)?;
        let date = self
            .options
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive());

        let work_root = absolute(&self.options.work_root)?;
        let output_dir = absolute(&self.options.output_dir)?;
        let work_dir = package_work_dir(&work_root, descriptor.name());

        self.reporter.section(&format!(
            "Downloading {} into {}",
            descriptor.name(),
            work_dir.display()
        ));

        recreate_dir(&work_dir)?;
        std::fs::create_dir_all(&output_dir)
            .map_err(|e| BuildError::io("Failed to create output directory", &output_dir, e))?;

        let mut reports = Vec::with_capacity(platforms.len());
        for platform in platforms {
            let report = self
                .build_platform(descriptor, platform, &work_dir, &output_dir, date)
                .await?;
            self.reporter.platform_finished(&report);
            reports.push(report);
        }

        self.reporter.section("Done generating packages");

        Ok(BuildReport {
            package: descriptor.name().to_string(),
            work_dir,
            output_dir,
            platforms: reports,
        })
    }

    /// Resolve the platform filter against the descriptor.
    fn select_platforms<'d>(
        &self,
        descriptor: &'d PackageDescriptor,
    ) -> Result<Vec<&'d PlatformKey>, BuildError> {
        let Some(wanted) = &self.options.platforms else {
            return Ok(descriptor.platforms().collect());
        };

        if let Some(unknown) = wanted.iter().find(|k| descriptor.url(k).is_none()) {
            return Err(BuildError::UnknownPlatform {
                package: descriptor.name().to_string(),
                platform: unknown.to_string(),
            });
        }

        Ok(descriptor
            .platforms()
            .filter(|k| wanted.contains(k))
            .collect())
    }

    async fn build_platform(
        &self,
        descriptor: &PackageDescriptor,
        platform: &PlatformKey,
        work_dir: &Path,
        output_dir: &Path,
        date: NaiveDate,
    ) -> Result<PlatformReport, BuildError> {
        let url = descriptor
            .url(platform)
            .ok_or_else(|| BuildError::UnknownPlatform {
                package: descriptor.name().to_string(),
                platform: platform.to_string(),
            })?;
        self.reporter.platform_started(platform, url);

        // 1. Download
        let download_path = work_dir.join(filename_from_url(url));
        download_to_file(&self.client, url, &download_path, platform, self.reporter)
            .await
            .map_err(|source| BuildError::Download {
                platform: platform.clone(),
                source,
            })?;

        // 2. Unpack
        let unpacked = unpacked_dir(&download_path);
        let entries =
            extract_auto(&download_path, &unpacked).map_err(|source| BuildError::Extract {
                platform: platform.clone(),
                source,
            })?;
        self.reporter.extracted(platform, &unpacked, entries);

        // 3. Flatten a single wrapping directory
        let hoisted = normalize_layout(&unpacked)
            .map_err(|e| BuildError::io("Failed to normalize layout", &unpacked, e))?;
        if hoisted {
            self.reporter.info(&format!(
                "Moved wrapper directory contents up into {}",
                unpacked.display()
            ));
        }

        // 4. Stamp package.json
        let manifest = descriptor
            .manifest()
            .stamp(platform, date)
            .map_err(|source| BuildError::Manifest {
                platform: platform.clone(),
                source,
            })?;
        manifest
            .write_to(&unpacked)
            .map_err(|e| BuildError::io("Failed to write manifest", &unpacked, e))?;
        tracing::debug!(%platform, version = %manifest.version(), "manifest written");

        // 5. Fix-up
        let fixup = match descriptor.extra_command(platform) {
            None => FixupStatus::NotConfigured,
            Some(command) => match self.shell.run(command, &unpacked) {
                Ok(_) => FixupStatus::Succeeded,
                Err(e) => {
                    tracing::warn!(%platform, %command, error = %e, "fix-up command failed");
                    self.reporter
                        .error(&format!("Failed to execute command: {command}"));
                    self.reporter.error(&e.to_string());
                    FixupStatus::Failed {
                        command: command.to_string(),
                        reason: e.to_string(),
                    }
                }
            },
        };

        // 6. Package
        let pattern = descriptor.archive_pattern();
        let before = ArchiveSnapshot::scan(output_dir, &pattern);
        let outcome = match self.packager.pack(&unpacked, output_dir) {
            Ok(_) => {
                let archives = ArchiveSnapshot::scan(output_dir, &pattern).changed_since(&before);
                if archives.is_empty() {
                    self.reporter.warning(&format!(
                        "Packager reported success for {platform} but no {pattern} archive \
                         appeared in {}",
                        output_dir.display()
                    ));
                }
                PackOutcome::Packaged { archives }
            }
            Err(e) => {
                tracing::warn!(%platform, error = %e, "packaging failed");
                self.reporter.error(&format!(
                    "Failed to package directory {}",
                    unpacked.display()
                ));
                self.reporter.error(&e.to_string());
                PackOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        Ok(PlatformReport {
            platform: platform.clone(),
            download_path,
            unpacked_dir: unpacked,
            version: manifest.version().to_string(),
            fixup,
            outcome,
        })
    }
}

fn absolute(path: &Path) -> Result<PathBuf, BuildError> {
    std::path::absolute(path).map_err(|e| BuildError::io("Failed to resolve path", path, e))
}

/// Delete `dir` if present and create it empty.
fn recreate_dir(dir: &Path) -> Result<(), BuildError> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => tracing::debug!(dir = %dir.display(), "removed previous working directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(BuildError::io("Failed to clear working directory", dir, e)),
    }
    std::fs::create_dir_all(dir)
        .map_err(|e| BuildError::io("Failed to create working directory", dir, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullReporter;
    use crate::command::{CommandError, CommandOutput};
    use std::collections::BTreeMap;

    struct NoShell;
    impl ShellRunner for NoShell {
        fn run(&self, _: &str, _: &Path) -> Result<CommandOutput, CommandError> {
            Ok(CommandOutput::default())
        }
    }

    struct NoPack;
    impl Packager for NoPack {
        fn pack(&self, _: &Path, _: &Path) -> Result<CommandOutput, CommandError> {
            Ok(CommandOutput::default())
        }
    }

    fn key(s: &str) -> PlatformKey {
        PlatformKey::new(s).unwrap()
    }

    fn descriptor() -> PackageDescriptor {
        PackageDescriptor::new(
            "tool-demo",
            BTreeMap::from([
                (key("linux_x86_64"), "https://example.com/a.tar.gz".to_string()),
                (key("windows_amd64"), "https://example.com/b.zip".to_string()),
            ]),
            r#"{"name": "tool-demo", "version": "1.0.0"}"#,
            BTreeMap::new(),
        )
        .unwrap()
    }

    fn builder(platforms: Option<Vec<PlatformKey>>) -> PackageBuilder<'static> {
        let options = BuildOptions {
            platforms,
            ..BuildOptions::default()
        };
        PackageBuilder::with_client(Client::new(), &NoShell, &NoPack, &NullReporter, options)
    }

    #[test]
    fn test_select_all_platforms() {
        let desc = descriptor();
        let selected = builder(None).select_platforms(&desc).unwrap();
        assert_eq!(selected, [&key("linux_x86_64"), &key("windows_amd64")]);
    }

    #[test]
    fn test_select_subset_keeps_descriptor_order() {
        let desc = descriptor();
        let b = builder(Some(vec![key("windows_amd64"), key("linux_x86_64")]));
        let selected = b.select_platforms(&desc).unwrap();
        assert_eq!(selected, [&key("linux_x86_64"), &key("windows_amd64")]);
    }

    #[test]
    fn test_select_unknown_platform_fails() {
        let desc = descriptor();
        let err = builder(Some(vec![key("darwin_arm64")]))
            .select_platforms(&desc)
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::UnknownPlatform { platform, .. } if platform == "darwin_arm64"
        ));
    }

    #[test]
    fn test_status_collapse() {
        let mut report = PlatformReport {
            platform: key("linux_x86_64"),
            download_path: PathBuf::from("a.tar.gz"),
            unpacked_dir: PathBuf::from("a.tar.gz_unpacked"),
            version: "1.0.240307".to_string(),
            fixup: FixupStatus::NotConfigured,
            outcome: PackOutcome::Packaged {
                archives: vec![PathBuf::from("tool-demo-linux_x86_64-1.0.240307.tar.gz")],
            },
        };
        assert_eq!(report.status(), PlatformStatus::Success);

        report.fixup = FixupStatus::Failed {
            command: "chmod +x nope".to_string(),
            reason: "exit 1".to_string(),
        };
        assert_eq!(report.status(), PlatformStatus::FixupFailedButContinued);

        report.outcome = PackOutcome::Failed {
            reason: "pio missing".to_string(),
        };
        assert_eq!(report.status(), PlatformStatus::PackagingFailedAndSkipped);
        assert!(report.archives().is_empty());
    }

    #[test]
    fn test_recreate_dir_clears_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("tool-demo");
        std::fs::create_dir_all(dir.join("stale")).unwrap();
        std::fs::write(dir.join("stale/file"), b"x").unwrap();

        recreate_dir(&dir).unwrap();

        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }
}
