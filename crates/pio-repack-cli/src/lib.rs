//! `pio-repack` command-line front end.
//!
//! Parses arguments, picks the descriptor (built-in or from a TOML file),
//! wires the real shell, packager and console reporter into the core
//! builder, and prints the publish lines at the end.

pub mod console;
pub mod descriptors;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;

use pio_repack_core::{
    BuildOptions, DEFAULT_OWNER, PackageBuilder, PackageDescriptor, PioPackager, PlatformKey,
    PlatformStatus, Reporter, SystemShell,
};

use crate::console::ConsoleReporter;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "pio-repack")]
#[command(author, version, long_about = None)]
#[command(about = "Repackage prebuilt tool releases as PlatformIO packages")]
pub struct Cli {
    /// Descriptor TOML file (defaults to the built-in tool-wchisp descriptor)
    #[arg(short, long)]
    pub descriptor: Option<PathBuf>,

    /// Parent directory for the per-package working directory
    #[arg(short, long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Directory the packager writes archives into
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Registry owner used in the printed publish commands
    #[arg(long, env = "PIO_REPACK_OWNER", default_value = DEFAULT_OWNER)]
    pub owner: String,

    /// Only build these platforms (repeatable)
    #[arg(short, long = "platform", value_name = "KEY")]
    pub platforms: Vec<PlatformKey>,

    /// Packaging program invoked as `<PROGRAM> pkg pack <DIR>`
    #[arg(long, env = "PIO_REPACK_PACKAGER", default_value = "pio")]
    pub packager: String,

    /// Build date for the version stamp, YYYY-MM-DD (defaults to today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,

    /// Validate the descriptor and list its platforms without building
    #[arg(long)]
    pub check: bool,
}

impl Cli {
    /// Load the selected descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor file is missing or invalid.
    pub fn descriptor(&self) -> Result<PackageDescriptor> {
        match &self.descriptor {
            Some(path) => PackageDescriptor::load(path)
                .with_context(|| format!("Failed to load descriptor {}", path.display())),
            None => descriptors::wchisp().context("Built-in descriptor is invalid"),
        }
    }

    fn build_options(&self) -> BuildOptions {
        BuildOptions {
            work_root: self.work_dir.clone(),
            output_dir: self.output_dir.clone(),
            date: self.date,
            platforms: (!self.platforms.is_empty()).then(|| self.platforms.clone()),
        }
    }
}

/// Run the CLI.
///
/// Per-platform fix-up and packaging failures are reported but do not make
/// this function fail; only fatal build errors do.
///
/// # Errors
///
/// Returns an error if the descriptor is invalid or the build aborts.
pub async fn run(cli: &Cli) -> Result<()> {
    let descriptor = cli.descriptor()?;

    if cli.check {
        print_check(&descriptor);
        return Ok(());
    }

    let reporter = ConsoleReporter;
    let packager = PioPackager::new(&cli.packager);
    if which::which(packager.program()).is_err() {
        reporter.warning(&format!(
            "`{}` was not found on PATH; packaging will fail",
            packager.program()
        ));
    }

    let builder = PackageBuilder::new(&SystemShell, &packager, &reporter, cli.build_options())?;
    let report = builder
        .build(&descriptor)
        .await
        .with_context(|| format!("Build of {} aborted", descriptor.name()))?;

    for platform in &report.platforms {
        tracing::info!(
            platform = %platform.platform,
            status = ?platform.status(),
            "platform finished"
        );
    }

    let failed = report.failed_platforms();
    if !failed.is_empty() {
        let names: Vec<String> = failed.iter().map(ToString::to_string).collect();
        reporter.warning(&format!("Packaging failed for: {}", names.join(", ")));
    }

    let fixups = report
        .platforms
        .iter()
        .filter(|p| p.status() == PlatformStatus::FixupFailedButContinued)
        .count();
    if fixups > 0 {
        reporter.warning(&format!("{fixups} fix-up command(s) failed"));
    }

    let commands = report.publish_commands(&cli.owner);
    if !commands.is_empty() {
        reporter.info(&format!(
            "Publish the archives in {} with:",
            report.output_dir.display()
        ));
    }
    for command in commands {
        println!("{command}");
    }

    Ok(())
}

fn print_check(descriptor: &PackageDescriptor) {
    println!(
        "{} {} ({} platforms)",
        descriptor.name(),
        descriptor.manifest().version(),
        descriptor.download_urls().len()
    );
    for (platform, url) in descriptor.download_urls() {
        match descriptor.extra_command(platform) {
            Some(cmd) => println!("  {platform}: {url} [{cmd}]"),
            None => println!("  {platform}: {url}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["pio-repack"]).unwrap();
        assert_eq!(cli.work_dir, PathBuf::from("."));
        assert_eq!(cli.packager, "pio");
        assert!(cli.platforms.is_empty());
        assert!(cli.build_options().platforms.is_none());
        assert_eq!(cli.descriptor().unwrap().name(), "tool-wchisp");
    }

    #[test]
    fn test_platform_and_date_flags() {
        let cli = Cli::try_parse_from([
            "pio-repack",
            "-p",
            "linux_x86_64",
            "--platform",
            "darwin_arm64",
            "--date",
            "2024-03-07",
        ])
        .unwrap();

        let opts = cli.build_options();
        let platforms = opts.platforms.unwrap();
        assert_eq!(
            platforms,
            [
                PlatformKey::new("linux_x86_64").unwrap(),
                PlatformKey::new("darwin_arm64").unwrap()
            ]
        );
        assert_eq!(opts.date, NaiveDate::from_ymd_opt(2024, 3, 7));
    }

    #[test]
    fn test_rejects_bad_platform_key() {
        assert!(Cli::try_parse_from(["pio-repack", "-p", "linux x86"]).is_err());
    }
}
