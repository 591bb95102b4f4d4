//! Core library for `pio-repack`.
//!
//! Takes a [`PackageDescriptor`] describing one prebuilt tool and, for every
//! platform it lists, downloads the upstream archive, flattens its layout,
//! stamps a `PlatformIO` `package.json` into it and hands the directory to an
//! external packager. The [`builder`] module drives the whole run; the other
//! modules are the individual steps.

pub mod builder;
pub mod command;
pub mod descriptor;
pub mod error;
pub mod io;
pub mod layout;
pub mod manifest;
pub mod paths;
pub mod publish;
pub mod reporter;
pub mod types;

pub use builder::{BuildOptions, BuildReport, PackageBuilder, PlatformReport, PlatformStatus};
pub use command::{CommandError, CommandOutput, Packager, PioPackager, ShellRunner, SystemShell};
pub use descriptor::{DescriptorError, PackageDescriptor};
pub use error::BuildError;
pub use manifest::{ManifestError, ManifestVersion, PackageManifest};
pub use publish::PublishCommand;
pub use reporter::{NullReporter, Reporter};
pub use types::PlatformKey;

/// User Agent string for download requests
pub const USER_AGENT: &str = concat!("pio-repack/", env!("CARGO_PKG_VERSION"));

/// Registry owner used in publish lines unless overridden.
pub const DEFAULT_OWNER: &str = "community-ch32v";

/// File name of the manifest written into every unpacked directory.
pub const MANIFEST_FILE: &str = "package.json";
