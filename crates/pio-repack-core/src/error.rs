//! Fatal build errors.
//!
//! Anything in here aborts the whole run. Recoverable per-platform failures
//! (fix-up and packaging) are recorded in the build report instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::io::download::DownloadError;
use crate::io::extract::ExtractError;
use crate::manifest::ManifestError;
use crate::types::PlatformKey;

/// An error that aborts a build.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Downloading a platform's artifact failed.
    #[error("Download failed for {platform}: {source}")]
    Download {
        /// Platform being processed.
        platform: PlatformKey,
        /// Underlying download error.
        source: DownloadError,
    },

    /// Unpacking a platform's artifact failed.
    #[error("Extraction failed for {platform}: {source}")]
    Extract {
        /// Platform being processed.
        platform: PlatformKey,
        /// Underlying extraction error.
        source: ExtractError,
    },

    /// The manifest could not be stamped.
    #[error("Manifest error for {platform}: {source}")]
    Manifest {
        /// Platform being processed.
        platform: PlatformKey,
        /// Underlying manifest error.
        source: ManifestError,
    },

    /// A filesystem operation failed.
    #[error("{context} ({}): {source}", .path.display())]
    Io {
        /// What was being done.
        context: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A platform was requested that the descriptor does not list.
    #[error("Unknown platform {platform} for package {package}")]
    UnknownPlatform {
        /// Package being built.
        package: String,
        /// The requested key.
        platform: String,
    },

    /// The HTTP client could not be created.
    #[error("Failed to initialise HTTP client: {0}")]
    Client(#[source] DownloadError),
}

impl BuildError {
    /// Wrap an IO error with the action and path it concerns.
    pub fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }
}
