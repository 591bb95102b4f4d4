//! Package descriptors.
//!
//! A [`PackageDescriptor`] is the immutable configuration for one run: which
//! upstream archive to fetch for each platform, the manifest template to
//! stamp, and optional per-platform fix-up commands. Every constructor
//! validates the invariants, so a descriptor that exists is usable.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::manifest::{ManifestError, PackageManifest};
use crate::paths::filename_from_url;
use crate::types::PlatformKey;

/// Errors raised when a descriptor violates its invariants.
#[derive(Error, Debug)]
pub enum DescriptorError {
    /// The package name is empty or not a single path component.
    #[error("Invalid package name: {0:?}")]
    InvalidName(String),

    /// A platform key is malformed.
    #[error("{0}")]
    InvalidPlatform(String),

    /// No platforms were given.
    #[error("Descriptor for {0} has no download URLs")]
    NoPlatforms(String),

    /// A URL has no final path segment to name the downloaded file after.
    #[error("URL for {platform} has no file name: {url}")]
    InvalidUrl {
        /// Platform the URL belongs to.
        platform: PlatformKey,
        /// The offending URL.
        url: String,
    },

    /// Two platforms would download to the same file name.
    #[error("URLs for {first} and {second} both download to {file}")]
    DuplicateFileName {
        /// Shared file name.
        file: String,
        /// Platform that claimed the name first.
        first: PlatformKey,
        /// Platform that collides with it.
        second: PlatformKey,
    },

    /// A fix-up command names a platform without a download URL.
    #[error("Extra command for {0} has no matching download URL")]
    OrphanCommand(PlatformKey),

    /// The manifest template cannot be stamped.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A descriptor file could not be read.
    #[error("Failed to read descriptor {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A descriptor file is not valid TOML for this schema.
    #[error("Failed to parse descriptor: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Immutable description of one tool to repackage.
#[derive(Debug, Clone)]
pub struct PackageDescriptor {
    name: String,
    download_urls: BTreeMap<PlatformKey, String>,
    manifest_template: String,
    manifest: PackageManifest,
    extra_commands: BTreeMap<PlatformKey, String>,
}

/// On-disk TOML shape of a descriptor.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DescriptorFile {
    name: String,
    download_urls: BTreeMap<PlatformKey, String>,
    manifest_template: String,
    #[serde(default)]
    extra_commands: BTreeMap<PlatformKey, String>,
}

impl PackageDescriptor {
    /// Build a descriptor, checking every invariant.
    ///
    /// # Errors
    ///
    /// Returns a [`DescriptorError`] if the name is invalid, there are no
    /// platforms, a URL has no file name, two URLs share a file name, an
    /// extra command has no matching URL, or the manifest template cannot be
    /// parsed and stamped.
    pub fn new(
        name: impl Into<String>,
        download_urls: BTreeMap<PlatformKey, String>,
        manifest_template: impl Into<String>,
        extra_commands: BTreeMap<PlatformKey, String>,
    ) -> Result<Self, DescriptorError> {
        let name = name.into();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(DescriptorError::InvalidName(name));
        }

        if download_urls.is_empty() {
            return Err(DescriptorError::NoPlatforms(name));
        }

        let mut files: BTreeMap<&str, &PlatformKey> = BTreeMap::new();
        for (platform, url) in &download_urls {
            let file = filename_from_url(url);
            if file.is_empty() {
                return Err(DescriptorError::InvalidUrl {
                    platform: platform.clone(),
                    url: url.clone(),
                });
            }
            if let Some(first) = files.insert(file, platform) {
                return Err(DescriptorError::DuplicateFileName {
                    file: file.to_string(),
                    first: first.clone(),
                    second: platform.clone(),
                });
            }
        }

        if let Some(orphan) = extra_commands
            .keys()
            .find(|k| !download_urls.contains_key(*k))
        {
            return Err(DescriptorError::OrphanCommand(orphan.clone()));
        }

        let manifest_template = manifest_template.into();
        let manifest = PackageManifest::parse(&manifest_template)?;

        Ok(Self {
            name,
            download_urls,
            manifest_template,
            manifest,
            extra_commands,
        })
    }

    /// Parse a descriptor from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or the result violates a
    /// descriptor invariant.
    pub fn from_toml(content: &str) -> Result<Self, DescriptorError> {
        let file: DescriptorFile = toml::from_str(content)?;
        Self::new(
            file.name,
            file.download_urls,
            file.manifest_template,
            file.extra_commands,
        )
    }

    /// Load a descriptor from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let content = std::fs::read_to_string(path).map_err(|source| DescriptorError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Package name, used for the working directory and archive names.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Platform keys in processing order.
    pub fn platforms(&self) -> impl Iterator<Item = &PlatformKey> {
        self.download_urls.keys()
    }

    /// Download URL for `platform`.
    pub fn url(&self, platform: &str) -> Option<&str> {
        self.download_urls.get(platform).map(String::as_str)
    }

    /// All platform/URL pairs in processing order.
    pub fn download_urls(&self) -> &BTreeMap<PlatformKey, String> {
        &self.download_urls
    }

    /// The raw manifest template text.
    pub fn manifest_template(&self) -> &str {
        &self.manifest_template
    }

    /// The parsed manifest template.
    pub fn manifest(&self) -> &PackageManifest {
        &self.manifest
    }

    /// Fix-up command for `platform`, if any.
    pub fn extra_command(&self, platform: &str) -> Option<&str> {
        self.extra_commands.get(platform).map(String::as_str)
    }

    /// Glob pattern matching archives the packager produces for this package.
    pub fn archive_pattern(&self) -> String {
        format!("{}-*.tar.gz", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"{"name": "tool-demo", "version": "1.2.3"}"#;

    fn key(s: &str) -> PlatformKey {
        PlatformKey::new(s).unwrap()
    }

    fn urls() -> BTreeMap<PlatformKey, String> {
        BTreeMap::from([
            (key("linux_x86_64"), "https://example.com/demo-linux.tar.gz".to_string()),
            (key("windows_amd64"), "https://example.com/demo-win.zip".to_string()),
        ])
    }

    #[test]
    fn test_valid_descriptor() {
        let cmds = BTreeMap::from([(key("linux_x86_64"), "chmod +x demo".to_string())]);
        let desc = PackageDescriptor::new("tool-demo", urls(), TEMPLATE, cmds).unwrap();

        let platforms: Vec<&str> = desc.platforms().map(PlatformKey::as_str).collect();
        assert_eq!(platforms, ["linux_x86_64", "windows_amd64"]);
        assert_eq!(desc.extra_command("linux_x86_64"), Some("chmod +x demo"));
        assert_eq!(desc.extra_command("windows_amd64"), None);
        assert_eq!(desc.url("windows_amd64"), Some("https://example.com/demo-win.zip"));
        assert_eq!(desc.archive_pattern(), "tool-demo-*.tar.gz");
    }

    #[test]
    fn test_orphan_command_rejected() {
        let cmds = BTreeMap::from([(key("darwin_arm64"), "true".to_string())]);
        let err = PackageDescriptor::new("tool-demo", urls(), TEMPLATE, cmds).unwrap_err();
        assert!(matches!(err, DescriptorError::OrphanCommand(k) if k == "darwin_arm64"));
    }

    #[test]
    fn test_bad_version_rejected() {
        let err = PackageDescriptor::new(
            "tool-demo",
            urls(),
            r#"{"name": "tool-demo", "version": "1.2"}"#,
            BTreeMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DescriptorError::Manifest(_)));
    }

    #[test]
    fn test_structural_checks() {
        assert!(matches!(
            PackageDescriptor::new("", urls(), TEMPLATE, BTreeMap::new()),
            Err(DescriptorError::InvalidName(_))
        ));
        assert!(matches!(
            PackageDescriptor::new("tool-demo", BTreeMap::new(), TEMPLATE, BTreeMap::new()),
            Err(DescriptorError::NoPlatforms(_))
        ));

        let trailing = BTreeMap::from([(key("linux_x86_64"), "https://example.com/".to_string())]);
        assert!(matches!(
            PackageDescriptor::new("tool-demo", trailing, TEMPLATE, BTreeMap::new()),
            Err(DescriptorError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_shared_file_name_rejected() {
        let urls = BTreeMap::from([
            (key("darwin_arm64"), "https://example.com/arm64/tool.zip".to_string()),
            (key("darwin_x86_64"), "https://example.com/x64/tool.zip?dl=1".to_string()),
            (key("linux_x86_64"), "https://example.com/tool-linux.tar.gz".to_string()),
        ]);
        let err = PackageDescriptor::new("tool-demo", urls, TEMPLATE, BTreeMap::new()).unwrap_err();
        match err {
            DescriptorError::DuplicateFileName { file, first, second } => {
                assert_eq!(file, "tool.zip");
                assert_eq!(first, "darwin_arm64");
                assert_eq!(second, "darwin_x86_64");
            }
            other => panic!("expected a duplicate file name, got {other:?}"),
        }
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
name = "tool-demo"
manifest_template = '''
{ "name": "tool-demo", "version": "0.1.0" }
'''

[download_urls]
linux_x86_64 = "https://example.com/demo-linux.tar.gz"

[extra_commands]
linux_x86_64 = "chmod +x demo"
"#;
        let desc = PackageDescriptor::from_toml(toml).unwrap();
        assert_eq!(desc.name(), "tool-demo");
        assert_eq!(desc.manifest().version(), "0.1.0");
        assert_eq!(desc.extra_command("linux_x86_64"), Some("chmod +x demo"));
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let toml = r#"
name = "tool-demo"
manifest_template = '{ "name": "tool-demo", "version": "0.1.0" }'
owner = "me"

[download_urls]
linux_x86_64 = "https://example.com/demo-linux.tar.gz"
"#;
        assert!(matches!(
            PackageDescriptor::from_toml(toml),
            Err(DescriptorError::Toml(_))
        ));
    }
}
