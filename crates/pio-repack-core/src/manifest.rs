//! `package.json` manifest handling.
//!
//! A descriptor carries its manifest as a JSON template. For every platform
//! the template's version patch component is replaced with a `YYMMDD`
//! build-date code and its `system` list is narrowed to the single platform
//! being packaged. Every other field, and the order of all fields, is
//! written back exactly as the template has it.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::MANIFEST_FILE;
use crate::types::PlatformKey;

/// Errors raised while parsing or validating a manifest template.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The template is not a JSON object.
    #[error("Invalid manifest template: {0}")]
    Parse(#[from] serde_json::Error),

    /// A required field is absent or not a string.
    #[error("Manifest template has no string field {0:?}")]
    MissingField(&'static str),

    /// The `version` field is not `MAJOR.MINOR.PATCH`.
    #[error("Invalid manifest version {version:?}: {reason}")]
    InvalidVersion {
        /// The offending version string.
        version: String,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// A `PlatformIO` `package.json`, kept as the template's JSON object.
///
/// Only `version` and `system` are ever rewritten. `name` and `version` are
/// checked to be strings when parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageManifest {
    fields: Map<String, Value>,
}

impl PackageManifest {
    /// Parse a manifest template and check its name and version fields.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Parse`] for malformed JSON or a non-object
    /// document, [`ManifestError::MissingField`] without a string `name` or
    /// `version`, and [`ManifestError::InvalidVersion`] when the version
    /// cannot be stamped.
    pub fn parse(template: &str) -> Result<Self, ManifestError> {
        let manifest = Self {
            fields: serde_json::from_str(template)?,
        };
        manifest.required("name")?;
        ManifestVersion::parse(manifest.required("version")?)?;
        Ok(manifest)
    }

    fn required(&self, key: &'static str) -> Result<&str, ManifestError> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .ok_or(ManifestError::MissingField(key))
    }

    /// Package name.
    pub fn name(&self) -> &str {
        self.fields.get("name").and_then(Value::as_str).unwrap_or_default()
    }

    /// Version string.
    pub fn version(&self) -> &str {
        self.fields
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Raw value of a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Produce the manifest for one platform built on `date`.
    ///
    /// Stamping the same template for the same platform and day always
    /// yields the same manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidVersion`] if the version is malformed.
    pub fn stamp(&self, platform: &PlatformKey, date: NaiveDate) -> Result<Self, ManifestError> {
        let version = ManifestVersion::parse(self.version())?.with_date(date);
        let mut fields = self.fields.clone();
        fields.insert("version".to_string(), Value::String(version.to_string()));
        fields.insert(
            "system".to_string(),
            Value::Array(vec![Value::String(platform.to_string())]),
        );
        Ok(Self { fields })
    }

    /// Serialize as pretty-printed JSON with two-space indentation.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.fields)
    }

    /// Write `package.json` into `dir`, returning the written path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let json = self.to_json_pretty().map_err(std::io::Error::other)?;
        let path = dir.join(MANIFEST_FILE);
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

/// A parsed `MAJOR.MINOR.PATCH` version.
///
/// Components are kept as written, so `01.02.3` keeps its leading zeros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestVersion {
    /// Major component.
    pub major: String,
    /// Minor component.
    pub minor: String,
    /// Patch component.
    pub patch: String,
}

impl ManifestVersion {
    /// Parse a version with at least three dot-separated components.
    ///
    /// Components past the third are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidVersion`] if there are fewer than
    /// three components or the first two are not numeric.
    pub fn parse(version: &str) -> Result<Self, ManifestError> {
        let invalid = |reason| ManifestError::InvalidVersion {
            version: version.to_string(),
            reason,
        };

        let mut parts = version.split('.');
        let (Some(major), Some(minor), Some(patch)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected at least three dot-separated components"));
        };

        if !is_numeric(major) {
            return Err(invalid("major component is not a number"));
        }
        if !is_numeric(minor) {
            return Err(invalid("minor component is not a number"));
        }
        if patch.is_empty() {
            return Err(invalid("patch component is empty"));
        }

        Ok(Self {
            major: major.to_string(),
            minor: minor.to_string(),
            patch: patch.to_string(),
        })
    }

    /// Replace the patch component with the `YYMMDD` code for `date`.
    pub fn with_date(&self, date: NaiveDate) -> Self {
        Self {
            major: self.major.clone(),
            minor: self.minor.clone(),
            patch: date_code(date),
        }
    }
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl std::fmt::Display for ManifestVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Build-date code used as the patch component: two-digit year, month, day.
pub fn date_code(date: NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}
