//! Small shared value types.

use std::borrow::Borrow;

use serde::{Deserialize, Serialize};

/// Identifier for an OS/architecture combination, e.g. `linux_x86_64`.
///
/// The key ends up in directory names and in the manifest's `system` list,
/// so it is restricted to a single path component without whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlatformKey(String);

impl PlatformKey {
    /// Validate and wrap a platform key.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the key is empty or contains
    /// a path separator or whitespace.
    pub fn new(key: impl Into<String>) -> Result<Self, String> {
        let key = key.into();
        if key.is_empty() {
            return Err("platform key must not be empty".to_string());
        }
        if key.contains(['/', '\\']) || key.chars().any(char::is_whitespace) {
            return Err(format!("invalid platform key: {key:?}"));
        }
        Ok(Self(key))
    }

    /// Return the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PlatformKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for PlatformKey {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl std::str::FromStr for PlatformKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<PlatformKey> for String {
    fn from(key: PlatformKey) -> Self {
        key.0
    }
}

impl std::fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::ops::Deref for PlatformKey {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PlatformKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PlatformKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PlatformKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PlatformKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_usual_keys() {
        for key in ["linux_x86_64", "windows_amd64", "darwin_arm64"] {
            assert_eq!(PlatformKey::new(key).unwrap(), key);
        }
    }

    #[test]
    fn test_rejects_bad_keys() {
        assert!(PlatformKey::new("").is_err());
        assert!(PlatformKey::new("linux/x86").is_err());
        assert!(PlatformKey::new("linux x86").is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<PlatformKey, _> = serde_json::from_str("\"linux_aarch64\"");
        assert!(ok.is_ok());
        let bad: Result<PlatformKey, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }
}
