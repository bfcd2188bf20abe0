//! Strong type definitions shared across sealdrop crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier the remote service assigns to an uploaded package.
///
/// Ids end up in URL paths, so only ASCII alphanumerics, `-` and `_` are
/// accepted.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageId(String);

/// Returned when a string is not a usable package id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid package id: {0:?}")]
pub struct InvalidPackageId(pub String);

/// Maximum accepted id length.
pub const MAX_PACKAGE_ID_LEN: usize = 128;

impl PackageId {
    /// Validate and wrap an id.
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidPackageId> {
        let id = id.into();
        let valid = !id.is_empty()
            && id.len() <= MAX_PACKAGE_ID_LEN
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if valid {
            Ok(Self(id))
        } else {
            Err(InvalidPackageId(id))
        }
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackageId({})", self.0)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PackageId {
    type Err = InvalidPackageId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PackageId {
    type Error = InvalidPackageId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PackageId> for String {
    fn from(id: PackageId) -> Self {
        id.0
    }
}

impl AsRef<str> for PackageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_id_accepts_uuid() {
        let id: PackageId = "0b6e2c1a-7f3d-4c11-9a55-2d4f8e9b1c70".parse().unwrap();
        assert_eq!(id.as_str(), "0b6e2c1a-7f3d-4c11-9a55-2d4f8e9b1c70");
    }

    #[test]
    fn test_package_id_rejects_path_characters() {
        assert!(PackageId::new("../metadata").is_err());
        assert!(PackageId::new("a/b").is_err());
        assert!(PackageId::new("").is_err());
        assert!(PackageId::new("x".repeat(MAX_PACKAGE_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_package_id_serde_validates() {
        let ok: PackageId = serde_json::from_str("\"pkg_01\"").unwrap();
        assert_eq!(ok.to_string(), "pkg_01");

        let bad: std::result::Result<PackageId, _> = serde_json::from_str("\"has space\"");
        assert!(bad.is_err());
    }
}
