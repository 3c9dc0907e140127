//! Digest algorithms known to the engine and their canonical sizes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hash algorithm used by a publisher or computed locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// All supported algorithms, strongest first.
    pub const ALL: [HashAlgorithm; 5] = [
        HashAlgorithm::Sha512,
        HashAlgorithm::Sha384,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha1,
        HashAlgorithm::Md5,
    ];

    /// Digest size in bytes.
    pub fn byte_len(self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Length of the canonical lowercase hex form.
    pub fn hex_len(self) -> usize {
        self.byte_len() * 2
    }

    /// Algorithm whose hex form has exactly `len` characters.
    pub fn from_hex_len(len: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.hex_len() == len)
    }

    /// Algorithm whose raw digest has exactly `len` bytes.
    pub fn from_byte_len(len: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.byte_len() == len)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    /// Parse a label such as `sha256`, `SHA-256`, `sha_512` or `MD5`.
    ///
    /// Returns `None` for anything that is not a known algorithm name.
    pub fn from_label(label: &str) -> Option<Self> {
        let compact: String = label
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match compact.as_str() {
            "md5" => Some(HashAlgorithm::Md5),
            "sha1" => Some(HashAlgorithm::Sha1),
            "sha256" => Some(HashAlgorithm::Sha256),
            "sha384" => Some(HashAlgorithm::Sha384),
            "sha512" => Some(HashAlgorithm::Sha512),
            _ => None,
        }
    }

    /// Guess the algorithm from a checksum file name (`SHA512SUMS`, `app.AppImage.sha1`, ...).
    ///
    /// Longer names are tested first so `sha512` is never mistaken for `sha5`-anything.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let candidates = [
            ("sha512", HashAlgorithm::Sha512),
            ("sha384", HashAlgorithm::Sha384),
            ("sha256", HashAlgorithm::Sha256),
            ("sha1", HashAlgorithm::Sha1),
            ("md5", HashAlgorithm::Md5),
        ];
        candidates
            .into_iter()
            .find(|(needle, _)| lower.contains(needle))
            .map(|(_, algo)| algo)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an algorithm label is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hash algorithm: {0}")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for HashAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| UnknownAlgorithm(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_lengths_match_digest_sizes() {
        assert_eq!(HashAlgorithm::Md5.hex_len(), 32);
        assert_eq!(HashAlgorithm::Sha1.hex_len(), 40);
        assert_eq!(HashAlgorithm::Sha256.hex_len(), 64);
        assert_eq!(HashAlgorithm::Sha384.hex_len(), 96);
        assert_eq!(HashAlgorithm::Sha512.hex_len(), 128);
    }

    #[test]
    fn lookup_by_length() {
        assert_eq!(HashAlgorithm::from_hex_len(64), Some(HashAlgorithm::Sha256));
        assert_eq!(HashAlgorithm::from_byte_len(64), Some(HashAlgorithm::Sha512));
        assert_eq!(HashAlgorithm::from_hex_len(63), None);
        assert_eq!(HashAlgorithm::from_byte_len(24), None);
    }

    #[test]
    fn parse_labels() {
        assert_eq!("SHA-256".parse(), Ok(HashAlgorithm::Sha256));
        assert_eq!("sha512".parse(), Ok(HashAlgorithm::Sha512));
        assert_eq!("Md5".parse(), Ok(HashAlgorithm::Md5));
        assert!("crc32".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn guess_from_file_name() {
        assert_eq!(
            HashAlgorithm::from_file_name("SHA512SUMS"),
            Some(HashAlgorithm::Sha512)
        );
        assert_eq!(
            HashAlgorithm::from_file_name("tool.AppImage.sha1"),
            Some(HashAlgorithm::Sha1)
        );
        assert_eq!(HashAlgorithm::from_file_name("checksums.txt"), None);
    }
}
