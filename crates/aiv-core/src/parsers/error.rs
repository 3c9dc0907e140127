//! Errors raised while turning checksum-file bytes into entries.

use crate::normalize::HashFormatError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("checksum payload is empty")]
    Empty,
    #[error("checksum payload is not valid UTF-8")]
    NotUtf8,
    #[error("checksum payload does not match any known checksum format")]
    UnrecognizedFormat,
    #[error("malformed manifest: {0}")]
    Manifest(String),
    #[error("checksum payload contains no usable hash entries")]
    NoEntries,
    /// Structure was recognized but the only hash values in it were unclassifiable.
    #[error(transparent)]
    Hash(#[from] HashFormatError),
}
