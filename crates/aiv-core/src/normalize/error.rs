//! Error type for hash classification.

/// A raw hash string could not be classified as hex or base64, or its decoded
/// bytes did not match any known digest size.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashFormatError {
    /// Nothing left after stripping whitespace, quotes and an algorithm label.
    #[error("empty hash value")]
    Empty,
    /// Characters outside both the hex and the base64 alphabets.
    #[error("hash value {0:?} is neither hex nor base64")]
    InvalidCharacters(String),
    /// Base64-shaped text that the decoder rejected (bad padding, trailing bits).
    #[error("hash value {value:?} is not valid base64: {reason}")]
    InvalidBase64 { value: String, reason: String },
    /// Decoded cleanly but to a length no supported digest has.
    #[error("hash value {value:?} decodes to {decoded} bytes, which is not a known digest size")]
    UnexpectedDigestSize { value: String, decoded: usize },
}

/// Shorten a value to at most 48 bytes for error messages.
pub(super) fn excerpt(value: &str) -> String {
    const MAX: usize = 48;
    if value.len() <= MAX {
        return value.to_string();
    }
    let mut end = MAX;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &value[..end])
}
