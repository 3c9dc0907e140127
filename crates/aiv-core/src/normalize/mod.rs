//! Hash encoding classification and canonicalization.
//!
//! Publishers ship digests as hex or base64 with nothing in the surrounding
//! file to say which. Classification is hex-first: a value that already has
//! the exact hex length of a known algorithm and only hex digits is returned
//! lowercased and is never handed to the base64 decoder. Hex digits are a
//! subset of the base64 alphabet, so a 64-character SHA-256 hex string would
//! otherwise decode "successfully" into 48 bytes of garbage that look like a
//! SHA-384 digest.

mod error;

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::algorithm::HashAlgorithm;

pub use error::HashFormatError;

use error::excerpt;

/// How a raw hash value was encoded by its publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashEncoding {
    Hex,
    Base64,
}

/// A classified hash: canonical lowercase hex plus what was learned on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedHash {
    pub algorithm: HashAlgorithm,
    pub encoding: HashEncoding,
    /// Lowercase hex, exactly `algorithm.hex_len()` characters.
    pub hex: String,
}

/// Classify `raw` and return its canonical lowercase hex form.
///
/// `algorithm_hint` only breaks ties between algorithms of equal length; it
/// never forces a decode path the length and charset do not support.
pub fn normalize(
    raw: &str,
    algorithm_hint: Option<HashAlgorithm>,
) -> Result<String, HashFormatError> {
    classify(raw, algorithm_hint).map(|n| n.hex)
}

/// Classify `raw` as hex or base64 and canonicalize it.
///
/// Steps: strip whitespace and surrounding quotes, strip a leading algorithm
/// label (`sha256:`, `sha512-`, `SHA1=`), then try hex, then base64.
pub fn classify(
    raw: &str,
    algorithm_hint: Option<HashAlgorithm>,
) -> Result<NormalizedHash, HashFormatError> {
    let unwrapped = strip_wrapping(raw);
    let (label, value) = split_algorithm_label(&unwrapped);
    let hint = algorithm_hint.or(label);

    if value.is_empty() {
        return Err(HashFormatError::Empty);
    }

    if let Some(algorithm) = hex_shape(value, hint) {
        return Ok(NormalizedHash {
            algorithm,
            encoding: HashEncoding::Hex,
            hex: value.to_ascii_lowercase(),
        });
    }

    if !is_base64_alphabet(value) {
        return Err(HashFormatError::InvalidCharacters(excerpt(value)));
    }

    let bytes = decode_base64(value)?;
    let algorithm = pick_algorithm(bytes.len(), hint, HashAlgorithm::byte_len).ok_or_else(|| {
        HashFormatError::UnexpectedDigestSize {
            value: excerpt(value),
            decoded: bytes.len(),
        }
    })?;

    Ok(NormalizedHash {
        algorithm,
        encoding: HashEncoding::Base64,
        hex: hex::encode(bytes),
    })
}

/// True if `value` is already canonical hex for some known algorithm.
pub fn is_canonical_hex(value: &str) -> bool {
    HashAlgorithm::from_hex_len(value.len()).is_some()
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Split a leading `algo:` / `algo-` / `algo=` label off a hash value.
///
/// Only labels naming a known algorithm are split; anything else is returned
/// untouched with `None`.
pub fn split_algorithm_label(value: &str) -> (Option<HashAlgorithm>, &str) {
    // "sha-512" is the longest accepted label; separators past it are part of the value.
    for (idx, c) in value.char_indices().take(9) {
        if matches!(c, ':' | '-' | '=') {
            if let Some(algo) = HashAlgorithm::from_label(&value[..idx]) {
                return (Some(algo), value[idx + 1..].trim_start());
            }
        }
    }
    (None, value)
}

fn strip_wrapping(raw: &str) -> String {
    let quoted = raw
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`'))
        .trim();
    quoted.chars().filter(|c| !c.is_whitespace()).collect()
}

fn hex_shape(value: &str, hint: Option<HashAlgorithm>) -> Option<HashAlgorithm> {
    if !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    pick_algorithm(value.len(), hint, HashAlgorithm::hex_len)
}

/// Resolve an algorithm from a measured length. A hint that agrees with the
/// length wins; a disagreeing hint is ignored.
fn pick_algorithm(
    len: usize,
    hint: Option<HashAlgorithm>,
    measure: fn(HashAlgorithm) -> usize,
) -> Option<HashAlgorithm> {
    if let Some(h) = hint {
        if measure(h) == len {
            return Some(h);
        }
    }
    let found = HashAlgorithm::ALL.into_iter().find(|a| measure(*a) == len);
    if let (Some(h), Some(f)) = (hint, found) {
        tracing::debug!(hint = %h, classified = %f, "algorithm hint disagrees with hash length");
    }
    found
}

fn is_base64_alphabet(value: &str) -> bool {
    let body = value.trim_end_matches('=');
    let padding = value.len() - body.len();
    padding <= 2
        && !body.is_empty()
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

fn decode_base64(value: &str) -> Result<Vec<u8>, HashFormatError> {
    let result = if value.ends_with('=') || value.len() % 4 == 0 {
        STANDARD.decode(value)
    } else {
        STANDARD_NO_PAD.decode(value)
    };
    result.map_err(|e| HashFormatError::InvalidBase64 {
        value: excerpt(value),
        reason: e.to_string(),
    })
}
