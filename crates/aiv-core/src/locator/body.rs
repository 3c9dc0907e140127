//! Pulling hash-looking tokens out of free-text release notes.
//!
//! Two token shapes are accepted:
//! - anything in the base64/hex alphabet directly after an algorithm label
//!   (`SHA256: ...`, `**sha512**: \`...\``, `sha512-...`)
//! - unlabelled hex of SHA-256 length or longer
//!
//! Unlabelled 32/40-character hex is ignored: release notes are full of git
//! commit ids, which have exactly the SHA-1 shape.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use crate::algorithm::HashAlgorithm;

/// Upper bound on tokens taken from one release body.
pub const MAX_BODY_TOKENS: usize = 8;

/// A candidate hash found in release notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyToken {
    pub token: String,
    /// Algorithm named by the label in front of the token, if any.
    pub label: Option<HashAlgorithm>,
    /// True if the line the token sits on mentions the target filename.
    pub names_target: bool,
}

fn labelled() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(sha-?(?:1|256|384|512)|md5)(?:sum)?\b[^A-Za-z0-9+/\n]{0,6}([A-Za-z0-9+/]{22,}={0,2})")
            .expect("valid regex")
    })
}

fn bare_hex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Fa-f0-9]{64,128}\b").expect("valid regex"))
}

/// Extract candidate tokens from `body`.
///
/// Tokens on lines that mention `target_name` come first; within a line,
/// labelled tokens precede bare hex. Duplicates are dropped and at most
/// [`MAX_BODY_TOKENS`] are returned.
pub fn extract_body_hashes(body: &str, target_name: &str) -> Vec<BodyToken> {
    let mut found: Vec<BodyToken> = Vec::new();

    for line in body.lines() {
        let names_target = !target_name.is_empty() && line.contains(target_name);
        let mut claimed: Vec<Range<usize>> = Vec::new();

        for caps in labelled().captures_iter(line) {
            let (Some(label), Some(token)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            claimed.push(token.range());
            push_unique(
                &mut found,
                BodyToken {
                    token: token.as_str().to_string(),
                    label: HashAlgorithm::from_label(label.as_str()),
                    names_target,
                },
            );
        }

        for m in bare_hex().find_iter(line) {
            if !is_hex_digest_length(m.len()) || overlaps(&claimed, &m.range()) {
                continue;
            }
            push_unique(
                &mut found,
                BodyToken {
                    token: m.as_str().to_string(),
                    label: None,
                    names_target,
                },
            );
        }
    }

    // Stable: keeps document order within each group.
    found.sort_by_key(|t| !t.names_target);
    found.truncate(MAX_BODY_TOKENS);
    found
}

fn is_hex_digest_length(len: usize) -> bool {
    matches!(
        HashAlgorithm::from_hex_len(len),
        Some(HashAlgorithm::Sha256 | HashAlgorithm::Sha384 | HashAlgorithm::Sha512)
    )
}

fn overlaps(claimed: &[Range<usize>], r: &Range<usize>) -> bool {
    claimed.iter().any(|c| c.start < r.end && r.start < c.end)
}

fn push_unique(found: &mut Vec<BodyToken>, token: BodyToken) {
    match found.iter_mut().find(|t| t.token == token.token) {
        Some(existing) => {
            existing.names_target |= token.names_target;
            if existing.label.is_none() {
                existing.label = token.label;
            }
        }
        None => found.push(token),
    }
}
