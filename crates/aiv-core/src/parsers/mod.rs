//! Checksum-file parsers.
//!
//! Three formats are recognized by sniffing the content, never the file name:
//! - structured manifests (JSON, or YAML such as electron-builder's `latest-linux.yml`)
//! - line-based sums files (`<hash>  <file>`, `<hash> *<file>`, BSD `SHA256 (file) = <hash>`)
//! - a bare single hash, optionally followed by a filename
//!
//! Every hash leaving this module has been through [`crate::normalize`], so
//! entries always carry canonical lowercase hex.

mod bare;
mod error;
mod manifest;
mod matching;
mod sums;

use serde::Serialize;

use crate::algorithm::HashAlgorithm;
use crate::normalize::{self, HashFormatError};

pub use error::ParseError;
pub use matching::{relaxed_key, select_entry, EntryMatch, MatchKind};

/// One (filename, algorithm, hash) triple extracted from a checksum payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedChecksumEntry {
    pub matched_filename: String,
    pub algorithm: HashAlgorithm,
    /// Canonical lowercase hex.
    pub hash: String,
}

/// Detected payload structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumFormat {
    Manifest,
    SumsFile,
    BareHash,
}

/// What the caller knows about the payload beyond its bytes.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    /// Filename that root-level or filename-less hashes apply to.
    pub default_filename: &'a str,
    /// Algorithm suggested by configuration or the checksum file's name.
    pub algorithm_hint: Option<HashAlgorithm>,
}

impl<'a> ParseContext<'a> {
    pub fn new(default_filename: &'a str) -> Self {
        Self {
            default_filename,
            algorithm_hint: None,
        }
    }

    pub fn with_hint(mut self, hint: Option<HashAlgorithm>) -> Self {
        self.algorithm_hint = hint;
        self
    }
}

/// Sniff `bytes`, run the matching parser, and return canonical entries.
pub fn parse_checksum(
    bytes: &[u8],
    ctx: &ParseContext<'_>,
) -> Result<Vec<ParsedChecksumEntry>, ParseError> {
    let text = decode_text(bytes)?;
    let format = detect_format(text).ok_or(ParseError::UnrecognizedFormat)?;
    tracing::debug!(?format, "detected checksum payload format");
    parse_as(format, text, ctx)
}

/// Run a specific parser on already-decoded text.
pub fn parse_as(
    format: ChecksumFormat,
    text: &str,
    ctx: &ParseContext<'_>,
) -> Result<Vec<ParsedChecksumEntry>, ParseError> {
    let text = strip_bom(text);
    match format {
        ChecksumFormat::Manifest => manifest::parse(text, ctx),
        ChecksumFormat::SumsFile => sums::parse(text, ctx),
        ChecksumFormat::BareHash => bare::parse(text, ctx),
    }
}

/// Decide the payload format from its first meaningful content.
///
/// `{` or a leading `key:` line selects the manifest parser; any line with two
/// or more whitespace-separated tokens selects the sums-file parser; a single
/// token of plausible hash length selects the bare parser.
pub fn detect_format(text: &str) -> Option<ChecksumFormat> {
    let trimmed = strip_bom(text).trim_start();
    if trimmed.starts_with('{') {
        return Some(ChecksumFormat::Manifest);
    }

    let mut lines = content_lines(trimmed).peekable();
    let first = *lines.peek()?;
    if first == "---" || looks_like_yaml_key(first) {
        return Some(ChecksumFormat::Manifest);
    }

    let lines: Vec<&str> = lines.collect();
    if lines.iter().any(|l| l.split_whitespace().nth(1).is_some()) {
        return Some(ChecksumFormat::SumsFile);
    }

    let token = lines.first()?.trim();
    if plausible_hash_length(token) {
        return Some(ChecksumFormat::BareHash);
    }
    None
}

/// Non-empty lines that are not `#` comments, trimmed.
pub(crate) fn content_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
}

/// Strip the binary-mode marker and a leading `./` from a listed filename.
pub(crate) fn clean_filename(raw: &str) -> &str {
    let name = raw.trim();
    let name = name.strip_prefix('*').unwrap_or(name);
    name.strip_prefix("./").unwrap_or(name).trim()
}

/// Normalize a raw hash into an entry for `filename`.
pub(crate) fn entry(
    filename: &str,
    raw_hash: &str,
    hint: Option<HashAlgorithm>,
) -> Result<ParsedChecksumEntry, HashFormatError> {
    let n = normalize::classify(raw_hash, hint)?;
    Ok(ParsedChecksumEntry {
        matched_filename: filename.to_string(),
        algorithm: n.algorithm,
        hash: n.hex,
    })
}

/// Collects entries and remembers the first hash error so a payload whose
/// every hash is broken reports why, instead of a bare "no entries".
#[derive(Default)]
pub(crate) struct EntryCollector {
    entries: Vec<ParsedChecksumEntry>,
    first_error: Option<HashFormatError>,
}

impl EntryCollector {
    pub(crate) fn push(&mut self, result: Result<ParsedChecksumEntry, HashFormatError>) {
        match result {
            Ok(e) => {
                if !self.entries.contains(&e) {
                    self.entries.push(e);
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "skipping unclassifiable hash");
                if self.first_error.is_none() {
                    self.first_error = Some(err);
                }
            }
        }
    }

    pub(crate) fn finish(self) -> Result<Vec<ParsedChecksumEntry>, ParseError> {
        if !self.entries.is_empty() {
            return Ok(self.entries);
        }
        match self.first_error {
            Some(e) => Err(ParseError::Hash(e)),
            None => Err(ParseError::NoEntries),
        }
    }
}

fn decode_text(bytes: &[u8]) -> Result<&str, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ParseError::NotUtf8)?;
    let text = strip_bom(text);
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(text)
}

/// Drop a leading UTF-8 byte-order mark; `str::trim` keeps U+FEFF.
fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

fn looks_like_yaml_key(line: &str) -> bool {
    let Some((key, rest)) = line.split_once(':') else {
        return false;
    };
    let key_ok = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '"' | '\''));
    key_ok && (rest.is_empty() || rest.starts_with(char::is_whitespace))
}

fn plausible_hash_length(token: &str) -> bool {
    let (_, value) = normalize::split_algorithm_label(token);
    (22..=132).contains(&value.trim().len())
}

#[cfg(test)]
mod tests;
