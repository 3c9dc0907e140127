//! Finding the checksum entry that belongs to the asset being verified.
//!
//! Two passes: an exact, case-sensitive comparison (against the listed name
//! and its last path component), then a relaxed comparison that tolerates
//! publishers renaming files between versions.
//!
//! The relaxed rule is an approximation, not a reproduction of any upstream
//! heuristic: every `v?<digits>([._-]<digits>)*` run is removed, runs of
//! `-`, `_`, `.` and whitespace collapse to a single `-`, separators are
//! trimmed from both ends, and the result is compared ASCII
//! case-insensitively. `Tool-1.2.3-x86_64.AppImage` and
//! `tool_v1.3.0_x86_64.AppImage` both reduce to `tool-x-appimage`.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use super::ParsedChecksumEntry;
use crate::algorithm::HashAlgorithm;

/// Which pass produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Relaxed,
}

#[derive(Debug, Clone, Copy)]
pub struct EntryMatch<'a> {
    pub entry: &'a ParsedChecksumEntry,
    pub kind: MatchKind,
}

/// Pick the entry for `target`.
///
/// Among several candidates for the same file, `preferred` wins when present,
/// otherwise the strongest algorithm. A relaxed pass that finds two different
/// hashes for the same algorithm is ambiguous and matches nothing.
pub fn select_entry<'a>(
    entries: &'a [ParsedChecksumEntry],
    target: &str,
    preferred: Option<HashAlgorithm>,
) -> Option<EntryMatch<'a>> {
    let exact: Vec<&ParsedChecksumEntry> = entries
        .iter()
        .filter(|e| e.matched_filename == target || base_name(&e.matched_filename) == target)
        .collect();
    if !exact.is_empty() {
        return Some(EntryMatch {
            entry: pick(&exact, preferred),
            kind: MatchKind::Exact,
        });
    }

    let key = relaxed_key(base_name(target));
    if key.is_empty() {
        return None;
    }
    let relaxed: Vec<&ParsedChecksumEntry> = entries
        .iter()
        .filter(|e| relaxed_key(base_name(&e.matched_filename)) == key)
        .collect();
    if relaxed.is_empty() {
        return None;
    }
    if is_ambiguous(&relaxed) {
        tracing::warn!(
            file = target,
            candidates = relaxed.len(),
            "relaxed filename match is ambiguous; ignoring"
        );
        return None;
    }
    tracing::debug!(
        file = target,
        matched = %relaxed[0].matched_filename,
        "checksum entry matched by relaxed filename comparison"
    );
    Some(EntryMatch {
        entry: pick(&relaxed, preferred),
        kind: MatchKind::Relaxed,
    })
}

/// Reduce a filename to its version-insensitive comparison key.
pub fn relaxed_key(name: &str) -> String {
    static VERSION_RUN: OnceLock<Regex> = OnceLock::new();
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    let version_run =
        VERSION_RUN.get_or_init(|| Regex::new(r"[vV]?\d+(?:[._-]\d+)*").expect("valid regex"));
    let separators = SEPARATORS.get_or_init(|| Regex::new(r"[-_.\s]+").expect("valid regex"));

    let stripped = version_run.replace_all(name, "");
    let squeezed = separators.replace_all(&stripped, "-");
    squeezed.trim_matches('-').to_ascii_lowercase()
}

fn base_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn pick<'a>(
    candidates: &[&'a ParsedChecksumEntry],
    preferred: Option<HashAlgorithm>,
) -> &'a ParsedChecksumEntry {
    if let Some(p) = preferred {
        if let Some(e) = candidates.iter().copied().find(|e| e.algorithm == p) {
            return e;
        }
    }
    // Strongest algorithm; the first listed wins ties.
    let mut best = candidates[0];
    for &e in &candidates[1..] {
        if e.algorithm.byte_len() > best.algorithm.byte_len() {
            best = e;
        }
    }
    best
}

fn is_ambiguous(candidates: &[&ParsedChecksumEntry]) -> bool {
    candidates.iter().enumerate().any(|(i, a)| {
        candidates[i + 1..]
            .iter()
            .any(|b| a.algorithm == b.algorithm && a.hash != b.hash)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(name: &str, algorithm: HashAlgorithm, fill: char) -> ParsedChecksumEntry {
        ParsedChecksumEntry {
            matched_filename: name.to_string(),
            algorithm,
            hash: fill.to_string().repeat(algorithm.hex_len()),
        }
    }

    #[test]
    fn relaxed_key_strips_versions() {
        assert_eq!(relaxed_key("Tool-1.2.3-x86_64.AppImage"), "tool-x-appimage");
        assert_eq!(relaxed_key("tool_v1.3.0_x86_64.AppImage"), "tool-x-appimage");
        assert_eq!(relaxed_key("Tool-2.0-aarch64.AppImage"), "tool-aarch-appimage");
        assert_eq!(relaxed_key("1.0.0"), "");
    }

    #[test]
    fn exact_match_wins_over_relaxed() {
        let entries = vec![
            e("Tool-1.0.AppImage", HashAlgorithm::Sha256, 'a'),
            e("Tool-1.1.AppImage", HashAlgorithm::Sha256, 'b'),
        ];
        let m = select_entry(&entries, "Tool-1.1.AppImage", None).unwrap();
        assert_eq!(m.kind, MatchKind::Exact);
        assert_eq!(m.entry.hash, "b".repeat(64));
    }

    #[test]
    fn exact_match_is_case_sensitive() {
        let entries = vec![e("tool.AppImage", HashAlgorithm::Sha256, 'a')];
        let m = select_entry(&entries, "Tool.AppImage", None).unwrap();
        assert_eq!(m.kind, MatchKind::Relaxed);
    }

    #[test]
    fn exact_match_on_path_component() {
        let entries = vec![e("dist/linux/Tool.AppImage", HashAlgorithm::Sha256, 'a')];
        let m = select_entry(&entries, "Tool.AppImage", None).unwrap();
        assert_eq!(m.kind, MatchKind::Exact);
    }

    #[test]
    fn relaxed_match_tolerates_renamed_version() {
        let entries = vec![
            e("Tool-1.0-x86_64.AppImage", HashAlgorithm::Sha256, 'a'),
            e("Tool-1.0-aarch64.AppImage", HashAlgorithm::Sha256, 'b'),
        ];
        let m = select_entry(&entries, "Tool-1.1-x86_64.AppImage", None).unwrap();
        assert_eq!(m.kind, MatchKind::Relaxed);
        assert_eq!(m.entry.hash, "a".repeat(64));
    }

    #[test]
    fn ambiguous_relaxed_match_is_rejected() {
        let entries = vec![
            e("Tool-1.0.AppImage", HashAlgorithm::Sha256, 'a'),
            e("Tool-0.9.AppImage", HashAlgorithm::Sha256, 'b'),
        ];
        assert!(select_entry(&entries, "Tool-1.1.AppImage", None).is_none());
    }

    #[test]
    fn relaxed_candidates_under_different_algorithms_are_not_ambiguous() {
        let entries = vec![
            e("Tool-1.0.AppImage", HashAlgorithm::Sha256, 'a'),
            e("Tool-1.0.AppImage", HashAlgorithm::Sha512, 'b'),
        ];
        let m = select_entry(&entries, "Tool-1.1.AppImage", None).unwrap();
        assert_eq!(m.kind, MatchKind::Relaxed);
        assert_eq!(m.entry.algorithm, HashAlgorithm::Sha512);
    }

    #[test]
    fn preferred_then_strongest_algorithm() {
        let entries = vec![
            e("t.AppImage", HashAlgorithm::Sha256, 'a'),
            e("t.AppImage", HashAlgorithm::Sha512, 'b'),
            e("t.AppImage", HashAlgorithm::Md5, 'c'),
        ];
        let m = select_entry(&entries, "t.AppImage", None).unwrap();
        assert_eq!(m.entry.algorithm, HashAlgorithm::Sha512);
        let m = select_entry(&entries, "t.AppImage", Some(HashAlgorithm::Md5)).unwrap();
        assert_eq!(m.entry.algorithm, HashAlgorithm::Md5);
    }

    #[test]
    fn no_match() {
        let entries = vec![e("other.bin", HashAlgorithm::Sha256, 'a')];
        assert!(select_entry(&entries, "Tool.AppImage", None).is_none());
    }
}
