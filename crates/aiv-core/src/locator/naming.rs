//! Recognizing sibling assets that carry checksums for a target asset.

use crate::release::Asset;

/// Per-asset sidecar extensions, most specific first.
const SIDECAR_EXTS: &[&str] = &[
    ".sha512",
    ".sha512sum",
    ".sha384",
    ".sha256",
    ".sha256sum",
    ".sha1",
    ".sha1sum",
    ".md5",
    ".md5sum",
    ".digest",
    ".checksum",
];

/// Aggregate sums-file names (compared lowercased, with any `.txt` suffix removed).
const AGGREGATE_NAMES: &[&str] = &[
    "sha512sums",
    "sha384sums",
    "sha256sums",
    "sha1sums",
    "md5sums",
    "checksums",
    "sums",
];

/// How strongly a sibling asset is tied to the target; lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum Convention {
    Template,
    Sidecar,
    Aggregate,
    Manifest,
}

/// Expand a checksum filename template for `asset_name`.
///
/// `{filename}` is the full asset name and `{stem}` the name without its last
/// extension. A template without placeholders is a literal asset name.
pub fn expand_template(template: &str, asset_name: &str) -> String {
    template
        .replace("{filename}", asset_name)
        .replace("{stem}", stem(asset_name))
}

/// Siblings of `target` that look like checksum files, best convention first.
/// Assets of equal rank keep their release order. Names in `declared` rank
/// with the template even when no convention recognizes them.
pub(super) fn checksum_candidates<'a>(
    target: &Asset,
    assets: &'a [Asset],
    template: Option<&str>,
    declared: &[String],
) -> Vec<(&'a Asset, Convention)> {
    let expanded = template.map(|t| expand_template(t, &target.name));
    let mut ranked: Vec<(&Asset, Convention)> = assets
        .iter()
        .filter(|a| a.name != target.name)
        .filter_map(|a| {
            if declared.contains(&a.name) {
                return Some((a, Convention::Template));
            }
            classify(&a.name, &target.name, expanded.as_deref()).map(|c| (a, c))
        })
        .collect();
    ranked.sort_by_key(|(_, c)| *c);
    ranked
}

fn classify(candidate: &str, target: &str, template: Option<&str>) -> Option<Convention> {
    if template == Some(candidate) {
        return Some(Convention::Template);
    }
    if is_sidecar(candidate, target) {
        return Some(Convention::Sidecar);
    }
    let lower = candidate.to_ascii_lowercase();
    if is_aggregate(&lower) {
        return Some(Convention::Aggregate);
    }
    if is_manifest(&lower) {
        return Some(Convention::Manifest);
    }
    None
}

fn is_sidecar(candidate: &str, target: &str) -> bool {
    let lower = candidate.to_ascii_lowercase();
    let target_lower = target.to_ascii_lowercase();
    let stem_lower = stem(target).to_ascii_lowercase();
    SIDECAR_EXTS.iter().any(|ext| {
        lower.strip_suffix(ext).is_some_and(|base| {
            let base = base.strip_suffix(".txt").unwrap_or(base);
            base == target_lower || base == stem_lower
        })
    })
}

fn is_aggregate(lower: &str) -> bool {
    let base = lower.strip_suffix(".txt").unwrap_or(lower);
    if base.contains("checksums") {
        return true;
    }
    AGGREGATE_NAMES.iter().any(|n| {
        base.strip_suffix(n)
            .is_some_and(|prefix| prefix.is_empty() || prefix.ends_with(['_', '-', '.']))
    })
}

fn is_manifest(lower: &str) -> bool {
    let is_structured = [".yml", ".yaml", ".json"]
        .iter()
        .any(|ext| lower.ends_with(ext));
    is_structured
        && (lower.starts_with("latest") || lower.contains("checksum") || lower.contains("sha"))
}

fn stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}
