//! Structured manifests: JSON objects and YAML documents.
//!
//! Shapes understood, all of which may appear in the same document:
//! - a root hash key (`sha512: <b64>`) with an optional root `path`/`file`/`url`
//! - lists of per-file records under `files`, `assets`, `checksums` or `artifacts`
//!   (`- url: app.AppImage` + `sha512: ...`), as in electron-builder's `latest-linux.yml`
//! - flat maps `{ "<file>": "<hash>" }`
//! - nested maps `{ "<file>": { "sha256": "<hash>" } }`

use serde_json::{Map, Value};

use super::{clean_filename, entry, EntryCollector, ParseContext, ParseError, ParsedChecksumEntry};
use crate::algorithm::HashAlgorithm;

const LIST_KEYS: &[&str] = &["files", "assets", "checksums", "artifacts"];
const NAME_KEYS: &[&str] = &["url", "path", "file", "filename", "name"];
/// At the root `name` usually names the application, not a file.
const ROOT_NAME_KEYS: &[&str] = &["path", "file", "filename", "url"];
/// `sha2` is what older electron-builder releases wrote for a hex SHA-256.
const GENERIC_HASH_KEYS: &[&str] = &["checksum", "hash", "digest", "sha2"];

pub(super) fn parse(
    text: &str,
    ctx: &ParseContext<'_>,
) -> Result<Vec<ParsedChecksumEntry>, ParseError> {
    let root = load(text)?;
    let Value::Object(map) = root else {
        return Err(ParseError::Manifest("manifest root is not a mapping".into()));
    };

    let mut collector = EntryCollector::default();

    for key in LIST_KEYS {
        if let Some(Value::Array(items)) = map.get(*key) {
            for item in items {
                if let Value::Object(record) = item {
                    collect_record(record, NAME_KEYS, None, ctx, &mut collector);
                }
            }
        }
    }

    // Root-level hash applies to the root name field, else the caller's filename.
    collect_record(
        &map,
        ROOT_NAME_KEYS,
        Some(ctx.default_filename),
        ctx,
        &mut collector,
    );

    for (key, value) in &map {
        if is_reserved_key(key) {
            continue;
        }
        match value {
            Value::String(raw) => {
                if looks_like_filename(key) {
                    collector.push(entry(clean_filename(key), raw, ctx.algorithm_hint));
                }
            }
            Value::Object(nested) => {
                collect_record(
                    nested,
                    NAME_KEYS,
                    Some(clean_filename(key)),
                    ctx,
                    &mut collector,
                );
            }
            _ => {}
        }
    }

    collector.finish()
}

fn load(text: &str) -> Result<Value, ParseError> {
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with('{') {
        serde_json::from_str(trimmed).map_err(|e| ParseError::Manifest(e.to_string()))
    } else {
        serde_yaml::from_str(trimmed).map_err(|e| ParseError::Manifest(e.to_string()))
    }
}

/// Pull hashes out of one mapping. The filename comes from the first of
/// `name_keys` present in the mapping, else `fallback_name`; mappings with
/// neither are skipped.
fn collect_record(
    record: &Map<String, Value>,
    name_keys: &[&str],
    fallback_name: Option<&str>,
    ctx: &ParseContext<'_>,
    collector: &mut EntryCollector,
) {
    let name = name_keys
        .iter()
        .find_map(|k| record.get(*k).and_then(Value::as_str))
        .map(clean_filename)
        .filter(|n| !n.is_empty())
        .or(fallback_name);

    let hashes: Vec<(Option<HashAlgorithm>, &str)> = record
        .iter()
        .filter_map(|(k, v)| {
            let raw = v.as_str()?;
            if let Some(algo) = HashAlgorithm::from_label(k) {
                Some((Some(algo), raw))
            } else if GENERIC_HASH_KEYS.contains(&k.to_ascii_lowercase().as_str()) {
                Some((None, raw))
            } else {
                None
            }
        })
        .collect();

    if hashes.is_empty() {
        return;
    }
    let Some(name) = name else {
        tracing::debug!("manifest record has hashes but no filename; skipping");
        return;
    };

    for (key_algo, raw) in hashes {
        let result = entry(name, raw, key_algo.or(ctx.algorithm_hint));
        if let (Ok(e), Some(expected)) = (&result, key_algo) {
            if e.algorithm != expected {
                tracing::debug!(
                    file = name,
                    key = %expected,
                    classified = %e.algorithm,
                    "manifest hash key disagrees with value length; using value length"
                );
            }
        }
        collector.push(result);
    }
}

fn is_reserved_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    LIST_KEYS.contains(&lower.as_str())
        || NAME_KEYS.contains(&lower.as_str())
        || GENERIC_HASH_KEYS.contains(&lower.as_str())
        || HashAlgorithm::from_label(key).is_some()
}

/// Flat-map keys are filenames; metadata keys like `version` or `releaseDate` are not.
fn looks_like_filename(key: &str) -> bool {
    key.contains('.') || key.contains('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use sha2::{Digest, Sha256, Sha512};

    fn ctx() -> ParseContext<'static> {
        ParseContext::new("fallback.AppImage")
    }

    #[test]
    fn electron_builder_latest_linux_yml() {
        let digest = Sha512::digest(b"appimage bytes");
        let b64 = STANDARD.encode(digest);
        let yml = format!(
            "version: 1.4.2\nfiles:\n  - url: Tool-1.4.2.AppImage\n    sha512: {b64}\n    size: 1234\n    blockMapSize: 99\npath: Tool-1.4.2.AppImage\nsha512: {b64}\nreleaseDate: '2024-05-01T10:00:00.000Z'\n"
        );
        let entries = parse(&yml, &ctx()).unwrap();
        assert_eq!(entries.len(), 1, "list entry and root entry deduplicate");
        assert_eq!(entries[0].matched_filename, "Tool-1.4.2.AppImage");
        assert_eq!(entries[0].algorithm, HashAlgorithm::Sha512);
        assert_eq!(entries[0].hash, hex::encode(digest));
    }

    #[test]
    fn single_root_key_uses_default_filename() {
        let b64 = STANDARD.encode(Sha512::digest(b"x"));
        let entries = parse(&format!("sha512: {b64}\n"), &ctx()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].matched_filename, "fallback.AppImage");
    }

    #[test]
    fn json_flat_map() {
        let h = hex::encode(Sha256::digest(b"a"));
        let json = format!(r#"{{"a.AppImage": "{h}", "version": "2.0"}}"#);
        let entries = parse(&json, &ctx()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].matched_filename, "a.AppImage");
        assert_eq!(entries[0].hash, h);
    }

    #[test]
    fn json_nested_map() {
        let h = hex::encode(Sha256::digest(b"a"));
        let json = format!(r#"{{"dist/a.AppImage": {{"sha256": "sha256:{h}", "size": 3}}}}"#);
        let entries = parse(&json, &ctx()).unwrap();
        assert_eq!(entries[0].matched_filename, "dist/a.AppImage");
        assert_eq!(entries[0].algorithm, HashAlgorithm::Sha256);
    }

    #[test]
    fn generic_checksum_key_in_list() {
        let h = hex::encode(Sha256::digest(b"b"));
        let json = format!(r#"{{"assets": [{{"name": "b.AppImage", "checksum": "{h}"}}]}}"#);
        let entries = parse(&json, &ctx()).unwrap();
        assert_eq!(entries[0].matched_filename, "b.AppImage");
        assert_eq!(entries[0].algorithm, HashAlgorithm::Sha256);
    }

    #[test]
    fn malformed_json_is_manifest_error() {
        let err = parse("{ not json", &ctx()).unwrap_err();
        assert!(matches!(err, ParseError::Manifest(_)));
    }

    #[test]
    fn manifest_without_hashes_has_no_entries() {
        let err = parse("version: 1.0.0\nname: tool\n", &ctx()).unwrap_err();
        assert_eq!(err, ParseError::NoEntries);
    }
}
