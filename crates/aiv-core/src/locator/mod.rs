//! Locating candidate proof sources for a downloaded asset.
//!
//! Sources are returned highest confidence first:
//! 1. the platform digest on the asset itself
//! 2. sibling checksum files (configured template, then well-known names)
//! 3. hash-looking tokens in the release notes, only when 1 and 2 found nothing
//!
//! The locator never parses checksum files; it only pairs each candidate with
//! the bytes a collaborator already fetched. An empty result is a normal
//! outcome that the orchestrator turns into a skip verdict.

mod body;
mod naming;

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::algorithm::HashAlgorithm;
use crate::config::VerificationConfig;
use crate::release::{Asset, AssetDigest};

pub use body::{extract_body_hashes, BodyToken, MAX_BODY_TOKENS};
pub use naming::expand_template;

/// Where a proof came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOrigin {
    AssetDigest,
    ChecksumFile,
    ReleaseBody,
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceOrigin::AssetDigest => write!(f, "asset digest"),
            SourceOrigin::ChecksumFile => write!(f, "checksum file"),
            SourceOrigin::ReleaseBody => write!(f, "release notes"),
        }
    }
}

/// The unparsed proof a source carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePayload {
    /// Already canonical; needs no parsing.
    Digest(AssetDigest),
    /// Raw checksum-file bytes for a parser.
    File(Vec<u8>),
    /// One token lifted from release notes.
    Token(String),
}

/// One candidate proof, created by [`locate`] and consumed once by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumSource {
    pub origin: SourceOrigin,
    pub payload: SourcePayload,
    /// Human-readable label for reports (`checksum file SHA256SUMS`).
    pub description: String,
    /// Where checksum-file content came from; the cache key.
    pub source_url: Option<String>,
    /// Algorithm suggested by the source's label or file name.
    pub algorithm_hint: Option<HashAlgorithm>,
}

/// Supplies checksum-file bytes fetched by a download collaborator.
pub trait ChecksumContent: Sync {
    /// Bytes of `asset`, or `None` if they were not fetched.
    fn content(&self, asset: &Asset) -> Option<Vec<u8>>;
}

/// Content keyed by asset name.
impl ChecksumContent for HashMap<String, Vec<u8>> {
    fn content(&self, asset: &Asset) -> Option<Vec<u8>> {
        self.get(&asset.name).cloned()
    }
}

/// A collaborator that fetched nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoContent;

impl ChecksumContent for NoContent {
    fn content(&self, _asset: &Asset) -> Option<Vec<u8>> {
        None
    }
}

/// Everything about the release beyond the target asset.
#[derive(Clone, Copy)]
pub struct ReleaseContext<'a> {
    pub assets: &'a [Asset],
    pub body: Option<&'a str>,
    pub content: &'a dyn ChecksumContent,
    /// Asset names the caller declared as checksum files, whatever they are called.
    pub checksum_files: &'a [String],
}

impl<'a> ReleaseContext<'a> {
    pub fn new(assets: &'a [Asset], content: &'a dyn ChecksumContent) -> Self {
        Self {
            assets,
            body: None,
            content,
            checksum_files: &[],
        }
    }

    pub fn with_body(mut self, body: Option<&'a str>) -> Self {
        self.body = body;
        self
    }

    /// Rank these assets alongside the configured template.
    pub fn with_checksum_files(mut self, names: &'a [String]) -> Self {
        self.checksum_files = names;
        self
    }
}

/// Produce the ordered candidate sources for `asset`.
pub fn locate(
    asset: &Asset,
    release: &ReleaseContext<'_>,
    config: &VerificationConfig,
) -> Vec<ChecksumSource> {
    let mut sources = Vec::new();

    if let Some(digest) = &asset.digest {
        sources.push(ChecksumSource {
            origin: SourceOrigin::AssetDigest,
            payload: SourcePayload::Digest(digest.clone()),
            description: format!("asset digest {}", digest.algorithm),
            source_url: None,
            algorithm_hint: Some(digest.algorithm),
        });
    }

    let candidates = naming::checksum_candidates(
        asset,
        release.assets,
        config.checksum_template.as_deref(),
        release.checksum_files,
    );
    for (candidate, convention) in candidates {
        let Some(bytes) = release.content.content(candidate) else {
            tracing::debug!(
                checksum_file = %candidate.name,
                "checksum file located but its content was not fetched; skipping"
            );
            continue;
        };
        tracing::debug!(checksum_file = %candidate.name, ?convention, "located checksum file");
        sources.push(ChecksumSource {
            origin: SourceOrigin::ChecksumFile,
            payload: SourcePayload::File(bytes),
            description: format!("checksum file {}", candidate.name),
            source_url: Some(candidate.source_url()),
            algorithm_hint: HashAlgorithm::from_file_name(&candidate.name).or(config.algorithm),
        });
    }

    if sources.is_empty() {
        if let Some(body) = release.body {
            for t in extract_body_hashes(body, &asset.file_name()) {
                sources.push(ChecksumSource {
                    origin: SourceOrigin::ReleaseBody,
                    description: match t.label {
                        Some(a) => format!("release notes ({a})"),
                        None => "release notes".to_string(),
                    },
                    algorithm_hint: t.label.or(config.algorithm),
                    payload: SourcePayload::Token(t.token),
                    source_url: None,
                });
            }
        }
    }

    tracing::debug!(asset = %asset.name, count = sources.len(), "located checksum sources");
    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";

    fn release_assets() -> Vec<Asset> {
        vec![
            Asset::named("Tool.AppImage"),
            Asset::named("SHA256SUMS").with_download_url("https://example.com/SHA256SUMS"),
            Asset::named("Tool.AppImage.sha512"),
        ]
    }

    #[test]
    fn digest_comes_first() {
        let assets = release_assets();
        let content: HashMap<String, Vec<u8>> =
            [("SHA256SUMS".to_string(), b"x".to_vec())].into_iter().collect();
        let target = Asset::named("Tool.AppImage")
            .with_digest(AssetDigest::parse(&format!("sha256:{SHA}")).unwrap());
        let ctx = ReleaseContext::new(&assets, &content);
        let sources = locate(&target, &ctx, &VerificationConfig::default());
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].origin, SourceOrigin::AssetDigest);
        assert_eq!(sources[1].origin, SourceOrigin::ChecksumFile);
        assert_eq!(sources[1].algorithm_hint, Some(HashAlgorithm::Sha256));
        assert_eq!(
            sources[1].source_url.as_deref(),
            Some("https://example.com/SHA256SUMS")
        );
    }

    #[test]
    fn unfetched_checksum_files_are_skipped() {
        let assets = release_assets();
        let target = Asset::named("Tool.AppImage");
        let ctx = ReleaseContext::new(&assets, &NoContent);
        assert!(locate(&target, &ctx, &VerificationConfig::default()).is_empty());
    }

    #[test]
    fn sidecar_precedes_aggregate() {
        let assets = release_assets();
        let content: HashMap<String, Vec<u8>> = [
            ("SHA256SUMS".to_string(), b"a".to_vec()),
            ("Tool.AppImage.sha512".to_string(), b"b".to_vec()),
        ]
        .into_iter()
        .collect();
        let target = Asset::named("Tool.AppImage");
        let ctx = ReleaseContext::new(&assets, &content);
        let sources = locate(&target, &ctx, &VerificationConfig::default());
        assert_eq!(sources[0].description, "checksum file Tool.AppImage.sha512");
        assert_eq!(sources[0].algorithm_hint, Some(HashAlgorithm::Sha512));
        assert_eq!(sources[1].description, "checksum file SHA256SUMS");
    }

    #[test]
    fn body_only_when_nothing_else() {
        let body = format!("SHA256: {SHA}\n");
        let target = Asset::named("Tool.AppImage");
        let assets = vec![target.clone()];
        let ctx = ReleaseContext::new(&assets, &NoContent).with_body(Some(&body));
        let sources = locate(&target, &ctx, &VerificationConfig::default());
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].origin, SourceOrigin::ReleaseBody);
        assert_eq!(sources[0].payload, SourcePayload::Token(SHA.to_string()));

        let digest = AssetDigest::parse(&format!("sha256:{SHA}")).unwrap();
        let with_digest = target.with_digest(digest);
        let sources = locate(&with_digest, &ctx, &VerificationConfig::default());
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].origin, SourceOrigin::AssetDigest);
    }

    #[test]
    fn declared_checksum_file_is_located_whatever_its_name() {
        let target = Asset::named("Tool.AppImage");
        let assets = vec![target.clone(), Asset::named("hashes.txt")];
        let content: HashMap<String, Vec<u8>> =
            [("hashes.txt".to_string(), b"x".to_vec())].into_iter().collect();
        let ctx = ReleaseContext::new(&assets, &content);
        assert!(locate(&target, &ctx, &VerificationConfig::default()).is_empty());

        let declared = vec!["hashes.txt".to_string()];
        let ctx = ctx.with_checksum_files(&declared);
        let sources = locate(&target, &ctx, &VerificationConfig::default());
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].description, "checksum file hashes.txt");
    }

    #[test]
    fn nothing_qualifies() {
        let target = Asset::named("Tool.AppImage");
        let assets = vec![target.clone()];
        let ctx = ReleaseContext::new(&assets, &NoContent).with_body(Some("Bug fixes."));
        assert!(locate(&target, &ctx, &VerificationConfig::default()).is_empty());
    }

    #[test]
    fn template_selects_custom_name() {
        let target = Asset::named("Tool.AppImage");
        let assets = vec![target.clone(), Asset::named("digests.list")];
        let content: HashMap<String, Vec<u8>> =
            [("digests.list".to_string(), b"a".to_vec())].into_iter().collect();
        let config = VerificationConfig {
            checksum_template: Some("digests.list".into()),
            ..VerificationConfig::default()
        };
        let ctx = ReleaseContext::new(&assets, &content);
        let sources = locate(&target, &ctx, &config);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].description, "checksum file digests.list");
    }
}
