//! The verification orchestrator.
//!
//! Walks the located sources in priority order, turns each into an expected
//! hash, compares it with the local file's hash and stops at the first pass.
//! Per-source problems (unparseable payloads, unclassifiable hashes, no entry
//! for the file) are recorded as failed attempts and never abort the run;
//! only local-file I/O, cache I/O and cancellation are errors.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::algorithm::HashAlgorithm;
use crate::cache::{CacheError, CachedChecksums, ChecksumCache};
use crate::config::{AivConfig, VerificationConfig};
use crate::hasher::{CancelToken, Cancelled, HashComputer, HashError};
use crate::locator::{self, ChecksumSource, ReleaseContext, SourcePayload};
use crate::normalize;
use crate::parsers::{self, MatchKind, ParseContext, ParseError, ParsedChecksumEntry};
use crate::release::Asset;
use crate::report::{AttemptFailure, VerificationMethodResult, VerificationReport};

/// Fatal verification errors. A failed or skipped verification is a report, not an error.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("hash local file: {0}")]
    Hash(#[source] HashError),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl From<HashError> for VerifyError {
    fn from(e: HashError) -> Self {
        match e {
            HashError::Cancelled(c) => VerifyError::Cancelled(c),
            other => VerifyError::Hash(other),
        }
    }
}

impl VerifyError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, VerifyError::Cancelled(_))
    }
}

/// Expected hash for the target file, as resolved from one source.
struct Expected {
    algorithm: HashAlgorithm,
    hex: String,
    matched: Option<(String, MatchKind)>,
}

/// Actual hashes of the local file, computed at most once per algorithm per call.
struct ActualHashes<'a> {
    computer: &'a HashComputer,
    path: &'a Path,
    cancel: &'a CancelToken,
    computed: HashMap<HashAlgorithm, String>,
}

impl ActualHashes<'_> {
    async fn get(&mut self, algorithm: HashAlgorithm) -> Result<String, VerifyError> {
        if let Some(hex) = self.computed.get(&algorithm) {
            return Ok(hex.clone());
        }
        let hex = self
            .computer
            .compute(self.path, algorithm, self.cancel)
            .await?;
        tracing::debug!(path = %self.path.display(), %algorithm, "computed local file hash");
        self.computed.insert(algorithm, hex.clone());
        Ok(hex)
    }
}

/// Coordinates locating, parsing, hashing and comparison.
#[derive(Clone)]
pub struct Verifier {
    computer: HashComputer,
    cache: Option<Arc<dyn ChecksumCache>>,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(HashComputer::default())
    }
}

impl Verifier {
    pub fn new(computer: HashComputer) -> Self {
        Self {
            computer,
            cache: None,
        }
    }

    pub fn from_config(cfg: &AivConfig) -> Self {
        Self::new(HashComputer::from_config(cfg))
    }

    pub fn with_cache(mut self, cache: Arc<dyn ChecksumCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn computer(&self) -> &HashComputer {
        &self.computer
    }

    /// Verify the downloaded `local_path` against every proof the release offers for `asset`.
    pub async fn verify(
        &self,
        asset: &Asset,
        release: &ReleaseContext<'_>,
        local_path: &Path,
        config: &VerificationConfig,
        cancel: &CancelToken,
    ) -> Result<VerificationReport, VerifyError> {
        cancel.check()?;
        let sources = locator::locate(asset, release, config);
        if sources.is_empty() {
            let report = VerificationReport::from_attempts(Vec::new());
            tracing::warn!(asset = %asset.name, "no checksum source found; verification skipped");
            return Ok(report);
        }

        let target = asset.file_name();
        let mut actual = ActualHashes {
            computer: &self.computer,
            path: local_path,
            cancel,
            computed: HashMap::new(),
        };
        let mut attempts = Vec::with_capacity(sources.len());

        for source in &sources {
            cancel.check()?;
            let attempt = match self.resolve_expected(source, &target, config)? {
                Ok(expected) => {
                    let actual_hex = actual.get(expected.algorithm).await?;
                    let result = VerificationMethodResult::compared(
                        source.origin,
                        source.description.clone(),
                        expected.algorithm,
                        expected.hex,
                        actual_hex,
                    );
                    match expected.matched {
                        Some((name, kind)) => result.with_match(name, kind),
                        None => result,
                    }
                }
                Err(failure) => VerificationMethodResult::failed(
                    source.origin,
                    source.description.clone(),
                    failure,
                ),
            };

            match &attempt.failure {
                None => tracing::debug!(
                    asset = %asset.name,
                    source = %source.description,
                    "checksum matched"
                ),
                Some(AttemptFailure::Mismatch(m)) => tracing::warn!(
                    asset = %asset.name,
                    source = %source.description,
                    "{m}"
                ),
                Some(other) => tracing::debug!(
                    asset = %asset.name,
                    source = %source.description,
                    failure = %other,
                    "checksum source unusable; trying next"
                ),
            }

            let passed = attempt.passed;
            attempts.push(attempt);
            if passed {
                break;
            }
        }

        let report = VerificationReport::from_attempts(attempts);
        if report.overall_passed() {
            tracing::info!(asset = %asset.name, method = ?report.actual_method(), "verified");
        } else {
            tracing::warn!(asset = %asset.name, summary = %report.summary(), "verification failed");
        }
        Ok(report)
    }

    /// Turn one source into the expected hash for `target`.
    ///
    /// The outer `Result` carries fatal cache errors; the inner one a
    /// per-source failure to record.
    fn resolve_expected(
        &self,
        source: &ChecksumSource,
        target: &str,
        config: &VerificationConfig,
    ) -> Result<Result<Expected, AttemptFailure>, CacheError> {
        let hint = source.algorithm_hint.or(config.algorithm);
        match &source.payload {
            SourcePayload::Digest(d) => Ok(Ok(Expected {
                algorithm: d.algorithm,
                hex: d.hex.clone(),
                matched: None,
            })),
            SourcePayload::Token(token) => Ok(normalize::classify(token, hint)
                .map(|n| Expected {
                    algorithm: n.algorithm,
                    hex: n.hex,
                    matched: None,
                })
                .map_err(|e| AttemptFailure::HashFormat(e.to_string()))),
            SourcePayload::File(bytes) => {
                let entries = match self.entries_for(source, bytes, target, hint)? {
                    Ok(entries) => entries,
                    Err(e) => return Ok(Err(parse_failure(e))),
                };
                Ok(parsers::select_entry(&entries, target, hint)
                    .map(|m| Expected {
                        algorithm: m.entry.algorithm,
                        hex: m.entry.hash.clone(),
                        matched: Some((m.entry.matched_filename.clone(), m.kind)),
                    })
                    .ok_or(AttemptFailure::NoMatchingEntry))
            }
        }
    }

    /// Parsed entries for a checksum file, from the cache when possible.
    fn entries_for(
        &self,
        source: &ChecksumSource,
        bytes: &[u8],
        target: &str,
        hint: Option<HashAlgorithm>,
    ) -> Result<Result<Vec<ParsedChecksumEntry>, ParseError>, CacheError> {
        let cache = self.cache.as_deref().zip(source.source_url.as_deref());

        if let Some((cache, url)) = cache {
            if let Some(hit) = cache.get(url)? {
                match hit.to_entries() {
                    Some(entries) => {
                        tracing::debug!(url, "checksum cache hit");
                        return Ok(Ok(entries));
                    }
                    None => tracing::warn!(
                        url,
                        "cached checksums are not canonical hex; parsing the file instead"
                    ),
                }
            }
        }

        let ctx = ParseContext::new(target).with_hint(hint);
        let entries = match parsers::parse_checksum(bytes, &ctx) {
            Ok(entries) => entries,
            Err(e) => return Ok(Err(e)),
        };

        if let Some((cache, url)) = cache {
            if let Some(record) = CachedChecksums::from_entries(url, target, &entries) {
                let stored = cache.put(&record)?;
                tracing::debug!(url, stored, "checksum cache store");
            }
        }
        Ok(Ok(entries))
    }
}

fn parse_failure(e: ParseError) -> AttemptFailure {
    match e {
        ParseError::Hash(h) => AttemptFailure::HashFormat(h.to_string()),
        other => AttemptFailure::Parse(other.to_string()),
    }
}
