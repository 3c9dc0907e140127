//! The verdict returned by a verification run.

use std::fmt;

use serde::Serialize;

use crate::algorithm::HashAlgorithm;
use crate::locator::SourceOrigin;
use crate::parsers::MatchKind;

/// How the file was (or was not) verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    Digest,
    ChecksumFile,
    Skip,
}

impl VerificationMethod {
    pub fn for_origin(origin: SourceOrigin) -> Self {
        match origin {
            SourceOrigin::AssetDigest => VerificationMethod::Digest,
            SourceOrigin::ChecksumFile | SourceOrigin::ReleaseBody => {
                VerificationMethod::ChecksumFile
            }
        }
    }
}

impl fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationMethod::Digest => write!(f, "digest"),
            VerificationMethod::ChecksumFile => write!(f, "checksum file"),
            VerificationMethod::Skip => write!(f, "skip"),
        }
    }
}

/// Expected and computed hashes that disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashMismatch {
    pub algorithm: HashAlgorithm,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for HashMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} mismatch: expected {}, got {}",
            self.algorithm, self.expected, self.actual
        )
    }
}

impl std::error::Error for HashMismatch {}

/// Why an attempt did not pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum AttemptFailure {
    Mismatch(HashMismatch),
    /// The checksum payload could not be parsed.
    Parse(String),
    /// A hash value could not be classified.
    HashFormat(String),
    /// The payload parsed but listed nothing for the asset.
    NoMatchingEntry,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Mismatch(m) => write!(f, "{m}"),
            AttemptFailure::Parse(e) => write!(f, "parse error: {e}"),
            AttemptFailure::HashFormat(e) => write!(f, "bad hash: {e}"),
            AttemptFailure::NoMatchingEntry => write!(f, "no entry for this file"),
        }
    }
}

/// One attempted proof, kept whether or not it passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationMethodResult {
    pub method: VerificationMethod,
    pub origin: SourceOrigin,
    pub algorithm: Option<HashAlgorithm>,
    pub expected_hash: Option<String>,
    pub actual_hash: Option<String>,
    pub passed: bool,
    pub source_description: String,
    /// Entry name the expected hash was listed under, for checksum files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_kind: Option<MatchKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<AttemptFailure>,
}

impl VerificationMethodResult {
    /// An attempt that got as far as comparing hashes.
    pub fn compared(
        origin: SourceOrigin,
        source_description: impl Into<String>,
        algorithm: HashAlgorithm,
        expected: String,
        actual: String,
    ) -> Self {
        let passed = expected == actual;
        let failure = (!passed).then(|| {
            AttemptFailure::Mismatch(HashMismatch {
                algorithm,
                expected: expected.clone(),
                actual: actual.clone(),
            })
        });
        Self {
            method: VerificationMethod::for_origin(origin),
            origin,
            algorithm: Some(algorithm),
            expected_hash: Some(expected),
            actual_hash: Some(actual),
            passed,
            source_description: source_description.into(),
            matched_filename: None,
            match_kind: None,
            failure,
        }
    }

    /// An attempt that failed before any comparison.
    pub fn failed(
        origin: SourceOrigin,
        source_description: impl Into<String>,
        failure: AttemptFailure,
    ) -> Self {
        Self {
            method: VerificationMethod::for_origin(origin),
            origin,
            algorithm: None,
            expected_hash: None,
            actual_hash: None,
            passed: false,
            source_description: source_description.into(),
            matched_filename: None,
            match_kind: None,
            failure: Some(failure),
        }
    }

    pub fn with_match(mut self, filename: impl Into<String>, kind: MatchKind) -> Self {
        self.matched_filename = Some(filename.into());
        self.match_kind = Some(kind);
        self
    }

    /// Whether hashes were actually compared.
    pub fn reached_comparison(&self) -> bool {
        self.expected_hash.is_some() && self.actual_hash.is_some()
    }
}

/// Final verdict; built only through [`VerificationReport::from_attempts`].
///
/// `overall_passed` is true exactly when some attempt passed. An empty
/// attempt list always means `Skip` with a warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    overall_passed: bool,
    actual_method: VerificationMethod,
    warning: Option<String>,
    attempts: Vec<VerificationMethodResult>,
}

pub(crate) const NO_SOURCE_WARNING: &str = "no checksum source available; file was not verified";
pub(crate) const NO_COMPARISON_WARNING: &str =
    "checksum sources were found but none could be parsed or matched to this file";

impl VerificationReport {
    pub fn from_attempts(attempts: Vec<VerificationMethodResult>) -> Self {
        if attempts.is_empty() {
            return Self {
                overall_passed: false,
                actual_method: VerificationMethod::Skip,
                warning: Some(NO_SOURCE_WARNING.to_string()),
                attempts,
            };
        }

        let passing = attempts.iter().find(|a| a.passed);
        let overall_passed = passing.is_some();
        let actual_method = passing.unwrap_or(&attempts[0]).method;
        let warning = (!overall_passed && !attempts.iter().any(|a| a.reached_comparison()))
            .then(|| NO_COMPARISON_WARNING.to_string());

        Self {
            overall_passed,
            actual_method,
            warning,
            attempts,
        }
    }

    pub fn overall_passed(&self) -> bool {
        self.overall_passed
    }

    pub fn actual_method(&self) -> VerificationMethod {
        self.actual_method
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn attempts(&self) -> &[VerificationMethodResult] {
        &self.attempts
    }

    pub fn is_skip(&self) -> bool {
        self.actual_method == VerificationMethod::Skip
    }

    /// The attempt that passed, if any.
    pub fn passing_attempt(&self) -> Option<&VerificationMethodResult> {
        self.attempts.iter().find(|a| a.passed)
    }

    /// One line for logs and terminals.
    pub fn summary(&self) -> String {
        if let Some(a) = self.passing_attempt() {
            return match a.algorithm {
                Some(algo) => format!(
                    "verified via {} ({algo}, {})",
                    a.method, a.source_description
                ),
                None => format!("verified via {} ({})", a.method, a.source_description),
            };
        }
        if self.is_skip() {
            return format!("not verified: {}", self.warning.as_deref().unwrap_or("no source"));
        }
        let reason = self
            .attempts
            .iter()
            .find_map(|a| a.failure.as_ref())
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown failure".to_string());
        format!(
            "verification FAILED after {} attempt(s): {reason}",
            self.attempts.len()
        )
    }
}
