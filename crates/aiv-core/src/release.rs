//! Release and asset records as supplied by the release-fetching collaborator.
//!
//! Field names follow the release host's JSON so records can be deserialized
//! straight from an API response.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::algorithm::HashAlgorithm;
use crate::normalize::{self, HashFormatError};

/// Digest attached to an asset by the hosting platform (`sha256:<hex>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetDigest {
    pub algorithm: HashAlgorithm,
    /// Canonical lowercase hex.
    pub hex: String,
}

impl AssetDigest {
    /// Parse the platform's `algorithm:hex` form.
    ///
    /// The platform promises hex, but the value still goes through the
    /// normalizer so casing or stray whitespace cannot leak into comparisons.
    pub fn parse(value: &str) -> Result<Self, HashFormatError> {
        let (label, rest) = value
            .split_once(':')
            .ok_or_else(|| HashFormatError::InvalidCharacters(value.to_string()))?;
        let algorithm = HashAlgorithm::from_label(label)
            .ok_or_else(|| HashFormatError::InvalidCharacters(value.to_string()))?;
        let hex = normalize::normalize(rest, Some(algorithm))?;
        if hex.len() != algorithm.hex_len() {
            return Err(HashFormatError::UnexpectedDigestSize {
                value: value.to_string(),
                decoded: hex.len() / 2,
            });
        }
        Ok(Self { algorithm, hex })
    }

    /// `algorithm:hex`, the form the platform uses.
    pub fn to_platform_string(&self) -> String {
        format!("{}:{}", self.algorithm, self.hex)
    }
}

/// One downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    /// Platform digest; absent on older releases. Unparseable values are dropped.
    #[serde(
        default,
        serialize_with = "serialize_digest",
        deserialize_with = "deserialize_digest"
    )]
    pub digest: Option<AssetDigest>,
    #[serde(rename = "browser_download_url", default)]
    pub download_url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub content_type: String,
}

impl Asset {
    /// Minimal asset with only a name; used by collaborators that know nothing else.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            digest: None,
            download_url: String::new(),
            size: 0,
            content_type: String::new(),
        }
    }

    pub fn with_digest(mut self, digest: AssetDigest) -> Self {
        self.digest = Some(digest);
        self
    }

    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = url.into();
        self
    }

    /// Name to match checksum entries against: the asset name, or the last
    /// path segment of the download URL when the name is empty.
    pub fn file_name(&self) -> String {
        if !self.name.trim().is_empty() {
            return self.name.clone();
        }
        filename_from_url_path(&self.download_url).unwrap_or_default()
    }

    /// Identifier used as the cache key for content fetched from this asset.
    pub fn source_url(&self) -> String {
        if self.download_url.is_empty() {
            self.name.clone()
        } else {
            self.download_url.clone()
        }
    }
}

/// A release: free-text notes plus its assets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Release {
    pub fn asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

fn serialize_digest<S>(digest: &Option<AssetDigest>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    digest
        .as_ref()
        .map(AssetDigest::to_platform_string)
        .serialize(serializer)
}

fn deserialize_digest<'de, D>(deserializer: D) -> Result<Option<AssetDigest>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| match AssetDigest::parse(&s) {
        Ok(d) => Some(d),
        Err(e) => {
            tracing::debug!(digest = %s, error = %e, "ignoring unparseable asset digest");
            None
        }
    }))
}

/// Extracts the last path segment from a URL.
///
/// Returns `None` if the URL cannot be parsed or the path is empty/root.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path().split('/').filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}
