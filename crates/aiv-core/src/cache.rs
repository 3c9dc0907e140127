//! Cache of parsed checksum files, keyed by the URL they were fetched from.
//!
//! Entries are write-once: the first `put` for a URL wins and later ones
//! return `false`. Readers never observe a partially written entry.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::algorithm::HashAlgorithm;
use crate::hasher::hash_bytes;
use crate::normalize;
use crate::parsers::ParsedChecksumEntry;

/// Persisted form of one parsed checksum file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedChecksums {
    pub source_url: String,
    /// Asset the checksum file was fetched for.
    pub filename: String,
    /// Algorithm of the entry for `filename`, or of the first entry.
    pub algorithm: HashAlgorithm,
    /// Listed filename to canonical hex.
    pub hashes: BTreeMap<String, String>,
}

impl CachedChecksums {
    /// Build from parsed entries. Where a file is listed under several
    /// algorithms only the strongest is kept.
    pub fn from_entries(
        source_url: &str,
        filename: &str,
        entries: &[ParsedChecksumEntry],
    ) -> Option<Self> {
        let first = entries.first()?;
        let mut strongest: BTreeMap<&str, &ParsedChecksumEntry> = BTreeMap::new();
        for e in entries {
            let slot = strongest.entry(e.matched_filename.as_str()).or_insert(e);
            if e.algorithm.byte_len() > slot.algorithm.byte_len() {
                *slot = e;
            }
        }
        let algorithm = strongest
            .get(filename)
            .map(|e| e.algorithm)
            .unwrap_or(first.algorithm);
        Some(Self {
            source_url: source_url.to_string(),
            filename: filename.to_string(),
            algorithm,
            hashes: strongest
                .into_iter()
                .map(|(name, e)| (name.to_string(), e.hash.clone()))
                .collect(),
        })
    }

    /// Entries back out of the cache; the algorithm follows from each hash's length.
    ///
    /// `None` if any stored hash is not canonical hex, as in a hand-edited or
    /// foreign entry.
    pub fn to_entries(&self) -> Option<Vec<ParsedChecksumEntry>> {
        self.hashes
            .iter()
            .map(|(name, hash)| {
                let algorithm = HashAlgorithm::from_hex_len(hash.len())
                    .filter(|_| normalize::is_canonical_hex(hash))?;
                Some(ParsedChecksumEntry {
                    matched_filename: name.clone(),
                    algorithm,
                    hash: hash.clone(),
                })
            })
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("checksum cache I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt checksum cache entry {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("checksum cache lock poisoned")]
    Poisoned,
}

/// Storage for [`CachedChecksums`], shareable across concurrent verifications.
pub trait ChecksumCache: Send + Sync {
    fn get(&self, source_url: &str) -> Result<Option<CachedChecksums>, CacheError>;

    /// Store `entry` unless its URL is already cached. Returns whether it was stored.
    fn put(&self, entry: &CachedChecksums) -> Result<bool, CacheError>;
}

/// In-process cache.
#[derive(Debug, Default)]
pub struct MemoryChecksumCache {
    entries: RwLock<HashMap<String, CachedChecksums>>,
}

impl MemoryChecksumCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChecksumCache for MemoryChecksumCache {
    fn get(&self, source_url: &str) -> Result<Option<CachedChecksums>, CacheError> {
        let map = self.entries.read().map_err(|_| CacheError::Poisoned)?;
        Ok(map.get(source_url).cloned())
    }

    fn put(&self, entry: &CachedChecksums) -> Result<bool, CacheError> {
        let mut map = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        if map.contains_key(&entry.source_url) {
            return Ok(false);
        }
        map.insert(entry.source_url.clone(), entry.clone());
        Ok(true)
    }
}

/// One JSON file per source URL under a directory.
#[derive(Debug, Clone)]
pub struct FileChecksumCache {
    dir: PathBuf,
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

impl FileChecksumCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default location: `~/.cache/aiv/checksums/`.
    pub fn default_dir() -> anyhow::Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("aiv").context("resolve XDG dirs")?;
        Ok(xdg_dirs.get_cache_home().join("aiv").join("checksums"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the entry for `source_url`; named by the URL's SHA-256.
    pub fn entry_path(&self, source_url: &str) -> PathBuf {
        let key = hash_bytes(source_url.as_bytes(), HashAlgorithm::Sha256);
        self.dir.join(format!("{key}.json"))
    }

    fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError + '_ {
        move |source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl ChecksumCache for FileChecksumCache {
    fn get(&self, source_url: &str) -> Result<Option<CachedChecksums>, CacheError> {
        let path = self.entry_path(source_url);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_err(&path)(e)),
        };
        let entry: CachedChecksums =
            serde_json::from_slice(&bytes).map_err(|source| CacheError::Corrupt {
                path: path.clone(),
                source,
            })?;
        if entry.source_url != source_url {
            tracing::warn!(path = %path.display(), "checksum cache key collision; ignoring entry");
            return Ok(None);
        }
        Ok(Some(entry))
    }

    fn put(&self, entry: &CachedChecksums) -> Result<bool, CacheError> {
        let path = self.entry_path(&entry.source_url);
        if path.exists() {
            return Ok(false);
        }
        std::fs::create_dir_all(&self.dir).map_err(Self::io_err(&self.dir))?;

        let json = serde_json::to_vec_pretty(entry).map_err(|source| CacheError::Corrupt {
            path: path.clone(),
            source,
        })?;
        let tmp = self.dir.join(format!(
            ".{}.{}.{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed),
            path.file_stem().and_then(|s| s.to_str()).unwrap_or("entry"),
        ));
        {
            let mut f = std::fs::File::create(&tmp).map_err(Self::io_err(&tmp))?;
            f.write_all(&json).map_err(Self::io_err(&tmp))?;
            f.sync_all().map_err(Self::io_err(&tmp))?;
        }

        // A hard link publishes the complete file atomically and fails if the key exists.
        let published = match std::fs::hard_link(&tmp, &path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(Self::io_err(&path)(e)),
        };
        let _ = std::fs::remove_file(&tmp);
        published
    }
}
