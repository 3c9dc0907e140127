//! Computing the digest of a downloaded file.
//!
//! Files are streamed in fixed-size chunks so memory use is bounded whatever
//! the file size. Files at or above the large-file threshold are hashed on an
//! [`Offload`] worker so the awaiting task never blocks; smaller files are
//! hashed inline. The cancellation token is checked before every chunk.

mod cancel;
mod offload;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::algorithm::HashAlgorithm;
use crate::config::AivConfig;

use cancel::CancelOnDrop;
pub use cancel::{CancelToken, Cancelled};
pub use offload::{Job, Offload, ThreadOffload, TokioBlocking};

/// Files this large or larger are hashed off the calling task (100 MiB).
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 100 * 1024 * 1024;
/// Read size per chunk (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error("hash worker exited without a result")]
    WorkerLost,
}

/// Incremental hasher over any supported algorithm.
enum StreamHasher {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl StreamHasher {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Md5 => StreamHasher::Md5(Md5::new()),
            HashAlgorithm::Sha1 => StreamHasher::Sha1(Sha1::new()),
            HashAlgorithm::Sha256 => StreamHasher::Sha256(Sha256::new()),
            HashAlgorithm::Sha384 => StreamHasher::Sha384(Sha384::new()),
            HashAlgorithm::Sha512 => StreamHasher::Sha512(Sha512::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            StreamHasher::Md5(h) => h.update(data),
            StreamHasher::Sha1(h) => h.update(data),
            StreamHasher::Sha256(h) => h.update(data),
            StreamHasher::Sha384(h) => h.update(data),
            StreamHasher::Sha512(h) => h.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            StreamHasher::Md5(h) => hex::encode(h.finalize()),
            StreamHasher::Sha1(h) => hex::encode(h.finalize()),
            StreamHasher::Sha256(h) => hex::encode(h.finalize()),
            StreamHasher::Sha384(h) => hex::encode(h.finalize()),
            StreamHasher::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

/// Canonical hex digest of in-memory bytes.
pub fn hash_bytes(bytes: &[u8], algorithm: HashAlgorithm) -> String {
    let mut h = StreamHasher::new(algorithm);
    h.update(bytes);
    h.finalize_hex()
}

/// Stream `path` through `algorithm` on the current thread.
pub fn compute_blocking(
    path: &Path,
    algorithm: HashAlgorithm,
    chunk_size: usize,
    cancel: &CancelToken,
) -> Result<String, HashError> {
    let io_err = |source| HashError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut f = File::open(path).map_err(io_err)?;
    let mut hasher = StreamHasher::new(algorithm);
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        cancel.check()?;
        let n = f.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize_hex())
}

/// Hashes local files, offloading large ones.
#[derive(Clone)]
pub struct HashComputer {
    offload: Arc<dyn Offload>,
    large_file_threshold: u64,
    chunk_size: usize,
}

impl Default for HashComputer {
    fn default() -> Self {
        Self::new(Arc::new(TokioBlocking))
    }
}

impl HashComputer {
    pub fn new(offload: Arc<dyn Offload>) -> Self {
        Self {
            offload,
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Threshold and chunk size from the global config, offloading to tokio's blocking pool.
    pub fn from_config(cfg: &AivConfig) -> Self {
        Self::new(Arc::new(TokioBlocking))
            .with_threshold(cfg.large_file_threshold_bytes)
            .with_chunk_size(cfg.chunk_size_bytes)
    }

    pub fn with_threshold(mut self, bytes: u64) -> Self {
        self.large_file_threshold = bytes;
        self
    }

    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    pub fn large_file_threshold(&self) -> u64 {
        self.large_file_threshold
    }

    /// Canonical hex digest of the file at `path`.
    ///
    /// Dropping the returned future cancels an offloaded computation; the
    /// worker stops at its next chunk boundary.
    pub async fn compute(
        &self,
        path: &Path,
        algorithm: HashAlgorithm,
        cancel: &CancelToken,
    ) -> Result<String, HashError> {
        cancel.check()?;
        let len = std::fs::metadata(path)
            .map_err(|source| HashError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        if len < self.large_file_threshold {
            return compute_blocking(path, algorithm, self.chunk_size, cancel);
        }

        tracing::debug!(
            path = %path.display(),
            bytes = len,
            %algorithm,
            "offloading large file hash"
        );
        self.compute_offloaded(path, algorithm, cancel.child()).await
    }

    /// Hash on the offload worker. `worker_token` is cancelled if this future
    /// is dropped before the worker reports back.
    async fn compute_offloaded(
        &self,
        path: &Path,
        algorithm: HashAlgorithm,
        worker_token: CancelToken,
    ) -> Result<String, HashError> {
        let guard = CancelOnDrop::new(worker_token.clone());
        let rx = offload::run(self.offload.as_ref(), {
            let path = path.to_path_buf();
            let chunk_size = self.chunk_size;
            move || compute_blocking(&path, algorithm, chunk_size, &worker_token)
        });
        let result = rx.await.map_err(|_| HashError::WorkerLost)?;
        guard.disarm();
        result
    }
}
