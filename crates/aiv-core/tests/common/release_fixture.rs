//! A downloaded file on disk plus the release metadata a fetcher would hand over.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use aiv_core::config::VerificationConfig;
use aiv_core::hasher::CancelToken;
use aiv_core::locator::ReleaseContext;
use aiv_core::release::Asset;
use aiv_core::{Verifier, VerificationReport};
use tempfile::TempDir;

pub struct ReleaseFixture {
    _dir: TempDir,
    pub local_path: PathBuf,
    pub target: Asset,
    pub assets: Vec<Asset>,
    pub content: HashMap<String, Vec<u8>>,
    pub body: Option<String>,
}

impl ReleaseFixture {
    /// Writes `bytes` as the downloaded copy of `target`.
    pub fn new(target: Asset, bytes: &[u8]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let local_path = dir.path().join(&target.name);
        std::fs::write(&local_path, bytes).unwrap();
        Self {
            _dir: dir,
            local_path,
            assets: vec![target.clone()],
            target,
            content: HashMap::new(),
            body: None,
        }
    }

    /// Publishes a sibling checksum file with the given content.
    pub fn with_checksum_file(mut self, name: &str, content: impl Into<Vec<u8>>) -> Self {
        self.assets.push(
            Asset::named(name).with_download_url(format!("https://example.com/releases/{name}")),
        );
        self.content.insert(name.to_string(), content.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.local_path
    }

    pub async fn verify(&self, verifier: &Verifier) -> VerificationReport {
        let ctx = ReleaseContext::new(&self.assets, &self.content).with_body(self.body.as_deref());
        verifier
            .verify(
                &self.target,
                &ctx,
                &self.local_path,
                &VerificationConfig::default(),
                &CancelToken::new(),
            )
            .await
            .expect("verification should not hit a fatal error")
    }
}
