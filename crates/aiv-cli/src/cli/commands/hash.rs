//! `aiv hash` – hash a file in sums-file format.

use aiv_core::config::AivConfig;
use aiv_core::hasher::{CancelToken, HashComputer};
use aiv_core::HashAlgorithm;
use anyhow::Result;
use std::path::Path;

/// Compute and print `<hex>  <file>`.
pub async fn run_hash(cfg: &AivConfig, path: &Path, algorithm: HashAlgorithm) -> Result<()> {
    let digest = HashComputer::from_config(cfg)
        .compute(path, algorithm, &CancelToken::new())
        .await?;
    println!("{}  {}", digest, path.display());
    Ok(())
}
