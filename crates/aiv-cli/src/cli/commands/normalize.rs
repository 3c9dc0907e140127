//! `aiv normalize` – canonicalize a hash value.

use aiv_core::normalize;
use aiv_core::HashAlgorithm;
use anyhow::{Context, Result};

pub fn run_normalize(raw: &str, hint: Option<HashAlgorithm>) -> Result<()> {
    let n = normalize::classify(raw, hint).with_context(|| format!("normalize {raw:?}"))?;
    tracing::debug!(algorithm = %n.algorithm, encoding = ?n.encoding, "classified hash");
    println!("{}", n.hex);
    Ok(())
}
