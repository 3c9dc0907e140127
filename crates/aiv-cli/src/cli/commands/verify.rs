//! `aiv verify` – verify a downloaded file and apply the mandatory policy.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use aiv_core::cache::FileChecksumCache;
use aiv_core::config::{AivConfig, VerificationConfig};
use aiv_core::hasher::{hash_bytes, CancelToken};
use aiv_core::locator::ReleaseContext;
use aiv_core::release::{Asset, AssetDigest};
use aiv_core::{HashAlgorithm, VerificationReport, Verifier};
use anyhow::{Context, Result};

use crate::cli::{Outcome, VerifyArgs};

pub async fn run_verify(cfg: &AivConfig, args: &VerifyArgs) -> Result<Outcome> {
    let vcfg = effective_config(cfg, args);

    let asset_name = match &args.asset_name {
        Some(n) => n.clone(),
        None => file_name(&args.file)?,
    };
    let mut target = Asset::named(asset_name);
    if let Some(raw) = &args.digest {
        let digest = AssetDigest::parse(raw).with_context(|| format!("parse --digest {raw:?}"))?;
        target = target.with_digest(digest);
    }

    let mut assets = vec![target.clone()];
    let mut content: HashMap<String, Vec<u8>> = HashMap::new();
    let mut declared = Vec::with_capacity(args.checksum_files.len());
    for path in &args.checksum_files {
        let (asset, bytes) = checksum_asset(path)?;
        content.insert(asset.name.clone(), bytes);
        declared.push(asset.name.clone());
        assets.push(asset);
    }

    let body = match &args.body_file {
        Some(p) => Some(
            std::fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?,
        ),
        None => None,
    };

    let mut verifier = Verifier::from_config(cfg);
    if cfg.cache_enabled && !args.no_cache {
        verifier = verifier.with_cache(Arc::new(FileChecksumCache::new(
            FileChecksumCache::default_dir()?,
        )));
    }

    // Files named on the command line are checksum files whatever they are called.
    let ctx = ReleaseContext::new(&assets, &content)
        .with_checksum_files(&declared)
        .with_body(body.as_deref());
    let report = verifier
        .verify(&target, &ctx, &args.file, &vcfg, &CancelToken::new())
        .await
        .with_context(|| format!("verify {}", args.file.display()))?;

    print_report(&report, args.json)?;

    if report.overall_passed() {
        return Ok(Outcome::Success);
    }
    if vcfg.mandatory {
        eprintln!("verification is mandatory for this file; refusing it");
        return Ok(Outcome::VerificationFailed);
    }
    eprintln!("warning: {}", report.summary());
    Ok(Outcome::Success)
}

/// Config file settings for `--app`, overridden by explicit flags.
pub(crate) fn effective_config(cfg: &AivConfig, args: &VerifyArgs) -> VerificationConfig {
    let flags = VerificationConfig {
        algorithm: args.algorithm,
        checksum_template: args.template.clone(),
        mandatory: args.mandatory,
    };
    cfg.verification_for(args.app.as_deref()).merged_with(&flags)
}

/// A local checksum file presented as a release asset.
///
/// The content hash is part of the source URL so an edited file never hits a
/// stale cache entry.
fn checksum_asset(path: &Path) -> Result<(Asset, Vec<u8>)> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let abs = std::fs::canonicalize(path)
        .with_context(|| format!("resolve {}", path.display()))?;
    let url = format!(
        "file://{}#sha256={}",
        abs.display(),
        hash_bytes(&bytes, HashAlgorithm::Sha256)
    );
    let asset = Asset::named(file_name(path)?).with_download_url(url);
    Ok((asset, bytes))
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("no file name in {}", path.display()))
}

fn print_report(report: &VerificationReport, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("serialize report")?
        );
        return Ok(());
    }

    println!("{}", report.summary());
    for a in report.attempts() {
        let status = if a.passed { "ok" } else { "FAIL" };
        let algo = a
            .algorithm
            .map(|x| x.to_string())
            .unwrap_or_else(|| "-".to_string());
        print!("  [{status:<4}] {:<8} {}", algo, a.source_description);
        match &a.failure {
            Some(f) => println!(": {f}"),
            None => println!(),
        }
    }
    if let Some(w) = report.warning() {
        println!("  warning: {w}");
    }
    Ok(())
}
