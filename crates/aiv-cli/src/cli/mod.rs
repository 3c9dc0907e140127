//! CLI for the AIV verification engine.

mod commands;

use aiv_core::config;
use aiv_core::HashAlgorithm;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_hash, run_normalize, run_verify};

/// Top-level CLI for the AIV verification engine.
#[derive(Debug, Parser)]
#[command(name = "aiv")]
#[command(about = "AIV: verify downloaded AppImages against their checksums", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Verify a downloaded file against a digest, checksum files or release notes.
    Verify(VerifyArgs),

    /// Print the canonical lowercase hex form of a hex or base64 hash.
    Normalize {
        /// Hash value, optionally prefixed with an algorithm label (`sha512-...`).
        hash: String,
        /// Algorithm hint used only to break length ties.
        #[arg(long, value_name = "ALGO")]
        algorithm: Option<HashAlgorithm>,
    },

    /// Hash a file and print it in sums-file format.
    Hash {
        /// Path to the file.
        file: PathBuf,
        #[arg(long, value_name = "ALGO", default_value = "sha256")]
        algorithm: HashAlgorithm,
    },
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// The downloaded file.
    pub file: PathBuf,
    /// Name of the release asset (defaults to the file's name).
    #[arg(long, value_name = "NAME")]
    pub asset_name: Option<String>,
    /// Platform digest of the asset, e.g. `sha256:<hex>`.
    #[arg(long, value_name = "ALGO:HEX")]
    pub digest: Option<String>,
    /// A checksum file published with the release (repeatable).
    #[arg(long = "checksum-file", value_name = "PATH")]
    pub checksum_files: Vec<PathBuf>,
    /// Release notes to search for hashes when nothing else is available.
    #[arg(long, value_name = "PATH")]
    pub body_file: Option<PathBuf>,
    /// Algorithm the publisher uses.
    #[arg(long, value_name = "ALGO")]
    pub algorithm: Option<HashAlgorithm>,
    /// Checksum file name template; `{filename}` and `{stem}` are expanded.
    #[arg(long, value_name = "TEMPLATE")]
    pub template: Option<String>,
    /// Exit non-zero unless verification passes.
    #[arg(long)]
    pub mandatory: bool,
    /// Apply `[apps.<NAME>]` settings from config.toml.
    #[arg(long, value_name = "NAME")]
    pub app: Option<String>,
    /// Print the full report as JSON.
    #[arg(long)]
    pub json: bool,
    /// Do not read or write the checksum cache.
    #[arg(long)]
    pub no_cache: bool,
}

/// What the process should report through its exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    VerificationFailed,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<Outcome> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Verify(args) => run_verify(&cfg, &args).await,
            CliCommand::Normalize { hash, algorithm } => {
                run_normalize(&hash, algorithm)?;
                Ok(Outcome::Success)
            }
            CliCommand::Hash { file, algorithm } => {
                run_hash(&cfg, &file, algorithm).await?;
                Ok(Outcome::Success)
            }
        }
    }
}

#[cfg(test)]
mod tests;
