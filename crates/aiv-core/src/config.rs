use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::algorithm::HashAlgorithm;
use crate::hasher::{DEFAULT_CHUNK_SIZE, DEFAULT_LARGE_FILE_THRESHOLD};

/// Per-application verification settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Algorithm the publisher is known to use; a hint, never a forced decode.
    pub algorithm: Option<HashAlgorithm>,
    /// Checksum file name, with optional `{filename}` / `{stem}` placeholders.
    pub checksum_template: Option<String>,
    /// Caller policy: refuse the download when verification does not pass.
    pub mandatory: bool,
}

impl VerificationConfig {
    /// Overlay `other`'s explicit values onto `self`.
    pub fn merged_with(&self, other: &VerificationConfig) -> VerificationConfig {
        VerificationConfig {
            algorithm: other.algorithm.or(self.algorithm),
            checksum_template: other
                .checksum_template
                .clone()
                .or_else(|| self.checksum_template.clone()),
            mandatory: self.mandatory || other.mandatory,
        }
    }
}

/// Global configuration loaded from `~/.config/aiv/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AivConfig {
    /// Files at or above this size are hashed on a worker thread.
    pub large_file_threshold_bytes: u64,
    /// Read size used while hashing.
    pub chunk_size_bytes: usize,
    /// Cache parsed checksum files under the XDG cache dir.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    /// Settings applied to every application.
    #[serde(default)]
    pub defaults: VerificationConfig,
    /// Per-application overrides, keyed by application name.
    #[serde(default)]
    pub apps: BTreeMap<String, VerificationConfig>,
}

fn default_true() -> bool {
    true
}

impl Default for AivConfig {
    fn default() -> Self {
        Self {
            large_file_threshold_bytes: DEFAULT_LARGE_FILE_THRESHOLD,
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            cache_enabled: true,
            defaults: VerificationConfig::default(),
            apps: BTreeMap::new(),
        }
    }
}

impl AivConfig {
    /// Effective settings for `app`: `[defaults]` overlaid with `[apps.<app>]`.
    pub fn verification_for(&self, app: Option<&str>) -> VerificationConfig {
        match app.and_then(|name| self.apps.get(name)) {
            Some(overrides) => self.defaults.merged_with(overrides),
            None => self.defaults.clone(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("aiv")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<AivConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<AivConfig> {
    if !path.exists() {
        let default_cfg = AivConfig::default();
        let toml = toml::to_string_pretty(&default_cfg).context("serialize default config")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        fs::write(path, toml).with_context(|| format!("write config: {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data =
        fs::read_to_string(path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg: AivConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = AivConfig::default();
        assert_eq!(cfg.large_file_threshold_bytes, 100 * 1024 * 1024);
        assert_eq!(cfg.chunk_size_bytes, 1024 * 1024);
        assert!(cfg.cache_enabled);
        assert!(cfg.apps.is_empty());
        assert!(!cfg.defaults.mandatory);
    }

    #[test]
    fn config_toml_roundtrip() {
        let mut cfg = AivConfig::default();
        cfg.apps.insert(
            "tool".into(),
            VerificationConfig {
                algorithm: Some(HashAlgorithm::Sha512),
                checksum_template: Some("{filename}.sha512".into()),
                mandatory: true,
            },
        );
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: AivConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.large_file_threshold_bytes, cfg.large_file_threshold_bytes);
        assert_eq!(parsed.apps, cfg.apps);
    }

    #[test]
    fn config_toml_apps_and_overrides() {
        let toml = r#"
            large_file_threshold_bytes = 1048576
            chunk_size_bytes = 65536

            [defaults]
            algorithm = "sha256"

            [apps.tool]
            checksum_template = "{stem}-SHA256SUMS"
            mandatory = true
        "#;
        let cfg: AivConfig = toml::from_str(toml).unwrap();
        assert!(cfg.cache_enabled);
        assert_eq!(cfg.chunk_size_bytes, 65536);

        let tool = cfg.verification_for(Some("tool"));
        assert_eq!(tool.algorithm, Some(HashAlgorithm::Sha256));
        assert_eq!(tool.checksum_template.as_deref(), Some("{stem}-SHA256SUMS"));
        assert!(tool.mandatory);

        let other = cfg.verification_for(Some("other"));
        assert_eq!(other, cfg.defaults);
        assert_eq!(cfg.verification_for(None), cfg.defaults);
    }

    #[test]
    fn load_or_init_writes_defaults_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let first = load_or_init_at(&path).unwrap();
        assert!(path.exists());
        fs::write(&path, "large_file_threshold_bytes = 5\nchunk_size_bytes = 1\n").unwrap();
        let second = load_or_init_at(&path).unwrap();
        assert_eq!(first.large_file_threshold_bytes, DEFAULT_LARGE_FILE_THRESHOLD);
        assert_eq!(second.large_file_threshold_bytes, 5);
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let toml = "large_file_threshold_bytes = 1\nchunk_size_bytes = 1\n[defaults]\nalgorithm = \"crc32\"\n";
        assert!(toml::from_str::<AivConfig>(toml).is_err());
    }
}
