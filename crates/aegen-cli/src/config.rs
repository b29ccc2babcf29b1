//! Wallet configuration, parsed from TOML file + environment variable overrides.
//!
//! Priority: environment variables > config file > defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use aegen_core::password::MIN_PASSWORD_LEN;
use aegen_core::seed::MNEMONIC_WORDS;

/// Directory under `$HOME` holding the vault and config
const AEGEN_DIR: &str = ".aegen";

/// Top-level wallet configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Vault location and logging
    #[serde(default)]
    pub wallet: WalletSection,

    /// Password and backup rules
    #[serde(default)]
    pub security: SecuritySection,
}

/// Vault location and logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSection {
    /// Where the sealed vault is kept
    #[serde(default = "default_vault_path")]
    pub vault_path: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for WalletSection {
    fn default() -> Self {
        Self {
            vault_path: default_vault_path(),
            log_level: default_log_level(),
        }
    }
}

/// Password and backup rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuritySection {
    /// Minimum vault password length in characters
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,

    /// Phrase words asked back before a new wallet is sealed
    #[serde(default = "default_backup_check_words")]
    pub backup_check_words: usize,
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self {
            min_password_length: default_min_password_length(),
            backup_check_words: default_backup_check_words(),
        }
    }
}

// ============================================================================
// Default value functions
// ============================================================================

fn aegen_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(AEGEN_DIR))
        .unwrap_or_else(|| PathBuf::from(AEGEN_DIR))
}

fn default_vault_path() -> PathBuf {
    aegen_dir().join("vault.json")
}

/// `~/.aegen/config.toml`, read when `--config` is not given.
pub fn default_config_path() -> PathBuf {
    aegen_dir().join("config.toml")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_min_password_length() -> usize {
    MIN_PASSWORD_LEN
}

fn default_backup_check_words() -> usize {
    aegen_core::backup::DEFAULT_CHALLENGE_WORDS
}

// ============================================================================
// Loading & environment override
// ============================================================================

impl WalletConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: WalletConfig =
            toml::from_str(&contents).with_context(|| "Failed to parse TOML config")?;
        Ok(config)
    }

    /// Load an explicit config file, or the default one if it exists, or
    /// fall back to built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `AEGEN_VAULT_PATH`
    /// - `AEGEN_LOG_LEVEL`
    /// - `AEGEN_MIN_PASSWORD_LENGTH`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("AEGEN_VAULT_PATH") {
            self.wallet.vault_path = PathBuf::from(v);
        }
        if let Some(v) = var("AEGEN_LOG_LEVEL") {
            self.wallet.log_level = v;
        }
        if let Some(v) = var("AEGEN_MIN_PASSWORD_LENGTH") {
            if let Ok(len) = v.parse::<usize>() {
                self.security.min_password_length = len;
            }
        }
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.wallet.vault_path.as_os_str().is_empty(),
            "wallet.vault_path must not be empty"
        );

        anyhow::ensure!(
            self.security.min_password_length >= MIN_PASSWORD_LEN,
            "security.min_password_length must be >= {}",
            MIN_PASSWORD_LEN
        );

        anyhow::ensure!(
            (1..=MNEMONIC_WORDS).contains(&self.security.backup_check_words),
            "security.backup_check_words must be between 1 and {}",
            MNEMONIC_WORDS
        );

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
