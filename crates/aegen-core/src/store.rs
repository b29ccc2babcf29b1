//! Vault persistence
//!
//! The wallet never touches ambient storage. Whatever holds the sealed
//! vault (a file, a browser key-value store, a test double) implements
//! [`VaultStore`] and is handed to [`crate::wallet::Wallet`].

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use crate::crypto::{CryptoError, EncryptedVault};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Stored vault is unreadable: {0}")]
    Corrupt(#[from] CryptoError),
}

/// Holds at most one sealed vault.
pub trait VaultStore {
    fn get(&self) -> Result<Option<EncryptedVault>, StoreError>;

    /// Replace any existing vault.
    fn put(&self, vault: &EncryptedVault) -> Result<(), StoreError>;

    /// Remove the vault. Clearing an empty store is not an error.
    fn clear(&self) -> Result<(), StoreError>;
}

/// In-process store, mostly for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryVaultStore {
    slot: Mutex<Option<EncryptedVault>>,
}

impl MemoryVaultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vault(vault: EncryptedVault) -> Self {
        Self {
            slot: Mutex::new(Some(vault)),
        }
    }
}

impl VaultStore for MemoryVaultStore {
    fn get(&self) -> Result<Option<EncryptedVault>, StoreError> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        Ok(slot.clone())
    }

    fn put(&self, vault: &EncryptedVault) -> Result<(), StoreError> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(vault.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
        Ok(())
    }
}

/// A vault kept as a JSON file.
///
/// Writes go to a sibling temp file that is then renamed over the target, so
/// a crash never leaves a half-written vault. On Unix the file is created
/// with mode `0600`.
#[derive(Debug, Clone)]
pub struct FileVaultStore {
    path: PathBuf,
}

impl FileVaultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "vault".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl VaultStore for FileVaultStore {
    fn get(&self) -> Result<Option<EncryptedVault>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(EncryptedVault::from_json(&contents)?))
    }

    fn put(&self, vault: &EncryptedVault) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.temp_path();
        {
            let mut file = open_private(&tmp)?;
            file.write_all(vault.to_json_pretty().as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        log::info!("vault written to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("vault removed from {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
