//! Aegen Core
//!
//! Recovery phrases, key derivation and password vaults for the Aegen wallet.
//!
//! # Key Derivation
//!
//! From a single 12-word BIP-39 phrase:
//! - Seed: first 32 bytes of the BIP-39 stretch (empty passphrase)
//! - Keys: `SHA-256(seed || 0x01)` public key, `k:` address
//!
//! # Encrypted Storage
//!
//! Seeds are encrypted at rest using PBKDF2-SHA256 + AES-256-CTR, with an
//! HMAC-SHA256 tag so a wrong password is detected. Persistence goes
//! through the [`VaultStore`] trait.

pub mod backup;
pub mod crypto;
pub mod keys;
pub mod memory;
pub mod password;
pub mod seed;
pub mod store;
pub mod wallet;

pub use backup::BackupChallenge;
pub use crypto::{open, seal, CryptoError, EncryptedVault};
pub use keys::*;
pub use password::{PasswordAnalysis, PasswordError, PasswordPolicy, PasswordStrength};
pub use seed::*;
pub use store::{FileVaultStore, MemoryVaultStore, StoreError, VaultStore};
pub use wallet::{Integrity, PendingWallet, UnlockedWallet, Wallet, WalletError};
