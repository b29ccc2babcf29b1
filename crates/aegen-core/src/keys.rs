//! Key derivation from a wallet seed
//!
//! Aegen accounts use a hash-based key scheme inherited from the first
//! node release:
//!
//! ```text
//! public_key  = SHA-256(seed || 0x01)
//! private_key = seed || public_key          (64 bytes)
//! address     = "k:" || hex(public_key)
//! ```
//!
//! This is **not** a signature scheme: nothing can be signed with
//! `private_key` and verified against `public_key`. It is kept bit-for-bit
//! because existing on-chain `k:` accounts were created with it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::memory::SecretBytes;
use crate::seed::{Seed, SEED_LEN};

/// Prefix of every Aegen account address
pub const ADDRESS_PREFIX: &str = "k:";

/// Public key length in bytes
pub const PUBLIC_KEY_LEN: usize = 32;

/// Private key length in bytes (seed followed by public key)
pub const PRIVATE_KEY_LEN: usize = SEED_LEN + PUBLIC_KEY_LEN;

/// Domain byte appended to the seed before hashing
const PUBLIC_KEY_TAG: u8 = 0x01;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum KeyError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// An account address, `"k:"` followed by 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn from_public_key(public_key: &[u8; PUBLIC_KEY_LEN]) -> Self {
        Self(format!("{}{}", ADDRESS_PREFIX, hex::encode(public_key)))
    }

    /// Parse an address, accepting upper-case hex and normalising it.
    pub fn parse(s: &str) -> Result<Self, KeyError> {
        let body = s
            .strip_prefix(ADDRESS_PREFIX)
            .ok_or_else(|| KeyError::InvalidAddress(format!("missing {:?} prefix", ADDRESS_PREFIX)))?;

        if body.len() != PUBLIC_KEY_LEN * 2 {
            return Err(KeyError::InvalidAddress(format!(
                "expected {} hex characters after the prefix, got {}",
                PUBLIC_KEY_LEN * 2,
                body.len()
            )));
        }
        if !body.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(KeyError::InvalidAddress(
                "public key part is not hex".to_string(),
            ));
        }

        Ok(Self(format!("{}{}", ADDRESS_PREFIX, body.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The hex public key without the `k:` prefix.
    pub fn public_key_hex(&self) -> &str {
        &self.0[ADDRESS_PREFIX.len()..]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = KeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// `true` if `s` is a well-formed `k:` address.
pub fn is_valid_address(s: &str) -> bool {
    Address::parse(s).is_ok()
}

/// Key material derived from a [`Seed`].
///
/// Recomputable at any time with [`KeyPair::derive`]; the private half is
/// wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    public_key: [u8; PUBLIC_KEY_LEN],
    private_key: SecretBytes<PRIVATE_KEY_LEN>,
    address: Address,
}

impl KeyPair {
    /// Derive the keypair for `seed`. Pure and deterministic.
    pub fn derive(seed: &Seed) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(seed.as_bytes());
        hasher.update([PUBLIC_KEY_TAG]);
        let public_key: [u8; PUBLIC_KEY_LEN] = hasher.finalize().into();

        let mut private_key = SecretBytes::zeroed();
        let bytes = private_key.as_mut_bytes();
        bytes[..SEED_LEN].copy_from_slice(seed.as_bytes());
        bytes[SEED_LEN..].copy_from_slice(&public_key);

        Self {
            public_key,
            private_key,
            address: Address::from_public_key(&public_key),
        }
    }

    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public_key
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key)
    }

    pub fn private_key(&self) -> &[u8; PRIVATE_KEY_LEN] {
        self.private_key.as_bytes()
    }

    /// 128 lowercase hex characters, wiped when dropped.
    pub fn private_key_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.private_key.as_bytes()))
    }

    pub fn address(&self) -> &Address {
        &self.address
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .field("private_key", &"..")
            .field("address", &self.address)
            .finish()
    }
}
