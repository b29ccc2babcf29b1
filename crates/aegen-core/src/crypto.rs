//! Password vault for the wallet seed
//!
//! PBKDF2-HMAC-SHA256 (100 000 rounds) + AES-256-CTR, with an
//! HMAC-SHA256 integrity tag.
//!
//! # Record format
//!
//! ```json
//! { "ciphertext": "<64 hex>", "salt": "<32 hex>", "iv": "<32 hex>", "mac": "<64 hex>" }
//! ```
//!
//! CTR mode adds no padding, so the ciphertext is exactly as long as the
//! 32-byte seed. The encryption key is the raw PBKDF2 output; the MAC key is
//! derived from it with a fixed label so the two never coincide.
//!
//! # Legacy records
//!
//! Vaults written by the first web wallet have no `mac`. They still open,
//! but a wrong password cannot be detected here: CTR decryption always
//! "succeeds" and yields unrelated bytes. Callers must compare the derived
//! address against a known one (see [`crate::wallet`]) and should re-seal the
//! seed once it has been confirmed.

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::memory::SecretBytes;
use crate::seed::{Seed, SEED_LEN};

type Aes256Ctr = ctr::Ctr128BE<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// PBKDF2 rounds for the password key
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// Salt length for PBKDF2
pub const SALT_LEN: usize = 16;

/// Initial counter block length for AES-CTR
pub const IV_LEN: usize = 16;

/// HMAC-SHA256 tag length
pub const MAC_LEN: usize = 32;

const KEY_LEN: usize = 32;

/// Label for deriving the MAC key from the password key
const MAC_KEY_LABEL: &[u8] = b"aegen/vault/mac/v1";

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Malformed vault: {0}")]
    MalformedVault(String),
    #[error("Incorrect password or corrupted vault")]
    WrongPassword,
    #[error("Secure random number generator unavailable: {0}")]
    RandomnessUnavailable(String),
    #[error("Cipher error: {0}")]
    Cipher(String),
}

/// A sealed seed, ready to hand to a [`crate::store::VaultStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VaultRecord", into = "VaultRecord")]
pub struct EncryptedVault {
    ciphertext: [u8; SEED_LEN],
    salt: [u8; SALT_LEN],
    iv: [u8; IV_LEN],
    mac: Option<[u8; MAC_LEN]>,
}

/// On-disk shape: every field is a hex string.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VaultRecord {
    ciphertext: String,
    salt: String,
    iv: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mac: Option<String>,
}

impl EncryptedVault {
    pub fn ciphertext(&self) -> &[u8; SEED_LEN] {
        &self.ciphertext
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    pub fn mac(&self) -> Option<&[u8; MAC_LEN]> {
        self.mac.as_ref()
    }

    /// Whether `open` can tell a wrong password from a right one.
    pub fn is_authenticated(&self) -> bool {
        self.mac.is_some()
    }

    /// The same record with its integrity tag removed, as the first web
    /// wallet wrote it.
    pub fn without_mac(&self) -> Self {
        Self {
            mac: None,
            ..self.clone()
        }
    }

    /// Parse a JSON record, validating every field before any key is derived.
    pub fn from_json(json: &str) -> Result<Self, CryptoError> {
        let record: VaultRecord = serde_json::from_str(json)
            .map_err(|e| CryptoError::MalformedVault(e.to_string()))?;
        Self::try_from(record)
    }

    pub fn to_json(&self) -> String {
        let record = VaultRecord::from(self.clone());
        // A struct of four strings always serializes.
        serde_json::to_string(&record).unwrap_or_default()
    }

    pub fn to_json_pretty(&self) -> String {
        let record = VaultRecord::from(self.clone());
        serde_json::to_string_pretty(&record).unwrap_or_default()
    }
}

impl TryFrom<VaultRecord> for EncryptedVault {
    type Error = CryptoError;

    fn try_from(record: VaultRecord) -> Result<Self, Self::Error> {
        let ciphertext = decode_field::<SEED_LEN>("ciphertext", &record.ciphertext)?;
        let salt = decode_field::<SALT_LEN>("salt", &record.salt)?;
        let iv = decode_field::<IV_LEN>("iv", &record.iv)?;
        let mac = record
            .mac
            .as_deref()
            .map(|m| decode_field::<MAC_LEN>("mac", m))
            .transpose()?;

        Ok(Self {
            ciphertext,
            salt,
            iv,
            mac,
        })
    }
}

impl From<EncryptedVault> for VaultRecord {
    fn from(vault: EncryptedVault) -> Self {
        Self {
            ciphertext: hex::encode(vault.ciphertext),
            salt: hex::encode(vault.salt),
            iv: hex::encode(vault.iv),
            mac: vault.mac.map(hex::encode),
        }
    }
}

fn decode_field<const N: usize>(name: &str, value: &str) -> Result<[u8; N], CryptoError> {
    if value.len() != N * 2 {
        return Err(CryptoError::MalformedVault(format!(
            "{} must be {} hex characters, got {}",
            name,
            N * 2,
            value.len()
        )));
    }
    let mut out = [0u8; N];
    hex::decode_to_slice(value, &mut out)
        .map_err(|e| CryptoError::MalformedVault(format!("{} is not hex: {}", name, e)))?;
    Ok(out)
}

/// Keys derived from one password + salt.
struct VaultKeys {
    enc: Zeroizing<[u8; KEY_LEN]>,
    mac: Zeroizing<[u8; KEY_LEN]>,
}

fn derive_keys(password: &str, salt: &[u8; SALT_LEN]) -> Result<VaultKeys, CryptoError> {
    log::debug!("deriving vault key ({} PBKDF2 rounds)", PBKDF2_ROUNDS);

    let mut enc = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut enc[..]);

    let mut prf = HmacSha256::new_from_slice(&enc[..])
        .map_err(|e| CryptoError::Cipher(e.to_string()))?;
    prf.update(MAC_KEY_LABEL);
    let mac = Zeroizing::new(<[u8; KEY_LEN]>::from(prf.finalize().into_bytes()));

    Ok(VaultKeys { enc, mac })
}

fn compute_mac(
    mac_key: &[u8; KEY_LEN],
    salt: &[u8; SALT_LEN],
    iv: &[u8; IV_LEN],
    ciphertext: &[u8; SEED_LEN],
) -> Result<HmacSha256, CryptoError> {
    let mut mac =
        HmacSha256::new_from_slice(mac_key).map_err(|e| CryptoError::Cipher(e.to_string()))?;
    mac.update(salt);
    mac.update(iv);
    mac.update(ciphertext);
    Ok(mac)
}

fn apply_keystream(
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    buf: &mut [u8],
) -> Result<(), CryptoError> {
    let mut cipher = Aes256Ctr::new_from_slices(key, iv)
        .map_err(|e| CryptoError::Cipher(e.to_string()))?;
    cipher.apply_keystream(buf);
    Ok(())
}

fn random_array<const N: usize>() -> Result<[u8; N], CryptoError> {
    let mut out = [0u8; N];
    OsRng
        .try_fill_bytes(&mut out)
        .map_err(|e| CryptoError::RandomnessUnavailable(e.to_string()))?;
    Ok(out)
}

/// Seal `seed` under `password`.
///
/// Every call draws a fresh salt and IV; reusing either would let two vaults
/// share a keystream. Any password is accepted here, including the empty
/// one; length rules belong to [`crate::password`].
pub fn seal(seed: &Seed, password: &str) -> Result<EncryptedVault, CryptoError> {
    let salt = random_array::<SALT_LEN>()?;
    let iv = random_array::<IV_LEN>()?;
    seal_with(seed, password, salt, iv)
}

pub(crate) fn seal_with(
    seed: &Seed,
    password: &str,
    salt: [u8; SALT_LEN],
    iv: [u8; IV_LEN],
) -> Result<EncryptedVault, CryptoError> {
    let keys = derive_keys(password, &salt)?;

    let mut ciphertext = *seed.as_bytes();
    apply_keystream(&keys.enc, &iv, &mut ciphertext)?;

    let tag = compute_mac(&keys.mac, &salt, &iv, &ciphertext)?.finalize().into_bytes();

    Ok(EncryptedVault {
        ciphertext,
        salt,
        iv,
        mac: Some(tag.into()),
    })
}

/// Open a vault with `password`.
///
/// Authenticated vaults are checked before decryption and fail with
/// [`CryptoError::WrongPassword`]. Legacy vaults (no `mac`) always return 32
/// bytes; whether they are the right 32 bytes is for the caller to decide.
pub fn open(vault: &EncryptedVault, password: &str) -> Result<Seed, CryptoError> {
    let keys = derive_keys(password, &vault.salt)?;

    match vault.mac {
        Some(ref expected) => {
            compute_mac(&keys.mac, &vault.salt, &vault.iv, &vault.ciphertext)?
                .verify_slice(expected)
                .map_err(|_| CryptoError::WrongPassword)?;
        }
        None => {
            log::warn!("opening a legacy vault without an integrity tag; password cannot be verified");
        }
    }

    let mut plaintext = SecretBytes::<SEED_LEN>::zeroed();
    plaintext.as_mut_bytes().copy_from_slice(&vault.ciphertext);
    apply_keystream(&keys.enc, &vault.iv, plaintext.as_mut_bytes())?;

    Ok(Seed::from_secret(plaintext))
}
