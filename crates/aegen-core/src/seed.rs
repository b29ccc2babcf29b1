//! Recovery phrases and wallet seeds
//!
//! A wallet is created from a 12-word BIP-39 phrase (128 bits of entropy plus
//! a 4-bit checksum). The phrase is stretched with the standard BIP-39
//! function (PBKDF2-HMAC-SHA512, 2048 rounds, salt `"mnemonic"`, empty
//! passphrase) and the first 32 bytes of the 64-byte result become the
//! wallet [`Seed`].
//!
//! # Truncation
//!
//! Aegen keys are derived from a 32-byte seed, so the upper half of the
//! BIP-39 output is discarded. The retained half already carries the full
//! entropy of the stretch, but it means an Aegen seed is **not** a BIP-39
//! seed: importing the same phrase into a BIP-32 wallet gives unrelated keys.

use std::fmt;

use bip39::{Language, Mnemonic};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use crate::memory::SecretBytes;

/// Words in an Aegen recovery phrase
pub const MNEMONIC_WORDS: usize = 12;

/// Entropy encoded by a 12-word phrase (128 bits)
pub const ENTROPY_LEN: usize = 16;

/// Length of a wallet seed in bytes
pub const SEED_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),
    #[error("Secure random number generator unavailable: {0}")]
    RandomnessUnavailable(String),
}

/// A 32-byte wallet seed.
///
/// Held in locked memory and wiped when dropped. The textual form is 64
/// lowercase hex characters.
#[derive(Clone, PartialEq, Eq)]
pub struct Seed(SecretBytes<SEED_LEN>);

impl Seed {
    pub fn from_bytes(bytes: [u8; SEED_LEN]) -> Self {
        Self(SecretBytes::new(bytes))
    }

    pub(crate) fn from_secret(secret: SecretBytes<SEED_LEN>) -> Self {
        Self(secret)
    }

    /// Parse a seed from exactly 64 hex characters (either case).
    pub fn from_hex(s: &str) -> Result<Self, SeedError> {
        if !is_seed_hex(s) {
            return Err(SeedError::InvalidSeed(format!(
                "expected {} hex characters",
                SEED_LEN * 2
            )));
        }
        let mut secret = SecretBytes::zeroed();
        hex::decode_to_slice(s, secret.as_mut_bytes())
            .map_err(|e| SeedError::InvalidSeed(e.to_string()))?;
        Ok(Self(secret))
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        self.0.as_bytes()
    }

    /// Lowercase hex, wrapped so the copy is wiped too.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.as_bytes()))
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// `^[0-9a-fA-F]{64}$`
pub fn is_seed_hex(s: &str) -> bool {
    s.len() == SEED_LEN * 2 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

// ============================================================================
// Mnemonic codec
// ============================================================================

/// Generate a new 12-word recovery phrase from OS entropy.
///
/// Fails rather than falling back to a weaker source when the OS generator
/// is unavailable.
pub fn generate_mnemonic() -> Result<Mnemonic, SeedError> {
    let mut entropy = Zeroizing::new([0u8; ENTROPY_LEN]);
    OsRng
        .try_fill_bytes(&mut entropy[..])
        .map_err(|e| SeedError::RandomnessUnavailable(e.to_string()))?;
    mnemonic_from_entropy(&entropy[..])
}

/// Encode 16 bytes of entropy as a 12-word phrase.
pub fn mnemonic_from_entropy(entropy: &[u8]) -> Result<Mnemonic, SeedError> {
    if entropy.len() != ENTROPY_LEN {
        return Err(SeedError::InvalidMnemonic(format!(
            "expected {} bytes of entropy, got {}",
            ENTROPY_LEN,
            entropy.len()
        )));
    }
    Mnemonic::from_entropy_in(Language::English, entropy)
        .map_err(|e| SeedError::InvalidMnemonic(e.to_string()))
}

/// Parse a phrase typed or pasted by the user.
///
/// Words may be separated by any whitespace. Only 12-word English phrases
/// with a valid checksum are accepted.
pub fn parse_mnemonic(phrase: &str) -> Result<Mnemonic, SeedError> {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    check_words(&words)
}

/// Validate a word sequence, reporting why it was rejected.
pub fn check_words<S: AsRef<str>>(words: &[S]) -> Result<Mnemonic, SeedError> {
    if words.len() != MNEMONIC_WORDS {
        return Err(SeedError::InvalidMnemonic(format!(
            "expected {} words, got {}",
            MNEMONIC_WORDS,
            words.len()
        )));
    }

    for (position, word) in words.iter().enumerate() {
        if Language::English.find_word(word.as_ref()).is_none() {
            return Err(SeedError::InvalidMnemonic(format!(
                "word {} is not in the wordlist",
                position + 1
            )));
        }
    }

    let joined = Zeroizing::new(
        words
            .iter()
            .map(|w| w.as_ref())
            .collect::<Vec<_>>()
            .join(" "),
    );
    Mnemonic::parse_in_normalized(Language::English, &joined)
        .map_err(|e| SeedError::InvalidMnemonic(e.to_string()))
}

/// `true` when `words` is a valid 12-word phrase. Never panics.
pub fn validate_words<S: AsRef<str>>(words: &[S]) -> bool {
    check_words(words).is_ok()
}

/// `true` when `phrase` is a valid 12-word phrase. Never panics.
pub fn validate_phrase(phrase: &str) -> bool {
    parse_mnemonic(phrase).is_ok()
}

// ============================================================================
// Seed derivation
// ============================================================================

/// Stretch a phrase into the 32-byte wallet seed.
///
/// See the module docs for why only the first half of the BIP-39 seed is kept.
pub fn seed_from_mnemonic(mnemonic: &Mnemonic) -> Seed {
    let mut full = mnemonic.to_seed("");
    let mut secret = SecretBytes::zeroed();
    secret.as_mut_bytes().copy_from_slice(&full[..SEED_LEN]);
    full.zeroize();
    Seed(secret)
}

/// Fallback for input that is not a phrase: `SHA-256(input)`.
///
/// Only call this once the input is known not to be mnemonic-shaped;
/// [`resolve_seed_input`] makes that decision.
pub fn seed_from_arbitrary_string(input: &str) -> Seed {
    let digest: [u8; SEED_LEN] = Sha256::digest(input.as_bytes()).into();
    Seed::from_bytes(digest)
}

/// Turn user-supplied import text into a seed.
///
/// - 64 hex characters are taken as the seed itself.
/// - Anything with two or more words is a phrase attempt and must be a valid
///   phrase. Stray punctuation, digits or a mistyped word are errors, never
///   silently hashed into a different wallet.
/// - A single token goes through [`seed_from_arbitrary_string`].
pub fn resolve_seed_input(input: &str) -> Result<Seed, SeedError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SeedError::InvalidSeed("input is empty".to_string()));
    }

    if is_seed_hex(trimmed) {
        return Seed::from_hex(trimmed);
    }

    if is_mnemonic_shaped(trimmed) {
        let mnemonic = parse_mnemonic(trimmed)?;
        return Ok(seed_from_mnemonic(&mnemonic));
    }

    Ok(seed_from_arbitrary_string(trimmed))
}

/// Two or more whitespace-separated tokens, whatever they contain.
pub fn is_mnemonic_shaped(input: &str) -> bool {
    input.split_whitespace().nth(1).is_some()
}
