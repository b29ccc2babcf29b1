//! Wallet flows over an injected [`VaultStore`]
//!
//! ```text
//! begin_create ──► PendingWallet ──► finish_create ──┐
//! import ────────────────────────────────────────────┼──► UnlockedWallet
//! unlock ────────────────────────────────────────────┘
//! ```
//!
//! All flows that seal a vault apply the [`PasswordPolicy`] first. `unlock`
//! is the single place where a wrong password on a legacy (untagged) vault
//! is caught, by comparing the derived address with one the caller already
//! trusts.

use bip39::Mnemonic;
use thiserror::Error;

use crate::backup::BackupChallenge;
use crate::crypto::{self, CryptoError};
use crate::keys::{Address, KeyPair};
use crate::password::{PasswordAnalysis, PasswordError, PasswordPolicy};
use crate::seed::{self, Seed, SeedError};
use crate::store::{StoreError, VaultStore};

#[derive(Error, Debug)]
pub enum WalletError {
    #[error(transparent)]
    Seed(#[from] SeedError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("No vault stored")]
    NoVault,
    #[error("A vault is already stored; forget it first")]
    VaultExists,
    #[error("Recovery phrase backup not confirmed")]
    BackupNotConfirmed,
    #[error("Incorrect password: derived address {derived} does not match {expected}")]
    AddressMismatch { expected: Address, derived: Address },
    #[error("Vault predates password checking and cannot be verified; pass the expected address (--expect)")]
    UnverifiedVault,
}

impl WalletError {
    /// Whether the user should simply be told "incorrect password".
    pub fn is_wrong_password(&self) -> bool {
        matches!(
            self,
            Self::Crypto(CryptoError::WrongPassword) | Self::AddressMismatch { .. }
        )
    }
}

/// How much `unlock` could prove about the password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integrity {
    /// The vault's HMAC tag verified.
    Tagged,
    /// Legacy vault; the derived address matched the expected one.
    AddressMatched,
    /// Legacy vault and no expected address: the seed may be garbage.
    Unverified,
}

/// A decrypted wallet. Dropping it wipes the seed and private key.
#[derive(Debug)]
pub struct UnlockedWallet {
    seed: Seed,
    keypair: KeyPair,
    integrity: Integrity,
}

impl UnlockedWallet {
    fn new(seed: Seed, integrity: Integrity) -> Self {
        let keypair = KeyPair::derive(&seed);
        Self {
            seed,
            keypair,
            integrity,
        }
    }

    pub fn seed(&self) -> &Seed {
        &self.seed
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    pub fn address(&self) -> &Address {
        self.keypair.address()
    }

    pub fn integrity(&self) -> Integrity {
        self.integrity
    }
}

/// A generated phrase waiting for the user to confirm their backup.
///
/// Nothing is stored until [`Wallet::finish_create`] succeeds.
pub struct PendingWallet {
    mnemonic: Mnemonic,
    challenge: BackupChallenge,
    password: zeroize::Zeroizing<String>,
    analysis: PasswordAnalysis,
}

impl PendingWallet {
    /// The phrase to show the user once.
    pub fn mnemonic(&self) -> &Mnemonic {
        &self.mnemonic
    }

    pub fn challenge(&self) -> &BackupChallenge {
        &self.challenge
    }

    /// Strength report for the chosen password.
    pub fn password_analysis(&self) -> &PasswordAnalysis {
        &self.analysis
    }
}

impl std::fmt::Debug for PendingWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingWallet")
            .field("challenge", &self.challenge)
            .finish_non_exhaustive()
    }
}

/// Wallet operations bound to one vault store.
pub struct Wallet<S: VaultStore> {
    store: S,
    policy: PasswordPolicy,
    challenge_words: usize,
}

impl<S: VaultStore> Wallet<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            policy: PasswordPolicy::default(),
            challenge_words: crate::backup::DEFAULT_CHALLENGE_WORDS,
        }
    }

    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Number of words the backup check asks for.
    pub fn with_challenge_words(mut self, count: usize) -> Self {
        self.challenge_words = count;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    pub fn has_vault(&self) -> Result<bool, WalletError> {
        Ok(self.store.get()?.is_some())
    }

    /// Step one of wallet creation: check the password and generate a phrase.
    pub fn begin_create(&self, password: &str, confirm: &str) -> Result<PendingWallet, WalletError> {
        if self.has_vault()? {
            return Err(WalletError::VaultExists);
        }
        let analysis = self.policy.check(password, confirm)?;
        let mnemonic = seed::generate_mnemonic()?;

        Ok(PendingWallet {
            mnemonic,
            challenge: BackupChallenge::random(self.challenge_words)?,
            password: zeroize::Zeroizing::new(password.to_string()),
            analysis,
        })
    }

    /// Step two: verify the backup answers, then seal and store the seed.
    ///
    /// On [`WalletError::BackupNotConfirmed`] the same `pending` wallet can
    /// be answered again.
    pub fn finish_create<A: AsRef<str>>(
        &self,
        pending: &PendingWallet,
        answers: &[A],
    ) -> Result<UnlockedWallet, WalletError> {
        if !pending.challenge.verify(&pending.mnemonic, answers) {
            return Err(WalletError::BackupNotConfirmed);
        }

        let seed = seed::seed_from_mnemonic(&pending.mnemonic);
        self.seal_and_store(&seed, &pending.password)?;

        let wallet = UnlockedWallet::new(seed, Integrity::Tagged);
        log::info!("created wallet {}", wallet.address());
        Ok(wallet)
    }

    /// Import a phrase, hex seed or raw string and seal it.
    ///
    /// See [`seed::resolve_seed_input`] for how the input is interpreted.
    /// Replaces any stored vault only when `overwrite` is set.
    pub fn import(
        &self,
        input: &str,
        password: &str,
        confirm: &str,
        overwrite: bool,
    ) -> Result<UnlockedWallet, WalletError> {
        if !overwrite && self.has_vault()? {
            return Err(WalletError::VaultExists);
        }
        self.policy.check(password, confirm)?;
        let seed = seed::resolve_seed_input(input)?;
        self.seal_and_store(&seed, password)?;

        let wallet = UnlockedWallet::new(seed, Integrity::Tagged);
        log::info!("imported wallet {}", wallet.address());
        Ok(wallet)
    }

    /// Decrypt the stored vault.
    ///
    /// Tagged vaults fail with [`CryptoError::WrongPassword`]. For legacy
    /// vaults, pass the address the user last saw as `expected`: a mismatch
    /// is reported as [`WalletError::AddressMismatch`], a match upgrades the
    /// stored record to a tagged one. Without `expected` the result is
    /// [`Integrity::Unverified`].
    pub fn unlock(
        &self,
        password: &str,
        expected: Option<&Address>,
    ) -> Result<UnlockedWallet, WalletError> {
        let vault = self.store.get()?.ok_or(WalletError::NoVault)?;
        let seed = crypto::open(&vault, password)?;

        if vault.is_authenticated() {
            let wallet = UnlockedWallet::new(seed, Integrity::Tagged);
            if let Some(expected) = expected {
                check_address(expected, wallet.address())?;
            }
            return Ok(wallet);
        }

        let Some(expected) = expected else {
            log::warn!("legacy vault unlocked without an address to check against");
            return Ok(UnlockedWallet::new(seed, Integrity::Unverified));
        };

        let wallet = UnlockedWallet::new(seed, Integrity::AddressMatched);
        check_address(expected, wallet.address())?;

        self.seal_and_store(wallet.seed(), password)?;
        log::info!("upgraded legacy vault for {} to an authenticated record", wallet.address());
        Ok(wallet)
    }

    /// Re-seal the stored seed under a new password. The old record is
    /// replaced.
    ///
    /// A legacy vault opened without `expected` fails with
    /// [`WalletError::UnverifiedVault`] and is left untouched.
    pub fn change_password(
        &self,
        current: &str,
        new_password: &str,
        confirm: &str,
        expected: Option<&Address>,
    ) -> Result<UnlockedWallet, WalletError> {
        self.policy.check(new_password, confirm)?;
        let wallet = self.unlock(current, expected)?;
        if wallet.integrity() == Integrity::Unverified {
            // Re-sealing garbage under a new password would lose the wallet.
            return Err(WalletError::UnverifiedVault);
        }

        self.seal_and_store(wallet.seed(), new_password)?;
        log::info!("vault password changed for {}", wallet.address());
        Ok(UnlockedWallet::new(wallet.seed().clone(), Integrity::Tagged))
    }

    /// Delete the stored vault.
    pub fn forget(&self) -> Result<(), WalletError> {
        self.store.clear()?;
        Ok(())
    }

    fn seal_and_store(&self, seed: &Seed, password: &str) -> Result<(), WalletError> {
        let vault = crypto::seal(seed, password)?;
        self.store.put(&vault)?;
        Ok(())
    }
}

fn check_address(expected: &Address, derived: &Address) -> Result<(), WalletError> {
    if expected != derived {
        return Err(WalletError::AddressMismatch {
            expected: expected.clone(),
            derived: derived.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryVaultStore;

    const PASSWORD: &str = "Sup3rSecret!";

    fn answers_for(pending: &PendingWallet) -> Vec<String> {
        let words: Vec<&str> = pending.mnemonic().words().collect();
        pending
            .challenge()
            .positions()
            .iter()
            .map(|&p| words[p].to_string())
            .collect()
    }

    #[test]
    fn test_create_and_unlock() {
        let wallet = Wallet::new(MemoryVaultStore::new());
        let pending = wallet.begin_create(PASSWORD, PASSWORD).unwrap();
        assert!(!wallet.has_vault().unwrap());

        let answers = answers_for(&pending);
        let phrase = pending.mnemonic().to_string();
        let created = wallet.finish_create(&pending, &answers).unwrap();
        assert!(wallet.has_vault().unwrap());

        let expected_seed = seed::seed_from_mnemonic(&seed::parse_mnemonic(&phrase).unwrap());
        assert_eq!(created.seed(), &expected_seed);

        let unlocked = wallet.unlock(PASSWORD, None).unwrap();
        assert_eq!(unlocked.address(), created.address());
        assert_eq!(unlocked.integrity(), Integrity::Tagged);
    }

    #[test]
    fn test_create_requires_backup() {
        let wallet = Wallet::new(MemoryVaultStore::new());
        let pending = wallet.begin_create(PASSWORD, PASSWORD).unwrap();
        let wrong = vec!["zzz".to_string(); pending.challenge().positions().len()];

        assert!(matches!(
            wallet.finish_create(&pending, &wrong),
            Err(WalletError::BackupNotConfirmed)
        ));
        assert!(!wallet.has_vault().unwrap());
    }

    #[test]
    fn test_create_retries_after_wrong_answers() {
        let wallet = Wallet::new(MemoryVaultStore::new());
        let pending = wallet.begin_create(PASSWORD, PASSWORD).unwrap();
        let wrong = vec!["zzz".to_string(); pending.challenge().positions().len()];

        for _ in 0..2 {
            assert!(matches!(
                wallet.finish_create(&pending, &wrong),
                Err(WalletError::BackupNotConfirmed)
            ));
        }

        // The phrase the user wrote down is still the one that gets sealed
        let created = wallet.finish_create(&pending, &answers_for(&pending)).unwrap();
        assert_eq!(created.seed(), &seed::seed_from_mnemonic(pending.mnemonic()));
        assert!(wallet.has_vault().unwrap());
    }

    #[test]
    fn test_create_enforces_password_policy() {
        let wallet = Wallet::new(MemoryVaultStore::new());
        assert!(matches!(
            wallet.begin_create("short", "short"),
            Err(WalletError::Password(PasswordError::TooShort { .. }))
        ));
        assert!(matches!(
            wallet.begin_create(PASSWORD, "Sup3rSecret?"),
            Err(WalletError::Password(PasswordError::Mismatch))
        ));
    }

    #[test]
    fn test_import_variants() {
        let wallet = Wallet::new(MemoryVaultStore::new());
        let hex_seed = "00".repeat(32);
        let imported = wallet.import(&hex_seed, PASSWORD, PASSWORD, false).unwrap();
        assert_eq!(
            imported.address().as_str(),
            "k:1fd4247443c9440cb3c48c28851937196bc156032d70a96c98e127ecb347e45f"
        );

        assert!(matches!(
            wallet.import(&hex_seed, PASSWORD, PASSWORD, false),
            Err(WalletError::VaultExists)
        ));

        let typo = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon above";
        assert!(matches!(
            wallet.import(typo, PASSWORD, PASSWORD, true),
            Err(WalletError::Seed(SeedError::InvalidMnemonic(_)))
        ));

        let punctuated = "abandon, abandon, abandon, abandon, abandon, abandon, abandon, abandon, abandon, abandon, abandon, about";
        assert!(matches!(
            wallet.import(punctuated, PASSWORD, PASSWORD, true),
            Err(WalletError::Seed(SeedError::InvalidMnemonic(_)))
        ));

        // The failed imports left the first vault in place
        let unlocked = wallet.unlock(PASSWORD, None).unwrap();
        assert_eq!(unlocked.address(), imported.address());
    }

    #[test]
    fn test_unlock_wrong_password() {
        let wallet = Wallet::new(MemoryVaultStore::new());
        wallet
            .import(&"11".repeat(32), PASSWORD, PASSWORD, false)
            .unwrap();

        let err = wallet.unlock("wrong-password", None).unwrap_err();
        assert!(err.is_wrong_password());
    }

    #[test]
    fn test_unlock_without_vault() {
        let wallet = Wallet::new(MemoryVaultStore::new());
        assert!(matches!(
            wallet.unlock(PASSWORD, None),
            Err(WalletError::NoVault)
        ));
    }

    #[test]
    fn test_legacy_vault_flows() {
        let seed = Seed::from_bytes([0u8; 32]);
        let expected = KeyPair::derive(&seed).address().clone();
        let legacy = crypto::seal(&seed, "correct-password").unwrap().without_mac();
        let wallet = Wallet::new(MemoryVaultStore::with_vault(legacy));

        // No anchor: succeeds but is flagged
        let unverified = wallet.unlock("wrong-password", None).unwrap();
        assert_eq!(unverified.integrity(), Integrity::Unverified);
        assert_ne!(unverified.address(), &expected);

        // Anchor + wrong password: explicit error
        let err = wallet.unlock("wrong-password", Some(&expected)).unwrap_err();
        assert!(matches!(err, WalletError::AddressMismatch { .. }));
        assert!(err.is_wrong_password());
        assert!(!wallet.store().get().unwrap().unwrap().is_authenticated());

        // Anchor + right password: upgrades the stored record
        let unlocked = wallet.unlock("correct-password", Some(&expected)).unwrap();
        assert_eq!(unlocked.integrity(), Integrity::AddressMatched);
        assert!(wallet.store().get().unwrap().unwrap().is_authenticated());

        let again = wallet.unlock("correct-password", None).unwrap();
        assert_eq!(again.integrity(), Integrity::Tagged);
        assert_eq!(again.address(), &expected);
    }

    #[test]
    fn test_change_password() {
        let wallet = Wallet::new(MemoryVaultStore::new());
        let imported = wallet
            .import(&"22".repeat(32), PASSWORD, PASSWORD, false)
            .unwrap();
        let old_vault = wallet.store().get().unwrap().unwrap();

        let changed = wallet
            .change_password(PASSWORD, "An0ther-Passw0rd", "An0ther-Passw0rd", None)
            .unwrap();
        assert_eq!(changed.address(), imported.address());
        assert_ne!(wallet.store().get().unwrap().unwrap(), old_vault);

        assert!(wallet.unlock(PASSWORD, None).unwrap_err().is_wrong_password());
        assert_eq!(
            wallet.unlock("An0ther-Passw0rd", None).unwrap().address(),
            imported.address()
        );
    }

    #[test]
    fn test_change_password_refuses_unverified_legacy() {
        let legacy = crypto::seal(&Seed::from_bytes([3u8; 32]), "correct-password")
            .unwrap()
            .without_mac();
        let wallet = Wallet::new(MemoryVaultStore::with_vault(legacy.clone()));

        // Even the right password cannot be confirmed without an address
        let err = wallet
            .change_password("correct-password", "An0ther-Passw0rd", "An0ther-Passw0rd", None)
            .unwrap_err();
        assert!(matches!(err, WalletError::UnverifiedVault));
        assert!(!err.is_wrong_password());
        assert!(err.to_string().contains("--expect"));
        assert_eq!(wallet.store().get().unwrap(), Some(legacy));
    }

    #[test]
    fn test_forget() {
        let wallet = Wallet::new(MemoryVaultStore::new());
        wallet
            .import("old-brainwallet-123", PASSWORD, PASSWORD, false)
            .unwrap();
        wallet.forget().unwrap();
        assert!(!wallet.has_vault().unwrap());
    }

    #[test]
    fn test_custom_policy() {
        let wallet = Wallet::new(MemoryVaultStore::new())
            .with_policy(PasswordPolicy::with_min_length(20))
            .with_challenge_words(5);
        assert!(wallet.begin_create(PASSWORD, PASSWORD).is_err());

        let long = "a-much-longer-Passw0rd!";
        let pending = wallet.begin_create(long, long).unwrap();
        assert_eq!(pending.challenge().positions().len(), 5);
    }
}
