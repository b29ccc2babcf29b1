//! Recovery phrase backup check
//!
//! Before a freshly generated phrase is sealed, the user is asked to type
//! back a few randomly chosen words to prove they wrote it down.

use bip39::Mnemonic;
use rand::rngs::{OsRng, StdRng};
use rand::seq::index;
use rand::{Rng, RngCore, SeedableRng};
use zeroize::Zeroizing;

use crate::seed::{SeedError, MNEMONIC_WORDS};

/// Words asked for by default
pub const DEFAULT_CHALLENGE_WORDS: usize = 3;

/// A set of distinct word positions the user must re-enter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupChallenge {
    positions: Vec<usize>,
}

impl BackupChallenge {
    /// Pick `count` distinct positions (clamped to `1..=12`), sorted ascending.
    ///
    /// Fails when the OS generator is unavailable.
    pub fn random(count: usize) -> Result<Self, SeedError> {
        let mut seed = Zeroizing::new([0u8; 32]);
        OsRng
            .try_fill_bytes(&mut seed[..])
            .map_err(|e| SeedError::RandomnessUnavailable(e.to_string()))?;
        let mut rng = StdRng::from_seed(*seed);
        Ok(Self::from_rng(&mut rng, count))
    }

    /// Same as [`BackupChallenge::random`], drawing from `rng`.
    pub fn from_rng<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Self {
        let count = count.clamp(1, MNEMONIC_WORDS);
        let mut positions = index::sample(rng, MNEMONIC_WORDS, count).into_vec();
        positions.sort_unstable();
        Self { positions }
    }

    /// A challenge for fixed positions (0-based). Out-of-range and duplicate
    /// positions are dropped.
    pub fn from_positions(positions: &[usize]) -> Self {
        let mut positions: Vec<usize> = positions
            .iter()
            .copied()
            .filter(|&p| p < MNEMONIC_WORDS)
            .collect();
        positions.sort_unstable();
        positions.dedup();
        Self { positions }
    }

    /// 0-based word positions, ascending.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Check the user's answers, one per position, in order.
    ///
    /// Answers are trimmed and compared case-insensitively.
    pub fn verify<S: AsRef<str>>(&self, mnemonic: &Mnemonic, answers: &[S]) -> bool {
        if answers.len() != self.positions.len() {
            return false;
        }

        let words: Vec<&'static str> = mnemonic.words().collect();
        let mut all_match = true;
        for (&position, answer) in self.positions.iter().zip(answers) {
            let given = Zeroizing::new(answer.as_ref().trim().to_lowercase());
            match words.get(position) {
                Some(expected) => all_match &= *expected == given.as_str(),
                None => all_match = false,
            }
        }
        all_match
    }
}
