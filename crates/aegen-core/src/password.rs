//! Vault password policy
//!
//! The vault cipher accepts any password. The rules here are applied by the
//! wallet flows before a vault is sealed:
//!
//! - a hard minimum length (default 8 characters), reported as
//!   [`PasswordError::TooShort`];
//! - the confirmation must match;
//! - everything else (character classes, common words, repetition) only
//!   produces warnings on a [`PasswordAnalysis`].

use std::collections::HashSet;

use thiserror::Error;

/// Minimum vault password length, in characters
pub const MIN_PASSWORD_LEN: usize = 8;

/// Entropy below which a password is reported as weak
pub const WEAK_ENTROPY_BITS: f64 = 40.0;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Password too weak: must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },
    #[error("Passwords do not match")]
    Mismatch,
}

/// Coarse strength buckets for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PasswordStrength {
    Weak,
    Fair,
    Strong,
}

impl PasswordStrength {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Fair => "fair",
            Self::Strong => "strong",
        }
    }
}

/// Outcome of [`estimate_strength`].
#[derive(Debug, Clone)]
pub struct PasswordAnalysis {
    pub entropy_bits: f64,
    pub strength: PasswordStrength,
    pub warnings: Vec<String>,
}

/// Words that attackers try first, wallet-specific ones included
const COMMON_WORDS: &[&str] = &[
    "password", "123456", "qwerty", "letmein", "iloveyou", "admin", "welcome", "monkey",
    "dragon", "aegen", "kadena", "wallet", "crypto", "bitcoin", "seed", "secret",
];

/// Length and confirmation rules for new vault passwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LEN,
        }
    }
}

impl PasswordPolicy {
    /// A policy with a custom minimum. Values below [`MIN_PASSWORD_LEN`] are
    /// raised to it.
    pub fn with_min_length(min_length: usize) -> Self {
        Self {
            min_length: min_length.max(MIN_PASSWORD_LEN),
        }
    }

    /// Check a new password and its confirmation.
    ///
    /// Returns the strength analysis so callers can surface warnings for
    /// passwords that pass the hard rules.
    pub fn check(&self, password: &str, confirm: &str) -> Result<PasswordAnalysis, PasswordError> {
        self.check_length(password)?;
        if password != confirm {
            return Err(PasswordError::Mismatch);
        }

        let analysis = estimate_strength(password);
        if analysis.strength == PasswordStrength::Weak {
            log::warn!(
                "accepting weak vault password (~{:.0} bits): {}",
                analysis.entropy_bits,
                analysis.warnings.join("; ")
            );
        }
        Ok(analysis)
    }

    pub fn check_length(&self, password: &str) -> Result<(), PasswordError> {
        let actual = password.chars().count();
        if actual < self.min_length {
            return Err(PasswordError::TooShort {
                min: self.min_length,
                actual,
            });
        }
        Ok(())
    }
}

/// Rough entropy estimate from character classes, with penalties for
/// common words, repeated characters and runs like `abc` / `321`.
pub fn estimate_strength(password: &str) -> PasswordAnalysis {
    let mut warnings = Vec::new();
    let len = password.chars().count();

    if len == 0 {
        return PasswordAnalysis {
            entropy_bits: 0.0,
            strength: PasswordStrength::Weak,
            warnings: vec!["Password is empty".to_string()],
        };
    }

    let mut pool = 0.0f64;
    if password.chars().any(|c| c.is_ascii_lowercase()) {
        pool += 26.0;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        pool += 26.0;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        pool += 10.0;
    }
    if password.chars().any(|c| c.is_ascii_punctuation() || c == ' ') {
        pool += 33.0;
    }
    if password.chars().any(|c| !c.is_ascii()) {
        pool += 100.0;
    }

    let mut entropy = len as f64 * pool.max(1.0).log2();

    let lower = password.to_lowercase();
    if COMMON_WORDS.iter().any(|w| lower.contains(w)) {
        entropy *= 0.5;
        warnings.push("Contains a commonly guessed word".to_string());
    }

    let unique: HashSet<char> = password.chars().collect();
    if (unique.len() as f64) < len as f64 / 2.0 {
        entropy *= 0.6;
        warnings.push("Too many repeated characters".to_string());
    }

    let runs = count_runs(password);
    if runs > 1 {
        entropy -= runs as f64 * 3.0;
        warnings.push("Contains sequences like abc or 321".to_string());
    }

    if len < 12 {
        warnings.push("12 or more characters are recommended".to_string());
    }

    let entropy = entropy.max(0.0);
    let strength = if entropy < WEAK_ENTROPY_BITS {
        PasswordStrength::Weak
    } else if entropy < 64.0 {
        PasswordStrength::Fair
    } else {
        PasswordStrength::Strong
    };

    PasswordAnalysis {
        entropy_bits: entropy,
        strength,
        warnings,
    }
}

/// Three-character ascending or descending runs.
fn count_runs(password: &str) -> usize {
    let codes: Vec<i64> = password.chars().map(|c| c as i64).collect();
    codes
        .windows(3)
        .filter(|w| {
            let (d1, d2) = (w[1] - w[0], w[2] - w[1]);
            d1 == d2 && d1.abs() == 1
        })
        .count()
}
