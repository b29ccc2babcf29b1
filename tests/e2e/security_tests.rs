//! Security-specific tests for audit preparation.
//!
//! These tests verify:
//! 1. The vault rejects wrong passwords and tampered records
//! 2. Secret buffers are wiped and never printed
//! 3. Malformed inputs don't panic
//! 4. Seed input classification never silently hashes a mistyped phrase

use aegen_core::crypto::{open, seal, CryptoError, EncryptedVault};
use aegen_core::keys::{Address, KeyPair};
use aegen_core::memory::SecretBytes;
use aegen_core::seed::{parse_mnemonic, resolve_seed_input, Seed, SeedError};
use aegen_core::store::MemoryVaultStore;
use aegen_core::wallet::Wallet;
use zeroize::Zeroize;

const PASSWORD: &str = "correct horse battery staple";

fn tamper(vault: &EncryptedVault, field: &str) -> EncryptedVault {
    let mut record: serde_json::Value = serde_json::from_str(&vault.to_json()).unwrap();
    let mut bytes = hex::decode(record[field].as_str().unwrap()).unwrap();
    bytes[0] ^= 0xFF;
    record[field] = serde_json::Value::String(hex::encode(bytes));
    EncryptedVault::from_json(&record.to_string()).unwrap()
}

// ============================================================================
// 1. Vault Security Tests
// ============================================================================

#[test]
fn test_wrong_password_fails_decryption() {
    let seed = Seed::from_bytes([0xABu8; 32]);
    let vault = seal(&seed, PASSWORD).unwrap();

    let result = open(&vault, "wrong horse battery staple");
    assert!(matches!(result, Err(CryptoError::WrongPassword)));
}

#[test]
fn test_empty_password_vault() {
    let seed = Seed::from_bytes([0x42u8; 32]);
    let vault = seal(&seed, "").unwrap();

    assert!(open(&vault, "notempty").is_err());
    assert_eq!(open(&vault, "").unwrap(), seed);
}

#[test]
fn test_tampered_fields_fail_decryption() {
    let seed = Seed::from_bytes([0x42u8; 32]);
    let vault = seal(&seed, PASSWORD).unwrap();

    for field in ["salt", "iv", "ciphertext", "mac"] {
        let tampered = tamper(&vault, field);
        assert!(
            matches!(open(&tampered, PASSWORD), Err(CryptoError::WrongPassword)),
            "tampered {field} was accepted"
        );
    }
}

#[test]
fn test_stripped_mac_is_not_trusted_by_wallet() {
    let seed = Seed::from_bytes([0x42u8; 32]);
    let expected = KeyPair::derive(&seed).address().clone();
    let stripped = seal(&seed, PASSWORD).unwrap().without_mac();
    let wallet = Wallet::new(MemoryVaultStore::with_vault(stripped));

    // Downgrading a record to legacy form still cannot hide a wrong password
    // from a caller that knows its address
    let err = wallet.unlock("wrong password here", Some(&expected)).unwrap_err();
    assert!(err.is_wrong_password());
}

#[test]
fn test_truncated_fields_rejected_before_kdf() {
    let vault = seal(&Seed::from_bytes([1u8; 32]), PASSWORD).unwrap();
    let mut record: serde_json::Value = serde_json::from_str(&vault.to_json()).unwrap();
    let ciphertext = record["ciphertext"].as_str().unwrap()[..62].to_string();
    record["ciphertext"] = serde_json::Value::String(ciphertext);

    assert!(matches!(
        EncryptedVault::from_json(&record.to_string()),
        Err(CryptoError::MalformedVault(_))
    ));
}

// ============================================================================
// 2. Secret Hygiene Tests
// ============================================================================

#[test]
fn test_zeroize_works_on_string() {
    let mut secret = String::from("Sup3rSecret!");
    secret.zeroize();
    assert!(secret.is_empty());
}

#[test]
fn test_secret_bytes_clone_is_independent() {
    let mut original = SecretBytes::<32>::new([0x42; 32]);
    let copy = original.clone();
    original.as_mut_bytes()[0] = 0;
    assert_eq!(copy.as_bytes(), &[0x42; 32]);
}

#[test]
fn test_debug_output_hides_secrets() {
    let seed = Seed::from_bytes([0xCDu8; 32]);
    let keypair = KeyPair::derive(&seed);
    let seed_hex = hex::encode([0xCDu8; 32]);

    assert!(!format!("{:?}", seed).contains(&seed_hex));
    assert!(!format!("{:?}", keypair).contains(&seed_hex));
    assert!(!format!("{:?}", SecretBytes::<32>::new([0xCD; 32])).contains("cd"));
}

// ============================================================================
// 3. Malformed Input Panic Tests (should NOT panic)
// ============================================================================

#[test]
fn test_parse_mnemonic_garbage_does_not_panic() {
    let inputs = [
        "",
        "a",
        "hello world",
        "abandon abandon abandon", // Too few words
        &"abandon ".repeat(100),   // Too many words
        "🎉 🎊 🎈 🎃 🎄 🎅 🎆 🎇 🎁 🎂 🎀 🎍", // Unicode
        "\0\0\0\0\0\0\0\0\0\0\0\0", // Null bytes
        &"a".repeat(10000),          // Very long
    ];

    for input in &inputs {
        assert!(parse_mnemonic(input).is_err());
    }
}

#[test]
fn test_vault_from_garbage_json_does_not_panic() {
    let inputs = [
        "",
        "null",
        "[]",
        "{}",
        "{\"ciphertext\": 5}",
        "{\"ciphertext\": \"zz\", \"salt\": \"zz\", \"iv\": \"zz\"}",
        &"{".repeat(1000),
        "\0\0\0",
    ];

    for input in &inputs {
        assert!(matches!(
            EncryptedVault::from_json(input),
            Err(CryptoError::MalformedVault(_))
        ));
    }
}

#[test]
fn test_address_parse_garbage_does_not_panic() {
    let inputs = [
        "",
        "k:",
        "k:xyz",
        &format!("k:{}", "0".repeat(63)),
        &format!("k:{}", "0".repeat(65)),
        &format!("K:{}", "0".repeat(64)),
        &format!("k:{}", "g".repeat(64)),
        "alice",
    ];

    for input in &inputs {
        assert!(Address::parse(input).is_err(), "{input:?} accepted");
    }
}

// ============================================================================
// 4. Seed Input Classification
// ============================================================================

#[test]
fn test_mistyped_phrase_is_not_hashed() {
    // Right shape, wrong checksum
    let typo = "legal winner thank year wave sausage worth useful legal winner thank thank";
    assert!(matches!(
        resolve_seed_input(typo),
        Err(SeedError::InvalidMnemonic(_))
    ));

    // Not a wordlist word
    let typo = "legal winner thank year wave sausage worth useful legal winner thank yelow";
    assert!(matches!(
        resolve_seed_input(typo),
        Err(SeedError::InvalidMnemonic(_))
    ));

    // Punctuation or a digit turns a phrase into a typo, not a secret
    let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    for typo in [
        format!("{phrase}."),
        phrase.replace(' ', ", "),
        phrase.replace("about", "ab0ut"),
    ] {
        assert!(
            matches!(resolve_seed_input(&typo), Err(SeedError::InvalidMnemonic(_))),
            "{typo:?} was hashed"
        );
    }
}

#[test]
fn test_fallback_inputs_are_distinct() {
    let a = resolve_seed_input("brainwallet#1").unwrap();
    let b = resolve_seed_input("brainwallet#2").unwrap();
    assert_ne!(a, b);
    assert!(resolve_seed_input("   ").is_err());
}
