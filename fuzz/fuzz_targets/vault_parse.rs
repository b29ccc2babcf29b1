#![no_main]

use aegen_core::crypto::EncryptedVault;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Vault records come from disk or browser storage and may be anything.
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(vault) = EncryptedVault::from_json(s) {
            // Anything accepted must survive a re-encode unchanged
            let again = EncryptedVault::from_json(&vault.to_json())
                .expect("re-encoded vault must parse");
            assert_eq!(vault, again);
        }
    }
});
