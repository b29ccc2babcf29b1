#![no_main]

use aegen_core::keys::KeyPair;
use aegen_core::seed::{is_mnemonic_shaped, resolve_seed_input, validate_phrase};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    match resolve_seed_input(s) {
        Ok(seed) => {
            // A phrase-shaped input only resolves if it is a valid phrase
            if is_mnemonic_shaped(s.trim()) {
                assert!(validate_phrase(s));
            }
            let _ = KeyPair::derive(&seed);
        }
        Err(_) => {}
    }
});
