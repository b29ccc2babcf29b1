#![no_main]

use aegen_core::seed::{parse_mnemonic, validate_phrase};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary text must parse to Ok or Err, never panic, and both entry
    // points must agree.
    if let Ok(s) = std::str::from_utf8(data) {
        assert_eq!(parse_mnemonic(s).is_ok(), validate_phrase(s));
    }
});
