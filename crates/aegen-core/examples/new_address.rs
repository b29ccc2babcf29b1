//! Generate a throwaway phrase and print its address
//! Run with: cargo run --example new_address

use aegen_core::{generate_mnemonic, seed_from_mnemonic, KeyPair};

fn main() -> Result<(), aegen_core::SeedError> {
    let mnemonic = generate_mnemonic()?;
    println!("=== NEW AEGEN ACCOUNT ===\n");
    println!("Recovery phrase (do not reuse, this was printed to a terminal):\n");
    println!("{}\n", mnemonic);

    let seed = seed_from_mnemonic(&mnemonic);
    let keypair = KeyPair::derive(&seed);

    println!("Public key:\n{}\n", keypair.public_key_hex());
    println!("Address:\n{}", keypair.address());
    Ok(())
}
