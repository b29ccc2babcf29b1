//! Aegen Wallet: terminal front end for the Aegen wallet core
//!
//! Creates, imports and unlocks a password-sealed wallet vault on disk.
//!
//! # Usage
//!
//! ```bash
//! aegen-wallet create
//! aegen-wallet unlock --expect k:<hex>
//! aegen-wallet --config /path/to/config.toml export-key
//! ```

mod commands;
mod config;

use anyhow::{Context, Result};
use std::io;
use std::path::PathBuf;

use aegen_core::keys::Address;
use aegen_core::password::PasswordPolicy;
use aegen_core::store::FileVaultStore;
use aegen_core::wallet::Wallet;
use commands::LineTerminal;

/// A parsed command line.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Create,
    Import { force: bool },
    Unlock { expect: Option<String> },
    ExportKey { expect: Option<String> },
    ChangePassword { expect: Option<String> },
    Forget,
    CheckPhrase,
    CheckAddress(String),
}

fn main() -> Result<()> {
    // Security hardening: disable core dumps to prevent seed material leaking to disk
    aegen_core::memory::disable_core_dumps();

    // Parse CLI args (minimal, no clap dependency needed)
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut config_path: Option<PathBuf> = None;
    let mut rest = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = Some(PathBuf::from(&args[i]));
                } else {
                    anyhow::bail!("--config requires a path argument");
                }
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("aegen-wallet {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            other => rest.push(other.to_string()),
        }
        i += 1;
    }

    let Some(command) = parse_command(&rest)? else {
        print_help();
        return Ok(());
    };

    // Load config
    let mut wallet_config = config::WalletConfig::load(config_path.as_deref())
        .context("Failed to load config")?;

    // Apply env overrides
    wallet_config.apply_env_overrides();

    // Validate
    wallet_config
        .validate()
        .context("Configuration validation failed")?;

    // Init logger
    env_logger::Builder::new()
        .parse_filters(&wallet_config.wallet.log_level)
        .init();

    log::debug!("vault path: {}", wallet_config.wallet.vault_path.display());

    let wallet = Wallet::new(FileVaultStore::new(&wallet_config.wallet.vault_path))
        .with_policy(PasswordPolicy::with_min_length(
            wallet_config.security.min_password_length,
        ))
        .with_challenge_words(wallet_config.security.backup_check_words);

    let stdin = io::stdin();
    let mut term = LineTerminal::interactive(stdin.lock(), io::stdout());

    match command {
        Command::Create => commands::create(&wallet, &mut term),
        Command::Import { force } => commands::import(&wallet, &mut term, force),
        Command::Unlock { expect } => {
            commands::unlock(&wallet, &mut term, parse_expect(expect)?.as_ref())
        }
        Command::ExportKey { expect } => {
            commands::export_key(&wallet, &mut term, parse_expect(expect)?.as_ref())
        }
        Command::ChangePassword { expect } => {
            commands::change_password(&wallet, &mut term, parse_expect(expect)?.as_ref())
        }
        Command::Forget => commands::forget(&wallet, &mut term),
        Command::CheckPhrase => commands::check_phrase(&mut term),
        Command::CheckAddress(address) => commands::check_address(&mut term, &address),
    }
}

fn parse_command(args: &[String]) -> Result<Option<Command>> {
    let Some((name, flags)) = args.split_first() else {
        return Ok(None);
    };

    let mut force = false;
    let mut expect = None;
    let mut positional = Vec::new();

    let mut i = 0;
    while i < flags.len() {
        match flags[i].as_str() {
            "--force" | "-f" => force = true,
            "--expect" | "-e" => {
                i += 1;
                match flags.get(i) {
                    Some(address) => expect = Some(address.clone()),
                    None => anyhow::bail!("--expect requires an address argument"),
                }
            }
            other if other.starts_with('-') => anyhow::bail!("Unknown argument: {}", other),
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let takes_expect = matches!(name.as_str(), "unlock" | "export-key" | "change-password");
    if expect.is_some() && !takes_expect {
        anyhow::bail!("--expect is not valid for `{}`", name);
    }
    if force && name != "import" {
        anyhow::bail!("--force is only valid for `import`");
    }

    let command = match (name.as_str(), positional.as_slice()) {
        ("create", []) => Command::Create,
        ("import", []) => Command::Import { force },
        ("unlock", []) => Command::Unlock { expect },
        ("export-key", []) => Command::ExportKey { expect },
        ("change-password", []) => Command::ChangePassword { expect },
        ("forget", []) => Command::Forget,
        ("check-phrase", []) => Command::CheckPhrase,
        ("check-address", [address]) => Command::CheckAddress(address.clone()),
        ("check-address", _) => anyhow::bail!("check-address takes exactly one address"),
        (name, []) => anyhow::bail!("Unknown command: {}", name),
        (name, extra) => anyhow::bail!("Unexpected arguments for `{}`: {}", name, extra.join(" ")),
    };
    Ok(Some(command))
}

fn parse_expect(expect: Option<String>) -> Result<Option<Address>> {
    expect
        .map(|s| Address::parse(&s).with_context(|| format!("Invalid --expect address: {}", s)))
        .transpose()
}

fn print_help() {
    println!(
        r#"Aegen Wallet: recovery phrases and password vaults

USAGE:
    aegen-wallet [OPTIONS] <COMMAND>

COMMANDS:
    create                    Generate a phrase, confirm the backup, seal and store it
    import [--force]          Import a phrase, hex seed or secret
    unlock [--expect ADDR]    Unlock the vault and print the address
    export-key [--expect ADDR]
                              Unlock the vault and print the private key
    change-password [--expect ADDR]
                              Re-seal the vault under a new password
    forget                    Delete the stored vault
    check-phrase              Validate a recovery phrase read from stdin
    check-address ADDR        Validate an address

OPTIONS:
    -c, --config <PATH>   Config file path (default: ~/.aegen/config.toml)
    -h, --help            Show this help message
    -V, --version         Show version

ENVIRONMENT VARIABLES (override config file):
    AEGEN_VAULT_PATH            Vault file path
    AEGEN_LOG_LEVEL             Log level (error/warn/info/debug/trace)
    AEGEN_MIN_PASSWORD_LENGTH   Minimum vault password length (>= 8)

--expect is needed for vaults written before password checking existed:
without it a wrong password cannot be told apart from a right one.
"#
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command(&args(&[])).unwrap(), None);
        assert_eq!(
            parse_command(&args(&["create"])).unwrap(),
            Some(Command::Create)
        );
        assert_eq!(
            parse_command(&args(&["import", "--force"])).unwrap(),
            Some(Command::Import { force: true })
        );
        assert_eq!(
            parse_command(&args(&["unlock", "--expect", "k:abc"])).unwrap(),
            Some(Command::Unlock {
                expect: Some("k:abc".to_string())
            })
        );
        assert_eq!(
            parse_command(&args(&["check-address", "k:abc"])).unwrap(),
            Some(Command::CheckAddress("k:abc".to_string()))
        );
    }

    #[test]
    fn test_parse_command_errors() {
        assert!(parse_command(&args(&["frobnicate"])).is_err());
        assert!(parse_command(&args(&["create", "--force"])).is_err());
        assert!(parse_command(&args(&["forget", "--expect", "k:abc"])).is_err());
        assert!(parse_command(&args(&["unlock", "--expect"])).is_err());
        assert!(parse_command(&args(&["check-address"])).is_err());
        assert!(parse_command(&args(&["unlock", "--bogus"])).is_err());
    }

    #[test]
    fn test_parse_expect() {
        assert!(parse_expect(None).unwrap().is_none());
        assert!(parse_expect(Some("alice".to_string())).is_err());
        let address = format!("k:{}", "0".repeat(64));
        assert_eq!(
            parse_expect(Some(address.clone())).unwrap().unwrap().as_str(),
            address
        );
    }
}
