//! Wallet commands: each one drives a [`Wallet`] through a [`Terminal`].
//!
//! Secrets read from the terminal are held in `Zeroizing` buffers and
//! dropped as soon as the wallet call returns.

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use zeroize::Zeroizing;

use aegen_core::keys::Address;
use aegen_core::password::PasswordStrength;
use aegen_core::seed;
use aegen_core::store::VaultStore;
use aegen_core::wallet::{Integrity, UnlockedWallet, Wallet, WalletError};

/// Line-oriented user interaction.
pub trait Terminal {
    /// Print a line.
    fn say(&mut self, text: &str) -> Result<()>;

    /// Print `prompt` and read one line, without its line terminator.
    fn ask(&mut self, prompt: &str) -> Result<Zeroizing<String>>;

    /// Like [`Terminal::ask`], but the answer is not echoed.
    fn ask_secret(&mut self, prompt: &str) -> Result<Zeroizing<String>>;
}

/// A [`Terminal`] over any reader/writer pair (stdin/stdout in the binary).
pub struct LineTerminal<R, W> {
    input: R,
    output: W,
    hide_secrets: bool,
}

impl<R: BufRead, W: Write> LineTerminal<R, W> {
    /// Secrets are read from `input` like any other line.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            hide_secrets: false,
        }
    }

    /// Secrets are read from the controlling terminal with echo turned off.
    pub fn interactive(input: R, output: W) -> Self {
        Self {
            input,
            output,
            hide_secrets: true,
        }
    }
}

impl<R: BufRead, W: Write> Terminal for LineTerminal<R, W> {
    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    fn ask(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        write!(self.output, "{} ", prompt)?;
        self.output.flush()?;

        let mut line = Zeroizing::new(String::new());
        let read = self.input.read_line(&mut line)?;
        if read == 0 {
            bail!("Input closed while waiting for: {}", prompt.trim_end_matches(':'));
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }

    fn ask_secret(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        if !self.hide_secrets {
            return self.ask(prompt);
        }
        self.output.flush()?;
        let secret = rpassword::prompt_password(format!("{} ", prompt))
            .with_context(|| format!("Failed to read {}", prompt.trim_end_matches(':')))?;
        Ok(Zeroizing::new(secret))
    }
}

/// Backup rounds offered before `create` gives up
const BACKUP_ATTEMPTS: usize = 3;

// ============================================================================
// Commands
// ============================================================================

/// Generate a phrase, confirm the backup, seal and store.
pub fn create<S: VaultStore>(wallet: &Wallet<S>, term: &mut impl Terminal) -> Result<()> {
    if wallet.has_vault()? {
        bail!("A vault already exists. Run `forget` first or use `import --force`.");
    }

    let password = term.ask_secret("New vault password:")?;
    let confirm = term.ask_secret("Confirm password:")?;
    let pending = wallet.begin_create(&password, &confirm)?;
    report_strength(term, pending.password_analysis().strength, &pending.password_analysis().warnings)?;

    term.say("")?;
    term.say("Write down your recovery phrase. It is the only way to restore this wallet.")?;
    term.say("")?;
    let words: Vec<&str> = pending.mnemonic().words().collect();
    for (i, word) in words.iter().enumerate() {
        term.say(&format!("{:>2}. {}", i + 1, word))?;
    }
    term.say("")?;

    for attempt in 1..=BACKUP_ATTEMPTS {
        let mut answers = Vec::with_capacity(pending.challenge().positions().len());
        for position in pending.challenge().positions() {
            answers.push(term.ask(&format!("Word #{}:", position + 1))?);
        }
        let answers: Vec<&str> = answers.iter().map(|a| a.as_str()).collect();

        match wallet.finish_create(&pending, &answers) {
            Ok(unlocked) => {
                term.say(&format!("Wallet created: {}", unlocked.address()))?;
                return Ok(());
            }
            Err(WalletError::BackupNotConfirmed) if attempt < BACKUP_ATTEMPTS => {
                term.say("Those words do not match the phrase. Check your copy and try again.")?;
            }
            Err(WalletError::BackupNotConfirmed) => break,
            Err(e) => return Err(e.into()),
        }
    }

    bail!("Those words do not match the phrase. Nothing was saved; run `create` again.")
}

/// Import a phrase, hex seed or raw secret.
pub fn import<S: VaultStore>(
    wallet: &Wallet<S>,
    term: &mut impl Terminal,
    overwrite: bool,
) -> Result<()> {
    let input = term.ask("Recovery phrase, seed hex or secret:")?;
    if seed::is_mnemonic_shaped(input.trim()) {
        // Reject typos before asking for a password
        seed::parse_mnemonic(&input).context("Recovery phrase rejected")?;
    }

    let password = term.ask_secret("New vault password:")?;
    let confirm = term.ask_secret("Confirm password:")?;
    let unlocked = wallet
        .import(&input, &password, &confirm, overwrite)
        .map_err(|e| match e {
            WalletError::VaultExists => {
                anyhow::anyhow!("A vault already exists. Use `import --force` to replace it.")
            }
            other => other.into(),
        })?;

    term.say(&format!("Wallet imported: {}", unlocked.address()))?;
    Ok(())
}

/// Unlock the vault and print the address.
pub fn unlock<S: VaultStore>(
    wallet: &Wallet<S>,
    term: &mut impl Terminal,
    expected: Option<&Address>,
) -> Result<()> {
    let unlocked = open_wallet(wallet, term, expected)?;
    term.say(&format!("Address: {}", unlocked.address()))?;
    Ok(())
}

/// Unlock the vault and print the private key.
pub fn export_key<S: VaultStore>(
    wallet: &Wallet<S>,
    term: &mut impl Terminal,
    expected: Option<&Address>,
) -> Result<()> {
    let unlocked = open_wallet(wallet, term, expected)?;
    if unlocked.integrity() == Integrity::Unverified {
        bail!("Refusing to export a key that could not be verified. Pass --expect <ADDRESS>.");
    }

    term.say(&format!("Address:     {}", unlocked.address()))?;
    term.say(&format!("Public key:  {}", unlocked.keypair().public_key_hex()))?;
    let private_key = unlocked.keypair().private_key_hex();
    term.say(&format!("Private key: {}", private_key.as_str()))?;
    Ok(())
}

/// Re-seal the vault under a new password.
pub fn change_password<S: VaultStore>(
    wallet: &Wallet<S>,
    term: &mut impl Terminal,
    expected: Option<&Address>,
) -> Result<()> {
    let current = term.ask_secret("Current password:")?;
    let new_password = term.ask_secret("New password:")?;
    let confirm = term.ask_secret("Confirm new password:")?;

    let unlocked = wallet
        .change_password(&current, &new_password, &confirm, expected)
        .map_err(explain)?;
    term.say(&format!("Password changed for {}", unlocked.address()))?;
    Ok(())
}

/// Delete the stored vault after an explicit confirmation.
pub fn forget<S: VaultStore>(wallet: &Wallet<S>, term: &mut impl Terminal) -> Result<()> {
    if !wallet.has_vault()? {
        term.say("No vault stored.")?;
        return Ok(());
    }

    term.say("This deletes the vault. Without the recovery phrase the funds are lost.")?;
    let answer = term.ask("Type 'forget' to confirm:")?;
    if answer.trim() != "forget" {
        bail!("Not confirmed; vault kept.");
    }

    wallet.forget()?;
    term.say("Vault deleted.")?;
    Ok(())
}

/// Validate a phrase without storing anything.
pub fn check_phrase(term: &mut impl Terminal) -> Result<()> {
    let phrase = term.ask("Recovery phrase:")?;
    match seed::parse_mnemonic(&phrase) {
        Ok(_) => term.say("Valid recovery phrase."),
        Err(e) => bail!("{}", e),
    }
}

/// Validate an address.
pub fn check_address(term: &mut impl Terminal, address: &str) -> Result<()> {
    let address = Address::parse(address)?;
    term.say(&format!("Valid address: {}", address))
}

// ============================================================================
// Helpers
// ============================================================================

fn open_wallet<S: VaultStore>(
    wallet: &Wallet<S>,
    term: &mut impl Terminal,
    expected: Option<&Address>,
) -> Result<UnlockedWallet> {
    let password = term.ask_secret("Vault password:")?;
    let unlocked = wallet.unlock(&password, expected).map_err(explain)?;

    match unlocked.integrity() {
        Integrity::Tagged => {}
        Integrity::AddressMatched => {
            term.say("Legacy vault verified against the expected address and upgraded.")?;
        }
        Integrity::Unverified => {
            term.say("Warning: this vault predates password checking. If the address")?;
            term.say("below is not yours, the password was wrong. Re-run with --expect <ADDRESS>.")?;
        }
    }
    Ok(unlocked)
}

fn explain(e: WalletError) -> anyhow::Error {
    match e {
        WalletError::NoVault => anyhow::anyhow!("No vault stored. Run `create` or `import` first."),
        e if e.is_wrong_password() => anyhow::anyhow!("Incorrect password"),
        e => e.into(),
    }
}

fn report_strength(term: &mut impl Terminal, strength: PasswordStrength, warnings: &[String]) -> Result<()> {
    if strength == PasswordStrength::Strong {
        return Ok(());
    }
    term.say(&format!("Password strength: {}", strength.label()))?;
    for warning in warnings {
        term.say(&format!("  - {}", warning))?;
    }
    Ok(())
}
