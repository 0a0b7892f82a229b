//! `hybridseal` command-line front-end.
//!
//! Result lines are written to the caller-supplied writer (stdout in the
//! binary); logs go to stderr through `tracing`.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use hybridseal_core::{Config, ErrorKind, HybridOrchestrator};
use hybridseal_crypto::{CipherSuite, CryptoError, Passphrase};

#[derive(Parser, Debug)]
#[command(name = "hybridseal")]
#[command(
    version,
    about = "Envelope encryption: ChaCha20 data key wrapped under RSA-OAEP",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub mode: Mode,

    #[command(flatten)]
    pub overrides: Overrides,
}

/// Operating mode. Exactly one per invocation.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Generate an RSA keypair and a wrapped symmetric key (replaces existing keys)
    #[command(visible_alias = "keys")]
    GenerateKeys,
    /// Encrypt the plaintext file
    #[command(visible_alias = "enc")]
    Encrypt,
    /// Decrypt the ciphertext file
    #[command(visible_alias = "dec")]
    Decrypt,
}

/// Flags that override the resolved configuration.
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Settings file layered over the global one
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_name = "FILE")]
    pub private_key: Option<PathBuf>,

    #[arg(long, global = true, value_name = "FILE")]
    pub public_key: Option<PathBuf>,

    /// RSA-wrapped symmetric key
    #[arg(long, global = true, value_name = "FILE")]
    pub wrapped_key: Option<PathBuf>,

    #[arg(long, global = true, value_name = "FILE")]
    pub nonce: Option<PathBuf>,

    #[arg(long, global = true, value_name = "FILE")]
    pub plaintext: Option<PathBuf>,

    #[arg(long, global = true, value_name = "FILE")]
    pub ciphertext: Option<PathBuf>,

    /// Output of `decrypt`
    #[arg(long, global = true, value_name = "FILE")]
    pub decrypted: Option<PathBuf>,

    /// RSA modulus size for `generate-keys`
    #[arg(long, global = true)]
    pub rsa_bits: Option<usize>,

    /// Bulk cipher: chacha20 or chacha20-poly1305
    #[arg(long, global = true)]
    pub cipher: Option<CipherSuite>,

    /// Seals the private key on `generate-keys` and opens it on use
    #[arg(long, global = true, env = "HYBRIDSEAL_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<Passphrase>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

impl Overrides {
    /// Apply CLI flags, the highest-priority configuration layer.
    pub fn apply(&self, config: &mut Config) {
        let paths = &mut config.paths;
        for (flag, slot) in [
            (&self.private_key, &mut paths.private_key),
            (&self.public_key, &mut paths.public_key),
            (&self.wrapped_key, &mut paths.wrapped_key),
            (&self.nonce, &mut paths.nonce),
            (&self.plaintext, &mut paths.plaintext),
            (&self.ciphertext, &mut paths.ciphertext),
            (&self.decrypted, &mut paths.decrypted),
        ] {
            if let Some(path) = flag {
                slot.clone_from(path);
            }
        }
        if let Some(bits) = self.rsa_bits {
            config.keys.rsa_bits = bits;
        }
        if let Some(cipher) = self.cipher {
            config.keys.cipher = cipher;
        }
        if self.log_json {
            config.logging.json = true;
        }
    }
}

/// Resolve defaults, settings files, environment and flags into one config.
pub fn resolve_config(overrides: &Overrides) -> hybridseal_core::Result<Config> {
    let mut config = hybridseal_core::config::load_config(overrides.config.as_deref())?;
    overrides.apply(&mut config);
    Ok(config)
}

/// Process exit code for an error kind.
pub const fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::KeyGeneration => 3,
        ErrorKind::PayloadTooLarge => 4,
        ErrorKind::Decryption => 5,
        ErrorKind::PrerequisiteMissing => 6,
        ErrorKind::Io => 7,
        ErrorKind::Serialization => 8,
        ErrorKind::Config => 9,
        ErrorKind::Encryption => 10,
    }
}

/// Exit code for an error surfaced by [`execute`], looking through any context.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    if let Some(e) = err.downcast_ref::<hybridseal_core::Error>() {
        exit_code(e.kind())
    } else if let Some(e) = err.downcast_ref::<CryptoError>() {
        exit_code(e.kind())
    } else {
        1
    }
}

/// Run one mode against `config`, writing human-readable results to `out`.
pub fn execute(
    mode: Mode,
    config: &Config,
    passphrase: Option<Passphrase>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut config = config.clone();
    // A passphrase given at generation time means the key should be sealed.
    if mode == Mode::GenerateKeys && passphrase.is_some() {
        config.keys.encrypt_private_key = true;
    }
    let orchestrator = HybridOrchestrator::from_config(&config, passphrase)
        .context("Invalid configuration")?;

    match mode {
        Mode::GenerateKeys => {
            let ring = orchestrator
                .generate_keys()
                .context("Key generation failed")?;
            writeln!(out, "Generated key set")?;
            writeln!(out, "  private key: {}", ring.private_key.display())?;
            writeln!(out, "  public key:  {}", ring.public_key.display())?;
            writeln!(out, "  wrapped key: {}", ring.wrapped_key.display())?;
            if let Some(fp) = &ring.fingerprint {
                writeln!(out, "  fingerprint: {fp}")?;
            }
        }
        Mode::Encrypt => {
            let report = orchestrator.encrypt_text().context("Encryption failed")?;
            writeln!(out, "{report}")?;
            writeln!(out, "  nonce: {}", orchestrator.paths().nonce.display())?;
        }
        Mode::Decrypt => {
            let report = orchestrator.decrypt_text().context("Decryption failed")?;
            writeln!(out, "{report}")?;
        }
    }
    Ok(())
}
