//! Hybrid orchestration: key generation, encryption and decryption of the
//! configured artifact set.
//!
//! Every public operation holds the path-set lock for its whole duration and
//! persists its outputs through staged writes, so a failure part-way leaves
//! the previous artifacts in place.

use std::fmt;
use std::path::{Path, PathBuf};

use hybridseal_crypto::{
    CryptoError, KdfParams, Keypair, Passphrase, Sensitivity, asymmetric, keystore,
    symmetric,
};
use tracing::{debug, info, warn};

use crate::config::{Config, KeyConfig};
use crate::error::{Error, Result};
use crate::lock::PathSetLock;
use crate::paths::{Artifact, ArtifactPaths};
use crate::session::{ActiveSession, KeyRing, Operation, Session, SessionState};

/// Outcome of a completed encrypt or decrypt run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub operation: Operation,
    /// File the result was written to.
    pub output: PathBuf,
    /// Length of the written result.
    pub bytes: usize,
    pub fingerprint: Option<String>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.operation {
            Operation::Encrypt => "Encrypted",
            Operation::Decrypt => "Decrypted",
        };
        write!(f, "{verb} {} bytes -> {}", self.bytes, self.output.display())
    }
}

/// Drives the session lifecycle over one [`ArtifactPaths`] set.
#[derive(Debug, Clone)]
pub struct HybridOrchestrator {
    paths: ArtifactPaths,
    keys: KeyConfig,
    passphrase: Option<Passphrase>,
}

impl HybridOrchestrator {
    pub fn new(paths: ArtifactPaths, keys: KeyConfig) -> Self {
        Self {
            paths,
            keys,
            passphrase: None,
        }
    }

    /// Passphrase used to seal the private key on generation and to open it on use.
    #[must_use]
    pub fn with_passphrase(mut self, passphrase: Passphrase) -> Self {
        self.passphrase = Some(passphrase);
        self
    }

    /// Build from a resolved configuration, validating it first.
    pub fn from_config(config: &Config, passphrase: Option<Passphrase>) -> Result<Self> {
        config.validate()?;
        let orchestrator = Self::new(config.paths.clone(), config.keys.clone());
        Ok(match passphrase {
            Some(p) => orchestrator.with_passphrase(p),
            None => orchestrator,
        })
    }

    pub const fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    fn lock(&self) -> Result<PathSetLock> {
        PathSetLock::acquire(&self.paths.lock_path())
    }

    fn protection(&self) -> Result<Option<(&Passphrase, KdfParams)>> {
        if !self.keys.encrypt_private_key {
            return Ok(None);
        }
        match &self.passphrase {
            Some(p) if !p.is_empty() => Ok(Some((p, self.keys.kdf))),
            _ => Err(Error::Config(
                "keys.encrypt_private_key is set but no passphrase was provided".into(),
            )),
        }
    }

    /// Generate a fresh keypair and symmetric key and persist all three artifacts.
    ///
    /// Destructive: any existing key set at the configured paths is replaced,
    /// and data encrypted under it can no longer be decrypted.
    pub fn generate_keys(&self) -> Result<KeyRing> {
        let protection = self.protection()?;
        let _lock = self.lock()?;

        let existing: Vec<Artifact> = [Artifact::PrivateKey, Artifact::PublicKey, Artifact::WrappedKey]
            .into_iter()
            .filter(|a| self.paths.get(*a).exists())
            .collect();
        if !existing.is_empty() {
            warn!(
                artifacts = ?existing,
                "Overwriting existing key material; data encrypted under it becomes unrecoverable"
            );
        }

        let symmetric_key = symmetric::generate_key(self.keys.symmetric_bits)?;
        let keypair = Keypair::generate(self.keys.rsa_bits)?;
        let wrapped = asymmetric::wrap_key(keypair.public(), &symmetric_key)?;
        let fingerprint = keypair.public().fingerprint()?;

        let private_pem = keystore::encode_private_key(keypair.private(), protection)?;
        let public_pem = keypair.public().to_pem()?;

        let staged = vec![
            keystore::stage(&self.paths.private_key, private_pem.as_bytes(), Sensitivity::Secret)?,
            keystore::stage(&self.paths.public_key, public_pem.as_bytes(), Sensitivity::Public)?,
            keystore::stage(&self.paths.wrapped_key, &wrapped, Sensitivity::Secret)?,
        ];
        keystore::commit(staged)?;

        info!(
            private_key = %self.paths.private_key.display(),
            public_key = %self.paths.public_key.display(),
            wrapped_key = %self.paths.wrapped_key.display(),
            rsa_bits = self.keys.rsa_bits,
            sealed = protection.is_some(),
            %fingerprint,
            "Generated key set"
        );
        debug!(state = %SessionState::KeysReady, "Session transition");

        Ok(KeyRing {
            private_key: self.paths.private_key.clone(),
            public_key: self.paths.public_key.clone(),
            wrapped_key: self.paths.wrapped_key.clone(),
            fingerprint: Some(fingerprint),
        })
    }

    /// Reconstruct `KeysReady` from the persisted key set.
    pub fn open(&self) -> Result<KeyRing> {
        let _lock = self.lock()?;
        self.load_keyring()
    }

    fn load_keyring(&self) -> Result<KeyRing> {
        self.paths
            .require_all(&[Artifact::PrivateKey, Artifact::WrappedKey])?;

        let fingerprint = self.public_fingerprint();
        debug!(state = %SessionState::KeysReady, "Session transition");

        Ok(KeyRing {
            private_key: self.paths.private_key.clone(),
            public_key: self.paths.public_key.clone(),
            wrapped_key: self.paths.wrapped_key.clone(),
            fingerprint,
        })
    }

    /// Fingerprint of the public key for logs. The public key is not needed to
    /// encrypt or decrypt, so an unreadable one only costs the fingerprint.
    fn public_fingerprint(&self) -> Option<String> {
        let path = &self.paths.public_key;
        if !path.is_file() {
            return None;
        }
        match keystore::read_public_key(path).and_then(|key| key.fingerprint()) {
            Ok(fingerprint) => Some(fingerprint),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable public key");
                None
            }
        }
    }

    /// Load the private key and unwrap the symmetric key for `operation`.
    pub fn unlock(&self, ring: &KeyRing, operation: Operation) -> Result<ActiveSession> {
        let private = keystore::read_private_key(&ring.private_key, self.passphrase.as_ref())?;
        let wrapped = keystore::read(&ring.wrapped_key)?;
        let key = asymmetric::unwrap_key(&private, &wrapped)?;
        Ok(ActiveSession::new(operation, self.keys.cipher, key))
    }

    /// Move a `KeysReady` session into `SessionActive(operation)`.
    pub fn activate(&self, session: Session, operation: Operation) -> Result<Session> {
        match session {
            Session::KeysReady(ring) => {
                let active = self.unlock(&ring, operation)?;
                debug!(state = %SessionState::SessionActive(operation), "Session transition");
                Ok(Session::Active(active))
            }
            other => Err(Error::InvalidState {
                expected: SessionState::KeysReady,
                actual: other.state(),
            }),
        }
    }

    /// Encrypt the plaintext file, writing the nonce and ciphertext.
    pub fn encrypt_text(&self) -> Result<Report> {
        // Checked before locking so a missing key set leaves no lock file behind.
        self.paths.require_all(&[
            Artifact::PrivateKey,
            Artifact::WrappedKey,
            Artifact::Plaintext,
        ])?;
        let _lock = self.lock()?;

        let ring = self.load_keyring()?;
        let session = self.activate(Session::KeysReady(ring.clone()), Operation::Encrypt)?;

        let plaintext = read_utf8(&self.paths.plaintext)?;
        let (nonce, ciphertext) = session
            .active(Operation::Encrypt)?
            .encrypt(plaintext.as_bytes())?;

        let staged = vec![
            keystore::stage(
                &self.paths.nonce,
                &keystore::encode_nonce(&nonce),
                Sensitivity::Public,
            )?,
            keystore::stage(&self.paths.ciphertext, &ciphertext, Sensitivity::Public)?,
        ];
        keystore::commit(staged)?;

        let session = session.complete()?;
        debug!(state = %session.state(), "Session transition");
        info!(
            plaintext = %self.paths.plaintext.display(),
            ciphertext = %self.paths.ciphertext.display(),
            nonce = %self.paths.nonce.display(),
            bytes = ciphertext.len(),
            fingerprint = ring.fingerprint.as_deref().unwrap_or("-"),
            "Encrypted plaintext"
        );

        Ok(Report {
            operation: Operation::Encrypt,
            output: self.paths.ciphertext.clone(),
            bytes: ciphertext.len(),
            fingerprint: ring.fingerprint,
        })
    }

    /// Decrypt the ciphertext file with the stored nonce.
    ///
    /// Under the unauthenticated suite a mismatched key set produces garbage
    /// output rather than an error.
    pub fn decrypt_text(&self) -> Result<Report> {
        self.paths.require_all(&[
            Artifact::PrivateKey,
            Artifact::WrappedKey,
            Artifact::Nonce,
            Artifact::Ciphertext,
        ])?;
        let _lock = self.lock()?;

        let ring = self.load_keyring()?;
        let session = self.activate(Session::KeysReady(ring.clone()), Operation::Decrypt)?;

        let nonce = keystore::read_nonce(&self.paths.nonce)?;
        let ciphertext = keystore::read(&self.paths.ciphertext)?;
        let plaintext = session
            .active(Operation::Decrypt)?
            .decrypt(&nonce, &ciphertext)?;

        keystore::write(&self.paths.decrypted, &plaintext, Sensitivity::Secret)?;

        let session = session.complete()?;
        debug!(state = %session.state(), "Session transition");
        info!(
            ciphertext = %self.paths.ciphertext.display(),
            decrypted = %self.paths.decrypted.display(),
            bytes = plaintext.len(),
            fingerprint = ring.fingerprint.as_deref().unwrap_or("-"),
            "Decrypted ciphertext"
        );

        Ok(Report {
            operation: Operation::Decrypt,
            output: self.paths.decrypted.clone(),
            bytes: plaintext.len(),
            fingerprint: ring.fingerprint,
        })
    }
}

fn read_utf8(path: &Path) -> Result<String> {
    let bytes = keystore::read(path)?;
    String::from_utf8(bytes).map_err(|e| {
        Error::Crypto(CryptoError::SerializationError(format!(
            "{} is not valid UTF-8: {e}",
            path.display()
        )))
    })
}
