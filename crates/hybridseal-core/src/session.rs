//! Session lifecycle.
//!
//! `Uninitialized → KeysReady → SessionActive(op) → Complete(op)`. Each state
//! that carries material has its own type: [`KeyRing`] for persisted keys,
//! [`ActiveSession`] for an unwrapped symmetric key. Steps taken from the
//! wrong state fail with [`Error::InvalidState`].

use std::fmt;
use std::path::PathBuf;

use hybridseal_crypto::{CipherSuite, Nonce, SymmetricKey, symmetric};

use crate::error::{Error, Result};

/// What an active session was opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Encrypt,
    Decrypt,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encrypt => write!(f, "encrypt"),
            Self::Decrypt => write!(f, "decrypt"),
        }
    }
}

/// Material-free view of a [`Session`], used in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    KeysReady,
    SessionActive(Operation),
    Complete(Operation),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::KeysReady => write!(f, "KeysReady"),
            Self::SessionActive(op) => write!(f, "SessionActive({op})"),
            Self::Complete(op) => write!(f, "Complete({op})"),
        }
    }
}

/// Locations of a persisted key set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRing {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
    pub wrapped_key: PathBuf,
    /// Public-key fingerprint, when the public key is present.
    pub fingerprint: Option<String>,
}

/// An unwrapped symmetric key bound to one operation.
#[derive(Debug)]
pub struct ActiveSession {
    operation: Operation,
    suite: CipherSuite,
    key: SymmetricKey,
}

impl ActiveSession {
    pub(crate) const fn new(operation: Operation, suite: CipherSuite, key: SymmetricKey) -> Self {
        Self {
            operation,
            suite,
            key,
        }
    }

    pub const fn operation(&self) -> Operation {
        self.operation
    }

    pub const fn suite(&self) -> CipherSuite {
        self.suite
    }

    fn ensure_operation(&self, operation: Operation) -> Result<()> {
        if self.operation == operation {
            Ok(())
        } else {
            Err(Error::InvalidState {
                expected: SessionState::SessionActive(operation),
                actual: SessionState::SessionActive(self.operation),
            })
        }
    }

    /// Encrypt under a fresh nonce. Only valid in an encrypt session.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<(Nonce, Vec<u8>)> {
        self.ensure_operation(Operation::Encrypt)?;
        Ok(symmetric::encrypt(self.suite, &self.key, plaintext)?)
    }

    /// Decrypt with the nonce stored by the encrypting session.
    pub fn decrypt(&self, nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.ensure_operation(Operation::Decrypt)?;
        Ok(symmetric::decrypt(self.suite, &self.key, nonce, ciphertext)?)
    }
}

#[derive(Debug, Default)]
pub enum Session {
    #[default]
    Uninitialized,
    KeysReady(KeyRing),
    Active(ActiveSession),
    Complete(Operation),
}

impl Session {
    pub const fn state(&self) -> SessionState {
        match self {
            Self::Uninitialized => SessionState::Uninitialized,
            Self::KeysReady(_) => SessionState::KeysReady,
            Self::Active(active) => SessionState::SessionActive(active.operation),
            Self::Complete(op) => SessionState::Complete(*op),
        }
    }

    /// The active session, or `InvalidState` if none is open.
    pub fn active(&self, operation: Operation) -> Result<&ActiveSession> {
        match self {
            Self::Active(active) => {
                active.ensure_operation(operation)?;
                Ok(active)
            }
            other => Err(Error::InvalidState {
                expected: SessionState::SessionActive(operation),
                actual: other.state(),
            }),
        }
    }

    /// Close an active session, dropping (and zeroizing) its key.
    pub fn complete(self) -> Result<Self> {
        match self {
            Self::Active(active) => Ok(Self::Complete(active.operation)),
            other => Err(Error::InvalidState {
                expected: SessionState::SessionActive(Operation::Encrypt),
                actual: other.state(),
            }),
        }
    }
}
