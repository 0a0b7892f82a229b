//! Crypto error types.

use std::fmt;

/// Broad failure category shared by every `hybridseal` layer.
///
/// The CLI maps each kind to its own exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    KeyGeneration,
    PayloadTooLarge,
    Decryption,
    PrerequisiteMissing,
    Io,
    Serialization,
    Config,
    Encryption,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::KeyGeneration => "key generation",
            Self::PayloadTooLarge => "payload too large",
            Self::Decryption => "decryption",
            Self::PrerequisiteMissing => "prerequisite missing",
            Self::Io => "io",
            Self::Serialization => "serialization",
            Self::Config => "config",
            Self::Encryption => "encryption",
        };
        f.write_str(name)
    }
}

/// Errors from cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Payload of {actual} bytes exceeds the {max}-byte limit of this key")]
    PayloadTooLarge { max: usize, actual: usize },

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Deliberately carries no detail: wrong key, corrupted ciphertext and
    /// bad padding must be indistinguishable to the caller.
    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Private key is passphrase-protected but no passphrase was supplied")]
    PassphraseRequired,

    #[error("Nonce counter exhausted, generate a new symmetric key")]
    NonceExhausted,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CryptoError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::KeyGeneration(_) | Self::KeyDerivationFailed(_) => ErrorKind::KeyGeneration,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::EncryptionFailed(_) | Self::NonceExhausted => ErrorKind::Encryption,
            Self::DecryptionFailed => ErrorKind::Decryption,
            Self::InvalidKeyLength { .. }
            | Self::InvalidNonceLength { .. }
            | Self::SerializationError(_) => ErrorKind::Serialization,
            Self::PassphraseRequired => ErrorKind::PrerequisiteMissing,
            Self::IoError(_) => ErrorKind::Io,
        }
    }
}
