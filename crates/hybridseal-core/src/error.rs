//! Error types for the `hybridseal` core library.

use std::path::PathBuf;

use hybridseal_crypto::CryptoError;
use thiserror::Error;

use crate::paths::Artifact;
use crate::session::SessionState;

pub use hybridseal_crypto::ErrorKind;

/// Result type alias using the core [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `hybridseal` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Failure inside a crypto engine or the key store
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A file an operation depends on does not exist
    #[error("Missing {artifact} at {}", path.display())]
    PrerequisiteMissing { artifact: Artifact, path: PathBuf },

    /// An operation was attempted from the wrong session state
    #[error("Operation requires session state {expected}, but session is {actual}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Crypto(e) => e.kind(),
            Self::PrerequisiteMissing { .. } | Self::InvalidState { .. } => {
                ErrorKind::PrerequisiteMissing
            }
            Self::Config(_) => ErrorKind::Config,
            Self::Json(_) => ErrorKind::Serialization,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}
