//! Named file artifacts and their locations.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Every file `hybridseal` reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    PrivateKey,
    PublicKey,
    WrappedKey,
    Nonce,
    Plaintext,
    Ciphertext,
    Decrypted,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PrivateKey => "private key",
            Self::PublicKey => "public key",
            Self::WrappedKey => "wrapped symmetric key",
            Self::Nonce => "nonce",
            Self::Plaintext => "plaintext input",
            Self::Ciphertext => "ciphertext",
            Self::Decrypted => "decrypted output",
        };
        f.write_str(name)
    }
}

/// File locations for one key set and its data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
    pub wrapped_key: PathBuf,
    pub nonce: PathBuf,
    pub plaintext: PathBuf,
    pub ciphertext: PathBuf,
    pub decrypted: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            private_key: PathBuf::from("keys/private.pem"),
            public_key: PathBuf::from("keys/public.pem"),
            wrapped_key: PathBuf::from("keys/symmetric.key"),
            nonce: PathBuf::from("keys/nonce.bin"),
            plaintext: PathBuf::from("data/plain.txt"),
            ciphertext: PathBuf::from("data/encrypted.bin"),
            decrypted: PathBuf::from("data/decrypted.txt"),
        }
    }
}

impl ArtifactPaths {
    /// All artifacts placed under `dir` with their default file names.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            private_key: dir.join("private.pem"),
            public_key: dir.join("public.pem"),
            wrapped_key: dir.join("symmetric.key"),
            nonce: dir.join("nonce.bin"),
            plaintext: dir.join("plain.txt"),
            ciphertext: dir.join("encrypted.bin"),
            decrypted: dir.join("decrypted.txt"),
        }
    }

    pub fn get(&self, artifact: Artifact) -> &Path {
        match artifact {
            Artifact::PrivateKey => &self.private_key,
            Artifact::PublicKey => &self.public_key,
            Artifact::WrappedKey => &self.wrapped_key,
            Artifact::Nonce => &self.nonce,
            Artifact::Plaintext => &self.plaintext,
            Artifact::Ciphertext => &self.ciphertext,
            Artifact::Decrypted => &self.decrypted,
        }
    }

    /// Path of `artifact`, or `PrerequisiteMissing` if it is not a readable file.
    pub fn require(&self, artifact: Artifact) -> Result<&Path> {
        let path = self.get(artifact);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::PrerequisiteMissing {
                artifact,
                path: path.to_path_buf(),
            })
        }
    }

    /// Check several artifacts at once, reporting the first missing one.
    pub fn require_all(&self, artifacts: &[Artifact]) -> Result<()> {
        for &artifact in artifacts {
            self.require(artifact)?;
        }
        Ok(())
    }

    /// Lock file guarding this path set: `<wrapped key>.lock`.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.wrapped_key.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }
}
