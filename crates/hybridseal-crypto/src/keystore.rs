//! Persistence of key, nonce and ciphertext material.
//!
//! Every write goes to a temporary file in the destination directory, is
//! fsynced, and is then renamed over the destination, so readers only ever
//! see a complete old file or a complete new one. [`stage`] + [`commit`] let a
//! caller prepare several artifacts before any of them replaces its
//! predecessor.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use zeroize::Zeroizing;

use crate::asymmetric::{PrivateKey, PublicKey};
use crate::error::CryptoError;
use crate::passphrase::{self, KdfParams, Passphrase};
use crate::symmetric::Nonce;

/// How an artifact's file permissions are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensitivity {
    /// World-readable (0644 on Unix): public keys, ciphertext, nonces.
    Public,
    /// Owner-only (0600 on Unix): private keys, wrapped keys, decrypted output.
    Secret,
}

/// A fully written temporary file waiting to be renamed into place.
#[derive(Debug)]
pub struct StagedFile {
    temp: NamedTempFile,
    destination: PathBuf,
}

impl StagedFile {
    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Write `bytes` to a temporary sibling of `path` without touching `path` itself.
pub fn stage(path: &Path, bytes: &[u8], sensitivity: Sensitivity) -> Result<StagedFile, CryptoError> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = match sensitivity {
            Sensitivity::Public => 0o644,
            Sensitivity::Secret => 0o600,
        };
        temp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = sensitivity;

    Ok(StagedFile {
        temp,
        destination: path.to_path_buf(),
    })
}

/// Rename every staged file over its destination, in order.
pub fn commit(staged: Vec<StagedFile>) -> Result<(), CryptoError> {
    for file in staged {
        file.temp
            .persist(&file.destination)
            .map_err(|e| CryptoError::IoError(e.error))?;
    }
    Ok(())
}

/// Atomically replace `path` with `bytes`.
pub fn write(path: &Path, bytes: &[u8], sensitivity: Sensitivity) -> Result<(), CryptoError> {
    commit(vec![stage(path, bytes, sensitivity)?])
}

pub fn read(path: &Path) -> Result<Vec<u8>, CryptoError> {
    Ok(std::fs::read(path)?)
}

pub fn read_to_string(path: &Path) -> Result<String, CryptoError> {
    Ok(std::fs::read_to_string(path)?)
}

/// Encode a nonce for [`stage`]/[`write`].
pub fn encode_nonce(nonce: &Nonce) -> Vec<u8> {
    nonce.to_bytes().to_vec()
}

pub fn write_nonce(path: &Path, nonce: &Nonce) -> Result<(), CryptoError> {
    write(path, &encode_nonce(nonce), Sensitivity::Public)
}

pub fn read_nonce(path: &Path) -> Result<Nonce, CryptoError> {
    Nonce::from_bytes(&read(path)?)
}

/// PEM text for a private key, sealed under `protection` when given.
pub fn encode_private_key(
    key: &PrivateKey,
    protection: Option<(&Passphrase, KdfParams)>,
) -> Result<Zeroizing<String>, CryptoError> {
    match protection {
        None => key.to_pem(),
        Some((passphrase, params)) => passphrase::seal(&key.to_der()?, passphrase, params),
    }
}

/// Decode PEM text produced by [`encode_private_key`].
pub fn decode_private_key(
    pem: &str,
    passphrase: Option<&Passphrase>,
) -> Result<PrivateKey, CryptoError> {
    if passphrase::is_sealed(pem) {
        let passphrase = passphrase.ok_or(CryptoError::PassphraseRequired)?;
        let der = passphrase::open(pem, passphrase)?;
        PrivateKey::from_der(&der)
    } else {
        PrivateKey::from_pem(pem)
    }
}

pub fn write_private_key(
    path: &Path,
    key: &PrivateKey,
    protection: Option<(&Passphrase, KdfParams)>,
) -> Result<(), CryptoError> {
    let pem = encode_private_key(key, protection)?;
    write(path, pem.as_bytes(), Sensitivity::Secret)
}

/// Load a private key.
///
/// On Unix, refuses files readable by group or others.
pub fn read_private_key(path: &Path, passphrase: Option<&Passphrase>) -> Result<PrivateKey, CryptoError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(path)?.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            return Err(CryptoError::IoError(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!(
                    "Private key file {} has insecure permissions: {mode:o} (expected 600)",
                    path.display()
                ),
            )));
        }
    }

    let pem = Zeroizing::new(read_to_string(path)?);
    decode_private_key(&pem, passphrase)
}

pub fn write_public_key(path: &Path, key: &PublicKey) -> Result<(), CryptoError> {
    write(path, key.to_pem()?.as_bytes(), Sensitivity::Public)
}

pub fn read_public_key(path: &Path) -> Result<PublicKey, CryptoError> {
    PublicKey::from_pem(&read_to_string(path)?)
}
