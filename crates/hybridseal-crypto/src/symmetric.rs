//! Symmetric layer for bulk data.
//!
//! Generates per-session 256-bit keys and encrypts arbitrary-length payloads
//! with ChaCha20 keyed by `(key, nonce)`.
//!
//! The default [`CipherSuite::ChaCha20`] is a bare stream cipher: ciphertext
//! is exactly as long as the plaintext and carries no authentication tag.
//! Decrypting with the wrong key or nonce therefore does not fail, it simply
//! produces garbage. Callers that need tamper detection select
//! [`CipherSuite::ChaCha20Poly1305`], which appends a 16-byte Poly1305 tag.

use std::fmt;
use std::str::FromStr;

use chacha20::ChaCha20Legacy;
use chacha20::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce as AeadNonce};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Supported symmetric key length in bits.
pub const SYMMETRIC_KEY_BITS: usize = 256;
/// Symmetric key length in bytes.
pub const SYMMETRIC_KEY_SIZE: usize = SYMMETRIC_KEY_BITS / 8;
/// Serialized nonce size: 8-byte counter + 8 random bytes.
pub const NONCE_SIZE: usize = 16;
/// Size of the random half of a nonce.
pub const NONCE_RANDOM_SIZE: usize = 8;
/// Poly1305 tag appended by the authenticated suite.
pub const TAG_SIZE: usize = 16;

const CHACHA_BLOCK_SIZE: u128 = 64;

/// Bulk cipher selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CipherSuite {
    /// Unauthenticated ChaCha20 (64-bit counter, 64-bit nonce).
    #[default]
    #[serde(rename = "chacha20")]
    ChaCha20,
    /// ChaCha20-Poly1305 AEAD.
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChaCha20 => write!(f, "chacha20"),
            Self::ChaCha20Poly1305 => write!(f, "chacha20-poly1305"),
        }
    }
}

impl FromStr for CipherSuite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chacha20" => Ok(Self::ChaCha20),
            "chacha20-poly1305" | "chacha20poly1305" => Ok(Self::ChaCha20Poly1305),
            other => Err(format!(
                "unknown cipher suite '{other}' (expected chacha20 or chacha20-poly1305)"
            )),
        }
    }
}

/// A per-session symmetric key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_SIZE]);

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SymmetricKey").field(&"[REDACTED]").finish()
    }
}

impl SymmetricKey {
    /// Generate a fresh key of `bits` length from the OS CSPRNG.
    ///
    /// Both suites take 256-bit keys, so any other length is rejected.
    pub fn generate(bits: usize) -> Result<Self, CryptoError> {
        if bits != SYMMETRIC_KEY_BITS {
            return Err(CryptoError::KeyGeneration(format!(
                "symmetric key must be {SYMMETRIC_KEY_BITS} bits, got {bits}"
            )));
        }
        let mut key = [0u8; SYMMETRIC_KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Ok(Self(key))
    }

    /// Reconstruct from raw bytes, e.g. after unwrapping.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != SYMMETRIC_KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: SYMMETRIC_KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut key = [0u8; SYMMETRIC_KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Raw key bytes. Handle with care.
    pub const fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.0
    }
}

/// Stream-cipher nonce.
///
/// On disk: `counter` as 8 little-endian bytes followed by the 8 random bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce {
    /// Starting block counter of the keystream.
    pub counter: u64,
    /// Per-encryption random component.
    pub random: [u8; NONCE_RANDOM_SIZE],
}

impl Nonce {
    /// A fresh nonce: counter zero, 64 bits of OS randomness.
    pub fn generate() -> Self {
        let mut random = [0u8; NONCE_RANDOM_SIZE];
        OsRng.fill_bytes(&mut random);
        Self { counter: 0, random }
    }

    pub fn to_bytes(&self) -> [u8; NONCE_SIZE] {
        let mut out = [0u8; NONCE_SIZE];
        out[..8].copy_from_slice(&self.counter.to_le_bytes());
        out[8..].copy_from_slice(&self.random);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != NONCE_SIZE {
            return Err(CryptoError::InvalidNonceLength {
                expected: NONCE_SIZE,
                actual: bytes.len(),
            });
        }
        let mut counter = [0u8; 8];
        counter.copy_from_slice(&bytes[..8]);
        let mut random = [0u8; NONCE_RANDOM_SIZE];
        random.copy_from_slice(&bytes[8..]);
        Ok(Self {
            counter: u64::from_le_bytes(counter),
            random,
        })
    }

    /// 12-byte AEAD nonce: [4-byte counter (LE)] [8-byte random].
    fn aead_nonce(&self) -> Result<[u8; 12], CryptoError> {
        let counter = u32::try_from(self.counter).map_err(|_| CryptoError::NonceExhausted)?;
        let mut out = [0u8; 12];
        out[..4].copy_from_slice(&counter.to_le_bytes());
        out[4..].copy_from_slice(&self.random);
        Ok(out)
    }
}

/// Generate a symmetric key of `bits` length.
pub fn generate_key(bits: usize) -> Result<SymmetricKey, CryptoError> {
    SymmetricKey::generate(bits)
}

/// Encrypt `plaintext` under `key` with a freshly generated nonce.
///
/// The nonce is returned rather than stored: persisting it is the caller's job,
/// and it is required for decryption.
pub fn encrypt(
    suite: CipherSuite,
    key: &SymmetricKey,
    plaintext: &[u8],
) -> Result<(Nonce, Vec<u8>), CryptoError> {
    let nonce = Nonce::generate();
    let ciphertext = encrypt_with_nonce(suite, key, &nonce, plaintext)?;
    Ok((nonce, ciphertext))
}

/// Decrypt `ciphertext` produced by [`encrypt`].
///
/// With [`CipherSuite::ChaCha20`] a wrong key or nonce is not detected: the
/// call succeeds and returns bytes unrelated to the original plaintext.
pub fn decrypt(
    suite: CipherSuite,
    key: &SymmetricKey,
    nonce: &Nonce,
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    match suite {
        CipherSuite::ChaCha20 => apply_keystream(key, nonce, ciphertext),
        CipherSuite::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
            let nonce_bytes = nonce.aead_nonce()?;
            cipher
                .decrypt(AeadNonce::from_slice(&nonce_bytes), ciphertext)
                .map_err(|_| CryptoError::DecryptionFailed)
        }
    }
}

fn encrypt_with_nonce(
    suite: CipherSuite,
    key: &SymmetricKey,
    nonce: &Nonce,
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    match suite {
        CipherSuite::ChaCha20 => apply_keystream(key, nonce, plaintext),
        CipherSuite::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
            let nonce_bytes = nonce.aead_nonce()?;
            cipher
                .encrypt(AeadNonce::from_slice(&nonce_bytes), plaintext)
                .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
        }
    }
}

/// XOR `data` with the ChaCha20 keystream starting at block `nonce.counter`.
fn apply_keystream(key: &SymmetricKey, nonce: &Nonce, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut cipher = ChaCha20Legacy::new_from_slices(key.as_bytes(), &nonce.random).map_err(|_| {
        CryptoError::InvalidKeyLength {
            expected: SYMMETRIC_KEY_SIZE,
            actual: key.as_bytes().len(),
        }
    })?;
    cipher
        .try_seek(u128::from(nonce.counter) * CHACHA_BLOCK_SIZE)
        .map_err(|_| CryptoError::NonceExhausted)?;

    let mut buf = data.to_vec();
    cipher
        .try_apply_keystream(&mut buf)
        .map_err(|_| CryptoError::NonceExhausted)?;
    Ok(buf)
}
