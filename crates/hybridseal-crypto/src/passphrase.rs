//! Passphrase protection for private keys at rest.
//!
//! The wrapping key is derived with Argon2id from the passphrase and a random
//! salt, then seals the key's DER bytes with ChaCha20-Poly1305. The result is
//! PEM-armored under [`SEALED_PEM_TAG`] with body layout:
//!
//! `version (1) || m_cost (4, LE) || t_cost (4, LE) || p_cost (4, LE) || salt (16) || nonce (12) || ciphertext+tag`

use std::fmt;

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// PEM tag of a passphrase-sealed private key.
pub const SEALED_PEM_TAG: &str = "HYBRIDSEAL ENCRYPTED PRIVATE KEY";

const FORMAT_VERSION: u8 = 1;
const SALT_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
const WRAPPING_KEY_SIZE: usize = 32;
const HEADER_SIZE: usize = 1 + 4 + 4 + 4 + SALT_SIZE + NONCE_SIZE;

/// Largest accepted memory cost, in KiB (1 GiB).
const MAX_M_COST: u32 = 1 << 20;
/// Largest accepted number of passes.
const MAX_T_COST: u32 = 64;
/// Largest accepted degree of parallelism.
const MAX_P_COST: u32 = 64;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Number of passes.
    pub t_cost: u32,
    /// Degree of parallelism.
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: Params::DEFAULT_M_COST,
            t_cost: Params::DEFAULT_T_COST,
            p_cost: Params::DEFAULT_P_COST,
        }
    }
}

impl KdfParams {
    fn exceeds_limits(self) -> bool {
        self.m_cost > MAX_M_COST || self.t_cost > MAX_T_COST || self.p_cost > MAX_P_COST
    }

    fn to_argon2(self) -> Result<Params, CryptoError> {
        if self.exceeds_limits() {
            return Err(CryptoError::KeyDerivationFailed(format!(
                "costs above limits (m_cost <= {MAX_M_COST}, t_cost <= {MAX_T_COST}, p_cost <= {MAX_P_COST})"
            )));
        }
        Params::new(
            self.m_cost,
            self.t_cost,
            self.p_cost,
            Some(WRAPPING_KEY_SIZE),
        )
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))
    }

    /// Check the parameters against Argon2's limits and the cost ceilings.
    pub fn validate(self) -> Result<(), CryptoError> {
        self.to_argon2().map(|_| ())
    }
}

/// A passphrase held in zeroizing memory.
#[derive(Clone)]
pub struct Passphrase(Zeroizing<String>);

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Passphrase").field(&"[REDACTED]").finish()
    }
}

impl From<String> for Passphrase {
    fn from(value: String) -> Self {
        Self(Zeroizing::new(value))
    }
}

impl Passphrase {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn derive_wrapping_key(
    passphrase: &Passphrase,
    salt: &[u8],
    params: KdfParams,
) -> Result<Zeroizing<[u8; WRAPPING_KEY_SIZE]>, CryptoError> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);
    let mut key = Zeroizing::new([0u8; WRAPPING_KEY_SIZE]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, key.as_mut_slice())
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
    Ok(key)
}

/// Seal `secret` (private key DER) under `passphrase`, returning PEM text.
pub fn seal(
    secret: &[u8],
    passphrase: &Passphrase,
    params: KdfParams,
) -> Result<Zeroizing<String>, CryptoError> {
    if passphrase.is_empty() {
        return Err(CryptoError::KeyDerivationFailed(
            "passphrase must not be empty".into(),
        ));
    }

    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let key = derive_wrapping_key(passphrase, &salt, params)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_slice()));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), secret)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut body = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
    body.push(FORMAT_VERSION);
    body.extend_from_slice(&params.m_cost.to_le_bytes());
    body.extend_from_slice(&params.t_cost.to_le_bytes());
    body.extend_from_slice(&params.p_cost.to_le_bytes());
    body.extend_from_slice(&salt);
    body.extend_from_slice(&nonce);
    body.extend_from_slice(&ciphertext);

    Ok(Zeroizing::new(pem::encode(&pem::Pem::new(
        SEALED_PEM_TAG,
        body,
    ))))
}

/// Whether `pem_text` is a passphrase-sealed key.
pub fn is_sealed(pem_text: &str) -> bool {
    pem::parse(pem_text).is_ok_and(|p| p.tag() == SEALED_PEM_TAG)
}

/// Open a key sealed by [`seal`].
///
/// A wrong passphrase and a tampered file both yield
/// [`CryptoError::DecryptionFailed`].
pub fn open(pem_text: &str, passphrase: &Passphrase) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let parsed = pem::parse(pem_text)
        .map_err(|e| CryptoError::SerializationError(format!("failed to parse PEM: {e}")))?;
    if parsed.tag() != SEALED_PEM_TAG {
        return Err(CryptoError::SerializationError(format!(
            "invalid PEM tag, expected {SEALED_PEM_TAG}"
        )));
    }

    let body = parsed.contents();
    if body.len() < HEADER_SIZE + TAG_SIZE {
        return Err(CryptoError::SerializationError(format!(
            "sealed key truncated: {} bytes",
            body.len()
        )));
    }
    if body[0] != FORMAT_VERSION {
        return Err(CryptoError::SerializationError(format!(
            "unsupported sealed key version {}",
            body[0]
        )));
    }

    let params = KdfParams {
        m_cost: read_u32(&body[1..5]),
        t_cost: read_u32(&body[5..9]),
        p_cost: read_u32(&body[9..13]),
    };
    // Costs come from the file; bound them before Argon2 allocates.
    if params.exceeds_limits() {
        return Err(CryptoError::SerializationError(format!(
            "sealed key KDF costs out of range: m_cost={}, t_cost={}, p_cost={}",
            params.m_cost, params.t_cost, params.p_cost
        )));
    }
    let salt = &body[13..13 + SALT_SIZE];
    let nonce = &body[13 + SALT_SIZE..HEADER_SIZE];
    let ciphertext = &body[HEADER_SIZE..];

    let key = derive_wrapping_key(passphrase, salt, params)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_slice()));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::DecryptionFailed)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}
