//! Asymmetric layer: RSA keypairs and OAEP key wrapping.
//!
//! Only short payloads (the symmetric key) are ever encrypted here. The
//! maximum payload for SHA-256 OAEP is `modulus_bytes - 2 * 32 - 2`, i.e. 190
//! bytes for a 2048-bit key.

use std::fmt;

use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::symmetric::SymmetricKey;

/// Smallest modulus accepted for new keypairs.
pub const MIN_RSA_BITS: usize = 2048;
/// Largest modulus accepted for new keypairs.
pub const MAX_RSA_BITS: usize = 4096;
/// Modulus size used when nothing else is configured.
pub const DEFAULT_RSA_BITS: usize = 2048;

/// Output length of the OAEP hash (SHA-256).
const OAEP_HASH_SIZE: usize = 32;

fn oaep() -> Oaep {
    Oaep::new::<Sha256>()
}

/// RSA public key.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(RsaPublicKey);

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

impl PublicKey {
    /// Modulus size in bytes.
    pub fn size(&self) -> usize {
        self.0.size()
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.size() * 8
    }

    /// Largest payload [`encrypt`] accepts for this key.
    pub fn max_payload(&self) -> usize {
        self.size().saturating_sub(2 * OAEP_HASH_SIZE + 2)
    }

    /// Encode as a `PUBLIC KEY` (SubjectPublicKeyInfo) PEM document.
    pub fn to_pem(&self) -> Result<String, CryptoError> {
        self.0
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::SerializationError(format!("failed to encode public key: {e}")))
    }

    /// Parse a `PUBLIC KEY` or `RSA PUBLIC KEY` PEM document.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map(Self)
            .map_err(|e| CryptoError::SerializationError(format!("failed to parse public key: {e}")))
    }

    /// Colon-separated SHA-256 fingerprint of the SubjectPublicKeyInfo DER.
    pub fn fingerprint(&self) -> Result<String, CryptoError> {
        let der = self
            .0
            .to_public_key_der()
            .map_err(|e| CryptoError::SerializationError(format!("failed to encode public key: {e}")))?;
        Ok(fingerprint_of(der.as_bytes()))
    }
}

/// RSA private key. Key material is zeroized on drop by the `rsa` crate.
#[derive(Clone)]
pub struct PrivateKey(RsaPrivateKey);

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PrivateKey").field(&"[REDACTED]").finish()
    }
}

impl PrivateKey {
    /// Derive the matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.to_public_key())
    }

    /// Encode as an unencrypted `RSA PRIVATE KEY` (PKCS#1) PEM document.
    pub fn to_pem(&self) -> Result<Zeroizing<String>, CryptoError> {
        self.0
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| CryptoError::SerializationError(format!("failed to encode private key: {e}")))
    }

    /// PKCS#1 DER bytes, used as the payload of passphrase sealing.
    pub fn to_der(&self) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let doc = self
            .0
            .to_pkcs1_der()
            .map_err(|e| CryptoError::SerializationError(format!("failed to encode private key: {e}")))?;
        Ok(Zeroizing::new(doc.as_bytes().to_vec()))
    }

    /// Parse PKCS#1 DER bytes.
    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        let key = RsaPrivateKey::from_pkcs1_der(der)
            .map_err(|e| CryptoError::SerializationError(format!("failed to parse private key: {e}")))?;
        Self::checked(key)
    }

    /// Parse an `RSA PRIVATE KEY` (PKCS#1) or `PRIVATE KEY` (PKCS#8) PEM document.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let key = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|e| CryptoError::SerializationError(format!("failed to parse private key: {e}")))?;
        Self::checked(key)
    }

    fn checked(key: RsaPrivateKey) -> Result<Self, CryptoError> {
        key.validate()
            .map_err(|e| CryptoError::SerializationError(format!("inconsistent private key: {e}")))?;
        Ok(Self(key))
    }
}

/// A freshly generated RSA keypair.
pub struct Keypair {
    public: PublicKey,
    private: PrivateKey,
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public", &self.public)
            .field("private", &"[REDACTED]")
            .finish()
    }
}

impl Keypair {
    /// Generate a keypair with a `bits`-bit modulus and public exponent 65537.
    pub fn generate(bits: usize) -> Result<Self, CryptoError> {
        if !(MIN_RSA_BITS..=MAX_RSA_BITS).contains(&bits) || bits % 8 != 0 {
            return Err(CryptoError::KeyGeneration(format!(
                "RSA modulus must be a multiple of 8 between {MIN_RSA_BITS} and {MAX_RSA_BITS} bits, got {bits}"
            )));
        }
        let private = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let public = PublicKey(private.to_public_key());
        Ok(Self {
            public,
            private: PrivateKey(private),
        })
    }

    pub const fn public(&self) -> &PublicKey {
        &self.public
    }

    pub const fn private(&self) -> &PrivateKey {
        &self.private
    }
}

/// Generate a keypair with a `bits`-bit modulus.
pub fn generate_keypair(bits: usize) -> Result<Keypair, CryptoError> {
    Keypair::generate(bits)
}

/// Encrypt a short payload with RSA-OAEP (SHA-256, MGF1-SHA-256, no label).
pub fn encrypt(public: &PublicKey, payload: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let max = public.max_payload();
    if payload.len() > max {
        return Err(CryptoError::PayloadTooLarge {
            max,
            actual: payload.len(),
        });
    }
    public
        .0
        .encrypt(&mut OsRng, oaep(), payload)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
}

/// Decrypt an RSA-OAEP ciphertext.
///
/// Uses blinding, and every failure (wrong key, wrong length, bad padding)
/// maps to the same [`CryptoError::DecryptionFailed`].
pub fn decrypt(private: &PrivateKey, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    private
        .0
        .decrypt_blinded(&mut OsRng, oaep(), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Wrap a symmetric key under `public`.
pub fn wrap_key(public: &PublicKey, key: &SymmetricKey) -> Result<Vec<u8>, CryptoError> {
    encrypt(public, key.as_bytes())
}

/// Recover a symmetric key wrapped by [`wrap_key`].
pub fn unwrap_key(private: &PrivateKey, wrapped: &[u8]) -> Result<SymmetricKey, CryptoError> {
    let bytes = decrypt(private, wrapped)?;
    SymmetricKey::from_bytes(&bytes)
}

/// Compute a colon-separated hex fingerprint of arbitrary key bytes.
pub fn fingerprint_of(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    hash.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}
