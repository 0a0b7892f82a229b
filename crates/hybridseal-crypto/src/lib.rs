//! `hybridseal` envelope encryption library.
//!
//! Bulk data is encrypted with a per-session symmetric key; that key is
//! wrapped under an RSA public key so it can be persisted next to the data
//! without ever being stored in the clear.
//!
//! ## Crypto primitives
//!
//! - **Asymmetric**: RSA (e = 65537), OAEP with SHA-256 / MGF1-SHA-256, no label
//! - **Symmetric**: ChaCha20 with a 16-byte nonce (8-byte LE counter + 8 random bytes),
//!   optionally ChaCha20-Poly1305 when integrity is required
//! - **Key at rest**: optional Argon2id + ChaCha20-Poly1305 sealing of the private key
//!
//! The engines never touch the filesystem; [`keystore`] owns every read and write.

pub mod asymmetric;
pub mod error;
pub mod keystore;
pub mod passphrase;
pub mod symmetric;

pub use asymmetric::{Keypair, PrivateKey, PublicKey, fingerprint_of};
pub use error::{CryptoError, ErrorKind};
pub use keystore::{Sensitivity, StagedFile};
pub use passphrase::{KdfParams, Passphrase};
pub use symmetric::{CipherSuite, NONCE_SIZE, Nonce, SymmetricKey};
