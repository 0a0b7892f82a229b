//! `hybridseal` core library
//!
//! Shared functionality for the `hybridseal` binary:
//! - Configuration resolution and hierarchy
//! - Artifact paths and the per-path-set lock
//! - Session lifecycle (`Uninitialized` → `KeysReady` → `SessionActive` → `Complete`)
//! - The hybrid orchestrator driving key generation, encryption and decryption
//! - Common error types

pub mod config;
pub mod error;
pub mod lock;
pub mod orchestrator;
pub mod paths;
pub mod session;
pub mod tracing_init;

pub use config::{Config, KeyConfig, LoggingConfig};
pub use error::{Error, ErrorKind, Result};
pub use orchestrator::{HybridOrchestrator, Report};
pub use paths::{Artifact, ArtifactPaths};
pub use session::{ActiveSession, KeyRing, Operation, Session, SessionState};
