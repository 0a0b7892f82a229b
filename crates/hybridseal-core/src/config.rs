//! Configuration resolution for hybridseal.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/hybridseal/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)
//!
//! Files are merged as JSON values before deserializing, so a layer only
//! overrides the keys it actually names.

use std::path::{Path, PathBuf};

use hybridseal_crypto::symmetric::SYMMETRIC_KEY_BITS;
use hybridseal_crypto::{CipherSuite, KdfParams};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::paths::ArtifactPaths;

/// Complete hybridseal configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: ArtifactPaths,
    #[serde(default)]
    pub keys: KeyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Key material parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    pub rsa_bits: usize,
    pub symmetric_bits: usize,
    pub cipher: CipherSuite,
    /// Seal the private key under a passphrase when it is written.
    pub encrypt_private_key: bool,
    pub kdf: KdfParams,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            rsa_bits: 2048,
            symmetric_bits: SYMMETRIC_KEY_BITS,
            cipher: CipherSuite::default(),
            encrypt_private_key: false,
            kdf: KdfParams::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Reject KDF parameters Argon2 would refuse.
    ///
    /// Key sizes are left to the engines, which report them as key
    /// generation errors, and only when keys are actually generated.
    pub fn validate(&self) -> Result<()> {
        self.keys
            .kdf
            .validate()
            .map_err(|e| Error::Config(format!("keys.kdf: {e}")))
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    load_config_from(global_config_path().as_deref(), explicit, |name| {
        std::env::var(name).ok()
    })
}

/// [`load_config`] with the global file location and environment supplied by the caller.
pub fn load_config_from(
    global: Option<&Path>,
    explicit: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let mut merged = serde_json::to_value(Config::default())?;

    if let Some(global_path) = global
        && global_path.exists()
    {
        merge_values(&mut merged, load_config_file(global_path)?);
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file {} does not exist",
                path.display()
            )));
        }
        merge_values(&mut merged, load_config_file(path)?);
    }

    let mut config: Config = serde_json::from_value(merged)
        .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))?;

    apply_env_overrides_from(&mut config, lookup)?;
    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".hybridseal").join("settings.json"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/hybridseal/settings.json"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("hybridseal").join("settings.json"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

fn load_config_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Recursively overlay `overlay` onto `base`; objects merge, everything else replaces.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Apply `HYBRIDSEAL_*` overrides read through `lookup`.
pub fn apply_env_overrides_from(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(val) = lookup("HYBRIDSEAL_LOG_LEVEL") {
        config.logging.level = val;
    }
    if let Some(val) = lookup("HYBRIDSEAL_LOG_JSON") {
        config.logging.json = parse_bool(&val).ok_or_else(|| {
            Error::Config(format!("HYBRIDSEAL_LOG_JSON must be true or false, got {val:?}"))
        })?;
    }
    if let Some(val) = lookup("HYBRIDSEAL_RSA_BITS") {
        config.keys.rsa_bits = val.parse().map_err(|_| {
            Error::Config(format!("HYBRIDSEAL_RSA_BITS must be an integer, got {val:?}"))
        })?;
    }
    if let Some(val) = lookup("HYBRIDSEAL_CIPHER") {
        config.keys.cipher = val
            .parse()
            .map_err(|e| Error::Config(format!("HYBRIDSEAL_CIPHER: {e}")))?;
    }
    Ok(())
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.keys.rsa_bits, 2048);
        assert_eq!(config.keys.symmetric_bits, 256);
        assert_eq!(config.keys.cipher, CipherSuite::ChaCha20);
        assert!(!config.keys.encrypt_private_key);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.paths.nonce, PathBuf::from("keys/nonce.bin"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn merge_overrides_only_named_keys() {
        let mut base = serde_json::to_value(Config::default()).unwrap();
        let overlay: Value = serde_json::from_str(
            r#"{ "keys": { "rsa_bits": 3072 }, "paths": { "plaintext": "in.txt" } }"#,
        )
        .unwrap();
        merge_values(&mut base, overlay);
        let config: Config = serde_json::from_value(base).unwrap();

        assert_eq!(config.keys.rsa_bits, 3072);
        assert_eq!(config.keys.symmetric_bits, 256);
        assert_eq!(config.paths.plaintext, PathBuf::from("in.txt"));
        assert_eq!(config.paths.ciphertext, PathBuf::from("data/encrypted.bin"));
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "keys": { "cipher": "chacha20-poly1305" }, "logging": { "json": true } }"#,
        )
        .unwrap();

        let config = load_config_from(None, Some(&path), env(&[])).unwrap();
        assert_eq!(config.keys.cipher, CipherSuite::ChaCha20Poly1305);
        assert!(config.logging.json);
    }

    #[test]
    fn layers_apply_in_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.json");
        let explicit = dir.path().join("explicit.json");
        std::fs::write(
            &global,
            r#"{ "keys": { "rsa_bits": 3072 }, "logging": { "level": "warn" }, "paths": { "nonce": "g.bin" } }"#,
        )
        .unwrap();
        std::fs::write(&explicit, r#"{ "logging": { "level": "debug" } }"#).unwrap();

        let config = load_config_from(
            Some(&global),
            Some(&explicit),
            env(&[("HYBRIDSEAL_RSA_BITS", "4096")]),
        )
        .unwrap();
        assert_eq!(config.paths.nonce, PathBuf::from("g.bin"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.keys.rsa_bits, 4096);
    }

    #[test]
    fn absent_global_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            load_config_from(Some(&dir.path().join("missing.json")), None, env(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn missing_explicit_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err =
            load_config_from(None, Some(&dir.path().join("nope.json")), env(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_config_from(None, Some(&path), env(&[])),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            load_config_from(Some(&path), None, env(&[])),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = Config::default();
        apply_env_overrides_from(
            &mut config,
            env(&[
                ("HYBRIDSEAL_LOG_LEVEL", "debug"),
                ("HYBRIDSEAL_LOG_JSON", "true"),
                ("HYBRIDSEAL_RSA_BITS", "4096"),
                ("HYBRIDSEAL_CIPHER", "chacha20-poly1305"),
            ]),
        )
        .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.keys.rsa_bits, 4096);
        assert_eq!(config.keys.cipher, CipherSuite::ChaCha20Poly1305);
    }

    #[test]
    fn bad_env_values_are_rejected() {
        let mut config = Config::default();
        assert!(
            apply_env_overrides_from(&mut config, env(&[("HYBRIDSEAL_RSA_BITS", "big")])).is_err()
        );
        assert!(
            apply_env_overrides_from(&mut config, env(&[("HYBRIDSEAL_CIPHER", "aes")])).is_err()
        );
        assert!(
            apply_env_overrides_from(&mut config, env(&[("HYBRIDSEAL_LOG_JSON", "maybe")]))
                .is_err()
        );
    }

    #[test]
    fn validate_leaves_key_sizes_to_the_engines() {
        let mut config = Config::default();
        config.keys.rsa_bits = 1024;
        config.keys.symmetric_bits = 128;
        assert!(config.validate().is_ok());

        config.keys.kdf.t_cost = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
