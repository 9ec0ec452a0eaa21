//! Engine configuration
//!
//! Loaded from an optional JSON file; every field has a default so an empty object
//! (or no file at all) is a valid configuration. CLI flags are layered on top.
//!
//! ```json
//! {
//!   "addressing": "drive_letter",
//!   "encoding": "base64",
//!   "volumes": { "C:\\": "/mnt/evidence/c" },
//!   "max_extract_size": 52428800,
//!   "hash_algorithms": ["md5", "sha256"]
//! }
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::address::Addressing;
use crate::common::hash::HashAlgorithm;
use crate::error::{EngineError, EngineResult};

/// Default cap on one `read_chunk` request (64 MiB)
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Addressing convention as written in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AddressingMode {
    /// Follow the host platform
    #[default]
    Auto,
    DriveLetter,
    SingleRoot,
}

impl AddressingMode {
    /// Fix the convention; `Auto` is decided here, once
    pub fn resolve(self) -> Addressing {
        match self {
            AddressingMode::Auto => Addressing::host(),
            AddressingMode::DriveLetter => Addressing::DriveLetter,
            AddressingMode::SingleRoot => Addressing::SingleRoot,
        }
    }
}

/// Transport encoding for content payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    #[default]
    Hex,
    Base64,
}

impl Encoding {
    pub fn encode(self, data: &[u8]) -> String {
        match self {
            Encoding::Hex => hex::encode(data),
            Encoding::Base64 => BASE64_STANDARD.encode(data),
        }
    }

    pub fn decode(self, payload: &str) -> Result<Vec<u8>, String> {
        match self {
            Encoding::Hex => hex::decode(payload).map_err(|e| e.to_string()),
            Encoding::Base64 => BASE64_STANDARD.decode(payload).map_err(|e| e.to_string()),
        }
    }
}

fn default_hash_algorithms() -> Vec<String> {
    vec!["md5".to_string(), "sha1".to_string(), "sha256".to_string()]
}

/// Runtime configuration for the engine and the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub addressing: AddressingMode,
    pub encoding: Encoding,
    /// Mountpoint -> host directory where the image is mounted read-only
    pub volumes: BTreeMap<String, PathBuf>,
    /// Whole-file reads above this size are refused
    pub max_extract_size: Option<u64>,
    /// Upper bound on a single chunk read
    pub max_chunk_size: usize,
    /// Run batch paths on the rayon pool
    pub parallel_batch: bool,
    pub hash_algorithms: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            addressing: AddressingMode::Auto,
            encoding: Encoding::Hex,
            volumes: BTreeMap::new(),
            max_extract_size: None,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            parallel_batch: true,
            hash_algorithms: default_hash_algorithms(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> EngineResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read '{}': {}", path.display(), e)))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| EngineError::Config(format!("Failed to parse '{}': {}", path.display(), e)))?;
        info!(path = %path.display(), volumes = config.volumes.len(), "Loaded configuration");
        Ok(config)
    }

    /// Parsed digest algorithms, in configured order
    pub fn digest_algorithms(&self) -> EngineResult<Vec<HashAlgorithm>> {
        self.hash_algorithms
            .iter()
            .map(|name| HashAlgorithm::from_str(name).map_err(EngineError::Config))
            .collect()
    }

    /// Check the configuration for serving mounted images
    pub fn validate(&self) -> EngineResult<()> {
        self.digest_algorithms()?;
        if self.volumes.is_empty() {
            return Err(EngineError::Config(
                "no volumes configured; map at least one mountpoint to an image directory".to_string(),
            ));
        }
        if self.max_chunk_size == 0 {
            return Err(EngineError::Config("max_chunk_size must be greater than zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_from_empty_object() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.addressing, AddressingMode::Auto);
        assert_eq!(config.encoding, Encoding::Hex);
        assert_eq!(config.hash_algorithms, vec!["md5", "sha1", "sha256"]);
        assert_eq!(config.max_chunk_size, DEFAULT_MAX_CHUNK_SIZE);
        assert!(config.parallel_batch);
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"addressing": "drive_letter", "encoding": "base64", "volumes": {{"C:\\": "/mnt/c"}}}}"#
        )
        .unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.addressing.resolve(), Addressing::DriveLetter);
        assert_eq!(config.encoding, Encoding::Base64);
        assert_eq!(config.volumes.get("C:\\"), Some(&PathBuf::from("/mnt/c")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(EngineConfig::load(file.path()), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_validate() {
        let mut config = EngineConfig::default();
        assert!(config.validate().is_err());

        config.volumes.insert("/".into(), PathBuf::from("/mnt/image"));
        assert!(config.validate().is_ok());

        config.hash_algorithms.push("whirlpool".into());
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_encoding() {
        assert_eq!(Encoding::Hex.encode(b"MZ"), "4d5a");
        assert_eq!(Encoding::Base64.encode(b"MZ"), "TVo=");
        assert_eq!(Encoding::Base64.decode("TVo=").unwrap(), b"MZ");
        assert!(Encoding::Hex.encode(b"").is_empty());
    }
}
