//! Configuration file support for the credential membership system.
//!
//! Configuration loads from TOML, allowing for easier deployment and
//! configuration management. Every field has a default so a missing file or
//! section still yields a working setup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::TREE_DEPTH;

const DEFAULT_CIRCUIT_NAME: &str = "credential_membership";
const DEFAULT_CIRCUITS_PATH: &str = "./circuits";
const DEFAULT_PROOF_EXPIRY_HOURS: u64 = 24;
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CREDENTIALS_PER_SET: usize = 1024;

/// Configuration for the credential membership system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub circuit: CircuitConfig,
    #[serde(default)]
    pub proof: ProofConfig,
    #[serde(default)]
    pub sets: SetsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitConfig {
    #[serde(default = "default_circuit_name")]
    pub name: String,
    #[serde(default = "default_circuits_path")]
    pub circuits_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofConfig {
    /// TTL stamped on newly generated proofs.
    #[serde(default = "default_proof_expiry_hours")]
    pub expiry_hours: u64,
    /// Largest witness depth the prover accepts.
    #[serde(default = "default_max_merkle_depth")]
    pub max_merkle_depth: usize,
    /// Request deadline for a single proof generation.
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetsConfig {
    #[serde(default = "default_max_credentials_per_set")]
    pub max_credentials_per_set: usize,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CIRCUIT_NAME.to_string(),
            circuits_path: PathBuf::from(DEFAULT_CIRCUITS_PATH),
        }
    }
}

impl Default for ProofConfig {
    fn default() -> Self {
        Self {
            expiry_hours: DEFAULT_PROOF_EXPIRY_HOURS,
            max_merkle_depth: TREE_DEPTH,
            generation_timeout_secs: DEFAULT_GENERATION_TIMEOUT_SECS,
        }
    }
}

impl Default for SetsConfig {
    fn default() -> Self {
        Self {
            max_credentials_per_set: DEFAULT_MAX_CREDENTIALS_PER_SET,
        }
    }
}

fn default_circuit_name() -> String {
    DEFAULT_CIRCUIT_NAME.to_string()
}

fn default_circuits_path() -> PathBuf {
    PathBuf::from(DEFAULT_CIRCUITS_PATH)
}

fn default_proof_expiry_hours() -> u64 {
    DEFAULT_PROOF_EXPIRY_HOURS
}

fn default_max_merkle_depth() -> usize {
    TREE_DEPTH
}

fn default_generation_timeout_secs() -> u64 {
    DEFAULT_GENERATION_TIMEOUT_SECS
}

fn default_max_credentials_per_set() -> usize {
    DEFAULT_MAX_CREDENTIALS_PER_SET
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn load_from_file_or_default(path: &PathBuf) -> Self {
        Self::load_from_file(path).unwrap_or_default()
    }

    pub fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
