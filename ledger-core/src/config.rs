//! Configuration for the bank

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Bank configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the ledger and key files
    pub data_dir: PathBuf,

    /// Encrypted ledger file name, relative to `data_dir`
    pub ledger_file: String,

    /// Authority key file name, relative to `data_dir`
    pub keys_file: String,

    /// TCP listen address
    pub listen_addr: String,

    /// Actor mailbox capacity (requests queued before backpressure)
    pub mailbox_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            ledger_file: "log.json".to_string(),
            keys_file: "keys.json".to_string(),
            listen_addr: "127.0.0.1:3876".to_string(),
            mailbox_capacity: 1000,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Config::default().with_env_overrides()
    }

    /// Apply `BANK_*` environment overrides on top of `self`
    pub fn with_env_overrides(mut self) -> crate::Result<Self> {
        if let Ok(data_dir) = std::env::var("BANK_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(addr) = std::env::var("BANK_LISTEN_ADDR") {
            self.listen_addr = addr;
        }

        if let Ok(capacity) = std::env::var("BANK_MAILBOX_CAPACITY") {
            self.mailbox_capacity = capacity.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid BANK_MAILBOX_CAPACITY: {}", e))
            })?;
        }

        Ok(self)
    }

    /// Full path of the encrypted ledger
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(&self.ledger_file)
    }

    /// Full path of the authority key file
    pub fn keys_path(&self) -> PathBuf {
        self.data_dir.join(&self.keys_file)
    }
}
