//! Per-customer replay tokens kept by the teller
//!
//! Stored as a JSON object `{ "<customerId>": "<lastHash>" }`. The token is
//! only advanced from responses that carry both a customer id and a hash,
//! i.e. registrations and committed mutations.

use crate::Result;
use ledger_core::{store::write_atomic, CustomerId, Digest, Response};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Last known chain hash per customer
#[derive(Debug)]
pub struct LastHashStore {
    path: PathBuf,
    hashes: BTreeMap<CustomerId, Digest>,
}

impl LastHashStore {
    /// Load from `path`; a missing file is an empty store
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let hashes = if path.exists() {
            let content = std::fs::read(&path)?;
            serde_json::from_slice(&content)?
        } else {
            BTreeMap::new()
        };

        Ok(Self { path, hashes })
    }

    /// State file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Token to embed in the customer's next request
    pub fn get(&self, customer_id: &CustomerId) -> Option<Digest> {
        self.hashes.get(customer_id).copied()
    }

    /// Advance the token from a bank response. Returns whether anything changed.
    pub fn record(&mut self, response: &Response) -> bool {
        match (response.customer_id(), response.hash()) {
            (Some(customer_id), Some(hash)) => {
                self.hashes.insert(*customer_id, *hash);
                true
            }
            _ => false,
        }
    }

    /// Persist atomically
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.hashes)?;
        write_atomic(&self.path, &json)?;
        tracing::debug!(path = %self.path.display(), customers = self.hashes.len(), "Teller state saved");
        Ok(())
    }
}
