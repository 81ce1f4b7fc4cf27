//! Main ledger orchestration layer
//!
//! This module ties together the hash chain, the authority signer and the
//! encrypted store into the append-only entry sequence.
//!
//! # Example
//!
//! ```no_run
//! use ledger_core::{crypto::KeyPair, store::{EncryptedStore, StoreKey}, Ledger};
//!
//! fn main() -> ledger_core::Result<()> {
//!     let store = EncryptedStore::new("log.json", StoreKey::generate());
//!     let ledger = Ledger::open(store, KeyPair::load_or_generate("keys.json")?)?;
//!     println!("{} entries", ledger.len());
//!     Ok(())
//! }
//! ```

use crate::{
    chain::{make_entry, verify_chain},
    crypto::KeyPair,
    store::EncryptedStore,
    types::{CustomerId, Digest, Entry, Operation},
    Result,
};
use std::sync::Arc;

/// Ordered, append-only sequence of signed entries
#[derive(Debug)]
pub struct Ledger {
    /// Committed entries, shared read-only with snapshot readers
    entries: Arc<Vec<Entry>>,

    /// Authority key pair (signs every link)
    authority: KeyPair,

    /// Encrypted backing file
    store: EncryptedStore,
}

impl Ledger {
    /// Decrypt, deserialize and verify the stored log.
    ///
    /// A missing store file yields an empty ledger. Any decryption or
    /// integrity failure is returned and the ledger must not be served.
    pub fn open(store: EncryptedStore, authority: KeyPair) -> Result<Self> {
        let entries: Vec<Entry> = match store.load()? {
            Some(plain) => serde_json::from_slice(&plain)?,
            None => Vec::new(),
        };

        verify_chain(&entries, &Digest::GENESIS, &authority.public_key())?;

        tracing::info!(
            path = %store.path().display(),
            entries = entries.len(),
            "Ledger verified"
        );

        Ok(Self {
            entries: Arc::new(entries),
            authority,
            store,
        })
    }

    /// Append an operation: chain, sign, persist, then commit in memory.
    ///
    /// If the store write fails the entry is dropped and the error returned;
    /// the in-memory sequence only ever reflects durable state.
    pub fn append(&mut self, operation: Operation) -> Result<Digest> {
        let entry = make_entry(&self.tail_hash(), operation, &self.authority);
        let hash = entry.hash;

        let mut next = Vec::with_capacity(self.entries.len() + 1);
        next.extend_from_slice(&self.entries);
        next.push(entry);

        let plain = serde_json::to_vec(&next)?;
        self.store.save(&plain)?;

        self.entries = Arc::new(next);

        tracing::debug!(hash = %hash, entries = self.entries.len(), "Entry appended");
        Ok(hash)
    }

    /// Re-run full chain and signature verification
    pub fn verify(&self) -> Result<()> {
        verify_chain(&self.entries, &Digest::GENESIS, &self.authority.public_key())?;
        Ok(())
    }

    /// All committed entries
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Cheap handle on the committed entries
    pub fn snapshot(&self) -> Arc<Vec<Entry>> {
        Arc::clone(&self.entries)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entry has been appended yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hash of the last entry, or genesis
    pub fn tail_hash(&self) -> Digest {
        self.entries.last().map(|e| e.hash).unwrap_or(Digest::GENESIS)
    }

    /// Authority public key
    pub fn authority_public_key(&self) -> [u8; 32] {
        self.authority.public_key()
    }

    /// Entries of one customer, in log order
    pub fn customer_entries<'a>(
        &'a self,
        customer_id: &'a CustomerId,
    ) -> impl Iterator<Item = &'a Entry> + 'a {
        customer_entries(&self.entries, customer_id)
    }

    /// True iff a `Register` entry exists for the customer
    pub fn customer_exists(&self, customer_id: &CustomerId) -> bool {
        customer_exists(&self.entries, customer_id)
    }
}

/// Entries of one customer, in log order
pub fn customer_entries<'a>(
    entries: &'a [Entry],
    customer_id: &'a CustomerId,
) -> impl Iterator<Item = &'a Entry> + 'a {
    entries
        .iter()
        .filter(move |e| e.value.customer_id() == customer_id)
}

/// True iff a `Register` entry exists for the customer
pub fn customer_exists(entries: &[Entry], customer_id: &CustomerId) -> bool {
    customer_entries(entries, customer_id).any(|e| e.value.is_register())
}
