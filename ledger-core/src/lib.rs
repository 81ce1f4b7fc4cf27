//! Verifiable Ledger Core
//!
//! A single bank authority keeping an append-only, hash-chained,
//! authority-signed record of customer account operations, encrypted at
//! rest, and serving signed teller requests over TCP.
//!
//! # Architecture
//!
//! - **Hash Chain**: every entry links to its predecessor; any edit breaks the chain
//! - **Authority Signatures**: every link is signed by the bank's Ed25519 key
//! - **Single Writer**: one actor task applies all mutations in order
//! - **Encrypted Store**: the whole log is sealed with AES-256-GCM and replaced atomically
//!
//! # Invariants
//!
//! - Balances never go negative
//! - Deterministic replay: same entries → same balances
//! - Append-only: entries never modified or deleted
//! - A signed request is accepted at most once (embedded `lastHash` token)

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod canonical;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod processor;
pub mod projection;
pub mod protocol;
pub mod replay;
pub mod server;
pub mod store;
pub mod types;

// Re-exports
pub use actor::{spawn_ledger_actor, LedgerHandle};
pub use config::Config;
pub use crypto::{CustomerSecret, KeyPair};
pub use error::{Error, IntegrityError, Result, ValidationError};
pub use ledger::Ledger;
pub use metrics::Metrics;
pub use processor::CommandProcessor;
pub use protocol::{Message, Request, Response};
pub use store::{EncryptedStore, StoreKey};
pub use types::{CustomerId, Digest, Entry, Operation, Signature};
