//! Teller client for the verifiable ledger bank
//!
//! A teller acts for customers: it signs their requests with the secret
//! handed out at registration, embeds the replay token (`lastHash`) it last
//! saw for them, and records the new token from every successful mutation.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, missing_debug_implementations)]

pub mod client;
pub mod error;
pub mod signer;
pub mod state;

pub use client::{BankClient, Connection};
pub use error::{Result, TellerError};
pub use signer::CustomerSigner;
pub use state::LastHashStore;
