//! Error types for the teller

use ledger_core::CustomerId;
use thiserror::Error;

/// Result type for teller operations
pub type Result<T> = std::result::Result<T, TellerError>;

/// Teller errors
#[derive(Error, Debug)]
pub enum TellerError {
    /// Error from the ledger library (keys, encodings)
    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger_core::Error),

    /// Secret does not belong to the named customer
    #[error("Secret does not match customer {0}")]
    SecretMismatch(CustomerId),

    /// Bank closed the connection without replying
    #[error("Bank closed the connection")]
    ConnectionClosed,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
