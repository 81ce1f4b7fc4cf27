//! Error types for the ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Chain hash or authority signature mismatch in a stored log
    #[error("Integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    /// Wrong store key or corrupted ciphertext
    #[error("Decryption failed: {0}")]
    Decrypt(String),

    /// Bad request signature or stale replay token.
    ///
    /// Carries no detail about which check failed.
    #[error("Authentication failed")]
    Authentication,

    /// Business rule rejection
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Durable write failed; the in-flight append was abandoned
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed key material
    #[error("Invalid key: {0}")]
    Key(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Per-request rejection that leaves the ledger untouched and the
    /// service healthy.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::Authentication | Error::Validation(_))
    }

    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Error::Integrity(_) => "integrity",
            Error::Decrypt(_) => "decrypt",
            Error::Authentication => "authentication",
            Error::Validation(v) => v.reason(),
            Error::Persistence(_) => "persistence",
            Error::Serialization(_) => "serialization",
            Error::Key(_) => "key",
            Error::Concurrency(_) => "concurrency",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
        }
    }
}

/// Failure found while re-verifying a stored chain
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// Recomputed link hash differs from the stored one
    #[error("Broken hash chain at index {index}: expected {expected}, got {actual}")]
    HashMismatch {
        /// Position of the first bad entry
        index: usize,
        /// Hash recomputed from the predecessor and the stored value
        expected: String,
        /// Hash found in the entry
        actual: String,
    },

    /// Authority signature does not verify over the entry hash
    #[error("Invalid authority signature at index {index}")]
    BadSignature {
        /// Position of the first bad entry
        index: usize,
    },
}

impl IntegrityError {
    /// Index of the first entry that failed verification
    pub fn index(&self) -> usize {
        match self {
            IntegrityError::HashMismatch { index, .. } => *index,
            IntegrityError::BadSignature { index } => *index,
        }
    }
}

/// Business rule violations. These never mutate the ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No `Register` entry for the customer
    #[error("Customer not registered")]
    UnknownCustomer,

    /// Withdrawal larger than the current balance
    #[error("Insufficient funds")]
    InsufficientFunds,

    /// Amount missing, non-positive or out of range
    #[error("Invalid amount")]
    InvalidAmount,

    /// Command not understood
    #[error("Unknown command")]
    UnknownCommand,
}

impl ValidationError {
    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::UnknownCustomer => "unknown_customer",
            ValidationError::InsufficientFunds => "insufficient_funds",
            ValidationError::InvalidAmount => "invalid_amount",
            ValidationError::UnknownCommand => "unknown_command",
        }
    }
}
