//! Request/response objects exchanged between tellers and the bank
//!
//! Requests: `{ message: { cmd, customerId?, amount?, lastHash? }, signature? }`.
//! The signature covers [`Message::signing_bytes`], which includes the
//! embedded `lastHash` replay token. Registration is unsigned.
//!
//! Responses are tagged by `cmd`: `register`, `balance` or `error`.

use crate::canonical::CanonicalSerializer;
use crate::crypto::{CustomerSecret, KeyPair};
use crate::error::Error;
use crate::types::{CustomerId, Digest, Signature};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Generic reply for failures that are not the client's business
pub const INTERNAL_ERROR_MSG: &str = "Request could not be completed";

/// Reply for undecodable input
pub const MALFORMED_REQUEST_MSG: &str = "Malformed request";

/// Command sent by a teller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum Message {
    /// Create a new customer identity
    Register,

    /// Query the current balance
    #[serde(rename_all = "camelCase")]
    Balance {
        /// Customer
        customer_id: CustomerId,
        /// Replay token
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_hash: Option<Digest>,
    },

    /// Credit a positive amount
    #[serde(rename_all = "camelCase")]
    Deposit {
        /// Customer
        customer_id: CustomerId,
        /// Amount to credit
        amount: Decimal,
        /// Replay token
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_hash: Option<Digest>,
    },

    /// Debit a positive magnitude
    #[serde(rename_all = "camelCase")]
    Withdraw {
        /// Customer
        customer_id: CustomerId,
        /// Magnitude to debit
        amount: Decimal,
        /// Replay token
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_hash: Option<Digest>,
    },

    /// Any `cmd` this bank does not understand
    #[serde(other)]
    Unknown,
}

impl Message {
    /// Command name as it appears on the wire
    pub fn cmd(&self) -> &'static str {
        match self {
            Message::Register => "register",
            Message::Balance { .. } => "balance",
            Message::Deposit { .. } => "deposit",
            Message::Withdraw { .. } => "withdraw",
            Message::Unknown => "unknown",
        }
    }

    /// Customer the command acts for
    pub fn customer_id(&self) -> Option<&CustomerId> {
        match self {
            Message::Balance { customer_id, .. }
            | Message::Deposit { customer_id, .. }
            | Message::Withdraw { customer_id, .. } => Some(customer_id),
            Message::Register | Message::Unknown => None,
        }
    }

    /// Amount, for deposit and withdraw
    pub fn amount(&self) -> Option<&Decimal> {
        match self {
            Message::Deposit { amount, .. } | Message::Withdraw { amount, .. } => Some(amount),
            _ => None,
        }
    }

    /// Embedded replay token
    pub fn last_hash(&self) -> Option<&Digest> {
        match self {
            Message::Balance { last_hash, .. }
            | Message::Deposit { last_hash, .. }
            | Message::Withdraw { last_hash, .. } => last_hash.as_ref(),
            Message::Register | Message::Unknown => None,
        }
    }

    /// Replace the replay token
    pub fn with_last_hash(mut self, token: Option<Digest>) -> Self {
        match &mut self {
            Message::Balance { last_hash, .. }
            | Message::Deposit { last_hash, .. }
            | Message::Withdraw { last_hash, .. } => *last_hash = token,
            Message::Register | Message::Unknown => {}
        }
        self
    }

    /// Canonical bytes covered by the customer's signature
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut ser = CanonicalSerializer::new();
        ser.write_string(self.cmd());

        match self.customer_id() {
            Some(id) => ser.write_u8(1).write_bytes(id.as_bytes()),
            None => ser.write_u8(0),
        };

        ser.write_option_decimal(self.amount())
            .write_option_digest(self.last_hash());

        ser.finalize()
    }
}

/// Request envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Command
    pub message: Message,

    /// Customer signature over the message (absent for registration)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

impl Request {
    /// Unsigned registration request
    pub fn register() -> Self {
        Self {
            message: Message::Register,
            signature: None,
        }
    }

    /// Sign `message` with the customer's key pair
    pub fn signed(message: Message, customer: &KeyPair) -> Self {
        let signature = customer.sign(&message.signing_bytes());
        Self {
            message,
            signature: Some(signature),
        }
    }
}

/// Reply sent by the bank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum Response {
    /// New identity. The secret is shown exactly once.
    #[serde(rename_all = "camelCase")]
    Register {
        /// New customer id (public key)
        customer_id: CustomerId,
        /// Customer private key, never retained by the bank
        customer_secret: CustomerSecret,
        /// Chain hash of the registration entry
        hash: Digest,
    },

    /// Balance, plus the new chain hash after a mutation
    #[serde(rename_all = "camelCase")]
    Balance {
        /// Current balance
        balance: Decimal,
        /// Customer (mutations only)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        customer_id: Option<CustomerId>,
        /// New chain hash (mutations only)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hash: Option<Digest>,
    },

    /// Rejection or failure
    Error {
        /// Human readable reason
        msg: String,
    },
}

impl Response {
    /// Error response with a message
    pub fn error(msg: impl Into<String>) -> Self {
        Response::Error { msg: msg.into() }
    }

    /// Map an error to what the client is allowed to see
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::Authentication | Error::Validation(_) => Self::error(error.to_string()),
            _ => Self::error(INTERNAL_ERROR_MSG),
        }
    }

    /// New chain hash carried by the response, if any
    pub fn hash(&self) -> Option<&Digest> {
        match self {
            Response::Register { hash, .. } => Some(hash),
            Response::Balance { hash, .. } => hash.as_ref(),
            Response::Error { .. } => None,
        }
    }

    /// Customer the response refers to, if stated
    pub fn customer_id(&self) -> Option<&CustomerId> {
        match self {
            Response::Register { customer_id, .. } => Some(customer_id),
            Response::Balance { customer_id, .. } => customer_id.as_ref(),
            Response::Error { .. } => None,
        }
    }

    /// True for `Response::Error`
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}
