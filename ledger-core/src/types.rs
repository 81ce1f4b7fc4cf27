//! Core types for the ledger
//!
//! All binary values have a fixed width and a fixed text rendering:
//! - `Digest` as lowercase hex
//! - `Signature` and `CustomerId` as standard base64
//!
//! Amounts are exact decimals. A withdraw entry stores a negative amount so
//! that a balance is the plain sum of a customer's entries.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte content hash (SHA-256)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest([u8; 32]);

impl Digest {
    /// Fixed placeholder predecessor of the first entry
    pub const GENESIS: Digest = Digest([0u8; 32]);

    /// Create from bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| crate::Error::Key(format!("Invalid digest hex: {}", e)))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| crate::Error::Key("Digest must be 32 bytes".to_string()))?;
        Ok(Self(array))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl TryFrom<String> for Digest {
    type Error = crate::Error;

    fn try_from(s: String) -> crate::Result<Self> {
        Self::from_hex(&s)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.to_hex()
    }
}

/// Detached Ed25519 signature (64 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature([u8; 64]);

impl Signature {
    /// Create from bytes
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Base64 rendering
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    /// Parse from base64
    pub fn from_base64(s: &str) -> crate::Result<Self> {
        let bytes = BASE64
            .decode(s)
            .map_err(|e| crate::Error::Key(format!("Invalid signature base64: {}", e)))?;
        let array: [u8; 64] = bytes
            .try_into()
            .map_err(|_| crate::Error::Key("Signature must be 64 bytes".to_string()))?;
        Ok(Self(array))
    }

    /// Verify against a raw Ed25519 public key
    pub fn verify(&self, message: &[u8], public_key: &[u8; 32]) -> bool {
        crate::crypto::verify_signature(message, self, public_key)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_base64())
    }
}

impl TryFrom<String> for Signature {
    type Error = crate::Error;

    fn try_from(s: String) -> crate::Result<Self> {
        Self::from_base64(&s)
    }
}

impl From<Signature> for String {
    fn from(signature: Signature) -> Self {
        signature.to_base64()
    }
}

/// Customer identifier: the customer's Ed25519 public key
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CustomerId([u8; 32]);

impl CustomerId {
    /// Create from public key bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Public key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Base64 rendering
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    /// Parse from base64
    pub fn from_base64(s: &str) -> crate::Result<Self> {
        let bytes = BASE64
            .decode(s)
            .map_err(|e| crate::Error::Key(format!("Invalid customer id base64: {}", e)))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| crate::Error::Key("Customer id must be 32 bytes".to_string()))?;
        Ok(Self(array))
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

impl fmt::Debug for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomerId({})", self.to_base64())
    }
}

impl TryFrom<String> for CustomerId {
    type Error = crate::Error;

    fn try_from(s: String) -> crate::Result<Self> {
        Self::from_base64(&s)
    }
}

impl From<CustomerId> for String {
    fn from(id: CustomerId) -> Self {
        id.to_base64()
    }
}

/// Account operation recorded in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum Operation {
    /// Customer registration
    Register {
        /// New customer
        #[serde(rename = "customerId")]
        customer_id: CustomerId,
    },

    /// Funds credited (positive amount)
    Deposit {
        /// Customer
        #[serde(rename = "customerId")]
        customer_id: CustomerId,
        /// Positive amount
        amount: Decimal,
    },

    /// Funds debited (negative amount)
    Withdraw {
        /// Customer
        #[serde(rename = "customerId")]
        customer_id: CustomerId,
        /// Negative amount
        amount: Decimal,
    },
}

impl Operation {
    /// Customer this operation belongs to
    pub fn customer_id(&self) -> &CustomerId {
        match self {
            Operation::Register { customer_id }
            | Operation::Deposit { customer_id, .. }
            | Operation::Withdraw { customer_id, .. } => customer_id,
        }
    }

    /// Balance delta carried by this operation
    pub fn signed_amount(&self) -> Decimal {
        match self {
            Operation::Register { .. } => Decimal::ZERO,
            Operation::Deposit { amount, .. } | Operation::Withdraw { amount, .. } => *amount,
        }
    }

    /// True for `Register`
    pub fn is_register(&self) -> bool {
        matches!(self, Operation::Register { .. })
    }

    /// Withdrawal of `magnitude` (stored as a negative delta)
    pub fn withdraw(customer_id: CustomerId, magnitude: Decimal) -> Self {
        Operation::Withdraw {
            customer_id,
            amount: -magnitude,
        }
    }
}

/// One link of the hash chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Recorded operation
    pub value: Operation,

    /// `H(previous hash || canonical(value))`
    pub hash: Digest,

    /// Authority signature over `hash`
    pub signature: Signature,
}
