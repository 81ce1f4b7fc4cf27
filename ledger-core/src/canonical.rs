//! Canonical serialization for cryptographic hashing
//!
//! Ensures deterministic byte representation for chain links and request
//! signatures. Fixed field order, length-prefixed strings, normalized
//! decimals, explicit presence markers for optional fields.

use crate::types::{Digest, Operation};
use rust_decimal::Decimal;
use sha2::{Digest as _, Sha256};

const TAG_REGISTER: u8 = 1;
const TAG_DEPOSIT: u8 = 2;
const TAG_WITHDRAW: u8 = 3;

/// Canonical serializer
#[derive(Debug, Default)]
pub struct CanonicalSerializer {
    buffer: Vec<u8>,
}

impl CanonicalSerializer {
    /// Create new serializer
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Write raw bytes (fixed-width fields only)
    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(bytes);
        self
    }

    /// Write single byte
    pub fn write_u8(&mut self, n: u8) -> &mut Self {
        self.buffer.push(n);
        self
    }

    /// Write u32 (big-endian)
    pub fn write_u32(&mut self, n: u32) -> &mut Self {
        self.write_bytes(&n.to_be_bytes())
    }

    /// Write string (length-prefixed)
    pub fn write_string(&mut self, s: &str) -> &mut Self {
        let bytes = s.as_bytes();
        self.write_u32(bytes.len() as u32);
        self.write_bytes(bytes)
    }

    /// Write decimal in normalized form, so `100` and `100.00` encode alike
    pub fn write_decimal(&mut self, d: &Decimal) -> &mut Self {
        self.write_string(&d.normalize().to_string())
    }

    /// Write optional decimal
    pub fn write_option_decimal(&mut self, opt: Option<&Decimal>) -> &mut Self {
        match opt {
            Some(d) => self.write_u8(1).write_decimal(d),
            None => self.write_u8(0),
        }
    }

    /// Write optional digest
    pub fn write_option_digest(&mut self, opt: Option<&Digest>) -> &mut Self {
        match opt {
            Some(d) => self.write_u8(1).write_bytes(d.as_bytes()),
            None => self.write_u8(0),
        }
    }

    /// Finalize and return bytes
    pub fn finalize(self) -> Vec<u8> {
        self.buffer
    }
}

impl Operation {
    /// Serialize to canonical bytes (for chain hashing)
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut ser = CanonicalSerializer::new();

        match self {
            Operation::Register { customer_id } => {
                ser.write_u8(TAG_REGISTER).write_bytes(customer_id.as_bytes());
            }
            Operation::Deposit { customer_id, amount } => {
                ser.write_u8(TAG_DEPOSIT)
                    .write_bytes(customer_id.as_bytes())
                    .write_decimal(amount);
            }
            Operation::Withdraw { customer_id, amount } => {
                ser.write_u8(TAG_WITHDRAW)
                    .write_bytes(customer_id.as_bytes())
                    .write_decimal(amount);
            }
        }

        ser.finalize()
    }
}

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Digest::from_bytes(hasher.finalize().into())
}
