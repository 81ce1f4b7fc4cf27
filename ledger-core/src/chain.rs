//! Hash chain construction and verification
//!
//! Each entry's hash is `SHA-256(previous hash || canonical(value))`, with
//! [`Digest::GENESIS`] as the predecessor of the first entry. The authority
//! signs every link hash, so verification checks both the recomputed hash
//! and the signature, stopping at the first failure.

use crate::canonical::hash_bytes;
use crate::crypto::KeyPair;
use crate::error::IntegrityError;
use crate::types::{Digest, Entry, Operation};

/// Compute the link hash of `value` following `previous`
pub fn link_hash(previous: &Digest, value: &Operation) -> Digest {
    let canonical = value.canonical_bytes();
    let mut input = Vec::with_capacity(32 + canonical.len());
    input.extend_from_slice(previous.as_bytes());
    input.extend_from_slice(&canonical);
    hash_bytes(&input)
}

/// Build the signed entry that extends a chain ending at `previous`
pub fn make_entry(previous: &Digest, value: Operation, authority: &KeyPair) -> Entry {
    let hash = link_hash(previous, &value);
    let signature = authority.sign(hash.as_bytes());
    Entry {
        value,
        hash,
        signature,
    }
}

/// Verify hash chain integrity and every authority signature.
///
/// Returns the first failing index; nothing after a break can be trusted.
pub fn verify_chain(
    entries: &[Entry],
    genesis: &Digest,
    authority_public_key: &[u8; 32],
) -> Result<(), IntegrityError> {
    let mut previous = *genesis;

    for (index, entry) in entries.iter().enumerate() {
        let expected = link_hash(&previous, &entry.value);
        if entry.hash != expected {
            return Err(IntegrityError::HashMismatch {
                index,
                expected: expected.to_hex(),
                actual: entry.hash.to_hex(),
            });
        }

        if !entry
            .signature
            .verify(entry.hash.as_bytes(), authority_public_key)
        {
            return Err(IntegrityError::BadSignature { index });
        }

        previous = entry.hash;
    }

    Ok(())
}
