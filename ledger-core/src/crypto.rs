//! Cryptographic operations for the ledger
//!
//! This module provides:
//! - Ed25519 key pair generation, signing, and verification
//! - The authority key file (`{ publicKey, privateKey }`, base64)
//! - A redacting wrapper for the one-time customer secret
//!
//! Private halves use the 64-byte `seed || public key` layout.

use crate::store::write_atomic;
use crate::types::{CustomerId, Signature};
use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Ed25519 key pair for signing
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_seed(&rand::random::<[u8; 32]>())
    }

    /// Create from seed (32 bytes) - deterministic generation
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Parse the 64-byte keypair encoding (base64)
    pub fn from_base64(secret: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(secret.trim())
            .map_err(|e| Error::Key(format!("Invalid private key base64: {}", e)))?;
        let array: [u8; 64] = bytes
            .try_into()
            .map_err(|_| Error::Key("Private key must be 64 bytes".to_string()))?;
        let signing_key = SigningKey::from_keypair_bytes(&array)
            .map_err(|e| Error::Key(format!("Inconsistent key pair: {}", e)))?;
        let verifying_key = signing_key.verifying_key();

        Ok(Self {
            signing_key,
            verifying_key,
        })
    }

    /// Get public key bytes
    pub fn public_key(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Public key as a customer identifier
    pub fn customer_id(&self) -> CustomerId {
        CustomerId::from_bytes(self.public_key())
    }

    /// Export the 64-byte keypair encoding (base64). Handle with care.
    pub fn secret_base64(&self) -> String {
        BASE64.encode(self.signing_key.to_keypair_bytes())
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> Signature {
        let signature = self.signing_key.sign(message);
        Signature::from_bytes(signature.to_bytes())
    }

    /// Verify a signature
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        let dalek_sig = DalekSignature::from_bytes(signature.as_bytes());
        self.verifying_key
            .verify(message, &dalek_sig)
            .map_err(|_| Error::Authentication)
    }

    /// Load the authority key file, generating and persisting a fresh pair
    /// on first run.
    pub fn load_or_generate(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let file: KeyFile = serde_json::from_str(&content)?;
            let keypair = Self::from_base64(&file.private_key)?;

            if BASE64.encode(keypair.public_key()) != file.public_key.trim() {
                return Err(Error::Key(
                    "Public key does not match private key".to_string(),
                ));
            }

            tracing::info!(path = %path.display(), "Loaded authority key pair");
            return Ok(keypair);
        }

        let keypair = Self::generate();
        let file = KeyFile {
            public_key: BASE64.encode(keypair.public_key()),
            private_key: keypair.secret_base64(),
        };
        write_atomic(path, serde_json::to_string_pretty(&file)?.as_bytes())?;

        tracing::info!(
            path = %path.display(),
            public_key = %file.public_key,
            "Generated new authority key pair"
        );
        Ok(keypair)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &BASE64.encode(self.public_key()))
            .finish_non_exhaustive()
    }
}

/// On-disk authority key file
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyFile {
    public_key: String,
    private_key: String,
}

/// Verify a signature with a public key
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &[u8; 32]) -> bool {
    let dalek_sig = DalekSignature::from_bytes(signature.as_bytes());

    let verifying_key = match VerifyingKey::from_bytes(public_key) {
        Ok(key) => key,
        Err(_) => return false,
    };

    verifying_key.verify(message, &dalek_sig).is_ok()
}

/// Customer private key handed out once at registration.
///
/// Serializes as plain base64 but never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerSecret(String);

impl CustomerSecret {
    /// Wrap an encoded secret
    pub fn new(secret: String) -> Self {
        Self(secret)
    }

    /// Encoded secret
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Decode into a signing key pair
    pub fn to_keypair(&self) -> Result<KeyPair> {
        KeyPair::from_base64(&self.0)
    }
}

impl fmt::Debug for CustomerSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomerSecret(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let keypair = KeyPair::generate();
        assert_ne!(keypair.public_key(), KeyPair::generate().public_key());
    }

    #[test]
    fn test_keypair_from_seed() {
        let seed = [42u8; 32];
        let keypair1 = KeyPair::from_seed(&seed);
        let keypair2 = KeyPair::from_seed(&seed);

        assert_eq!(keypair1.public_key(), keypair2.public_key());
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = KeyPair::generate();
        let message = b"test message";

        let signature = keypair.sign(message);
        assert!(keypair.verify(message, &signature).is_ok());
        assert!(keypair.verify(b"wrong message", &signature).is_err());
    }

    #[test]
    fn test_verify_signature() {
        let keypair = KeyPair::generate();
        let message = b"test message";
        let signature = keypair.sign(message);

        assert!(verify_signature(message, &signature, &keypair.public_key()));

        let wrong_keypair = KeyPair::generate();
        assert!(!verify_signature(message, &signature, &wrong_keypair.public_key()));
    }

    #[test]
    fn test_secret_roundtrip() {
        let keypair = KeyPair::generate();
        let restored = KeyPair::from_base64(&keypair.secret_base64()).unwrap();
        assert_eq!(restored.public_key(), keypair.public_key());

        let message = b"payload";
        assert!(restored.verify(message, &keypair.sign(message)).is_ok());
    }

    #[test]
    fn test_rejects_malformed_secret() {
        assert!(KeyPair::from_base64("not base64!").is_err());
        assert!(KeyPair::from_base64(&BASE64.encode([1u8; 32])).is_err());

        // Public half that does not belong to the seed
        let mut bytes = KeyPair::generate().signing_key.to_keypair_bytes();
        bytes[32..].copy_from_slice(&KeyPair::generate().public_key());
        assert!(KeyPair::from_base64(&BASE64.encode(bytes)).is_err());
    }

    #[test]
    fn test_load_or_generate_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");

        let first = KeyPair::load_or_generate(&path).unwrap();
        assert!(path.exists());

        let second = KeyPair::load_or_generate(&path).unwrap();
        assert_eq!(first.public_key(), second.public_key());

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw["publicKey"].is_string());
        assert!(raw["privateKey"].is_string());
    }

    #[test]
    fn test_load_rejects_mismatched_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        let file = KeyFile {
            public_key: BASE64.encode(KeyPair::generate().public_key()),
            private_key: KeyPair::generate().secret_base64(),
        };
        std::fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();

        assert!(matches!(
            KeyPair::load_or_generate(&path),
            Err(Error::Key(_))
        ));
    }

    #[test]
    fn test_customer_secret_redacted() {
        let secret = CustomerSecret::new(KeyPair::generate().secret_base64());
        assert_eq!(format!("{:?}", secret), "CustomerSecret(<redacted>)");
        assert!(secret.to_keypair().is_ok());
    }

    #[test]
    fn test_known_signature_vector() {
        // RFC 8032 test vector 1
        let seed = [
            0x9d, 0x61, 0xb1, 0x9d, 0xef, 0xfd, 0x5a, 0x60,
            0xba, 0x84, 0x4a, 0xf4, 0x92, 0xec, 0x2c, 0xc4,
            0x44, 0x49, 0xc5, 0x69, 0x7b, 0x32, 0x69, 0x19,
            0x70, 0x3b, 0xac, 0x03, 0x1c, 0xae, 0x7f, 0x60,
        ];

        let keypair = KeyPair::from_seed(&seed);
        assert_eq!(
            hex::encode(keypair.public_key()),
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
        );
        let signature = keypair.sign(b"");
        assert!(keypair.verify(b"", &signature).is_ok());
    }
}
