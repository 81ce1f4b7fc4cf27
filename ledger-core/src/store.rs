//! Encrypted-at-rest storage of the ledger
//!
//! The whole entry sequence is serialized to JSON, sealed with AES-256-GCM
//! under a fresh random nonce and written as `{ cipherText, nonce }`.
//!
//! # Durability
//!
//! Every save replaces the file atomically: write a sibling temp file,
//! fsync it, rename it over the target, fsync the directory. A crash leaves
//! either the old or the new blob, never a torn one.

use crate::{Error, Result};
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// AES-GCM nonce length (96 bits)
const NONCE_LEN: usize = 12;

/// Symmetric store key (AES-256)
#[derive(Clone)]
pub struct StoreKey([u8; 32]);

impl StoreKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate a new random key
    pub fn generate() -> Self {
        Self(rand::random())
    }

    /// Parse from base64 (as passed on the command line)
    pub fn from_base64(s: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(s.trim())
            .map_err(|e| Error::Key(format!("Invalid store key base64: {}", e)))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::Key("Store key must be 32 bytes".to_string()))?;
        Ok(Self(array))
    }

    /// Base64 rendering
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

impl fmt::Debug for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StoreKey(<redacted>)")
    }
}

/// On-disk representation of the sealed ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedBlob {
    /// Ciphertext with authentication tag (base64)
    pub cipher_text: String,

    /// Nonce (base64)
    pub nonce: String,
}

/// Authenticated-encrypt `plain` under a freshly generated nonce.
///
/// The nonce is never caller-supplied, so it cannot be reused by mistake.
pub fn seal(plain: &[u8], key: &StoreKey) -> Result<EncryptedBlob> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let cipher_text = key
        .cipher()
        .encrypt(&nonce, plain)
        .map_err(|e| Error::Persistence(format!("Encryption failed: {}", e)))?;

    Ok(EncryptedBlob {
        cipher_text: BASE64.encode(cipher_text),
        nonce: BASE64.encode(nonce),
    })
}

/// Authenticated decryption. Fails closed on any key or ciphertext mismatch.
pub fn open(blob: &EncryptedBlob, key: &StoreKey) -> Result<Vec<u8>> {
    let cipher_text = BASE64
        .decode(&blob.cipher_text)
        .map_err(|e| Error::Decrypt(format!("Invalid ciphertext base64: {}", e)))?;
    let nonce_bytes = BASE64
        .decode(&blob.nonce)
        .map_err(|e| Error::Decrypt(format!("Invalid nonce base64: {}", e)))?;

    if nonce_bytes.len() != NONCE_LEN {
        return Err(Error::Decrypt(format!(
            "Nonce must be {} bytes, got {}",
            NONCE_LEN,
            nonce_bytes.len()
        )));
    }

    key.cipher()
        .decrypt(Nonce::from_slice(&nonce_bytes), cipher_text.as_ref())
        .map_err(|_| Error::Decrypt("Authentication tag mismatch".to_string()))
}

/// Atomically replace `path` with `bytes` (temp file, fsync, rename).
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp_path = tmp_path_for(path);

    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    // Persist the rename itself. Not supported on every platform.
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.{:08x}.tmp", std::process::id(), rand::random::<u32>()));
    path.with_file_name(name)
}

/// Encrypted file holding the full ledger
#[derive(Debug)]
pub struct EncryptedStore {
    path: PathBuf,
    key: StoreKey,
}

impl EncryptedStore {
    /// Create a store bound to a file and key. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>, key: StoreKey) -> Self {
        Self {
            path: path.into(),
            key,
        }
    }

    /// Store file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decrypt the stored blob. `Ok(None)` when no store exists yet.
    pub fn load(&self) -> Result<Option<Vec<u8>>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        let blob: EncryptedBlob = serde_json::from_str(&content)
            .map_err(|e| Error::Decrypt(format!("Malformed store file: {}", e)))?;

        open(&blob, &self.key).map(Some)
    }

    /// Seal and atomically persist `plain`
    pub fn save(&self, plain: &[u8]) -> Result<()> {
        let blob = seal(plain, &self.key)?;
        let json = serde_json::to_vec_pretty(&blob)?;

        write_atomic(&self.path, &json).map_err(|e| {
            Error::Persistence(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        tracing::debug!(path = %self.path.display(), bytes = json.len(), "Ledger store written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let key = StoreKey::generate();
        let blob = seal(b"[1,2,3]", &key).unwrap();
        assert_eq!(open(&blob, &key).unwrap(), b"[1,2,3]");
    }

    #[test]
    fn test_wrong_key_fails_closed() {
        let blob = seal(b"ledger", &StoreKey::generate()).unwrap();
        assert!(matches!(
            open(&blob, &StoreKey::generate()),
            Err(Error::Decrypt(_))
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails_closed() {
        let key = StoreKey::generate();
        let mut blob = seal(b"ledger contents", &key).unwrap();

        let mut bytes = BASE64.decode(&blob.cipher_text).unwrap();
        bytes[0] ^= 0x01;
        blob.cipher_text = BASE64.encode(bytes);

        assert!(matches!(open(&blob, &key), Err(Error::Decrypt(_))));
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let key = StoreKey::generate();
        let a = seal(b"same", &key).unwrap();
        let b = seal(b"same", &key).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.cipher_text, b.cipher_text);
    }

    #[test]
    fn test_bad_nonce_length() {
        let key = StoreKey::generate();
        let mut blob = seal(b"x", &key).unwrap();
        blob.nonce = BASE64.encode([0u8; 24]);
        assert!(matches!(open(&blob, &key), Err(Error::Decrypt(_))));
    }

    #[test]
    fn test_concurrent_atomic_writes_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tellerLog.json");

        let writers: Vec<_> = (0..8u8)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    for _ in 0..20 {
                        write_atomic(&path, &[i; 256]).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let content = fs::read(&path).unwrap();
        assert_eq!(content.len(), 256);
        assert!(content.iter().all(|b| *b == content[0]));

        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_tmp_paths_are_unique() {
        let path = Path::new("/data/log.json");
        let a = tmp_path_for(path);
        let b = tmp_path_for(path);

        assert_ne!(a, b);
        assert_eq!(a.parent(), path.parent());
        assert!(a.to_string_lossy().ends_with(".tmp"));
    }

    #[test]
    fn test_store_key_parsing() {
        let key = StoreKey::generate();
        let parsed = StoreKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(parsed.0, key.0);
        assert!(StoreKey::from_base64(&BASE64.encode([0u8; 16])).is_err());
        assert_eq!(format!("{:?}", key), "StoreKey(<redacted>)");
    }

    #[test]
    fn test_store_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = EncryptedStore::new(dir.path().join("log.json"), StoreKey::generate());

        assert!(store.load().unwrap().is_none());

        store.save(b"first").unwrap();
        store.save(b"second").unwrap();
        assert_eq!(store.load().unwrap().unwrap(), b"second");

        // No temp file left behind
        assert!(!dir.path().join("log.json.tmp").exists());

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert!(raw["cipherText"].is_string());
        assert!(raw["nonce"].is_string());
    }

    #[test]
    fn test_store_write_failure_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = EncryptedStore::new(
            dir.path().join("missing").join("log.json"),
            StoreKey::generate(),
        );
        assert!(matches!(store.save(b"x"), Err(Error::Persistence(_))));
    }
}
