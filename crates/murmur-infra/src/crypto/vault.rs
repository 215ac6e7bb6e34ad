//! AES-256-GCM encryption for the stored API credential.
//!
//! `VaultCrypto` provides symmetric encryption using AES-256-GCM with
//! random nonces. The master key is auto-generated into a key file under
//! the data directory on first use.
//!
//! Encrypted format: `base64(nonce (12 bytes) || ciphertext)`
//!
//! SECURITY: Error types never contain plaintext or key material.

use std::path::Path;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Nonce size for AES-256-GCM (96 bits / 12 bytes).
const NONCE_SIZE: usize = 12;

/// Errors from vault encryption operations.
///
/// IMPORTANT: These errors never include plaintext, key material, or
/// ciphertext in their Display/Debug output to prevent accidental logging
/// of secrets.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("invalid ciphertext: malformed")]
    MalformedCiphertext,

    #[error("key file unavailable: {0}")]
    KeyFileUnavailable(String),

    #[error("corrupted key file")]
    CorruptedKeyFile,
}

/// AES-256-GCM encryption for the credential at rest.
///
/// Each encryption call generates a random 12-byte nonce, prepended to the
/// ciphertext. Encrypting the same plaintext twice produces different
/// output.
pub struct VaultCrypto {
    cipher: Aes256Gcm,
}

impl VaultCrypto {
    /// Create a new VaultCrypto from a raw 32-byte key.
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// Load the master key from a key file, generating one if missing.
    ///
    /// The key is stored as a hex string (64 hex chars = 32 bytes). On
    /// first use a random key is generated and written with restrictive
    /// permissions on Unix.
    pub fn from_key_file(path: &Path) -> Result<Self, VaultError> {
        if path.exists() {
            let hex_key = SecretString::from(
                std::fs::read_to_string(path)
                    .map_err(|e| VaultError::KeyFileUnavailable(e.to_string()))?,
            );
            let key_bytes = hex_decode(hex_key.expose_secret().trim())
                .map_err(|_| VaultError::CorruptedKeyFile)?;
            if key_bytes.len() != 32 {
                return Err(VaultError::CorruptedKeyFile);
            }
            let mut key = [0u8; 32];
            key.copy_from_slice(&key_bytes);
            Ok(Self::new(&key))
        } else {
            let mut key = [0u8; 32];
            OsRng.fill_bytes(&mut key);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| VaultError::KeyFileUnavailable(e.to_string()))?;
            }
            std::fs::write(path, hex_encode(&key))
                .map_err(|e| VaultError::KeyFileUnavailable(e.to_string()))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
            }
            Ok(Self::new(&key))
        }
    }

    /// Encrypt a plaintext string to `base64(nonce || ciphertext)`.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| VaultError::EncryptionFailed)?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(combined))
    }

    /// Decrypt a `base64(nonce || ciphertext)` string.
    pub fn decrypt(&self, encoded: &str) -> Result<String, VaultError> {
        let combined = BASE64
            .decode(encoded)
            .map_err(|_| VaultError::MalformedCiphertext)?;
        if combined.len() < NONCE_SIZE {
            return Err(VaultError::MalformedCiphertext);
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| VaultError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| VaultError::DecryptionFailed)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(s: &str) -> Result<Vec<u8>, ()> {
    if s.len() % 2 != 0 {
        return Err(());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| ()))
        .collect()
}
