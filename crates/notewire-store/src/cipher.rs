//! AES-256-GCM cipher for note content.
//!
//! The 32-byte key is the SHA-256 digest of the configured passphrase, so
//! operators configure a human passphrase rather than raw key material. A
//! random 12-byte nonce is prepended to each ciphertext and the whole blob
//! is base64-encoded for storage in a text column.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// 12-byte nonce size for AES-GCM.
const NONCE_SIZE: usize = 12;

/// Errors raised during note encryption/decryption.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The stored blob is not valid base64.
    #[error("ciphertext is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The stored blob is shorter than a nonce.
    #[error("ciphertext too short to carry a nonce")]
    CiphertextTooShort,

    /// AES-GCM refused to encrypt.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Tampered ciphertext, or a different key than the one that wrote it.
    #[error("decryption failed")]
    DecryptionFailed,
}

/// Symmetric cipher applied to note content before/after storage.
pub struct NoteCipher {
    cipher: Aes256Gcm,
}

impl NoteCipher {
    /// Build a cipher from a passphrase.
    pub fn new(passphrase: &str) -> Self {
        let key_bytes: [u8; 32] = Sha256::digest(passphrase.as_bytes()).into();
        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypt plaintext; output is base64(nonce || ciphertext).
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut combined = nonce.to_vec();
        combined.extend(ciphertext);
        Ok(BASE64.encode(combined))
    }

    /// Decrypt a blob produced by [`NoteCipher::encrypt`] under the same key.
    pub fn decrypt(&self, ciphertext_b64: &str) -> Result<String, CipherError> {
        let combined = BASE64.decode(ciphertext_b64)?;
        if combined.len() < NONCE_SIZE {
            return Err(CipherError::CiphertextTooShort);
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CipherError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::DecryptionFailed)
    }
}
