//! AES-256-GCM sealing for stored OAuth tokens.
//!
//! Access and refresh tokens never reach `oauth_credentials` in plaintext.
//! Each sealed value is base64 of `nonce || ciphertext || tag` with a fresh
//! 12-byte nonce, so sealing the same token twice yields different text.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::store::StoreError;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Symmetric cipher keyed from the configured passphrase.
#[derive(Clone)]
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    /// The AES key is the SHA-256 digest of `passphrase`.
    pub fn new(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        Self {
            cipher: Aes256Gcm::new(&digest),
        }
    }

    pub fn seal(&self, plaintext: &str) -> Result<String, StoreError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| StoreError::Encryption(format!("seal failed: {e}")))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(STANDARD.encode(out))
    }

    pub fn open(&self, sealed_b64: &str) -> Result<String, StoreError> {
        let raw = STANDARD
            .decode(sealed_b64)
            .map_err(|e| StoreError::Encryption(format!("base64: {e}")))?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(StoreError::Encryption("sealed value too short".into()));
        }

        let (nonce, body) = raw.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| StoreError::Encryption("open failed (wrong key?)".into()))?;

        String::from_utf8(plain).map_err(|e| StoreError::Encryption(format!("utf-8: {e}")))
    }
}
