//! Password-based payload cipher
//!
//! Construction: PBKDF2-HMAC-SHA256 over the password with a fresh 16-byte
//! salt derives a 256-bit key; AES-256-GCM with a fresh 12-byte nonce
//! encrypts the canonical JSON bytes. The transport blob is
//! `salt ‖ nonce ‖ ciphertext+tag`, base64-encoded. Salt and nonce are
//! never reused across encryptions.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::prelude::*;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::application::ports::{CryptoError, PayloadCipher};

/// PBKDF2 iteration count. Fixed; both sides of a round trip must agree.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
/// GCM authentication tag appended to the ciphertext.
const TAG_LEN: usize = 16;

/// Password-derived-key cipher for published envelopes.
pub struct PasswordCipher {
    iterations: u32,
}

impl PasswordCipher {
    pub fn new() -> Self {
        Self {
            iterations: PBKDF2_ITERATIONS,
        }
    }

    /// Reduced-cost instance. Only for tests that exercise many key
    /// derivations; production code uses [`PasswordCipher::new`].
    pub fn with_iterations(iterations: u32) -> Self {
        Self { iterations }
    }

    fn derive_key(&self, password: &str, salt: &[u8]) -> [u8; 32] {
        let mut key = [0u8; 32];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, self.iterations, &mut key);
        key
    }
}

impl Default for PasswordCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadCipher for PasswordCipher {
    fn encrypt(&self, payload: &serde_json::Value, password: &str) -> Result<String, CryptoError> {
        let plaintext =
            serde_json::to_vec(payload).map_err(|e| CryptoError::EncryptFailed(e.to_string()))?;

        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let key = self.derive_key(password, &salt);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| CryptoError::EncryptFailed("AES-GCM encryption failed".into()))?;

        let mut blob = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(BASE64_STANDARD.encode(blob))
    }

    fn decrypt(&self, blob: &str, password: &str) -> Result<serde_json::Value, CryptoError> {
        // Every failure path collapses to the same error: the caller must
        // not be able to tell a wrong password from corrupted data
        let bytes = BASE64_STANDARD
            .decode(blob.as_bytes())
            .map_err(|_| CryptoError::DecryptionFailed)?;
        if bytes.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
            return Err(CryptoError::DecryptionFailed);
        }

        let (salt, rest) = bytes.split_at(SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

        let key = self.derive_key(password, salt);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)?;

        serde_json::from_slice(&plaintext).map_err(|_| CryptoError::DecryptionFailed)
    }
}
