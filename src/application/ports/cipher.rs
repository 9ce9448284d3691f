//! Payload cipher port interface

use thiserror::Error;

/// Cipher errors
#[derive(Debug, Clone, Error)]
pub enum CryptoError {
    /// Wrong password, corrupted blob, malformed input — deliberately
    /// indistinguishable. The scheme fails closed and leaks nothing about
    /// which it was.
    #[error("Decryption failed. Incorrect password or corrupted data.")]
    DecryptionFailed,

    #[error("Encryption failed: {0}")]
    EncryptFailed(String),
}

/// Port for password-based encryption of a serializable payload.
///
/// Implementations are pure CPU work; async callers run them under a
/// blocking task. Every encryption must use a fresh salt and nonce.
pub trait PayloadCipher: Send + Sync {
    /// Encrypt a JSON payload into a base64 transport blob.
    fn encrypt(&self, payload: &serde_json::Value, password: &str) -> Result<String, CryptoError>;

    /// Decrypt a transport blob back into its JSON payload.
    fn decrypt(&self, blob: &str, password: &str) -> Result<serde_json::Value, CryptoError>;
}
