//! Password-based encryption adapter

pub mod cipher;

pub use cipher::{PasswordCipher, PBKDF2_ITERATIONS};
