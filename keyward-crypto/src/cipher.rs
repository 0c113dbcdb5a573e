//! Field encryption using ChaCha20-Poly1305.
//!
//! Each call draws a fresh random nonce, so encrypting the same key twice
//! yields different ciphertexts. The associated data binds a ciphertext to the
//! context it was sealed under; opening it with any other context fails.
//! [`KeyedCryptoProvider`](crate::KeyedCryptoProvider) seals every column
//! under one format-version context.

use crate::error::{CryptoError, CryptoResult};
use crate::key::EncryptionKey;
use base64::{Engine, engine::general_purpose::STANDARD};
use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use rand::RngCore;

/// Size of nonce in bytes (96 bits for ChaCha20-Poly1305).
pub const NONCE_SIZE: usize = 12;

/// Size of authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// A sealed value: nonce followed by ciphertext and tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedValue {
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
}

impl SealedValue {
    /// Encodes as base64 of `nonce || ciphertext`.
    pub fn to_base64(&self) -> String {
        let mut bytes = Vec::with_capacity(NONCE_SIZE + self.ciphertext.len());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        STANDARD.encode(&bytes)
    }

    /// Decodes the base64 form produced by [`SealedValue::to_base64`].
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| CryptoError::Decryption(format!("invalid base64: {e}")))?;

        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Decryption("data too short".to_string()));
        }

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&bytes[..NONCE_SIZE]);
        Ok(Self {
            nonce,
            ciphertext: bytes[NONCE_SIZE..].to_vec(),
        })
    }
}

/// Seals `plaintext` under `key`, authenticating `context` as associated data.
pub fn seal(key: &EncryptionKey, plaintext: &[u8], context: &[u8]) -> CryptoResult<SealedValue> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad: context,
            },
        )
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(SealedValue {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Opens a value sealed with the same key and context.
pub fn open(key: &EncryptionKey, sealed: &SealedValue, context: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());

    cipher
        .decrypt(
            Nonce::from_slice(&sealed.nonce),
            Payload {
                msg: sealed.ciphertext.as_ref(),
                aad: context,
            },
        )
        .map_err(|_| {
            CryptoError::Decryption("wrong key, wrong context or tampered data".to_string())
        })
}

/// Seals a string and returns the base64 form.
pub fn seal_string(key: &EncryptionKey, plaintext: &str, context: &[u8]) -> CryptoResult<String> {
    Ok(seal(key, plaintext.as_bytes(), context)?.to_base64())
}

/// Opens a base64 string produced by [`seal_string`].
pub fn open_string(key: &EncryptionKey, encoded: &str, context: &[u8]) -> CryptoResult<String> {
    let sealed = SealedValue::from_base64(encoded)?;
    let plaintext = open(key, &sealed, context)?;
    String::from_utf8(plaintext).map_err(|e| CryptoError::Decryption(format!("invalid UTF-8: {e}")))
}
