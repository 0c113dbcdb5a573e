//! The hashing/encryption capability consumed by the stores and managers.
//!
//! Consumers depend on `Arc<dyn CryptoProvider>`; they never see raw keys.
//! [`KeyedCryptoProvider`] is the production implementation and
//! [`PassthroughProvider`] keeps tests free of key management.

use crate::cipher::{open_string, seal_string};
use crate::error::CryptoResult;
use crate::hash::{KeyHasher, sha256_hex};
use crate::key::{EncryptionKey, HashSecret, generate_random_key};

/// Associated data bound into every ciphertext produced by [`KeyedCryptoProvider`].
const SEAL_CONTEXT: &[u8] = b"keyward/v1";

/// Hashing and reversible encryption of secrets.
///
/// `hash` must be a pure function of its input: the same plaintext always
/// yields the same digest, because lookups and unique indexes depend on it.
/// `decrypt(encrypt(x))` must return `x`.
pub trait CryptoProvider: Send + Sync {
    /// Deterministic one-way digest used for equality lookup.
    fn hash(&self, plaintext: &str) -> String;

    /// Reversible encryption for display to an authorized viewer.
    fn encrypt(&self, plaintext: &str) -> CryptoResult<String>;

    /// Inverse of [`CryptoProvider::encrypt`].
    fn decrypt(&self, ciphertext: &str) -> CryptoResult<String>;
}

/// HMAC-SHA256 digests and ChaCha20-Poly1305 ciphertexts.
#[derive(Clone, Debug)]
pub struct KeyedCryptoProvider {
    hasher: KeyHasher,
    key: EncryptionKey,
}

impl KeyedCryptoProvider {
    /// Creates a provider from explicit key material.
    pub fn new(key: EncryptionKey, hash_secret: HashSecret) -> Self {
        Self {
            hasher: KeyHasher::new(hash_secret),
            key,
        }
    }

    /// Creates a provider with fresh random keys. Data written with it is
    /// unreadable once the provider is dropped.
    pub fn ephemeral() -> Self {
        Self::new(generate_random_key(), HashSecret::random())
    }
}

impl CryptoProvider for KeyedCryptoProvider {
    fn hash(&self, plaintext: &str) -> String {
        self.hasher.digest(plaintext)
    }

    fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        seal_string(&self.key, plaintext, SEAL_CONTEXT)
    }

    fn decrypt(&self, ciphertext: &str) -> CryptoResult<String> {
        open_string(&self.key, ciphertext, SEAL_CONTEXT)
    }
}

/// Unkeyed SHA-256 and identity "encryption".
/// Only for tests and local tooling; it stores secrets in the clear.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughProvider;

impl CryptoProvider for PassthroughProvider {
    fn hash(&self, plaintext: &str) -> String {
        sha256_hex(plaintext)
    }

    fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        Ok(plaintext.to_string())
    }

    fn decrypt(&self, ciphertext: &str) -> CryptoResult<String> {
        Ok(ciphertext.to_string())
    }
}
