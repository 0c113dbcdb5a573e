//! Key hashing and encryption for keyward.
//!
//! Every license key and instance identifier is persisted twice:
//! - as an HMAC-SHA256 digest, for lookup and uniqueness without plaintext
//! - as a ChaCha20-Poly1305 ciphertext, so an administrator can read it back
//!
//! The two are always computed from the plaintext at write time; one is never
//! derived from the other.

mod cipher;
mod error;
mod hash;
mod key;
mod provider;

pub use cipher::{NONCE_SIZE, SealedValue, TAG_SIZE, open, open_string, seal, seal_string};
pub use error::{CryptoError, CryptoResult};
pub use hash::{DIGEST_HEX_LEN, KeyHasher, sha256_hex};
pub use key::{
    EncryptionKey, HashSecret, KEY_SIZE, KdfParams, MIN_HASH_SECRET_SIZE, SALT_SIZE, Salt,
    derive_key, generate_random_key,
};
pub use provider::{CryptoProvider, KeyedCryptoProvider, PassthroughProvider};
