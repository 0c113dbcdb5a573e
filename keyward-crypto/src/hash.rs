//! Deterministic keyed hashing for lookup columns.

use crate::key::HashSecret;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// HMAC-SHA256 under a server secret, rendered as lowercase hex.
///
/// Keyed so that a leaked table cannot be reversed by hashing candidate keys
/// without also holding the secret. The keyed state is built once and cloned
/// per digest.
#[derive(Clone)]
pub struct KeyHasher {
    mac: HmacSha256,
}

impl KeyHasher {
    /// Creates a hasher for the given secret.
    pub fn new(secret: HashSecret) -> Self {
        // HMAC pads or hashes the key to the block size, so no length is rejected.
        let mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        Self { mac }
    }

    /// Hashes `plaintext`.
    pub fn digest(&self, plaintext: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(plaintext.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for KeyHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyHasher").finish_non_exhaustive()
    }
}

/// Unkeyed SHA-256, lowercase hex.
pub fn sha256_hex(plaintext: &str) -> String {
    use sha2::Digest;
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}
