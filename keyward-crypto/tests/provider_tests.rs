use keyward_crypto::{
    CryptoProvider, EncryptionKey, HashSecret, KeyedCryptoProvider, PassthroughProvider,
    generate_random_key, seal_string,
};
use std::sync::Arc;

fn provider() -> KeyedCryptoProvider {
    KeyedCryptoProvider::new(
        EncryptionKey::from_bytes([5u8; 32]),
        HashSecret::from_bytes(vec![6u8; 32]).unwrap(),
    )
}

#[test]
fn keyed_provider_roundtrip() {
    let p = provider();
    let sealed = p.encrypt("AAAA-BBBB-CCCC").unwrap();
    assert_ne!(sealed, "AAAA-BBBB-CCCC");
    assert_eq!(p.decrypt(&sealed).unwrap(), "AAAA-BBBB-CCCC");
}

#[test]
fn keyed_provider_hash_is_stable_across_instances() {
    assert_eq!(provider().hash("key"), provider().hash("key"));
}

#[test]
fn keyed_provider_rejects_foreign_ciphertext() {
    let other = KeyedCryptoProvider::new(generate_random_key(), HashSecret::random());
    let sealed = other.encrypt("x").unwrap();
    assert!(provider().decrypt(&sealed).is_err());
}

#[test]
fn keyed_provider_rejects_other_context() {
    let key = EncryptionKey::from_bytes([5u8; 32]);
    let sealed = seal_string(&key, "AAAA-BBBB-CCCC", b"license_key").unwrap();
    assert!(provider().decrypt(&sealed).is_err());
}

#[test]
fn keyed_provider_rejects_garbage() {
    assert!(provider().decrypt("garbage").is_err());
}

#[test]
fn passthrough_is_identity() {
    let p = PassthroughProvider;
    assert_eq!(p.encrypt("abc").unwrap(), "abc");
    assert_eq!(p.decrypt("abc").unwrap(), "abc");
    assert_eq!(p.hash("abc"), keyward_crypto::sha256_hex("abc"));
}

#[test]
fn providers_are_object_safe() {
    let providers: Vec<Arc<dyn CryptoProvider>> =
        vec![Arc::new(provider()), Arc::new(PassthroughProvider)];
    for p in providers {
        let sealed = p.encrypt("k").unwrap();
        assert_eq!(p.decrypt(&sealed).unwrap(), "k");
    }
}
