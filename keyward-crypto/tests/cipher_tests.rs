use keyward_crypto::{
    NONCE_SIZE, SealedValue, TAG_SIZE, generate_random_key, open, open_string, seal, seal_string,
};

const CTX: &[u8] = b"test";

#[test]
fn seal_open_roundtrip() {
    let key = generate_random_key();
    let sealed = seal(&key, b"ABCD-1234-EFGH", CTX).unwrap();
    assert_eq!(open(&key, &sealed, CTX).unwrap(), b"ABCD-1234-EFGH");
}

#[test]
fn seal_open_empty() {
    let key = generate_random_key();
    let sealed = seal(&key, b"", CTX).unwrap();
    assert_eq!(sealed.ciphertext.len(), TAG_SIZE);
    assert_eq!(open(&key, &sealed, CTX).unwrap(), b"");
}

#[test]
fn wrong_key_fails() {
    let sealed = seal(&generate_random_key(), b"secret", CTX).unwrap();
    assert!(open(&generate_random_key(), &sealed, CTX).is_err());
}

#[test]
fn wrong_context_fails() {
    let key = generate_random_key();
    let sealed = seal(&key, b"secret", b"license").unwrap();
    assert!(open(&key, &sealed, b"instance").is_err());
}

#[test]
fn tampered_ciphertext_fails() {
    let key = generate_random_key();
    let mut sealed = seal(&key, b"secret", CTX).unwrap();
    sealed.ciphertext[0] ^= 0xFF;
    assert!(open(&key, &sealed, CTX).is_err());
}

#[test]
fn same_plaintext_produces_different_ciphertext() {
    let key = generate_random_key();
    let a = seal(&key, b"same", CTX).unwrap();
    let b = seal(&key, b"same", CTX).unwrap();
    assert_ne!(a.nonce, b.nonce);
    assert_ne!(a.ciphertext, b.ciphertext);
}

// ── SealedValue encoding ─────────────────────────────────────────

#[test]
fn sealed_value_base64_roundtrip() {
    let key = generate_random_key();
    let sealed = seal(&key, b"payload", CTX).unwrap();
    let decoded = SealedValue::from_base64(&sealed.to_base64()).unwrap();
    assert_eq!(decoded, sealed);
}

#[test]
fn sealed_value_rejects_invalid_base64() {
    assert!(SealedValue::from_base64("not base64!!!").is_err());
}

#[test]
fn sealed_value_rejects_short_input() {
    use base64::{Engine, engine::general_purpose::STANDARD};
    let short = STANDARD.encode([0u8; NONCE_SIZE + TAG_SIZE - 1]);
    let err = SealedValue::from_base64(&short).unwrap_err();
    assert!(err.to_string().contains("too short"));
}

// ── String helpers ───────────────────────────────────────────────

#[test]
fn string_roundtrip_unicode() {
    let key = generate_random_key();
    let encoded = seal_string(&key, "schlüssel-🔑", CTX).unwrap();
    assert_eq!(open_string(&key, &encoded, CTX).unwrap(), "schlüssel-🔑");
}

#[test]
fn open_string_rejects_non_utf8() {
    let key = generate_random_key();
    let sealed = seal(&key, &[0xFF, 0xFE, 0xFD], CTX).unwrap();
    let err = open_string(&key, &sealed.to_base64(), CTX).unwrap_err();
    assert!(err.to_string().contains("UTF-8"));
}
