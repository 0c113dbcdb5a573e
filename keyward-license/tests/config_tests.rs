use keyward_crypto::CryptoProvider;
use keyward_license::{
    CryptoConfig, ENV_DATABASE_PATH, ENV_ENCRYPTION_KEY, ENV_HASH_SECRET, ENV_PASSPHRASE,
    LicenseError, Licensing, LicensingConfig,
};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::io::Write;

#[test]
fn defaults_when_sections_missing() {
    let config = LicensingConfig::from_toml_str("").unwrap();
    assert_eq!(config, LicensingConfig::default());
    assert!(config.tracker.require_known_license);
    assert_eq!(config.database_path, "keyward.db");
}

#[test]
fn load_from_file() {
    let generated = LicensingConfig::generate();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
database_path = ":memory:"

[crypto]
encryption_key = "{}"
hash_secret = "{}"

[tracker]
require_known_license = false
"#,
        generated.crypto.encryption_key.as_deref().unwrap(),
        generated.crypto.hash_secret.as_deref().unwrap(),
    )
    .unwrap();

    let config = LicensingConfig::load(file.path()).unwrap();
    assert_eq!(config.database_path, ":memory:");
    assert!(!config.tracker.require_known_license);
    assert_eq!(config.crypto, generated.crypto);
}

#[test]
fn missing_file_is_config_error() {
    let err = LicensingConfig::load("/definitely/not/here.toml").unwrap_err();
    assert_eq!(err.kind(), "config_error");
}

#[test]
fn malformed_toml_is_config_error() {
    let err = LicensingConfig::from_toml_str("database_path = [").unwrap_err();
    assert!(matches!(err, LicenseError::Config(_)));
}

#[test]
fn overrides_replace_file_values() {
    let vars: HashMap<&str, &str> = HashMap::from([
        (ENV_DATABASE_PATH, "/tmp/override.db"),
        (ENV_ENCRYPTION_KEY, "ZW5j"),
        (ENV_HASH_SECRET, ""),
    ]);
    let config = LicensingConfig::default()
        .apply_overrides_from(|name| vars.get(name).map(|v| v.to_string()));

    assert_eq!(config.database_path, "/tmp/override.db");
    assert_eq!(config.crypto.encryption_key.as_deref(), Some("ZW5j"));
    // empty values are ignored
    assert_eq!(config.crypto.hash_secret, None);
}

#[test]
fn build_crypto_requires_both_keys() {
    let mut config = LicensingConfig::generate();
    config.crypto.hash_secret = None;
    let err = config.build_crypto().unwrap_err();
    assert!(err.to_string().contains("hash_secret"));
}

#[test]
fn build_crypto_rejects_bad_key() {
    let mut config = LicensingConfig::generate();
    config.crypto.encryption_key = Some("c2hvcnQ=".into());
    let err = config.build_crypto().unwrap_err();
    assert!(err.to_string().contains("encryption_key"));
}

fn passphrase_config() -> LicensingConfig {
    let generated = LicensingConfig::generate();
    LicensingConfig {
        crypto: CryptoConfig {
            passphrase: Some("correct horse battery staple".into()),
            salt: Some(keyward_crypto::Salt::random().to_base64()),
            hash_secret: generated.crypto.hash_secret.clone(),
            encryption_key: None,
        },
        ..generated
    }
}

#[test]
fn passphrase_derives_a_shared_key() {
    let config = passphrase_config();
    let a = config.build_crypto().unwrap();
    let b = config.build_crypto().unwrap();
    assert_eq!(b.decrypt(&a.encrypt("KEY").unwrap()).unwrap(), "KEY");

    let mut other_salt = config.clone();
    other_salt.crypto.salt = Some(keyward_crypto::Salt::random().to_base64());
    let c = other_salt.build_crypto().unwrap();
    assert!(c.decrypt(&a.encrypt("KEY").unwrap()).is_err());
}

#[test]
fn passphrase_requires_salt() {
    let mut config = passphrase_config();
    config.crypto.salt = None;
    let err = config.build_crypto().unwrap_err();
    assert!(matches!(err, LicenseError::Config(_)));
    assert!(err.to_string().contains("crypto.salt"));
}

#[test]
fn missing_key_and_passphrase_is_config_error() {
    let mut config = LicensingConfig::generate();
    config.crypto.encryption_key = None;
    let err = config.build_crypto().unwrap_err();
    assert!(err.to_string().contains("crypto.passphrase"));
}

#[test]
fn passphrase_from_environment() {
    let mut config = passphrase_config();
    config.crypto.passphrase = None;
    let config = config.apply_overrides_from(|name| {
        (name == ENV_PASSPHRASE).then(|| "from the environment".to_string())
    });
    assert_eq!(
        config.crypto.passphrase.as_deref(),
        Some("from the environment")
    );
    config.build_crypto().unwrap();

    let printed = format!("{config:?}");
    assert!(!printed.contains("from the environment"));
}

#[test]
fn same_config_gives_same_hashes() {
    let config = LicensingConfig::generate();
    let a = config.build_crypto().unwrap();
    let b = config.build_crypto().unwrap();
    assert_eq!(a.hash("KEY"), b.hash("KEY"));
    assert_eq!(b.decrypt(&a.encrypt("KEY").unwrap()).unwrap(), "KEY");
}

#[test]
fn generated_config_round_trips_through_toml() {
    let config = LicensingConfig::generate();
    let text = config.to_toml_string().unwrap();
    assert_eq!(LicensingConfig::from_toml_str(&text).unwrap(), config);
}

#[test]
fn debug_redacts_keys() {
    let config = LicensingConfig::generate();
    let printed = format!("{config:?}");
    assert!(printed.contains("[REDACTED]"));
    assert!(!printed.contains(config.crypto.hash_secret.as_deref().unwrap()));
}

#[test]
fn licensing_from_config_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = LicensingConfig::generate();
    config.database_path = dir.path().join("db.sqlite").display().to_string();

    let licensing = Licensing::from_config(&config).unwrap();
    licensing
        .issuer()
        .issue(&keyward_license::NewLicense::active("K", 1))
        .unwrap();
    licensing.activations().activate("K", "A").unwrap();
    drop(licensing);

    let reopened = Licensing::from_config(&config).unwrap();
    let view = reopened.activations().validate("K", "A").unwrap();
    assert_eq!(view.times_activated, 1);
}
