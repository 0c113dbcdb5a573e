mod common;

use common::Fixture;
use keyward_license::{LicenseError, NewLicense};
use keyward_types::{LicenseId, LicenseStatus};
use pretty_assertions::assert_eq;

#[test]
fn issue_stores_hash_and_ciphertext() {
    let fx = Fixture::keyed();
    let license = fx
        .issuer()
        .issue(&NewLicense {
            product_id: Some(12),
            ..NewLicense::active("KEY-123", 3)
        })
        .unwrap();

    assert_eq!(license.times_activated, 0);
    assert_eq!(license.times_activated_max, Some(3));
    assert_eq!(license.product_id, Some(12));
    assert_eq!(license.status, LicenseStatus::Active);
    assert_ne!(license.encrypted_key, "KEY-123");
    assert_eq!(license.key_hash, fx.ctx.crypto().hash("KEY-123"));
    assert_eq!(
        fx.ctx.crypto().decrypt(&license.encrypted_key).unwrap(),
        "KEY-123"
    );
}

#[test]
fn issue_rejects_duplicate_key() {
    let fx = Fixture::new();
    fx.license("K", Some(1));

    let err = fx
        .issuer()
        .issue(&NewLicense::active(" K ", 1))
        .unwrap_err();
    assert!(matches!(err, LicenseError::Validation(ref msg) if msg == "duplicate license key"));
}

#[test]
fn issue_rejects_empty_key() {
    let fx = Fixture::new();
    let err = fx.issuer().issue(&NewLicense::default()).unwrap_err();
    assert_eq!(err.kind(), "validation_error");
}

#[test]
fn update_key_rekeys_license() {
    let fx = Fixture::new();
    let license = fx.license("OLD", Some(1));
    fx.activations().activate("OLD", "A").unwrap();

    let updated = fx.issuer().update_key(license.id, "NEW").unwrap();
    assert_eq!(updated.id, license.id);
    assert_eq!(updated.times_activated, 1);

    assert!(matches!(
        fx.activations().license("OLD"),
        Err(LicenseError::LicenseNotFound)
    ));
    fx.activations().validate("NEW", "A").unwrap();
}

#[test]
fn update_key_to_own_key_is_allowed() {
    let fx = Fixture::new();
    let license = fx.license("K", Some(1));
    fx.issuer().update_key(license.id, "K").unwrap();
}

#[test]
fn update_key_rejects_collision() {
    let fx = Fixture::new();
    let a = fx.license("A", Some(1));
    fx.license("B", Some(1));

    let err = fx.issuer().update_key(a.id, "B").unwrap_err();
    assert_eq!(err.kind(), "validation_error");
}

#[test]
fn update_missing_license() {
    let fx = Fixture::new();
    assert!(matches!(
        fx.issuer().update_key(LicenseId::new(77), "X"),
        Err(LicenseError::LicenseNotFound)
    ));
    assert!(matches!(
        fx.issuer().set_status(LicenseId::new(77), LicenseStatus::Active),
        Err(LicenseError::LicenseNotFound)
    ));
}
