use keyward_types::{Audit, License, LicenseId, LicenseStatus, Timestamp};

fn license(times_activated: u32, max: Option<u32>) -> License {
    License {
        id: LicenseId::new(1),
        encrypted_key: "ciphertext".into(),
        key_hash: "hash".into(),
        times_activated,
        times_activated_max: max,
        product_id: None,
        status: LicenseStatus::Active,
        expires_at: None,
        audit: Audit {
            created_at: Timestamp::from_millis(0),
            created_by: None,
            updated_at: None,
            updated_by: None,
        },
    }
}

#[test]
fn unset_and_zero_max_both_disable_activation() {
    assert_eq!(license(0, None).activation_limit(), None);
    assert_eq!(license(0, Some(0)).activation_limit(), None);
    assert!(!license(0, None).has_capacity());
    assert!(!license(0, Some(0)).has_capacity());
}

#[test]
fn capacity_respects_limit() {
    assert!(license(1, Some(2)).has_capacity());
    assert!(!license(2, Some(2)).has_capacity());
}

#[test]
fn expiry_checks_date_and_status() {
    let now = Timestamp::from_millis(1_000);
    let mut l = license(0, Some(1));
    assert!(!l.is_expired_at(now));

    l.expires_at = Some(Timestamp::from_millis(999));
    assert!(l.is_expired_at(now));

    l.expires_at = None;
    l.status = LicenseStatus::Expired;
    assert!(l.is_expired_at(now));
}

#[test]
fn status_string_roundtrip() {
    for status in [
        LicenseStatus::Inactive,
        LicenseStatus::Active,
        LicenseStatus::Expired,
        LicenseStatus::Disabled,
    ] {
        assert_eq!(status.as_str().parse::<LicenseStatus>().unwrap(), status);
    }
    assert!("revoked".parse::<LicenseStatus>().is_err());
}

#[test]
fn status_serializes_lowercase() {
    let json = serde_json::to_string(&LicenseStatus::Disabled).unwrap();
    assert_eq!(json, "\"disabled\"");
}

#[test]
fn status_parse_error_is_typed() {
    let err = "revoked".parse::<LicenseStatus>().unwrap_err();
    match err {
        keyward_types::Error::InvalidStatus(value) => assert_eq!(value, "revoked"),
        keyward_types::Error::InvalidId(_) => panic!("expected InvalidStatus"),
    }
}
