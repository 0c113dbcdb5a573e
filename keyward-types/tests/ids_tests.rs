use keyward_types::{ActorId, InstalledOnId, InstanceId, LicenseId};
use std::collections::HashSet;
use std::str::FromStr;

// ── LicenseId ─────────────────────────────────────────────────────

#[test]
fn license_id_roundtrips_raw_value() {
    let id = LicenseId::new(42);
    assert_eq!(id.get(), 42);
    assert_eq!(LicenseId::from(42), id);
}

#[test]
fn license_id_display_and_parse() {
    let id = LicenseId::new(1337);
    let s = id.to_string();
    assert_eq!(s, "1337");
    assert_eq!(LicenseId::parse(&s).unwrap(), id);
}

#[test]
fn license_id_parse_trims_whitespace() {
    assert_eq!(LicenseId::parse(" 7 ").unwrap(), LicenseId::new(7));
}

#[test]
fn license_id_parse_invalid() {
    assert!(LicenseId::parse("seven").is_err());
    assert!(LicenseId::from_str("").is_err());
}

#[test]
fn license_id_serde_is_transparent() {
    let json = serde_json::to_string(&LicenseId::new(9)).unwrap();
    assert_eq!(json, "9");
    let back: LicenseId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, LicenseId::new(9));
}

// ── InstanceId / InstalledOnId / ActorId ──────────────────────────

#[test]
fn instance_ids_order_by_raw_value() {
    let mut ids = vec![InstanceId::new(3), InstanceId::new(1), InstanceId::new(2)];
    ids.sort();
    assert_eq!(ids, vec![InstanceId::new(1), InstanceId::new(2), InstanceId::new(3)]);
}

#[test]
fn installed_on_id_hashes_by_value() {
    let mut set = HashSet::new();
    set.insert(InstalledOnId::new(5));
    set.insert(InstalledOnId::new(5));
    set.insert(InstalledOnId::new(6));
    assert_eq!(set.len(), 2);
}

#[test]
fn actor_id_from_str() {
    let actor: ActorId = "12".parse().unwrap();
    assert_eq!(actor.get(), 12);
}

#[test]
fn parse_error_mentions_input() {
    let err = InstanceId::parse("abc").unwrap_err();
    assert!(err.to_string().contains("abc"));
}
