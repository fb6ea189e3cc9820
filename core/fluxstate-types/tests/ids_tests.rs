use fluxstate_types::{LocalId, OwnerId, RemoteId};
use proptest::prelude::*;
use std::collections::HashSet;
use std::str::FromStr;

// ── LocalId ───────────────────────────────────────────────────────

#[test]
fn local_id_accepts_positive() {
    let id = LocalId::new(7).unwrap();
    assert_eq!(id.get(), 7);
    assert_eq!(i64::from(id), 7);
}

#[test]
fn local_id_rejects_zero_and_negative() {
    assert!(LocalId::new(0).is_err());
    assert!(LocalId::new(-3).is_err());
}

#[test]
fn local_id_from_str() {
    let parsed = LocalId::from_str("42").unwrap();
    assert_eq!(parsed, LocalId::new(42).unwrap());
    assert!(LocalId::from_str("garbage").is_err());
    assert!(LocalId::from_str("0").is_err());
}

#[test]
fn local_id_serializes_as_number() {
    let id = LocalId::new(12).unwrap();
    assert_eq!(serde_json::to_string(&id).unwrap(), "12");
}

#[test]
fn local_id_deserialize_rejects_zero() {
    assert!(serde_json::from_str::<LocalId>("0").is_err());
    assert_eq!(
        serde_json::from_str::<LocalId>("5").unwrap(),
        LocalId::new(5).unwrap()
    );
}

#[test]
fn local_id_ordering_follows_raw_value() {
    let a = LocalId::new(1).unwrap();
    let b = LocalId::new(2).unwrap();
    assert!(a < b);
}

#[test]
fn local_id_hash_and_eq() {
    let id = LocalId::new(3).unwrap();
    let mut set = HashSet::new();
    set.insert(id);
    set.insert(id);
    assert_eq!(set.len(), 1);
}

// ── RemoteId ──────────────────────────────────────────────────────

#[test]
fn remote_id_rejects_zero() {
    assert!(RemoteId::new(0).is_err());
    assert!(serde_json::from_str::<RemoteId>("0").is_err());
}

#[test]
fn remote_id_display_and_parse() {
    let id = RemoteId::new(1001).unwrap();
    assert_eq!(id.to_string(), "1001");
    assert_eq!(RemoteId::from_str("1001").unwrap(), id);
    assert!(RemoteId::from_str("-1").is_err());
}

// ── OwnerId ───────────────────────────────────────────────────────

#[test]
fn owner_id_global_scope() {
    assert!(OwnerId::GLOBAL.is_global());
    assert!(!OwnerId::new(9).is_global());
    assert_eq!(OwnerId::new(9).get(), 9);
}

#[test]
fn owner_id_serialization_is_transparent() {
    let json = serde_json::to_string(&OwnerId::new(77)).unwrap();
    assert_eq!(json, "77");
}

proptest! {
    #[test]
    fn positive_local_ids_survive_text_form(raw in 1i64..i64::MAX) {
        let id = LocalId::new(raw).unwrap();
        prop_assert_eq!(LocalId::from_str(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn non_positive_local_ids_are_rejected(raw in i64::MIN..=0i64) {
        prop_assert!(LocalId::new(raw).is_err());
    }
}
