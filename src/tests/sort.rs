use proptest::prelude::*;

use super::sid;
use crate::{dacl_sort_into_canonical_order, init_sec_ace, is_canonical_order, AceFlags, AceType, SecurityAce, ACL, DACL};

fn ace(ace_type: AceType, flags: AceFlags, rid: u32) -> SecurityAce {
    init_sec_ace(&sid("S-1-5-21-7-8-9").append_rid(rid).unwrap(), ace_type, 1u32, flags)
}

#[test]
fn canonical_sort_example() {
    let mut aces = vec![
        ace(AceType::AccessAllowed, AceFlags::INHERITED, 1),
        ace(AceType::AccessDenied, AceFlags::empty(), 2),
        ace(AceType::AccessAllowed, AceFlags::empty(), 3),
        ace(AceType::AccessDenied, AceFlags::INHERITED, 4),
        ace(AceType::AccessAllowed, AceFlags::INHERIT_ONLY, 5),
        ace(AceType::AccessDenied, AceFlags::empty(), 6),
    ];
    assert!(!is_canonical_order(&aces));

    dacl_sort_into_canonical_order(&mut aces);

    let rids: Vec<u32> = aces.iter().map(|a| *a.trustee.sub_authorities().last().unwrap()).collect();
    assert_eq!(rids, [2, 6, 3, 5, 4, 1]);
    assert!(is_canonical_order(&aces));
}

#[test]
fn only_plain_denies_move_ahead() {
    let mut aces = vec![
        ace(AceType::AccessAllowed, AceFlags::empty(), 1),
        ace(AceType::AccessDeniedObject, AceFlags::empty(), 2),
    ];
    assert!(is_canonical_order(&aces));
    dacl_sort_into_canonical_order(&mut aces);
    let types: Vec<AceType> = aces.iter().map(|a| a.ace_type).collect();
    assert_eq!(types, [AceType::AccessAllowed, AceType::AccessDeniedObject]);

    let mut aces = vec![
        ace(AceType::AccessAllowedObject, AceFlags::empty(), 1),
        ace(AceType::AccessDeniedCallback, AceFlags::empty(), 2),
        ace(AceType::AccessDenied, AceFlags::empty(), 3),
        ace(AceType::AccessAllowedCallback, AceFlags::INHERIT_ONLY, 4),
        ace(AceType::AccessAllowed, AceFlags::empty(), 5),
    ];
    dacl_sort_into_canonical_order(&mut aces);

    let rids: Vec<u32> = aces.iter().map(|a| *a.trustee.sub_authorities().last().unwrap()).collect();
    assert_eq!(rids, [3, 1, 2, 5, 4]);
    assert!(is_canonical_order(&aces));
}

#[test]
fn sort_short_lists() {
    let mut empty: Vec<SecurityAce> = Vec::new();
    dacl_sort_into_canonical_order(&mut empty);
    assert!(is_canonical_order(&empty));

    let mut one = vec![ace(AceType::AccessAllowed, AceFlags::INHERITED, 1)];
    dacl_sort_into_canonical_order(&mut one);
    assert_eq!(one.len(), 1);
}

#[test]
fn acl_sort_method() {
    let mut acl = ACL::<DACL>::from_entries(vec![
        ace(AceType::AccessAllowed, AceFlags::empty(), 1),
        ace(AceType::AccessDenied, AceFlags::empty(), 2),
    ]);
    assert!(!acl.is_canonical());
    acl.sort_into_canonical_order();
    assert!(acl.is_canonical());
    assert_eq!(acl.entries()[0].ace_type, AceType::AccessDenied);
}

fn arb_ace() -> impl Strategy<Value = SecurityAce> {
    let types = prop::sample::select(vec![
        AceType::AccessAllowed,
        AceType::AccessDenied,
        AceType::AccessAllowedObject,
        AceType::AccessDeniedObject,
        AceType::AccessAllowedCallback,
        AceType::AccessDeniedCallback,
    ]);
    (types, any::<bool>(), any::<bool>(), 0u32..1000).prop_map(|(ace_type, inherited, inherit_only, rid)| {
        let mut flags = AceFlags::empty();
        flags.set(AceFlags::INHERITED, inherited);
        flags.set(AceFlags::INHERIT_ONLY, inherit_only);
        ace(ace_type, flags, rid)
    })
}

proptest! {
    #[test]
    fn sort_yields_canonical_order(mut aces in proptest::collection::vec(arb_ace(), 0..24)) {
        dacl_sort_into_canonical_order(&mut aces);
        prop_assert!(is_canonical_order(&aces));
    }

    #[test]
    fn sort_is_idempotent(mut aces in proptest::collection::vec(arb_ace(), 0..24)) {
        dacl_sort_into_canonical_order(&mut aces);
        let once = aces.clone();
        dacl_sort_into_canonical_order(&mut aces);
        prop_assert_eq!(aces, once);
    }

    #[test]
    fn sort_is_a_permutation(aces in proptest::collection::vec(arb_ace(), 0..24)) {
        let mut sorted = aces.clone();
        dacl_sort_into_canonical_order(&mut sorted);

        let key = |a: &SecurityAce| (a.ace_type, a.flags.bits(), a.trustee.clone());
        let mut before: Vec<_> = aces.iter().map(key).collect();
        let mut after: Vec<_> = sorted.iter().map(key).collect();
        before.sort();
        after.sort();
        prop_assert_eq!(before, after);
    }
}
