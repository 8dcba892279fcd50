use proptest::prelude::*;
use uuid::Uuid;

use super::sid;
use crate::{
    init_sec_ace, lowlevel::ACL_REVISION_DS, raw_entries, rights, sec_ace_callback, sec_ace_has_extra_blob,
    sec_ace_object, sec_ace_resource, AceCoda, AceFlags, AceType, ClaimSecurityAttribute, ClaimValues, ObjectAceData,
    ACEFilter, SecurityAce, SecurityDescriptor, SecurityDescriptorControl, ACCESS_MASK, ACL, DACL, SACL,
};
use fallible_iterator::FallibleIterator;

fn world() -> crate::SID {
    sid("S-1-1-0")
}

#[test]
fn init_sec_ace_size() {
    let ace = init_sec_ace(&sid("S-1-5-21-1-2"), AceType::AccessAllowed, rights::FILE_ALL_ACCESS, 0u8);
    assert_eq!(ace.size().unwrap(), 28);
    assert_eq!(ace.encode().unwrap().len(), 28);
    assert_eq!(ace.coda, AceCoda::None);
    assert!(ace.object.is_none());
}

#[test]
fn ace_type_predicates() {
    assert!(sec_ace_object(AceType::AccessAllowedObject));
    assert!(!sec_ace_object(AceType::AccessAllowed));
    assert!(sec_ace_callback(AceType::AccessDeniedCallback));
    assert!(sec_ace_callback(AceType::SystemAuditCallbackObject));
    assert!(!sec_ace_callback(AceType::SystemAudit));
    assert!(sec_ace_resource(AceType::SystemResourceAttribute));
    assert!(sec_ace_has_extra_blob(AceType::AccessAllowedCallback));
    assert!(sec_ace_has_extra_blob(AceType::SystemResourceAttribute));
    assert!(!sec_ace_has_extra_blob(AceType::AccessDenied));
}

#[test]
fn encode_plain_ace() {
    let ace = SecurityAce::new_allow(&world(), AceFlags::OBJECT_INHERIT | AceFlags::CONTAINER_INHERIT, rights::FILE_ALL_ACCESS);
    let bytes = ace.encode().unwrap();
    assert_eq!(
        bytes,
        [
            0x00, 0x03, 0x14, 0x00, // header
            0xff, 0x01, 0x1f, 0x00, // mask
            0x01, 0x01, 0, 0, 0, 0, 0, 0x01, 0, 0, 0, 0, // S-1-1-0
        ]
    );

    let (decoded, used) = SecurityAce::decode(&bytes).unwrap();
    assert_eq!(used, 20);
    assert_eq!(decoded, ace);
}

#[test]
fn encode_object_ace() {
    let guid = Uuid::parse_str("bf967aba-0de6-11d0-a285-00aa003049e2").unwrap();
    let ace = init_sec_ace(&world(), AceType::AccessAllowedObject, rights::ADS_READ_PROP, 0u8).set_object(ObjectAceData {
        object_type: Some(guid),
        inherited_object_type: None,
    });

    let bytes = ace.encode().unwrap();
    // fixed part, object flags, one GUID, SID
    assert_eq!(bytes.len(), 8 + 4 + 16 + 12);
    assert_eq!(&bytes[8..12], &[1, 0, 0, 0]);
    assert_eq!(&bytes[12..16], &[0xba, 0x7a, 0x96, 0xbf]);

    let (decoded, _) = SecurityAce::decode(&bytes).unwrap();
    assert_eq!(decoded.object, Some(ObjectAceData { object_type: Some(guid), inherited_object_type: None }));
}

#[test]
fn empty_object_ace_round_trips() {
    for ace_type in [AceType::AccessAllowedObject, AceType::AccessDeniedObject, AceType::SystemAuditObject] {
        let ace = init_sec_ace(&world(), ace_type, rights::ADS_READ_PROP, 0u8);
        assert_eq!(ace.object, Some(ObjectAceData::default()));

        let bytes = ace.encode().unwrap();
        assert_eq!(bytes.len(), 8 + 4 + 12);
        let (decoded, _) = SecurityAce::decode(&bytes).unwrap();
        assert_eq!(decoded, ace);
    }
}

#[test]
fn callback_ace_keeps_condition_blob() {
    let blob = b"artx\x01\x00\x00\x00".to_vec();
    let ace = init_sec_ace(&world(), AceType::AccessAllowedCallback, 1u32, 0u8).set_conditions(blob.clone());
    assert_eq!(ace.size().unwrap(), 8 + 12 + 8);

    let (decoded, _) = SecurityAce::decode(&ace.encode().unwrap()).unwrap();
    assert_eq!(decoded.conditions(), Some(blob.as_slice()));
}

#[test]
fn callback_blob_is_padded() {
    let ace = init_sec_ace(&world(), AceType::AccessAllowedCallback, 1u32, 0u8).set_conditions(b"artx\x01".to_vec());
    let bytes = ace.encode().unwrap();
    assert_eq!(bytes.len(), 8 + 12 + 8);
    assert_eq!(&bytes[20..], b"artx\x01\x00\x00\x00");
}

#[test]
fn condition_on_plain_ace_is_rejected() {
    let ace = SecurityAce::new_allow(&world(), 0u8, 1u32).set_conditions(b"artx".to_vec());
    assert!(ace.encode().is_err());
}

#[test]
fn plain_ace_with_trailing_bytes_is_rejected() {
    let mut bytes = SecurityAce::new_deny(&world(), 0u8, 1u32).encode().unwrap();
    bytes.extend_from_slice(&[1, 2, 3, 4]);
    bytes[2] = 24;
    assert!(SecurityAce::decode(&bytes).is_err());
}

#[test]
fn resource_attribute_ace() {
    let claim = ClaimSecurityAttribute::new("Project", ClaimValues::String(vec!["Alpha".into(), "Beta".into()]));
    let ace = SecurityAce::new_resource_attribute(claim.clone(), 0u8).unwrap();
    let bytes = ace.encode().unwrap();
    assert_eq!(bytes.len() % 4, 0);

    let (decoded, used) = SecurityAce::decode(&bytes).unwrap();
    assert_eq!(used, bytes.len());
    assert_eq!(decoded.claim(), Some(&claim));
    assert_eq!(decoded.trustee, world());
}

#[test]
fn acl_revision_follows_object_aces() {
    let mut acl = ACL::<DACL>::from_entries(vec![SecurityAce::new_allow(&world(), 0u8, 1u32)]);
    assert_eq!(acl.encode().unwrap()[0], 2);

    acl.push(init_sec_ace(&world(), AceType::AccessAllowedObject, 1u32, 0u8).set_object(ObjectAceData::default()));
    let bytes = acl.encode().unwrap();
    assert_eq!(bytes[0], ACL_REVISION_DS);
    assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]) as usize, bytes.len());
    assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 2);
}

#[test]
fn acl_raw_entries() {
    let acl = ACL::<SACL>::from_entries(vec![
        SecurityAce::new_audit(&world(), AceFlags::SUCCESSFUL_ACCESS, rights::DELETE),
        SecurityAce::new_mandatory_label(&sid("S-1-16-12288"), 0u8, 1u32),
    ]);
    let bytes = acl.encode().unwrap();

    let (revision, size, iter) = raw_entries(&bytes).unwrap();
    assert_eq!(revision, 2);
    assert_eq!(size, bytes.len());
    let types: Vec<AceType> = iter.map(|ace| Ok(ace.ace_type)).collect().unwrap();
    assert_eq!(types, [AceType::SystemAudit, AceType::SystemMandatoryLabel]);

    let (decoded, _) = ACL::<SACL>::decode(&bytes).unwrap();
    assert_eq!(decoded.entries(), acl.entries());
}

#[test]
fn acl_header_checks() {
    // ACE count larger than the buffer can hold
    assert!(raw_entries(&[2, 0, 8, 0, 1, 0, 0, 0]).is_err());
    // unknown revision
    assert!(raw_entries(&[3, 0, 8, 0, 0, 0, 0, 0]).is_err());
    // size beyond the buffer
    assert!(raw_entries(&[2, 0, 16, 0, 0, 0, 0, 0]).is_err());

    let (revision, size, _) = raw_entries(&[2, 0, 8, 0, 0, 0, 0, 0]).unwrap();
    assert_eq!((revision, size), (2, 8));
}

#[test]
fn acl_filtering() {
    let admins = sid("S-1-5-32-544");
    let mut acl = ACL::<DACL>::from_entries(vec![
        SecurityAce::new_allow(&world(), 0u8, rights::FILE_GENERIC_READ),
        SecurityAce::new_deny(&world(), AceFlags::INHERITED, rights::DELETE),
        SecurityAce::new_allow(&admins, 0u8, rights::FILE_ALL_ACCESS),
    ]);

    assert_eq!(acl.get_entries(&world(), &None).len(), 2);
    assert!(acl.get_entries(&world(), &Some(ACEFilter::never())).is_empty());

    let denies = Some(ACEFilter::new().set_ace_type(AceType::AccessDenied));
    assert_eq!(acl.get_entries(&world(), &denies).len(), 1);

    let not_inherited = Some(ACEFilter::new().set_inherited_flag(false));
    let found = acl.get_entries(&world(), &not_inherited);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].ace_type, AceType::AccessAllowed);

    let deleting = Some(ACEFilter::new().set_access_mask(rights::DELETE));
    assert_eq!(acl.remove_entries(&world(), &deleting), 1);
    assert_eq!(acl.len(), 2);
    assert_eq!(acl.remove_entries(&admins, &None), 1);
    assert_eq!(acl.entries()[0].trustee, world());
}

#[test]
fn security_descriptor_round_trip() {
    let sd = SecurityDescriptor::new()
        .set_owner(sid("S-1-5-32-544"))
        .set_group(sid("S-1-5-18"))
        .set_dacl(Some(ACL::from_entries(vec![
            SecurityAce::new_deny(&sid("S-1-5-32-546"), 0u8, rights::GENERIC_ALL),
            SecurityAce::new_allow(&world(), 0u8, rights::FILE_GENERIC_READ),
        ])));

    let bytes = sd.encode().unwrap();
    assert_eq!(bytes[0], 1);
    let control = u16::from_le_bytes([bytes[2], bytes[3]]);
    assert_ne!(control & SecurityDescriptorControl::DACL_PRESENT.bits(), 0);
    assert_ne!(control & SecurityDescriptorControl::SELF_RELATIVE.bits(), 0);

    let decoded = SecurityDescriptor::decode(&bytes).unwrap();
    assert_eq!(decoded.owner, sd.owner);
    assert_eq!(decoded.group, sd.group);
    assert_eq!(decoded.dacl, sd.dacl);
    assert!(decoded.sacl.is_none());
}

#[test]
fn null_dacl_round_trip() {
    let sd = SecurityDescriptor::new().set_dacl(None);
    assert!(sd.control.contains(SecurityDescriptorControl::DACL_PRESENT));

    let decoded = SecurityDescriptor::decode(&sd.encode().unwrap()).unwrap();
    assert!(decoded.control.contains(SecurityDescriptorControl::DACL_PRESENT));
    assert!(decoded.dacl.is_none());
}

fn sample_descriptor() -> Vec<u8> {
    let claim = ClaimSecurityAttribute::new("Dept", ClaimValues::Int64(vec![3, 7]));
    SecurityDescriptor::new()
        .set_owner(sid("S-1-5-32-544"))
        .set_dacl(Some(ACL::from_entries(vec![
            SecurityAce::new_allow(&world(), 0u8, ACCESS_MASK(0x1f01ff)),
            init_sec_ace(&world(), AceType::AccessAllowedCallback, 1u32, 0u8).set_conditions(b"artx\x00\x00\x00\x00".to_vec()),
        ])))
        .set_sacl(Some(ACL::from_entries(vec![SecurityAce::new_resource_attribute(claim, 0u8).unwrap()])))
        .encode()
        .unwrap()
}

proptest! {
    #[test]
    fn truncated_descriptor_fails(cut in 0usize..1000) {
        let bytes = sample_descriptor();
        let cut = cut % bytes.len();
        prop_assert!(SecurityDescriptor::decode(&bytes[..cut]).is_err());
    }

    #[test]
    fn truncated_ace_fails(cut in 0usize..64, subs in proptest::collection::vec(any::<u32>(), 0..6)) {
        let trustee = crate::SID::new(5, &subs).unwrap();
        let bytes = SecurityAce::new_allow(&trustee, 0u8, 1u32).encode().unwrap();
        let cut = cut % bytes.len();
        prop_assert!(SecurityAce::decode(&bytes[..cut]).is_err());
    }

    #[test]
    fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
        let _ = SecurityAce::decode(&bytes);
        let _ = ACL::<DACL>::decode(&bytes);
        let _ = SecurityDescriptor::decode(&bytes);
    }
}
