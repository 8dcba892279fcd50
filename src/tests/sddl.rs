use proptest::prelude::*;

use super::{domain, sid};
use crate::{
    rights, sddl_decode, sddl_decode_ace, sddl_decode_err_msg, sddl_encode, sddl_encode_ace, AceCoda, AceFlags, AceType,
    ClaimValues, SecurityAce, SecurityDescriptor, SecurityDescriptorControl, ACCESS_MASK,
};

fn round_trip(sddl: &str) -> String {
    let domain = domain();
    let sd = sddl_decode(sddl, Some(&domain)).unwrap();
    sddl_encode(&sd, Some(&domain)).unwrap()
}

#[test]
fn decode_simple_descriptor() {
    let domain = domain();
    let sd = sddl_decode("O:BAG:BAD:(A;;FA;;;WD)", Some(&domain)).unwrap();

    assert_eq!(sd.owner, Some(sid("S-1-5-32-544")));
    assert_eq!(sd.group, Some(sid("S-1-5-32-544")));
    assert!(sd.control.contains(SecurityDescriptorControl::DACL_PRESENT));
    assert!(sd.sacl.is_none());

    let dacl = sd.dacl.as_ref().unwrap();
    assert_eq!(dacl.len(), 1);
    assert_eq!(dacl.entries()[0], SecurityAce::new_allow(&sid("S-1-1-0"), 0u8, rights::FILE_ALL_ACCESS));

    assert_eq!(sddl_encode(&sd, Some(&domain)).unwrap(), "O:BAG:BAD:(A;;FA;;;WD)");
}

#[test]
fn domain_aliases() {
    let domain = domain();
    let sd = sddl_decode("O:DAG:DUD:P(A;;FA;;;DA)", Some(&domain)).unwrap();
    assert_eq!(sd.owner, Some(domain.append_rid(512).unwrap()));
    assert_eq!(sd.group, Some(domain.append_rid(513).unwrap()));
    assert!(sd.control.contains(SecurityDescriptorControl::DACL_PROTECTED));
    assert_eq!(sddl_encode(&sd, Some(&domain)).unwrap(), "O:DAG:DUD:P(A;;FA;;;DA)");

    // without a domain the alias cannot resolve
    assert!(sddl_decode("O:DA", None).is_err());

    // and without a domain the SID is written out in full
    assert_eq!(
        sddl_encode(&sd, None).unwrap(),
        "O:S-1-5-21-1004336348-1177238915-682003330-512\
         G:S-1-5-21-1004336348-1177238915-682003330-513\
         D:P(A;;FA;;;S-1-5-21-1004336348-1177238915-682003330-512)"
    );
}

#[test]
fn acl_flags() {
    assert_eq!(round_trip("D:PAI(A;;FA;;;SY)"), "D:PAI(A;;FA;;;SY)");
    assert_eq!(round_trip("D:AIARP(A;;FA;;;SY)"), "D:PARAI(A;;FA;;;SY)");
    assert_eq!(round_trip("D:(A;;FA;;;SY)S:AI(AU;SAFA;FA;;;WD)"), "D:(A;;FA;;;SY)S:AI(AU;SAFA;FA;;;WD)");

    let sd = sddl_decode("D:AIS:P", None).unwrap();
    assert!(sd.control.contains(SecurityDescriptorControl::DACL_AUTO_INHERITED));
    assert!(sd.control.contains(SecurityDescriptorControl::SACL_PROTECTED));
    assert!(sd.dacl.unwrap().is_empty());
}

#[test]
fn null_dacl() {
    let sd = sddl_decode("D:NO_ACCESS_CONTROL", None).unwrap();
    assert!(sd.control.contains(SecurityDescriptorControl::DACL_PRESENT));
    assert!(sd.dacl.is_none());
    assert_eq!(sddl_encode(&sd, None).unwrap(), "D:NO_ACCESS_CONTROL");

    assert!(sddl_decode("D:NO_ACCESS_CONTROL(A;;FA;;;WD)", None).is_err());
}

#[test]
fn empty_descriptor() {
    let sd = sddl_decode("", None).unwrap();
    assert!(sd.owner.is_none());
    assert!(sd.dacl.is_none());
    assert_eq!(sddl_encode(&SecurityDescriptor::new(), None).unwrap(), "");
}

#[test]
fn ace_flags_and_rights() {
    let ace = sddl_decode_ace("(A;OICIID;0x1200a9;;;BU)", None).unwrap();
    assert_eq!(ace.flags, AceFlags::OBJECT_INHERIT | AceFlags::CONTAINER_INHERIT | AceFlags::INHERITED);
    assert_eq!(ace.access_mask, ACCESS_MASK(0x1200a9));
    assert_eq!(sddl_encode_ace(&ace, None).unwrap(), "(A;OICIID;0x001200a9;;;BU)");

    let ace = sddl_decode_ace("(D;;RPWPCCDCLCSWRCWDWOGA;;;S-1-5-7)", None).unwrap();
    assert_eq!(ace.ace_type, AceType::AccessDenied);
    assert_eq!(ace.access_mask, ACCESS_MASK(0x3f | 0x000e_0000 | 0x1000_0000));
    assert_eq!(sddl_encode_ace(&ace, None).unwrap(), "(D;;CCDCLCSWRPWPRCWDWOGA;;;AN)");

    assert_eq!(sddl_decode_ace("(A;;16;;;WD)", None).unwrap().access_mask, rights::ADS_READ_PROP);
    assert_eq!(sddl_decode_ace("(A;;KR;;;WD)", None).unwrap().access_mask, rights::KEY_READ);
    assert_eq!(sddl_encode_ace(&SecurityAce::new_allow(&sid("S-1-1-0"), 0u8, 0u32), None).unwrap(), "(A;;;;;WD)");
}

#[test]
fn ace_types() {
    for (sddl, ace_type) in [
        ("(A;;FA;;;WD)", AceType::AccessAllowed),
        ("(D;;FA;;;WD)", AceType::AccessDenied),
        ("(AU;SA;FA;;;WD)", AceType::SystemAudit),
        ("(AL;FA;FA;;;WD)", AceType::SystemAlarm),
        ("(ML;;0x1;;;HI)", AceType::SystemMandatoryLabel),
        ("(SP;;;;;S-1-17-1)", AceType::SystemScopedPolicyId),
    ] {
        assert_eq!(sddl_decode_ace(sddl, None).unwrap().ace_type, ace_type, "{}", sddl);
    }

    assert_eq!(sddl_encode_ace(&sddl_decode_ace("(a;;FA;;;WD)", None).unwrap(), None).unwrap(), "(A;;FA;;;WD)");
}

#[test]
fn object_aces() {
    let sddl = "(OA;CI;RPWP;bf967aba-0de6-11d0-a285-00aa003049e2;4828cc14-1437-45bc-9b07-ad6f015e5f28;PS)";
    let ace = sddl_decode_ace(sddl, None).unwrap();
    assert_eq!(ace.ace_type, AceType::AccessAllowedObject);
    let object = ace.object.unwrap();
    assert_eq!(object.object_type.unwrap().to_string(), "bf967aba-0de6-11d0-a285-00aa003049e2");
    assert!(object.inherited_object_type.is_some());
    assert_eq!(sddl_encode_ace(&ace, None).unwrap(), sddl);

    let bare = sddl_decode_ace("(OD;;CR;;;WD)", None).unwrap();
    assert!(bare.object.is_some());
    assert_eq!(sddl_encode_ace(&bare, None).unwrap(), "(OD;;CR;;;WD)");

    // plain ACEs carry no GUIDs
    assert!(sddl_decode_ace("(A;;RP;bf967aba-0de6-11d0-a285-00aa003049e2;;WD)", None).is_err());
    assert!(sddl_decode_ace("(OA;;RP;not-a-guid;;WD)", None).is_err());
}

#[test]
fn callback_aces() {
    let sddl = r#"(XA;;FX;;;WD;(@USER.Title == "Manager"))"#;
    let ace = sddl_decode_ace(sddl, None).unwrap();
    assert_eq!(ace.ace_type, AceType::AccessAllowedCallback);
    let blob = ace.conditions().unwrap();
    assert_eq!(&blob[..4], b"artx");
    assert_eq!(sddl_encode_ace(&ace, None).unwrap(), sddl);

    assert_eq!(
        round_trip(r#"D:(XD;;FA;;;WD;(Member_of {SID(DA), SID(BA)}))(A;;FA;;;SY)"#),
        r#"D:(XD;;FA;;;WD;(Member_of {SID(S-1-5-21-1004336348-1177238915-682003330-512), SID(BA)}))(A;;FA;;;SY)"#
    );

    // the device form is allowed inside descriptors
    assert!(sddl_decode_ace("(XA;;FA;;;WD;(@Device.os == 1))", None).is_ok());

    // a callback ACE needs its condition
    assert!(sddl_decode_ace("(XA;;FA;;;WD)", None).is_err());
}

#[test]
fn resource_attribute_aces() {
    let sddl = r#"S:(RA;;;;;WD;("Project",TS,0x0,"Alpha","Beta"))"#;
    let sd = sddl_decode(sddl, None).unwrap();

    let claim = sd.find_resource_attribute("project").unwrap();
    assert_eq!(claim.name, "Project");
    assert_eq!(claim.values, ClaimValues::String(vec!["Alpha".into(), "Beta".into()]));
    assert_eq!(sddl_encode(&sd, None).unwrap(), sddl);

    let ace = sddl_decode_ace(r#"(RA;CI;;;;S-1-1-0;("Secrecy",TU,0x3,2,1))"#, None).unwrap();
    let AceCoda::Claim(claim) = &ace.coda else {
        panic!("expected a claim, got {:?}", ace.coda);
    };
    assert_eq!(claim.values, ClaimValues::Uint64(vec![2, 1]));
    assert_eq!(claim.flags.bits(), 3);
    assert_eq!(sddl_encode_ace(&ace, None).unwrap(), r#"(RA;CI;;;;WD;("Secrecy",TU,0x3,2,1))"#);
}

#[test]
fn resource_attribute_value_types() {
    let ace = |values: &str| sddl_decode_ace(&format!("(RA;;;;;WD;(\"A\",{}))", values), None);
    let values = |values: &str| ace(values).unwrap().claim().unwrap().values.clone();

    assert_eq!(values("TI,0,-5,7"), ClaimValues::Int64(vec![-5, 7]));
    assert_eq!(values("TB,0,1,0"), ClaimValues::Boolean(vec![true, false]));
    assert_eq!(values("TD,0,BA,S-1-1-0"), ClaimValues::Sid(vec![sid("S-1-5-32-544"), sid("S-1-1-0")]));
    assert_eq!(values("TX,0,0a0b,abc"), ClaimValues::OctetString(vec![vec![0x0a, 0x0b], vec![0x0a, 0xbc]]));

    assert!(ace("TQ,0,1").is_err());
    assert!(ace("TI,0").is_err());
    assert!(ace("TI,0x100,1").is_err());
    assert!(ace("TB,0,2").is_err());
    assert!(ace("TU,0,-1").is_err());
}

#[test]
fn decode_errors_carry_offsets() {
    let err = sddl_decode_err_msg("O:BAG:BAD:(A;;FA;;;XX)", None).unwrap_err();
    assert_eq!(err.offset, 19);

    let err = sddl_decode_err_msg("D:(Q;;FA;;;WD)", None).unwrap_err();
    assert_eq!(err.offset, 3);

    let err = sddl_decode_err_msg("X:BA", None).unwrap_err();
    assert_eq!(err.offset, 0);

    let err = sddl_decode_err_msg("D:(XA;;FA;;;WD;(@User.x == ))", None).unwrap_err();
    assert!(err.offset >= 15, "offset {}", err.offset);

    assert!(sddl_decode("D:(A;;FA;;;WD", None).is_err());
    assert!(sddl_decode("D:(A;;ZZ;;;WD)", None).is_err());
    assert!(sddl_decode("D:(A;QQ;FA;;;WD)", None).is_err());
    assert!(sddl_decode("D:(A;;FA;;WD)", None).is_err());
    assert!(sddl_decode("O:", None).is_err());
}

#[test]
fn sddl_to_binary_and_back() {
    let domain = domain();
    let sddl = "O:BAG:DUD:PAI(D;OICI;FA;;;BG)(A;OICIID;FA;;;SY)(OA;;CR;bf967aba-0de6-11d0-a285-00aa003049e2;;AU)\
                S:(AU;FA;FA;;;WD)(ML;;CC;;;LW)";
    let sd = sddl_decode(sddl, Some(&domain)).unwrap();

    let bytes = sd.encode().unwrap();
    let decoded = SecurityDescriptor::decode(&bytes).unwrap();
    assert_eq!(decoded.dacl.as_ref().unwrap().entries(), sd.dacl.as_ref().unwrap().entries());
    assert_eq!(sddl_encode(&decoded, Some(&domain)).unwrap(), sddl);
}

proptest! {
    #[test]
    fn decode_never_panics(s in "[ -~]{0,64}") {
        let _ = sddl_decode(&s, None);
    }

    #[test]
    fn ace_text_round_trip(
        type_index in 0usize..4,
        flags in 0u8..0x20,
        mask in any::<u32>(),
        rid in 1000u32..2000,
    ) {
        let ace_type = [AceType::AccessAllowed, AceType::AccessDenied, AceType::SystemAudit, AceType::SystemAlarm][type_index];
        let ace = crate::init_sec_ace(&domain().append_rid(rid).unwrap(), ace_type, mask, flags);
        let text = sddl_encode_ace(&ace, None).unwrap();
        prop_assert_eq!(sddl_decode_ace(&text, None).unwrap(), ace);
    }
}
