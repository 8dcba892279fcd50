use super::{domain, sid};
use crate::{sddl_decode_sid, sddl_encode_sid, ErrorKind, SID};

#[test]
fn sidstring_unit_test() {
    let string_sid = "S-1-5-21-1-2-3";
    let sid = sid(string_sid);

    assert_eq!(sid.to_string(), string_sid);
    assert_eq!(sid.authority(), 5);
    assert_eq!(sid.sub_authorities(), &[21, 1, 2, 3]);
    assert_eq!(sid.len(), 8 + 4 * 4);
}

#[test]
fn sid_hex_authority() {
    let sid = sid("S-1-0x000000000005-18");
    assert_eq!(sid.to_string(), "S-1-5-18");

    let big = SID::new(0x1234_5678_9abc, &[1]).unwrap();
    assert_eq!(big.to_string(), "S-1-0x123456789ABC-1");
    assert_eq!(big.to_string().parse::<SID>().unwrap(), big);
}

#[test]
fn sid_rejects_garbage() {
    assert!("S-1".parse::<SID>().is_err());
    assert!("X-1-5".parse::<SID>().is_err());
    assert!("S-1-5-".parse::<SID>().is_err());
    assert!("S-1-5-4294967296".parse::<SID>().is_err());
    assert!("S-1-5-1-2-3-4-5-6-7-8-9-10-11-12-13-14-15-16".parse::<SID>().is_err());
}

#[test]
fn sid_prefix_stops_at_next_field() {
    let (sid, used) = SID::parse_prefix("S-1-5-32-544G:BA").unwrap();
    assert_eq!(sid.to_string(), "S-1-5-32-544");
    assert_eq!(used, 12);
}

#[test]
fn sid_binary_form() {
    let sid = sid("S-1-5-32-544");
    let bytes = sid.to_bytes();
    assert_eq!(bytes, [1, 2, 0, 0, 0, 0, 0, 5, 32, 0, 0, 0, 0x20, 2, 0, 0]);
    assert_eq!(SID::from_bytes(&bytes).unwrap(), sid);

    for n in 0..bytes.len() {
        assert!(SID::from_bytes(&bytes[..n]).is_err(), "prefix of {} bytes decoded", n);
    }
}

#[test]
fn sid_domain_relative() {
    let domain = domain();
    let admin = domain.append_rid(500).unwrap();
    assert_eq!(admin.rid_in_domain(&domain), Some(500));
    assert_eq!(domain.rid_in_domain(&domain), None);
    assert_eq!(sid("S-1-5-32-544").rid_in_domain(&domain), None);
}

#[test]
fn sddl_sid_aliases() {
    let domain = domain();

    let (world, used) = sddl_decode_sid("WD", None).unwrap();
    assert_eq!(world, sid("S-1-1-0"));
    assert_eq!(used, 2);

    let (admins, _) = sddl_decode_sid("BA)", None).unwrap();
    assert_eq!(admins, sid("S-1-5-32-544"));

    let (high, _) = sddl_decode_sid("HI", None).unwrap();
    assert_eq!(high, sid("S-1-16-12288"));

    let (domain_admins, _) = sddl_decode_sid("DA", Some(&domain)).unwrap();
    assert_eq!(domain_admins, domain.append_rid(512).unwrap());

    let err = sddl_decode_sid("DA", None).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::DomainSidRequired(name) if name == "DA"));

    assert!(sddl_decode_sid("ZZ", None).is_err());
    assert!(sddl_decode_sid("W", None).is_err());
}

#[test]
fn sddl_sid_encode_prefers_alias() {
    let domain = domain();

    assert_eq!(sddl_encode_sid(&sid("S-1-5-18"), None), "SY");
    assert_eq!(sddl_encode_sid(&sid("S-1-5-32-545"), None), "BU");
    assert_eq!(sddl_encode_sid(&domain.append_rid(513).unwrap(), Some(&domain)), "DU");
    assert_eq!(
        sddl_encode_sid(&domain.append_rid(513).unwrap(), None),
        "S-1-5-21-1004336348-1177238915-682003330-513"
    );
    assert_eq!(sddl_encode_sid(&domain.append_rid(1105).unwrap(), Some(&domain)), "S-1-5-21-1004336348-1177238915-682003330-1105");
}
