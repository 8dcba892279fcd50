use proptest::prelude::*;

use super::sid;
use crate::{
    access_check_conditional_ace, ace_conditions_compile_sddl, conditional_ace_encode_binary, debug_conditional_ace,
    init_sec_ace, parse_conditional_ace, parse_sddl_literal_as_claim, run_conditional_ace, sddl_from_conditional_ace,
    AceConditionFlags, AceConditionResult, AceType, AttributeClass, ClaimSecurityAttribute, ClaimValues,
    ConditionalAceProgram, ConditionalAceToken, IntBase, IntLiteral, IntSign, Literal, Operator, SecurityAce, SecurityDescriptor,
    SecurityToken, ACL, SACL,
};

fn compile(sddl: &str) -> ConditionalAceProgram {
    ace_conditions_compile_sddl(sddl, AceConditionFlags::ALLOW_DEVICE).unwrap().0
}

fn round_trip(sddl: &str) -> String {
    sddl_from_conditional_ace(&compile(sddl)).unwrap()
}

fn eval(sddl: &str, token: &SecurityToken) -> AceConditionResult {
    run_conditional_ace(&compile(sddl), token, &SecurityDescriptor::new())
}

fn title(value: &str) -> SecurityToken {
    SecurityToken::new().add_user_claim(ClaimSecurityAttribute::new("Title", ClaimValues::String(vec![value.into()])))
}

#[test]
fn compile_simple_comparison() {
    let (program, consumed) = ace_conditions_compile_sddl(r#"@User.Title == "Manager""#, AceConditionFlags::empty()).unwrap();
    assert_eq!(consumed, 24);
    assert_eq!(
        program.tokens,
        [
            ConditionalAceToken::attribute(AttributeClass::User, "Title"),
            ConditionalAceToken::unicode("Manager"),
            ConditionalAceToken::Operator(Operator::Equal),
        ]
    );
}

#[test]
fn evaluate_simple_comparison() {
    let sddl = r#"(@User.Title == "Manager")"#;
    assert_eq!(eval(sddl, &title("Manager")), AceConditionResult::True);
    assert_eq!(eval(sddl, &title("manager")), AceConditionResult::True);
    assert_eq!(eval(sddl, &title("Engineer")), AceConditionResult::False);
    assert_eq!(eval(sddl, &SecurityToken::new()), AceConditionResult::Unknown);
}

#[test]
fn evaluate_logic() {
    let token = title("Manager").add_user_claim(ClaimSecurityAttribute::new("Level", ClaimValues::Int64(vec![5])));

    assert_eq!(eval(r#"(@User.Title == "Manager" && @User.Level > 3)"#, &token), AceConditionResult::True);
    assert_eq!(eval(r#"(@User.Title == "Manager" && @User.Level > 7)"#, &token), AceConditionResult::False);
    assert_eq!(eval(r#"(@User.Title == "Clerk" || @User.Level >= 5)"#, &token), AceConditionResult::True);
    assert_eq!(eval(r#"(!(@User.Level < 5))"#, &token), AceConditionResult::True);

    // an absent attribute leaves the comparison undecided
    assert_eq!(eval(r#"(@User.Missing == 1 && @User.Level > 3)"#, &token), AceConditionResult::Unknown);
    assert_eq!(eval(r#"(@User.Missing == 1 || @User.Level > 3)"#, &token), AceConditionResult::True);
    assert_eq!(eval(r#"(@User.Missing == 1 && @User.Level > 7)"#, &token), AceConditionResult::False);
}

#[test]
fn evaluate_exists() {
    let token = title("Manager");
    assert_eq!(eval("(Exists @User.Title)", &token), AceConditionResult::True);
    assert_eq!(eval("(Exists @User.Dept)", &token), AceConditionResult::False);
    assert_eq!(eval("(Not_Exists @User.Dept)", &token), AceConditionResult::True);
}

#[test]
fn evaluate_member_of() {
    let admins = SecurityToken::new().add_sid(sid("S-1-5-32-544")).add_sid(sid("S-1-1-0"));
    let users = SecurityToken::new().add_sid(sid("S-1-5-32-545"));

    assert_eq!(eval("(Member_of {SID(BA), SID(WD)})", &admins), AceConditionResult::True);
    assert_eq!(eval("(Member_of {SID(BA), SID(WD)})", &users), AceConditionResult::False);
    assert_eq!(eval("(Member_of_any {SID(BA), SID(BU)})", &users), AceConditionResult::True);
    assert_eq!(eval("(Not_Member_of {SID(BA)})", &users), AceConditionResult::True);

    let device = SecurityToken::new().add_device_sid(sid("S-1-5-32-544"));
    assert_eq!(eval("(Device_Member_of {SID(BA)})", &device), AceConditionResult::True);
}

#[test]
fn evaluate_resource_attribute() {
    let claim = ClaimSecurityAttribute::new("Project", ClaimValues::String(vec!["Alpha".into(), "Beta".into()]));
    let sd = SecurityDescriptor::new()
        .set_sacl(Some(ACL::<SACL>::from_entries(vec![SecurityAce::new_resource_attribute(claim, 0u8).unwrap()])));
    let token = SecurityToken::new();

    let run = |sddl: &str| run_conditional_ace(&compile(sddl), &token, &sd);
    assert_eq!(run(r#"(@Resource.Project Contains "alpha")"#), AceConditionResult::True);
    assert_eq!(run(r#"(@Resource.Project Contains "Gamma")"#), AceConditionResult::False);
    assert_eq!(run(r#"(@Resource.Project Any_of {"Gamma", "Beta"})"#), AceConditionResult::True);
    assert_eq!(run(r#"(@Resource.Other Contains "Alpha")"#), AceConditionResult::Unknown);
}

#[test]
fn malformed_programs_are_unknown() {
    let token = SecurityToken::new();
    let sd = SecurityDescriptor::new();

    let not_bool = ConditionalAceProgram::new(vec![ConditionalAceToken::unicode("a")]);
    assert_eq!(run_conditional_ace(&not_bool, &token, &sd), AceConditionResult::Unknown);

    let underflow = ConditionalAceProgram::new(vec![ConditionalAceToken::Operator(Operator::And)]);
    assert_eq!(run_conditional_ace(&underflow, &token, &sd), AceConditionResult::Unknown);

    let literal_logic = ConditionalAceProgram::new(vec![
        ConditionalAceToken::int(1),
        ConditionalAceToken::attribute(AttributeClass::User, "x"),
        ConditionalAceToken::Operator(Operator::And),
    ]);
    assert_eq!(run_conditional_ace(&literal_logic, &token, &sd), AceConditionResult::Unknown);
}

#[test]
fn mixed_composite_comparison_is_unknown() {
    let token = SecurityToken::new().add_user_claim(ClaimSecurityAttribute::new("x", ClaimValues::Int64(vec![1, 2])));
    assert_eq!(eval(r#"(@User.x == {1, "a"})"#, &token), AceConditionResult::Unknown);
    assert_eq!(eval(r#"(@User.x != {"a", 2})"#, &token), AceConditionResult::Unknown);
    assert_eq!(eval("(@User.x == {2, 1})", &token), AceConditionResult::True);
}

#[test]
fn large_mixed_composite_fails_closed() {
    let token = SecurityToken::new().add_user_claim(ClaimSecurityAttribute::new("x", ClaimValues::Int64((0..40).collect())));
    let members: Vec<String> = (0..40)
        .map(|i| if i % 2 == 0 { i.to_string() } else { format!("\"s{}\"", i) })
        .collect();
    let sddl = format!("(@User.x == {{{}}})", members.join(", "));
    assert_eq!(eval(&sddl, &token), AceConditionResult::Unknown);

    let blob = conditional_ace_encode_binary(&compile(&sddl)).unwrap();
    let allow = init_sec_ace(&sid("S-1-1-0"), AceType::AccessAllowedCallback, 1u32, 0u8).set_conditions(blob);
    let check = access_check_conditional_ace(&allow, &token, &SecurityDescriptor::new());
    assert!(check.parsed);
    assert!(!check.ace_applies(allow.ace_type));
}

#[test]
fn access_check_gates_callback_aces() {
    let blob = conditional_ace_encode_binary(&compile(r#"(@User.Title == "Manager")"#)).unwrap();
    let allow = init_sec_ace(&sid("S-1-1-0"), AceType::AccessAllowedCallback, 1u32, 0u8).set_conditions(blob.clone());
    let deny = init_sec_ace(&sid("S-1-1-0"), AceType::AccessDeniedCallback, 1u32, 0u8).set_conditions(blob);
    let sd = SecurityDescriptor::new();

    let check = access_check_conditional_ace(&allow, &title("Manager"), &sd);
    assert!(check.parsed);
    assert!(check.holds());
    assert!(check.ace_applies(allow.ace_type));

    let unknown = access_check_conditional_ace(&allow, &SecurityToken::new(), &sd);
    assert_eq!(unknown.result, AceConditionResult::Unknown);
    assert!(!unknown.ace_applies(allow.ace_type));
    assert!(unknown.ace_applies(deny.ace_type));

    let broken = init_sec_ace(&sid("S-1-1-0"), AceType::AccessDeniedCallback, 1u32, 0u8).set_conditions(b"xxxx".to_vec());
    let check = access_check_conditional_ace(&broken, &title("Manager"), &sd);
    assert!(!check.parsed);
    assert!(check.ace_applies(broken.ace_type));
}

#[test]
fn binary_round_trip() {
    for sddl in [
        r#"(@User.Title == "Manager")"#,
        "(@User.clearance >= 5 && Member_of {SID(BA), SID(SY)})",
        "(@Device.os == -0x10 || !(Exists @User.Dept))",
        "(@Resource.tags Contains {#0a0b, #ff})",
        "(@User.x Any_of {1, {2, 3}})",
    ] {
        let program = compile(sddl);
        let blob = conditional_ace_encode_binary(&program).unwrap();
        assert_eq!(&blob[..4], b"artx");
        assert_eq!(blob.len() % 4, 0);
        assert_eq!(parse_conditional_ace(&blob).unwrap(), program, "{}", sddl);
    }
}

#[test]
fn truncated_blob_fails() {
    let blob = conditional_ace_encode_binary(&compile(r#"(@User.Title == "Manager")"#)).unwrap();
    // the last token ends before the padding; a bare magic is an empty program
    let content = blob.iter().rposition(|b| *b != 0).unwrap() + 1;
    for cut in 5..content {
        assert!(parse_conditional_ace(&blob[..cut]).is_err(), "cut at {}", cut);
    }
    assert!(parse_conditional_ace(b"art").is_err());
    assert!(parse_conditional_ace(b"xrtx\x80").is_err());
}

#[test]
fn unknown_opcode_fails() {
    assert!(parse_conditional_ace(b"artx\x7f\x00\x00\x00").is_err());
}

#[test]
fn sddl_output() {
    assert_eq!(round_trip(r#"@User.Title == "Manager""#), r#"(@USER.Title == "Manager")"#);
    assert_eq!(
        round_trip("(@User.clearance >= 5 && Member_of {SID(BA), SID(SY)})"),
        "((@USER.clearance >= 5) && (Member_of {SID(BA), SID(SY)}))"
    );
    assert_eq!(round_trip("(!(Exists @User.Dept))"), "(!(Exists @USER.Dept))");
    assert_eq!(round_trip("(member_of_any {SID(BA)})"), "(Member_of_any {SID(BA)})");
    assert_eq!(round_trip("(@User.x == -0x10)"), "(@USER.x == -0x10)");
    assert_eq!(round_trip("(@User.x == 010)"), "(@USER.x == 010)");
    assert_eq!(round_trip("(@User.x == +7)"), "(@USER.x == +7)");
    assert_eq!(round_trip("(@User.a%0020b == 1)"), "(@USER.a%0020b == 1)");
    assert_eq!(round_trip("(Title == \"x\")"), "(Title == \"x\")");
    assert_eq!(round_trip("(@User.o == #00ff)"), "(@USER.o == #00ff)");
}

#[test]
fn unsigned_negative_literals_stay_readable() {
    for (base, text) in [(IntBase::Hex, "-0x5"), (IntBase::Octal, "-05"), (IntBase::Decimal, "-5")] {
        let literal = IntLiteral {
            value: -5,
            sign: IntSign::None,
            base,
            ..IntLiteral::new(0)
        };
        let program = ConditionalAceProgram::new(vec![
            ConditionalAceToken::attribute(AttributeClass::User, "x"),
            ConditionalAceToken::Literal(Literal::Int(literal)),
            ConditionalAceToken::Operator(Operator::Equal),
        ]);
        let parsed = parse_conditional_ace(&conditional_ace_encode_binary(&program).unwrap()).unwrap();

        let sddl = sddl_from_conditional_ace(&parsed).unwrap();
        assert_eq!(sddl, format!("(@USER.x == {})", text));

        let recompiled = compile(&sddl);
        let ConditionalAceToken::Literal(Literal::Int(i)) = &recompiled.tokens[1] else {
            panic!("expected an integer, got {:?}", recompiled.tokens[1]);
        };
        assert_eq!(i.value, -5);
        assert_eq!(i.base, base);
    }
}

#[test]
fn sddl_output_is_stable() {
    for sddl in [
        "((@USER.clearance >= 5) && (Member_of {SID(BA), SID(SY)}))",
        "((@DEVICE.os == -0x10) || (!(Exists @USER.Dept)))",
        "(@USER.x Any_of {1, {2, 3}})",
    ] {
        assert_eq!(round_trip(sddl), sddl);
    }
}

#[test]
fn int_literal_forms() {
    let program = compile("(@User.x == -0x10)");
    let ConditionalAceToken::Literal(Literal::Int(i)) = &program.tokens[1] else {
        panic!("expected an integer, got {:?}", program.tokens[1]);
    };
    assert_eq!(i.value, -16);
    assert_eq!(i.sign, IntSign::Negative);
    assert_eq!(i.base, IntBase::Hex);
}

#[test]
fn empty_program_is_empty_parens() {
    assert_eq!(sddl_from_conditional_ace(&ConditionalAceProgram::default()).unwrap(), "()");

    let dangling = ConditionalAceProgram::new(vec![ConditionalAceToken::int(1), ConditionalAceToken::int(2)]);
    assert!(sddl_from_conditional_ace(&dangling).is_err());
}

#[test]
fn compile_errors() {
    let fails = |sddl: &str| ace_conditions_compile_sddl(sddl, AceConditionFlags::empty()).is_err();

    assert!(fails(""));
    assert!(fails("()"));
    assert!(fails("(@User.Title ==)"));
    assert!(fails(r#"(@User.Title == "Manager""#));
    assert!(fails(r#"@User.Title == "Manager")"#));
    assert!(fails("(@Nobody.x == 1)"));
    assert!(fails("(@User.x == 99999999999999999999)"));
    assert!(fails("(@User.x == {1, 2)"));
    assert!(fails("(@User.x && && @User.y)"));
    assert!(fails("(@Device.os == 1)"));
    assert!(fails("(Device_Member_of {SID(BA)})"));
    assert!(!fails("(Member_of {SID(BA)})"));
}

#[test]
fn compile_error_reports_offset() {
    let err = ace_conditions_compile_sddl("(@User.x == 1) junk", AceConditionFlags::empty()).unwrap_err();
    assert!(!err.message.is_empty());
    assert!(err.message_offset > 0);
}

#[test]
fn device_attributes_need_the_flag() {
    assert!(ace_conditions_compile_sddl("(@Device.os == 1)", AceConditionFlags::ALLOW_DEVICE).is_ok());
}

#[test]
fn literal_as_claim() {
    let claim = parse_sddl_literal_as_claim("Nums", "{1, 2, 3}").unwrap();
    assert_eq!(claim.name, "Nums");
    assert_eq!(claim.values, ClaimValues::Int64(vec![1, 2, 3]));

    let claim = parse_sddl_literal_as_claim("Name", r#""text""#).unwrap();
    assert_eq!(claim.values, ClaimValues::String(vec!["text".into()]));

    let claim = parse_sddl_literal_as_claim("Who", "SID(BA)").unwrap();
    assert_eq!(claim.values, ClaimValues::Sid(vec![sid("S-1-5-32-544")]));

    assert!(parse_sddl_literal_as_claim("Mixed", r#"{1, "a"}"#).is_err());
}

#[test]
fn debug_listing() {
    let listing = debug_conditional_ace(&compile(r#"(@User.Title == "Manager")"#));
    assert_eq!(listing.lines().count(), 4);
    assert!(listing.ends_with("GOOD: finishes on a single bool\n"));

    let bad = debug_conditional_ace(&ConditionalAceProgram::new(vec![ConditionalAceToken::int(1)]));
    assert!(bad.ends_with("BAD: should finish with a bool\n"));
}

fn fuzz_token() -> SecurityToken {
    title("Manager")
        .add_sid(sid("S-1-5-32-544"))
        .add_user_claim(ClaimSecurityAttribute::new("x", ClaimValues::Int64(vec![1, 2, 3])))
}

proptest! {
    #[test]
    fn arbitrary_blobs_never_panic(body in proptest::collection::vec(any::<u8>(), 0..256), magic in any::<bool>()) {
        let mut blob = if magic { b"artx".to_vec() } else { Vec::new() };
        blob.extend_from_slice(&body);

        if let Ok(program) = parse_conditional_ace(&blob) {
            let _ = run_conditional_ace(&program, &fuzz_token(), &SecurityDescriptor::new());
            let _ = sddl_from_conditional_ace(&program);
            let _ = debug_conditional_ace(&program);
            let _ = conditional_ace_encode_binary(&program);
        }
    }

    #[test]
    fn arbitrary_condition_text_never_panics(sddl in r##"[@A-Za-z0-9_ .(){},"#%!=<>&|+-]{0,48}"##) {
        if let Ok((program, _)) = ace_conditions_compile_sddl(&sddl, AceConditionFlags::ALLOW_DEVICE) {
            let _ = run_conditional_ace(&program, &fuzz_token(), &SecurityDescriptor::new());
            let _ = sddl_from_conditional_ace(&program);
        }
    }

    #[test]
    fn composites_of_any_kind_never_panic(members in proptest::collection::vec(prop_oneof![
        (-50i64..50).prop_map(|n| n.to_string()),
        "[a-z]{1,3}".prop_map(|s| format!("\"{}\"", s)),
        Just("SID(BA)".to_string()),
        Just("#00ff".to_string()),
    ], 1..48)) {
        let sddl = format!("(@User.x == {{{}}})", members.join(", "));
        if let Ok((program, _)) = ace_conditions_compile_sddl(&sddl, AceConditionFlags::empty()) {
            let _ = run_conditional_ace(&program, &fuzz_token(), &SecurityDescriptor::new());
        }
    }
}
