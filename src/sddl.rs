//! Contains the SDDL text codec for security descriptors, ACEs and SIDs
//!
//! A descriptor reads `O:<owner>G:<group>D:<flags>(<ace>)...S:<flags>(<ace>)...`, and every ACE
//! reads `(<type>;<flags>;<rights>;<object guid>;<inherited object guid>;<trustee>[;<extra>])`.
//! The seventh field holds the condition of a callback ACE or the claim of a resource
//! attribute ACE.

use tracing::{debug, trace};
use uuid::Uuid;

use crate::{
    ace::{AceCoda, ObjectAceData, SecurityAce},
    acl::ACL,
    acl_kind::{ACLKind, DACL, SACL},
    conditional_ace::{
        compile::{compile_condition_prefix, parse_sddl_resource_attribute},
        conditional_ace_encode_binary,
        display::{sddl_from_conditional_ace, sddl_resource_attr_from_claim},
        parse_conditional_ace,
    },
    error::{Error, ErrorKind, Result, SddlDecodeError},
    limits::{AceConditionFlags, Limits},
    security_descriptor::SecurityDescriptor,
    sid::SID,
    types::*,
};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy)]
enum AliasSid {
    Fixed(u64, &'static [u32]),
    /// Relative to the domain SID
    Domain(u32),
}

/// Two-letter SID aliases. Where two aliases name one SID the first is used when encoding.
const SID_ALIASES: &[(&str, AliasSid)] = &[
    ("CO", AliasSid::Fixed(3, &[0])),
    ("CG", AliasSid::Fixed(3, &[1])),
    ("OW", AliasSid::Fixed(3, &[4])),
    ("WD", AliasSid::Fixed(1, &[0])),
    ("NU", AliasSid::Fixed(5, &[2])),
    ("IU", AliasSid::Fixed(5, &[4])),
    ("SU", AliasSid::Fixed(5, &[6])),
    ("AN", AliasSid::Fixed(5, &[7])),
    ("ED", AliasSid::Fixed(5, &[9])),
    ("PS", AliasSid::Fixed(5, &[10])),
    ("AU", AliasSid::Fixed(5, &[11])),
    ("RC", AliasSid::Fixed(5, &[12])),
    ("SY", AliasSid::Fixed(5, &[18])),
    ("LS", AliasSid::Fixed(5, &[19])),
    ("NS", AliasSid::Fixed(5, &[20])),
    ("WR", AliasSid::Fixed(5, &[33])),
    ("BA", AliasSid::Fixed(5, &[32, 544])),
    ("BU", AliasSid::Fixed(5, &[32, 545])),
    ("BG", AliasSid::Fixed(5, &[32, 546])),
    ("PU", AliasSid::Fixed(5, &[32, 547])),
    ("AO", AliasSid::Fixed(5, &[32, 548])),
    ("SO", AliasSid::Fixed(5, &[32, 549])),
    ("PO", AliasSid::Fixed(5, &[32, 550])),
    ("BO", AliasSid::Fixed(5, &[32, 551])),
    ("RE", AliasSid::Fixed(5, &[32, 552])),
    ("RU", AliasSid::Fixed(5, &[32, 554])),
    ("RD", AliasSid::Fixed(5, &[32, 555])),
    ("NO", AliasSid::Fixed(5, &[32, 556])),
    ("MU", AliasSid::Fixed(5, &[32, 558])),
    ("LU", AliasSid::Fixed(5, &[32, 559])),
    ("IS", AliasSid::Fixed(5, &[32, 568])),
    ("CY", AliasSid::Fixed(5, &[32, 569])),
    ("ER", AliasSid::Fixed(5, &[32, 573])),
    ("CD", AliasSid::Fixed(5, &[32, 574])),
    ("RA", AliasSid::Fixed(5, &[32, 575])),
    ("ES", AliasSid::Fixed(5, &[32, 576])),
    ("HA", AliasSid::Fixed(5, &[32, 578])),
    ("AA", AliasSid::Fixed(5, &[32, 579])),
    ("RM", AliasSid::Fixed(5, &[32, 580])),
    ("AC", AliasSid::Fixed(15, &[2, 1])),
    ("LW", AliasSid::Fixed(16, &[4096])),
    ("ME", AliasSid::Fixed(16, &[8192])),
    ("MP", AliasSid::Fixed(16, &[8448])),
    ("HI", AliasSid::Fixed(16, &[12288])),
    ("SI", AliasSid::Fixed(16, &[16384])),
    ("AS", AliasSid::Fixed(18, &[1])),
    ("SS", AliasSid::Fixed(18, &[2])),
    ("RO", AliasSid::Domain(498)),
    ("LA", AliasSid::Domain(500)),
    ("LG", AliasSid::Domain(501)),
    ("DA", AliasSid::Domain(512)),
    ("DU", AliasSid::Domain(513)),
    ("DG", AliasSid::Domain(514)),
    ("DC", AliasSid::Domain(515)),
    ("DD", AliasSid::Domain(516)),
    ("CA", AliasSid::Domain(517)),
    ("SA", AliasSid::Domain(518)),
    ("EA", AliasSid::Domain(519)),
    ("PA", AliasSid::Domain(520)),
    ("CN", AliasSid::Domain(522)),
    ("AP", AliasSid::Domain(525)),
    ("KA", AliasSid::Domain(526)),
    ("EK", AliasSid::Domain(527)),
    ("RS", AliasSid::Domain(553)),
];

/// ACE type spellings.
const ACE_TYPES: &[(&str, AceType)] = &[
    ("A", AceType::AccessAllowed),
    ("D", AceType::AccessDenied),
    ("OA", AceType::AccessAllowedObject),
    ("OD", AceType::AccessDeniedObject),
    ("AU", AceType::SystemAudit),
    ("AL", AceType::SystemAlarm),
    ("OU", AceType::SystemAuditObject),
    ("OL", AceType::SystemAlarmObject),
    ("ML", AceType::SystemMandatoryLabel),
    ("XA", AceType::AccessAllowedCallback),
    ("XD", AceType::AccessDeniedCallback),
    ("ZA", AceType::AccessAllowedCallbackObject),
    ("XU", AceType::SystemAuditCallback),
    ("RA", AceType::SystemResourceAttribute),
    ("SP", AceType::SystemScopedPolicyId),
];

/// Rights that are written as one code only when the mask matches exactly.
const COMPOSITE_RIGHTS: &[(&str, ACCESS_MASK)] = &[
    ("FA", rights::FILE_ALL_ACCESS),
    ("FR", rights::FILE_GENERIC_READ),
    ("FW", rights::FILE_GENERIC_WRITE),
    ("FX", rights::FILE_GENERIC_EXECUTE),
    ("KA", rights::KEY_ALL_ACCESS),
    ("KR", rights::KEY_READ),
    ("KW", rights::KEY_WRITE),
    ("KX", rights::KEY_EXECUTE),
];

const NO_ACCESS_CONTROL: &str = "NO_ACCESS_CONTROL";

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn alias_sid( alias: AliasSid, name: &str, domain: Option<&SID> ) -> Result<SID> {
    match alias {
        AliasSid::Fixed(authority, subs) => SID::new(authority, subs),
        AliasSid::Domain(rid) => match domain {
            Some(domain) => domain.append_rid(rid),
            None => Err(ErrorKind::DomainSidRequired(name.to_string()).into()),
        },
    }
}

/// Decodes a SID at the start of `s`, either `S-R-I-S…` or a two-letter alias, returning it
/// with the number of bytes consumed.
///
/// Domain-relative aliases such as `DA` need `domain`.
pub fn sddl_decode_sid( s: &str, domain: Option<&SID> ) -> Result<(SID, usize)> {
    let b = s.as_bytes();
    if b.len() >= 2 && (b[0] == b'S' || b[0] == b's') && b[1] == b'-' {
        return SID::parse_prefix(s);
    }
    let Some(code) = s.get(..2) else {
        return Err(ErrorKind::InvalidSid.into());
    };
    match SID_ALIASES.iter().find(|(name, _)| *name == code) {
        Some((name, alias)) => Ok((alias_sid(*alias, name, domain)?, 2)),
        None => Err(ErrorKind::InvalidSid.into()),
    }
}

/// Writes a SID as its alias when it has one, else as `S-R-I-S…`.
pub fn sddl_encode_sid( sid: &SID, domain: Option<&SID> ) -> String {
    for (name, alias) in SID_ALIASES {
        let matches = match alias {
            AliasSid::Fixed(authority, subs) => {
                sid.revision() == 1 && sid.authority() == *authority && sid.sub_authorities() == *subs
            },
            AliasSid::Domain(rid) => domain.and_then(|d| sid.rid_in_domain(d)) == Some(*rid),
        };
        if matches {
            return (*name).to_string();
        }
    }
    sid.to_string()
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn encode_access_mask( mask: ACCESS_MASK ) -> String {
    if mask.is_empty() {
        return String::new();
    }
    if let Some((code, _)) = COMPOSITE_RIGHTS.iter().find(|(_, m)| *m == mask) {
        return (*code).to_string();
    }

    let mut out = String::new();
    for shift in 0..32 {
        let bit = 1u32 << shift;
        if mask.0 & bit == 0 {
            continue;
        }
        match AccessRightsShortIdents::bit(bit) {
            Some(ident) => out.push_str(ident.0),
            None => return format!("0x{:08x}", mask.0),
        }
    }
    out
}

fn encode_ace_flags( flags: AceFlags ) -> String {
    AceFlags::idents::<AceFlagsShortIdents>()
        .into_iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .map(|(_, ident)| ident.0)
        .collect()
}

fn encode_acl_flags<K: ACLKind>( control: SecurityDescriptorControl ) -> String {
    let mut out = String::new();
    if control.contains(K::PROTECTED) {
        out.push('P');
    }
    if control.contains(K::AUTO_INHERIT_REQ) {
        out.push_str("AR");
    }
    if control.contains(K::AUTO_INHERITED) {
        out.push_str("AI");
    }
    out
}

/// Writes one ACE as `(type;flags;rights;guid;guid;trustee[;extra])`.
pub fn sddl_encode_ace( ace: &SecurityAce, domain: Option<&SID> ) -> Result<String> {
    let Some((type_code, _)) = ACE_TYPES.iter().find(|(_, t)| *t == ace.ace_type) else {
        return Err(Error::encode(format!("ACE type {:?} has no SDDL form", ace.ace_type)));
    };

    let guid = |g: Option<Uuid>| g.map(|g| g.hyphenated().to_string()).unwrap_or_default();
    let object = ace.object.unwrap_or_default();

    let mut out = format!(
        "({};{};{};{};{};{}",
        type_code,
        encode_ace_flags(ace.flags),
        encode_access_mask(ace.access_mask),
        guid(object.object_type),
        guid(object.inherited_object_type),
        sddl_encode_sid(&ace.trustee, domain),
    );

    match &ace.coda {
        AceCoda::None => {},
        AceCoda::Conditions(blob) => {
            let program = parse_conditional_ace(blob)?;
            out.push(';');
            out.push_str(&sddl_from_conditional_ace(&program)?);
        },
        AceCoda::Claim(claim) => {
            out.push(';');
            out.push_str(&sddl_resource_attr_from_claim(claim)?);
        },
    }
    out.push(')');
    Ok(out)
}

fn encode_acl<K: ACLKind>(
    out: &mut String,
    acl: Option<&ACL<K>>,
    control: SecurityDescriptorControl,
    domain: Option<&SID>,
) -> Result<()> {
    out.push(K::SDDL_SECTION);
    out.push(':');
    out.push_str(&encode_acl_flags::<K>(control));
    match acl {
        None => out.push_str(NO_ACCESS_CONTROL),
        Some(acl) => {
            for ace in acl.iter() {
                out.push_str(&sddl_encode_ace(ace, domain)?);
            }
        },
    }
    Ok(())
}

/// Writes a security descriptor as SDDL.
///
/// # Example
/// ```
/// use windows_sddl::{sddl_decode, sddl_encode, SID};
///
/// let domain: SID = "S-1-5-21-1-2-3".parse().unwrap();
/// let sd = sddl_decode("O:DAG:DUD:P(A;;FA;;;WD)", Some(&domain)).unwrap();
/// assert_eq!(sddl_encode(&sd, Some(&domain)).unwrap(), "O:DAG:DUD:P(A;;FA;;;WD)");
/// ```
pub fn sddl_encode( sd: &SecurityDescriptor, domain: Option<&SID> ) -> Result<String> {
    let mut out = String::new();
    if let Some(owner) = &sd.owner {
        out.push_str("O:");
        out.push_str(&sddl_encode_sid(owner, domain));
    }
    if let Some(group) = &sd.group {
        out.push_str("G:");
        out.push_str(&sddl_encode_sid(group, domain));
    }
    if sd.control.contains(SecurityDescriptorControl::DACL_PRESENT) || sd.dacl.is_some() {
        encode_acl::<DACL>(&mut out, sd.dacl.as_ref(), sd.control, domain)?;
    }
    if sd.control.contains(SecurityDescriptorControl::SACL_PRESENT) || sd.sacl.is_some() {
        encode_acl::<SACL>(&mut out, sd.sacl.as_ref(), sd.control, domain)?;
    }
    Ok(out)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

type DecodeResult<T> = core::result::Result<T, SddlDecodeError>;

struct Decoder<'a> {
    s: &'a str,
    pos: usize,
    domain: Option<&'a SID>,
    limits: &'a Limits,
}

impl<'a> Decoder<'a> {
    fn error( &self, message: impl Into<String> ) -> SddlDecodeError {
        let err = SddlDecodeError::new(message, self.pos);
        trace!(offset = err.offset, message = %err.message, "SDDL decode rejected");
        err
    }

    #[inline]
    fn rest( &self ) -> &'a str {
        self.s.get(self.pos..).unwrap_or("")
    }

    #[inline]
    fn peek( &self ) -> Option<u8> {
        self.s.as_bytes().get(self.pos).copied()
    }

    fn expect( &mut self, c: u8 ) -> DecodeResult<()> {
        if self.peek() != Some(c) {
            return Err(self.error(format!("expected '{}'", c as char)));
        }
        self.pos += 1;
        Ok(())
    }

    /// Text up to (not including) the next `;`.
    fn field( &mut self ) -> DecodeResult<&'a str> {
        let rest = self.rest();
        let Some(len) = rest.find(';') else {
            return Err(self.error("ACE has too few fields"));
        };
        self.pos += len + 1;
        Ok(&rest[..len])
    }

    fn sid( &mut self ) -> DecodeResult<SID> {
        match sddl_decode_sid(self.rest(), self.domain) {
            Ok((sid, used)) => {
                self.pos += used;
                Ok(sid)
            },
            Err(err) => Err(self.error(format!("could not parse SID: {err}"))),
        }
    }

    fn descriptor( &mut self ) -> DecodeResult<SecurityDescriptor> {
        if self.s.len() > self.limits.max_sddl_length {
            return Err(self.error("SDDL string is too long"));
        }

        let mut sd = SecurityDescriptor::new();
        while let Some(section) = self.peek() {
            if self.s.as_bytes().get(self.pos + 1) != Some(&b':') {
                return Err(self.error("expected a section such as 'D:'"));
            }
            self.pos += 2;
            match section {
                b'O' => sd.owner = Some(self.sid()?),
                b'G' => sd.group = Some(self.sid()?),
                b'D' => {
                    let (acl, control) = self.acl::<DACL>()?;
                    sd.dacl = acl;
                    sd.control |= control;
                },
                b'S' => {
                    let (acl, control) = self.acl::<SACL>()?;
                    sd.sacl = acl;
                    sd.control |= control;
                },
                c => {
                    self.pos -= 2;
                    return Err(self.error(format!("unknown section '{}'", c as char)));
                },
            }
        }
        Ok(sd)
    }

    fn acl<K: ACLKind>( &mut self ) -> DecodeResult<(Option<ACL<K>>, SecurityDescriptorControl)> {
        let mut control = K::PRESENT;
        let mut null = false;
        loop {
            let rest = self.rest();
            if rest.starts_with(NO_ACCESS_CONTROL) {
                null = true;
                self.pos += NO_ACCESS_CONTROL.len();
            } else if rest.starts_with("AI") {
                control |= K::AUTO_INHERITED;
                self.pos += 2;
            } else if rest.starts_with("AR") {
                control |= K::AUTO_INHERIT_REQ;
                self.pos += 2;
            } else if rest.starts_with('P') {
                control |= K::PROTECTED;
                self.pos += 1;
            } else {
                break;
            }
        }

        let mut acl = ACL::<K>::new();
        while self.peek() == Some(b'(') {
            let ace = self.ace()?;
            acl.push(ace);
        }
        if null {
            if !acl.is_empty() {
                return Err(self.error("NO_ACCESS_CONTROL with ACEs"));
            }
            return Ok((None, control));
        }
        Ok((Some(acl), control))
    }

    fn ace( &mut self ) -> DecodeResult<SecurityAce> {
        let start = self.pos;
        self.expect(b'(')?;

        let type_code = self.field()?;
        let Some(&(_, ace_type)) = ACE_TYPES.iter().find(|(code, _)| code.eq_ignore_ascii_case(type_code)) else {
            self.pos = start + 1;
            return Err(self.error(format!("unknown ACE type '{type_code}'")));
        };

        let flags_at = self.pos;
        let flags = self.field()?;
        let flags = decode_ace_flags(flags).ok_or_else(|| SddlDecodeError::new("bad ACE flags", flags_at))?;

        let mask_at = self.pos;
        let mask = self.field()?;
        let access_mask = decode_access_mask(mask).ok_or_else(|| SddlDecodeError::new("bad access mask", mask_at))?;

        let guid_at = self.pos;
        let object_type = self.guid()?;
        let inherited_object_type = self.guid()?;
        let object = if ace_type.is_object() {
            Some(ObjectAceData { object_type, inherited_object_type })
        } else if object_type.is_some() || inherited_object_type.is_some() {
            return Err(SddlDecodeError::new("GUIDs given for an ACE type without them", guid_at));
        } else {
            None
        };

        let trustee = self.sid()?;

        let coda = if ace_type.is_callback() {
            self.expect(b';')?;
            self.conditions()?
        } else if ace_type.is_resource() {
            self.expect(b';')?;
            self.resource_attribute()?
        } else {
            AceCoda::None
        };
        self.expect(b')')?;

        Ok(SecurityAce {
            ace_type,
            flags,
            access_mask,
            object,
            trustee,
            coda,
        })
    }

    fn guid( &mut self ) -> DecodeResult<Option<Uuid>> {
        let at = self.pos;
        let field = self.field()?;
        if field.is_empty() {
            return Ok(None);
        }
        Uuid::parse_str(field)
            .map(Some)
            .map_err(|err| SddlDecodeError::new(format!("bad GUID: {err}"), at))
    }

    fn conditions( &mut self ) -> DecodeResult<AceCoda> {
        let at = self.pos;
        let (program, consumed) =
            compile_condition_prefix(self.rest(), AceConditionFlags::ALLOW_DEVICE, self.domain, self.limits)
                .map_err(|err| SddlDecodeError::new(err.message, at + err.message_offset))?;
        self.pos += consumed;
        let blob = conditional_ace_encode_binary(&program)
            .map_err(|err| SddlDecodeError::new(format!("could not encode condition: {err}"), at))?;
        Ok(AceCoda::Conditions(blob))
    }

    fn resource_attribute( &mut self ) -> DecodeResult<AceCoda> {
        let at = self.pos;
        let (claim, consumed) = parse_sddl_resource_attribute(self.rest(), self.domain, self.limits)
            .map_err(|err| SddlDecodeError::new(err.message, at + err.message_offset))?;
        self.pos += consumed;
        Ok(AceCoda::Claim(claim))
    }
}

fn decode_ace_flags( s: &str ) -> Option<AceFlags> {
    let idents = AceFlags::idents::<AceFlagsShortIdents>();
    let mut flags = AceFlags::empty();
    let mut rest = s;
    while !rest.is_empty() {
        let code = rest.get(..2)?;
        let (flag, _) = idents.iter().find(|(_, ident)| ident.0.eq_ignore_ascii_case(code))?;
        flags |= *flag;
        rest = &rest[2..];
    }
    Some(flags)
}

fn decode_access_mask( s: &str ) -> Option<ACCESS_MASK> {
    if s.is_empty() {
        return Some(ACCESS_MASK(0));
    }
    if s.as_bytes()[0].is_ascii_digit() {
        let v = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None if s.len() > 1 && s.starts_with('0') => u32::from_str_radix(&s[1..], 8).ok()?,
            None => s.parse().ok()?,
        };
        return Some(ACCESS_MASK(v));
    }

    let mut mask = ACCESS_MASK(0);
    let mut rest = s;
    while !rest.is_empty() {
        let code = rest.get(..2)?;
        let bits = COMPOSITE_RIGHTS
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(code))
            .map(|(_, m)| *m)
            .or_else(|| {
                (0..32)
                    .map(|shift| 1u32 << shift)
                    .find(|bit| AccessRightsShortIdents::bit(*bit).is_some_and(|i| i.0.eq_ignore_ascii_case(code)))
                    .map(ACCESS_MASK)
            })?;
        mask |= bits;
        rest = &rest[2..];
    }
    Some(mask)
}

/// Decodes an SDDL security descriptor, reporting failures with the offending offset.
pub fn sddl_decode_err_msg( sddl: &str, domain: Option<&SID> ) -> core::result::Result<SecurityDescriptor, SddlDecodeError> {
    sddl_decode_with_limits(sddl, domain, &Limits::default())
}

pub fn sddl_decode_with_limits(
    sddl: &str,
    domain: Option<&SID>,
    limits: &Limits,
) -> core::result::Result<SecurityDescriptor, SddlDecodeError> {
    let mut decoder = Decoder {
        s: sddl,
        pos: 0,
        domain,
        limits,
    };
    decoder.descriptor().inspect_err(|err| {
        debug!(offset = err.offset, message = %err.message, "could not decode SDDL");
    })
}

/// Decodes an SDDL security descriptor.
///
/// Domain-relative aliases (`DA`, `DU`, …) resolve against `domain` and fail without it.
pub fn sddl_decode( sddl: &str, domain: Option<&SID> ) -> Result<SecurityDescriptor> {
    Ok(sddl_decode_err_msg(sddl, domain)?)
}

/// Decodes a single SDDL ACE such as `(A;;FA;;;WD)`.
pub fn sddl_decode_ace( sddl: &str, domain: Option<&SID> ) -> Result<SecurityAce> {
    let limits = Limits::default();
    let mut decoder = Decoder {
        s: sddl,
        pos: 0,
        domain,
        limits: &limits,
    };
    let ace = decoder.ace()?;
    if decoder.pos != sddl.len() {
        return Err(decoder.error("unexpected text after ACE").into());
    }
    Ok(ace)
}
