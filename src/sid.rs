//! Contains the security identifier value type and its binary and string forms.

use core::{
    cmp::Ordering,
    fmt,
    str::FromStr,
};

use crate::{
    error::{Error, ErrorKind, Result},
    utils::{ByteReader, ByteWriter},
};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub const SID_REVISION: u8 = 1;
pub const SID_MAX_SUB_AUTHORITIES: usize = 15;

/// Size in bytes of a SID without sub-authorities.
pub const SID_HEADER_SIZE: usize = 8;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// A security identifier: revision, 48-bit identifier authority and up to 15 sub-authorities.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SID {
    revision: u8,
    authority: [u8; 6],
    sub_authorities: Vec<u32>,
}

impl fmt::Debug for SID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SID")
            .field(&self.to_string())
            .finish()
    }
}

impl SID {
    /// Builds a revision 1 SID.
    ///
    /// # Errors
    /// Fails when `authority` does not fit in 48 bits or more than 15 sub-authorities are given.
    pub fn new( authority: u64, sub_authorities: &[u32] ) -> Result<Self> {
        if authority >> 48 != 0 {
            return Err(ErrorKind::InvalidSid.into());
        }
        let be = authority.to_be_bytes();
        let mut auth = [0u8; 6];
        auth.copy_from_slice(&be[2..]);
        Self::from_parts(SID_REVISION, auth, sub_authorities.to_vec())
    }

    pub fn from_parts( revision: u8, authority: [u8; 6], sub_authorities: Vec<u32> ) -> Result<Self> {
        if sub_authorities.len() > SID_MAX_SUB_AUTHORITIES {
            return Err(ErrorKind::InvalidSid.into());
        }
        Ok(Self {
            revision,
            authority,
            sub_authorities,
        })
    }

    #[inline]
    pub fn revision( &self ) -> u8 {
        self.revision
    }

    pub fn authority( &self ) -> u64 {
        self.authority.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
    }

    #[inline]
    pub fn sub_authorities( &self ) -> &[u32] {
        &self.sub_authorities
    }

    /// Encoded size in bytes: `8 + 4 * num_auths`.
    #[inline]
    pub fn len( &self ) -> usize {
        SID_HEADER_SIZE + 4 * self.sub_authorities.len()
    }

    /// Returns the SID `self-rid`.
    pub fn append_rid( &self, rid: u32 ) -> Result<Self> {
        let mut subs = self.sub_authorities.clone();
        subs.push(rid);
        Self::from_parts(self.revision, self.authority, subs)
    }

    /// Returns the RID if `self` is `domain` plus exactly one sub-authority.
    pub fn rid_in_domain( &self, domain: &SID ) -> Option<u32> {
        if self.revision != domain.revision
            || self.authority != domain.authority
            || self.sub_authorities.len() != domain.sub_authorities.len() + 1
        {
            return None;
        }
        let (last, prefix) = self.sub_authorities.split_last()?;
        if prefix != domain.sub_authorities.as_slice() {
            return None;
        }
        Some(*last)
    }

    //

    pub(crate) fn write_to( &self, w: &mut ByteWriter ) {
        w.put_u8(self.revision);
        w.put_u8(self.sub_authorities.len() as u8);
        w.put_bytes(&self.authority);
        for sub in &self.sub_authorities {
            w.put_u32_le(*sub);
        }
    }

    pub fn to_bytes( &self ) -> Vec<u8> {
        let mut w = ByteWriter::new();
        self.write_to(&mut w);
        w.into_vec()
    }

    pub(crate) fn read_from( r: &mut ByteReader<'_> ) -> Result<Self> {
        let revision = r.read_u8()?;
        let num_auths = r.read_u8()? as usize;
        if num_auths > SID_MAX_SUB_AUTHORITIES {
            return Err(ErrorKind::InvalidSid.into());
        }
        let authority = r.read_array::<6>()?;
        let mut sub_authorities = Vec::with_capacity(num_auths);
        for _ in 0..num_auths {
            sub_authorities.push(r.read_u32_le()?);
        }
        Ok(Self {
            revision,
            authority,
            sub_authorities,
        })
    }

    /// Decodes a binary SID that must occupy the whole of `bytes`.
    pub fn from_bytes( bytes: &[u8] ) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        let sid = Self::read_from(&mut r)?;
        if !r.is_empty() {
            return Err(Error::invalid("trailing bytes after SID"));
        }
        Ok(sid)
    }

    /// Parses a leading `S-R-I-S…` string, returning the SID and the number of bytes consumed.
    ///
    /// # Remarks
    /// Parsing stops at the first character that cannot continue the SID, so the SID may be
    /// followed by other text such as `G:` in a descriptor string.
    pub fn parse_prefix( s: &str ) -> Result<(Self, usize)> {
        let b = s.as_bytes();
        if b.len() < 2 || !(b[0] == b'S' || b[0] == b's') || b[1] != b'-' {
            return Err(ErrorKind::InvalidSid.into());
        }
        let mut pos = 2;

        let (revision, used) = parse_decimal(&b[pos..]).ok_or(ErrorKind::InvalidSid)?;
        if revision > u64::from(u8::MAX) {
            return Err(ErrorKind::InvalidSid.into());
        }
        pos += used;
        if b.get(pos) != Some(&b'-') {
            return Err(ErrorKind::InvalidSid.into());
        }
        pos += 1;

        let (authority, used) = if b[pos..].starts_with(b"0x") || b[pos..].starts_with(b"0X") {
            let (v, used) = parse_hex(&b[pos + 2..]).ok_or(ErrorKind::InvalidSid)?;
            (v, used + 2)
        } else {
            parse_decimal(&b[pos..]).ok_or(ErrorKind::InvalidSid)?
        };
        if authority >> 48 != 0 {
            return Err(ErrorKind::InvalidSid.into());
        }
        pos += used;

        let mut subs = Vec::new();
        while pos + 1 < b.len() && b[pos] == b'-' && b[pos + 1].is_ascii_digit() {
            let (sub, used) = parse_decimal(&b[pos + 1..]).ok_or(ErrorKind::InvalidSid)?;
            if sub > u64::from(u32::MAX) || subs.len() == SID_MAX_SUB_AUTHORITIES {
                return Err(ErrorKind::InvalidSid.into());
            }
            subs.push(sub as u32);
            pos += 1 + used;
        }

        let mut sid = Self::new(authority, &subs)?;
        sid.revision = revision as u8;
        Ok((sid, pos))
    }
}

fn parse_decimal( b: &[u8] ) -> Option<(u64, usize)> {
    let digits = b.iter().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let mut v: u64 = 0;
    for c in &b[..digits] {
        v = v.checked_mul(10)?.checked_add(u64::from(c - b'0'))?;
    }
    Some((v, digits))
}

fn parse_hex( b: &[u8] ) -> Option<(u64, usize)> {
    let digits = b.iter().take_while(|c| c.is_ascii_hexdigit()).count();
    if digits == 0 || digits > 16 {
        return None;
    }
    let s = core::str::from_utf8(&b[..digits]).ok()?;
    Some((u64::from_str_radix(s, 16).ok()?, digits))
}

impl FromStr for SID {
    type Err = Error;

    fn from_str( s: &str ) -> Result<Self> {
        let (sid, used) = Self::parse_prefix(s)?;
        if used != s.len() {
            return Err(ErrorKind::InvalidSid.into());
        }
        Ok(sid)
    }
}

impl fmt::Display for SID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let authority = self.authority();
        if authority >> 32 == 0 {
            write!(f, "S-{}-{}", self.revision, authority)?;
        } else {
            write!(f, "S-{}-0x{:012X}", self.revision, authority)?;
        }
        for sub in &self.sub_authorities {
            write!(f, "-{}", sub)?;
        }
        Ok(())
    }
}

// Cheapest differences first: revision, authority, count, then sub-authorities from the last.
impl Ord for SID {
    fn cmp( &self, other: &Self ) -> Ordering {
        self.revision.cmp(&other.revision)
            .then_with(|| self.authority.cmp(&other.authority))
            .then_with(|| self.sub_authorities.len().cmp(&other.sub_authorities.len()))
            .then_with(|| self.sub_authorities.iter().rev().cmp(other.sub_authorities.iter().rev()))
    }
}

impl PartialOrd for SID {
    fn partial_cmp( &self, other: &Self ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
