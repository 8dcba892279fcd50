//! Contains claim security attributes: typed, named value sets attached to tokens and resources.

use core::cmp::Ordering;
use bitflags::bitflags;
use tracing::trace;

use crate::{
    error::{Error, Result},
    sid::SID,
    utils::{string_to_utf16le, utf16le_cstr_at, ByteReader, ByteWriter},
};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub const CLAIM_MAX_OCTET_LENGTH: usize = 65535;

const RELATIVE_HEADER_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ClaimValueType {
    Int64 = 0x0001,
    Uint64 = 0x0002,
    String = 0x0003,
    Sid = 0x0005,
    Boolean = 0x0006,
    OctetString = 0x0010,
}

impl ClaimValueType {
    pub fn from_u16( v: u16 ) -> Option<Self> {
        let t = match v {
            0x0001 => ClaimValueType::Int64,
            0x0002 => ClaimValueType::Uint64,
            0x0003 => ClaimValueType::String,
            0x0005 => ClaimValueType::Sid,
            0x0006 => ClaimValueType::Boolean,
            0x0010 => ClaimValueType::OctetString,
            _ => return None,
        };
        Some(t)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClaimFlags: u32 {
        const NON_INHERITABLE = 0x0001;
        const CASE_SENSITIVE = 0x0002;
        const USE_FOR_DENY_ONLY = 0x0004;
        const DISABLED_BY_DEFAULT = 0x0008;
        const DISABLED = 0x0010;
        const MANDATORY = 0x0020;

        /// Set once the values are known to be sorted with no duplicates.
        const UNIQUE_AND_SORTED = 0x4000_0000;

        const _ = !0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClaimValues {
    Int64(Vec<i64>),
    Uint64(Vec<u64>),
    String(Vec<String>),
    Sid(Vec<SID>),
    Boolean(Vec<bool>),
    OctetString(Vec<Vec<u8>>),
}

impl ClaimValues {
    pub fn value_type( &self ) -> ClaimValueType {
        match self {
            ClaimValues::Int64(_) => ClaimValueType::Int64,
            ClaimValues::Uint64(_) => ClaimValueType::Uint64,
            ClaimValues::String(_) => ClaimValueType::String,
            ClaimValues::Sid(_) => ClaimValueType::Sid,
            ClaimValues::Boolean(_) => ClaimValueType::Boolean,
            ClaimValues::OctetString(_) => ClaimValueType::OctetString,
        }
    }

    pub fn len( &self ) -> usize {
        match self {
            ClaimValues::Int64(v) => v.len(),
            ClaimValues::Uint64(v) => v.len(),
            ClaimValues::String(v) => v.len(),
            ClaimValues::Sid(v) => v.len(),
            ClaimValues::Boolean(v) => v.len(),
            ClaimValues::OctetString(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty( &self ) -> bool {
        self.len() == 0
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// A named claim with one or more values of a single type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClaimSecurityAttribute {
    pub name: String,
    pub flags: ClaimFlags,
    pub values: ClaimValues,
}

impl ClaimSecurityAttribute {
    pub fn new( name: impl Into<String>, values: ClaimValues ) -> Self {
        Self {
            name: name.into(),
            flags: ClaimFlags::empty(),
            values,
        }
    }

    #[inline]
    pub fn set_flags( mut self, flags: ClaimFlags ) -> Self {
        self.flags = flags;
        self
    }

    #[inline]
    pub fn value_type( &self ) -> ClaimValueType {
        self.values.value_type()
    }

    #[inline]
    pub fn value_count( &self ) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_case_sensitive( &self ) -> bool {
        self.flags.contains(ClaimFlags::CASE_SENSITIVE)
    }

    /// Sorts the values and rejects duplicates, then marks the claim as unique and sorted.
    ///
    /// # Remarks
    /// Strings compare case-insensitively unless `case_sensitive` is set. Boolean claims may
    /// hold at most one `false` and one `true`.
    pub fn check_and_sort( &mut self, case_sensitive: bool ) -> Result<()> {
        let unique = match &mut self.values {
            ClaimValues::Boolean(v) => {
                match v.len() {
                    0 | 1 => true,
                    2 => {
                        v.sort();
                        v[0] != v[1]
                    },
                    _ => false,
                }
            },
            ClaimValues::Int64(v) => sort_unique(v, |a, b| a.cmp(b)),
            ClaimValues::Uint64(v) => sort_unique(v, |a, b| a.cmp(b)),
            ClaimValues::Sid(v) => sort_unique(v, |a, b| a.cmp(b)),
            ClaimValues::OctetString(v) => sort_unique(v, |a, b| a.cmp(b)),
            ClaimValues::String(v) => {
                if case_sensitive {
                    sort_unique(v, |a, b| a.cmp(b))
                } else {
                    sort_unique(v, |a, b| compare_strings_nocase(a, b))
                }
            },
        };

        if !unique {
            trace!(name = %self.name, "claim has duplicate values");
            return Err(Error::invalid(format!("claim '{}' has duplicate values", self.name)));
        }

        self.flags |= ClaimFlags::UNIQUE_AND_SORTED;
        if case_sensitive {
            self.flags |= ClaimFlags::CASE_SENSITIVE;
        }
        Ok(())
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

    /// Encodes as `CLAIM_SECURITY_ATTRIBUTE_RELATIVE_V1`; every offset is relative to the start.
    pub fn encode_relative( &self ) -> Result<Vec<u8>> {
        let count = self.value_count();
        let mut w = ByteWriter::new();
        w.put_u32_le(0);
        w.put_u16_le(self.value_type() as u16);
        w.put_u16_le(0);
        w.put_u32_le(self.flags.bits());
        w.put_u32_le(count as u32);
        let offsets_at = w.len();
        for _ in 0..count {
            w.put_u32_le(0);
        }

        let mut offsets = Vec::with_capacity(count);
        match &self.values {
            ClaimValues::Int64(v) => for x in v {
                offsets.push(w.len());
                w.put_i64_le(*x);
            },
            ClaimValues::Uint64(v) => for x in v {
                offsets.push(w.len());
                w.put_u64_le(*x);
            },
            ClaimValues::Boolean(v) => for x in v {
                offsets.push(w.len());
                w.put_u64_le(u64::from(*x));
            },
            ClaimValues::String(v) => for s in v {
                offsets.push(w.len());
                w.put_bytes(&string_to_utf16le(s));
                w.put_u16_le(0);
            },
            ClaimValues::Sid(v) => for sid in v {
                offsets.push(w.len());
                w.put_u32_le(sid.len() as u32);
                sid.write_to(&mut w);
            },
            ClaimValues::OctetString(v) => for bytes in v {
                if bytes.len() > CLAIM_MAX_OCTET_LENGTH {
                    return Err(Error::limit("claim octet string length"));
                }
                offsets.push(w.len());
                w.put_u32_le(bytes.len() as u32);
                w.put_bytes(bytes);
            },
        }

        let name_offset = w.len();
        w.put_bytes(&string_to_utf16le(&self.name));
        w.put_u16_le(0);

        w.set_u32_at(0, name_offset as u32);
        for (i, offset) in offsets.into_iter().enumerate() {
            w.set_u32_at(offsets_at + 4 * i, offset as u32);
        }
        Ok(w.into_vec())
    }

    pub fn decode_relative( data: &[u8] ) -> Result<Self> {
        let mut r = ByteReader::new(data);
        let name_offset = r.read_u32_le()? as usize;
        let raw_type = r.read_u16_le()?;
        let _reserved = r.read_u16_le()?;
        let flags = ClaimFlags::from_bits_retain(r.read_u32_le()?);
        let count = r.read_u32_le()? as usize;

        if count > (data.len() - RELATIVE_HEADER_SIZE) / 4 {
            return Err(Error::truncated());
        }
        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            offsets.push(r.read_u32_le()? as usize);
        }

        let value_type = ClaimValueType::from_u16(raw_type)
            .ok_or_else(|| Error::invalid(format!("unknown claim value type 0x{:04x}", raw_type)))?;
        let name = utf16le_cstr_at(data, name_offset)?;

        let at = |offset: usize| reader_at(data, offset);

        let values = match value_type {
            ClaimValueType::Int64 => ClaimValues::Int64(
                offsets.iter().map(|o| at(*o)?.read_i64_le()).collect::<Result<_>>()?
            ),
            ClaimValueType::Uint64 => ClaimValues::Uint64(
                offsets.iter().map(|o| at(*o)?.read_u64_le()).collect::<Result<_>>()?
            ),
            ClaimValueType::Boolean => ClaimValues::Boolean(
                offsets.iter().map(|o| match at(*o)?.read_u64_le()? {
                    0 => Ok(false),
                    1 => Ok(true),
                    _ => Err(Error::invalid("boolean claim value is neither 0 nor 1")),
                }).collect::<Result<_>>()?
            ),
            ClaimValueType::String => ClaimValues::String(
                offsets.iter().map(|o| utf16le_cstr_at(data, *o)).collect::<Result<_>>()?
            ),
            ClaimValueType::Sid => ClaimValues::Sid(
                offsets.iter().map(|o| {
                    let mut r = at(*o)?;
                    let len = r.read_u32_le()? as usize;
                    SID::from_bytes(r.take(len)?)
                }).collect::<Result<_>>()?
            ),
            ClaimValueType::OctetString => ClaimValues::OctetString(
                offsets.iter().map(|o| {
                    let mut r = at(*o)?;
                    let len = r.read_u32_le()? as usize;
                    if len > CLAIM_MAX_OCTET_LENGTH {
                        return Err(Error::limit("claim octet string length"));
                    }
                    Ok(r.take(len)?.to_vec())
                }).collect::<Result<_>>()?
            ),
        };

        Ok(Self {
            name,
            flags,
            values,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn reader_at( data: &[u8], offset: usize ) -> Result<ByteReader<'_>> {
    if offset > data.len() {
        return Err(Error::truncated());
    }
    Ok(ByteReader::new(&data[offset..]))
}

pub(crate) fn compare_strings_nocase( a: &str, b: &str ) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Stable-sorts `v` and reports whether no two neighbours compare equal.
fn sort_unique<T>( v: &mut [T], cmp: impl Fn(&T, &T) -> Ordering ) -> bool {
    v.sort_by(&cmp);
    v.windows(2).all(|pair| cmp(&pair[0], &pair[1]) != Ordering::Equal)
}
