//! Contains debug helpers and bounds-checked byte cursors shared by the binary codecs.

use core::fmt;
use widestring::{U16Str, U16String};

use crate::error::{Error, Result};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// An identifier printed without quotes by `fmt::Debug`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DebugIdent(pub &'static str);

impl fmt::Debug for DebugIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Forces the compact `{:?}` form of the wrapped value even inside `{:#?}`.
pub struct DebugUnpretty<T: fmt::Debug>(pub T);

impl<T: fmt::Debug> fmt::Debug for DebugUnpretty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Forward-only reader over an untrusted buffer. Every read checks the remaining length first.
#[derive(Clone)]
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    #[inline]
    pub fn new( data: &'a [u8] ) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub fn position( &self ) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining( &self ) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_empty( &self ) -> bool {
        self.remaining() == 0
    }

    #[inline]
    pub fn rest( &self ) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn take( &mut self, len: usize ) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::truncated());
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>( &mut self ) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    #[inline]
    pub fn read_u8( &mut self ) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    #[inline]
    pub fn read_u16_le( &mut self ) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    #[inline]
    pub fn read_u32_le( &mut self ) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    #[inline]
    pub fn read_i64_le( &mut self ) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    #[inline]
    pub fn read_u64_le( &mut self ) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Default)]
pub(crate) struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len( &self ) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn put_u8( &mut self, v: u8 ) {
        self.buf.push(v);
    }

    #[inline]
    pub fn put_u16_le( &mut self, v: u16 ) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn put_u32_le( &mut self, v: u32 ) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn put_i64_le( &mut self, v: i64 ) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn put_u64_le( &mut self, v: u64 ) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn put_bytes( &mut self, bytes: &[u8] ) {
        self.buf.extend_from_slice(bytes);
    }

    /// Zero-pads up to the next multiple of `align`.
    pub fn pad_to( &mut self, align: usize ) {
        while self.buf.len() % align != 0 {
            self.buf.push(0);
        }
    }

    pub fn set_u16_at( &mut self, pos: usize, v: u16 ) {
        self.buf[pos..pos + 2].copy_from_slice(&v.to_le_bytes());
    }

    pub fn set_u32_at( &mut self, pos: usize, v: u32 ) {
        self.buf[pos..pos + 4].copy_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn into_vec( self ) -> Vec<u8> {
        self.buf
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Decodes UTF-16LE bytes. An odd length or an unpaired surrogate is an error.
pub(crate) fn utf16le_to_string( bytes: &[u8] ) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(Error::invalid("odd length UTF-16 string"));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    U16Str::from_slice(&units)
        .to_string()
        .map_err(|_| Error::invalid("invalid UTF-16 string"))
}

pub(crate) fn string_to_utf16le( s: &str ) -> Vec<u8> {
    U16String::from_str(s)
        .into_vec()
        .into_iter()
        .flat_map(|u| u.to_le_bytes())
        .collect()
}

/// Reads a NUL-terminated UTF-16LE string starting at `offset`.
pub(crate) fn utf16le_cstr_at( data: &[u8], offset: usize ) -> Result<String> {
    if offset > data.len() {
        return Err(Error::truncated());
    }
    let tail = &data[offset..];
    let mut end = None;
    for (i, c) in tail.chunks_exact(2).enumerate() {
        if c[0] == 0 && c[1] == 0 {
            end = Some(i * 2);
            break;
        }
    }
    let end = end.ok_or_else(Error::truncated)?;
    utf16le_to_string(&tail[..end])
}
