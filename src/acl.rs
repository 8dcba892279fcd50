//! Contains the ordered ACE list, its binary layout and the canonical DACL ordering.

use core::{
    fmt,
    marker::PhantomData,
};
use fallible_iterator::FallibleIterator;
use tracing::trace;

use crate::{
    ace::{ACEFilter, SecurityAce, ACE_FIXED_SIZE},
    acl_kind::{ACLKind, IsACLKind, DACL},
    error::{Error, Result},
    sid::SID,
    types::AceType,
    utils::{ByteReader, ByteWriter},
};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub const ACL_REVISION: u8 = 2;
pub const ACL_REVISION_DS: u8 = 4;

pub const ACL_HEADER_SIZE: usize = 8;
pub const MAX_ACL_SIZE: usize = 65535;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// `ACL` is an ordered list of ACEs. Order is evaluation order.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ACL<K: ACLKind> {
    pub revision: u8,
    entries: Vec<SecurityAce>,
    _ph: PhantomData<K>,
}

impl<K: ACLKind> fmt::Debug for ACL<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(if K::SDDL_SECTION == 'D' { "DACL" } else { "SACL" })
            .field( "revision", &self.revision )
            .field( "entries", &self.entries )
            .finish()
    }
}

impl<K: ACLKind> Default for ACL<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ACLKind> ACL<K> {
    #[inline]
    pub fn new() -> Self {
        Self::from_entries(Vec::new())
    }

    #[inline]
    pub fn from_entries( entries: Vec<SecurityAce> ) -> Self {
        Self {
            revision: ACL_REVISION,
            entries,
            _ph: PhantomData,
        }
    }

    #[inline]
    pub fn entries( &self ) -> &[SecurityAce] {
        &self.entries
    }

    #[inline]
    pub fn entries_mut( &mut self ) -> &mut Vec<SecurityAce> {
        &mut self.entries
    }

    #[inline]
    pub fn into_entries( self ) -> Vec<SecurityAce> {
        self.entries
    }

    #[inline]
    pub fn len( &self ) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty( &self ) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn push( &mut self, ace: SecurityAce ) {
        self.entries.push(ace);
    }

    #[inline]
    pub fn iter( &self ) -> core::slice::Iter<'_, SecurityAce> {
        self.entries.iter()
    }

    /// Returns the entries for `sid` which pass `filter`.
    pub fn get_entries( &self, sid: &SID, filter: &Option<ACEFilter> ) -> Vec<&SecurityAce> {
        self.entries
            .iter()
            .filter(|ace| ace.is_match(sid, filter))
            .collect()
    }

    /// Removes the entries for `sid` which pass `filter`, returning how many were removed.
    pub fn remove_entries( &mut self, sid: &SID, filter: &Option<ACEFilter> ) -> usize {
        let before = self.entries.len();
        self.entries.retain(|ace| !ace.is_match(sid, filter));
        before - self.entries.len()
    }

    //

    fn wire_revision( &self ) -> u8 {
        if self.entries.iter().any(|ace| ace.ace_type.is_object()) {
            ACL_REVISION_DS
        } else {
            self.revision
        }
    }

    pub fn size( &self ) -> Result<usize> {
        let mut size = ACL_HEADER_SIZE;
        for ace in &self.entries {
            size += ace.size()?;
        }
        Ok(size)
    }

    pub(crate) fn encode_into( &self, w: &mut ByteWriter ) -> Result<()> {
        if self.entries.len() > u16::MAX as usize {
            return Err(Error::limit("ACE count"));
        }
        let start = w.len();
        w.put_u8(self.wire_revision());
        w.put_u8(0);
        w.put_u16_le(0);
        w.put_u16_le(self.entries.len() as u16);
        w.put_u16_le(0);
        for ace in &self.entries {
            ace.encode_into(w)?;
        }
        let size = w.len() - start;
        if size > MAX_ACL_SIZE {
            return Err(Error::limit("ACL size"));
        }
        w.set_u16_at(start + 2, size as u16);
        Ok(())
    }

    pub fn encode( &self ) -> Result<Vec<u8>> {
        let mut w = ByteWriter::new();
        self.encode_into(&mut w)?;
        Ok(w.into_vec())
    }

    /// Decodes an ACL from the front of `bytes`, returning it with its declared size.
    pub fn decode( bytes: &[u8] ) -> Result<(Self, usize)> {
        let (revision, size, iter) = raw_entries(bytes)?;
        let entries: Vec<SecurityAce> = iter.collect()?;
        let acl = Self {
            revision,
            entries,
            _ph: PhantomData,
        };
        Ok((acl, size))
    }
}

impl<K: IsACLKind<DACL>> ACL<K> {
    /// See [`dacl_sort_into_canonical_order`].
    pub fn sort_into_canonical_order( &mut self ) {
        dacl_sort_into_canonical_order(&mut self.entries);
    }

    pub fn is_canonical( &self ) -> bool {
        is_canonical_order(&self.entries)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Iterates the ACEs of an encoded ACL without collecting them.
pub struct AceIterator<'a> {
    reader: ByteReader<'a>,
    remaining: u16,
}

impl<'a> FallibleIterator for AceIterator<'a> {
    type Item = SecurityAce;
    type Error = Error;

    fn next( &mut self ) -> Result<Option<SecurityAce>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let (ace, used) = SecurityAce::decode(self.reader.rest())?;
        self.reader.take(used)?;
        self.remaining -= 1;
        Ok(Some(ace))
    }

    fn size_hint( &self ) -> (usize, Option<usize>) {
        (0, Some(self.remaining as usize))
    }
}

/// Validates the ACL header of `bytes` and returns its revision, declared size and an ACE iterator.
pub fn raw_entries( bytes: &[u8] ) -> Result<(u8, usize, AceIterator<'_>)> {
    let mut r = ByteReader::new(bytes);
    let revision = r.read_u8()?;
    let _sbz1 = r.read_u8()?;
    let size = r.read_u16_le()? as usize;
    let count = r.read_u16_le()?;
    let _sbz2 = r.read_u16_le()?;

    if !(ACL_REVISION..=ACL_REVISION_DS).contains(&revision) {
        return Err(Error::invalid(format!("unsupported ACL revision {}", revision)));
    }
    if size < ACL_HEADER_SIZE || size > bytes.len() {
        trace!(size, available = bytes.len(), "ACL size out of range");
        return Err(Error::invalid("ACL size out of range"));
    }
    if count as usize > (size - ACL_HEADER_SIZE) / ACE_FIXED_SIZE {
        return Err(Error::invalid("ACL declares more ACEs than fit"));
    }

    let iter = AceIterator {
        reader: ByteReader::new(&bytes[ACL_HEADER_SIZE..size]),
        remaining: count,
    };
    Ok((revision, size, iter))
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Only plain access-denied ACEs are promoted; object and callback denies keep their place
/// among the allows.
#[inline]
fn is_plain_deny( ace: &SecurityAce ) -> bool {
    ace.ace_type == AceType::AccessDenied
}

/// Sort key within one inheritance partition: plain denies first, then ACEs that apply to the
/// object itself before inherit-only ones.
#[inline]
fn canonical_key( ace: &SecurityAce ) -> (bool, bool) {
    (!is_plain_deny(ace), ace.inherit_only_flag())
}

/// Puts a DACL into canonical order.
///
/// # Remarks
/// Non-inherited ACEs are stably partitioned ahead of inherited ones, then each partition is
/// stably sorted by [`canonical_key`]. Entries are only reordered, never changed.
pub fn dacl_sort_into_canonical_order( aces: &mut [SecurityAce] ) {
    if aces.len() < 2 {
        return;
    }

    aces.sort_by_key(|ace| ace.inherited_flag());
    let explicit = aces.iter().take_while(|ace| !ace.inherited_flag()).count();

    let (explicit_aces, inherited_aces) = aces.split_at_mut(explicit);
    explicit_aces.sort_by_key(canonical_key);
    inherited_aces.sort_by_key(canonical_key);
}

/// True when no inherited ACE precedes an explicit one and, within each group, no other
/// ACE precedes a plain access-denied ACE.
pub fn is_canonical_order( aces: &[SecurityAce] ) -> bool {
    aces.windows(2).all(|pair| {
        let (a, b) = (&pair[0], &pair[1]);
        match (a.inherited_flag(), b.inherited_flag()) {
            (true, false) => false,
            (false, true) => true,
            _ => is_plain_deny(a) || !is_plain_deny(b),
        }
    })
}
