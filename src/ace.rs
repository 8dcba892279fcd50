//! Contains the ACE value type and its binary layout.

use core::{
    fmt,
    hash,
};
use tracing::trace;
use uuid::Uuid;

use crate::{
    claims::ClaimSecurityAttribute,
    error::{Error, Result},
    sid::SID,
    types::*,
    utils::{ByteReader, ByteWriter, DebugUnpretty},
};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub const ACE_HEADER_SIZE: usize = 4;

/// Header plus access mask.
pub const ACE_FIXED_SIZE: usize = 8;

pub const MAX_ACE_SIZE: usize = 65535;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Object-type GUIDs carried by object ACEs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ObjectAceData {
    pub object_type: Option<Uuid>,
    pub inherited_object_type: Option<Uuid>,
}

impl ObjectAceData {
    pub fn flags( &self ) -> ObjectAceFlags {
        let mut flags = ObjectAceFlags::empty();
        if self.object_type.is_some() {
            flags |= ObjectAceFlags::OBJECT_TYPE_PRESENT;
        }
        if self.inherited_object_type.is_some() {
            flags |= ObjectAceFlags::INHERITED_OBJECT_TYPE_PRESENT;
        }
        flags
    }

    fn size( &self ) -> usize {
        4 + 16 * (self.object_type.is_some() as usize + self.inherited_object_type.is_some() as usize)
    }
}

/// Trailing data after the trustee SID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum AceCoda {
    #[default]
    None,

    /// Encoded conditional expression of a callback ACE
    Conditions(Vec<u8>),

    /// Claim of a resource attribute ACE
    Claim(ClaimSecurityAttribute),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// `SecurityAce` represents a single access control entry.
///
/// The wire size is never stored; [`SecurityAce::size`] derives it from the content.
#[derive(Clone, PartialEq, Eq)]
pub struct SecurityAce {
    pub ace_type: AceType,
    pub flags: AceFlags,
    pub access_mask: ACCESS_MASK,

    /// Present for object ACE types only
    pub object: Option<ObjectAceData>,

    pub trustee: SID,
    pub coda: AceCoda,
}

impl fmt::Debug for SecurityAce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("SecurityAce");
        d.field( "ace_type", &self.ace_type )
            .field( "flags", &DebugUnpretty(AceFlagsRepresenter::<AceFlagsShortIdents>::new(self.flags)) )
            .field( "access_mask", &DebugUnpretty(AccessMaskRepresenter::<AccessRightsShortIdents>::new(self.access_mask)) )
            .field( "trustee", &self.trustee );
        if let Some(object) = &self.object {
            d.field( "object", object );
        }
        if self.coda != AceCoda::None {
            d.field( "coda", &self.coda );
        }
        d.finish()
    }
}

impl hash::Hash for SecurityAce {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        hash::Hash::hash(&self.ace_type, state);
        hash::Hash::hash(&self.flags.bits(), state);
        hash::Hash::hash(&self.access_mask.0, state);
        hash::Hash::hash(&self.trustee, state);
        hash::Hash::hash(&self.object, state);
        hash::Hash::hash(&self.coda, state);
    }
}

/// Initialises an ACE with no trailing data. Its size is the trustee size plus the 8-byte fixed
/// part; object types start with empty object data, which adds the 4-byte object flags.
pub fn init_sec_ace( trustee: &SID, ace_type: AceType, access_mask: impl IntoAccessMask, flags: impl IntoAceFlags ) -> SecurityAce {
    SecurityAce {
        ace_type,
        flags: flags.into_ace_flags(),
        access_mask: access_mask.into_access_mask(),
        object: ace_type.is_object().then(ObjectAceData::default),
        trustee: trustee.clone(),
        coda: AceCoda::None,
    }
}

#[inline]
pub fn sec_ace_object( ace_type: AceType ) -> bool {
    ace_type.is_object()
}

#[inline]
pub fn sec_ace_callback( ace_type: AceType ) -> bool {
    ace_type.is_callback()
}

#[inline]
pub fn sec_ace_resource( ace_type: AceType ) -> bool {
    ace_type.is_resource()
}

#[inline]
pub fn sec_ace_has_extra_blob( ace_type: AceType ) -> bool {
    ace_type.has_extra_blob()
}

impl SecurityAce {
    #[inline]
    pub fn new_allow( trustee: &SID, flags: impl IntoAceFlags, access_mask: impl IntoAccessMask ) -> Self {
        init_sec_ace( trustee, AceType::AccessAllowed, access_mask, flags )
    }

    #[inline]
    pub fn new_deny( trustee: &SID, flags: impl IntoAceFlags, access_mask: impl IntoAccessMask ) -> Self {
        init_sec_ace( trustee, AceType::AccessDenied, access_mask, flags )
    }

    #[inline]
    pub fn new_audit( trustee: &SID, flags: impl IntoAceFlags, access_mask: impl IntoAccessMask ) -> Self {
        init_sec_ace( trustee, AceType::SystemAudit, access_mask, flags )
    }

    #[inline]
    pub fn new_mandatory_label( label_sid: &SID, flags: impl IntoAceFlags, access_mask: impl IntoAccessMask ) -> Self {
        init_sec_ace( label_sid, AceType::SystemMandatoryLabel, access_mask, flags )
    }

    /// A resource attribute ACE carrying `claim`. Its trustee is Everyone.
    pub fn new_resource_attribute( claim: ClaimSecurityAttribute, flags: impl IntoAceFlags ) -> Result<Self> {
        let everyone = SID::new(1, &[0])?;
        let mut ace = init_sec_ace( &everyone, AceType::SystemResourceAttribute, 0u32, flags );
        ace.coda = AceCoda::Claim(claim);
        Ok(ace)
    }

    //

    #[inline]
    pub fn set_conditions( mut self, conditions: Vec<u8> ) -> Self {
        self.coda = AceCoda::Conditions(conditions);
        self
    }

    #[inline]
    pub fn set_object( mut self, object: ObjectAceData ) -> Self {
        self.object = Some(object);
        self
    }

    //

    pub fn conditions( &self ) -> Option<&[u8]> {
        match &self.coda {
            AceCoda::Conditions(blob) => Some(blob),
            _ => None,
        }
    }

    pub fn claim( &self ) -> Option<&ClaimSecurityAttribute> {
        match &self.coda {
            AceCoda::Claim(claim) => Some(claim),
            _ => None,
        }
    }

    pub fn inherited_flag( &self ) -> bool {
        self.flags.contains(AceFlags::INHERITED)
    }

    pub fn inherit_only_flag( &self ) -> bool {
        self.flags.contains(AceFlags::INHERIT_ONLY)
    }

    pub fn no_propagate_inherit_flag( &self ) -> bool {
        self.flags.contains(AceFlags::NO_PROPAGATE_INHERIT)
    }

    pub fn container_inherit_flag( &self ) -> bool {
        self.flags.contains(AceFlags::CONTAINER_INHERIT)
    }

    pub fn object_inherit_flag( &self ) -> bool {
        self.flags.contains(AceFlags::OBJECT_INHERIT)
    }

    //

    fn core_size( &self ) -> usize {
        let object = match (&self.object, self.ace_type.is_object()) {
            (Some(object), true) => object.size(),
            (None, true) => 4,
            _ => 0,
        };
        ACE_FIXED_SIZE + object + self.trustee.len()
    }

    fn coda_bytes( &self ) -> Result<Vec<u8>> {
        match (&self.coda, self.ace_type) {
            (AceCoda::None, _) => Ok(Vec::new()),
            (AceCoda::Conditions(blob), t) if t.is_callback() => Ok(blob.clone()),
            (AceCoda::Claim(claim), t) if t.is_resource() => claim.encode_relative(),
            (_, t) => Err(Error::encode(format!("ACE type {:?} cannot carry this trailing data", t))),
        }
    }

    /// Encoded size in bytes, rounded up to a multiple of 4.
    pub fn size( &self ) -> Result<usize> {
        let coda = self.coda_bytes()?;
        Ok((self.core_size() + coda.len() + 3) & !3)
    }

    pub(crate) fn encode_into( &self, w: &mut ByteWriter ) -> Result<()> {
        let coda = self.coda_bytes()?;
        let size = (self.core_size() + coda.len() + 3) & !3;
        if size > MAX_ACE_SIZE {
            return Err(Error::limit("ACE size"));
        }

        let start = w.len();
        w.put_u8(self.ace_type.as_u8());
        w.put_u8(self.flags.bits());
        w.put_u16_le(size as u16);
        w.put_u32_le(self.access_mask.0);

        if self.ace_type.is_object() {
            let object = self.object.unwrap_or_default();
            w.put_u32_le(object.flags().bits());
            if let Some(guid) = object.object_type {
                w.put_bytes(&guid.to_bytes_le());
            }
            if let Some(guid) = object.inherited_object_type {
                w.put_bytes(&guid.to_bytes_le());
            }
        }

        self.trustee.write_to(w);
        w.put_bytes(&coda);
        while w.len() - start < size {
            w.put_u8(0);
        }
        Ok(())
    }

    pub fn encode( &self ) -> Result<Vec<u8>> {
        let mut w = ByteWriter::new();
        self.encode_into(&mut w)?;
        Ok(w.into_vec())
    }

    /// Decodes one ACE from the front of `bytes`, returning it with the number of bytes used.
    ///
    /// # Errors
    /// The declared size must cover the type's fixed layout and must not run past `bytes`.
    /// For types without trailing data the size must equal the fixed layout exactly.
    pub fn decode( bytes: &[u8] ) -> Result<(Self, usize)> {
        let mut r = ByteReader::new(bytes);
        let raw_type = r.read_u8()?;
        let flags = AceFlags::from_bits_retain(r.read_u8()?);
        let size = r.read_u16_le()? as usize;
        let access_mask = ACCESS_MASK(r.read_u32_le()?);

        let ace_type = AceType::from_u8(raw_type)
            .ok_or_else(|| Error::invalid(format!("unknown ACE type 0x{:02x}", raw_type)))?;

        if size < ACE_FIXED_SIZE || size > bytes.len() {
            trace!(size, available = bytes.len(), "ACE size out of range");
            return Err(Error::invalid("ACE size out of range"));
        }

        let mut body = ByteReader::new(&bytes[ACE_FIXED_SIZE..size]);

        let object = if ace_type.is_object() {
            let object_flags = ObjectAceFlags::from_bits_retain(body.read_u32_le()?);
            let mut object = ObjectAceData::default();
            if object_flags.contains(ObjectAceFlags::OBJECT_TYPE_PRESENT) {
                object.object_type = Some(Uuid::from_bytes_le(body.read_array()?));
            }
            if object_flags.contains(ObjectAceFlags::INHERITED_OBJECT_TYPE_PRESENT) {
                object.inherited_object_type = Some(Uuid::from_bytes_le(body.read_array()?));
            }
            Some(object)
        } else {
            None
        };

        let trustee = SID::read_from(&mut body)?;
        let rest = body.rest();

        let coda = if ace_type.is_callback() {
            AceCoda::Conditions(rest.to_vec())
        } else if ace_type.is_resource() {
            AceCoda::Claim(ClaimSecurityAttribute::decode_relative(rest)?)
        } else {
            if rest.len() >= 4 || rest.iter().any(|b| *b != 0) {
                trace!(trailing = rest.len(), ?ace_type, "unexpected trailing ACE data");
                return Err(Error::invalid("ACE size does not match its content"));
            }
            AceCoda::None
        };

        let ace = Self {
            ace_type,
            flags,
            access_mask,
            object,
            trustee,
            coda,
        };
        Ok((ace, size))
    }

    //

    pub fn is_match_any_sid( &self, filter: &ACEFilter ) -> bool {
        if filter.never {
            return false;
        }

        if let Some(ace_type) = filter.ace_type {
            if self.ace_type != ace_type {
                return false;
            }
        }

        if !filter.flags_mask.is_empty() && self.flags & filter.flags_mask != filter.flags {
            return false;
        }

        if !filter.access_mask_mask.is_empty() && self.access_mask & filter.access_mask_mask != filter.access_mask {
            return false;
        }

        true
    }

    pub fn is_match( &self, sid: &SID, filter: &Option<ACEFilter> ) -> bool {
        if &self.trustee != sid {
            return false;
        }

        match filter {
            Some(filter) => self.is_match_any_sid(filter),
            None => true,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Selects ACEs by type, flags and access mask bits.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ACEFilter {
    pub never: bool,

    pub ace_type: Option<AceType>,

    pub flags: AceFlags,
    pub flags_mask: AceFlags,

    pub access_mask: ACCESS_MASK,
    pub access_mask_mask: ACCESS_MASK,
}

impl Default for ACEFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ACEFilter {
    /// Returns a filter that matches everything.
    #[inline]
    pub fn new() -> Self {
        Self {
            never: false,
            ace_type: None,
            flags: AceFlags::empty(),
            flags_mask: AceFlags::empty(),
            access_mask: ACCESS_MASK(0),
            access_mask_mask: ACCESS_MASK(0),
        }
    }

    #[inline]
    pub fn all() -> Self {
        Self::new()
    }

    #[inline]
    pub fn never() -> Self {
        Self::new().set_never()
    }

    //

    #[inline]
    pub fn set_never( mut self ) -> Self {
        self.never = true;
        self
    }

    #[inline]
    pub fn unset_never( mut self ) -> Self {
        self.never = false;
        self
    }

    //

    #[inline]
    pub fn set_ace_type( mut self, ace_type: AceType ) -> Self {
        self.ace_type = Some(ace_type);
        self
    }

    #[inline]
    pub fn unset_ace_type( mut self ) -> Self {
        self.ace_type = None;
        self
    }

    //

    #[inline]
    pub fn set_flags( mut self, flags: impl IntoAceFlags ) -> Self {
        self.flags = flags.into_ace_flags();
        self.flags_mask = self.flags;
        self
    }

    #[inline]
    pub fn set_flags_with_mask( mut self, flags: impl IntoAceFlags, mask: impl IntoAceFlags ) -> Self {
        self.flags_mask = mask.into_ace_flags();
        self.flags = flags.into_ace_flags() & self.flags_mask;
        self
    }

    #[inline]
    pub fn unset_flags( mut self ) -> Self {
        self.flags = AceFlags::empty();
        self.flags_mask = AceFlags::empty();
        self
    }

    //

    #[inline]
    pub fn set_access_mask( mut self, access_mask: impl IntoAccessMask ) -> Self {
        self.access_mask = access_mask.into_access_mask();
        self.access_mask_mask = self.access_mask;
        self
    }

    #[inline]
    pub fn set_access_mask_with_mask( mut self, access_mask: impl IntoAccessMask, mask: impl IntoAccessMask ) -> Self {
        self.access_mask_mask = mask.into_access_mask();
        self.access_mask = access_mask.into_access_mask() & self.access_mask_mask;
        self
    }

    #[inline]
    pub fn unset_access_mask( mut self ) -> Self {
        self.access_mask = ACCESS_MASK(0);
        self.access_mask_mask = ACCESS_MASK(0);
        self
    }

    //

    #[inline]
    pub fn set_inherited_flag( mut self, bit: bool ) -> Self {
        self.flags.set(AceFlags::INHERITED, bit);
        self.flags_mask |= AceFlags::INHERITED;
        self
    }
}

impl fmt::Debug for ACEFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ACEFilter")
            .field( "never", &self.never )
            .field( "ace_type", &self.ace_type )
            .field( "flags", &DebugUnpretty(AceFlagsRepresenter::<AceFlagsShortIdents>::new(self.flags)) )
            .field( "flags_mask", &DebugUnpretty(AceFlagsRepresenter::<AceFlagsShortIdents>::new(self.flags_mask)) )
            .field( "access_mask", &DebugUnpretty(AccessMaskRepresenter::<AccessRightsShortIdents>::new(self.access_mask)) )
            .field( "access_mask_mask", &DebugUnpretty(AccessMaskRepresenter::<AccessRightsShortIdents>::new(self.access_mask_mask)) )
            .finish()
    }
}
