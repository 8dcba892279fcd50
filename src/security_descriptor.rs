//! Contains the security descriptor and its self-relative binary form

use core::{
    cmp::Ordering,
    fmt,
};
use tracing::trace;

use crate::{
    acl::ACL,
    acl_kind::{DACL, SACL},
    claims::{compare_strings_nocase, ClaimSecurityAttribute},
    error::{Error, Result},
    sid::SID,
    types::*,
    utils::{ByteReader, ByteWriter},
};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub const SECURITY_DESCRIPTOR_REVISION: u8 = 1;
pub const SECURITY_DESCRIPTOR_HEADER_SIZE: usize = 20;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Owner, group, DACL and SACL of an object.
///
/// # Remarks
/// `DACL_PRESENT` with `dacl == None` is a null DACL, which grants everyone everything.
/// A missing `DACL_PRESENT` means no DACL was supplied at all.
#[derive(Clone, PartialEq, Eq)]
pub struct SecurityDescriptor {
    pub revision: u8,
    pub control: SecurityDescriptorControl,
    pub owner: Option<SID>,
    pub group: Option<SID>,
    pub dacl: Option<ACL<DACL>>,
    pub sacl: Option<ACL<SACL>>,
}

impl fmt::Debug for SecurityDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityDescriptor")
            .field( "control", &self.control )
            .field( "owner", &self.owner )
            .field( "group", &self.group )
            .field( "dacl", &self.dacl )
            .field( "sacl", &self.sacl )
            .finish()
    }
}

impl Default for SecurityDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityDescriptor {
    #[inline]
    pub fn new() -> Self {
        Self {
            revision: SECURITY_DESCRIPTOR_REVISION,
            control: SecurityDescriptorControl::empty(),
            owner: None,
            group: None,
            dacl: None,
            sacl: None,
        }
    }

    #[inline]
    pub fn set_owner( mut self, owner: SID ) -> Self {
        self.owner = Some(owner);
        self
    }

    #[inline]
    pub fn set_group( mut self, group: SID ) -> Self {
        self.group = Some(group);
        self
    }

    /// Sets the DACL and `DACL_PRESENT`. `None` makes a null DACL.
    #[inline]
    pub fn set_dacl( mut self, dacl: Option<ACL<DACL>> ) -> Self {
        self.dacl = dacl;
        self.control |= SecurityDescriptorControl::DACL_PRESENT;
        self
    }

    #[inline]
    pub fn set_sacl( mut self, sacl: Option<ACL<SACL>> ) -> Self {
        self.sacl = sacl;
        self.control |= SecurityDescriptorControl::SACL_PRESENT;
        self
    }

    //

    pub fn dacl_is_protected( &self ) -> bool {
        self.control.contains(SecurityDescriptorControl::DACL_PROTECTED)
    }

    pub fn sacl_is_protected( &self ) -> bool {
        self.control.contains(SecurityDescriptorControl::SACL_PROTECTED)
    }

    /// Claims carried by the resource attribute ACEs of the SACL.
    pub fn resource_attributes( &self ) -> impl Iterator<Item = &ClaimSecurityAttribute> + '_ {
        self.sacl
            .iter()
            .flat_map(|sacl| sacl.iter())
            .filter(|ace| ace.ace_type == AceType::SystemResourceAttribute)
            .filter_map(|ace| ace.claim())
    }

    /// Looks up a resource attribute by case-insensitive name.
    pub fn find_resource_attribute( &self, name: &str ) -> Option<&ClaimSecurityAttribute> {
        self.resource_attributes()
            .find(|claim| compare_strings_nocase(&claim.name, name) == Ordering::Equal)
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

    /// Encodes the self-relative form: header, then SACL, DACL, owner and group.
    pub fn encode( &self ) -> Result<Vec<u8>> {
        let mut w = ByteWriter::new();
        w.put_u8(self.revision);
        w.put_u8(0);
        w.put_u16_le((self.control | SecurityDescriptorControl::SELF_RELATIVE).bits());
        for _ in 0..4 {
            w.put_u32_le(0);
        }

        if let Some(sacl) = &self.sacl {
            w.set_u32_at(12, w.len() as u32);
            sacl.encode_into(&mut w)?;
        }
        if let Some(dacl) = &self.dacl {
            w.set_u32_at(16, w.len() as u32);
            dacl.encode_into(&mut w)?;
        }
        if let Some(owner) = &self.owner {
            w.set_u32_at(4, w.len() as u32);
            owner.write_to(&mut w);
        }
        if let Some(group) = &self.group {
            w.set_u32_at(8, w.len() as u32);
            group.write_to(&mut w);
        }
        Ok(w.into_vec())
    }

    pub fn decode( bytes: &[u8] ) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        let revision = r.read_u8()?;
        let _sbz1 = r.read_u8()?;
        let control = SecurityDescriptorControl::from_bits_retain(r.read_u16_le()?);
        let owner_offset = r.read_u32_le()? as usize;
        let group_offset = r.read_u32_le()? as usize;
        let sacl_offset = r.read_u32_le()? as usize;
        let dacl_offset = r.read_u32_le()? as usize;

        if revision != SECURITY_DESCRIPTOR_REVISION {
            return Err(Error::invalid(format!("unsupported security descriptor revision {}", revision)));
        }
        if !control.contains(SecurityDescriptorControl::SELF_RELATIVE) {
            trace!(?control, "security descriptor is not self-relative");
            return Err(Error::invalid("security descriptor is not self-relative"));
        }

        let section = |offset: usize| section_at(bytes, offset);

        let owner = section(owner_offset)?
            .map(|b| SID::read_from(&mut ByteReader::new(b)))
            .transpose()?;
        let group = section(group_offset)?
            .map(|b| SID::read_from(&mut ByteReader::new(b)))
            .transpose()?;
        let sacl = section(sacl_offset)?
            .map(|b| ACL::<SACL>::decode(b).map(|(acl, _)| acl))
            .transpose()?;
        let dacl = section(dacl_offset)?
            .map(|b| ACL::<DACL>::decode(b).map(|(acl, _)| acl))
            .transpose()?;

        Ok(Self {
            revision,
            control: control - SecurityDescriptorControl::SELF_RELATIVE,
            owner,
            group,
            dacl,
            sacl,
        })
    }
}

fn section_at( bytes: &[u8], offset: usize ) -> Result<Option<&[u8]>> {
    match offset {
        0 => Ok(None),
        o if o < SECURITY_DESCRIPTOR_HEADER_SIZE || o >= bytes.len() => {
            Err(Error::invalid("security descriptor offset out of range"))
        },
        o => Ok(Some(&bytes[o..])),
    }
}
