use core::{ops, fmt};
use std::marker::PhantomData;

use crate::utils::DebugIdent;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[allow(non_camel_case_types)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct ACCESS_MASK(pub u32);

impl ACCESS_MASK {
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}
impl ops::BitOr for ACCESS_MASK {
    type Output = Self;
    fn bitor(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}
impl ops::BitAnd for ACCESS_MASK {
    type Output = Self;
    fn bitand(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }
}
impl ops::BitOrAssign for ACCESS_MASK {
    fn bitor_assign(&mut self, other: Self) {
        self.0.bitor_assign(other.0)
    }
}
impl ops::BitAndAssign for ACCESS_MASK {
    fn bitand_assign(&mut self, other: Self) {
        self.0.bitand_assign(other.0)
    }
}
impl ops::Not for ACCESS_MASK {
    type Output = Self;
    fn not(self) -> Self {
        Self(self.0.not())
    }
}

impl fmt::Debug for ACCESS_MASK {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        AccessMaskRepresenter::<AccessRightsShortIdents>::new(*self).fmt(f)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub mod rights {
    use super::ACCESS_MASK;

    pub const GENERIC_ALL: ACCESS_MASK = ACCESS_MASK(0x1000_0000);
    pub const GENERIC_EXECUTE: ACCESS_MASK = ACCESS_MASK(0x2000_0000);
    pub const GENERIC_WRITE: ACCESS_MASK = ACCESS_MASK(0x4000_0000);
    pub const GENERIC_READ: ACCESS_MASK = ACCESS_MASK(0x8000_0000);

    pub const DELETE: ACCESS_MASK = ACCESS_MASK(0x0001_0000);
    pub const READ_CONTROL: ACCESS_MASK = ACCESS_MASK(0x0002_0000);
    pub const WRITE_DAC: ACCESS_MASK = ACCESS_MASK(0x0004_0000);
    pub const WRITE_OWNER: ACCESS_MASK = ACCESS_MASK(0x0008_0000);
    pub const SYNCHRONIZE: ACCESS_MASK = ACCESS_MASK(0x0010_0000);
    pub const ACCESS_SYSTEM_SECURITY: ACCESS_MASK = ACCESS_MASK(0x0100_0000);

    pub const ADS_CREATE_CHILD: ACCESS_MASK = ACCESS_MASK(0x0001);
    pub const ADS_DELETE_CHILD: ACCESS_MASK = ACCESS_MASK(0x0002);
    pub const ADS_LIST: ACCESS_MASK = ACCESS_MASK(0x0004);
    pub const ADS_SELF_WRITE: ACCESS_MASK = ACCESS_MASK(0x0008);
    pub const ADS_READ_PROP: ACCESS_MASK = ACCESS_MASK(0x0010);
    pub const ADS_WRITE_PROP: ACCESS_MASK = ACCESS_MASK(0x0020);
    pub const ADS_DELETE_TREE: ACCESS_MASK = ACCESS_MASK(0x0040);
    pub const ADS_LIST_OBJECT: ACCESS_MASK = ACCESS_MASK(0x0080);
    pub const ADS_CONTROL_ACCESS: ACCESS_MASK = ACCESS_MASK(0x0100);

    pub const FILE_ALL_ACCESS: ACCESS_MASK = ACCESS_MASK(0x001F_01FF);
    pub const FILE_GENERIC_READ: ACCESS_MASK = ACCESS_MASK(0x0012_0089);
    pub const FILE_GENERIC_WRITE: ACCESS_MASK = ACCESS_MASK(0x0012_0116);
    pub const FILE_GENERIC_EXECUTE: ACCESS_MASK = ACCESS_MASK(0x0012_00A0);

    pub const KEY_ALL_ACCESS: ACCESS_MASK = ACCESS_MASK(0x000F_003F);
    pub const KEY_READ: ACCESS_MASK = ACCESS_MASK(0x0002_0019);
    pub const KEY_WRITE: ACCESS_MASK = ACCESS_MASK(0x0002_0006);
    pub const KEY_EXECUTE: ACCESS_MASK = ACCESS_MASK(0x0002_0019);
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub trait IntoAccessMask {
    fn into_access_mask( self ) -> ACCESS_MASK;
}

impl IntoAccessMask for ACCESS_MASK {
    #[inline]
    fn into_access_mask( self ) -> ACCESS_MASK {
        self
    }
}

impl IntoAccessMask for u32 {
    #[inline]
    fn into_access_mask( self ) -> ACCESS_MASK {
        ACCESS_MASK(self)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Names single access mask bits. Unnamed bits print as hex.
pub trait AccessMaskIdents {
    fn bit( bit: u32 ) -> Option<DebugIdent>;
}

pub struct AccessRightsFullIdents {}

impl AccessMaskIdents for AccessRightsFullIdents {
    fn bit( bit: u32 ) -> Option<DebugIdent> {
        let ident = match bit {
            0x0000_0001 => "CREATE_CHILD",
            0x0000_0002 => "DELETE_CHILD",
            0x0000_0004 => "LIST_CHILDREN",
            0x0000_0008 => "SELF_WRITE",
            0x0000_0010 => "READ_PROPERTY",
            0x0000_0020 => "WRITE_PROPERTY",
            0x0000_0040 => "DELETE_TREE",
            0x0000_0080 => "LIST_OBJECT",
            0x0000_0100 => "CONTROL_ACCESS",
            0x0001_0000 => "DELETE",
            0x0002_0000 => "READ_CONTROL",
            0x0004_0000 => "WRITE_DAC",
            0x0008_0000 => "WRITE_OWNER",
            0x0010_0000 => "SYNCHRONIZE",
            0x0100_0000 => "ACCESS_SYSTEM_SECURITY",
            0x1000_0000 => "GENERIC_ALL",
            0x2000_0000 => "GENERIC_EXECUTE",
            0x4000_0000 => "GENERIC_WRITE",
            0x8000_0000 => "GENERIC_READ",
            _ => return None,
        };
        Some(DebugIdent(ident))
    }
}

/// The two-letter SDDL spellings of single rights.
pub struct AccessRightsShortIdents {}

impl AccessMaskIdents for AccessRightsShortIdents {
    fn bit( bit: u32 ) -> Option<DebugIdent> {
        let ident = match bit {
            0x0000_0001 => "CC",
            0x0000_0002 => "DC",
            0x0000_0004 => "LC",
            0x0000_0008 => "SW",
            0x0000_0010 => "RP",
            0x0000_0020 => "WP",
            0x0000_0040 => "DT",
            0x0000_0080 => "LO",
            0x0000_0100 => "CR",
            0x0001_0000 => "SD",
            0x0002_0000 => "RC",
            0x0004_0000 => "WD",
            0x0008_0000 => "WO",
            0x1000_0000 => "GA",
            0x2000_0000 => "GX",
            0x4000_0000 => "GW",
            0x8000_0000 => "GR",
            _ => return None,
        };
        Some(DebugIdent(ident))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[repr(transparent)]
pub struct AccessMaskRepresenter<N: AccessMaskIdents>{
    pub access_mask: ACCESS_MASK,
    pub _ph: PhantomData<N>,
}

impl<N: AccessMaskIdents> AccessMaskRepresenter<N> {
    pub fn new( access_mask: ACCESS_MASK ) -> Self {
        Self {
            access_mask,
            _ph: PhantomData,
        }
    }
}

impl<N: AccessMaskIdents> fmt::Debug for AccessMaskRepresenter<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> fmt::Result {
        let mut t = f.debug_tuple("ACCESS_MASK");
        let mut unnamed = 0u32;

        for shift in 0..32 {
            let bit = 1u32 << shift;
            if self.access_mask.0 & bit == 0 {
                continue;
            }
            match N::bit(bit) {
                Some(ident) => { t.field(&ident); },
                None => unnamed |= bit,
            }
        }

        if unnamed != 0 {
            t.field(&format_args!("0x{:x}", unnamed));
        }

        t.finish()
    }
}
