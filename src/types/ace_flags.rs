use core::{
    fmt,
    marker::PhantomData,
};
use bitflags::bitflags;

use crate::utils::DebugIdent;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

bitflags! {
    /// The `AceFlags` byte of an ACE header.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AceFlags: u8 {
        const OBJECT_INHERIT = 0x01;
        const CONTAINER_INHERIT = 0x02;
        const NO_PROPAGATE_INHERIT = 0x04;
        const INHERIT_ONLY = 0x08;
        const INHERITED = 0x10;
        const SUCCESSFUL_ACCESS = 0x40;
        const FAILED_ACCESS = 0x80;
    }
}

bitflags! {
    /// Flags of an object ACE telling which GUIDs follow.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ObjectAceFlags: u32 {
        const OBJECT_TYPE_PRESENT = 0x01;
        const INHERITED_OBJECT_TYPE_PRESENT = 0x02;
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub trait AceFlagsIdents {
    fn object_inherit() -> DebugIdent;
    fn container_inherit() -> DebugIdent;
    fn no_propagate_inherit() -> DebugIdent;
    fn inherit_only() -> DebugIdent;
    fn inherited() -> DebugIdent;
    fn successful_access_flag() -> DebugIdent;
    fn failed_access_flag() -> DebugIdent;
}

pub struct AceFlagsFullIdents {}

impl AceFlagsIdents for AceFlagsFullIdents {
    fn object_inherit() -> DebugIdent {
        DebugIdent("OBJECT_INHERIT")
    }

    fn container_inherit() -> DebugIdent {
        DebugIdent("CONTAINER_INHERIT")
    }

    fn no_propagate_inherit() -> DebugIdent {
        DebugIdent("NO_PROPAGATE_INHERIT")
    }

    fn inherit_only() -> DebugIdent {
        DebugIdent("INHERIT_ONLY")
    }

    fn inherited() -> DebugIdent {
        DebugIdent("INHERITED")
    }

    fn successful_access_flag() -> DebugIdent {
        DebugIdent("SUCCESSFUL_ACCESS")
    }

    fn failed_access_flag() -> DebugIdent {
        DebugIdent("FAILED_ACCESS")
    }
}

/// The two-letter SDDL spellings.
pub struct AceFlagsShortIdents {}

impl AceFlagsIdents for AceFlagsShortIdents {
    fn object_inherit() -> DebugIdent {
        DebugIdent("OI")
    }

    fn container_inherit() -> DebugIdent {
        DebugIdent("CI")
    }

    fn no_propagate_inherit() -> DebugIdent {
        DebugIdent("NP")
    }

    fn inherit_only() -> DebugIdent {
        DebugIdent("IO")
    }

    fn inherited() -> DebugIdent {
        DebugIdent("ID")
    }

    fn successful_access_flag() -> DebugIdent {
        DebugIdent("SA")
    }

    fn failed_access_flag() -> DebugIdent {
        DebugIdent("FA")
    }
}

impl AceFlags {
    /// Pairs every single flag with its identifier, in header bit order.
    pub fn idents<N: AceFlagsIdents>() -> [(AceFlags, DebugIdent); 7] {
        [
            (AceFlags::OBJECT_INHERIT, N::object_inherit()),
            (AceFlags::CONTAINER_INHERIT, N::container_inherit()),
            (AceFlags::NO_PROPAGATE_INHERIT, N::no_propagate_inherit()),
            (AceFlags::INHERIT_ONLY, N::inherit_only()),
            (AceFlags::INHERITED, N::inherited()),
            (AceFlags::SUCCESSFUL_ACCESS, N::successful_access_flag()),
            (AceFlags::FAILED_ACCESS, N::failed_access_flag()),
        ]
    }
}

pub struct AceFlagsRepresenter<N: AceFlagsIdents>{
    pub flags: AceFlags,
    _ph: PhantomData<N>,
}

impl<N: AceFlagsIdents> AceFlagsRepresenter<N> {
    pub fn new( flags: AceFlags ) -> Self {
        Self {
            flags,
            _ph: PhantomData
        }
    }
}

impl<N: AceFlagsIdents> fmt::Debug for AceFlagsRepresenter<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_tuple("AceFlags");

        for (flag, ident) in AceFlags::idents::<N>() {
            if self.flags.contains(flag) {
                f.field(&ident);
            }
        }

        f.finish()
    }
}

impl fmt::Debug for AceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        AceFlagsRepresenter::<AceFlagsShortIdents>::new(*self).fmt(f)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub trait IntoAceFlags {
    fn into_ace_flags( self ) -> AceFlags;
}

impl IntoAceFlags for AceFlags {
    #[inline]
    fn into_ace_flags( self ) -> AceFlags {
        self
    }
}

impl IntoAceFlags for u8 {
    #[inline]
    fn into_ace_flags( self ) -> AceFlags {
        AceFlags::from_bits_retain(self)
    }
}
