use core::{
    fmt,
    hash,
};

use crate::types::SecurityDescriptorControl;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DACL {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SACL {}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Distinguishes the discretionary and the system list, which share a layout but not their control bits.
#[allow(private_bounds)]
pub trait ACLKind: fmt::Debug + PartialEq + Eq + PartialOrd + Ord + hash::Hash + private::Sealed {
    /// Section letter in SDDL (`D` or `S`)
    const SDDL_SECTION: char;

    const PRESENT: SecurityDescriptorControl;
    const PROTECTED: SecurityDescriptorControl;
    const AUTO_INHERITED: SecurityDescriptorControl;
    const AUTO_INHERIT_REQ: SecurityDescriptorControl;
}

impl ACLKind for DACL {
    const SDDL_SECTION: char = 'D';

    const PRESENT: SecurityDescriptorControl = SecurityDescriptorControl::DACL_PRESENT;
    const PROTECTED: SecurityDescriptorControl = SecurityDescriptorControl::DACL_PROTECTED;
    const AUTO_INHERITED: SecurityDescriptorControl = SecurityDescriptorControl::DACL_AUTO_INHERITED;
    const AUTO_INHERIT_REQ: SecurityDescriptorControl = SecurityDescriptorControl::DACL_AUTO_INHERIT_REQ;
}

impl ACLKind for SACL {
    const SDDL_SECTION: char = 'S';

    const PRESENT: SecurityDescriptorControl = SecurityDescriptorControl::SACL_PRESENT;
    const PROTECTED: SecurityDescriptorControl = SecurityDescriptorControl::SACL_PROTECTED;
    const AUTO_INHERITED: SecurityDescriptorControl = SecurityDescriptorControl::SACL_AUTO_INHERITED;
    const AUTO_INHERIT_REQ: SecurityDescriptorControl = SecurityDescriptorControl::SACL_AUTO_INHERIT_REQ;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[allow(private_bounds)]
pub trait IsACLKind<K: ACLKind>: ACLKind {}

impl IsACLKind<DACL> for DACL {}
impl IsACLKind<SACL> for SACL {}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

impl private::Sealed for DACL {}
impl private::Sealed for SACL {}

mod private {
    pub(crate) trait Sealed {}
}
