mod access_rights;
mod ace_flags;
mod ace_types;
mod control;

pub use access_rights::{
    rights, AccessMaskIdents, AccessMaskRepresenter, AccessRightsFullIdents,
    AccessRightsShortIdents, IntoAccessMask, ACCESS_MASK,
};
pub use ace_flags::{
    AceFlags, AceFlagsFullIdents, AceFlagsIdents, AceFlagsRepresenter, AceFlagsShortIdents,
    IntoAceFlags, ObjectAceFlags,
};
pub use ace_types::AceType;
pub use control::SecurityDescriptorControl;
