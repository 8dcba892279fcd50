//! `windows-sddl` reads and writes Windows security descriptors without calling into Windows.
//!
//! It covers the SDDL text form, the self-relative binary form of ACEs, ACLs and descriptors,
//! conditional ACE expressions (compiling, rendering and evaluating them), resource attribute
//! claims, and canonical DACL ordering.

mod ace;
mod acl;
mod acl_kind;
mod claims;
mod conditional_ace;
mod error;
mod limits;
mod sddl;
mod security_descriptor;
mod sid;
mod token;
mod types;
mod utils;

pub use ace::{
    init_sec_ace, sec_ace_callback, sec_ace_has_extra_blob, sec_ace_object, sec_ace_resource, ACEFilter, AceCoda,
    ObjectAceData, SecurityAce,
};
pub use acl::{dacl_sort_into_canonical_order, is_canonical_order, raw_entries, AceIterator, ACL};
pub use acl_kind::{ACLKind, DACL, SACL};
pub use claims::{ClaimFlags, ClaimSecurityAttribute, ClaimValueType, ClaimValues};
pub use conditional_ace::*;
pub use error::{Error, ErrorKind, Result, SddlDecodeError};
pub use limits::{AceConditionFlags, Limits};
pub use sddl::{
    sddl_decode, sddl_decode_ace, sddl_decode_err_msg, sddl_decode_sid, sddl_decode_with_limits, sddl_encode,
    sddl_encode_ace, sddl_encode_sid,
};
pub use security_descriptor::SecurityDescriptor;
pub use sid::SID;
pub use token::SecurityToken;
pub use types::{rights, AceFlags, AceType, IntoAccessMask, IntoAceFlags, ObjectAceFlags, SecurityDescriptorControl, ACCESS_MASK};

pub mod helper {
    pub use crate::{
        types::{
            AccessMaskIdents, AccessMaskRepresenter, AccessRightsFullIdents, AccessRightsShortIdents, AceFlagsFullIdents,
            AceFlagsIdents, AceFlagsRepresenter, AceFlagsShortIdents,
        },
        utils::{DebugIdent, DebugUnpretty},
    };
}

pub mod lowlevel {
    pub use crate::{
        ace::{ACE_FIXED_SIZE, ACE_HEADER_SIZE, MAX_ACE_SIZE},
        acl::{ACL_HEADER_SIZE, ACL_REVISION, ACL_REVISION_DS, MAX_ACL_SIZE},
        claims::CLAIM_MAX_OCTET_LENGTH,
        limits::{CONDITIONAL_ACE_MAX_LENGTH, CONDITIONAL_ACE_MAX_TOKENS, MAX_COMPOSITE_DEPTH, MAX_SDDL_LENGTH},
        security_descriptor::{SECURITY_DESCRIPTOR_HEADER_SIZE, SECURITY_DESCRIPTOR_REVISION},
        sid::{SID_HEADER_SIZE, SID_MAX_SUB_AUTHORITIES, SID_REVISION},
    };
}

pub use ::fallible_iterator;

#[cfg(test)]
mod tests;
