//! Explicit bounds applied to untrusted binary and textual input

use bitflags::bitflags;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Maximum number of tokens in a conditional ACE program.
pub const CONDITIONAL_ACE_MAX_TOKENS: usize = 2000;

/// Maximum byte length of an encoded conditional ACE blob.
pub const CONDITIONAL_ACE_MAX_LENGTH: usize = 65535;

pub const MAX_SDDL_LENGTH: usize = 65535 * 4;

pub const MAX_COMPOSITE_DEPTH: usize = 8;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Bounds on the work any single parse, compile or evaluation may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_tokens: usize,
    pub max_program_length: usize,
    pub max_sddl_length: usize,
    pub max_composite_depth: usize,
    pub max_claim_values: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_tokens: CONDITIONAL_ACE_MAX_TOKENS,
            max_program_length: CONDITIONAL_ACE_MAX_LENGTH,
            max_sddl_length: MAX_SDDL_LENGTH,
            max_composite_depth: MAX_COMPOSITE_DEPTH,
            max_claim_values: CONDITIONAL_ACE_MAX_TOKENS,
        }
    }
}

impl Limits {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set_max_tokens( mut self, max_tokens: usize ) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[inline]
    pub fn set_max_program_length( mut self, max_program_length: usize ) -> Self {
        self.max_program_length = max_program_length;
        self
    }

    #[inline]
    pub fn set_max_sddl_length( mut self, max_sddl_length: usize ) -> Self {
        self.max_sddl_length = max_sddl_length;
        self
    }

    #[inline]
    pub fn set_max_composite_depth( mut self, max_composite_depth: usize ) -> Self {
        self.max_composite_depth = max_composite_depth;
        self
    }

    #[inline]
    pub fn set_max_claim_values( mut self, max_claim_values: usize ) -> Self {
        self.max_claim_values = max_claim_values;
        self
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

bitflags! {
    /// Options for compiling conditional expressions from SDDL.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AceConditionFlags: u32 {
        /// Accept `@Device.` attributes and `Device_Member_of` operators.
        const ALLOW_DEVICE = 0x01;
    }
}
