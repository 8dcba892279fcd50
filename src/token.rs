//! Contains the evaluating principal: its SIDs and claims

use crate::{
    claims::{compare_strings_nocase, ClaimSecurityAttribute},
    sid::SID,
};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// The identity a conditional expression is evaluated for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityToken {
    pub sids: Vec<SID>,
    pub device_sids: Vec<SID>,
    pub local_claims: Vec<ClaimSecurityAttribute>,
    pub user_claims: Vec<ClaimSecurityAttribute>,
    pub device_claims: Vec<ClaimSecurityAttribute>,
}

impl SecurityToken {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_sid( mut self, sid: SID ) -> Self {
        self.sids.push(sid);
        self
    }

    #[inline]
    pub fn add_device_sid( mut self, sid: SID ) -> Self {
        self.device_sids.push(sid);
        self
    }

    #[inline]
    pub fn add_local_claim( mut self, claim: ClaimSecurityAttribute ) -> Self {
        self.local_claims.push(claim);
        self
    }

    #[inline]
    pub fn add_user_claim( mut self, claim: ClaimSecurityAttribute ) -> Self {
        self.user_claims.push(claim);
        self
    }

    #[inline]
    pub fn add_device_claim( mut self, claim: ClaimSecurityAttribute ) -> Self {
        self.device_claims.push(claim);
        self
    }

    pub fn has_sid( &self, sid: &SID ) -> bool {
        self.sids.iter().any(|s| s == sid)
    }

    pub fn has_device_sid( &self, sid: &SID ) -> bool {
        self.device_sids.iter().any(|s| s == sid)
    }

    /// Later claims shadow earlier claims with the same name.
    pub(crate) fn find_claim<'a>( claims: &'a [ClaimSecurityAttribute], name: &str ) -> Option<&'a ClaimSecurityAttribute> {
        claims
            .iter()
            .rev()
            .find(|c| compare_strings_nocase(&c.name, name).is_eq())
    }
}
