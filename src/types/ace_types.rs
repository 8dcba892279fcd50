use core::fmt;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// The `AceType` byte of an ACE header.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum AceType {
    AccessAllowed = 0x00,
    AccessDenied = 0x01,
    SystemAudit = 0x02,
    SystemAlarm = 0x03,
    AccessAllowedCompound = 0x04,
    AccessAllowedObject = 0x05,
    AccessDeniedObject = 0x06,
    SystemAuditObject = 0x07,
    SystemAlarmObject = 0x08,
    AccessAllowedCallback = 0x09,
    AccessDeniedCallback = 0x0A,
    AccessAllowedCallbackObject = 0x0B,
    AccessDeniedCallbackObject = 0x0C,
    SystemAuditCallback = 0x0D,
    SystemAlarmCallback = 0x0E,
    SystemAuditCallbackObject = 0x0F,
    SystemAlarmCallbackObject = 0x10,
    SystemMandatoryLabel = 0x11,
    SystemResourceAttribute = 0x12,
    SystemScopedPolicyId = 0x13,
}

impl AceType {
    pub const ALL: [AceType; 20] = [
        AceType::AccessAllowed,
        AceType::AccessDenied,
        AceType::SystemAudit,
        AceType::SystemAlarm,
        AceType::AccessAllowedCompound,
        AceType::AccessAllowedObject,
        AceType::AccessDeniedObject,
        AceType::SystemAuditObject,
        AceType::SystemAlarmObject,
        AceType::AccessAllowedCallback,
        AceType::AccessDeniedCallback,
        AceType::AccessAllowedCallbackObject,
        AceType::AccessDeniedCallbackObject,
        AceType::SystemAuditCallback,
        AceType::SystemAlarmCallback,
        AceType::SystemAuditCallbackObject,
        AceType::SystemAlarmCallbackObject,
        AceType::SystemMandatoryLabel,
        AceType::SystemResourceAttribute,
        AceType::SystemScopedPolicyId,
    ];

    pub fn from_u8( v: u8 ) -> Option<Self> {
        Self::ALL.get(v as usize).copied()
    }

    #[inline]
    pub fn as_u8( self ) -> u8 {
        self as u8
    }

    /// Object ACEs carry object-type GUIDs before the trustee.
    pub fn is_object( self ) -> bool {
        matches!(
            self,
            AceType::AccessAllowedObject
                | AceType::AccessDeniedObject
                | AceType::SystemAuditObject
                | AceType::SystemAlarmObject
                | AceType::AccessAllowedCallbackObject
                | AceType::AccessDeniedCallbackObject
                | AceType::SystemAuditCallbackObject
        )
    }

    /// Callback ACEs carry a conditional expression after the trustee.
    pub fn is_callback( self ) -> bool {
        matches!(
            self,
            AceType::AccessAllowedCallback
                | AceType::AccessDeniedCallback
                | AceType::AccessAllowedCallbackObject
                | AceType::AccessDeniedCallbackObject
                | AceType::SystemAuditCallback
                | AceType::SystemAuditCallbackObject
        )
    }

    #[inline]
    pub fn is_resource( self ) -> bool {
        self == AceType::SystemResourceAttribute
    }

    #[inline]
    pub fn has_extra_blob( self ) -> bool {
        self.is_callback() || self.is_resource()
    }

    pub fn is_deny( self ) -> bool {
        matches!(
            self,
            AceType::AccessDenied
                | AceType::AccessDeniedObject
                | AceType::AccessDeniedCallback
                | AceType::AccessDeniedCallbackObject
        )
    }

    pub fn is_allow( self ) -> bool {
        matches!(
            self,
            AceType::AccessAllowed
                | AceType::AccessAllowedObject
                | AceType::AccessAllowedCallback
                | AceType::AccessAllowedCallbackObject
        )
    }
}

impl fmt::Debug for AceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AceType::AccessAllowed => "AccessAllowed",
            AceType::AccessDenied => "AccessDenied",
            AceType::SystemAudit => "SystemAudit",
            AceType::SystemAlarm => "SystemAlarm",
            AceType::AccessAllowedCompound => "AccessAllowedCompound",
            AceType::AccessAllowedObject => "AccessAllowedObject",
            AceType::AccessDeniedObject => "AccessDeniedObject",
            AceType::SystemAuditObject => "SystemAuditObject",
            AceType::SystemAlarmObject => "SystemAlarmObject",
            AceType::AccessAllowedCallback => "AccessAllowedCallback",
            AceType::AccessDeniedCallback => "AccessDeniedCallback",
            AceType::AccessAllowedCallbackObject => "AccessAllowedCallbackObject",
            AceType::AccessDeniedCallbackObject => "AccessDeniedCallbackObject",
            AceType::SystemAuditCallback => "SystemAuditCallback",
            AceType::SystemAlarmCallback => "SystemAlarmCallback",
            AceType::SystemAuditCallbackObject => "SystemAuditCallbackObject",
            AceType::SystemAlarmCallbackObject => "SystemAlarmCallbackObject",
            AceType::SystemMandatoryLabel => "SystemMandatoryLabel",
            AceType::SystemResourceAttribute => "SystemResourceAttribute",
            AceType::SystemScopedPolicyId => "SystemScopedPolicyId",
        };
        f.write_str(name)
    }
}
