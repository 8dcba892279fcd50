use core::fmt;

use crate::{
    error::{Error, Result},
    sid::SID,
};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Every encoded conditional expression starts with these bytes.
pub const CONDITIONAL_ACE_MAGIC: [u8; 4] = *b"artx";

pub(crate) mod opcode {
    pub const PADDING: u8 = 0x00;

    pub const INT8: u8 = 0x01;
    pub const INT16: u8 = 0x02;
    pub const INT32: u8 = 0x03;
    pub const INT64: u8 = 0x04;
    pub const UNICODE: u8 = 0x10;
    pub const OCTET_STRING: u8 = 0x18;
    pub const COMPOSITE: u8 = 0x50;
    pub const SID: u8 = 0x51;

    pub const LOCAL_ATTRIBUTE: u8 = 0xf8;
    pub const USER_ATTRIBUTE: u8 = 0xf9;
    pub const RESOURCE_ATTRIBUTE: u8 = 0xfa;
    pub const DEVICE_ATTRIBUTE: u8 = 0xfb;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IntSign {
    Positive = 1,
    Negative = 2,
    None = 3,
}

impl IntSign {
    pub fn from_u8( v: u8 ) -> Option<Self> {
        match v {
            1 => Some(IntSign::Positive),
            2 => Some(IntSign::Negative),
            3 => Some(IntSign::None),
            _ => None,
        }
    }

    pub(crate) fn debug_char( self ) -> char {
        match self {
            IntSign::Positive => '+',
            IntSign::Negative => '-',
            IntSign::None => '_',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IntBase {
    Octal = 1,
    Decimal = 2,
    Hex = 3,
}

impl IntBase {
    pub fn from_u8( v: u8 ) -> Option<Self> {
        match v {
            1 => Some(IntBase::Octal),
            2 => Some(IntBase::Decimal),
            3 => Some(IntBase::Hex),
            _ => None,
        }
    }

    pub(crate) fn debug_char( self ) -> char {
        match self {
            IntBase::Octal => 'o',
            IntBase::Decimal => 'd',
            IntBase::Hex => 'h',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    Int8,
    Int16,
    Int32,
    Int64,
}

impl IntWidth {
    pub fn opcode( self ) -> u8 {
        match self {
            IntWidth::Int8 => opcode::INT8,
            IntWidth::Int16 => opcode::INT16,
            IntWidth::Int32 => opcode::INT32,
            IntWidth::Int64 => opcode::INT64,
        }
    }

    pub fn range( self ) -> (i64, i64) {
        match self {
            IntWidth::Int8 => (i8::MIN as i64, i8::MAX as i64),
            IntWidth::Int16 => (i16::MIN as i64, i16::MAX as i64),
            IntWidth::Int32 => (i32::MIN as i64, i32::MAX as i64),
            IntWidth::Int64 => (i64::MIN, i64::MAX),
        }
    }
}

/// An integer literal. Sign and base only record how the literal was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntLiteral {
    pub value: i64,
    pub width: IntWidth,
    pub sign: IntSign,
    pub base: IntBase,
}

impl IntLiteral {
    /// A 64-bit decimal literal written without a sign.
    #[inline]
    pub fn new( value: i64 ) -> Self {
        Self {
            value,
            width: IntWidth::Int64,
            sign: IntSign::None,
            base: IntBase::Decimal,
        }
    }

    #[inline]
    pub fn set_sign( mut self, sign: IntSign ) -> Self {
        self.sign = sign;
        self
    }

    #[inline]
    pub fn set_base( mut self, base: IntBase ) -> Self {
        self.base = base;
        self
    }

    #[inline]
    pub fn set_width( mut self, width: IntWidth ) -> Self {
        self.width = width;
        self
    }

    pub fn check_range( &self ) -> Result<()> {
        let (min, max) = self.width.range();
        if self.value < min || self.value > max {
            return Err(Error::invalid(format!("integer {} out of range for {:?}", self.value, self.width)));
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Int(IntLiteral),
    Unicode(String),
    OctetString(Vec<u8>),
    Sid(SID),
    Composite(Vec<Literal>),
}

impl Literal {
    pub fn opcode( &self ) -> u8 {
        match self {
            Literal::Int(i) => i.width.opcode(),
            Literal::Unicode(_) => opcode::UNICODE,
            Literal::OctetString(_) => opcode::OCTET_STRING,
            Literal::Sid(_) => opcode::SID,
            Literal::Composite(_) => opcode::COMPOSITE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeClass {
    Local,
    User,
    Resource,
    Device,
}

impl AttributeClass {
    pub fn opcode( self ) -> u8 {
        match self {
            AttributeClass::Local => opcode::LOCAL_ATTRIBUTE,
            AttributeClass::User => opcode::USER_ATTRIBUTE,
            AttributeClass::Resource => opcode::RESOURCE_ATTRIBUTE,
            AttributeClass::Device => opcode::DEVICE_ATTRIBUTE,
        }
    }

    pub fn from_opcode( op: u8 ) -> Option<Self> {
        match op {
            opcode::LOCAL_ATTRIBUTE => Some(AttributeClass::Local),
            opcode::USER_ATTRIBUTE => Some(AttributeClass::User),
            opcode::RESOURCE_ATTRIBUTE => Some(AttributeClass::Resource),
            opcode::DEVICE_ATTRIBUTE => Some(AttributeClass::Device),
            _ => None,
        }
    }

    /// Prefix following `@` in SDDL. Local attributes are written bare.
    pub fn sddl_prefix( self ) -> &'static str {
        match self {
            AttributeClass::Local => "",
            AttributeClass::User => "USER.",
            AttributeClass::Resource => "RESOURCE.",
            AttributeClass::Device => "DEVICE.",
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operator {
    MemberOf = 0x89,
    DeviceMemberOf = 0x8a,
    MemberOfAny = 0x8b,
    DeviceMemberOfAny = 0x8c,
    NotMemberOf = 0x90,
    NotDeviceMemberOf = 0x91,
    NotMemberOfAny = 0x92,
    NotDeviceMemberOfAny = 0x93,

    Equal = 0x80,
    NotEqual = 0x81,
    LessThan = 0x82,
    LessOrEqual = 0x83,
    GreaterThan = 0x84,
    GreaterOrEqual = 0x85,

    Contains = 0x86,
    AnyOf = 0x88,
    NotContains = 0x8e,
    NotAnyOf = 0x8f,

    Exists = 0x87,
    NotExists = 0x8d,

    And = 0xa0,
    Or = 0xa1,
    Not = 0xa2,
}

impl Operator {
    pub const ALL: [Operator; 23] = [
        Operator::MemberOf,
        Operator::DeviceMemberOf,
        Operator::MemberOfAny,
        Operator::DeviceMemberOfAny,
        Operator::NotMemberOf,
        Operator::NotDeviceMemberOf,
        Operator::NotMemberOfAny,
        Operator::NotDeviceMemberOfAny,
        Operator::Equal,
        Operator::NotEqual,
        Operator::LessThan,
        Operator::LessOrEqual,
        Operator::GreaterThan,
        Operator::GreaterOrEqual,
        Operator::Contains,
        Operator::AnyOf,
        Operator::NotContains,
        Operator::NotAnyOf,
        Operator::Exists,
        Operator::NotExists,
        Operator::And,
        Operator::Or,
        Operator::Not,
    ];

    #[inline]
    pub fn opcode( self ) -> u8 {
        self as u8
    }

    pub fn from_opcode( op: u8 ) -> Option<Self> {
        Self::ALL.iter().copied().find(|o| o.opcode() == op)
    }

    pub fn sddl_name( self ) -> &'static str {
        match self {
            Operator::MemberOf => "Member_of",
            Operator::DeviceMemberOf => "Device_Member_of",
            Operator::MemberOfAny => "Member_of_any",
            Operator::DeviceMemberOfAny => "Device_Member_of_Any",
            Operator::NotMemberOf => "Not_Member_of",
            Operator::NotDeviceMemberOf => "Not_Device_Member_of",
            Operator::NotMemberOfAny => "Not_Member_of_Any",
            Operator::NotDeviceMemberOfAny => "Not_Device_Member_of_Any",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::LessOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::Contains => "Contains",
            Operator::AnyOf => "Any_of",
            Operator::NotContains => "Not_Contains",
            Operator::NotAnyOf => "Not_Any_of",
            Operator::Exists => "Exists",
            Operator::NotExists => "Not_Exists",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Not => "!",
        }
    }

    /// Number of operands popped from the stack.
    pub fn arity( self ) -> usize {
        if self.is_member_of() || matches!(self, Operator::Not | Operator::Exists | Operator::NotExists) {
            1
        } else {
            2
        }
    }

    pub fn is_member_of( self ) -> bool {
        matches!(
            self,
            Operator::MemberOf
                | Operator::DeviceMemberOf
                | Operator::MemberOfAny
                | Operator::DeviceMemberOfAny
                | Operator::NotMemberOf
                | Operator::NotDeviceMemberOf
                | Operator::NotMemberOfAny
                | Operator::NotDeviceMemberOfAny
        )
    }

    pub fn is_device( self ) -> bool {
        matches!(
            self,
            Operator::DeviceMemberOf
                | Operator::DeviceMemberOfAny
                | Operator::NotDeviceMemberOf
                | Operator::NotDeviceMemberOfAny
        )
    }

    pub fn is_relational( self ) -> bool {
        matches!(
            self,
            Operator::Equal
                | Operator::NotEqual
                | Operator::LessThan
                | Operator::LessOrEqual
                | Operator::GreaterThan
                | Operator::GreaterOrEqual
        )
    }

    pub fn is_contains( self ) -> bool {
        matches!(self, Operator::Contains | Operator::AnyOf | Operator::NotContains | Operator::NotAnyOf)
    }

    pub fn is_logic( self ) -> bool {
        matches!(self, Operator::And | Operator::Or | Operator::Not)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sddl_name())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConditionalAceToken {
    Literal(Literal),
    Attribute {
        class: AttributeClass,
        name: String,
    },
    Operator(Operator),
}

impl ConditionalAceToken {
    pub fn opcode( &self ) -> u8 {
        match self {
            ConditionalAceToken::Literal(lit) => lit.opcode(),
            ConditionalAceToken::Attribute { class, .. } => class.opcode(),
            ConditionalAceToken::Operator(op) => op.opcode(),
        }
    }

    #[inline]
    pub fn int( value: i64 ) -> Self {
        ConditionalAceToken::Literal(Literal::Int(IntLiteral::new(value)))
    }

    #[inline]
    pub fn unicode( value: impl Into<String> ) -> Self {
        ConditionalAceToken::Literal(Literal::Unicode(value.into()))
    }

    #[inline]
    pub fn attribute( class: AttributeClass, name: impl Into<String> ) -> Self {
        ConditionalAceToken::Attribute {
            class,
            name: name.into(),
        }
    }
}

/// A conditional expression in postfix order, as stored in a callback ACE.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ConditionalAceProgram {
    pub tokens: Vec<ConditionalAceToken>,
}

impl ConditionalAceProgram {
    #[inline]
    pub fn new( tokens: Vec<ConditionalAceToken> ) -> Self {
        Self { tokens }
    }

    #[inline]
    pub fn len( &self ) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty( &self ) -> bool {
        self.tokens.is_empty()
    }
}
