//! Compiles the SDDL text of a conditional expression into a postfix program.
//!
//! The compiler is a single pass over the input with an operator stack. After each token the
//! set of token kinds that may legally follow is recomputed, which is how most syntax errors
//! are caught early and reported at a useful offset.

use core::fmt;
use bitflags::bitflags;
use tracing::{debug, trace};

use crate::{
    claims::{ClaimFlags, ClaimSecurityAttribute, ClaimValues},
    conditional_ace::token::{
        AttributeClass, ConditionalAceProgram, ConditionalAceToken, IntBase, IntLiteral, IntSign,
        Literal, Operator,
    },
    error::{Error, SddlDecodeError},
    limits::{AceConditionFlags, Limits},
    sddl::sddl_decode_sid,
    sid::SID,
};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// A failed compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionCompileError {
    /// Every message raised, joined with `" AND THEN "`.
    pub message: String,

    /// Byte offset of the first error.
    pub message_offset: usize,

    /// Bytes of input read before giving up.
    pub consumed: usize,
}

impl fmt::Display for ConditionCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.message_offset)
    }
}

impl std::error::Error for ConditionCompileError {}

impl From<ConditionCompileError> for SddlDecodeError {
    fn from( err: ConditionCompileError ) -> Self {
        SddlDecodeError::new(err.message, err.message_offset)
    }
}

impl From<ConditionCompileError> for Error {
    fn from( err: ConditionCompileError ) -> Self {
        SddlDecodeError::from(err).into()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

bitflags! {
    /// What the compiler will accept next.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Expect: u32 {
        const UNARY_OP = 1 << 0;
        const BINARY_OP = 1 << 1;
        const BINARY_LOGIC_OP = 1 << 2;
        const LOCAL_ATTR = 1 << 3;
        const NON_LOCAL_ATTR = 1 << 4;
        const LITERAL = 1 << 5;
        const PAREN = 1 << 6;
        const PAREN_LITERAL = 1 << 7;
        const NOT_EXPECTING_END_PAREN = 1 << 8;

        // the last token was an operator still waiting for its operand
        const IS_UNARY_OP = 1 << 20;
        const IS_BINARY_OP = 1 << 21;
    }
}

impl Expect {
    const EXPR_START: Expect = Expect::UNARY_OP
        .union(Expect::LOCAL_ATTR)
        .union(Expect::NON_LOCAL_ATTR)
        .union(Expect::PAREN);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Last {
    Operator(Operator),
    Attribute,
    Literal,
    ParenEnd,
}

impl Last {
    fn expects( self ) -> Expect {
        match self {
            Last::Operator(op) => operator_expects(op),
            Last::Attribute => Expect::BINARY_OP | Expect::BINARY_LOGIC_OP,
            Last::Literal => Expect::BINARY_LOGIC_OP,
            Last::ParenEnd => Expect::BINARY_LOGIC_OP | Expect::BINARY_OP,
        }
    }
}

fn operator_expects( op: Operator ) -> Expect {
    if op.is_member_of() {
        Expect::LITERAL | Expect::PAREN_LITERAL | Expect::IS_UNARY_OP
    } else if op.is_relational() {
        Expect::LITERAL | Expect::PAREN_LITERAL | Expect::NON_LOCAL_ATTR | Expect::IS_BINARY_OP
    } else if op.is_contains() {
        Expect::LITERAL | Expect::NON_LOCAL_ATTR | Expect::IS_BINARY_OP
    } else {
        match op {
            Operator::Exists | Operator::NotExists => {
                Expect::LOCAL_ATTR | Expect::NON_LOCAL_ATTR | Expect::IS_UNARY_OP
            },
            Operator::Not => Expect::PAREN | Expect::NON_LOCAL_ATTR | Expect::IS_UNARY_OP,
            _ => {
                Expect::LOCAL_ATTR
                    | Expect::NON_LOCAL_ATTR
                    | Expect::PAREN
                    | Expect::UNARY_OP
                    | Expect::IS_BINARY_OP
            },
        }
    }
}

const PRECEDENCE_EXISTS: u8 = 1;
const PRECEDENCE_COMMON: u8 = 2;
const PRECEDENCE_NOT: u8 = 3;
const PRECEDENCE_AND: u8 = 4;
const PRECEDENCE_OR: u8 = 5;
const PRECEDENCE_PAREN_END: u8 = 6;
const PRECEDENCE_PAREN_START: u8 = 7;

fn precedence( op: Operator ) -> u8 {
    match op {
        Operator::Exists | Operator::NotExists => PRECEDENCE_EXISTS,
        Operator::Not => PRECEDENCE_NOT,
        Operator::And => PRECEDENCE_AND,
        Operator::Or => PRECEDENCE_OR,
        _ => PRECEDENCE_COMMON,
    }
}

#[derive(Debug, Clone, Copy)]
enum Stacked {
    Paren { start: usize },
    Operator { op: Operator, position: usize },
}

impl Stacked {
    fn precedence( &self ) -> u8 {
        match self {
            Stacked::Paren { .. } => PRECEDENCE_PAREN_START,
            Stacked::Operator { op, .. } => precedence(*op),
        }
    }

    fn is_unary( &self ) -> bool {
        matches!(self, Stacked::Operator { op, .. } if op.arity() == 1)
    }
}

#[inline]
fn is_wspace( c: u8 ) -> bool {
    matches!(c, b' ' | 0x09..=0x0d)
}

/// Characters of a local attribute name or an operator word.
#[inline]
fn is_attr_char1( c: u8 ) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b':' | b'.' | b'/' | b'_')
}

/// Characters that end an `@Class.` attribute name.
#[inline]
fn ends_attr_name( c: u8 ) -> bool {
    b"!&()><=| \"".contains(&c) || is_wspace(c)
}

fn must_not_escape( v: u16 ) -> bool {
    match u8::try_from(v) {
        Ok(c) => c.is_ascii_alphanumeric() || b"#$'*+-;?@[\\]^_`{}~:/.".contains(&c),
        Err(_) => false,
    }
}

enum IntScan {
    NotAnInt,
    OutOfRange,
    Found(IntLiteral, usize),
}

/// Reads a C-style integer: optional sign, then `0x` hex, leading-zero octal, or decimal.
fn scan_int( b: &[u8] ) -> IntScan {
    let (sign, mut pos) = match b.first() {
        Some(b'-') => (IntSign::Negative, 1),
        Some(b'+') => (IntSign::Positive, 1),
        _ => (IntSign::None, 0),
    };
    let digits = &b[pos..];

    let (radix, base, run) = if digits.len() > 2
        && digits[0] == b'0'
        && matches!(digits[1], b'x' | b'X')
        && digits[2].is_ascii_hexdigit()
    {
        pos += 2;
        (16, IntBase::Hex, digits[2..].iter().take_while(|c| c.is_ascii_hexdigit()).count())
    } else if digits.first() == Some(&b'0') {
        let run = digits.iter().take_while(|c| (b'0'..=b'7').contains(c)).count();
        let base = if run > 1 { IntBase::Octal } else { IntBase::Decimal };
        (8, base, run)
    } else {
        (10, IntBase::Decimal, digits.iter().take_while(|c| c.is_ascii_digit()).count())
    };
    if run == 0 {
        return IntScan::NotAnInt;
    }

    let mut magnitude: u64 = 0;
    for &c in &b[pos..pos + run] {
        let d = u64::from((c as char).to_digit(radix).unwrap_or(0));
        magnitude = match magnitude.checked_mul(u64::from(radix)).and_then(|m| m.checked_add(d)) {
            Some(m) => m,
            None => return IntScan::OutOfRange,
        };
    }

    let value = if sign == IntSign::Negative {
        if magnitude > 1u64 << 63 {
            return IntScan::OutOfRange;
        }
        (magnitude as i64).wrapping_neg()
    } else {
        match i64::try_from(magnitude) {
            Ok(v) => v,
            Err(_) => return IntScan::OutOfRange,
        }
    };

    IntScan::Found(IntLiteral::new(value).set_sign(sign).set_base(base), pos + run)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Marker for a failure already recorded in [`Compiler::error`].
struct Failed;

type Step<T = ()> = core::result::Result<T, Failed>;

struct Compiler<'a> {
    src: &'a str,
    sddl: &'a [u8],
    offset: usize,

    allow_device: bool,
    domain: Option<&'a SID>,
    limits: &'a Limits,

    state: Expect,
    last: Option<Last>,
    program: Vec<ConditionalAceToken>,
    written: usize,
    stack: Vec<Stacked>,

    error: Option<(String, usize)>,
}

impl<'a> Compiler<'a> {
    fn new( src: &'a str, flags: AceConditionFlags, domain: Option<&'a SID>, limits: &'a Limits ) -> Self {
        Self {
            src,
            sddl: src.as_bytes(),
            offset: 0,
            allow_device: flags.contains(AceConditionFlags::ALLOW_DEVICE),
            domain,
            limits,
            state: Expect::PAREN,
            last: None,
            program: Vec::new(),
            written: 0,
            stack: Vec::new(),
            error: None,
        }
    }

    fn fail( &mut self, message: impl Into<String> ) -> Failed {
        let message = message.into();
        trace!(offset = self.offset, message = %message, "SDDL condition error");
        match &mut self.error {
            Some((existing, _)) => {
                existing.push_str(" AND THEN ");
                existing.push_str(&message);
            },
            None => self.error = Some((message, self.offset)),
        }
        Failed
    }

    fn finish( self, step: Step ) -> core::result::Result<(ConditionalAceProgram, usize), ConditionCompileError> {
        match step {
            Ok(()) => Ok((ConditionalAceProgram::new(self.program), self.offset)),
            Err(Failed) => Err(self.into_error()),
        }
    }

    fn into_error( self ) -> ConditionCompileError {
        let (message, message_offset) = self.error.unwrap_or_else(|| ("compile failed".to_string(), self.offset));
        debug!(offset = message_offset, message = %message, "could not compile SDDL condition");
        ConditionCompileError {
            message,
            message_offset,
            consumed: self.offset,
        }
    }

    #[inline]
    fn peek( &self ) -> Option<u8> {
        self.sddl.get(self.offset).copied()
    }

    #[inline]
    fn at( &self, pos: usize ) -> Option<u8> {
        self.sddl.get(pos).copied()
    }

    fn text( &mut self, start: usize, end: usize ) -> Step<&'a str> {
        let src = self.src;
        match src.get(start..end) {
            Some(s) => Ok(s),
            None => Err(self.fail("text is not on a character boundary")),
        }
    }

    fn check_length( &mut self ) -> Step {
        if self.sddl.len() > self.limits.max_sddl_length {
            return Err(self.fail(format!("input is too long ({} bytes)", self.sddl.len())));
        }
        Ok(())
    }

    fn eat_whitespace( &mut self, trailing: bool ) -> Step {
        while self.peek().is_some_and(is_wspace) {
            self.offset += 1;
        }
        if !trailing && self.offset == self.sddl.len() {
            return Err(self.fail("input ends unexpectedly"));
        }
        Ok(())
    }

    //

    fn count_token( &mut self ) -> Step {
        self.written += 1;
        if self.written > self.limits.max_tokens {
            return Err(self.fail(format!("program is too long (over {} tokens)", self.limits.max_tokens)));
        }
        Ok(())
    }

    fn write_token( &mut self, token: ConditionalAceToken ) -> Step {
        self.count_token()?;
        self.last = Some(match &token {
            ConditionalAceToken::Literal(_) => Last::Literal,
            ConditionalAceToken::Attribute { .. } => Last::Attribute,
            ConditionalAceToken::Operator(op) => Last::Operator(*op),
        });
        self.program.push(token);
        Ok(())
    }

    fn write_literal( &mut self, literal: Literal ) -> Step {
        self.write_token(ConditionalAceToken::Literal(literal))
    }

    fn flush_stack( &mut self, precedence: u8 ) -> Step {
        if precedence == PRECEDENCE_PAREN_START {
            return Ok(());
        }
        while let Some(top) = self.stack.last().copied() {
            let p = top.precedence();
            if p > precedence || (p == precedence && top.is_unary()) {
                break;
            }
            self.stack.pop();
            match top {
                Stacked::Operator { op, .. } => self.write_token(ConditionalAceToken::Operator(op))?,
                Stacked::Paren { start } => {
                    return Err(self.fail(format!("unmatched '(' at {start}")));
                },
            }
        }
        Ok(())
    }

    fn push_stacked( &mut self, item: Stacked ) -> Step {
        if self.stack.len() + 1 >= self.limits.max_tokens {
            return Err(self.fail("excessive recursion"));
        }
        self.flush_stack(item.precedence())?;
        self.stack.push(item);
        Ok(())
    }

    fn push_operator( &mut self, op: Operator ) -> Step {
        self.push_stacked(Stacked::Operator {
            op,
            position: self.offset,
        })?;
        self.last = Some(Last::Operator(op));
        Ok(())
    }

    fn close_group( &mut self, start: usize ) -> Step {
        self.flush_stack(PRECEDENCE_PAREN_END)?;
        match self.stack.pop() {
            Some(Stacked::Paren { start: s }) if s == start => Ok(()),
            Some(Stacked::Paren { start: s }) => {
                Err(self.fail(format!("parenthesis from {s} closes the one opened at {start}")))
            },
            Some(Stacked::Operator { op, position }) => {
                Err(self.fail(format!("operator '{op}' at {position} was not resolved")))
            },
            None => Err(self.fail("parenthesis nesting error")),
        }
    }

    //

    /// A whole expression, with or without outer parentheses.
    fn compile_whole( &mut self ) -> Step {
        self.check_length()?;
        let start = self.offset;
        self.push_stacked(Stacked::Paren { start })?;
        self.parse_body(true)?;
        self.close_group(start)?;
        if !self.stack.is_empty() {
            return Err(self.fail("incomplete expression"));
        }
        Ok(())
    }

    /// One parenthesised expression, leaving whatever follows it.
    fn compile_prefix( &mut self ) -> Step {
        self.check_length()?;
        self.eat_whitespace(false)?;
        self.parse_expression()?;
        if !self.stack.is_empty() {
            return Err(self.fail("incomplete expression"));
        }
        Ok(())
    }

    fn parse_expression( &mut self ) -> Step {
        if self.state.contains(Expect::PAREN_LITERAL) {
            return self.parse_paren_literal();
        }
        if self.peek() != Some(b'(') || !self.state.contains(Expect::PAREN) {
            return Err(self.fail("did not expect '(' here"));
        }

        let start = self.offset;
        self.push_stacked(Stacked::Paren { start })?;
        self.offset += 1;

        self.parse_body(false)?;
        if self.peek() != Some(b')') {
            return Err(self.fail(format!("expected ')' to match '(' at {start}")));
        }
        self.close_group(start)?;
        self.offset += 1;

        self.last = Some(Last::ParenEnd);
        self.state = Last::ParenEnd.expects();
        self.eat_whitespace(true)
    }

    /// Tokens up to the closing `)`, or up to the end of input when `bare`.
    fn parse_body( &mut self, bare: bool ) -> Step {
        self.state = Expect::EXPR_START | Expect::NOT_EXPECTING_END_PAREN;

        loop {
            self.eat_whitespace(bare)?;
            let Some(c) = self.peek() else {
                break;
            };
            if c == b')' {
                if bare {
                    return Err(self.fail("unmatched ')'"));
                }
                break;
            }

            match c {
                b'(' => self.parse_expression()?,
                b'@' => self.parse_attr2(bare)?,
                b'!' | b'<' | b'>' | b'=' | b'&' | b'|' => self.parse_oppy_op()?,
                c if is_attr_char1(c) => self.parse_word()?,
                _ if self.state.contains(Expect::LITERAL) => {
                    let literal = self.parse_literal(0)?;
                    self.write_literal(literal)?;
                },
                c => {
                    return Err(self.fail(format!("unexpected byte 0x{c:02x} '{}'", c as char)));
                },
            }

            if let Some(last) = self.last {
                self.state = last.expects();
            }
        }

        if self.state.intersects(Expect::IS_BINARY_OP | Expect::IS_UNARY_OP) {
            return Err(self.fail("operator lacks right hand argument"));
        }
        if self.state.contains(Expect::NOT_EXPECTING_END_PAREN) {
            return Err(self.fail("empty expression"));
        }
        Ok(())
    }

    fn parse_oppy_op( &mut self ) -> Step {
        let Some(c) = self.peek() else {
            return Err(self.fail("syntax error"));
        };
        let Some(next) = self.at(self.offset + 1) else {
            return Err(self.fail("syntax error"));
        };

        let (op, len, needs) = match (c, next) {
            (b'!', b'=') => (Operator::NotEqual, 2, Expect::BINARY_OP),
            (b'!', _) => (Operator::Not, 1, Expect::UNARY_OP),
            (b'=', b'=') => (Operator::Equal, 2, Expect::BINARY_OP),
            (b'>', b'=') => (Operator::GreaterOrEqual, 2, Expect::BINARY_OP),
            (b'>', _) => (Operator::GreaterThan, 1, Expect::BINARY_OP),
            (b'<', b'=') => (Operator::LessOrEqual, 2, Expect::BINARY_OP),
            (b'<', _) => (Operator::LessThan, 1, Expect::BINARY_OP),
            (b'&', b'&') => (Operator::And, 2, Expect::BINARY_LOGIC_OP),
            (b'|', b'|') => (Operator::Or, 2, Expect::BINARY_LOGIC_OP),
            _ => return Err(self.fail("unknown operator")),
        };
        if !self.state.contains(needs) {
            return Err(self.fail("unexpected operator"));
        }

        self.push_operator(op)?;
        self.offset += len;
        self.eat_whitespace(false)
    }

    fn parse_word( &mut self ) -> Step {
        let expecting_unary = self.state.contains(Expect::UNARY_OP);
        let expecting_binary = self.state.contains(Expect::BINARY_OP);
        let expecting_attr = self.state.contains(Expect::LOCAL_ATTR);
        let expecting_literal = self.state.contains(Expect::LITERAL);

        let start = self.offset;
        if expecting_literal && self.sddl[start..].starts_with(b"SID(") {
            let sid = self.parse_sid()?;
            return self.write_literal(Literal::Sid(sid));
        }

        let len = self.sddl[start..].iter().take_while(|c| is_attr_char1(**c)).count();
        let word = self.text(start, start + len)?;

        if expecting_unary || expecting_binary {
            let found = Operator::ALL.iter().copied().find(|op| {
                let unary = op.arity() == 1;
                op.sddl_name().starts_with(|c: char| c.is_ascii_alphabetic())
                    && op.sddl_name().eq_ignore_ascii_case(word)
                    && ((unary && expecting_unary) || (!unary && expecting_binary))
            });
            if let Some(op) = found {
                if op.is_device() && !self.allow_device {
                    return Err(self.fail(
                        "a device-relative expression will never evaluate to true in this context \
                         (did you intend a user-relative expression?)",
                    ));
                }
                self.push_operator(op)?;
                self.offset += len;
                return Ok(());
            }
        } else if !expecting_attr && !expecting_literal {
            return Err(self.fail("did not expect this word here"));
        }

        if let Some((literal, used)) = self.could_be_an_int() {
            self.offset += used;
            return self.write_literal(Literal::Int(literal));
        }

        if !expecting_attr {
            return Err(self.fail("word makes no sense here"));
        }
        self.offset += len;
        self.write_token(ConditionalAceToken::attribute(AttributeClass::Local, word))
    }

    fn could_be_an_int( &self ) -> Option<(IntLiteral, usize)> {
        if !self.state.contains(Expect::LITERAL) {
            return None;
        }
        match scan_int(&self.sddl[self.offset..]) {
            IntScan::Found(literal, used) => {
                if self.at(self.offset + used).is_some_and(is_attr_char1) {
                    None
                } else {
                    Some((literal, used))
                }
            },
            _ => None,
        }
    }

    fn parse_attr2( &mut self, bare: bool ) -> Step {
        if !self.state.contains(Expect::NON_LOCAL_ATTR) {
            return Err(self.fail("did not expect @attr here"));
        }
        self.offset += 1;

        let rest = &self.sddl[self.offset..];
        let class = [AttributeClass::User, AttributeClass::Resource, AttributeClass::Device]
            .into_iter()
            .find(|class| {
                let prefix = class.sddl_prefix().as_bytes();
                rest.len() > prefix.len() && rest[..prefix.len()].eq_ignore_ascii_case(prefix)
            });
        let Some(class) = class else {
            return Err(self.fail("unknown attribute class"));
        };
        if class == AttributeClass::Device && !self.allow_device {
            return Err(self.fail(
                "a device attribute is not applicable in this context (did you intend a user attribute?)",
            ));
        }
        self.offset += class.sddl_prefix().len();

        let (name, len) = self.read_attr2_string(bare)?;
        self.write_token(ConditionalAceToken::attribute(class, name))?;
        self.offset += len;
        self.eat_whitespace(bare)
    }

    /// Reads an attribute name with `%XXXX` escapes, returning the name and the bytes it used.
    fn read_attr2_string( &mut self, allow_end: bool ) -> Step<(String, usize)> {
        let rest = &self.sddl[self.offset..];
        let len = rest.iter().position(|c| ends_attr_name(*c));
        let len = match len {
            Some(len) => len,
            None if allow_end => rest.len(),
            None => return Err(self.fail("interminable attribute name")),
        };
        if len == 0 {
            return Err(self.fail("empty attribute name"));
        }
        if len > self.limits.max_program_length {
            return Err(self.fail(format!("attribute is way too long ({len})")));
        }

        let raw = self.text(self.offset, self.offset + len)?;
        let units: Vec<u16> = raw.encode_utf16().collect();
        let mut out = Vec::with_capacity(units.len());
        let mut i = 0;
        while i < units.len() {
            if units[i] != u16::from(b'%') {
                out.push(units[i]);
                i += 1;
                continue;
            }
            if i + 5 > units.len() {
                return Err(self.fail("insufficient room for % escape"));
            }
            let mut v: u16 = 0;
            for &u in &units[i + 1..i + 5] {
                let digit = char::from_u32(u32::from(u)).and_then(|c| c.to_digit(16));
                let Some(digit) = digit else {
                    return Err(self.fail("invalid % escape"));
                };
                v = (v << 4) | digit as u16;
            }
            if must_not_escape(v) {
                return Err(self.fail(format!(
                    "invalid % escape: '%{v:04x}' should be literal '{}'",
                    char::from(v as u8)
                )));
            }
            out.push(v);
            i += 5;
        }

        match String::from_utf16(&out) {
            Ok(name) => Ok((name, len)),
            Err(_) => Err(self.fail("attribute name is not valid UTF-16")),
        }
    }

    //

    fn parse_literal( &mut self, depth: usize ) -> Step<Literal> {
        if !self.state.contains(Expect::LITERAL) {
            return Err(self.fail("did not expect to be parsing a literal now"));
        }
        let Some(c) = self.peek() else {
            return Err(self.fail("input ends unexpectedly"));
        };
        match c {
            b'#' => self.parse_octet_string().map(Literal::OctetString),
            b'"' => self.parse_unicode().map(Literal::Unicode),
            b'S' => self.parse_sid().map(Literal::Sid),
            b'{' => self.parse_composite(depth + 1).map(Literal::Composite),
            b'0'..=b'9' | b'-' | b'+' => self.parse_int().map(Literal::Int),
            c => Err(self.fail(format!("unexpected byte 0x{c:02x} '{}' parsing literal", c as char))),
        }
    }

    fn parse_paren_literal( &mut self ) -> Step {
        if self.peek() != Some(b'(') {
            return Err(self.fail("expected '('"));
        }
        self.offset += 1;
        self.eat_whitespace(false)?;
        let literal = self.parse_literal(0)?;
        self.eat_whitespace(false)?;
        if self.peek() != Some(b')') {
            return Err(self.fail("expected ')'"));
        }
        self.offset += 1;
        self.write_literal(literal)?;
        self.eat_whitespace(true)
    }

    fn parse_int( &mut self ) -> Step<IntLiteral> {
        match scan_int(&self.sddl[self.offset..]) {
            IntScan::Found(literal, used) => {
                self.offset += used;
                if self.peek().is_some_and(is_attr_char1) {
                    return Err(self.fail("unexpected non-integer"));
                }
                Ok(literal)
            },
            IntScan::OutOfRange => Err(self.fail("integer out of range")),
            IntScan::NotAnInt => Err(self.fail("bad integer")),
        }
    }

    fn parse_unicode( &mut self ) -> Step<String> {
        let start = self.offset + 1;
        let Some(len) = self.sddl[start..].iter().position(|c| *c == b'"') else {
            return Err(self.fail("unterminated unicode string"));
        };
        let s = self.text(start, start + len)?.to_string();
        self.offset = start + len + 1;
        Ok(s)
    }

    fn parse_octet_string( &mut self ) -> Step<Vec<u8>> {
        // a '#' after the leading one stands for a zero nibble
        let run = self.sddl[self.offset + 1..]
            .iter()
            .take_while(|c| **c == b'#' || c.is_ascii_hexdigit())
            .count();
        if run % 2 != 0 {
            return Err(self.fail("octet string has an odd number of hex digits"));
        }
        let hex = &self.sddl[self.offset + 1..self.offset + 1 + run];
        let bytes = hex.chunks(2).map(|pair| (nibble(pair[0]) << 4) | nibble(pair[1])).collect();
        self.offset += 1 + run;
        Ok(bytes)
    }

    fn parse_sid( &mut self ) -> Step<SID> {
        let rest = &self.sddl[self.offset..];
        if rest.len() < 7 || !rest.starts_with(b"SID(") {
            return Err(self.fail("malformed SID() constructor"));
        }
        self.offset += 4;
        let sid = self.parse_bare_sid()?;
        if self.peek() != Some(b')') {
            return Err(self.fail("expected ')' to follow SID"));
        }
        self.offset += 1;
        Ok(sid)
    }

    /// A SID string or alias with no `SID(...)` wrapper.
    fn parse_bare_sid( &mut self ) -> Step<SID> {
        let src = self.src;
        let Some(rest) = src.get(self.offset..) else {
            return Err(self.fail("could not parse SID"));
        };
        match sddl_decode_sid(rest, self.domain) {
            Ok((sid, used)) => {
                self.offset += used;
                Ok(sid)
            },
            Err(err) => Err(self.fail(format!("could not parse SID: {err}"))),
        }
    }

    fn parse_composite( &mut self, depth: usize ) -> Step<Vec<Literal>> {
        if depth > self.limits.max_composite_depth {
            return Err(self.fail("composites are nested too deeply"));
        }
        self.offset += 1;

        let mut members = Vec::new();
        loop {
            self.eat_whitespace(false)?;
            if self.peek() == Some(b'}') {
                self.offset += 1;
                break;
            }
            if !members.is_empty() {
                if self.peek() != Some(b',') {
                    return Err(self.fail("malformed composite (expected comma)"));
                }
                self.offset += 1;
                self.eat_whitespace(false)?;
            }
            let member = self.parse_literal(depth)?;
            self.count_token()?;
            members.push(member);
        }
        Ok(members)
    }

    //

    fn parse_ra_octet_string( &mut self ) -> Step<Vec<u8>> {
        let run = self.sddl[self.offset..]
            .iter()
            .take_while(|c| **c == b'#' || c.is_ascii_hexdigit())
            .count();
        if run == 0 {
            return Err(self.fail("zero length octet bytes"));
        }
        let hex = &self.sddl[self.offset..self.offset + run];
        let mut bytes = Vec::with_capacity(run.div_ceil(2));
        // an odd count gains an implicit leading zero nibble
        let (head, tail) = hex.split_at(run % 2);
        if let Some(&c) = head.first() {
            bytes.push(nibble(c));
        }
        bytes.extend(tail.chunks(2).map(|pair| (nibble(pair[0]) << 4) | nibble(pair[1])));
        self.offset += run;
        Ok(bytes)
    }

    fn parse_resource_attribute( &mut self ) -> Step<ClaimSecurityAttribute> {
        if self.sddl.len() < 6 || self.sddl.len() > self.limits.max_program_length {
            return Err(self.fail("invalid resource attribute length"));
        }
        self.eat_whitespace(false)?;
        if !self.sddl[self.offset..].starts_with(b"(\"") {
            return Err(self.fail("expected '(\"' to open a resource attribute"));
        }
        self.offset += 2;

        let (name, len) = self.read_attr2_string(false)?;
        self.offset += len;
        self.eat_whitespace(false)?;

        let head = &self.sddl[self.offset..];
        if head.len() < 6 || !head.starts_with(b"\",T") || head[4] != b',' {
            return Err(self.fail("expected '\",T[IUSDXB],' after attribute name"));
        }
        let type_char = head[3];
        self.offset += 5;

        self.state = Expect::LITERAL;
        let flags = match self.parse_literal(0)? {
            Literal::Int(i) if (0..=i64::from(u32::MAX)).contains(&i.value) => i.value as u32,
            _ => return Err(self.fail("invalid attribute flags (want 32 bit int)")),
        };
        if flags & 0xff00 != 0 {
            return Err(self.fail("invalid attribute flags, stepping on reserved 0xff00 range"));
        }
        if self.peek() != Some(b',') {
            return Err(self.fail("expected ',' after attribute flags"));
        }
        self.offset += 1;

        let values = self.parse_resource_values(type_char)?;
        if self.peek() != Some(b')') {
            return Err(self.fail("expected trailing ')'"));
        }
        self.offset += 1;

        Ok(ClaimSecurityAttribute::new(name, values).set_flags(ClaimFlags::from_bits_retain(flags)))
    }

    fn parse_resource_values( &mut self, type_char: u8 ) -> Step<ClaimValues> {
        let mut values = match type_char {
            b'I' => ClaimValues::Int64(Vec::new()),
            b'U' => ClaimValues::Uint64(Vec::new()),
            b'S' => ClaimValues::String(Vec::new()),
            b'D' => ClaimValues::Sid(Vec::new()),
            b'X' => ClaimValues::OctetString(Vec::new()),
            b'B' => ClaimValues::Boolean(Vec::new()),
            c => return Err(self.fail(format!("unknown attribute type T{}", c as char))),
        };

        let mut first = true;
        loop {
            self.eat_whitespace(false)?;
            if self.peek() == Some(b')') {
                break;
            }
            if !first {
                if self.peek() != Some(b',') {
                    return Err(self.fail("malformed resource attribute ACE (expected comma)"));
                }
                self.offset += 1;
                self.eat_whitespace(false)?;
            }
            first = false;
            self.count_token()?;

            match &mut values {
                ClaimValues::Int64(v) => {
                    let i = self.parse_int()?;
                    v.push(i.value);
                },
                ClaimValues::Uint64(v) => {
                    let i = self.parse_int()?;
                    match u64::try_from(i.value) {
                        Ok(u) => v.push(u),
                        Err(_) => return Err(self.fail("invalid resource ACE value for unsigned TU claim")),
                    }
                },
                ClaimValues::Boolean(v) => {
                    let i = self.parse_int()?;
                    match i.value {
                        0 => v.push(false),
                        1 => v.push(true),
                        _ => return Err(self.fail("invalid resource ACE Boolean value")),
                    }
                },
                ClaimValues::String(v) => {
                    if self.peek() != Some(b'"') {
                        return Err(self.fail("expected a quoted string"));
                    }
                    let s = self.parse_unicode()?;
                    v.push(s);
                },
                ClaimValues::Sid(v) => {
                    let sid = self.parse_bare_sid()?;
                    v.push(sid);
                },
                ClaimValues::OctetString(v) => {
                    let bytes = self.parse_ra_octet_string()?;
                    v.push(bytes);
                },
            }
        }

        if values.is_empty() {
            return Err(self.fail("resource attribute has no values"));
        }
        Ok(values)
    }
}

#[inline]
fn nibble( c: u8 ) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Compiles an SDDL conditional expression such as `(@User.Title == "Manager")`.
///
/// The outer parentheses may be omitted. The whole string must be consumed; on success the
/// program and the number of bytes read are returned.
///
/// # Example
/// ```
/// use windows_sddl::{ace_conditions_compile_sddl, AceConditionFlags};
///
/// let (program, consumed) = ace_conditions_compile_sddl(r#"@User.Title == "Manager""#, AceConditionFlags::empty()).unwrap();
/// assert_eq!(program.len(), 3);
/// assert_eq!(consumed, 24);
/// ```
pub fn ace_conditions_compile_sddl(
    sddl: &str,
    flags: AceConditionFlags,
) -> core::result::Result<(ConditionalAceProgram, usize), ConditionCompileError> {
    ace_conditions_compile_sddl_with(sddl, flags, None, &Limits::default())
}

/// Like [`ace_conditions_compile_sddl`], resolving domain-relative SID aliases against `domain`.
pub fn ace_conditions_compile_sddl_with(
    sddl: &str,
    flags: AceConditionFlags,
    domain: Option<&SID>,
    limits: &Limits,
) -> core::result::Result<(ConditionalAceProgram, usize), ConditionCompileError> {
    let mut compiler = Compiler::new(sddl, flags, domain, limits);
    let step = compiler.compile_whole();
    compiler.finish(step)
}

/// Compiles the parenthesised condition at the start of `sddl`, which may be followed by
/// unrelated text. Used for the condition field of an SDDL ACE.
pub(crate) fn compile_condition_prefix(
    sddl: &str,
    flags: AceConditionFlags,
    domain: Option<&SID>,
    limits: &Limits,
) -> core::result::Result<(ConditionalAceProgram, usize), ConditionCompileError> {
    let mut compiler = Compiler::new(sddl, flags, domain, limits);
    let step = compiler.compile_prefix();
    compiler.finish(step)
}

/// Parses a resource attribute `("name",T<type>,<flags>,<value>...)` at the start of `sddl`,
/// returning the claim and the bytes consumed.
pub(crate) fn parse_sddl_resource_attribute(
    sddl: &str,
    domain: Option<&SID>,
    limits: &Limits,
) -> core::result::Result<(ClaimSecurityAttribute, usize), ConditionCompileError> {
    let mut compiler = Compiler::new(sddl, AceConditionFlags::ALLOW_DEVICE, domain, limits);
    let claim = compiler.parse_resource_attribute();
    let offset = compiler.offset;
    match claim {
        Ok(claim) => Ok((claim, offset)),
        Err(Failed) => Err(compiler.into_error()),
    }
}

/// Builds a claim from a single SDDL literal, for example `{1, 2, 3}` or `"text"`.
///
/// Integers become `INT64` claims, strings `STRING`, octet strings `OCTET_STRING` and SIDs `SID`.
/// A composite becomes a claim holding its members, which must all be of one type.
pub fn parse_sddl_literal_as_claim( name: &str, sddl: &str ) -> crate::error::Result<ClaimSecurityAttribute> {
    let limits = Limits::default();
    let mut compiler = Compiler::new(sddl, AceConditionFlags::ALLOW_DEVICE, None, &limits);
    compiler.state = Expect::LITERAL;
    let literal = match compiler.parse_literal(0) {
        Ok(literal) => literal,
        Err(Failed) => return Err(compiler.into_error().into()),
    };
    literal_to_claim(name, literal)
}

fn literal_to_claim( name: &str, literal: Literal ) -> crate::error::Result<ClaimSecurityAttribute> {
    let members = match literal {
        Literal::Composite(members) => members,
        single => vec![single],
    };

    let values = match members.first() {
        None => return Err(Error::invalid("a claim needs at least one value")),
        Some(Literal::Int(_)) => ClaimValues::Int64(collect_members(members, |m| match m {
            Literal::Int(i) => Some(i.value),
            _ => None,
        })?),
        Some(Literal::Unicode(_)) => ClaimValues::String(collect_members(members, |m| match m {
            Literal::Unicode(s) => Some(s),
            _ => None,
        })?),
        Some(Literal::OctetString(_)) => ClaimValues::OctetString(collect_members(members, |m| match m {
            Literal::OctetString(b) => Some(b),
            _ => None,
        })?),
        Some(Literal::Sid(_)) => ClaimValues::Sid(collect_members(members, |m| match m {
            Literal::Sid(s) => Some(s),
            _ => None,
        })?),
        Some(Literal::Composite(_)) => return Err(Error::invalid("claims cannot nest composites")),
    };
    Ok(ClaimSecurityAttribute::new(name, values))
}

fn collect_members<T>( members: Vec<Literal>, f: impl Fn(Literal) -> Option<T> ) -> crate::error::Result<Vec<T>> {
    members
        .into_iter()
        .map(|m| f(m).ok_or_else(|| Error::invalid("claim values must all be of one type")))
        .collect()
}
