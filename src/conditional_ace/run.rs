use core::cmp::Ordering;
use bitflags::bitflags;
use tracing::debug;

use crate::{
    ace::SecurityAce,
    claims::{compare_strings_nocase, ClaimFlags, ClaimSecurityAttribute, ClaimValues},
    conditional_ace::{
        parse::parse_conditional_ace_with_limits,
        token::{AttributeClass, ConditionalAceProgram, ConditionalAceToken, Literal, Operator},
    },
    error::{Error, Result},
    limits::Limits,
    security_descriptor::SecurityDescriptor,
    sid::SID,
    token::SecurityToken,
    types::AceType,
};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Outcome of a conditional expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AceConditionResult {
    True,
    False,
    /// The expression could not be decided. Allow ACEs treat this as false, deny ACEs as true.
    Unknown,
}

impl AceConditionResult {
    #[inline]
    pub fn from_bool( v: bool ) -> Self {
        if v { AceConditionResult::True } else { AceConditionResult::False }
    }

    #[inline]
    pub fn is_true( self ) -> bool {
        self == AceConditionResult::True
    }

    fn not( self ) -> Self {
        match self {
            AceConditionResult::True => AceConditionResult::False,
            AceConditionResult::False => AceConditionResult::True,
            AceConditionResult::Unknown => AceConditionResult::Unknown,
        }
    }

    fn and( self, other: Self ) -> Self {
        use AceConditionResult::*;
        match (self, other) {
            (True, True) => True,
            (False, _) | (_, False) => False,
            _ => Unknown,
        }
    }

    fn or( self, other: Self ) -> Self {
        use AceConditionResult::*;
        match (self, other) {
            (True, _) | (_, True) => True,
            (False, False) => False,
            _ => Unknown,
        }
    }
}

/// Result of gating one callback ACE on its condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionalAceCheck {
    /// Whether the condition blob decoded. A blob that does not decode always yields `Unknown`.
    pub parsed: bool,
    pub result: AceConditionResult,
}

impl ConditionalAceCheck {
    /// Whether the condition is known to hold.
    #[inline]
    pub fn holds( &self ) -> bool {
        self.result.is_true()
    }

    /// Whether an ACE of `ace_type` guarded by this condition takes effect.
    pub fn ace_applies( &self, ace_type: AceType ) -> bool {
        match self.result {
            AceConditionResult::True => true,
            AceConditionResult::False => false,
            AceConditionResult::Unknown => ace_type.is_deny(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct ValueFlags: u32 {
        const CASE_SENSITIVE = ClaimFlags::CASE_SENSITIVE.bits();
        const FROM_ATTR = 0x0000_0100;
        const UNIQUE_AND_SORTED = ClaimFlags::UNIQUE_AND_SORTED.bits();
    }
}

#[derive(Debug, Clone)]
enum Operand {
    Int(i64),
    Unicode(String),
    OctetString(Vec<u8>),
    Sid(SID),
    Composite(Vec<Value>),
    Bool(AceConditionResult),
    /// An attribute that is not present.
    Null,
}

#[derive(Debug, Clone)]
struct Value {
    operand: Operand,
    flags: ValueFlags,
}

impl Value {
    fn new( operand: Operand, flags: ValueFlags ) -> Self {
        Self { operand, flags }
    }

    fn null() -> Self {
        Self::new(Operand::Null, ValueFlags::FROM_ATTR)
    }

    fn from_literal( literal: &Literal ) -> Self {
        let operand = match literal {
            Literal::Int(i) => Operand::Int(i.value),
            Literal::Unicode(s) => Operand::Unicode(s.clone()),
            Literal::OctetString(b) => Operand::OctetString(b.clone()),
            Literal::Sid(sid) => Operand::Sid(sid.clone()),
            Literal::Composite(members) => Operand::Composite(members.iter().map(Value::from_literal).collect()),
        };
        Self::new(operand, ValueFlags::empty())
    }

    fn is_from_attr( &self ) -> bool {
        self.flags.contains(ValueFlags::FROM_ATTR)
    }

    fn is_case_sensitive( &self ) -> bool {
        self.flags.contains(ValueFlags::CASE_SENSITIVE)
    }

    fn is_literal( &self ) -> bool {
        !self.is_from_attr() && !matches!(self.operand, Operand::Bool(_) | Operand::Null)
    }

    fn same_kind( &self, other: &Value ) -> bool {
        core::mem::discriminant(&self.operand) == core::mem::discriminant(&other.operand)
    }

    fn truth( &self ) -> AceConditionResult {
        match &self.operand {
            Operand::Bool(r) => *r,
            Operand::Int(n) => AceConditionResult::from_bool(*n != 0),
            Operand::Unicode(s) => AceConditionResult::from_bool(!s.is_empty()),
            _ => AceConditionResult::Unknown,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Evaluates a program for `token`, taking resource attributes from the SACL of `sd`.
///
/// Never fails: a program that underflows the stack, mixes incomparable types or does not
/// finish on a single boolean evaluates to [`AceConditionResult::Unknown`].
pub fn run_conditional_ace( program: &ConditionalAceProgram, token: &SecurityToken, sd: &SecurityDescriptor ) -> AceConditionResult {
    run_conditional_ace_with_limits(program, token, sd, &Limits::default())
}

pub fn run_conditional_ace_with_limits(
    program: &ConditionalAceProgram,
    token: &SecurityToken,
    sd: &SecurityDescriptor,
    limits: &Limits,
) -> AceConditionResult {
    let machine = Machine {
        token,
        sd,
        limits,
    };
    match machine.run(program) {
        Ok(result) => result,
        Err(err) => {
            debug!(reason = %err, "conditional ACE evaluation failed");
            AceConditionResult::Unknown
        },
    }
}

/// Decodes and runs the condition attached to a callback ACE.
pub fn access_check_conditional_ace( ace: &SecurityAce, token: &SecurityToken, sd: &SecurityDescriptor ) -> ConditionalAceCheck {
    access_check_conditional_ace_with_limits(ace, token, sd, &Limits::default())
}

pub fn access_check_conditional_ace_with_limits(
    ace: &SecurityAce,
    token: &SecurityToken,
    sd: &SecurityDescriptor,
    limits: &Limits,
) -> ConditionalAceCheck {
    let unparsed = ConditionalAceCheck {
        parsed: false,
        result: AceConditionResult::Unknown,
    };

    let Some(conditions) = ace.conditions() else {
        debug!(ace_type = ?ace.ace_type, "ACE carries no condition");
        return unparsed;
    };

    match parse_conditional_ace_with_limits(conditions, limits) {
        Ok(program) => ConditionalAceCheck {
            parsed: true,
            result: run_conditional_ace_with_limits(&program, token, sd, limits),
        },
        Err(err) => {
            debug!(reason = %err, "conditional ACE does not parse");
            unparsed
        },
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

struct Machine<'a> {
    token: &'a SecurityToken,
    sd: &'a SecurityDescriptor,
    limits: &'a Limits,
}

impl<'a> Machine<'a> {
    fn run( &self, program: &ConditionalAceProgram ) -> Result<AceConditionResult> {
        if program.len() > self.limits.max_tokens {
            return Err(Error::limit("conditional ACE token count"));
        }

        let mut stack: Vec<Value> = Vec::with_capacity(program.len());
        for token in &program.tokens {
            let value = match token {
                ConditionalAceToken::Literal(literal) => Value::from_literal(literal),
                ConditionalAceToken::Attribute { class, name } => self.lookup(*class, name)?,
                ConditionalAceToken::Operator(op) => {
                    if op.arity() == 1 {
                        let arg = pop(&mut stack)?;
                        self.unary(*op, &arg)?
                    } else {
                        let rhs = pop(&mut stack)?;
                        let lhs = pop(&mut stack)?;
                        binary(*op, &lhs, &rhs)?
                    }
                },
            };
            stack.push(value);
        }

        match stack.as_slice() {
            [Value { operand: Operand::Bool(result), .. }] => Ok(*result),
            [_] => Err(Error::invalid("expression does not produce a boolean")),
            _ => Err(Error::invalid(format!("expression leaves {} values on the stack", stack.len()))),
        }
    }

    fn lookup( &self, class: AttributeClass, name: &str ) -> Result<Value> {
        let claims = match class {
            AttributeClass::Local => &self.token.local_claims,
            AttributeClass::User => &self.token.user_claims,
            AttributeClass::Device => &self.token.device_claims,
            AttributeClass::Resource => return self.resource_lookup(name),
        };
        match SecurityToken::find_claim(claims, name) {
            Some(claim) => claim_to_value(claim, self.limits),
            None => Ok(Value::null()),
        }
    }

    /// The first resource attribute ACE of that name whose claim converts wins.
    fn resource_lookup( &self, name: &str ) -> Result<Value> {
        let mut failure = None;
        for claim in self.sd.resource_attributes() {
            if compare_strings_nocase(&claim.name, name).is_ne() {
                continue;
            }
            match claim_to_value(claim, self.limits) {
                Ok(value) => return Ok(value),
                Err(err) => failure = Some(err),
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(Value::null()),
        }
    }

    fn unary( &self, op: Operator, arg: &Value ) -> Result<Value> {
        let result = match op {
            Operator::Not => {
                if arg.is_literal() {
                    return Err(Error::invalid("logic operator applied to a literal"));
                }
                arg.truth().not()
            },
            Operator::Exists | Operator::NotExists => {
                if !arg.is_from_attr() {
                    return Err(Error::invalid("Exists applied to something other than an attribute"));
                }
                let found = !matches!(arg.operand, Operand::Null);
                AceConditionResult::from_bool(found == (op == Operator::Exists))
            },
            _ => member_of(op, arg, self.token)?,
        };
        Ok(bool_value(result))
    }
}

fn pop( stack: &mut Vec<Value> ) -> Result<Value> {
    stack.pop().ok_or_else(|| Error::invalid("stack underflow"))
}

fn bool_value( result: AceConditionResult ) -> Value {
    Value::new(Operand::Bool(result), ValueFlags::empty())
}

fn binary( op: Operator, lhs: &Value, rhs: &Value ) -> Result<Value> {
    let result = match op {
        Operator::And | Operator::Or => {
            if lhs.is_literal() || rhs.is_literal() {
                return Err(Error::invalid("logic operator applied to a literal"));
            }
            if op == Operator::And {
                lhs.truth().and(rhs.truth())
            } else {
                lhs.truth().or(rhs.truth())
            }
        },
        _ => relational(op, lhs, rhs)?,
    };
    Ok(bool_value(result))
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn claim_to_value( claim: &ClaimSecurityAttribute, limits: &Limits ) -> Result<Value> {
    let count = claim.value_count();
    if count == 0 || count >= limits.max_claim_values {
        return Err(Error::invalid(format!("claim '{}' has {} values", claim.name, count)));
    }

    let case_sensitive = claim.is_case_sensitive();
    let mut member_flags = ValueFlags::FROM_ATTR;
    if case_sensitive {
        member_flags |= ValueFlags::CASE_SENSITIVE;
    }

    let sorted;
    let claim = if count > 1 && !claim.flags.contains(ClaimFlags::UNIQUE_AND_SORTED) {
        let mut copy = claim.clone();
        copy.check_and_sort(case_sensitive)?;
        sorted = copy;
        &sorted
    } else {
        claim
    };

    let mut members = claim_operands(&claim.values)?
        .into_iter()
        .map(|operand| Value::new(operand, member_flags))
        .collect::<Vec<_>>();

    if members.len() == 1 {
        return Ok(members.remove(0));
    }
    Ok(Value::new(Operand::Composite(members), member_flags | ValueFlags::UNIQUE_AND_SORTED))
}

fn claim_operands( values: &ClaimValues ) -> Result<Vec<Operand>> {
    let operands = match values {
        ClaimValues::Int64(v) => v.iter().map(|n| Operand::Int(*n)).collect(),
        ClaimValues::Uint64(v) => v
            .iter()
            .map(|n| i64::try_from(*n).map(Operand::Int).map_err(|_| Error::invalid("UINT64 claim value exceeds INT64 range")))
            .collect::<Result<_>>()?,
        ClaimValues::Boolean(v) => v.iter().map(|b| Operand::Int(i64::from(*b))).collect(),
        ClaimValues::String(v) => v.iter().map(|s| Operand::Unicode(s.clone())).collect(),
        ClaimValues::Sid(v) => v.iter().map(|sid| Operand::Sid(sid.clone())).collect(),
        ClaimValues::OctetString(v) => v.iter().map(|b| Operand::OctetString(b.clone())).collect(),
    };
    Ok(operands)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn member_of( op: Operator, arg: &Value, token: &SecurityToken ) -> Result<AceConditionResult> {
    let sids = if op.is_device() { &token.device_sids } else { &token.sids };
    let negate = matches!(
        op,
        Operator::NotMemberOf | Operator::NotDeviceMemberOf | Operator::NotMemberOfAny | Operator::NotDeviceMemberOfAny
    );
    let any = matches!(
        op,
        Operator::MemberOfAny | Operator::DeviceMemberOfAny | Operator::NotMemberOfAny | Operator::NotDeviceMemberOfAny
    );

    let matched = match &arg.operand {
        Operand::Sid(sid) => sids.contains(sid),
        Operand::Composite(members) => {
            if members.is_empty() {
                return Err(Error::invalid("membership test against an empty list"));
            }
            let mut matched = !any;
            for member in members {
                let Operand::Sid(sid) = &member.operand else {
                    return Err(Error::invalid("membership list holds a non-SID"));
                };
                let found = sids.contains(sid);
                if any && found {
                    matched = true;
                    break;
                }
                if !any && !found {
                    matched = false;
                    break;
                }
            }
            matched
        },
        _ => return Err(Error::invalid("membership test needs a SID or a list of SIDs")),
    };

    Ok(AceConditionResult::from_bool(matched != negate))
}

fn relational( op: Operator, lhs: &Value, rhs: &Value ) -> Result<AceConditionResult> {
    if matches!(lhs.operand, Operand::Null) || matches!(rhs.operand, Operand::Null) {
        return Ok(AceConditionResult::Unknown);
    }
    if !lhs.is_from_attr() {
        return Err(Error::invalid("left operand of a comparison must be an attribute"));
    }

    let ordered = matches!(op, Operator::LessThan | Operator::LessOrEqual | Operator::GreaterThan | Operator::GreaterOrEqual);
    if ordered && !matches!(lhs.operand, Operand::Int(_) | Operand::Unicode(_) | Operand::OctetString(_)) {
        return Err(Error::invalid("ordering comparison on a non-scalar"));
    }

    let answer = match op {
        Operator::Equal => compare(op, lhs, rhs)?.is_eq(),
        Operator::NotEqual => compare(op, lhs, rhs)?.is_ne(),
        Operator::LessThan => compare(op, lhs, rhs)?.is_lt(),
        Operator::LessOrEqual => compare(op, lhs, rhs)?.is_le(),
        Operator::GreaterThan => compare(op, lhs, rhs)?.is_gt(),
        Operator::GreaterOrEqual => compare(op, lhs, rhs)?.is_ge(),
        Operator::Contains => contains(lhs, rhs)?,
        Operator::NotContains => !contains(lhs, rhs)?,
        Operator::AnyOf => any_of(lhs, rhs)?,
        Operator::NotAnyOf => !any_of(lhs, rhs)?,
        _ => return Err(Error::invalid(format!("{} is not a comparison", op))),
    };
    Ok(AceConditionResult::from_bool(answer))
}

/// Different kinds only compare when both are integers, or for `==`/`!=` a boolean against 0 or 1.
fn comparable( op: Option<Operator>, lhs: &Value, rhs: &Value ) -> bool {
    if lhs.same_kind(rhs) {
        return true;
    }
    if matches!(op, Some(op) if op != Operator::Equal && op != Operator::NotEqual) {
        return false;
    }
    match (&lhs.operand, &rhs.operand) {
        (Operand::Int(n), Operand::Bool(_)) | (Operand::Bool(_), Operand::Int(n)) => *n == 0 || *n == 1,
        _ => false,
    }
}

fn compare( op: Operator, lhs: &Value, rhs: &Value ) -> Result<Ordering> {
    if !comparable(Some(op), lhs, rhs) {
        return Err(Error::invalid("operands are not comparable"));
    }
    match (&lhs.operand, &rhs.operand) {
        (Operand::Bool(_), _) | (_, Operand::Bool(_)) => compare_bools(op, lhs, rhs),
        (Operand::Int(a), Operand::Int(b)) => Ok(a.cmp(b)),
        (Operand::Unicode(a), Operand::Unicode(b)) => {
            if lhs.is_case_sensitive() || rhs.is_case_sensitive() {
                Ok(a.cmp(b))
            } else {
                Ok(compare_strings_nocase(a, b))
            }
        },
        (Operand::OctetString(a), Operand::OctetString(b)) => Ok(a.cmp(b)),
        (Operand::Sid(a), Operand::Sid(b)) => Ok(a.cmp(b)),
        (Operand::Composite(_), Operand::Composite(_)) => compare_composites(lhs, rhs),
        _ => Err(Error::invalid("operands are not comparable")),
    }
}

fn compare_bools( op: Operator, lhs: &Value, rhs: &Value ) -> Result<Ordering> {
    if lhs.is_literal() {
        return Err(Error::invalid("boolean comparison with a literal on the left"));
    }
    if op != Operator::Equal && op != Operator::NotEqual {
        return Err(Error::invalid("booleans only compare for equality"));
    }
    let rank = |r: AceConditionResult| match r {
        AceConditionResult::True => Ok(1),
        AceConditionResult::False => Ok(0),
        AceConditionResult::Unknown => Err(Error::invalid("comparison with an unknown boolean")),
    };
    Ok(rank(lhs.truth())?.cmp(&rank(rhs.truth())?))
}

/// Composites only compare as equal or not equal; `Less` stands for not equal.
fn compare_composites( lhs: &Value, rhs: &Value ) -> Result<Ordering> {
    let (Operand::Composite(lc), Operand::Composite(rc)) = (&lhs.operand, &rhs.operand) else {
        return Err(Error::invalid("composite comparison on a non-composite"));
    };
    if !lhs.flags.contains(ValueFlags::UNIQUE_AND_SORTED) {
        return Err(Error::invalid("left composite is not unique and sorted"));
    }

    if lc.is_empty() {
        return Ok(if rc.is_empty() { Ordering::Equal } else { Ordering::Less });
    }
    if rc.is_empty() {
        return Ok(Ordering::Less);
    }
    let rhs_sorted = rhs.flags.contains(ValueFlags::UNIQUE_AND_SORTED);
    if lc.len() > rc.len() || (lc.len() < rc.len() && rhs_sorted) {
        composite_is_comparable(&lc[0], rhs)?;
        return Ok(Ordering::Less);
    }
    compare_composites_via_sort(lhs, lc, rhs, rc)
}

fn composite_is_comparable( value: &Value, composite: &Value ) -> Result<()> {
    let Operand::Composite(members) = &composite.operand else {
        return Err(Error::invalid("composite comparison on a non-composite"));
    };
    let n = if composite.flags.contains(ValueFlags::UNIQUE_AND_SORTED) { members.len().min(1) } else { members.len() };
    if members[..n].iter().all(|m| comparable(None, value, m)) {
        Ok(())
    } else {
        Err(Error::invalid("composite members are not comparable"))
    }
}

/// Every left member must equal some right member and vice versa. The right side may hold
/// duplicates only when it came from a literal.
fn compare_composites_via_sort( lhs: &Value, lc: &[Value], rhs: &Value, rc: &[Value] ) -> Result<Ordering> {
    let mut case_sensitive = lhs.is_case_sensitive();
    let rhs_case_sensitive = rhs.is_case_sensitive();
    let mut rhs_sorted = rhs.flags.contains(ValueFlags::UNIQUE_AND_SORTED);

    let mut left = lc.to_vec();
    if !matches!(lc[0].operand, Operand::Unicode(_)) {
        case_sensitive = false;
    } else if case_sensitive && !rhs_case_sensitive {
        rhs_sorted = false;
    } else if !case_sensitive && rhs_case_sensitive {
        // the right side asks for case; re-sort the left to match
        case_sensitive = true;
        left = sorted_copy(lc, true)?;
    }

    let right = if rhs_sorted { rc.to_vec() } else { sorted_copy(rc, case_sensitive)? };

    let right = if right.len() > left.len() {
        let mut unique: Vec<Value> = Vec::with_capacity(right.len());
        for value in right {
            if let Some(last) = unique.last() {
                if compare(Operator::Equal, last, &value)?.is_eq() {
                    continue;
                }
            }
            unique.push(value);
        }
        if unique.len() != left.len() {
            return Ok(Ordering::Less);
        }
        unique
    } else {
        right
    };

    for (l, r) in left.iter().zip(right.iter()) {
        if compare(Operator::Equal, l, r)?.is_ne() {
            return Ok(Ordering::Less);
        }
    }
    Ok(Ordering::Equal)
}

/// Members must all be scalars of the kind of the first one; anything else is refused before sorting.
fn sorted_copy( members: &[Value], case_sensitive: bool ) -> Result<Vec<Value>> {
    let Some(first) = members.first() else {
        return Ok(Vec::new());
    };
    let scalar = matches!(first.operand, Operand::Int(_) | Operand::Unicode(_) | Operand::OctetString(_) | Operand::Sid(_));
    if !scalar || !members.iter().all(|m| m.same_kind(first)) {
        return Err(Error::invalid("composite members cannot be ordered"));
    }

    let case_sensitive = case_sensitive || members.iter().any(Value::is_case_sensitive);
    let mut copy = members.to_vec();
    if case_sensitive {
        for value in &mut copy {
            value.flags |= ValueFlags::CASE_SENSITIVE;
        }
    }

    copy.sort_by(|a, b| match (&a.operand, &b.operand) {
        (Operand::Int(x), Operand::Int(y)) => x.cmp(y),
        (Operand::Unicode(x), Operand::Unicode(y)) if case_sensitive => x.cmp(y),
        (Operand::Unicode(x), Operand::Unicode(y)) => compare_strings_nocase(x, y),
        (Operand::OctetString(x), Operand::OctetString(y)) => x.cmp(y),
        (Operand::Sid(x), Operand::Sid(y)) => x.cmp(y),
        // unreachable after the kind check above
        _ => Ordering::Equal,
    });
    Ok(copy)
}

fn find_in_composite( value: &Value, candidates: &[Value] ) -> Result<bool> {
    for candidate in candidates {
        if compare(Operator::Equal, value, candidate)?.is_eq() {
            return Ok(true);
        }
    }
    Ok(false)
}

fn contains( lhs: &Value, rhs: &Value ) -> Result<bool> {
    match (&lhs.operand, &rhs.operand) {
        (Operand::Composite(candidates), Operand::Composite(required)) => {
            if required.is_empty() {
                return Err(Error::invalid("Contains with an empty list"));
            }
            for value in required {
                if !find_in_composite(value, candidates)? {
                    return Ok(false);
                }
            }
            Ok(true)
        },
        (Operand::Composite(candidates), _) => find_in_composite(rhs, candidates),
        (_, Operand::Composite(required)) => {
            if required.is_empty() {
                return Err(Error::invalid("Contains with an empty list"));
            }
            for value in required {
                if compare(Operator::Equal, lhs, value)?.is_ne() {
                    return Ok(false);
                }
            }
            Ok(true)
        },
        _ => Ok(compare(Operator::Equal, lhs, rhs)?.is_eq()),
    }
}

fn any_of( lhs: &Value, rhs: &Value ) -> Result<bool> {
    let (lhs, rhs) = if matches!(lhs.operand, Operand::Composite(_)) { (lhs, rhs) } else { (rhs, lhs) };
    match (&lhs.operand, &rhs.operand) {
        (Operand::Composite(left), Operand::Composite(right)) => {
            if left.is_empty() {
                return Err(Error::invalid("Any_of with an empty list"));
            }
            for value in left {
                if find_in_composite(value, right)? {
                    return Ok(true);
                }
            }
            Ok(false)
        },
        (Operand::Composite(left), _) => find_in_composite(rhs, left),
        _ => Ok(compare(Operator::Equal, lhs, rhs)?.is_eq()),
    }
}
