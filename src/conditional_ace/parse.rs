use tracing::trace;

use crate::{
    conditional_ace::token::{
        opcode, AttributeClass, ConditionalAceProgram, ConditionalAceToken, IntBase, IntLiteral, IntSign, IntWidth,
        Literal, Operator, CONDITIONAL_ACE_MAGIC,
    },
    error::{Error, ErrorKind, Result},
    limits::Limits,
    sid::SID,
    utils::{utf16le_to_string, ByteReader},
};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Decodes the condition blob of a callback ACE into a postfix program.
///
/// # Errors
/// Any structural problem (missing magic, bad alignment, truncated token, unknown opcode,
/// out-of-range integer, non-zero padding) is an error. Nothing here checks that the
/// program is well typed; that happens when it runs.
pub fn parse_conditional_ace( data: &[u8] ) -> Result<ConditionalAceProgram> {
    parse_conditional_ace_with_limits(data, &Limits::default())
}

pub fn parse_conditional_ace_with_limits( data: &[u8], limits: &Limits ) -> Result<ConditionalAceProgram> {
    if data.len() < CONDITIONAL_ACE_MAGIC.len() || data[..4] != CONDITIONAL_ACE_MAGIC {
        trace!(len = data.len(), "conditional ACE lacks magic");
        return Err(Error::invalid("conditional ACE lacks 'artx' magic"));
    }
    if data.len() > limits.max_program_length {
        return Err(Error::limit("conditional ACE length"));
    }
    if data.len() % 4 != 0 {
        return Err(Error::invalid("conditional ACE length is not a multiple of 4"));
    }

    let mut parser = Parser {
        limits,
        seen: 0,
    };
    let mut r = ByteReader::new(&data[4..]);
    let mut tokens = Vec::new();

    while !r.is_empty() {
        let offset = 4 + r.position();
        let op = r.read_u8()?;

        if op == opcode::PADDING {
            parser.end_padding(&mut r)?;
            break;
        }

        parser.count()?;
        let token = match parser.token(op, &mut r) {
            Ok(token) => token,
            Err(err) => {
                trace!(offset, opcode = op, reason = %err, "conditional ACE token rejected");
                return Err(err);
            },
        };
        tokens.push(token);
    }

    Ok(ConditionalAceProgram::new(tokens))
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

struct Parser<'l> {
    limits: &'l Limits,
    seen: usize,
}

impl<'l> Parser<'l> {
    fn count( &mut self ) -> Result<()> {
        self.seen += 1;
        if self.seen > self.limits.max_tokens {
            return Err(Error::limit("conditional ACE token count"));
        }
        Ok(())
    }

    /// One zero byte has been read already; at most two more may follow and all must be zero.
    fn end_padding( &self, r: &mut ByteReader<'_> ) -> Result<()> {
        let rest = r.rest();
        if rest.len() > 2 || rest.iter().any(|b| *b != 0) {
            return Err(Error::invalid("bad padding at end of conditional ACE"));
        }
        r.take(rest.len())?;
        Ok(())
    }

    fn token( &mut self, op: u8, r: &mut ByteReader<'_> ) -> Result<ConditionalAceToken> {
        if let Some(operator) = Operator::from_opcode(op) {
            return Ok(ConditionalAceToken::Operator(operator));
        }
        if let Some(class) = AttributeClass::from_opcode(op) {
            let name = read_unicode(r)?;
            return Ok(ConditionalAceToken::Attribute { class, name });
        }
        Ok(ConditionalAceToken::Literal(self.literal(op, r, 0)?))
    }

    fn literal( &mut self, op: u8, r: &mut ByteReader<'_>, depth: usize ) -> Result<Literal> {
        let literal = match op {
            opcode::INT8 => Literal::Int(read_int(r, IntWidth::Int8)?),
            opcode::INT16 => Literal::Int(read_int(r, IntWidth::Int16)?),
            opcode::INT32 => Literal::Int(read_int(r, IntWidth::Int32)?),
            opcode::INT64 => Literal::Int(read_int(r, IntWidth::Int64)?),
            opcode::UNICODE => Literal::Unicode(read_unicode(r)?),
            opcode::OCTET_STRING => {
                let len = r.read_u32_le()? as usize;
                Literal::OctetString(r.take(len)?.to_vec())
            },
            opcode::SID => {
                let len = r.read_u32_le()? as usize;
                Literal::Sid(SID::from_bytes(r.take(len)?)?)
            },
            opcode::COMPOSITE => Literal::Composite(self.composite(r, depth + 1)?),
            _ => return Err(ErrorKind::UnknownOpcode(op).into()),
        };
        Ok(literal)
    }

    fn composite( &mut self, r: &mut ByteReader<'_>, depth: usize ) -> Result<Vec<Literal>> {
        if depth > self.limits.max_composite_depth {
            return Err(Error::limit("composite nesting depth"));
        }

        let len = r.read_u32_le()? as usize;
        let mut body = ByteReader::new(r.take(len)?);
        let mut members = Vec::new();
        while !body.is_empty() {
            let op = body.read_u8()?;
            self.count()?;
            members.push(self.literal(op, &mut body, depth)?);
        }
        Ok(members)
    }
}

fn read_int( r: &mut ByteReader<'_>, width: IntWidth ) -> Result<IntLiteral> {
    let value = r.read_i64_le()?;
    let sign = r.read_u8()?;
    let base = r.read_u8()?;

    let sign = IntSign::from_u8(sign).ok_or_else(|| Error::invalid(format!("bad integer sign {}", sign)))?;
    let base = IntBase::from_u8(base).ok_or_else(|| Error::invalid(format!("bad integer base {}", base)))?;

    let literal = IntLiteral {
        value,
        width,
        sign,
        base,
    };
    literal.check_range()?;
    Ok(literal)
}

fn read_unicode( r: &mut ByteReader<'_> ) -> Result<String> {
    let len = r.read_u32_le()? as usize;
    utf16le_to_string(r.take(len)?)
}
