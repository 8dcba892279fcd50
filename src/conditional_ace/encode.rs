use crate::{
    conditional_ace::token::{ConditionalAceProgram, ConditionalAceToken, IntLiteral, Literal, CONDITIONAL_ACE_MAGIC},
    error::{Error, Result},
    limits::CONDITIONAL_ACE_MAX_LENGTH,
    utils::{string_to_utf16le, ByteWriter},
};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Serializes a program into the blob stored after the trustee of a callback ACE.
///
/// The result starts with `artx` and is zero-padded to a multiple of 4 bytes.
pub fn conditional_ace_encode_binary( program: &ConditionalAceProgram ) -> Result<Vec<u8>> {
    let mut w = ByteWriter::new();
    w.put_bytes(&CONDITIONAL_ACE_MAGIC);

    for token in &program.tokens {
        match token {
            ConditionalAceToken::Operator(op) => w.put_u8(op.opcode()),
            ConditionalAceToken::Attribute { class, name } => {
                w.put_u8(class.opcode());
                put_unicode(&mut w, name)?;
            },
            ConditionalAceToken::Literal(literal) => put_literal(&mut w, literal)?,
        }
        if w.len() >= CONDITIONAL_ACE_MAX_LENGTH {
            return Err(Error::limit("conditional ACE length"));
        }
    }

    w.pad_to(4);
    if w.len() > CONDITIONAL_ACE_MAX_LENGTH {
        return Err(Error::limit("conditional ACE length"));
    }
    Ok(w.into_vec())
}

fn put_literal( w: &mut ByteWriter, literal: &Literal ) -> Result<()> {
    w.put_u8(literal.opcode());
    match literal {
        Literal::Int(int) => put_int(w, int)?,
        Literal::Unicode(s) => put_unicode(w, s)?,
        Literal::OctetString(bytes) => {
            w.put_u32_le(length_u32(bytes.len())?);
            w.put_bytes(bytes);
        },
        Literal::Sid(sid) => {
            w.put_u32_le(sid.len() as u32);
            sid.write_to(w);
        },
        Literal::Composite(members) => {
            let len_at = w.len();
            w.put_u32_le(0);
            for member in members {
                put_literal(w, member)?;
                if w.len() >= CONDITIONAL_ACE_MAX_LENGTH {
                    return Err(Error::limit("conditional ACE length"));
                }
            }
            let len = w.len() - len_at - 4;
            w.set_u32_at(len_at, length_u32(len)?);
        },
    }
    Ok(())
}

fn put_int( w: &mut ByteWriter, int: &IntLiteral ) -> Result<()> {
    int.check_range()?;
    w.put_i64_le(int.value);
    w.put_u8(int.sign as u8);
    w.put_u8(int.base as u8);
    Ok(())
}

fn put_unicode( w: &mut ByteWriter, s: &str ) -> Result<()> {
    let bytes = string_to_utf16le(s);
    w.put_u32_le(length_u32(bytes.len())?);
    w.put_bytes(&bytes);
    Ok(())
}

fn length_u32( len: usize ) -> Result<u32> {
    if len >= CONDITIONAL_ACE_MAX_LENGTH {
        return Err(Error::limit("conditional ACE length"));
    }
    Ok(len as u32)
}
