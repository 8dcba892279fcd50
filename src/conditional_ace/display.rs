//! Renders conditional ACE programs back to SDDL, and as a token listing for debugging.

use core::fmt::Write as _;

use crate::{
    claims::{ClaimSecurityAttribute, ClaimValues},
    conditional_ace::token::{
        AttributeClass, ConditionalAceProgram, ConditionalAceToken, IntBase, IntLiteral, IntSign,
        IntWidth, Literal, Operator,
    },
    error::{Error, Result},
    sddl::sddl_encode_sid,
};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn arity( token: &ConditionalAceToken ) -> usize {
    match token {
        ConditionalAceToken::Operator(op) => op.arity(),
        _ => 0,
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Node {
    lhs: Option<usize>,
    rhs: Option<usize>,
    parens: bool,
}

/// Binary operators and the member-of family are always parenthesised.
fn wants_outer_parens( token: &ConditionalAceToken, node: &Node ) -> bool {
    node.lhs.is_some() || matches!(token, ConditionalAceToken::Operator(op) if op.is_member_of())
}

struct TreeWriter<'a> {
    tokens: &'a [ConditionalAceToken],
    nodes: Vec<Node>,
    out: String,
}

impl<'a> TreeWriter<'a> {
    fn resolve_parens( &mut self, index: usize ) {
        let node = self.nodes[index];
        let token = &self.tokens[index];
        if wants_outer_parens(token, &node) {
            self.nodes[index].parens = true;
        }
        let logical = matches!(token, ConditionalAceToken::Operator(Operator::Not | Operator::And | Operator::Or));
        for child in [node.lhs, node.rhs].into_iter().flatten() {
            // arguments of logical operators get parentheses unless they bring their own
            let own = wants_outer_parens(&self.tokens[child], &self.nodes[child]);
            self.nodes[child].parens = logical && !own;
            self.resolve_parens(child);
        }
    }

    fn write_tree( &mut self, index: usize ) -> Result<()> {
        let node = self.nodes[index];
        if node.parens {
            self.out.push('(');
        }
        if let Some(lhs) = node.lhs {
            self.write_tree(lhs)?;
            self.out.push(' ');
        }

        let tokens = self.tokens;
        let token = &tokens[index];
        write_token(&mut self.out, token)?;

        if let Some(rhs) = node.rhs {
            // "!(x)", not "! (x)"
            if *token != ConditionalAceToken::Operator(Operator::Not) {
                self.out.push(' ');
            }
            self.write_tree(rhs)?;
        }
        if node.parens {
            self.out.push(')');
        }
        Ok(())
    }
}

/// Converts a program to its SDDL text, such as `(@USER.Title == "Manager")`.
///
/// # Remarks
/// Fails when the program does not reduce to a single expression, or holds a value that SDDL
/// cannot express (a string containing `"`, an attribute name containing NUL).
pub fn sddl_from_conditional_ace( program: &ConditionalAceProgram ) -> Result<String> {
    if program.is_empty() {
        return Ok("()".to_string());
    }

    // Rebuild the expression tree: each operator adopts the subtrees it consumes.
    let tokens = &program.tokens;
    let mut nodes = vec![Node::default(); tokens.len()];
    let mut trees: Vec<usize> = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        let nargs = arity(token);
        if nargs > trees.len() {
            return Err(Error::encode(format!("operator at token {i} lacks arguments")));
        }
        if nargs >= 1 {
            nodes[i].rhs = trees.pop();
        }
        if nargs == 2 {
            nodes[i].lhs = trees.pop();
        }
        trees.push(i);
    }
    let &[root] = trees.as_slice() else {
        return Err(Error::encode(format!("program leaves {} values on the stack", trees.len())));
    };

    let mut writer = TreeWriter {
        tokens,
        nodes,
        out: String::new(),
    };
    writer.resolve_parens(root);
    writer.nodes[root].parens = true;
    writer.write_tree(root)?;
    Ok(writer.out)
}

fn write_token( out: &mut String, token: &ConditionalAceToken ) -> Result<()> {
    match token {
        ConditionalAceToken::Operator(op) => {
            out.push_str(op.sddl_name());
            Ok(())
        },
        ConditionalAceToken::Attribute { class, name } => {
            if *class != AttributeClass::Local {
                out.push('@');
                out.push_str(class.sddl_prefix());
            }
            out.push_str(&encode_attr_name(name)?);
            Ok(())
        },
        ConditionalAceToken::Literal(literal) => write_literal(out, literal),
    }
}

fn write_literal( out: &mut String, literal: &Literal ) -> Result<()> {
    match literal {
        Literal::Int(i) => out.push_str(&format_int(i)?),
        Literal::Unicode(s) => out.push_str(&quote_unicode(s)?),
        Literal::OctetString(bytes) => {
            out.push('#');
            out.push_str(&hex_lower(bytes));
        },
        Literal::Sid(sid) => {
            out.push_str("SID(");
            out.push_str(&sddl_encode_sid(sid, None));
            out.push(')');
        },
        Literal::Composite(members) => {
            out.push('{');
            for (i, member) in members.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_literal(out, member)?;
            }
            out.push('}');
        },
    }
    Ok(())
}

/// Writes an integer the way it was originally spelled: same base, same explicit sign.
/// Unsigned negative values still get a leading '-', as the text form has no two's complement.
fn format_int( i: &IntLiteral ) -> Result<String> {
    let v = i.value;
    let sign = match i.sign {
        IntSign::None if v < 0 => "-",
        IntSign::None => "",
        IntSign::Positive if v < 0 => return Err(Error::encode(format!("{v} is marked positive"))),
        // "-0" is allowed
        IntSign::Negative if v > 0 => return Err(Error::encode(format!("{v} is marked negative"))),
        IntSign::Positive => "+",
        IntSign::Negative => "-",
    };

    let abs = v.unsigned_abs();
    Ok(match i.base {
        IntBase::Decimal => format!("{sign}{abs}"),
        IntBase::Octal => format!("{sign}0{abs:o}"),
        IntBase::Hex => format!("{sign}0x{abs:x}"),
    })
}

fn quote_unicode( s: &str ) -> Result<String> {
    // SDDL has no escapes inside strings
    if s.contains('"') {
        return Err(Error::encode("string literal contains '\"'"));
    }
    Ok(format!("\"{s}\""))
}

fn hex_lower( bytes: &[u8] ) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

fn should_escape( c: u16 ) -> bool {
    c <= u16::from(b' ') || c > 126 || b"!\"&()<=>|%".iter().any(|e| u16::from(*e) == c)
}

/// Escapes an attribute name with `%XXXX` UTF-16 code units where SDDL requires it.
pub(crate) fn encode_attr_name( name: &str ) -> Result<String> {
    let mut out = String::with_capacity(name.len());
    for c in name.encode_utf16() {
        if c == 0 {
            return Err(Error::encode("attribute name contains NUL"));
        }
        if should_escape(c) {
            let _ = write!(out, "%{c:04x}");
        } else {
            out.push(char::from(c as u8));
        }
    }
    Ok(out)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Renders a resource attribute claim as `("name",T<type>,0x<flags>,<values>)`.
pub fn sddl_resource_attr_from_claim( claim: &ClaimSecurityAttribute ) -> Result<String> {
    let mut values = Vec::with_capacity(claim.value_count());
    let type_char = match &claim.values {
        ClaimValues::Int64(v) => {
            values.extend(v.iter().map(|x| x.to_string()));
            'I'
        },
        ClaimValues::Uint64(v) => {
            values.extend(v.iter().map(|x| x.to_string()));
            'U'
        },
        ClaimValues::String(v) => {
            for s in v {
                values.push(quote_unicode(s)?);
            }
            'S'
        },
        ClaimValues::Sid(v) => {
            // no SID(...) wrapper here
            values.extend(v.iter().map(|sid| sddl_encode_sid(sid, None)));
            'D'
        },
        ClaimValues::Boolean(v) => {
            values.extend(v.iter().map(|b| if *b { "1" } else { "0" }.to_string()));
            'B'
        },
        ClaimValues::OctetString(v) => {
            // and no leading '#'
            values.extend(v.iter().map(|b| hex_lower(b)));
            'X'
        },
    };

    Ok(format!(
        "(\"{}\",T{},0x{:x},{})",
        encode_attr_name(&claim.name)?,
        type_char,
        claim.flags.bits(),
        values.join(",")
    ))
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

const DEBUG_STACK_WIDTH: usize = 10;

fn debug_describe( token: &ConditionalAceToken ) -> (char, String, String) {
    match token {
        ConditionalAceToken::Operator(op) => ('b', op.sddl_name().to_string(), "bool".to_string()),
        ConditionalAceToken::Attribute { class, name } => {
            let kind = match class {
                AttributeClass::Local => "local attribute",
                AttributeClass::User => "user attribute",
                AttributeClass::Resource => "resource attribute",
                AttributeClass::Device => "device attribute",
            };
            ('?', kind.to_string(), format!(".{name}  (any type)"))
        },
        ConditionalAceToken::Literal(literal) => match literal {
            Literal::Int(i) => {
                let kind = match i.width {
                    IntWidth::Int8 => "8-bit integer",
                    IntWidth::Int16 => "16-bit integer",
                    IntWidth::Int32 => "32-bit integer",
                    IntWidth::Int64 => "64-bit integer",
                };
                (
                    'i',
                    kind.to_string(),
                    format!("{} {}{}", i.value, i.sign.debug_char(), i.base.debug_char()),
                )
            },
            Literal::Unicode(s) => ('u', "unicode".to_string(), format!(".{s}  (any type)")),
            Literal::OctetString(bytes) => {
                let shown = &bytes[..bytes.len().min(9)];
                ('o', "byte string".to_string(), format!("{} ({})", hex_lower(shown), shown.len()))
            },
            Literal::Sid(sid) => ('S', "SID".to_string(), format!("({})", sddl_encode_sid(sid, None))),
            Literal::Composite(members) => {
                ('C', "composite list".to_string(), format!("{} direct members", members.len()))
            },
        },
    }
}

/// Lists a program one token per line, with a sketch of the evaluation stack on the left.
///
/// The last line says whether the program leaves exactly one boolean, which is what a
/// well-formed condition must do.
pub fn debug_conditional_ace( program: &ConditionalAceProgram ) -> String {
    let mut out = String::new();
    let mut stack = [' '; DEBUG_STACK_WIDTH];
    let mut depth = 0usize;

    for token in &program.tokens {
        let (kind, name, detail) = debug_describe(token);
        let nargs = arity(token);

        if nargs > depth {
            let _ = write!(out, "UNDER: -{}", nargs - depth);
            depth = 0;
        } else if depth >= DEBUG_STACK_WIDTH {
            let _ = write!(out, "depth {depth}");
            depth = depth + 1 - nargs;
        } else {
            depth -= nargs;
            stack[depth] = kind;
            depth += 1;
            if depth < DEBUG_STACK_WIDTH {
                stack[depth] = ' ';
            }
            out.extend(stack.iter());
        }
        let _ = writeln!(out, "{name:>20}  {detail}");
    }

    if depth == 1 && stack[0] == 'b' {
        out.push_str("GOOD: finishes on a single bool\n");
    } else {
        out.push_str("BAD: should finish with a bool\n");
    }
    out
}
