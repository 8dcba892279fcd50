//! Conditional ACE expressions: the binary token stream, its SDDL form, and evaluation.

pub(crate) mod compile;
pub(crate) mod display;
mod encode;
mod parse;
mod run;
mod token;

pub use compile::{
    ace_conditions_compile_sddl, ace_conditions_compile_sddl_with, parse_sddl_literal_as_claim,
    ConditionCompileError,
};
pub use display::{debug_conditional_ace, sddl_from_conditional_ace, sddl_resource_attr_from_claim};
pub use encode::conditional_ace_encode_binary;
pub use parse::{parse_conditional_ace, parse_conditional_ace_with_limits};
pub use run::{
    access_check_conditional_ace, access_check_conditional_ace_with_limits, run_conditional_ace,
    run_conditional_ace_with_limits, AceConditionResult, ConditionalAceCheck,
};
pub use token::{
    AttributeClass, ConditionalAceProgram, ConditionalAceToken, IntBase, IntLiteral, IntSign, IntWidth,
    Literal, Operator, CONDITIONAL_ACE_MAGIC,
};
