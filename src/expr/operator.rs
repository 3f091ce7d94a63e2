//! Operator tables: result types, families, and textual symbols.
//!
//! Binary and unary symbols live in two separate tables because C reuses
//! `-` for subtraction and negation. Callers pick the table by arity.

use super::{ParseError, Type};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    Or,
    And,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    Not,
    BvAnd,
    BvXor,
    BvOr,
    BvShl,
    BvShr,
    BvNot,
    /// Separates the bitwise part of a synthesized expression from the arithmetic part.
    BvToInt,
    IntToBv,
    /// Only used when normalising `INT2` legs; the runtime understands no other cast.
    IntCast,
}

/// Coarse grouping used when deciding whether two operators are alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorFamily {
    Comparison,
    Logical,
    Arithmetic,
    Bitwise,
    Conversion,
}

const BINARY_SYMBOLS: &[(&str, Operator)] = &[
    ("==", Operator::Eq),
    ("!=", Operator::Neq),
    ("<", Operator::Lt),
    ("<=", Operator::Le),
    (">", Operator::Gt),
    (">=", Operator::Ge),
    ("||", Operator::Or),
    ("&&", Operator::And),
    ("+", Operator::Add),
    ("-", Operator::Sub),
    ("*", Operator::Mul),
    ("/", Operator::Div),
    ("%", Operator::Mod),
    ("&", Operator::BvAnd),
    ("^", Operator::BvXor),
    ("|", Operator::BvOr),
    ("<<", Operator::BvShl),
    (">>", Operator::BvShr),
];

const UNARY_SYMBOLS: &[(&str, Operator)] = &[
    ("-", Operator::Neg),
    ("!", Operator::Not),
    ("~", Operator::BvNot),
];

impl Operator {
    pub const ALL: [Operator; 24] = [
        Operator::Eq,
        Operator::Neq,
        Operator::Lt,
        Operator::Le,
        Operator::Gt,
        Operator::Ge,
        Operator::Or,
        Operator::And,
        Operator::Add,
        Operator::Sub,
        Operator::Mul,
        Operator::Div,
        Operator::Mod,
        Operator::Neg,
        Operator::Not,
        Operator::BvAnd,
        Operator::BvXor,
        Operator::BvOr,
        Operator::BvShl,
        Operator::BvShr,
        Operator::BvNot,
        Operator::BvToInt,
        Operator::IntToBv,
        Operator::IntCast,
    ];

    /// Number of arguments the operator takes.
    pub fn arity(self) -> usize {
        match self {
            Operator::Neg
            | Operator::Not
            | Operator::BvNot
            | Operator::BvToInt
            | Operator::IntToBv
            | Operator::IntCast => 1,
            _ => 2,
        }
    }

    pub fn is_binary(self) -> bool {
        self.arity() == 2
    }

    pub fn family(self) -> OperatorFamily {
        match self {
            Operator::Eq
            | Operator::Neq
            | Operator::Lt
            | Operator::Le
            | Operator::Gt
            | Operator::Ge => OperatorFamily::Comparison,
            Operator::Or | Operator::And | Operator::Not => OperatorFamily::Logical,
            Operator::Add
            | Operator::Sub
            | Operator::Mul
            | Operator::Div
            | Operator::Mod
            | Operator::Neg => OperatorFamily::Arithmetic,
            Operator::BvAnd
            | Operator::BvXor
            | Operator::BvOr
            | Operator::BvShl
            | Operator::BvShr
            | Operator::BvNot => OperatorFamily::Bitwise,
            Operator::BvToInt | Operator::IntToBv | Operator::IntCast => {
                OperatorFamily::Conversion
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(operator_to_string(*self))
    }
}

/// Result type of every node carrying `op`.
pub fn operator_type(op: Operator) -> Type {
    match op.family() {
        OperatorFamily::Comparison | OperatorFamily::Logical => Type::Boolean,
        OperatorFamily::Arithmetic => Type::Integer,
        OperatorFamily::Bitwise => Type::Bitvector,
        OperatorFamily::Conversion => match op {
            Operator::IntToBv => Type::Bitvector,
            _ => Type::Integer,
        },
    }
}

pub fn binary_operator_by_string(repr: &str) -> Result<Operator, ParseError> {
    lookup(BINARY_SYMBOLS, repr, "binary")
}

pub fn unary_operator_by_string(repr: &str) -> Result<Operator, ParseError> {
    lookup(UNARY_SYMBOLS, repr, "unary")
}

fn lookup(
    table: &[(&'static str, Operator)],
    repr: &str,
    arity: &'static str,
) -> Result<Operator, ParseError> {
    if let Some((_, op)) = table.iter().find(|(symbol, _)| *symbol == repr) {
        return Ok(*op);
    }

    // Offer the closest symbol of the same arity, if any is close enough.
    let suggestion = table
        .iter()
        .map(|(symbol, _)| (*symbol, strsim::levenshtein(symbol, repr)))
        .filter(|(_, distance)| *distance <= 1)
        .min_by_key(|(_, distance)| *distance)
        .map(|(symbol, _)| symbol);

    Err(ParseError::UnknownOperator {
        token: repr.to_string(),
        arity,
        suggestion,
    })
}

pub fn operator_to_string(op: Operator) -> &'static str {
    match op {
        Operator::Eq => "==",
        Operator::Neq => "!=",
        Operator::Lt => "<",
        Operator::Le => "<=",
        Operator::Gt => ">",
        Operator::Ge => ">=",
        Operator::Or => "||",
        Operator::And => "&&",
        Operator::Add => "+",
        Operator::Sub | Operator::Neg => "-",
        Operator::Mul => "*",
        Operator::Div => "/",
        Operator::Mod => "%",
        Operator::Not => "!",
        Operator::BvAnd => "&",
        Operator::BvXor => "^",
        Operator::BvOr => "|",
        Operator::BvShl => "<<",
        Operator::BvShr => ">>",
        Operator::BvNot => "~",
        Operator::BvToInt => "bv_to_int",
        Operator::IntToBv => "int_to_bv",
        Operator::IntCast => "int_cast",
    }
}
