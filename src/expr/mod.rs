//! Typed symbolic expressions over C scalars.
//!
//! Every node is an [`Expression`]: one flat product type whose [`Kind`]
//! tells leaves, operators, and the auxiliary placeholders used during
//! decoding apart. Operator node types come from [`operator_type`], never
//! from per-node state.

pub mod errors;
pub mod operator;
pub mod render;

pub use errors::{ParseError, WellFormednessError};
pub use operator::{
    binary_operator_by_string, operator_to_string, operator_type, unary_operator_by_string,
    Operator, OperatorFamily,
};
pub use render::expression_to_string;

use std::fmt;

/// Raw type given to the null pointer; assignable to any pointer component.
pub const ANY_POINTEE: &str = "void";

/// Raw type of literals produced by the synthesizer.
pub const DEFAULT_INTEGER_TYPE: &str = "int";

/// Identifier used for the free parameter slot.
pub const PARAMETER_REPR: &str = "$param";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Operator,
    Variable,
    Constant,
    Parameter,
    // auxiliary kinds, only produced while decoding
    Bv2,
    Int2,
    Bool2,
    Bool3,
}

impl Kind {
    pub fn is_auxiliary(self) -> bool {
        matches!(self, Kind::Bv2 | Kind::Int2 | Kind::Bool2 | Kind::Bool3)
    }

    pub fn is_leaf(self) -> bool {
        matches!(self, Kind::Variable | Kind::Constant | Kind::Parameter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Boolean,
    Integer,
    Pointer,
    Bitvector,
}

impl Type {
    /// Integer and bitvector values can flow into arithmetic or comparisons.
    pub fn is_numeric(self) -> bool {
        matches!(self, Type::Integer | Type::Bitvector)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expression {
    pub kind: Kind,
    pub ty: Type,
    /// `Some` exactly when `kind` is [`Kind::Operator`].
    pub op: Option<Operator>,
    /// C scalar type (`int`, `unsigned long`, ...) or the pointee type for pointers.
    pub raw_type: String,
    pub repr: String,
    pub args: Vec<Expression>,
}

impl Expression {
    pub fn variable(name: impl Into<String>, ty: Type, raw_type: impl Into<String>) -> Self {
        Self::leaf(Kind::Variable, ty, raw_type, name)
    }

    pub fn constant(repr: impl Into<String>, ty: Type, raw_type: impl Into<String>) -> Self {
        Self::leaf(Kind::Constant, ty, raw_type, repr)
    }

    pub fn parameter() -> Self {
        Self::leaf(
            Kind::Parameter,
            Type::Integer,
            DEFAULT_INTEGER_TYPE,
            PARAMETER_REPR,
        )
    }

    fn leaf(
        kind: Kind,
        ty: Type,
        raw_type: impl Into<String>,
        repr: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            ty,
            op: None,
            raw_type: raw_type.into(),
            repr: repr.into(),
            args: Vec::new(),
        }
    }

    /// Operator node with an explicit raw type.
    pub fn operator(op: Operator, raw_type: impl Into<String>, args: Vec<Expression>) -> Self {
        Self {
            kind: Kind::Operator,
            ty: operator_type(op),
            op: Some(op),
            raw_type: raw_type.into(),
            repr: operator_to_string(op).to_string(),
            args,
        }
    }

    /// Operator node whose raw type follows C conversion rules.
    ///
    /// Comparisons and logical operators yield `int`; arithmetic takes the
    /// usual arithmetic conversion of its operands.
    pub fn apply(op: Operator, args: Vec<Expression>) -> Self {
        let raw_type = match operator_type(op) {
            Type::Boolean => DEFAULT_INTEGER_TYPE.to_string(),
            _ => match args.as_slice() {
                [lhs, rhs] => usual_arithmetic_conversion(&lhs.raw_type, &rhs.raw_type),
                [arg] => integer_promotion(&arg.raw_type).to_string(),
                _ => DEFAULT_INTEGER_TYPE.to_string(),
            },
        };
        Self::operator(op, raw_type, args)
    }

    /// Auxiliary node standing in for an operator chosen later by an id coordinate.
    pub fn placeholder(kind: Kind, ty: Type, args: Vec<Expression>) -> Self {
        debug_assert!(kind.is_auxiliary());
        let raw_type = match ty {
            Type::Boolean => DEFAULT_INTEGER_TYPE.to_string(),
            _ => args
                .first()
                .map(|arg| arg.raw_type.clone())
                .unwrap_or_else(|| DEFAULT_INTEGER_TYPE.to_string()),
        };
        Self {
            kind,
            ty,
            op: None,
            raw_type,
            repr: format!("{kind:?}").to_uppercase(),
            args,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.kind.is_leaf()
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        1 + self.args.iter().map(Expression::size).sum::<usize>()
    }

    /// Whether `other` occurs anywhere in this tree, including the root.
    pub fn contains(&self, other: &Expression) -> bool {
        self == other || self.args.iter().any(|arg| arg.contains(other))
    }

    /// Integer value of a literal constant, if this is one.
    pub fn integer_value(&self) -> Option<i64> {
        if self.kind == Kind::Constant && self.ty == Type::Integer {
            self.repr.parse().ok()
        } else {
            None
        }
    }

    pub fn is_null_pointer(&self) -> bool {
        self.kind == Kind::Constant && self.ty == Type::Pointer && self.repr == "0"
    }

    /// Check the structural typing invariants of the whole tree.
    pub fn check_well_formed(&self) -> Result<(), WellFormednessError> {
        if self.kind.is_auxiliary() {
            return Err(WellFormednessError::UnresolvedPlaceholder { kind: self.kind });
        }

        match (self.kind, self.op) {
            (Kind::Operator, Some(op)) => {
                if self.args.len() != op.arity() {
                    return Err(WellFormednessError::Arity {
                        op,
                        expected: op.arity(),
                        found: self.args.len(),
                    });
                }
                if self.ty != operator_type(op) {
                    return Err(WellFormednessError::OperatorType {
                        op,
                        expected: operator_type(op),
                        found: self.ty,
                    });
                }
            }
            (Kind::Operator, None) | (_, Some(_)) => {
                return Err(WellFormednessError::OperatorKindMismatch {
                    repr: self.repr.clone(),
                    kind: self.kind,
                });
            }
            (_, None) => {
                if !self.args.is_empty() {
                    return Err(WellFormednessError::LeafWithArgs {
                        repr: self.repr.clone(),
                    });
                }
            }
        }

        self.args.iter().try_for_each(Expression::check_well_formed)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&expression_to_string(self))
    }
}

pub fn get_integer_expression(n: i64) -> Expression {
    Expression::constant(n.to_string(), Type::Integer, DEFAULT_INTEGER_TYPE)
}

pub fn get_null_pointer() -> Expression {
    Expression::constant("0", Type::Pointer, ANY_POINTEE)
}

/// Conversion rank and signedness of a C integer type name.
fn integer_rank(raw_type: &str) -> (u8, bool) {
    match raw_type {
        "char" | "signed char" | "short" | "_Bool" => (1, false),
        "unsigned char" | "unsigned short" => (1, true),
        "unsigned int" | "unsigned" => (3, true),
        "long" => (4, false),
        "unsigned long" | "size_t" => (4, true),
        "long long" => (5, false),
        "unsigned long long" => (5, true),
        _ => (3, false),
    }
}

/// C integer promotion: anything narrower than `int` becomes `int`.
pub fn integer_promotion(raw_type: &str) -> &str {
    match integer_rank(raw_type) {
        (1, _) => DEFAULT_INTEGER_TYPE,
        _ => raw_type,
    }
}

/// Width in bits under LP64, by rank.
fn integer_width(rank: u8) -> u32 {
    match rank {
        1 => 16,
        3 => 32,
        _ => 64,
    }
}

fn unsigned_counterpart(raw_type: &str) -> String {
    match raw_type {
        "long" => "unsigned long".to_string(),
        "long long" => "unsigned long long".to_string(),
        _ => "unsigned int".to_string(),
    }
}

/// Common type of a binary arithmetic operation in C, assuming LP64.
pub fn usual_arithmetic_conversion(lhs: &str, rhs: &str) -> String {
    let (lhs, rhs) = (integer_promotion(lhs), integer_promotion(rhs));
    let (lhs_rank, lhs_unsigned) = integer_rank(lhs);
    let (rhs_rank, rhs_unsigned) = integer_rank(rhs);

    if lhs_unsigned == rhs_unsigned || lhs_rank == rhs_rank {
        let winner = if lhs_rank > rhs_rank || (lhs_rank == rhs_rank && !rhs_unsigned) {
            lhs
        } else {
            rhs
        };
        return winner.to_string();
    }

    let ((signed, signed_rank), (unsigned, unsigned_rank)) = if lhs_unsigned {
        ((rhs, rhs_rank), (lhs, lhs_rank))
    } else {
        ((lhs, lhs_rank), (rhs, rhs_rank))
    };
    if unsigned_rank > signed_rank {
        unsigned.to_string()
    } else if integer_width(signed_rank) > integer_width(unsigned_rank) {
        // every value of the unsigned operand fits
        signed.to_string()
    } else {
        unsigned_counterpart(signed)
    }
}
