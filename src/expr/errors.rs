use super::{Kind, Operator, Type};
use crate::location::DefectClass;
use thiserror::Error;

/// Malformed textual input that had to map onto a closed enum or structure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown {arity} operator '{token}'{}", suggestion_suffix(.suggestion))]
    UnknownOperator {
        token: String,
        arity: &'static str,
        suggestion: Option<&'static str>,
    },

    #[error("invalid JSON at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("{context}: malformed entry: {message}")]
    Malformed { context: String, message: String },

    #[error("{context}: missing required field '{field}'")]
    MissingField {
        context: String,
        field: &'static str,
    },

    #[error("{context}: unknown {field} tag '{value}'")]
    UnknownTag {
        context: String,
        field: &'static str,
        value: String,
    },

    #[error("{context}: auxiliary kind '{kind}' is not allowed in source expressions")]
    AuxiliaryKind { context: String, kind: String },

    #[error("{context}: operator '{op}' takes {expected} argument(s), found {found}")]
    Arity {
        context: String,
        op: String,
        expected: usize,
        found: usize,
    },

    #[error("{context}: {source}")]
    InNode {
        context: String,
        #[source]
        source: Box<ParseError>,
    },

    #[error("invalid F1X id '{input}': {message}")]
    InvalidId { input: String, message: String },
}

fn suggestion_suffix(suggestion: &Option<&'static str>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{s}'?)"),
        None => String::new(),
    }
}

/// A decoded or hand-built expression that violates a typing invariant.
///
/// Such candidates are skipped before they ever reach a test runner.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WellFormednessError {
    #[error("node '{repr}' has kind {kind:?} but operator presence does not match")]
    OperatorKindMismatch { repr: String, kind: Kind },

    #[error("operator '{op}' takes {expected} argument(s), found {found}")]
    Arity {
        op: Operator,
        expected: usize,
        found: usize,
    },

    #[error("operator '{op}' yields {expected:?} but node is typed {found:?}")]
    OperatorType {
        op: Operator,
        expected: Type,
        found: Type,
    },

    #[error("leaf '{repr}' must not have arguments")]
    LeafWithArgs { repr: String },

    #[error("unresolved {kind:?} placeholder in expression")]
    UnresolvedPlaceholder { kind: Kind },

    #[error("operator '{op}' cannot be applied to {ty:?} operands")]
    OperandType { op: Operator, ty: Type },

    #[error("patch for {defect:?} defect must be {expected:?}, found {found:?}")]
    RootType {
        defect: DefectClass,
        expected: Type,
        found: Type,
    },

    #[error("{dimension} index {index} is out of range (bound {bound})")]
    OutOfRange {
        dimension: &'static str,
        index: u32,
        bound: u32,
    },

    #[error("{dimension} = {value} is not used by the selected template")]
    UnusedCoordinate { dimension: &'static str, value: u32 },

    #[error("component {index} cannot be paired with itself")]
    DegeneratePair { index: usize },

    #[error("a pair of components needs an int2 or bool2 operator")]
    MissingCombinator,
}
