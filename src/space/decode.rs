//! Resolving an [`F1xId`] into a concrete patch.
//!
//! Decoding happens in two steps. [`build_template`] picks components by
//! `base` and arranges them around auxiliary placeholder nodes (`INT2`,
//! `BV2`, `BOOL2`, `BOOL3`, and the parameter slot). [`instantiate`] then
//! replaces each placeholder with the operator chosen by the matching id
//! coordinate. Both steps are pure, so equal inputs give equal trees.
//!
//! `base` indexes components in mixed radix: `base < n` picks component
//! `base`, and `n <= base < n + n²` picks the ordered pair
//! `((base - n) / n, (base - n) % n)`.

use super::id::{param_value, F1xId};
use crate::expr::{
    get_integer_expression, get_null_pointer, operator_type, usual_arithmetic_conversion,
    Expression, Kind, Operator, OperatorFamily, Type, WellFormednessError, PARAMETER_REPR,
};
use crate::location::CandidateLocation;

pub const INT2_OPERATORS: [Operator; 5] = [
    Operator::Add,
    Operator::Sub,
    Operator::Mul,
    Operator::Div,
    Operator::Mod,
];

pub const BV2_OPERATORS: [Operator; 5] = [
    Operator::BvAnd,
    Operator::BvOr,
    Operator::BvXor,
    Operator::BvShl,
    Operator::BvShr,
];

pub const BOOL2_OPERATORS: [Operator; 8] = [
    Operator::Eq,
    Operator::Neq,
    Operator::Lt,
    Operator::Le,
    Operator::Gt,
    Operator::Ge,
    Operator::And,
    Operator::Or,
];

/// Components picked by the `base` coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Single(usize),
    Pair(usize, usize),
}

/// Number of `base` values for a pool of `n` components.
pub fn base_bound(n: usize) -> u64 {
    let n = n as u64;
    n + n * n
}

pub fn select(base: u32, n: usize) -> Result<Selection, WellFormednessError> {
    let bound = base_bound(n);
    if u64::from(base) >= bound {
        return Err(WellFormednessError::OutOfRange {
            dimension: "base",
            index: base,
            bound: u32::try_from(bound).unwrap_or(u32::MAX),
        });
    }
    let base = base as usize;
    if base < n {
        return Ok(Selection::Single(base));
    }
    let pair = base - n;
    let (i, j) = (pair / n, pair % n);
    if i == j {
        return Err(WellFormednessError::DegeneratePair { index: i });
    }
    Ok(Selection::Pair(i, j))
}

/// Inverse of [`select`].
pub fn base_index(selection: Selection, n: usize) -> Option<u32> {
    let index = match selection {
        Selection::Single(k) if k < n => k,
        Selection::Pair(i, j) if i < n && j < n && i != j => n + i * n + j,
        _ => return None,
    };
    u32::try_from(index).ok()
}

/// Decode `id` against `location`, checking the result against the defect class.
pub fn decode(id: &F1xId, location: &CandidateLocation) -> Result<Expression, WellFormednessError> {
    decode_with_slots(id, location).map(|(patch, _)| patch)
}

/// Like [`decode`], also reporting whether the template had a parameter slot.
pub(crate) fn decode_with_slots(
    id: &F1xId,
    location: &CandidateLocation,
) -> Result<(Expression, bool), WellFormednessError> {
    let template = build_template(id, location)?;
    let mut used_param = false;
    let patch = instantiate(&template, id, &mut used_param)?;

    if !used_param && id.param != 0 {
        return Err(WellFormednessError::UnusedCoordinate {
            dimension: "param",
            value: id.param,
        });
    }

    patch.check_well_formed()?;
    check_root_type(location, &patch)?;
    Ok((patch, used_param))
}

pub fn check_root_type(
    location: &CandidateLocation,
    patch: &Expression,
) -> Result<(), WellFormednessError> {
    let expected = location.required_type();
    if patch.ty != expected {
        return Err(WellFormednessError::RootType {
            defect: location.defect,
            expected,
            found: patch.ty,
        });
    }
    Ok(())
}

/// Arrange the selected components around placeholder nodes.
pub fn build_template(
    id: &F1xId,
    location: &CandidateLocation,
) -> Result<Expression, WellFormednessError> {
    let components = &location.components;
    let int2 = coordinate(id.int2, "int2", INT2_OPERATORS.len())?;
    let bool2 = coordinate(id.bool2, "bool2", BOOL2_OPERATORS.len())?;

    let body = match select(id.base, components.len())? {
        Selection::Single(k) => {
            let c = components[k].clone();
            match (int2, bool2) {
                (None, None) => c,
                (Some(op), None) => arithmetic_hole(c, Expression::parameter(), op)?,
                (None, Some(_)) if c.ty == Type::Pointer => Expression::placeholder(
                    Kind::Bool2,
                    Type::Boolean,
                    vec![c, get_null_pointer()],
                ),
                (None, Some(_)) => Expression::placeholder(
                    Kind::Bool2,
                    Type::Boolean,
                    vec![c, Expression::parameter()],
                ),
                (Some(_), Some(_)) => {
                    return Err(WellFormednessError::UnusedCoordinate {
                        dimension: "int2",
                        value: id.int2,
                    })
                }
            }
        }
        Selection::Pair(i, j) => {
            let (a, b) = (components[i].clone(), components[j].clone());
            match (int2, bool2) {
                (None, None) => return Err(WellFormednessError::MissingCombinator),
                (Some(op), None) => arithmetic_hole(a, b, op)?,
                (None, Some(_)) => Expression::placeholder(Kind::Bool2, Type::Boolean, vec![a, b]),
                (Some(op), Some(_)) => Expression::placeholder(
                    Kind::Bool2,
                    Type::Boolean,
                    vec![arithmetic_hole(a, b, op)?, Expression::parameter()],
                ),
            }
        }
    };

    if id.cond3 == 0 {
        return Ok(body);
    }

    if body.ty != Type::Boolean {
        return Err(WellFormednessError::OperandType {
            op: Operator::And,
            ty: body.ty,
        });
    }

    let booleans = location.boolean_components();
    let m = booleans.len();
    let shape = (id.cond3 - 1) as usize;
    if shape >= m * m {
        return Err(WellFormednessError::OutOfRange {
            dimension: "cond3",
            index: id.cond3,
            bound: (1 + m * m) as u32,
        });
    }
    let condition = components[booleans[shape / m]].clone();
    let otherwise = components[booleans[shape % m]].clone();
    Ok(Expression::placeholder(
        Kind::Bool3,
        Type::Boolean,
        vec![condition, body, otherwise],
    ))
}

/// Zero means "no operator"; anything else is a 1-based table index.
fn coordinate(
    value: u32,
    dimension: &'static str,
    len: usize,
) -> Result<Option<usize>, WellFormednessError> {
    match value as usize {
        0 => Ok(None),
        v if v <= len => Ok(Some(v - 1)),
        _ => Err(WellFormednessError::OutOfRange {
            dimension,
            index: value,
            bound: len as u32 + 1,
        }),
    }
}

/// `INT2` hole for integer left legs, `BV2` hole for bitvector ones.
///
/// The right leg is converted into the left leg's domain; integer legs of
/// different raw types are cast to their common C type.
fn arithmetic_hole(
    lhs: Expression,
    rhs: Expression,
    index: usize,
) -> Result<Expression, WellFormednessError> {
    match (lhs.ty, rhs.ty) {
        (Type::Integer, Type::Integer | Type::Bitvector) => {
            let rhs = if rhs.ty == Type::Bitvector {
                Expression::apply(Operator::BvToInt, vec![rhs])
            } else {
                rhs
            };
            let common = usual_arithmetic_conversion(&lhs.raw_type, &rhs.raw_type);
            let args = vec![cast_to(lhs, &common), cast_to(rhs, &common)];
            Ok(Expression::placeholder(Kind::Int2, Type::Integer, args))
        }
        (Type::Bitvector, Type::Integer | Type::Bitvector) => {
            let rhs = if rhs.ty == Type::Integer {
                Expression::apply(Operator::IntToBv, vec![rhs])
            } else {
                rhs
            };
            Ok(Expression::placeholder(
                Kind::Bv2,
                Type::Bitvector,
                vec![lhs, rhs],
            ))
        }
        (Type::Bitvector, ty) => Err(WellFormednessError::OperandType {
            op: BV2_OPERATORS[index],
            ty,
        }),
        (Type::Integer, ty) | (ty, _) => Err(WellFormednessError::OperandType {
            op: INT2_OPERATORS[index],
            ty,
        }),
    }
}

fn cast_to(expression: Expression, raw_type: &str) -> Expression {
    // The parameter slot takes whatever type its literal is given.
    if expression.raw_type == raw_type || expression.kind == Kind::Parameter {
        expression
    } else {
        Expression::operator(Operator::IntCast, raw_type, vec![expression])
    }
}

/// Replace every placeholder introduced by [`build_template`].
///
/// Component subtrees are copied as they are; only template structure is
/// rewritten.
pub fn instantiate(
    template: &Expression,
    id: &F1xId,
    used_param: &mut bool,
) -> Result<Expression, WellFormednessError> {
    match template.kind {
        Kind::Parameter if template.repr == PARAMETER_REPR => {
            *used_param = true;
            Ok(get_integer_expression(param_value(id.param)))
        }
        Kind::Int2 | Kind::Bv2 => {
            let table = if template.kind == Kind::Int2 {
                &INT2_OPERATORS
            } else {
                &BV2_OPERATORS
            };
            let op = table[(id.int2 - 1) as usize];
            let args = instantiate_args(template, id, used_param)?;
            Ok(Expression::apply(op, args))
        }
        Kind::Bool2 => {
            let op = BOOL2_OPERATORS[(id.bool2 - 1) as usize];
            let args = instantiate_args(template, id, used_param)?;
            boolean_operation(op, args)
        }
        Kind::Bool3 => {
            let mut args = instantiate_args(template, id, used_param)?.into_iter();
            let (Some(condition), Some(then), Some(otherwise)) =
                (args.next(), args.next(), args.next())
            else {
                return Err(WellFormednessError::UnresolvedPlaceholder { kind: Kind::Bool3 });
            };
            let negated = Expression::apply(Operator::Not, vec![condition.clone()]);
            Ok(Expression::apply(
                Operator::Or,
                vec![
                    Expression::apply(Operator::And, vec![condition, then]),
                    Expression::apply(Operator::And, vec![negated, otherwise]),
                ],
            ))
        }
        // Conversions are inserted by the template and may wrap the parameter slot.
        Kind::Operator
            if template
                .op
                .is_some_and(|op| op.family() == OperatorFamily::Conversion) =>
        {
            Ok(Expression {
                args: instantiate_args(template, id, used_param)?,
                ..template.clone()
            })
        }
        _ => Ok(template.clone()),
    }
}

fn instantiate_args(
    template: &Expression,
    id: &F1xId,
    used_param: &mut bool,
) -> Result<Vec<Expression>, WellFormednessError> {
    template
        .args
        .iter()
        .map(|arg| instantiate(arg, id, used_param))
        .collect()
}

/// Type-check a `BOOL2` resolution.
fn boolean_operation(
    op: Operator,
    args: Vec<Expression>,
) -> Result<Expression, WellFormednessError> {
    let [lhs, rhs]: [Expression; 2] = args.try_into().map_err(|args: Vec<Expression>| {
        WellFormednessError::Arity {
            op,
            expected: 2,
            found: args.len(),
        }
    })?;

    let reject = |ty| Err(WellFormednessError::OperandType { op, ty });
    match op.family() {
        OperatorFamily::Logical => {
            for leg in [&lhs, &rhs] {
                if leg.ty != Type::Boolean {
                    return reject(leg.ty);
                }
            }
            Ok(Expression::apply(op, vec![lhs, rhs]))
        }
        _ => match (lhs.ty, rhs.ty) {
            (Type::Pointer, Type::Pointer) if matches!(op, Operator::Eq | Operator::Neq) => {
                Ok(Expression::apply(op, vec![lhs, rhs]))
            }
            (l, r) if l.is_numeric() && r.is_numeric() => {
                let (lhs, rhs) = if l != r {
                    (as_integer(lhs), as_integer(rhs))
                } else {
                    (lhs, rhs)
                };
                debug_assert_eq!(operator_type(op), Type::Boolean);
                Ok(Expression::apply(op, vec![lhs, rhs]))
            }
            (Type::Integer | Type::Bitvector, ty) | (ty, _) => reject(ty),
        },
    }
}

fn as_integer(expression: Expression) -> Expression {
    if expression.ty == Type::Bitvector {
        Expression::apply(Operator::BvToInt, vec![expression])
    } else {
        expression
    }
}
