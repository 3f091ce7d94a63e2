//! Recovering the coordinates of an already-built patch.
//!
//! Encoding matches the patch against the shapes [`decode`] produces and
//! confirms every guess by decoding it again, so a returned id always
//! reproduces the patch exactly.

use super::decode::{base_index, decode, Selection, BOOL2_OPERATORS, BV2_OPERATORS, INT2_OPERATORS};
use super::id::{param_index, F1xId};
use crate::expr::{Expression, Operator, OperatorFamily};
use crate::location::CandidateLocation;

/// Coordinates of `patch` at `location`, or `None` if the patch lies outside
/// the generative grammar.
pub fn encode(patch: &Expression, location: &CandidateLocation) -> Option<F1xId> {
    let mut guesses = body_guesses(patch, location, 0);
    if let Some((cond3, body)) = unwrap_conditional(patch, location) {
        guesses.extend(body_guesses(body, location, cond3));
    }

    guesses
        .into_iter()
        .find(|id| decode(id, location).as_ref() == Ok(patch))
}

/// Matches `(c && body) || ((!c) && e)` over boolean components `c` and `e`.
fn unwrap_conditional<'a>(
    patch: &'a Expression,
    location: &CandidateLocation,
) -> Option<(u32, &'a Expression)> {
    let [left, right] = binary(patch, Operator::Or)?;
    let [condition, body] = binary(left, Operator::And)?;
    let [negated, otherwise] = binary(right, Operator::And)?;
    if negated.op != Some(Operator::Not) || negated.args.first() != Some(condition) {
        return None;
    }

    let booleans = location.boolean_components();
    let position = |e: &Expression| {
        booleans
            .iter()
            .position(|&idx| &location.components[idx] == e)
    };
    let (c, e) = (position(condition)?, position(otherwise)?);
    let cond3 = 1 + c * booleans.len() + e;
    Some((u32::try_from(cond3).ok()?, body))
}

/// Candidate ids whose template body may produce `body`, most specific first.
fn body_guesses(body: &Expression, location: &CandidateLocation, cond3: u32) -> Vec<F1xId> {
    let n = location.components.len();
    let component = |e: &Expression| location.components.iter().position(|c| c == strip(e));
    let single = |k| base_index(Selection::Single(k), n);
    let pair = |i, j| base_index(Selection::Pair(i, j), n);

    let mut guesses = Vec::new();
    if let Some(k) = component(body).and_then(single) {
        guesses.push(F1xId::new(k, 0, 0, cond3, 0));
    }

    let Some(op) = body.op else {
        return guesses;
    };
    let [lhs, rhs] = body.args.as_slice() else {
        return guesses;
    };

    if let Some(bool2) = table_index(&BOOL2_OPERATORS, op) {
        let literal = literal_param(rhs);
        if let Some(k) = component(lhs).and_then(single) {
            if let Some(param) = literal {
                guesses.push(F1xId::new(k, 0, bool2, cond3, param));
            }
            if rhs.is_null_pointer() {
                guesses.push(F1xId::new(k, 0, bool2, cond3, 0));
            }
        }
        if let (Some(param), Some((int2, i, j))) = (literal, arithmetic_pair(strip(lhs), location)) {
            if let Some(base) = pair(i, j) {
                guesses.push(F1xId::new(base, int2, bool2, cond3, param));
            }
        }
        if let (Some(i), Some(j)) = (component(lhs), component(rhs)) {
            if let Some(base) = pair(i, j) {
                guesses.push(F1xId::new(base, 0, bool2, cond3, 0));
            }
        }
    }

    if let Some(int2) = arithmetic_index(op) {
        if let (Some(k), Some(param)) = (component(lhs).and_then(single), literal_param(rhs)) {
            guesses.push(F1xId::new(k, int2, 0, cond3, param));
        }
        if let Some((_, i, j)) = arithmetic_pair(body, location) {
            if let Some(base) = pair(i, j) {
                guesses.push(F1xId::new(base, int2, 0, cond3, 0));
            }
        }
    }

    guesses
}

/// `(a OP b)` over two components, with `OP` an `INT2` or `BV2` operator.
fn arithmetic_pair(e: &Expression, location: &CandidateLocation) -> Option<(u32, usize, usize)> {
    let int2 = arithmetic_index(e.op?)?;
    let [lhs, rhs] = e.args.as_slice() else {
        return None;
    };
    let position = |e: &Expression| location.components.iter().position(|c| c == strip(e));
    Some((int2, position(lhs)?, position(rhs)?))
}

fn arithmetic_index(op: Operator) -> Option<u32> {
    table_index(&INT2_OPERATORS, op).or_else(|| table_index(&BV2_OPERATORS, op))
}

fn table_index(table: &[Operator], op: Operator) -> Option<u32> {
    table
        .iter()
        .position(|candidate| *candidate == op)
        .map(|idx| idx as u32 + 1)
}

fn literal_param(e: &Expression) -> Option<u32> {
    strip(e).integer_value().and_then(param_index)
}

fn binary(e: &Expression, op: Operator) -> Option<[&Expression; 2]> {
    match (e.op, e.args.as_slice()) {
        (Some(found), [lhs, rhs]) if found == op => Some([lhs, rhs]),
        _ => None,
    }
}

/// Peel the conversions decoding inserts around components.
fn strip(mut e: &Expression) -> &Expression {
    while let (Some(op), [inner]) = (e.op, e.args.as_slice()) {
        if op.family() != OperatorFamily::Conversion {
            break;
        }
        e = inner;
    }
    e
}
