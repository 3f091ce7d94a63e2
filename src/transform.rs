//! Classifying the edit that turns an original expression into a patch.

use crate::expr::{Expression, Kind, Operator, OperatorFamily};
use std::fmt;

/// Shape of the edit relating a patch to the original expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transformation {
    None,
    /// Alternative operator, e.g. `>` to `>=`.
    Alternative,
    /// Arguments exchanged.
    Swapping,
    /// Patch is a proper sub-tree of the original.
    Simplification,
    /// Constant replaced by a variable, e.g. `1` to `x`.
    Generalization,
    /// Variable replaced by a constant, e.g. `x` to `1`.
    Concretization,
    /// Any other replacement.
    Substitution,
    /// Original `|| something`.
    Loosening,
    /// Original `&& something`.
    Tightening,
}

impl Transformation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transformation::None => "none",
            Transformation::Alternative => "alternative",
            Transformation::Swapping => "swapping",
            Transformation::Simplification => "simplification",
            Transformation::Generalization => "generalization",
            Transformation::Concretization => "concretization",
            Transformation::Substitution => "substitution",
            Transformation::Loosening => "loosening",
            Transformation::Tightening => "tightening",
        }
    }
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatchMeta {
    pub transformation: Transformation,
    /// Tree edit distance to the original; lower ranks first.
    pub distance: u32,
}

pub fn classify(original: &Expression, patch: &Expression) -> PatchMeta {
    PatchMeta {
        transformation: transformation(original, patch),
        distance: distance(original, patch),
    }
}

pub fn transformation(original: &Expression, patch: &Expression) -> Transformation {
    if original == patch {
        return Transformation::None;
    }

    if let (Some(o), Some(p)) = (original.op, patch.op) {
        if let ([o_lhs, o_rhs], [p_lhs, p_rhs]) = (original.args.as_slice(), patch.args.as_slice())
        {
            if o == p && p_lhs == o_rhs && p_rhs == o_lhs {
                return Transformation::Swapping;
            }
        }
        if o != p
            && o.family() == p.family()
            && o.family() != OperatorFamily::Conversion
            && original.args == patch.args
        {
            return Transformation::Alternative;
        }
    }

    if let (Some(op @ (Operator::Or | Operator::And)), [lhs, rhs]) =
        (patch.op, patch.args.as_slice())
    {
        if lhs == original || rhs == original {
            return if op == Operator::Or {
                Transformation::Loosening
            } else {
                Transformation::Tightening
            };
        }
    }

    if original.contains(patch) {
        return Transformation::Simplification;
    }

    let mut diffs = Vec::new();
    if leaf_differences(original, patch, &mut diffs) && !diffs.is_empty() {
        let variable = |e: &Expression| matches!(e.kind, Kind::Variable | Kind::Parameter);
        if diffs
            .iter()
            .all(|(o, p)| o.kind == Kind::Constant && variable(p))
        {
            return Transformation::Generalization;
        }
        if diffs
            .iter()
            .all(|(o, p)| variable(o) && p.kind == Kind::Constant)
        {
            return Transformation::Concretization;
        }
    }

    Transformation::Substitution
}

/// Walk two trees of the same shape, collecting the leaves that differ.
///
/// Returns `false` as soon as the shapes diverge.
fn leaf_differences<'a>(
    a: &'a Expression,
    b: &'a Expression,
    out: &mut Vec<(&'a Expression, &'a Expression)>,
) -> bool {
    if a.is_leaf() && b.is_leaf() {
        if a != b {
            out.push((a, b));
        }
        return true;
    }
    if label(a) != label(b) || a.args.len() != b.args.len() {
        return false;
    }
    a.args
        .iter()
        .zip(&b.args)
        .all(|(x, y)| leaf_differences(x, y, out))
}

/// Node identity for edit purposes; types are ignored.
fn label(e: &Expression) -> (Kind, Option<Operator>, &str) {
    (e.kind, e.op, e.repr.as_str())
}

/// Ordered tree edit distance.
///
/// Relabelling a node costs 1; inserting or deleting a sub-tree costs its
/// size. Children are aligned like the characters of a Levenshtein
/// distance.
pub fn distance(a: &Expression, b: &Expression) -> u32 {
    let relabel = u32::from(label(a) != label(b));
    relabel + align(&a.args, &b.args)
}

fn align(xs: &[Expression], ys: &[Expression]) -> u32 {
    let size = |e: &Expression| e.size() as u32;

    let mut prev: Vec<u32> = std::iter::once(0)
        .chain(ys.iter().scan(0, |acc, y| {
            *acc += size(y);
            Some(*acc)
        }))
        .collect();

    for x in xs {
        let mut row = Vec::with_capacity(prev.len());
        row.push(prev[0] + size(x));
        for (j, y) in ys.iter().enumerate() {
            let best = (prev[j] + distance(x, y))
                .min(prev[j + 1] + size(x))
                .min(row[j] + size(y));
            row.push(best);
        }
        prev = row;
    }

    prev[ys.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{get_integer_expression, Type};

    fn int(name: &str) -> Expression {
        Expression::variable(name, Type::Integer, "int")
    }

    fn op(op: Operator, lhs: Expression, rhs: Expression) -> Expression {
        Expression::apply(op, vec![lhs, rhs])
    }

    fn zero() -> Expression {
        get_integer_expression(0)
    }

    #[test]
    fn test_identical_is_none() {
        let e = op(Operator::Lt, int("x"), zero());
        assert_eq!(
            classify(&e, &e),
            PatchMeta {
                transformation: Transformation::None,
                distance: 0,
            }
        );
    }

    #[test]
    fn test_alternative_operator() {
        let original = op(Operator::Ge, int("x"), zero());
        let patch = op(Operator::Gt, int("x"), zero());
        let meta = classify(&original, &patch);
        assert_eq!(meta.transformation, Transformation::Alternative);
        assert_eq!(meta.distance, 1);
    }

    #[test]
    fn test_swapping() {
        let original = op(Operator::Sub, int("a"), int("b"));
        let patch = op(Operator::Sub, int("b"), int("a"));
        assert_eq!(transformation(&original, &patch), Transformation::Swapping);
        assert_eq!(distance(&original, &patch), 2);
    }

    #[test]
    fn test_loosening_and_tightening() {
        let original = op(Operator::Lt, int("i"), int("n"));
        let extra = Expression::variable("done", Type::Boolean, "int");
        let looser = op(Operator::Or, original.clone(), extra.clone());
        let tighter = op(Operator::And, extra, original.clone());
        assert_eq!(transformation(&original, &looser), Transformation::Loosening);
        assert_eq!(transformation(&original, &tighter), Transformation::Tightening);
    }

    #[test]
    fn test_simplification() {
        let inner = op(Operator::Lt, int("i"), int("n"));
        let original = op(
            Operator::And,
            inner.clone(),
            op(Operator::Neq, int("p"), zero()),
        );
        assert_eq!(transformation(&original, &inner), Transformation::Simplification);
        assert!(distance(&original, &inner) > 0);
    }

    #[test]
    fn test_generalization_and_concretization() {
        let concrete = op(Operator::Lt, int("i"), get_integer_expression(10));
        let general = op(Operator::Lt, int("i"), int("n"));
        assert_eq!(transformation(&concrete, &general), Transformation::Generalization);
        assert_eq!(transformation(&general, &concrete), Transformation::Concretization);
        assert_eq!(distance(&concrete, &general), 1);
    }

    #[test]
    fn test_substitution_fallback() {
        let original = op(Operator::Lt, int("i"), int("n"));
        let patch = op(Operator::Add, int("i"), get_integer_expression(1));
        assert_eq!(transformation(&original, &patch), Transformation::Substitution);
    }

    #[test]
    fn test_distance_grows_with_changes() {
        let original = op(Operator::Lt, int("i"), int("n"));
        let one = op(Operator::Le, int("i"), int("n"));
        let two = op(Operator::Le, int("j"), int("n"));
        let three = op(Operator::Le, int("j"), int("m"));
        assert!(distance(&original, &one) < distance(&original, &two));
        assert!(distance(&original, &two) < distance(&original, &three));
        assert_eq!(distance(&one, &original), distance(&original, &one));
    }
}
