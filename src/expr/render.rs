//! Source rendering. Every compound node is parenthesised, so the output
//! never depends on C precedence or associativity.

use super::{Expression, Kind, Operator};

pub fn expression_to_string(expression: &Expression) -> String {
    let mut out = String::new();
    render(expression, &mut out);
    out
}

fn render(expression: &Expression, out: &mut String) {
    match expression.kind {
        Kind::Variable | Kind::Constant | Kind::Parameter => out.push_str(&expression.repr),
        Kind::Operator => match (expression.op, expression.args.as_slice()) {
            // C has no separate bitvector domain.
            (Some(Operator::BvToInt | Operator::IntToBv), [arg]) => render(arg, out),
            (Some(Operator::IntCast), [arg]) => {
                out.push_str("((");
                out.push_str(&expression.raw_type);
                out.push_str(") ");
                render(arg, out);
                out.push(')');
            }
            (Some(op), [arg]) => {
                out.push('(');
                out.push_str(op.to_string().as_str());
                render(arg, out);
                out.push(')');
            }
            (Some(op), [lhs, rhs]) => {
                out.push('(');
                render(lhs, out);
                out.push(' ');
                out.push_str(op.to_string().as_str());
                out.push(' ');
                render(rhs, out);
                out.push(')');
            }
            _ => render_call(&expression.repr, &expression.args, out),
        },
        Kind::Bv2 | Kind::Int2 | Kind::Bool2 | Kind::Bool3 => {
            render_call(&expression.repr, &expression.args, out)
        }
    }
}

fn render_call(name: &str, args: &[Expression], out: &mut String) {
    out.push_str(name);
    out.push('(');
    for (idx, arg) in args.iter().enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        render(arg, out);
    }
    out.push(')');
}
