//! Reading the candidate-location description produced by the front-end.
//!
//! The document is either `{"locations": [...]}` or a bare array. Each entry
//! is converted independently so a caller can decide whether one malformed
//! location aborts the run.

use super::errors::LoadError;
use crate::expr::{
    binary_operator_by_string, operator_type, unary_operator_by_string, Expression, Kind,
    Operator, ParseError, Type,
};
use crate::location::{CandidateLocation, DefectClass, Location};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLocation {
    defect: Option<String>,
    location: Option<RawSpan>,
    loc_id: Option<u32>,
    original: Option<RawExpression>,
    components: Option<Vec<RawExpression>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSpan {
    file_id: u32,
    begin_line: u32,
    begin_column: u32,
    end_line: u32,
    end_column: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExpression {
    kind: Option<String>,
    #[serde(rename = "type")]
    ty: Option<String>,
    repr: Option<String>,
    raw_type: Option<String>,
    #[serde(default)]
    args: Vec<RawExpression>,
}

/// Load every location in `path`, failing on the first malformed one.
pub fn load_candidate_locations(
    path: impl AsRef<Path>,
) -> Result<Vec<Arc<CandidateLocation>>, LoadError> {
    let path = path.as_ref();
    let input = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let locations = parse_candidate_locations(&input).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(
        path = %path.display(),
        count = locations.len(),
        "loaded candidate locations"
    );
    Ok(locations)
}

pub fn parse_candidate_locations(input: &str) -> Result<Vec<Arc<CandidateLocation>>, ParseError> {
    parse_each(input)?
        .into_iter()
        .map(|entry| entry.map(Arc::new))
        .collect()
}

/// Parse the document, converting each location on its own.
///
/// The outer error covers the document itself (invalid JSON, wrong shape);
/// the inner results are per location, in source order.
pub fn parse_each(input: &str) -> Result<Vec<Result<CandidateLocation, ParseError>>, ParseError> {
    let document: Value = serde_json::from_str(input).map_err(|e| ParseError::Syntax {
        line: e.line(),
        column: e.column(),
        message: e.to_string(),
    })?;

    let entries = match document {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("locations") {
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                return Err(ParseError::Malformed {
                    context: "locations".to_string(),
                    message: "expected an array".to_string(),
                })
            }
            None => {
                return Err(ParseError::MissingField {
                    context: "document".to_string(),
                    field: "locations",
                })
            }
        },
        _ => {
            return Err(ParseError::Malformed {
                context: "document".to_string(),
                message: "expected an object or an array".to_string(),
            })
        }
    };

    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| candidate_location(entry, &format!("locations[{idx}]")))
        .collect())
}

fn candidate_location(entry: Value, context: &str) -> Result<CandidateLocation, ParseError> {
    let raw: RawLocation = serde_json::from_value(entry).map_err(|e| ParseError::Malformed {
        context: context.to_string(),
        message: e.to_string(),
    })?;

    let missing = |field| ParseError::MissingField {
        context: context.to_string(),
        field,
    };

    let tag = raw.defect.ok_or_else(|| missing("defect"))?;
    let defect = DefectClass::from_tag(&tag).ok_or_else(|| ParseError::UnknownTag {
        context: context.to_string(),
        field: "defect",
        value: tag.clone(),
    })?;

    let span = raw.location.ok_or_else(|| missing("location"))?;
    let location = Location {
        file_id: span.file_id,
        begin_line: span.begin_line,
        begin_column: span.begin_column,
        end_line: span.end_line,
        end_column: span.end_column,
    };
    if (location.begin_line, location.begin_column) > (location.end_line, location.end_column) {
        return Err(ParseError::Malformed {
            context: format!("{context}.location"),
            message: format!("span {location} ends before it begins"),
        });
    }

    let loc_id = raw.loc_id.ok_or_else(|| missing("locId"))?;
    let original = raw.original.ok_or_else(|| missing("original"))?;
    let original = expression(original, &format!("{context}.original"))?;
    let components = raw
        .components
        .ok_or_else(|| missing("components"))?
        .into_iter()
        .enumerate()
        .map(|(idx, c)| expression(c, &format!("{context}.components[{idx}]")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CandidateLocation {
        defect,
        location,
        loc_id,
        original,
        components,
    })
}

fn expression(raw: RawExpression, context: &str) -> Result<Expression, ParseError> {
    let missing = |field| ParseError::MissingField {
        context: context.to_string(),
        field,
    };
    let unknown = |field, value: &str| ParseError::UnknownTag {
        context: context.to_string(),
        field,
        value: value.to_string(),
    };

    let kind_tag = raw.kind.ok_or_else(|| missing("kind"))?;
    let kind = match kind_tag.as_str() {
        "operator" => Kind::Operator,
        "variable" => Kind::Variable,
        "constant" => Kind::Constant,
        "parameter" => Kind::Parameter,
        "bv2" | "int2" | "bool2" | "bool3" => {
            return Err(ParseError::AuxiliaryKind {
                context: context.to_string(),
                kind: kind_tag,
            })
        }
        other => return Err(unknown("kind", other)),
    };

    let type_tag = raw.ty.ok_or_else(|| missing("type"))?;
    let ty = match type_tag.as_str() {
        "boolean" => Type::Boolean,
        "integer" => Type::Integer,
        "pointer" => Type::Pointer,
        "bitvector" => Type::Bitvector,
        other => return Err(unknown("type", other)),
    };

    let repr = raw.repr.ok_or_else(|| missing("repr"))?;
    let raw_type = raw.raw_type.ok_or_else(|| missing("rawType"))?;

    let args = raw
        .args
        .into_iter()
        .enumerate()
        .map(|(idx, arg)| expression(arg, &format!("{context}.args[{idx}]")))
        .collect::<Result<Vec<_>, _>>()?;

    if kind != Kind::Operator {
        if !args.is_empty() {
            return Err(ParseError::Malformed {
                context: context.to_string(),
                message: format!("leaf '{repr}' has {} argument(s)", args.len()),
            });
        }
        return Ok(Expression {
            kind,
            ty,
            op: None,
            raw_type,
            repr,
            args,
        });
    }

    let op = operator_for_arity(&repr, args.len(), context)?;

    if operator_type(op) != ty {
        return Err(ParseError::Malformed {
            context: context.to_string(),
            message: format!(
                "operator '{repr}' yields {:?} but node is typed {type_tag}",
                operator_type(op)
            ),
        });
    }

    Ok(Expression {
        kind,
        ty,
        op: Some(op),
        raw_type,
        repr,
        args,
    })
}

/// Resolve an operator symbol through the table matching its argument count.
fn operator_for_arity(repr: &str, arity: usize, context: &str) -> Result<Operator, ParseError> {
    let lookup = match arity {
        1 => unary_operator_by_string,
        2 => binary_operator_by_string,
        found => {
            return Err(ParseError::Arity {
                context: context.to_string(),
                op: repr.to_string(),
                expected: if found == 0 { 1 } else { 2 },
                found,
            })
        }
    };
    lookup(repr).map_err(|source| ParseError::InNode {
        context: context.to_string(),
        source: Box::new(source),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::expression_to_string;
    use serde_json::json;

    fn var(name: &str) -> Value {
        json!({"kind": "variable", "type": "integer", "repr": name, "rawType": "int"})
    }

    fn constant(n: i64) -> Value {
        json!({"kind": "constant", "type": "integer", "repr": n.to_string(), "rawType": "int"})
    }

    fn binary(op: &str, ty: &str, lhs: Value, rhs: Value) -> Value {
        json!({"kind": "operator", "type": ty, "repr": op, "rawType": "int", "args": [lhs, rhs]})
    }

    fn entry(loc_id: u32, defect: &str) -> Value {
        json!({
            "defect": defect,
            "location": {"fileId": 0, "beginLine": 2, "beginColumn": 9, "endLine": 2, "endColumn": 15},
            "locId": loc_id,
            "original": binary(">=", "boolean", var("x"), constant(0)),
            "components": [var("x"), constant(0), var("n")]
        })
    }

    #[test]
    fn test_parse_wrapped_document() {
        let doc = json!({"locations": [entry(0, "condition"), entry(1, "guard")]});
        let locations = parse_candidate_locations(&doc.to_string()).unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].loc_id, 0);
        assert_eq!(locations[1].defect, DefectClass::Guard);
        assert_eq!(expression_to_string(&locations[0].original), "(x >= 0)");
        assert_eq!(locations[0].original.op, Some(Operator::Ge));
        assert_eq!(locations[0].components.len(), 3);
    }

    #[test]
    fn test_parse_bare_array_preserves_order() {
        let doc = json!([entry(5, "expression"), entry(3, "condition"), entry(4, "guard")]);
        let ids: Vec<u32> = parse_candidate_locations(&doc.to_string())
            .unwrap()
            .iter()
            .map(|l| l.loc_id)
            .collect();
        assert_eq!(ids, vec![5, 3, 4]);
    }

    #[test]
    fn test_missing_defect_names_position() {
        let mut broken = entry(1, "condition");
        broken.as_object_mut().unwrap().remove("defect");
        let doc = json!([entry(0, "condition"), broken]);

        let err = parse_candidate_locations(&doc.to_string()).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingField {
                context: "locations[1]".to_string(),
                field: "defect",
            }
        );

        let each = parse_each(&doc.to_string()).unwrap();
        assert!(each[0].is_ok());
        assert!(each[1].is_err());
    }

    #[test]
    fn test_unknown_defect_tag() {
        let err = parse_candidate_locations(&json!([entry(0, "loop")]).to_string()).unwrap_err();
        assert!(matches!(err, ParseError::UnknownTag { field: "defect", .. }));
    }

    #[test]
    fn test_unknown_operator_symbol() {
        let mut bad = entry(0, "condition");
        bad["original"] = binary("=>", "boolean", var("x"), constant(0));
        let err = parse_candidate_locations(&json!([bad]).to_string()).unwrap_err();
        match err {
            ParseError::InNode { context, source } => {
                assert_eq!(context, "locations[0].original");
                assert!(matches!(*source, ParseError::UnknownOperator { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unary_and_binary_minus() {
        let mut loc = entry(0, "expression");
        loc["original"] = json!({
            "kind": "operator", "type": "integer", "repr": "-", "rawType": "int",
            "args": [binary("-", "integer", var("a"), var("b"))]
        });
        let parsed = parse_candidate_locations(&json!([loc]).to_string()).unwrap();
        assert_eq!(parsed[0].original.op, Some(Operator::Neg));
        assert_eq!(parsed[0].original.args[0].op, Some(Operator::Sub));
    }

    #[test]
    fn test_arity_inconsistency() {
        let mut bad = entry(0, "condition");
        bad["original"] = json!({
            "kind": "operator", "type": "boolean", "repr": ">=", "rawType": "int",
            "args": [var("x"), constant(0), var("y")]
        });
        let err = parse_candidate_locations(&json!([bad]).to_string()).unwrap_err();
        assert!(matches!(err, ParseError::Arity { found: 3, .. }));
    }

    #[test]
    fn test_auxiliary_kind_rejected() {
        let mut bad = entry(0, "condition");
        bad["components"] = json!([{"kind": "int2", "type": "integer", "repr": "?", "rawType": "int"}]);
        let err = parse_candidate_locations(&json!([bad]).to_string()).unwrap_err();
        assert!(matches!(
            err,
            ParseError::AuxiliaryKind { ref context, .. } if context == "locations[0].components[0]"
        ));
    }

    #[test]
    fn test_operator_type_must_match_table() {
        let mut bad = entry(0, "condition");
        bad["original"] = binary(">=", "integer", var("x"), constant(0));
        let err = parse_candidate_locations(&json!([bad]).to_string()).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }

    #[test]
    fn test_invalid_json_reports_line() {
        let err = parse_candidate_locations("[\n{\"defect\": }\n]").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locations.json");
        fs::write(&path, json!([entry(0, "condition")]).to_string()).unwrap();
        assert_eq!(load_candidate_locations(&path).unwrap().len(), 1);

        fs::write(&path, json!([{"locId": 0}]).to_string()).unwrap();
        let err = load_candidate_locations(&path).unwrap_err();
        assert!(err.to_string().contains("locations.json"));
        assert!(err.to_string().contains("defect"));
    }
}
