//! Search-space elements and their rendering as source diffs.

use crate::expr::{expression_to_string, Expression, WellFormednessError};
use crate::location::{CandidateLocation, Location};
use crate::space::{check_root_type, decode, visualize_f1xid, F1xId};
use crate::transform::{classify, PatchMeta};
use similar::TextDiff;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// A concrete patch for one candidate location, ready for validation.
///
/// Construction checks the patch against the location's defect class, so
/// an element that exists is always well-formed. Fields are read-only.
#[derive(Debug, Clone)]
pub struct SearchSpaceElement {
    buggy: Arc<CandidateLocation>,
    id: F1xId,
    patch: Expression,
    meta: PatchMeta,
}

impl SearchSpaceElement {
    pub fn new(
        buggy: Arc<CandidateLocation>,
        id: F1xId,
        patch: Expression,
    ) -> Result<Self, WellFormednessError> {
        patch.check_well_formed()?;
        check_root_type(&buggy, &patch)?;
        let meta = classify(&buggy.original, &patch);
        Ok(Self {
            buggy,
            id,
            patch,
            meta,
        })
    }

    /// Decode `id` at `buggy` and package the result.
    pub fn decode(buggy: &Arc<CandidateLocation>, id: F1xId) -> Result<Self, WellFormednessError> {
        let patch = decode(&id, buggy)?;
        Self::new(Arc::clone(buggy), id, patch)
    }

    pub fn buggy(&self) -> &Arc<CandidateLocation> {
        &self.buggy
    }

    pub fn id(&self) -> &F1xId {
        &self.id
    }

    pub fn patch(&self) -> &Expression {
        &self.patch
    }

    pub fn meta(&self) -> &PatchMeta {
        &self.meta
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "[{}] loc {} {}: {} -> {} ({}, distance {})",
            visualize_f1xid(&self.id),
            self.buggy.loc_id,
            self.buggy.location,
            expression_to_string(&self.buggy.original),
            expression_to_string(&self.patch),
            self.meta.transformation,
            self.meta.distance
        )
    }
}

#[derive(Error, Debug)]
pub enum VisualizeError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("span {location} does not fit in {path}")]
    SpanOutOfRange { location: Location, path: PathBuf },
}

/// Byte range `[start, end)` covered by `location` in `source`.
///
/// Columns count bytes, as compiler front-ends report them.
pub fn span_to_bytes(source: &str, location: &Location) -> Option<(usize, usize)> {
    let start = offset(source, location.begin_line, location.begin_column)?;
    let end = offset(source, location.end_line, location.end_column)?;
    (start <= end).then_some((start, end))
}

fn offset(source: &str, line: u32, column: u32) -> Option<usize> {
    let line_index = (line as usize).checked_sub(1)?;
    let column_index = (column as usize).checked_sub(1)?;

    let mut line_start = 0;
    for _ in 0..line_index {
        line_start += source[line_start..].find('\n')? + 1;
    }
    let line_len = source[line_start..]
        .find('\n')
        .unwrap_or(source.len() - line_start);
    if column_index > line_len {
        return None;
    }
    let byte = line_start + column_index;
    source.is_char_boundary(byte).then_some(byte)
}

/// Source text with the element's span replaced by its patch.
pub fn patched_source(element: &SearchSpaceElement, source: &str) -> Option<String> {
    let (start, end) = span_to_bytes(source, &element.buggy.location)?;
    let replacement = expression_to_string(&element.patch);
    let mut out = String::with_capacity(source.len() + replacement.len());
    out.push_str(&source[..start]);
    out.push_str(&replacement);
    out.push_str(&source[end..]);
    Some(out)
}

/// Render `element` as a unified diff against `file`.
pub fn visualize_element(
    element: &SearchSpaceElement,
    file: &Path,
) -> Result<String, VisualizeError> {
    let source = fs::read_to_string(file).map_err(|source| VisualizeError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    let patched =
        patched_source(element, &source).ok_or_else(|| VisualizeError::SpanOutOfRange {
            location: element.buggy.location,
            path: file.to_path_buf(),
        })?;

    let name = file.display().to_string();
    let diff = TextDiff::from_lines(&source, &patched);
    Ok(diff
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{name}"), &format!("b/{name}"))
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{get_integer_expression, Operator, Type};
    use crate::location::DefectClass;
    use crate::transform::Transformation;

    fn int(name: &str) -> Expression {
        Expression::variable(name, Type::Integer, "int")
    }

    // `if (x >= 0)` on line 2, columns 9..15 (exclusive end)
    const SOURCE: &str = "int f(int x) {\n    if (x >= 0)\n        return 1;\n    return 0;\n}\n";

    fn location(defect: DefectClass) -> Arc<CandidateLocation> {
        let original = Expression::apply(Operator::Ge, vec![int("x"), get_integer_expression(0)]);
        Arc::new(CandidateLocation {
            defect,
            location: Location {
                file_id: 0,
                begin_line: 2,
                begin_column: 9,
                end_line: 2,
                end_column: 15,
            },
            loc_id: 0,
            original,
            components: vec![
                Expression::apply(Operator::Gt, vec![int("x"), get_integer_expression(0)]),
                int("x"),
            ],
        })
    }

    #[test]
    fn test_alternative_scenario() {
        let loc = location(DefectClass::Expression);
        let element = SearchSpaceElement::decode(&loc, F1xId::default()).unwrap();
        assert_eq!(expression_to_string(element.patch()), "(x > 0)");
        assert_eq!(element.meta().transformation, Transformation::Alternative);
        assert_eq!(element.meta().distance, 1);
        assert!(Arc::ptr_eq(element.buggy(), &loc));
    }

    #[test]
    fn test_new_rejects_wrong_root_type() {
        let loc = location(DefectClass::Condition);
        let err = SearchSpaceElement::new(Arc::clone(&loc), F1xId::default(), int("x")).unwrap_err();
        assert!(matches!(err, WellFormednessError::RootType { .. }));
    }

    #[test]
    fn test_span_to_bytes() {
        let loc = location(DefectClass::Condition);
        let (start, end) = span_to_bytes(SOURCE, &loc.location).unwrap();
        assert_eq!(&SOURCE[start..end], "x >= 0");

        let bad = Location {
            begin_line: 9,
            ..loc.location
        };
        assert_eq!(span_to_bytes(SOURCE, &bad), None);
    }

    #[test]
    fn test_visualize_element() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.c");
        fs::write(&file, SOURCE).unwrap();

        let loc = location(DefectClass::Condition);
        let element = SearchSpaceElement::decode(&loc, F1xId::default()).unwrap();
        let diff = visualize_element(&element, &file).unwrap();

        assert!(diff.contains("-    if (x >= 0)"));
        assert!(diff.contains("+    if ((x > 0))"));
        assert!(diff.contains("@@"));
    }

    #[test]
    fn test_visualize_missing_file() {
        let loc = location(DefectClass::Condition);
        let element = SearchSpaceElement::decode(&loc, F1xId::default()).unwrap();
        let err = visualize_element(&element, Path::new("/nonexistent/f.c")).unwrap_err();
        assert!(matches!(err, VisualizeError::Io { .. }));
    }

    #[test]
    fn test_summary_mentions_id_and_kind() {
        let loc = location(DefectClass::Condition);
        let element = SearchSpaceElement::decode(&loc, F1xId::default()).unwrap();
        let summary = element.summary();
        assert!(summary.starts_with("[0:0:0:0:0]"));
        assert!(summary.contains("alternative"));
    }
}
