//! Repair sites: source spans, defect classes, and candidate locations.

use crate::expr::{Expression, Type};
use std::fmt;
use std::hash::{Hash, Hasher};
use xxhash_rust::xxh3::xxh3_64;

/// Fold one field into a running structural hash.
///
/// Non-cryptographic and order-sensitive. Values are only meant to be
/// compared within a single process run.
pub fn hash_combine(seed: u64, field: u32) -> u64 {
    let h = xxh3_64(&field.to_le_bytes());
    seed ^ h
        .wrapping_add(0x9e37_79b9)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2)
}

/// Where in the statement grammar a repair applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefectClass {
    /// Existing condition of an `if`, `for`, `while`, ...
    Condition,
    /// Right side of an assignment or a call argument.
    Expression,
    /// A new guard wrapped around an existing statement.
    Guard,
}

impl DefectClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefectClass::Condition => "condition",
            DefectClass::Expression => "expression",
            DefectClass::Guard => "guard",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "condition" => Some(DefectClass::Condition),
            "expression" => Some(DefectClass::Expression),
            "guard" => Some(DefectClass::Guard),
            _ => None,
        }
    }
}

/// Half-open source span inside the file numbered `file_id`.
///
/// Lines and columns are 1-based; `end_column` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    pub file_id: u32,
    pub begin_line: u32,
    pub begin_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Location {
    pub fn structural_hash(&self) -> u64 {
        [
            self.file_id,
            self.begin_line,
            self.begin_column,
            self.end_line,
            self.end_column,
        ]
        .into_iter()
        .fold(0, hash_combine)
    }
}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.structural_hash());
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{}:{}:{}-{}:{}",
            self.file_id, self.begin_line, self.begin_column, self.end_line, self.end_column
        )
    }
}

/// One program site eligible for repair.
///
/// Built once by the loader and shared through `Arc` afterwards; nothing
/// mutates it after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLocation {
    pub defect: DefectClass,
    pub location: Location,
    /// Identifies a schema application, so several entries may share one `location`.
    pub loc_id: u32,
    pub original: Expression,
    pub components: Vec<Expression>,
}

impl CandidateLocation {
    /// Type every patch at this site must have.
    pub fn required_type(&self) -> Type {
        match self.defect {
            DefectClass::Condition | DefectClass::Guard => Type::Boolean,
            DefectClass::Expression => self.original.ty,
        }
    }

    /// Indices of the components usable as boolean legs.
    pub fn boolean_components(&self) -> Vec<usize> {
        self.components
            .iter()
            .enumerate()
            .filter(|(_, c)| c.ty == Type::Boolean)
            .map(|(idx, _)| idx)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::get_integer_expression;
    use std::collections::HashSet;

    fn span(file_id: u32, begin_line: u32) -> Location {
        Location {
            file_id,
            begin_line,
            begin_column: 5,
            end_line: begin_line,
            end_column: 11,
        }
    }

    #[test]
    fn test_location_equality_and_hash() {
        assert_eq!(span(0, 3), span(0, 3));
        assert_ne!(span(0, 3), span(1, 3));
        assert_eq!(span(0, 3).structural_hash(), span(0, 3).structural_hash());

        let set: HashSet<Location> = [span(0, 3), span(0, 3), span(0, 4)].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_hash_is_order_sensitive() {
        let a = [1u32, 2].into_iter().fold(0, hash_combine);
        let b = [2u32, 1].into_iter().fold(0, hash_combine);
        assert_ne!(a, b);
    }

    #[test]
    fn test_required_type() {
        let mut loc = CandidateLocation {
            defect: DefectClass::Expression,
            location: span(0, 1),
            loc_id: 0,
            original: get_integer_expression(1),
            components: vec![],
        };
        assert_eq!(loc.required_type(), Type::Integer);
        loc.defect = DefectClass::Guard;
        assert_eq!(loc.required_type(), Type::Boolean);
    }

    #[test]
    fn test_defect_tags() {
        for defect in [
            DefectClass::Condition,
            DefectClass::Expression,
            DefectClass::Guard,
        ] {
            assert_eq!(DefectClass::from_tag(defect.as_str()), Some(defect));
        }
        assert_eq!(DefectClass::from_tag("loop"), None);
    }
}
