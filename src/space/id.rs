use crate::expr::ParseError;
use crate::location::hash_combine;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Coordinate of one patch in a candidate location's combinatorial space.
///
/// IDs compare field by field, never through a derived scalar rank, so a
/// driver can hold four dimensions fixed and iterate the fifth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct F1xId {
    /// Component selection: a single component or an ordered pair.
    pub base: u32,
    /// Auxiliary integer (or bitvector) binary operator, 0 for none.
    pub int2: u32,
    /// Auxiliary boolean binary operator, 0 for none.
    pub bool2: u32,
    /// Conditional wrapping shape, 0 for none.
    pub cond3: u32,
    /// Free parameter value, zigzag coded.
    pub param: u32,
}

impl F1xId {
    pub const fn new(base: u32, int2: u32, bool2: u32, cond3: u32, param: u32) -> Self {
        Self {
            base,
            int2,
            bool2,
            cond3,
            param,
        }
    }

    pub fn fields(&self) -> [u32; 5] {
        [self.base, self.int2, self.bool2, self.cond3, self.param]
    }

    /// Order-sensitive fold over the field hashes; stable within one process.
    pub fn structural_hash(&self) -> u64 {
        self.fields().into_iter().fold(0, hash_combine)
    }
}

impl Hash for F1xId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.structural_hash());
    }
}

impl fmt::Display for F1xId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.base, self.int2, self.bool2, self.cond3, self.param
        )
    }
}

impl FromStr for F1xId {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |message: String| ParseError::InvalidId {
            input: input.to_string(),
            message,
        };

        let parts: Vec<&str> = input.trim().split(':').collect();
        if parts.len() != 5 {
            return Err(invalid(format!("expected 5 fields, found {}", parts.len())));
        }

        let mut fields = [0u32; 5];
        for (slot, part) in fields.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|e| invalid(format!("field '{part}': {e}")))?;
        }
        let [base, int2, bool2, cond3, param] = fields;
        Ok(Self::new(base, int2, bool2, cond3, param))
    }
}

/// Stable, human-readable form used in logs.
pub fn visualize_f1xid(id: &F1xId) -> String {
    id.to_string()
}

/// Map a parameter coordinate to its literal: 0, -1, 1, -2, 2, ...
pub fn param_value(param: u32) -> i64 {
    let p = i64::from(param);
    if p % 2 == 0 {
        p / 2
    } else {
        -(p + 1) / 2
    }
}

/// Inverse of [`param_value`]; `None` when the literal is out of range.
pub fn param_index(value: i64) -> Option<u32> {
    let index = if value >= 0 {
        value.checked_mul(2)?
    } else {
        value.checked_mul(-2)?.checked_sub(1)?
    };
    u32::try_from(index).ok()
}
