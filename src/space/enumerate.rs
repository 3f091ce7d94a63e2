//! Iterating a location's id space and turning ids into elements.

use super::decode::{base_bound, decode_with_slots, BOOL2_OPERATORS, INT2_OPERATORS};
use super::id::F1xId;
use crate::config::SearchConfig;
use crate::element::SearchSpaceElement;
use crate::location::CandidateLocation;
use std::sync::Arc;

/// One axis of the id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Base,
    Int2,
    Bool2,
    Cond3,
    Param,
}

/// Exclusive upper bounds of every coordinate at one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSpace {
    pub base: u32,
    pub int2: u32,
    pub bool2: u32,
    pub cond3: u32,
    pub param: u32,
}

impl IdSpace {
    pub fn for_location(location: &CandidateLocation, param_limit: u32) -> Self {
        let m = location.boolean_components().len() as u64;
        let clamp = |v: u64| u32::try_from(v).unwrap_or(u32::MAX);
        Self {
            base: clamp(base_bound(location.components.len())),
            int2: INT2_OPERATORS.len() as u32 + 1,
            bool2: BOOL2_OPERATORS.len() as u32 + 1,
            cond3: clamp(1 + m * m),
            param: param_limit.max(1),
        }
    }

    fn bounds(&self) -> [u32; 5] {
        [self.base, self.int2, self.bool2, self.cond3, self.param]
    }

    /// Number of ids, well-formed or not.
    pub fn size(&self) -> u64 {
        self.bounds().iter().map(|&b| u64::from(b)).product()
    }

    pub fn contains(&self, id: &F1xId) -> bool {
        id.fields()
            .iter()
            .zip(self.bounds())
            .all(|(&value, bound)| value < bound)
    }

    /// All ids in lexicographic order, `param` varying fastest.
    pub fn iter(&self) -> IdIter {
        IdIter {
            bounds: self.bounds(),
            next: (self.size() > 0).then(F1xId::default),
        }
    }

    /// Ids equal to `fixed` except along `dimension`.
    pub fn slice(&self, fixed: F1xId, dimension: Dimension) -> impl Iterator<Item = F1xId> {
        let bound = self.bounds()[dimension as usize];
        (0..bound).map(move |value| {
            let mut id = fixed;
            match dimension {
                Dimension::Base => id.base = value,
                Dimension::Int2 => id.int2 = value,
                Dimension::Bool2 => id.bool2 = value,
                Dimension::Cond3 => id.cond3 = value,
                Dimension::Param => id.param = value,
            }
            id
        })
    }
}

pub struct IdIter {
    bounds: [u32; 5],
    next: Option<F1xId>,
}

impl Iterator for IdIter {
    type Item = F1xId;

    fn next(&mut self) -> Option<F1xId> {
        let current = self.next?;
        let mut fields = current.fields();
        self.next = None;
        for idx in (0..fields.len()).rev() {
            fields[idx] += 1;
            if fields[idx] < self.bounds[idx] {
                let [base, int2, bool2, cond3, param] = fields;
                self.next = Some(F1xId::new(base, int2, bool2, cond3, param));
                break;
            }
            fields[idx] = 0;
        }
        Some(current)
    }
}

/// Decode every well-formed id of `location` into an element.
///
/// Ill-formed ids are logged and skipped. Templates without a parameter
/// slot are decoded once instead of once per parameter value.
pub fn enumerate(
    location: &Arc<CandidateLocation>,
    config: &SearchConfig,
) -> Vec<SearchSpaceElement> {
    let space = IdSpace::for_location(location, config.param_limit);
    let templates = IdSpace { param: 1, ..space };
    let limit = match config.max_candidates {
        0 => usize::MAX,
        n => n,
    };

    let mut elements = Vec::new();
    let mut skipped = 0usize;

    'ids: for prefix in templates.iter() {
        match decode_with_slots(&prefix, location) {
            Ok((_, uses_param)) => {
                let params = if uses_param { space.param } else { 1 };
                for param in 0..params {
                    let id = F1xId { param, ..prefix };
                    match SearchSpaceElement::decode(location, id) {
                        Ok(element) => elements.push(element),
                        Err(error) => {
                            skipped += 1;
                            tracing::debug!(id = %id, %error, "skipping ill-formed candidate");
                        }
                    }
                    if elements.len() >= limit {
                        tracing::info!(loc_id = location.loc_id, limit, "candidate limit reached");
                        break 'ids;
                    }
                }
            }
            Err(error) => {
                skipped += 1;
                tracing::trace!(id = %prefix, %error, "skipping ill-formed template");
            }
        }
    }

    tracing::debug!(
        loc_id = location.loc_id,
        produced = elements.len(),
        skipped,
        "enumerated candidate location"
    );
    elements
}

/// Order elements by distance, then id; stable for equal keys.
pub fn rank(elements: &mut [SearchSpaceElement]) {
    elements.sort_by_key(|element| (element.meta().distance, *element.id()));
}
