//! The combinatorial patch space of a candidate location.
//!
//! An [`F1xId`] names one point of the space; [`decode`] turns it into an
//! expression, [`encode`] goes the other way, and [`IdSpace`] bounds and
//! iterates the coordinates without materialising any patch up front.

pub mod decode;
pub mod encode;
pub mod enumerate;
pub mod id;

pub use decode::{
    base_bound, base_index, build_template, check_root_type, decode, instantiate, select,
    Selection, BOOL2_OPERATORS, BV2_OPERATORS, INT2_OPERATORS,
};
pub use encode::encode;
pub use enumerate::{enumerate, rank, Dimension, IdIter, IdSpace};
pub use id::{param_index, param_value, visualize_f1xid, F1xId};
