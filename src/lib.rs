//! f1x: the candidate space of a test-driven program repair engine.
//!
//! A front-end instruments a C program and reports candidate locations:
//! suspicious expressions together with the components (variables,
//! constants, subexpressions) that may be used to rewrite them. This crate
//! turns each location into a searchable space of patches.
//!
//! # Architecture
//!
//! Every patch in a location's space is named by a compact [`F1xId`]. The
//! id is decoded on demand into an [`Expression`], checked for typing, and
//! packaged as a [`SearchSpaceElement`] together with a [`PatchMeta`] that
//! classifies the edit and measures its distance from the original.
//! Nothing is materialised up front; [`enumerate`] walks an [`IdSpace`].
//!
//! Validation patches the source in place ([`SourcePatch`]) and runs tests
//! inside a [`Sandbox`] whose working directory and environment are
//! restored by RAII guards.
//!
//! # Example
//!
//! ```no_run
//! use f1x::{load_candidate_locations, enumerate, rank, SearchConfig};
//!
//! let locations = load_candidate_locations("locations.json")?;
//! for loc in &locations {
//!     let mut elements = enumerate(loc, &SearchConfig::default());
//!     rank(&mut elements);
//!     for element in elements.iter().take(3) {
//!         println!("{}", element.summary());
//!     }
//! }
//! # Ok::<(), f1x::LoadError>(())
//! ```

pub mod candidates;
pub mod config;
pub mod element;
pub mod expr;
pub mod location;
pub mod patch;
pub mod sandbox;
pub mod space;
pub mod transform;

// Re-exports
pub use candidates::{load_candidate_locations, parse_candidate_locations, parse_each, LoadError};
pub use config::{ConfigError, RepairConfig, SandboxConfig, SearchConfig, TestsConfig};
pub use element::{patched_source, visualize_element, SearchSpaceElement, VisualizeError};
pub use expr::{
    binary_operator_by_string, expression_to_string, get_integer_expression, get_null_pointer,
    operator_to_string, operator_type, unary_operator_by_string, Expression, Kind, Operator,
    ParseError, Type, WellFormednessError,
};
pub use location::{hash_combine, CandidateLocation, DefectClass, Location};
pub use patch::{AppliedPatch, PatchError, SourcePatch};
pub use sandbox::{
    in_directory, in_environment, is_executable, DirectoryGuard, DriverRunner, EnvironmentError,
    EnvironmentGuard, Sandbox, TestRunner, Verdict,
};
pub use space::{decode, encode, enumerate, rank, visualize_f1xid, F1xId, IdSpace};
pub use transform::{classify, distance, PatchMeta, Transformation};
