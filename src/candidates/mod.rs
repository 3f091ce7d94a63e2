//! Candidate locations as reported by the instrumenting front-end.

pub mod errors;
pub mod loader;

pub use errors::LoadError;
pub use loader::{load_candidate_locations, parse_candidate_locations, parse_each};
