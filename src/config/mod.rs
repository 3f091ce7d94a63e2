pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, ConfigError, ConfigOrigin};
pub use schema::{
    RepairConfig, SandboxConfig, SearchConfig, TestsConfig, ValidationError, ValidationIssue,
    DEFAULT_PARAM_LIMIT,
};
