use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default number of parameter values enumerated per slot.
pub const DEFAULT_PARAM_LIMIT: u32 = 8;

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct RepairConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub tests: TestsConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// How many zigzag parameter values (0, -1, 1, ...) to try per slot.
    #[serde(default = "default_param_limit")]
    pub param_limit: u32,
    /// Cap on elements produced per location; 0 means unbounded.
    #[serde(default)]
    pub max_candidates: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            param_limit: DEFAULT_PARAM_LIMIT,
            max_candidates: 0,
        }
    }
}

fn default_param_limit() -> u32 {
    DEFAULT_PARAM_LIMIT
}

/// Handed to the external test runner; the core only validates it.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestsConfig {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub driver: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct SandboxConfig {
    /// Working directory for test execution.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl RepairConfig {
    /// Anchor relative `tests.driver` and `sandbox.directory` at `base`.
    ///
    /// The driver runs after the sandbox directory has been entered, so a
    /// path left relative would be looked up from there instead.
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.tests.driver, &mut self.sandbox.directory]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.search.param_limit == 0 {
            issues.push(ValidationIssue::InvalidValue {
                field: "search.param_limit",
                message: "must be at least 1".to_string(),
            });
        }

        if self.tests.timeout_ms == Some(0) {
            issues.push(ValidationIssue::InvalidValue {
                field: "tests.timeout_ms",
                message: "use no timeout instead of 0".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for id in &self.tests.ids {
            if id.trim().is_empty() {
                issues.push(ValidationIssue::InvalidValue {
                    field: "tests.ids",
                    message: "test id must not be empty".to_string(),
                });
            } else if !seen.insert(id.as_str()) {
                issues.push(ValidationIssue::DuplicateTest { id: id.clone() });
            }
        }

        for (key, value) in &self.sandbox.env {
            if key.is_empty() || key.contains('=') || key.contains('\0') {
                issues.push(ValidationIssue::InvalidEnvKey { key: key.clone() });
            }
            if value.contains('\0') {
                issues.push(ValidationIssue::InvalidEnvValue { key: key.clone() });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    InvalidValue {
        field: &'static str,
        message: String,
    },
    DuplicateTest {
        id: String,
    },
    InvalidEnvKey {
        key: String,
    },
    InvalidEnvValue {
        key: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::InvalidValue { field, message } => {
                write!(f, "invalid value for '{field}': {message}")
            }
            ValidationIssue::DuplicateTest { id } => write!(f, "test '{id}' listed twice"),
            ValidationIssue::InvalidEnvKey { key } => {
                write!(f, "'{key}' is not a valid environment variable name")
            }
            ValidationIssue::InvalidEnvValue { key } => {
                write!(f, "value of '{key}' contains a NUL byte")
            }
        }
    }
}
