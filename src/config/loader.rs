//! Reading `f1x.toml`.
//!
//! A config read from disk has its relative paths anchored at the file's
//! directory before validation, so the same file works whichever directory
//! `f1x` is started from.

use crate::config::schema::{RepairConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where a config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    Inline,
    File(PathBuf),
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigOrigin::Inline => f.write_str("<inline>"),
            ConfigOrigin::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read repair config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed repair config ({origin}): {source}")]
    Toml {
        origin: ConfigOrigin,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("repair config {origin} rejected:\n{source}")]
    Validation {
        origin: ConfigOrigin,
        #[source]
        source: ValidationError,
    },
}

/// Parse and validate a config held in memory. Relative paths stay as written.
pub fn load_from_str(input: &str) -> Result<RepairConfig, ConfigError> {
    parse(input, ConfigOrigin::Inline, None)
}

/// Read, parse and validate `path`, anchoring `tests.driver` and
/// `sandbox.directory` at the directory that holds it.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RepairConfig, ConfigError> {
    let path = path.as_ref();
    let io = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    let contents = fs::read_to_string(path).map_err(io)?;
    let base = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let base = fs::canonicalize(base).map_err(io)?;
    parse(&contents, ConfigOrigin::File(path.to_path_buf()), Some(&base))
}

fn parse(
    input: &str,
    origin: ConfigOrigin,
    base: Option<&Path>,
) -> Result<RepairConfig, ConfigError> {
    let mut config: RepairConfig = match toml_edit::de::from_str(input) {
        Ok(config) => config,
        Err(source) => return Err(ConfigError::Toml { origin, source }),
    };
    if let Some(base) = base {
        config.resolve_paths(base);
    }
    match config.validate() {
        Ok(()) => {
            tracing::debug!(%origin, tests = config.tests.ids.len(), "loaded repair config");
            Ok(config)
        }
        Err(source) => Err(ConfigError::Validation { origin, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ValidationIssue;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = load_from_str("").unwrap();
        assert_eq!(config.search.param_limit, 8);
        assert_eq!(config.search.max_candidates, 0);
        assert!(config.tests.ids.is_empty());
        assert!(config.sandbox.env.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = load_from_str(
            r#"
[search]
param_limit = 4
max_candidates = 500

[tests]
ids = ["1", "2", "3"]
timeout_ms = 1500
driver = "./tests/driver.sh"

[sandbox]
directory = "build"
env = { CC = "f1x-cc", F1X_ID = "0" }
"#,
        )
        .unwrap();
        assert_eq!(config.search.param_limit, 4);
        assert_eq!(config.search.max_candidates, 500);
        assert_eq!(config.tests.ids, vec!["1", "2", "3"]);
        assert_eq!(config.tests.timeout_ms, Some(1500));
        assert_eq!(config.sandbox.env.get("CC").map(String::as_str), Some("f1x-cc"));
        assert_eq!(config.sandbox.directory, Some(PathBuf::from("build")));
    }

    #[test]
    fn test_validation_collects_issues() {
        let err = load_from_str(
            r#"
[search]
param_limit = 0

[tests]
ids = ["a", "a"]
timeout_ms = 0
"#,
        )
        .unwrap_err();
        match err {
            ConfigError::Validation { source, .. } => assert_eq!(source.issues.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = load_from_str("[search]\nparam_limt = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn test_path_is_attached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f1x.toml");
        fs::write(&path, "[search]\nparam_limit = 0\n").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("f1x.toml"));

        let missing = load_from_path(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }

    #[test]
    fn test_relative_paths_anchor_at_config_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let path = root.join("f1x.toml");
        fs::write(
            &path,
            "[tests]\ndriver = \"./driver.sh\"\n\n[sandbox]\ndirectory = \"build\"\n",
        )
        .unwrap();

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.tests.driver, Some(root.join("./driver.sh")));
        assert_eq!(config.sandbox.directory, Some(root.join("build")));

        let inline = load_from_str("[tests]\ndriver = \"./driver.sh\"\n").unwrap();
        assert_eq!(inline.tests.driver, Some(PathBuf::from("./driver.sh")));
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f1x.toml");
        fs::write(&path, "[sandbox]\ndirectory = \"/opt/build\"\n").unwrap();
        let config = load_from_path(&path).unwrap();
        assert_eq!(config.sandbox.directory, Some(PathBuf::from("/opt/build")));
    }

    #[test]
    fn test_nul_in_env_value_rejected() {
        let err = load_from_str("[sandbox]\nenv = { CC = \"gcc\\u0000\" }\n").unwrap_err();
        let ConfigError::Validation { source, .. } = err else {
            panic!("expected a validation error");
        };
        assert!(matches!(
            source.issues.as_slice(),
            [ValidationIssue::InvalidEnvValue { key }] if key == "CC"
        ));
    }
}
