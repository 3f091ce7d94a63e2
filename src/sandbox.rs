//! Process-wide working directory and environment, scoped to a validation run.
//!
//! Guards capture the previous state on construction and put it back when
//! dropped, so nested guards unwind in LIFO order. Both mutate state shared
//! by the whole process: hold at most one set of guards at a time.

use crate::config::{SandboxConfig, TestsConfig};
use crate::element::SearchSpaceElement;
use crate::space::visualize_f1xid;
use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("cannot read current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("cannot enter {path}: {source}")]
    Enter {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid environment variable name '{key}'")]
    InvalidKey { key: String },

    #[error("value of environment variable '{key}' contains a NUL byte")]
    InvalidValue { key: String },

    #[error("failed to restore {what}: {source}")]
    RestoreFailed {
        what: String,
        #[source]
        source: std::io::Error,
    },
}

/// Changes the working directory until dropped.
#[must_use = "the previous directory is restored when the guard is dropped"]
#[derive(Debug)]
pub struct DirectoryGuard {
    original: PathBuf,
    active: bool,
}

impl DirectoryGuard {
    pub fn enter(path: impl AsRef<Path>) -> Result<Self, EnvironmentError> {
        let path = path.as_ref();
        let original = env::current_dir().map_err(EnvironmentError::CurrentDir)?;
        env::set_current_dir(path).map_err(|source| EnvironmentError::Enter {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(from = %original.display(), to = %path.display(), "entered directory");
        Ok(Self {
            original,
            active: true,
        })
    }

    pub fn original(&self) -> &Path {
        &self.original
    }

    /// Restore now and report failure instead of logging it.
    pub fn restore(mut self) -> Result<(), EnvironmentError> {
        self.active = false;
        self.restore_inner()
    }

    fn restore_inner(&self) -> Result<(), EnvironmentError> {
        env::set_current_dir(&self.original).map_err(|source| EnvironmentError::RestoreFailed {
            what: format!("working directory {}", self.original.display()),
            source,
        })
    }
}

impl Drop for DirectoryGuard {
    fn drop(&mut self) {
        if self.active {
            if let Err(error) = self.restore_inner() {
                tracing::error!(%error, "directory guard could not restore");
            }
        }
    }
}

/// Overrides environment variables until dropped.
///
/// Variables that were unset before are removed again on restore.
#[must_use = "the previous environment is restored when the guard is dropped"]
#[derive(Debug)]
pub struct EnvironmentGuard {
    original: Vec<(String, Option<OsString>)>,
    active: bool,
}

impl EnvironmentGuard {
    pub fn set(vars: &BTreeMap<String, String>) -> Result<Self, EnvironmentError> {
        // Check everything first so a bad pair leaves the environment untouched.
        for (key, value) in vars {
            if !valid_key(key) {
                return Err(EnvironmentError::InvalidKey { key: key.clone() });
            }
            if value.contains('\0') {
                return Err(EnvironmentError::InvalidValue { key: key.clone() });
            }
        }
        let original = vars
            .iter()
            .map(|(key, value)| {
                let previous = env::var_os(key);
                env::set_var(key, value);
                (key.clone(), previous)
            })
            .collect();
        tracing::debug!(count = vars.len(), "environment overridden");
        Ok(Self {
            original,
            active: true,
        })
    }

    pub fn restore(mut self) -> Result<(), EnvironmentError> {
        self.active = false;
        self.restore_inner();
        Ok(())
    }

    fn restore_inner(&self) {
        for (key, previous) in self.original.iter().rev() {
            match previous {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
    }
}

impl Drop for EnvironmentGuard {
    fn drop(&mut self) {
        if self.active {
            self.restore_inner();
        }
    }
}

fn valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains('=') && !key.contains('\0')
}

/// Run `f` with `path` as the working directory.
///
/// The directory is restored whether `f` returns `Ok` or `Err`; a restore
/// failure is reported only when `f` itself succeeded.
pub fn in_directory<T, E>(
    path: impl AsRef<Path>,
    f: impl FnOnce() -> Result<T, E>,
) -> Result<T, E>
where
    E: From<EnvironmentError>,
{
    let guard = DirectoryGuard::enter(path)?;
    let result = f();
    let restored = guard.restore();
    let value = result?;
    restored?;
    Ok(value)
}

/// Run `f` with `vars` overriding the environment.
pub fn in_environment<T, E>(
    vars: &BTreeMap<String, String>,
    f: impl FnOnce() -> Result<T, E>,
) -> Result<T, E>
where
    E: From<EnvironmentError>,
{
    let guard = EnvironmentGuard::set(vars)?;
    let result = f();
    let restored = guard.restore();
    let value = result?;
    restored?;
    Ok(value)
}

/// Outcome of one test against one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Pass,
    Fail,
    /// The test could not be run to a verdict (driver missing, crash).
    Error,
    Timeout,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Pass => "pass",
            Verdict::Fail => "fail",
            Verdict::Error => "error",
            Verdict::Timeout => "timeout",
        })
    }
}

/// Executes one test for one candidate.
///
/// Called from inside [`Sandbox::validate`], so the working directory and
/// environment are already those of the sandbox.
pub trait TestRunner {
    fn run_test(&self, element: &SearchSpaceElement, test: &str) -> Verdict;
}

/// Where validation happens: an optional directory plus extra variables.
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    directory: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl Sandbox {
    pub fn new(directory: Option<PathBuf>, env: BTreeMap<String, String>) -> Self {
        Self { directory, env }
    }

    pub fn from_config(config: &SandboxConfig) -> Self {
        Self::new(config.directory.clone(), config.env.clone())
    }

    /// Run every test in `tests` against `element`, one verdict per test id.
    pub fn validate(
        &self,
        runner: &dyn TestRunner,
        element: &SearchSpaceElement,
        tests: &[String],
    ) -> Result<Vec<(String, Verdict)>, EnvironmentError> {
        let run = || -> Result<_, EnvironmentError> {
            in_environment(&self.env, || {
                let mut verdicts = Vec::with_capacity(tests.len());
                for test in tests {
                    let verdict = runner.run_test(element, test);
                    tracing::debug!(id = %element.id(), test, %verdict, "test finished");
                    verdicts.push((test.clone(), verdict));
                }
                Ok(verdicts)
            })
        };
        match &self.directory {
            Some(directory) => in_directory(directory, run),
            None => run(),
        }
    }
}

/// Runs `driver <test-id>` with the candidate selected through the
/// `F1X_LOC` and `F1X_ID` variables.
///
/// Exit status 0 is a pass, any other status a failure.
#[derive(Debug, Clone)]
pub struct DriverRunner {
    driver: PathBuf,
    timeout: Option<Duration>,
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);

impl DriverRunner {
    /// A relative `driver` is resolved against the current directory now,
    /// not against whatever directory the sandbox later enters.
    pub fn new(driver: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        let driver = driver.into();
        let driver = match env::current_dir() {
            Ok(cwd) if driver.is_relative() => cwd.join(driver),
            _ => driver,
        };
        Self { driver, timeout }
    }

    pub fn driver(&self) -> &Path {
        &self.driver
    }

    /// Build a runner from the `[tests]` table, if it names a driver.
    pub fn from_config(config: &TestsConfig) -> Option<Self> {
        let timeout = config.timeout_ms.map(Duration::from_millis);
        config.driver.as_ref().map(|driver| Self::new(driver, timeout))
    }
}

impl TestRunner for DriverRunner {
    fn run_test(&self, element: &SearchSpaceElement, test: &str) -> Verdict {
        if !is_executable(&self.driver) {
            tracing::warn!(driver = %self.driver.display(), "test driver is not executable");
            return Verdict::Error;
        }

        let mut command = Command::new(&self.driver);
        command
            .arg(test)
            .env("F1X_LOC", element.buggy().loc_id.to_string())
            .env("F1X_ID", visualize_f1xid(element.id()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt as _;
            // own group, so a timeout also reaches the build and test processes it starts
            command.process_group(0);
        }
        let spawned = command.spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(error) => {
                tracing::warn!(driver = %self.driver.display(), %error, "failed to spawn driver");
                return Verdict::Error;
            }
        };

        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) if status.success() => return Verdict::Pass,
                Ok(Some(_)) => return Verdict::Fail,
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(%error, "failed to wait for driver");
                    return Verdict::Error;
                }
            }
            if self.timeout.is_some_and(|limit| started.elapsed() >= limit) {
                kill_driver(&mut child);
                // reap
                let _ = child.wait();
                return Verdict::Timeout;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// SIGKILL the driver's process group, then the driver itself.
fn kill_driver(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pid) = i32::try_from(child.id()) {
            // SAFETY: plain syscall on a group this process created
            unsafe {
                let _ = libc::kill(-pid, libc::SIGKILL);
            }
        }
    }
    if let Err(error) = child.kill() {
        tracing::warn!(%error, "failed to kill timed-out driver");
    }
}

/// True for regular files with any execute bit set.
#[cfg(unix)]
pub fn is_executable(path: impl AsRef<Path>) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: impl AsRef<Path>) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
