//! Unified error types for the nbcheck workspace.
//!
//! Harness-level failures (a container that never starts, a runtime that is
//! missing) are errors. Individual check failures are recorded outcomes and
//! only become a [`HarnessError::CheckFailure`] once a run is finalised.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// An I/O operation failed, usually spawning the runtime binary.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path or program where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// The container runtime CLI could not be located.
    #[error("container runtime `{runtime}` not found on PATH")]
    RuntimeNotFound {
        /// Binary name that was looked up.
        runtime: String,
    },

    /// The runtime refused to start the container.
    #[error("failed to launch container {name} (exit code {exit_code}): {stderr}")]
    Launch {
        /// Container name passed to the runtime.
        name: String,
        /// Exit code of the runtime `run` invocation.
        exit_code: i32,
        /// Captured standard error of the runtime.
        stderr: String,
    },

    /// The service inside the container never became reachable.
    #[error(
        "container {name} not reachable at {url} after {attempts} attempts\nLogs:\n{logs}"
    )]
    ReadinessTimeout {
        /// Container name.
        name: String,
        /// URL that was polled.
        url: String,
        /// Number of probes issued.
        attempts: u32,
        /// Container stdout and stderr captured before teardown.
        logs: String,
    },

    /// One or more checks did not hold.
    #[error("{failed} of {total} check(s) failed: {}", names.join(", "))]
    CheckFailure {
        /// Number of failed checks.
        failed: usize,
        /// Number of checks that were executed.
        total: usize,
        /// Names of the failed checks.
        names: Vec<String>,
    },

    /// A host capability required by a suite is missing.
    #[error("capability unavailable: {reason}")]
    CapabilityUnavailable {
        /// Why the capability was judged unavailable.
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {message}")]
    Http {
        /// Description of the failure.
        message: String,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, HarnessError>;
