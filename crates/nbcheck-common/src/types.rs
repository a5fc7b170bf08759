//! Domain primitive types used across the nbcheck workspace.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Name given to a container instance on the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerName(String);

impl ContainerName {
    /// Creates a container name from a string value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Generates a unique name with the given prefix.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{prefix}-{}", &id[..12]))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a container image (`repository[:tag]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef(String);

impl ImageRef {
    /// Creates an image reference from a string value.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A host port published to a container port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortMapping {
    /// Port on the host.
    pub host: u16,
    /// Port inside the container.
    pub container: u16,
}

impl PortMapping {
    /// Publishes `port` on the same host port.
    #[must_use]
    pub const fn same(port: u16) -> Self {
        Self {
            host: port,
            container: port,
        }
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

impl FromStr for PortMapping {
    type Err = HarnessError;

    /// Parses `HOST:CONTAINER` or a bare `PORT`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim().parse::<u16>().map_err(|_| HarnessError::Config {
                message: format!("invalid port mapping: {s}"),
            })
        };
        match s.split_once(':') {
            Some((host, container)) => Ok(Self {
                host: parse(host)?,
                container: parse(container)?,
            }),
            None => parse(s).map(Self::same),
        }
    }
}

/// Devices requested from the runtime when launching a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceRequest {
    /// No device passthrough.
    #[default]
    None,
    /// Pass every GPU through (`--gpus all`).
    AllGpus,
}

/// Attempt budget and spacing for a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, always at least one.
    pub max_attempts: u32,
    /// Delay slept between two consecutive attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy. A zero attempt count is raised to one.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Budget used while waiting for a freshly launched container.
    #[must_use]
    pub fn startup() -> Self {
        Self::new(
            crate::constants::MAX_STARTUP_RETRIES,
            Duration::from_secs(crate::constants::STARTUP_RETRY_DELAY_SECS),
        )
    }

    /// Budget used by individual HTTP checks.
    #[must_use]
    pub fn per_check() -> Self {
        Self::new(
            crate::constants::HTTP_MAX_RETRIES,
            Duration::from_secs(crate::constants::HTTP_RETRY_DELAY_SECS),
        )
    }
}

/// Phase of a suite run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Nothing has happened yet.
    NotStarted,
    /// The container is being started.
    Launching,
    /// Waiting for the service inside the container.
    AwaitingReady,
    /// The service answered; checks may run.
    Ready,
    /// The container never came up. Terminal.
    StartupFailed,
    /// Checks are being evaluated.
    RunningChecks,
    /// The container has been removed.
    TornDown,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not-started"),
            Self::Launching => write!(f, "launching"),
            Self::AwaitingReady => write!(f, "awaiting-ready"),
            Self::Ready => write!(f, "ready"),
            Self::StartupFailed => write!(f, "startup-failed"),
            Self::RunningChecks => write!(f, "running-checks"),
            Self::TornDown => write!(f, "torn-down"),
        }
    }
}
