//! Container runtime abstraction.
//!
//! The harness only ever talks to a runtime through [`ContainerRuntime`];
//! the production implementation shells out to a Docker-compatible CLI.

pub mod cli;

use std::path::PathBuf;
use std::time::Duration;

use nbcheck_common::error::Result;
use nbcheck_common::types::{ContainerName, DeviceRequest, ImageRef, PortMapping};
use serde::Serialize;

use crate::exec::ProbeResult;

pub use cli::CliRuntime;

/// Everything needed to start a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Container name.
    pub name: ContainerName,
    /// Image to run.
    pub image: ImageRef,
    /// Environment variables injected into the container.
    pub env: Vec<(String, String)>,
    /// Published ports.
    pub ports: Vec<PortMapping>,
    /// Requested device passthrough.
    pub devices: DeviceRequest,
    /// Command overriding the image entrypoint arguments. Empty keeps the default.
    pub command: Vec<String>,
}

impl LaunchSpec {
    /// Creates a spec running `image` with its default command.
    #[must_use]
    pub const fn new(name: ContainerName, image: ImageRef) -> Self {
        Self {
            name,
            image,
            env: Vec::new(),
            ports: Vec::new(),
            devices: DeviceRequest::None,
            command: Vec::new(),
        }
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Publishes a port.
    #[must_use]
    pub fn port(mut self, mapping: PortMapping) -> Self {
        self.ports.push(mapping);
        self
    }

    /// Requests device passthrough.
    #[must_use]
    pub const fn devices(mut self, devices: DeviceRequest) -> Self {
        self.devices = devices;
        self
    }

    /// Sets the command run in the container.
    #[must_use]
    pub fn command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }
}

/// Subprocess boundary to a container runtime.
///
/// Every operation returns the raw `(exit code, stdout, stderr)` of the
/// runtime as a [`ProbeResult`]; interpreting a non-zero exit is left to the
/// caller. Errors are reserved for failures to run the runtime at all.
pub trait ContainerRuntime: Send + Sync {
    /// Name of the runtime binary, for diagnostics.
    fn binary(&self) -> &str;

    /// Starts a detached container.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be executed.
    fn run_detached(&self, spec: &LaunchSpec) -> Result<ProbeResult>;

    /// Runs a container to completion and removes it afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be executed.
    fn run_ephemeral(&self, spec: &LaunchSpec, timeout: Duration) -> Result<ProbeResult>;

    /// Executes a command inside a running container.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be executed.
    fn exec(&self, name: &ContainerName, command: &[String], timeout: Duration)
    -> Result<ProbeResult>;

    /// Returns the accumulated logs of a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be executed.
    fn logs(&self, name: &ContainerName) -> Result<ProbeResult>;

    /// Force-removes a container, running or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be executed.
    fn remove(&self, name: &ContainerName) -> Result<ProbeResult>;

    /// Lists the host bindings of a published container port.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be executed.
    fn port(&self, name: &ContainerName, container_port: u16) -> Result<ProbeResult>;

    /// Returns whether the runtime answers at all.
    fn is_available(&self) -> bool;
}

/// Information about the host and the configured runtime.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformInfo {
    /// Host operating system name.
    pub os: String,
    /// Host CPU architecture.
    pub arch: String,
    /// Configured runtime binary.
    pub runtime: String,
    /// Resolved path of the runtime binary, if found on `PATH`.
    pub runtime_path: Option<PathBuf>,
}

/// Returns information about the current platform and runtime location.
#[must_use]
pub fn platform_info(runtime: &str) -> PlatformInfo {
    PlatformInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        runtime: runtime.to_string(),
        runtime_path: which::which(runtime).ok(),
    }
}
