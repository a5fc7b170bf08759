//! Runtime backend driving a Docker-compatible command-line interface.

use std::path::{Path, PathBuf};
use std::time::Duration;

use nbcheck_common::error::{HarnessError, Result};
use nbcheck_common::types::{ContainerName, DeviceRequest};

use super::{ContainerRuntime, LaunchSpec};
use crate::exec::{ProbeResult, run_command};

/// Timeout for `run -d`, which may have to pull the image first.
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(600);
/// Timeout for `logs`, `rm`, `port` and `version`.
const CONTROL_TIMEOUT: Duration = Duration::from_secs(60);
/// Timeout for the availability check.
const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Backend invoking `docker` (or `podman`, `nerdctl`) as a subprocess.
#[derive(Debug, Clone)]
pub struct CliRuntime {
    binary: String,
    path: PathBuf,
}

impl CliRuntime {
    /// Locates `binary` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::RuntimeNotFound`] if the binary is not found.
    pub fn detect(binary: &str) -> Result<Self> {
        let path = which::which(binary).map_err(|_| HarnessError::RuntimeNotFound {
            runtime: binary.to_string(),
        })?;
        tracing::debug!(binary, path = %path.display(), "container runtime located");
        Ok(Self::with_path(binary, path))
    }

    /// Uses the runtime at an explicit path.
    #[must_use]
    pub fn with_path(binary: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            path: path.into(),
        }
    }

    /// Path of the runtime binary.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn invoke(&self, args: &[String], timeout: Duration) -> Result<ProbeResult> {
        run_command(&self.path, args, timeout)
    }
}

impl ContainerRuntime for CliRuntime {
    fn binary(&self) -> &str {
        &self.binary
    }

    fn run_detached(&self, spec: &LaunchSpec) -> Result<ProbeResult> {
        tracing::info!(name = %spec.name, image = %spec.image, "starting detached container");
        self.invoke(&run_args(spec, RunMode::Detached), LAUNCH_TIMEOUT)
    }

    fn run_ephemeral(&self, spec: &LaunchSpec, timeout: Duration) -> Result<ProbeResult> {
        tracing::debug!(name = %spec.name, image = %spec.image, "running ephemeral container");
        let result = self.invoke(&run_args(spec, RunMode::Ephemeral), timeout)?;
        if matches!(result, ProbeResult::TimedOut { .. }) {
            // Killing the client does not stop the container.
            let _ = self.remove(&spec.name)?;
        }
        Ok(result)
    }

    fn exec(
        &self,
        name: &ContainerName,
        command: &[String],
        timeout: Duration,
    ) -> Result<ProbeResult> {
        self.invoke(&exec_args(name, command), timeout)
    }

    fn logs(&self, name: &ContainerName) -> Result<ProbeResult> {
        self.invoke(&["logs".into(), name.to_string()], CONTROL_TIMEOUT)
    }

    fn remove(&self, name: &ContainerName) -> Result<ProbeResult> {
        tracing::debug!(name = %name, "force-removing container");
        self.invoke(&["rm".into(), "-f".into(), name.to_string()], CONTROL_TIMEOUT)
    }

    fn port(&self, name: &ContainerName, container_port: u16) -> Result<ProbeResult> {
        self.invoke(
            &["port".into(), name.to_string(), container_port.to_string()],
            CONTROL_TIMEOUT,
        )
    }

    fn is_available(&self) -> bool {
        self.invoke(&["version".into()], VERSION_TIMEOUT)
            .is_ok_and(|r| r.success())
    }
}

/// How `run` detaches from the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// `run -d`: start in the background and return.
    Detached,
    /// `run --rm`: wait for the command and remove the container.
    Ephemeral,
}

/// Builds the argument vector of a `run` invocation.
#[must_use]
pub fn run_args(spec: &LaunchSpec, mode: RunMode) -> Vec<String> {
    let mut args = vec!["run".to_string()];
    args.push(
        match mode {
            RunMode::Detached => "-d",
            RunMode::Ephemeral => "--rm",
        }
        .to_string(),
    );
    args.extend(["--name".to_string(), spec.name.to_string()]);
    for mapping in &spec.ports {
        args.extend(["-p".to_string(), mapping.to_string()]);
    }
    for (key, value) in &spec.env {
        args.extend(["-e".to_string(), format!("{key}={value}")]);
    }
    if spec.devices == DeviceRequest::AllGpus {
        args.extend(["--gpus".to_string(), "all".to_string()]);
    }
    args.push(spec.image.to_string());
    args.extend(spec.command.iter().cloned());
    args
}

/// Builds the argument vector of an `exec` invocation.
#[must_use]
pub fn exec_args(name: &ContainerName, command: &[String]) -> Vec<String> {
    let mut args = vec!["exec".to_string(), name.to_string()];
    args.extend(command.iter().cloned());
    args
}

#[cfg(test)]
mod tests {
    use nbcheck_common::types::{ImageRef, PortMapping};

    use super::*;

    fn spec() -> LaunchSpec {
        LaunchSpec::new(
            ContainerName::new("test-kubeflow-compliance"),
            ImageRef::new("acme/kubeflow-notebook-uv:latest"),
        )
    }

    #[test]
    fn detached_run_publishes_ports_and_env() {
        let spec = spec()
            .port(PortMapping::same(8888))
            .env("NB_PREFIX", "/notebook/test-user/test-notebook");
        assert_eq!(
            run_args(&spec, RunMode::Detached),
            vec![
                "run",
                "-d",
                "--name",
                "test-kubeflow-compliance",
                "-p",
                "8888:8888",
                "-e",
                "NB_PREFIX=/notebook/test-user/test-notebook",
                "acme/kubeflow-notebook-uv:latest",
            ]
        );
    }

    #[test]
    fn gpu_run_requests_all_devices_before_image() {
        let spec = spec()
            .devices(DeviceRequest::AllGpus)
            .command(vec!["nvidia-smi".into()]);
        let args = run_args(&spec, RunMode::Ephemeral);
        assert_eq!(&args[..2], ["run", "--rm"]);
        let gpus = args.iter().position(|a| a == "--gpus").unwrap();
        let image = args
            .iter()
            .position(|a| a == "acme/kubeflow-notebook-uv:latest")
            .unwrap();
        assert_eq!(args[gpus + 1], "all");
        assert!(gpus < image);
        assert_eq!(args.last().map(String::as_str), Some("nvidia-smi"));
    }

    #[test]
    fn exec_passes_command_verbatim() {
        let args = exec_args(
            &ContainerName::new("nb"),
            &["bash".into(), "-c".into(), "echo $NB_PREFIX".into()],
        );
        assert_eq!(args, vec!["exec", "nb", "bash", "-c", "echo $NB_PREFIX"]);
    }

    #[test]
    fn detect_missing_runtime_fails() {
        let err = CliRuntime::detect("nbcheck-no-such-runtime").unwrap_err();
        assert!(matches!(err, HarnessError::RuntimeNotFound { .. }));
    }
}
