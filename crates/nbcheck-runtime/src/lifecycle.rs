//! Container lifecycle: launch, readiness, teardown.
//!
//! [`launch`] hands out a [`ContainerGuard`] that owns the running container.
//! Checks borrow its [`ContainerHandle`]; [`ContainerGuard::teardown`]
//! consumes the guard, so no handle can outlive the container. A guard
//! dropped without an explicit teardown (early return, panic in a check)
//! removes the container from its `Drop` impl.

use nbcheck_common::error::{HarnessError, Result};
use nbcheck_common::types::{ContainerName, DeviceRequest, ImageRef, PortMapping, RetryPolicy};

use crate::backend::{ContainerRuntime, LaunchSpec};
use crate::http::HttpProber;

/// A running container instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    /// Container name on the runtime.
    pub name: ContainerName,
    /// Image the container was started from.
    pub image: ImageRef,
    /// Published ports.
    pub ports: Vec<PortMapping>,
    /// Environment injected at launch.
    pub env: Vec<(String, String)>,
    /// Device passthrough requested at launch.
    pub devices: DeviceRequest,
}

impl From<LaunchSpec> for ContainerHandle {
    fn from(spec: LaunchSpec) -> Self {
        Self {
            name: spec.name,
            image: spec.image,
            ports: spec.ports,
            env: spec.env,
            devices: spec.devices,
        }
    }
}

/// Starts a detached container after removing any leftover of the same name.
///
/// # Errors
///
/// Returns [`HarnessError::Launch`] if the runtime reports a non-zero exit,
/// or an I/O error if the runtime cannot be executed. A container left
/// half-created by a failed `run` is removed before returning.
pub fn launch(runtime: &dyn ContainerRuntime, spec: LaunchSpec) -> Result<ContainerGuard<'_>> {
    tracing::info!(name = %spec.name, image = %spec.image, "launching container");

    let stale = runtime.remove(&spec.name)?;
    if stale.success() {
        tracing::debug!(name = %spec.name, "removed stale container");
    }

    let result = runtime.run_detached(&spec)?;
    if !result.success() {
        let _ = runtime.remove(&spec.name);
        return Err(HarnessError::Launch {
            name: spec.name.to_string(),
            exit_code: result.exit_code().unwrap_or(-1),
            stderr: result.stderr().trim().to_string(),
        });
    }

    tracing::info!(
        name = %spec.name,
        id = %result.stdout().trim(),
        "container started"
    );
    Ok(ContainerGuard {
        runtime,
        handle: ContainerHandle::from(spec),
        torn_down: false,
    })
}

/// Polls `url` until the service answers with an alive status.
///
/// Returns `false` once `policy.max_attempts` probes have failed; never
/// errors.
pub fn await_ready(
    handle: &ContainerHandle,
    http: &HttpProber,
    url: &str,
    policy: &RetryPolicy,
) -> bool {
    tracing::info!(
        name = %handle.name,
        url,
        max_attempts = policy.max_attempts,
        "waiting for service"
    );
    let retried = http.poll_alive(url, policy);
    match retried.outcome {
        Ok(_) => true,
        Err(last) => {
            tracing::warn!(
                name = %handle.name,
                attempts = retried.attempts,
                last_error = %last,
                "service never became ready"
            );
            false
        }
    }
}

/// Scoped ownership of a launched container.
pub struct ContainerGuard<'r> {
    runtime: &'r dyn ContainerRuntime,
    handle: ContainerHandle,
    torn_down: bool,
}

impl std::fmt::Debug for ContainerGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerGuard")
            .field("runtime", &self.runtime.binary())
            .field("handle", &self.handle)
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

impl ContainerGuard<'_> {
    /// The running container.
    #[must_use]
    pub const fn handle(&self) -> &ContainerHandle {
        &self.handle
    }

    /// Waits for the service, capturing logs if it never answers.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::ReadinessTimeout`] carrying the container
    /// logs. The container is still running at that point; it is removed
    /// when the guard goes out of scope.
    pub fn ensure_ready(&self, http: &HttpProber, url: &str, policy: &RetryPolicy) -> Result<()> {
        if await_ready(&self.handle, http, url, policy) {
            return Ok(());
        }
        Err(HarnessError::ReadinessTimeout {
            name: self.handle.name.to_string(),
            url: url.to_string(),
            attempts: policy.max_attempts.max(1),
            logs: self.logs(),
        })
    }

    /// Current logs of the container.
    #[must_use]
    pub fn logs(&self) -> String {
        crate::logs::capture_logs(self.runtime, &self.handle.name)
    }

    /// Force-removes the container.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be executed. The guard will
    /// not retry the removal on drop.
    pub fn teardown(mut self) -> Result<()> {
        self.torn_down = true;
        remove(self.runtime, &self.handle.name)
    }
}

impl Drop for ContainerGuard<'_> {
    fn drop(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        if let Err(e) = remove(self.runtime, &self.handle.name) {
            tracing::error!(name = %self.handle.name, error = %e, "teardown on drop failed");
        }
    }
}

fn remove(runtime: &dyn ContainerRuntime, name: &ContainerName) -> Result<()> {
    let result = runtime.remove(name)?;
    if result.success() {
        tracing::info!(name = %name, "container removed");
    } else {
        tracing::warn!(
            name = %name,
            detail = %result.summary(),
            "container removal reported failure"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{FakeRuntime, StubServer, closed_port};

    fn spec() -> LaunchSpec {
        LaunchSpec::new(
            ContainerName::new("test-kubeflow-compliance"),
            ImageRef::new("acme/nb:latest"),
        )
        .port(PortMapping::same(8888))
        .env("NB_PREFIX", "/notebook/test-user/test-notebook")
    }

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    fn prober() -> HttpProber {
        HttpProber::new(Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn launch_removes_leftover_before_running() {
        let runtime = FakeRuntime::new();
        let guard = launch(&runtime, spec()).unwrap();
        assert_eq!(guard.handle().name.as_str(), "test-kubeflow-compliance");
        let calls = runtime.calls();
        assert_eq!(calls[0], vec!["rm", "-f", "test-kubeflow-compliance"]);
        assert_eq!(&calls[1][..2], ["run", "-d"]);
        guard.teardown().unwrap();
    }

    #[test]
    fn launch_failure_is_reported_and_cleaned_up() {
        let runtime = FakeRuntime::new().failing_launch("port is already allocated");
        let err = launch(&runtime, spec()).unwrap_err();
        match err {
            HarnessError::Launch {
                exit_code, stderr, ..
            } => {
                assert_eq!(exit_code, 125);
                assert_eq!(stderr, "port is already allocated");
            }
            other => panic!("expected launch error, got {other}"),
        }
        assert_eq!(runtime.count("rm"), 2);
    }

    #[test]
    fn explicit_teardown_removes_exactly_once() {
        let runtime = FakeRuntime::new();
        let guard = launch(&runtime, spec()).unwrap();
        guard.teardown().unwrap();
        // One pre-cleanup plus one teardown.
        assert_eq!(runtime.count("rm"), 2);
    }

    #[test]
    fn dropped_guard_removes_container() {
        let runtime = FakeRuntime::new();
        {
            let _guard = launch(&runtime, spec()).unwrap();
        }
        assert_eq!(runtime.count("rm"), 2);
        let last = runtime.calls().pop().unwrap();
        assert_eq!(last, vec!["rm", "-f", "test-kubeflow-compliance"]);
    }

    #[test]
    fn await_ready_accepts_not_found() {
        let server = StubServer::start(404, &[]);
        let runtime = FakeRuntime::new();
        let guard = launch(&runtime, spec()).unwrap();
        assert!(await_ready(guard.handle(), &prober(), &server.url(), &fast(5)));
        assert_eq!(server.hits(), 1);
    }

    #[test]
    fn await_ready_gives_up_after_exact_budget() {
        let server = StubServer::start(503, &[]);
        let runtime = FakeRuntime::new();
        let guard = launch(&runtime, spec()).unwrap();
        assert!(!await_ready(guard.handle(), &prober(), &server.url(), &fast(4)));
        assert_eq!(server.hits(), 4);
    }

    #[test]
    fn readiness_timeout_captures_logs_before_teardown() {
        let runtime = FakeRuntime::new().with_logs("[cont-init] code-server crashed");
        let url = format!("http://127.0.0.1:{}", closed_port());
        {
            let guard = launch(&runtime, spec()).unwrap();
            let err = guard.ensure_ready(&prober(), &url, &fast(3)).unwrap_err();
            match err {
                HarnessError::ReadinessTimeout { attempts, logs, .. } => {
                    assert_eq!(attempts, 3);
                    assert!(logs.contains("code-server crashed"));
                }
                other => panic!("expected readiness timeout, got {other}"),
            }
        }
        let verbs: Vec<String> = runtime.calls().into_iter().map(|c| c[0].clone()).collect();
        assert_eq!(verbs, vec!["rm", "run", "logs", "rm"]);
    }
}
