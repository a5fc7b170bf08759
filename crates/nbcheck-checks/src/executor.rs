//! Evaluates [`CheckSpec`]s against a container.
//!
//! Every check is evaluated on its own. A failing predicate, a timed-out
//! command, an unreachable port or a panic while observing becomes a failed
//! [`CheckRecord`]; nothing here aborts sibling checks or skips teardown.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use nbcheck_common::config::HarnessConfig;
use nbcheck_common::error::Result;
use nbcheck_common::types::{ContainerName, DeviceRequest, ImageRef};
use nbcheck_runtime::backend::{ContainerRuntime, LaunchSpec};
use nbcheck_runtime::exec::ProbeResult;
use nbcheck_runtime::http::HttpProber;
use nbcheck_runtime::lifecycle::ContainerHandle;

use crate::report::{CheckRecord, CheckStatus};
use crate::spec::{CheckMode, CheckSpec};

/// Prefix of generated names for one-shot containers.
const EPHEMERAL_PREFIX: &str = "nbcheck";

/// Where in-container commands run.
#[derive(Debug, Clone, Copy)]
pub enum ExecTarget<'a> {
    /// A long-running container started by the suite.
    Running(&'a ContainerHandle),
    /// A fresh `run --rm` container per check.
    Ephemeral {
        /// Image to start.
        image: &'a ImageRef,
        /// Device passthrough for each container.
        devices: DeviceRequest,
    },
}

impl ExecTarget<'_> {
    const fn devices(&self) -> DeviceRequest {
        match self {
            Self::Running(handle) => handle.devices,
            Self::Ephemeral { devices, .. } => *devices,
        }
    }
}

/// Runs checks through a container runtime and an HTTP prober.
pub struct CheckExecutor<'a> {
    runtime: &'a dyn ContainerRuntime,
    http: &'a HttpProber,
    config: &'a HarnessConfig,
}

impl<'a> CheckExecutor<'a> {
    /// Creates an executor.
    #[must_use]
    pub const fn new(
        runtime: &'a dyn ContainerRuntime,
        http: &'a HttpProber,
        config: &'a HarnessConfig,
    ) -> Self {
        Self {
            runtime,
            http,
            config,
        }
    }

    /// Runs `command` inside `target`.
    ///
    /// A command that outlives `timeout` yields [`ProbeResult::TimedOut`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the runtime binary cannot be executed.
    pub fn exec_in_container(
        &self,
        target: &ExecTarget<'_>,
        command: &[String],
        timeout: Duration,
    ) -> Result<ProbeResult> {
        match target {
            ExecTarget::Running(handle) => self.runtime.exec(&handle.name, command, timeout),
            ExecTarget::Ephemeral { image, devices } => {
                let spec = LaunchSpec::new(
                    ContainerName::generate(EPHEMERAL_PREFIX),
                    (*image).clone(),
                )
                .devices(*devices)
                .command(command.to_vec());
                self.runtime.run_ephemeral(&spec, timeout)
            }
        }
    }

    /// GETs `path` on the published editor port, retrying connection
    /// failures with the per-check policy.
    #[must_use]
    pub fn http_probe(&self, path: &str) -> ProbeResult {
        let url = format!("{}{path}", self.config.probe_url());
        self.http.probe(&url, &self.config.check_policy)
    }

    /// Evaluates one check.
    #[must_use]
    pub fn run(&self, check: &CheckSpec, target: &ExecTarget<'_>) -> CheckRecord {
        let started = Instant::now();
        tracing::debug!(check = %check.name, what = %check.describe(), "running check");

        let observed = panic::catch_unwind(AssertUnwindSafe(|| self.observe(check, target)));
        let record = match observed {
            Ok(Ok(result)) => Self::judge(check, &result),
            Ok(Err(e)) => Self::errored(check, e.to_string()),
            Err(payload) => {
                Self::errored(check, format!("check panicked: {}", panic_message(&*payload)))
            }
        };
        let record = CheckRecord {
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            ..record
        };

        match record.status {
            CheckStatus::Passed => tracing::info!(
                check = %record.name,
                elapsed_ms = record.elapsed_ms,
                "check passed"
            ),
            _ => tracing::warn!(
                check = %record.name,
                expected = %record.expected,
                actual = %record.actual,
                "check failed"
            ),
        }
        record
    }

    /// Evaluates every check in order.
    #[must_use]
    pub fn run_all(&self, checks: &[CheckSpec], target: &ExecTarget<'_>) -> Vec<CheckRecord> {
        checks.iter().map(|check| self.run(check, target)).collect()
    }

    fn observe(&self, check: &CheckSpec, target: &ExecTarget<'_>) -> Result<ProbeResult> {
        match &check.mode {
            CheckMode::Exec { command } => {
                let timeout = check.timeout.unwrap_or_else(|| self.default_timeout(target));
                self.exec_in_container(target, command, timeout)
            }
            CheckMode::Http { path } => Ok(self.http_probe(path)),
            CheckMode::PublishedPort { container_port } => match target {
                ExecTarget::Running(handle) => self.runtime.port(&handle.name, *container_port),
                ExecTarget::Ephemeral { .. } => Ok(ProbeResult::Exec {
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: "ephemeral containers publish no ports".to_string(),
                    elapsed: Duration::ZERO,
                }),
            },
        }
    }

    fn default_timeout(&self, target: &ExecTarget<'_>) -> Duration {
        match target.devices() {
            DeviceRequest::AllGpus => self.config.gpu_command_timeout,
            DeviceRequest::None => self.config.command_timeout,
        }
    }

    fn errored(check: &CheckSpec, actual: String) -> CheckRecord {
        CheckRecord {
            name: check.name.clone(),
            status: CheckStatus::Failed,
            expected: check.expected(),
            actual,
            elapsed_ms: 0,
        }
    }

    fn judge(check: &CheckSpec, result: &ProbeResult) -> CheckRecord {
        let (status, expected) = match check.first_violation(result) {
            None => (CheckStatus::Passed, check.expected()),
            Some(violated) => (CheckStatus::Failed, violated.to_string()),
        };
        CheckRecord {
            name: check.name.clone(),
            status,
            expected,
            actual: result.summary(),
            elapsed_ms: 0,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use nbcheck_common::types::{PortMapping, RetryPolicy};
    use nbcheck_runtime::testing::{FakeRuntime, StubServer, closed_port, exited};

    use super::*;
    use crate::spec::Expectation;

    fn config_for(port: u16) -> HarnessConfig {
        HarnessConfig {
            probe_host: "127.0.0.1".into(),
            port: PortMapping {
                host: port,
                container: 8888,
            },
            check_policy: RetryPolicy::new(2, Duration::ZERO),
            ..HarnessConfig::default()
        }
    }

    fn handle() -> ContainerHandle {
        ContainerHandle::from(LaunchSpec::new(
            ContainerName::new("test-kubeflow-compliance"),
            ImageRef::new("acme/nb"),
        ))
    }

    #[test]
    fn exec_check_runs_in_named_container() {
        let runtime = FakeRuntime::new().with_exec(|cmd| match cmd {
            [w] if w == "whoami" => exited(0, "jovyan\n", ""),
            _ => exited(127, "", "not found"),
        });
        let http = HttpProber::new(Duration::from_secs(1)).unwrap();
        let config = config_for(closed_port());
        let executor = CheckExecutor::new(&runtime, &http, &config);
        let handle = handle();

        let check = CheckSpec::exec("whoami", &["whoami"])
            .succeeds()
            .expect(Expectation::equals("jovyan"));
        let record = executor.run(&check, &ExecTarget::Running(&handle));
        assert_eq!(record.status, CheckStatus::Passed);
        assert_eq!(
            runtime.calls()[0],
            vec!["exec", "test-kubeflow-compliance", "whoami"]
        );
    }

    #[test]
    fn failure_records_violated_expectation_and_output() {
        let runtime = FakeRuntime::new().with_exec(|_| exited(0, "0\n", ""));
        let http = HttpProber::new(Duration::from_secs(1)).unwrap();
        let config = config_for(closed_port());
        let executor = CheckExecutor::new(&runtime, &http, &config);
        let handle = handle();

        let check = CheckSpec::exec("uid is 1000", &["id", "-u"])
            .succeeds()
            .expect(Expectation::equals("1000"));
        let record = executor.run(&check, &ExecTarget::Running(&handle));
        assert_eq!(record.status, CheckStatus::Failed);
        assert_eq!(record.expected, "output is `1000`");
        assert_eq!(record.actual, "exit 0, stdout: 0");
    }

    #[test]
    fn ephemeral_target_generates_fresh_names() {
        let runtime = FakeRuntime::new().with_exec(|_| exited(0, "uv 0.4.0\n", ""));
        let http = HttpProber::new(Duration::from_secs(1)).unwrap();
        let config = config_for(closed_port());
        let executor = CheckExecutor::new(&runtime, &http, &config);
        let image = ImageRef::new("acme/nb");
        let target = ExecTarget::Ephemeral {
            image: &image,
            devices: DeviceRequest::None,
        };

        let check = CheckSpec::shell("uv installed", "uv --version").succeeds();
        let records = executor.run_all(&[check.clone(), check], &target);
        assert!(records.iter().all(|r| r.status == CheckStatus::Passed));

        let calls = runtime.calls();
        assert_eq!(&calls[0][..2], ["run", "--rm"]);
        assert!(calls[0][3].starts_with("nbcheck-"));
        assert_ne!(calls[0][3], calls[1][3]);
        assert_eq!(&calls[0][5..], ["bash", "-c", "uv --version"]);
    }

    #[test]
    fn http_check_uses_configured_probe_url() {
        let server = StubServer::start(302, &[("Location", "/login")]);
        let runtime = FakeRuntime::new();
        let http = HttpProber::new(Duration::from_secs(2)).unwrap();
        let config = config_for(server.port());
        let executor = CheckExecutor::new(&runtime, &http, &config);
        let handle = handle();

        let check = CheckSpec::http("code-server responding", "/")
            .expect(Expectation::StatusIn(vec![200, 302, 404]));
        let record = executor.run(&check, &ExecTarget::Running(&handle));
        assert_eq!(record.status, CheckStatus::Passed);
        assert_eq!(server.hits(), 1);
    }

    #[test]
    fn unreachable_port_fails_check() {
        let runtime = FakeRuntime::new();
        let http = HttpProber::new(Duration::from_secs(1)).unwrap();
        let config = config_for(closed_port());
        let executor = CheckExecutor::new(&runtime, &http, &config);
        let handle = handle();

        let check = CheckSpec::http("code-server responding", "/")
            .expect(Expectation::StatusIn(vec![200, 302, 404]));
        let record = executor.run(&check, &ExecTarget::Running(&handle));
        assert_eq!(record.status, CheckStatus::Failed);
    }

    #[test]
    fn published_port_needs_running_container() {
        let runtime = FakeRuntime::new();
        let http = HttpProber::new(Duration::from_secs(1)).unwrap();
        let config = config_for(closed_port());
        let executor = CheckExecutor::new(&runtime, &http, &config);
        let check = CheckSpec::published_port("port published", 8888)
            .succeeds()
            .expect(Expectation::contains("8888"));

        let spec = LaunchSpec::new(
            ContainerName::new("test-kubeflow-compliance"),
            ImageRef::new("acme/nb"),
        )
        .port(PortMapping::same(8888));
        let _ = runtime.run_detached(&spec).unwrap();
        let handle = ContainerHandle::from(spec);
        let running = executor.run(&check, &ExecTarget::Running(&handle));
        assert_eq!(running.status, CheckStatus::Passed);

        let image = ImageRef::new("acme/nb");
        let ephemeral = executor.run(
            &check,
            &ExecTarget::Ephemeral {
                image: &image,
                devices: DeviceRequest::None,
            },
        );
        assert_eq!(ephemeral.status, CheckStatus::Failed);
    }

    #[test]
    fn panicking_runtime_becomes_failed_record() {
        let runtime = FakeRuntime::new().with_exec(|cmd| match cmd {
            [w] if w == "whoami" => panic!("exec handler crashed"),
            _ => exited(0, "ok\n", ""),
        });
        let http = HttpProber::new(Duration::from_secs(1)).unwrap();
        let config = config_for(closed_port());
        let executor = CheckExecutor::new(&runtime, &http, &config);
        let handle = handle();

        let checks = [
            CheckSpec::exec("whoami", &["whoami"]).succeeds(),
            CheckSpec::exec("true", &["true"]).succeeds(),
        ];
        let records = executor.run_all(&checks, &ExecTarget::Running(&handle));
        assert_eq!(records[0].status, CheckStatus::Failed);
        assert_eq!(records[0].actual, "check panicked: exec handler crashed");
        assert_eq!(records[1].status, CheckStatus::Passed);
    }
}
