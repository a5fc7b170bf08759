//! Per-suite orchestration: launch, readiness, checks, teardown.
//!
//! Each suite walks the phases of [`RunPhase`] and records the trail in its
//! [`SuiteReport`]. A container that never comes up ends the suite in
//! `StartupFailed`; the launched container is still removed.

use nbcheck_common::config::HarnessConfig;
use nbcheck_common::error::{HarnessError, Result};
use nbcheck_common::types::{ContainerName, DeviceRequest, RunPhase};
use nbcheck_runtime::backend::{ContainerRuntime, LaunchSpec};
use nbcheck_runtime::http::HttpProber;
use nbcheck_runtime::lifecycle::{self, ContainerGuard};

use crate::executor::{CheckExecutor, ExecTarget};
use crate::report::{CheckRecord, RunReport, SuiteOutcome, SuiteReport};
use crate::spec::CheckSpec;
use crate::suites::{self, SuiteKind};

/// Command run in the probe image to decide whether GPUs are usable.
const GPU_PROBE_COMMAND: &str = "nvidia-smi";

/// Runs suites against one runtime and configuration.
pub struct SuiteRunner<'a> {
    runtime: &'a dyn ContainerRuntime,
    http: &'a HttpProber,
    config: &'a HarnessConfig,
}

impl<'a> SuiteRunner<'a> {
    /// Creates a runner.
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

    /// Runs `kinds` in order and collects their reports.
    #[must_use]
    pub fn run_all(&self, kinds: &[SuiteKind]) -> RunReport {
        let mut report = RunReport::new(self.config.image.clone());
        tracing::info!(run_id = %report.run_id, image = %report.image, "starting run");
        for kind in kinds {
            report.push(self.run(*kind));
        }
        report
    }

    /// Runs one suite. Never fails: harness problems are reported in the
    /// suite outcome.
    #[must_use]
    pub fn run(&self, kind: SuiteKind) -> SuiteReport {
        let checks = suites::catalog(kind, self.config);
        let trail = Trail::new(kind);
        let report = match kind {
            SuiteKind::Image => self.run_image(&checks, trail),
            SuiteKind::Kubeflow => {
                let spec = self.kubeflow_spec();
                self.run_launched(&checks, spec, true, trail)
            }
            SuiteKind::Gpu => match gpu_capability(self.runtime, self.config) {
                Ok(()) => {
                    let spec = self.gpu_spec();
                    self.run_launched(&checks, spec, false, trail)
                }
                Err(e) => {
                    tracing::warn!(suite = %kind, reason = %e, "skipping suite");
                    trail.skipped(&checks, e.to_string())
                }
            },
        };
        log_finished(&report);
        report
    }

    fn executor(&self) -> CheckExecutor<'_> {
        CheckExecutor::new(self.runtime, self.http, self.config)
    }

    fn kubeflow_spec(&self) -> LaunchSpec {
        self.config.container_env().into_iter().fold(
            LaunchSpec::new(self.config.container_name.clone(), self.config.image.clone())
                .port(self.config.port),
            |spec, (key, value)| spec.env(key, value),
        )
    }

    fn gpu_spec(&self) -> LaunchSpec {
        let name = ContainerName::new(format!("{}-gpu", self.config.container_name));
        LaunchSpec::new(name, self.config.image.clone()).devices(DeviceRequest::AllGpus)
    }

    fn run_image(&self, checks: &[CheckSpec], mut trail: Trail) -> SuiteReport {
        trail.enter(RunPhase::RunningChecks);
        let target = ExecTarget::Ephemeral {
            image: &self.config.image,
            devices: DeviceRequest::None,
        };
        let records = self.executor().run_all(checks, &target);
        trail.enter(RunPhase::TornDown);
        trail.completed(records)
    }

    fn run_launched(
        &self,
        checks: &[CheckSpec],
        spec: LaunchSpec,
        await_ready: bool,
        mut trail: Trail,
    ) -> SuiteReport {
        trail.enter(RunPhase::Launching);
        let guard = match lifecycle::launch(self.runtime, spec) {
            Ok(guard) => guard,
            Err(e) => return trail.startup_failed(checks, &e),
        };

        if await_ready {
            trail.enter(RunPhase::AwaitingReady);
            let url = self.config.probe_url();
            if let Err(e) = guard.ensure_ready(self.http, &url, &self.config.startup_policy) {
                let report = trail.startup_failed(checks, &e);
                teardown(guard);
                return report;
            }
        }
        trail.enter(RunPhase::Ready);

        trail.enter(RunPhase::RunningChecks);
        let records = self
            .executor()
            .run_all(checks, &ExecTarget::Running(guard.handle()));

        teardown(guard);
        trail.enter(RunPhase::TornDown);
        trail.completed(records)
    }
}

/// Decides whether GPU suites can run on this host.
///
/// Runs `nvidia-smi` in the configured CUDA probe image with every GPU
/// passed through, bounded by the probe timeout.
///
/// # Errors
///
/// Returns [`HarnessError::CapabilityUnavailable`] when the runtime does not
/// answer, the probe cannot be started, times out or exits non-zero.
pub fn gpu_capability(runtime: &dyn ContainerRuntime, config: &HarnessConfig) -> Result<()> {
    if !runtime.is_available() {
        return Err(HarnessError::CapabilityUnavailable {
            reason: format!("container runtime `{}` is not answering", runtime.binary()),
        });
    }
    let spec = LaunchSpec::new(
        ContainerName::generate("nbcheck-gpu-probe"),
        config.gpu_probe_image.clone(),
    )
    .devices(DeviceRequest::AllGpus)
    .command(vec![GPU_PROBE_COMMAND.to_string()]);

    let result = runtime
        .run_ephemeral(&spec, config.gpu_probe_timeout)
        .map_err(|e| HarnessError::CapabilityUnavailable {
            reason: e.to_string(),
        })?;
    if result.success() {
        tracing::info!(image = %config.gpu_probe_image, "GPU runtime available");
        return Ok(());
    }
    Err(HarnessError::CapabilityUnavailable {
        reason: format!("GPU probe in {} failed: {}", config.gpu_probe_image, result.summary()),
    })
}

/// Report for a suite that could not run because no runtime was usable.
///
/// The GPU suite is skipped; every other suite failed to start.
#[must_use]
pub fn report_without_runtime(
    kind: SuiteKind,
    config: &HarnessConfig,
    error: &HarnessError,
) -> SuiteReport {
    let checks = suites::catalog(kind, config);
    let trail = Trail::new(kind);
    let report = match kind {
        SuiteKind::Gpu => trail.skipped(&checks, error.to_string()),
        SuiteKind::Image | SuiteKind::Kubeflow => trail.startup_failed(&checks, error),
    };
    log_finished(&report);
    report
}

fn teardown(guard: ContainerGuard<'_>) {
    if let Err(e) = guard.teardown() {
        tracing::error!(error = %e, "teardown failed");
    }
}

/// Phases visited by one suite.
struct Trail {
    kind: SuiteKind,
    phases: Vec<RunPhase>,
}

impl Trail {
    fn new(kind: SuiteKind) -> Self {
        let mut trail = Self {
            kind,
            phases: Vec::new(),
        };
        trail.enter(RunPhase::NotStarted);
        trail
    }

    fn enter(&mut self, phase: RunPhase) {
        tracing::debug!(suite = %self.kind, %phase, "entering phase");
        self.phases.push(phase);
    }

    fn completed(self, checks: Vec<CheckRecord>) -> SuiteReport {
        SuiteReport {
            suite: self.kind,
            outcome: SuiteOutcome::Completed,
            phases: self.phases,
            checks,
        }
    }

    fn skipped(self, checks: &[CheckSpec], reason: String) -> SuiteReport {
        let checks = skip_all(checks, &reason);
        SuiteReport {
            suite: self.kind,
            outcome: SuiteOutcome::Skipped { reason },
            phases: self.phases,
            checks,
        }
    }

    fn startup_failed(mut self, checks: &[CheckSpec], error: &HarnessError) -> SuiteReport {
        self.enter(RunPhase::StartupFailed);
        tracing::error!(suite = %self.kind, error = %error, "suite failed to start");
        SuiteReport {
            suite: self.kind,
            outcome: SuiteOutcome::StartupFailed {
                error: error.to_string(),
            },
            phases: self.phases,
            checks: skip_all(checks, "container did not start"),
        }
    }
}

fn skip_all(checks: &[CheckSpec], reason: &str) -> Vec<CheckRecord> {
    checks
        .iter()
        .map(|c| CheckRecord::skipped(&c.name, c.expected(), reason))
        .collect()
}

fn log_finished(report: &SuiteReport) {
    let tally = report.tally();
    tracing::info!(
        suite = %report.suite,
        passed = tally.passed,
        failed = tally.failed,
        skipped = tally.skipped,
        "suite finished"
    );
}
