//! Drives `CliRuntime` against a shell script standing in for the
//! container runtime binary, checking the argument vectors it receives and
//! how its output and timeouts are surfaced.

#![cfg(unix)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nbcheck_common::types::{ContainerName, DeviceRequest, ImageRef, PortMapping};
use nbcheck_runtime::backend::{CliRuntime, ContainerRuntime, LaunchSpec};
use nbcheck_runtime::exec::ProbeResult;
use nbcheck_runtime::logs::capture_logs;

/// Writes a fake runtime that appends its arguments to `calls.log`.
fn fake_runtime(dir: &Path) -> (CliRuntime, PathBuf) {
    let log = dir.join("calls.log");
    let script = dir.join("fake-runtime");
    let body = format!(
        r#"#!/bin/sh
echo "$@" >> "{log}"
case "$1" in
  run)
    if [ "$2" = "--rm" ]; then exec sleep 5; fi
    echo 4f2a9c1e7b3d
    ;;
  exec) shift 2; exec "$@" ;;
  logs) echo "[s6-init] starting"; echo "code-server: listening" >&2 ;;
  rm) echo "$3" ;;
  port) echo "0.0.0.0:8888" ;;
  version) echo "fake 1.0" ;;
  *) echo "unknown verb $1" >&2; exit 64 ;;
esac
"#,
        log = log.display()
    );
    std::fs::write(&script, body).expect("write script");
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    (CliRuntime::with_path("fake-runtime", &script), log)
}

fn calls(log: &Path) -> Vec<String> {
    std::fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn detached_run_receives_full_argument_vector() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (runtime, log) = fake_runtime(dir.path());
    let spec = LaunchSpec::new(ContainerName::new("nb"), ImageRef::new("acme/nb:latest"))
        .port(PortMapping::same(8888))
        .env("NB_PREFIX", "/notebook/u/n")
        .devices(DeviceRequest::AllGpus);

    let result = runtime.run_detached(&spec).unwrap();
    assert!(result.success());
    assert_eq!(result.stdout().trim(), "4f2a9c1e7b3d");
    assert_eq!(
        calls(&log),
        vec!["run -d --name nb -p 8888:8888 -e NB_PREFIX=/notebook/u/n --gpus all acme/nb:latest"]
    );
}

#[test]
fn exec_returns_command_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (runtime, _log) = fake_runtime(dir.path());
    let result = runtime
        .exec(
            &ContainerName::new("nb"),
            &["sh".into(), "-c".into(), "echo 1000; exit 0".into()],
            Duration::from_secs(10),
        )
        .unwrap();
    assert_eq!(result.exit_code(), Some(0));
    assert_eq!(result.stdout().trim(), "1000");
}

#[test]
fn exec_past_its_timeout_yields_timed_out_result() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (runtime, _log) = fake_runtime(dir.path());
    let result = runtime
        .exec(
            &ContainerName::new("nb"),
            &["sleep".into(), "5".into()],
            Duration::from_millis(300),
        )
        .unwrap();
    assert!(matches!(result, ProbeResult::TimedOut { .. }));
    assert!(!result.success());
    assert_eq!(result.exit_code(), Some(1));
}

#[test]
fn ephemeral_timeout_force_removes_container() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (runtime, log) = fake_runtime(dir.path());
    let spec = LaunchSpec::new(ContainerName::new("nbcheck-eph"), ImageRef::new("acme/nb"))
        .command(vec!["uv".into(), "--version".into()]);

    let result = runtime
        .run_ephemeral(&spec, Duration::from_millis(300))
        .unwrap();
    assert!(matches!(result, ProbeResult::TimedOut { .. }));
    let calls = calls(&log);
    assert_eq!(calls[0], "run --rm --name nbcheck-eph acme/nb uv --version");
    assert_eq!(calls[1], "rm -f nbcheck-eph");
}

#[test]
fn logs_capture_both_streams() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (runtime, _log) = fake_runtime(dir.path());
    let logs = capture_logs(&runtime, &ContainerName::new("nb"));
    assert_eq!(logs, "[s6-init] starting\nStderr:\ncode-server: listening");
}

#[test]
fn port_and_availability() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (runtime, _log) = fake_runtime(dir.path());
    assert!(runtime.is_available());
    let port = runtime.port(&ContainerName::new("nb"), 8888).unwrap();
    assert!(port.stdout().contains("8888"));
    assert_eq!(runtime.binary(), "fake-runtime");
}
