//! Test doubles: a recording in-memory runtime and a loopback HTTP stub.
//!
//! Compiled for this crate's unit tests and, through the `testing` feature,
//! for the tests of downstream crates.

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nbcheck_common::error::Result;
use nbcheck_common::types::{ContainerName, PortMapping};

use crate::backend::cli::{RunMode, exec_args, run_args};
use crate::backend::{ContainerRuntime, LaunchSpec};
use crate::exec::ProbeResult;

type ExecHandler = Box<dyn Fn(&[String]) -> ProbeResult + Send + Sync>;

/// Builds a completed command result.
#[must_use]
pub fn exited(exit_code: i32, stdout: &str, stderr: &str) -> ProbeResult {
    ProbeResult::Exec {
        exit_code,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        elapsed: Duration::ZERO,
    }
}

/// In-memory [`ContainerRuntime`] recording every invocation as the
/// argument vector the CLI backend would have used.
pub struct FakeRuntime {
    calls: Mutex<Vec<Vec<String>>>,
    launch: ProbeResult,
    exec: ExecHandler,
    logs: String,
    published: Mutex<Vec<PortMapping>>,
    available: bool,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRuntime {
    /// A runtime whose launches succeed and whose commands print nothing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            launch: exited(0, "0123456789ab\n", ""),
            exec: Box::new(|_| exited(0, "", "")),
            logs: String::new(),
            published: Mutex::new(Vec::new()),
            available: true,
        }
    }

    /// Makes every `run -d` fail with `stderr`.
    #[must_use]
    pub fn failing_launch(mut self, stderr: &str) -> Self {
        self.launch = exited(125, "", stderr);
        self
    }

    /// Answers in-container commands with `handler`.
    #[must_use]
    pub fn with_exec(
        mut self,
        handler: impl Fn(&[String]) -> ProbeResult + Send + Sync + 'static,
    ) -> Self {
        self.exec = Box::new(handler);
        self
    }

    /// Sets the stdout returned by `logs`.
    #[must_use]
    pub fn with_logs(mut self, logs: &str) -> Self {
        self.logs = logs.to_string();
        self
    }

    /// Reports the runtime as not answering.
    #[must_use]
    pub const fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Every invocation so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Number of invocations of a runtime verb (`run`, `exec`, `rm`, ...).
    #[must_use]
    pub fn count(&self, verb: &str) -> usize {
        self.calls().iter().filter(|c| c[0] == verb).count()
    }

    fn record(&self, args: Vec<String>) {
        self.calls.lock().expect("calls lock").push(args);
    }
}

impl ContainerRuntime for FakeRuntime {
    fn binary(&self) -> &str {
        "fake"
    }

    fn run_detached(&self, spec: &LaunchSpec) -> Result<ProbeResult> {
        self.record(run_args(spec, RunMode::Detached));
        if self.launch.exit_code() == Some(0) {
            self.published
                .lock()
                .expect("published lock")
                .clone_from(&spec.ports);
        }
        Ok(self.launch.clone())
    }

    fn run_ephemeral(&self, spec: &LaunchSpec, _timeout: Duration) -> Result<ProbeResult> {
        self.record(run_args(spec, RunMode::Ephemeral));
        Ok((self.exec)(&spec.command))
    }

    fn exec(
        &self,
        name: &ContainerName,
        command: &[String],
        _timeout: Duration,
    ) -> Result<ProbeResult> {
        self.record(exec_args(name, command));
        Ok((self.exec)(command))
    }

    fn logs(&self, name: &ContainerName) -> Result<ProbeResult> {
        self.record(vec!["logs".into(), name.to_string()]);
        Ok(exited(0, &self.logs, ""))
    }

    fn remove(&self, name: &ContainerName) -> Result<ProbeResult> {
        self.record(vec!["rm".into(), "-f".into(), name.to_string()]);
        Ok(exited(0, name.as_str(), ""))
    }

    fn port(&self, name: &ContainerName, container_port: u16) -> Result<ProbeResult> {
        self.record(vec!["port".into(), name.to_string(), container_port.to_string()]);
        let published = self.published.lock().expect("published lock");
        let bindings: String = published
            .iter()
            .filter(|p| p.container == container_port)
            .map(|p| format!("0.0.0.0:{host}\n[::]:{host}\n", host = p.host))
            .collect();
        if bindings.is_empty() {
            let stderr = format!("Error: No public port '{container_port}/tcp' published for {name}");
            return Ok(exited(1, "", &stderr));
        }
        Ok(exited(0, &bindings, ""))
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

/// Minimal HTTP/1.1 server answering every request with a fixed response.
#[derive(Debug)]
pub struct StubServer {
    port: u16,
    hits: Arc<AtomicUsize>,
}

impl StubServer {
    /// Serves `status` with extra `headers` on a loopback port.
    #[must_use]
    pub fn start(status: u16, headers: &[(&str, &str)]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let port = listener.local_addr().expect("stub address").port();
        let hits = Arc::new(AtomicUsize::new(0));

        let mut response = format!("HTTP/1.1 {status} Stub\r\n");
        for (name, value) in headers {
            response.push_str(&format!("{name}: {value}\r\n"));
        }
        response.push_str("Content-Length: 2\r\nConnection: close\r\n\r\nok");

        let counter = Arc::clone(&hits);
        let _ = std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let _ = counter.fetch_add(1, Ordering::SeqCst);
                answer(stream, response.as_bytes());
            }
        });
        Self { port, hits }
    }

    /// Port the stub listens on.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Base URL of the stub.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Requests received so far.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

fn answer(mut stream: TcpStream, response: &[u8]) {
    let mut request = Vec::new();
    let mut buf = [0_u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    let _ = stream.write_all(response);
    let _ = stream.flush();
}

/// A loopback port with nothing listening on it.
#[must_use]
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe port");
    listener.local_addr().expect("probe address").port()
}
