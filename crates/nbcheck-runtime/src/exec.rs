//! Subprocess execution with a deadline, and the probe result model.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use nbcheck_common::constants::TIMEOUT_EXIT_CODE;
use nbcheck_common::error::{HarnessError, Result};

/// Interval between two `try_wait` polls of a running child.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Outcome of a command, an HTTP request, or a readiness attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// A command ran to completion.
    Exec {
        /// Exit code, `-1` when the process was killed by a signal.
        exit_code: i32,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
        /// Wall time of the command.
        elapsed: Duration,
    },
    /// An HTTP response was received.
    Http {
        /// Response status code.
        status: u16,
        /// Response headers, keys lowercased.
        headers: BTreeMap<String, String>,
        /// Response body.
        body: String,
        /// Wall time of the request.
        elapsed: Duration,
    },
    /// A command exceeded its timeout and was killed.
    TimedOut {
        /// Human-readable description of the timeout.
        message: String,
        /// Wall time until the kill.
        elapsed: Duration,
    },
    /// No HTTP response within the retry budget.
    Unreachable {
        /// Last connection error.
        message: String,
        /// Number of requests issued.
        attempts: u32,
        /// Wall time across all attempts.
        elapsed: Duration,
    },
}

impl ProbeResult {
    /// Whether the attempt succeeded: exit code zero, or an HTTP status in
    /// the alive class.
    #[must_use]
    pub fn success(&self) -> bool {
        match self {
            Self::Exec { exit_code, .. } => *exit_code == 0,
            Self::Http { status, .. } => crate::http::is_alive_status(*status),
            Self::TimedOut { .. } | Self::Unreachable { .. } => false,
        }
    }

    /// Exit code of a command. Timeouts report [`TIMEOUT_EXIT_CODE`].
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exec { exit_code, .. } => Some(*exit_code),
            Self::TimedOut { .. } => Some(TIMEOUT_EXIT_CODE),
            Self::Http { .. } | Self::Unreachable { .. } => None,
        }
    }

    /// HTTP status, if a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Standard output of a command, or the body of a response.
    #[must_use]
    pub fn stdout(&self) -> &str {
        match self {
            Self::Exec { stdout, .. } => stdout,
            Self::Http { body, .. } => body,
            Self::TimedOut { .. } | Self::Unreachable { .. } => "",
        }
    }

    /// Standard error of a command, or the failure message.
    #[must_use]
    pub fn stderr(&self) -> &str {
        match self {
            Self::Exec { stderr, .. } => stderr,
            Self::TimedOut { message, .. } | Self::Unreachable { message, .. } => message,
            Self::Http { .. } => "",
        }
    }

    /// Looks up a response header, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        match self {
            Self::Http { headers, .. } => headers
                .get(&name.to_ascii_lowercase())
                .map(String::as_str),
            _ => None,
        }
    }

    /// Wall time spent producing this result.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        match self {
            Self::Exec { elapsed, .. }
            | Self::Http { elapsed, .. }
            | Self::TimedOut { elapsed, .. }
            | Self::Unreachable { elapsed, .. } => *elapsed,
        }
    }

    /// One-line description for diagnostics.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Exec {
                exit_code,
                stdout,
                stderr,
                ..
            } => {
                let out = stdout.trim();
                let err = stderr.trim();
                match (out.is_empty(), err.is_empty()) {
                    (true, true) => format!("exit {exit_code}"),
                    (false, true) => format!("exit {exit_code}, stdout: {out}"),
                    (true, false) => format!("exit {exit_code}, stderr: {err}"),
                    (false, false) => format!("exit {exit_code}, stdout: {out}, stderr: {err}"),
                }
            }
            Self::Http { status, .. } => format!("HTTP {status}"),
            Self::TimedOut { message, .. } => message.clone(),
            Self::Unreachable { message, attempts, .. } => {
                format!("unreachable after {attempts} attempt(s): {message}")
            }
        }
    }
}

/// Runs `program` with `args`, killing it once `timeout` elapses.
///
/// A timeout is reported as [`ProbeResult::TimedOut`], not as an error.
///
/// # Errors
///
/// Returns an error if the program cannot be spawned or waited on.
pub fn run_command(program: &Path, args: &[String], timeout: Duration) -> Result<ProbeResult> {
    tracing::debug!(program = %program.display(), ?args, ?timeout, "running command");
    let started = Instant::now();
    let io_err = |source| HarnessError::Io {
        path: program.to_path_buf(),
        source,
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(io_err)?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = loop {
        if let Some(status) = child.try_wait().map_err(io_err)? {
            break status;
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            tracing::warn!(program = %program.display(), ?timeout, "command timed out");
            // Readers are left detached: a grandchild may still hold the pipes.
            return Ok(ProbeResult::TimedOut {
                message: format!("command timed out after {timeout:?}"),
                elapsed: started.elapsed(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(ProbeResult::Exec {
        exit_code: status.code().unwrap_or(-1),
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
        elapsed: started.elapsed(),
    })
}

/// Reads a child pipe to the end on a background thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(exit_code: i32, stdout: &str, stderr: &str) -> ProbeResult {
        ProbeResult::Exec {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn timed_out_reports_failure_exit_code() {
        let r = ProbeResult::TimedOut {
            message: "command timed out after 2s".into(),
            elapsed: Duration::from_secs(2),
        };
        assert!(!r.success());
        assert_eq!(r.exit_code(), Some(TIMEOUT_EXIT_CODE));
        assert_eq!(r.stderr(), "command timed out after 2s");
        assert_eq!(r.stdout(), "");
    }

    #[test]
    fn http_accessors() {
        let mut headers = BTreeMap::new();
        let _ = headers.insert("x-frame-options".to_string(), "DENY".to_string());
        let r = ProbeResult::Http {
            status: 404,
            headers,
            body: "not found".into(),
            elapsed: Duration::ZERO,
        };
        assert!(r.success());
        assert_eq!(r.status(), Some(404));
        assert_eq!(r.header("X-Frame-Options"), Some("DENY"));
        assert_eq!(r.exit_code(), None);
        assert_eq!(r.summary(), "HTTP 404");
    }

    #[test]
    fn summary_includes_streams() {
        assert_eq!(exec(0, "jovyan\n", "").summary(), "exit 0, stdout: jovyan");
        assert_eq!(exec(2, "", "boom\n").summary(), "exit 2, stderr: boom");
        assert_eq!(exec(1, "", "").summary(), "exit 1");
    }

    #[cfg(unix)]
    #[test]
    fn run_command_captures_output_and_exit_code() {
        let r = run_command(
            Path::new("sh"),
            &["-c".into(), "echo out; echo err >&2; exit 3".into()],
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(r.exit_code(), Some(3));
        assert_eq!(r.stdout(), "out\n");
        assert_eq!(r.stderr(), "err\n");
        assert!(!r.success());
    }

    #[cfg(unix)]
    #[test]
    fn run_command_converts_timeout_into_result() {
        let started = Instant::now();
        let r = run_command(
            Path::new("sleep"),
            &["5".into()],
            Duration::from_millis(200),
        )
        .unwrap();
        assert!(matches!(r, ProbeResult::TimedOut { .. }));
        assert_eq!(r.exit_code(), Some(TIMEOUT_EXIT_CODE));
        assert!(r.stderr().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn run_command_missing_program_is_an_error() {
        let err = run_command(
            Path::new("/nonexistent/nbcheck-runtime"),
            &[],
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::Io { .. }));
    }
}
