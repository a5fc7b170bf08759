//! Container log capture for failure reports.

use nbcheck_common::types::ContainerName;

use crate::backend::ContainerRuntime;
use crate::exec::ProbeResult;

/// Number of trailing lines kept from each stream.
pub const LOG_TAIL_LINES: usize = 200;

/// Fetches the logs of a container as a printable block.
///
/// Never fails: a runtime error is reported inside the returned text, since
/// logs are only ever collected while another failure is being reported.
#[must_use]
pub fn capture_logs(runtime: &dyn ContainerRuntime, name: &ContainerName) -> String {
    match runtime.logs(name) {
        Ok(result) => format_logs(&result),
        Err(e) => {
            tracing::warn!(name = %name, error = %e, "failed to collect container logs");
            format!("<logs unavailable: {e}>")
        }
    }
}

/// Renders the stdout and stderr of a `logs` invocation.
#[must_use]
pub fn format_logs(result: &ProbeResult) -> String {
    format!(
        "{}\nStderr:\n{}",
        tail(result.stdout(), LOG_TAIL_LINES),
        tail(result.stderr(), LOG_TAIL_LINES)
    )
}

/// Keeps the last `lines` lines of `text`.
fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.trim_end().lines().collect();
    let skipped = all.len().saturating_sub(lines);
    let kept = all[skipped..].join("\n");
    if skipped == 0 {
        kept
    } else {
        format!("[{skipped} earlier line(s) omitted]\n{kept}")
    }
}
