//! Formatted output helpers for CLI commands.
//!
//! Human-facing output goes to stderr with ANSI styling; machine-readable
//! output (JSON) goes to stdout.

use std::time::Duration;

use nbcheck_checks::report::{CheckRecord, CheckStatus, RunReport, SuiteOutcome, SuiteReport};

pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";
pub const RESET: &str = "\x1b[0m";

/// Formats a duration for progress lines (e.g., "850ms", "12.4s", "2m 05s").
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1_000 {
        return format!("{millis}ms");
    }
    let secs = duration.as_secs();
    if secs < 60 {
        return format!("{:.1}s", duration.as_secs_f64());
    }
    format!("{}m {:02}s", secs / 60, secs % 60)
}

/// Status marker for one check.
#[must_use]
pub fn marker(status: CheckStatus) -> String {
    match status {
        CheckStatus::Passed => format!("{GREEN}✓{RESET}"),
        CheckStatus::Failed => format!("{RED}✗{RESET}"),
        CheckStatus::Skipped => format!("{YELLOW}-{RESET}"),
    }
}

/// Lines describing one check result.
#[must_use]
pub fn check_lines(record: &CheckRecord) -> Vec<String> {
    let elapsed = format_duration(Duration::from_millis(record.elapsed_ms));
    let mut lines = vec![format!(
        "    {} {}{}{} {DIM}({elapsed}){RESET}",
        marker(record.status),
        BOLD,
        record.name,
        RESET
    )];
    if record.status == CheckStatus::Failed {
        lines.push(format!("        {DIM}expected:{RESET} {}", record.expected));
        lines.push(format!("        {DIM}actual:{RESET}   {}", record.actual));
    }
    lines
}

/// Lines describing one suite.
#[must_use]
pub fn suite_lines(report: &SuiteReport) -> Vec<String> {
    let mut lines = vec![format!("  {CYAN}{BOLD}{}{RESET}", report.suite)];
    match &report.outcome {
        SuiteOutcome::Completed => {
            for record in &report.checks {
                lines.extend(check_lines(record));
            }
        }
        SuiteOutcome::Skipped { reason } => {
            lines.push(format!("    {YELLOW}skipped:{RESET} {reason}"));
        }
        SuiteOutcome::StartupFailed { error } => {
            lines.push(format!("    {RED}{BOLD}container did not start{RESET}"));
            for line in error.lines() {
                lines.push(format!("      {DIM}{line}{RESET}"));
            }
        }
    }
    lines
}

/// Closing summary line for a run.
#[must_use]
pub fn summary_line(report: &RunReport, elapsed: Duration) -> String {
    let tally = report.tally();
    let colour = if report.passed() { GREEN } else { RED };
    format!(
        "  {colour}{BOLD}{} passed, {} failed{RESET}, {} skipped in {}",
        tally.passed,
        tally.failed,
        tally.skipped,
        format_duration(elapsed)
    )
}

#[cfg(test)]
mod tests {
    use nbcheck_checks::suites::SuiteKind;
    use nbcheck_common::types::RunPhase;

    use super::*;

    #[test]
    fn format_duration_displays_millis() {
        assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
    }

    #[test]
    fn format_duration_displays_seconds() {
        assert_eq!(format_duration(Duration::from_millis(12_400)), "12.4s");
    }

    #[test]
    fn format_duration_displays_minutes() {
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 05s");
    }

    #[test]
    fn failed_check_shows_expected_and_actual() {
        let record = CheckRecord {
            name: "uid is 1000".into(),
            status: CheckStatus::Failed,
            expected: "output is `1000`".into(),
            actual: "exit 0, stdout: 0".into(),
            elapsed_ms: 420,
        };
        let lines = check_lines(&record);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("uid is 1000"));
        assert!(lines[1].ends_with("output is `1000`"));
        assert!(lines[2].ends_with("exit 0, stdout: 0"));
    }

    #[test]
    fn skipped_suite_shows_reason_only() {
        let report = SuiteReport {
            suite: SuiteKind::Gpu,
            outcome: SuiteOutcome::Skipped {
                reason: "no GPU runtime".into(),
            },
            phases: vec![RunPhase::NotStarted],
            checks: vec![CheckRecord::skipped("torch installed", String::new(), "no GPU runtime")],
        };
        let lines = suite_lines(&report);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("no GPU runtime"));
    }
}
