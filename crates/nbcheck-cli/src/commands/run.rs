//! `nbcheck run` — Run check suites against the image.

use std::time::Instant;

use clap::Args;

use nbcheck_checks::report::RunReport;
use nbcheck_checks::runner::{SuiteRunner, report_without_runtime};
use nbcheck_common::config::HarnessConfig;
use nbcheck_runtime::backend::CliRuntime;
use nbcheck_runtime::http::HttpProber;

use super::{ConfigArgs, SuiteArg};
use crate::output::{BOLD, DIM, RESET, YELLOW, suite_lines, summary_line};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Suite to run.
    #[arg(long, value_enum, default_value_t = SuiteArg::All)]
    pub suite: SuiteArg,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Configuration overrides.
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Executes the `run` command.
///
/// # Errors
///
/// Returns an error if any executed check failed or a suite's container
/// never started.
pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    let total_start = Instant::now();
    let config = args.config.resolve();
    let kinds = args.suite.kinds();
    print_header(&config);

    let report = match CliRuntime::detect(&config.runtime) {
        Ok(runtime) => {
            let http = HttpProber::new(config.http_timeout)?;
            SuiteRunner::new(&runtime, &http, &config).run_all(&kinds)
        }
        Err(e) => {
            eprintln!("  {YELLOW}Note:{RESET} {e}");
            eprintln!();
            let mut report = RunReport::new(config.image.clone());
            for kind in kinds {
                report.push(report_without_runtime(kind, &config, &e));
            }
            report
        }
    };

    for suite in &report.suites {
        for line in suite_lines(suite) {
            eprintln!("{line}");
        }
        eprintln!();
    }
    eprintln!("{}", summary_line(&report, total_start.elapsed()));
    eprintln!("  {DIM}run {}{RESET}", report.run_id);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    report.ensure_passed()?;
    Ok(())
}

fn print_header(config: &HarnessConfig) {
    eprintln!();
    eprintln!("  {BOLD}nbcheck{RESET} {DIM}v{}{RESET}", env!("CARGO_PKG_VERSION"));
    eprintln!("  {DIM}image:{RESET}   {}", config.image);
    eprintln!("  {DIM}runtime:{RESET} {}", config.runtime);
    eprintln!();
}
