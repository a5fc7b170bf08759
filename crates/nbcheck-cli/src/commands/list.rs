//! `nbcheck list` — List the checks of each suite.

use clap::Args;

use nbcheck_checks::suites::catalog;

use super::{ConfigArgs, SuiteArg};

/// Arguments for the `list` command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Suite to list.
    #[arg(long, value_enum, default_value_t = SuiteArg::All)]
    pub suite: SuiteArg,

    /// Configuration overrides.
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Executes the `list` command.
pub fn execute(args: ListArgs) -> anyhow::Result<()> {
    let config = args.config.resolve();

    println!("SUITE\tCHECK\tRUNS\tEXPECTS");
    for kind in args.suite.kinds() {
        for check in catalog(kind, &config) {
            println!(
                "{kind}\t{}\t{}\t{}",
                check.name,
                first_line(&check.describe()),
                check.expected()
            );
        }
    }
    Ok(())
}

fn first_line(s: &str) -> &str {
    s.trim().lines().next().unwrap_or_default()
}
