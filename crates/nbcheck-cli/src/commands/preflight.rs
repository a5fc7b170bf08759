//! `nbcheck preflight` — Report the host platform, runtime and GPU capability.

use clap::Args;
use serde_json::json;

use nbcheck_checks::runner::gpu_capability;
use nbcheck_runtime::backend::{CliRuntime, ContainerRuntime, platform_info};

use super::ConfigArgs;
use crate::output::{BOLD, DIM, GREEN, RED, RESET, YELLOW};

/// Arguments for the `preflight` command.
#[derive(Args, Debug)]
pub struct PreflightArgs {
    /// Print the findings as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Configuration overrides.
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Executes the `preflight` command.
///
/// # Errors
///
/// Returns an error if the container runtime cannot be found or does not
/// answer. A missing GPU runtime is reported, not an error.
pub fn execute(args: PreflightArgs) -> anyhow::Result<()> {
    let config = args.config.resolve();
    let info = platform_info(&config.runtime);

    let runtime = CliRuntime::detect(&config.runtime).ok();
    let available = runtime.as_ref().is_some_and(|rt| rt.is_available());
    let gpu = runtime.as_ref().map_or_else(
        || Err(format!("container runtime `{}` not found", config.runtime)),
        |rt| gpu_capability(rt, &config).map_err(|e| e.to_string()),
    );

    if args.json {
        let findings = json!({
            "platform": info,
            "runtime_available": available,
            "gpu": gpu.as_ref().err().map_or_else(
                || json!({ "available": true }),
                |reason| json!({ "available": false, "reason": reason }),
            ),
            "image": config.image,
        });
        println!("{}", serde_json::to_string_pretty(&findings)?);
    } else {
        eprintln!();
        eprintln!("  {BOLD}Platform{RESET}  {}/{}", info.os, info.arch);
        match &info.runtime_path {
            Some(path) => eprintln!(
                "  {BOLD}Runtime{RESET}   {} {DIM}({}){RESET}",
                info.runtime,
                path.display()
            ),
            None => eprintln!("  {BOLD}Runtime{RESET}   {RED}{} not found{RESET}", info.runtime),
        }
        match &gpu {
            Ok(()) => eprintln!("  {BOLD}GPU{RESET}       {GREEN}available{RESET}"),
            Err(reason) => eprintln!(
                "  {BOLD}GPU{RESET}       {YELLOW}unavailable{RESET} {DIM}{reason}{RESET}"
            ),
        }
        eprintln!("  {BOLD}Image{RESET}     {}", config.image);
        eprintln!();
    }

    if !available {
        anyhow::bail!("container runtime `{}` is not usable", config.runtime);
    }
    Ok(())
}
