//! CLI command definitions and dispatch.

pub mod list;
pub mod preflight;
pub mod run;
pub mod settings;

use clap::{Args, Parser, Subcommand, ValueEnum};

use nbcheck_checks::suites::SuiteKind;
use nbcheck_common::config::HarnessConfig;
use nbcheck_common::constants::{ENV_IMAGE, ENV_NB_PREFIX, ENV_RUNTIME};
use nbcheck_common::types::{ImageRef, PortMapping};

/// nbcheck: container-integration checks for the Kubeflow notebook image.
#[derive(Parser, Debug)]
#[command(name = "nbcheck", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run check suites against the image.
    Run(run::RunArgs),
    /// List the checks of each suite.
    List(list::ListArgs),
    /// Report the host platform, runtime and GPU capability.
    Preflight(preflight::PreflightArgs),
    /// Print the notebook server settings baked into the image.
    Settings(settings::SettingsArgs),
}

/// Suite selection on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuiteArg {
    /// Image contents and user setup.
    Image,
    /// Platform integration against a running container.
    Kubeflow,
    /// CUDA and PyTorch with GPU passthrough.
    Gpu,
    /// Every suite.
    All,
}

impl SuiteArg {
    /// Suites selected by this argument, in execution order.
    pub fn kinds(self) -> Vec<SuiteKind> {
        match self {
            Self::Image => vec![SuiteKind::Image],
            Self::Kubeflow => vec![SuiteKind::Kubeflow],
            Self::Gpu => vec![SuiteKind::Gpu],
            Self::All => SuiteKind::ALL.to_vec(),
        }
    }
}

/// Overrides layered on top of the environment.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Image under test.
    #[arg(long, env = ENV_IMAGE)]
    pub image: Option<String>,

    /// Container runtime binary.
    #[arg(long, env = ENV_RUNTIME)]
    pub runtime: Option<String>,

    /// URL prefix injected into the notebook container.
    #[arg(long, env = ENV_NB_PREFIX)]
    pub nb_prefix: Option<String>,

    /// Published port, `host:container` or a single port.
    #[arg(long)]
    pub port: Option<PortMapping>,
}

impl ConfigArgs {
    /// Builds the harness configuration: defaults, then environment, then
    /// flags.
    pub fn resolve(self) -> HarnessConfig {
        self.apply(HarnessConfig::from_env())
    }

    fn apply(self, mut config: HarnessConfig) -> HarnessConfig {
        if let Some(image) = self.image.filter(|s| !s.is_empty()) {
            config.image = ImageRef::new(image);
        }
        if let Some(runtime) = self.runtime.filter(|s| !s.is_empty()) {
            config.runtime = runtime;
        }
        if let Some(prefix) = self.nb_prefix {
            config.nb_prefix = prefix;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        config
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => run::execute(args),
        Command::List(args) => list::execute(args),
        Command::Preflight(args) => preflight::execute(args),
        Command::Settings(args) => settings::execute(&args),
    }
}
