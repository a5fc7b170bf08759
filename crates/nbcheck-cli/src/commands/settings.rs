//! `nbcheck settings` — Print the notebook server settings baked into the image.

use clap::Args;

use nbcheck_common::settings::NotebookServerSettings;

/// Arguments for the `settings` command.
#[derive(Args, Debug)]
pub struct SettingsArgs {
    /// Override the notebook server port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Print the settings as JSON instead of a Python config file.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `settings` command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(args: &SettingsArgs) -> anyhow::Result<()> {
    let settings = resolve(args);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        print!("{}", settings.render());
    }
    Ok(())
}

fn resolve(args: &SettingsArgs) -> NotebookServerSettings {
    let mut settings = NotebookServerSettings::default();
    if let Some(port) = args.port {
        settings.port = port;
    }
    settings
}
