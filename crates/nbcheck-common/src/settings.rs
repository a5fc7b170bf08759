//! Notebook server settings baked into the image.
//!
//! The image ships `config/jupyter_lab_config.py`, which is exactly the
//! rendering of [`NotebookServerSettings::default`]. The harness never reads
//! it; the notebook server consumes it at container startup.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Declarative settings for the notebook server process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotebookServerSettings {
    /// Bind address.
    pub ip: String,
    /// Listen port.
    pub port: u16,
    /// Whether the server opens a browser on startup.
    pub open_browser: bool,
    /// Access token. Empty disables token auth; the platform proxy authenticates.
    pub token: String,
    /// Password hash. Empty disables password auth.
    pub password: String,
    /// Accept connections from non-local addresses.
    pub allow_remote_access: bool,
    /// Allow the server to run as root.
    pub allow_root: bool,
    /// CORS `Access-Control-Allow-Origin` value.
    pub allow_origin: String,
    /// Output size cap in bytes.
    pub max_output_size: u64,
    /// Seconds to wait for a kernel to answer `kernel_info`.
    pub kernel_info_timeout: u32,
}

impl Default for NotebookServerSettings {
    fn default() -> Self {
        Self {
            ip: "0.0.0.0".into(),
            port: 8889,
            open_browser: false,
            token: String::new(),
            password: String::new(),
            allow_remote_access: true,
            allow_root: false,
            allow_origin: "*".into(),
            max_output_size: 10_000_000,
            kernel_info_timeout: 10,
        }
    }
}

impl NotebookServerSettings {
    /// Renders the settings as a Jupyter `traitlets` configuration file.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Notebook server settings for Kubeflow deployments.");
        let _ = writeln!(out, "# Rendered by `nbcheck settings`; copied into the image at build time.");
        let _ = writeln!(out, "# Authentication is left to the Kubeflow reverse proxy.");
        let _ = writeln!(out);
        for app in ["ServerApp", "LabApp"] {
            let _ = writeln!(out, "c.{app}.ip = {}", py_str(&self.ip));
            let _ = writeln!(out, "c.{app}.port = {}", self.port);
            let _ = writeln!(out, "c.{app}.open_browser = {}", py_bool(self.open_browser));
        }
        let _ = writeln!(out);
        for app in ["ServerApp", "NotebookApp"] {
            let _ = writeln!(out, "c.{app}.token = {}", py_str(&self.token));
            let _ = writeln!(out, "c.{app}.password = {}", py_str(&self.password));
        }
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "c.ServerApp.allow_remote_access = {}",
            py_bool(self.allow_remote_access)
        );
        let _ = writeln!(out, "c.ServerApp.allow_root = {}", py_bool(self.allow_root));
        let _ = writeln!(out, "c.ServerApp.allow_origin = {}", py_str(&self.allow_origin));
        let _ = writeln!(out);
        let _ = writeln!(out, "c.NotebookApp.max_output_size = {}", self.max_output_size);
        let _ = writeln!(
            out,
            "c.MappingKernelManager.kernel_info_timeout = {}",
            self.kernel_info_timeout
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "import os");
        let _ = writeln!(out);
        let _ = writeln!(out, "print(f\"[JupyterLab] Starting in: {{os.getcwd()}}\")");
        let _ = writeln!(
            out,
            "print(f\"[JupyterLab] NB_PREFIX: {{os.getenv('NB_PREFIX', 'Not set')}}\")"
        );
        out
    }
}

fn py_str(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

const fn py_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIPPED: &str = include_str!("../../../config/jupyter_lab_config.py");

    #[test]
    fn shipped_file_matches_rendering() {
        assert_eq!(NotebookServerSettings::default().render(), SHIPPED);
    }

    #[test]
    fn auth_is_disabled_and_cors_open() {
        let text = NotebookServerSettings::default().render();
        assert!(text.contains("c.ServerApp.token = ''"));
        assert!(text.contains("c.NotebookApp.password = ''"));
        assert!(text.contains("c.ServerApp.allow_origin = '*'"));
        assert!(text.contains("c.NotebookApp.max_output_size = 10000000"));
    }

    #[test]
    fn startup_lines_come_from_the_server() {
        let text = NotebookServerSettings::default().render();
        let prints: Vec<&str> = text.lines().filter(|l| l.starts_with("print(")).collect();
        assert_eq!(prints.len(), 2);
        assert!(prints.iter().all(|l| l.starts_with("print(f\"[JupyterLab] ")));
        assert!(prints[0].contains("Starting in: {os.getcwd()}"));
    }

    #[test]
    fn port_override_applies_to_both_apps() {
        let settings = NotebookServerSettings {
            port: 8888,
            ..NotebookServerSettings::default()
        };
        let text = settings.render();
        assert!(text.contains("c.ServerApp.port = 8888"));
        assert!(text.contains("c.LabApp.port = 8888"));
        assert!(!text.contains("8889"));
    }

    #[test]
    fn strings_are_quoted_for_python() {
        assert_eq!(py_str("it's"), "'it\\'s'");
        assert_eq!(py_str(""), "''");
    }
}
