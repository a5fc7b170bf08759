//! Harness configuration model.
//!
//! Built once at startup from defaults and the process environment, then
//! refined by CLI flags and passed by reference to every check.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::types::{ContainerName, ImageRef, PortMapping, RetryPolicy};

/// Root configuration for a harness run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Container runtime CLI binary (`docker`, `podman`, ...).
    pub runtime: String,
    /// Image under test.
    pub image: ImageRef,
    /// Name of the long-running container used by the Kubeflow suite.
    pub container_name: ContainerName,
    /// Reverse-proxy prefix injected as `NB_PREFIX`.
    pub nb_prefix: String,
    /// Port published for the editor.
    pub port: PortMapping,
    /// Host used to reach the published port.
    pub probe_host: String,
    /// Readiness polling budget after launch.
    pub startup_policy: RetryPolicy,
    /// Polling budget of individual HTTP checks.
    pub check_policy: RetryPolicy,
    /// Timeout of a single HTTP request.
    pub http_timeout: Duration,
    /// Timeout of a command run in the notebook image.
    pub command_timeout: Duration,
    /// Timeout of a command run with GPU passthrough.
    pub gpu_command_timeout: Duration,
    /// Image used by the GPU capability probe.
    pub gpu_probe_image: ImageRef,
    /// Timeout of the GPU capability probe.
    pub gpu_probe_timeout: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            runtime: constants::DEFAULT_RUNTIME.to_string(),
            image: default_image(constants::DEFAULT_REGISTRY_USER),
            container_name: ContainerName::new(constants::DEFAULT_CONTAINER_NAME),
            nb_prefix: constants::DEFAULT_NB_PREFIX.to_string(),
            port: PortMapping::same(constants::NOTEBOOK_PORT),
            probe_host: constants::DEFAULT_PROBE_HOST.to_string(),
            startup_policy: RetryPolicy::startup(),
            check_policy: RetryPolicy::per_check(),
            http_timeout: Duration::from_secs(constants::HTTP_TIMEOUT_SECS),
            command_timeout: Duration::from_secs(constants::CONTAINER_COMMAND_TIMEOUT_SECS),
            gpu_command_timeout: Duration::from_secs(constants::GPU_COMMAND_TIMEOUT_SECS),
            gpu_probe_image: ImageRef::new(constants::GPU_PROBE_IMAGE),
            gpu_probe_timeout: Duration::from_secs(constants::GPU_PROBE_TIMEOUT_SECS),
        }
    }
}

impl HarnessConfig {
    /// Builds a configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    ///
    /// `NBCHECK_IMAGE` wins over `DOCKER_HUB_USERNAME`; empty values are
    /// treated as unset.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(image) = get(constants::ENV_IMAGE) {
            config.image = ImageRef::new(image);
        } else if let Some(user) = get(constants::ENV_REGISTRY_USER) {
            config.image = default_image(&user);
        }
        if let Some(prefix) = get(constants::ENV_NB_PREFIX) {
            config.nb_prefix = prefix;
        }
        if let Some(runtime) = get(constants::ENV_RUNTIME) {
            config.runtime = runtime;
        }
        config
    }

    /// URL polled to decide whether the editor is up.
    #[must_use]
    pub fn probe_url(&self) -> String {
        format!("http://{}:{}", self.probe_host, self.port.host)
    }

    /// Environment injected into the Kubeflow suite container.
    #[must_use]
    pub fn container_env(&self) -> Vec<(String, String)> {
        vec![(constants::ENV_NB_PREFIX.to_string(), self.nb_prefix.clone())]
    }
}

/// Default image reference under the given registry namespace.
fn default_image(user: &str) -> ImageRef {
    ImageRef::new(format!("{user}/{}", constants::IMAGE_REPOSITORY))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = HarnessConfig::from_lookup(|_| None);
        assert_eq!(
            config.image.as_str(),
            "danieldu28121999/kubeflow-notebook-uv:latest"
        );
        assert_eq!(config.runtime, "docker");
        assert_eq!(config.nb_prefix, "/notebook/test-user/test-notebook");
        assert_eq!(config.probe_url(), "http://localhost:8888");
    }

    #[test]
    fn registry_user_changes_namespace() {
        let config = HarnessConfig::from_lookup(lookup(&[("DOCKER_HUB_USERNAME", "acme")]));
        assert_eq!(config.image.as_str(), "acme/kubeflow-notebook-uv:latest");
    }

    #[test]
    fn explicit_image_wins_over_registry_user() {
        let config = HarnessConfig::from_lookup(lookup(&[
            ("DOCKER_HUB_USERNAME", "acme"),
            ("NBCHECK_IMAGE", "ghcr.io/acme/nb:dev"),
        ]));
        assert_eq!(config.image.as_str(), "ghcr.io/acme/nb:dev");
    }

    #[test]
    fn empty_values_are_ignored() {
        let config =
            HarnessConfig::from_lookup(lookup(&[("NB_PREFIX", "  "), ("NBCHECK_RUNTIME", "")]));
        assert_eq!(config.nb_prefix, "/notebook/test-user/test-notebook");
        assert_eq!(config.runtime, "docker");
    }

    #[test]
    fn container_env_injects_prefix() {
        let config = HarnessConfig::from_lookup(lookup(&[("NB_PREFIX", "/notebook/ns/nb")]));
        assert_eq!(
            config.container_env(),
            vec![("NB_PREFIX".to_string(), "/notebook/ns/nb".to_string())]
        );
    }

    #[test]
    fn config_serializes_to_json() {
        let json = serde_json::to_value(HarnessConfig::default()).unwrap();
        assert_eq!(json["runtime"], "docker");
        assert_eq!(json["port"]["host"], 8888);
        assert_eq!(json["startup_policy"]["max_attempts"], 30);
    }
}
