//! Harness-wide constants and defaults.

/// Registry namespace used when `DOCKER_HUB_USERNAME` is unset.
pub const DEFAULT_REGISTRY_USER: &str = "danieldu28121999";

/// Repository and tag of the notebook image under test.
pub const IMAGE_REPOSITORY: &str = "kubeflow-notebook-uv:latest";

/// Container runtime CLI used when none is configured.
pub const DEFAULT_RUNTIME: &str = "docker";

/// Name of the long-running container used by the Kubeflow suite.
pub const DEFAULT_CONTAINER_NAME: &str = "test-kubeflow-compliance";

/// Reverse-proxy prefix injected into the Kubeflow suite container.
pub const DEFAULT_NB_PREFIX: &str = "/notebook/test-user/test-notebook";

/// Port the editor listens on inside the image, published 1:1 on the host.
pub const NOTEBOOK_PORT: u16 = 8888;

/// Host used to reach published ports.
pub const DEFAULT_PROBE_HOST: &str = "localhost";

/// Startup readiness polling budget.
pub const MAX_STARTUP_RETRIES: u32 = 30;
/// Delay between startup readiness probes.
pub const STARTUP_RETRY_DELAY_SECS: u64 = 1;

/// Per-check HTTP polling budget.
pub const HTTP_MAX_RETRIES: u32 = 5;
/// Delay between per-check HTTP attempts.
pub const HTTP_RETRY_DELAY_SECS: u64 = 1;
/// Timeout applied to each HTTP request.
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// Timeout for commands run inside the notebook image.
pub const CONTAINER_COMMAND_TIMEOUT_SECS: u64 = 120;
/// Timeout for commands run inside a GPU-enabled container.
pub const GPU_COMMAND_TIMEOUT_SECS: u64 = 120;

/// Minimal CUDA image used by the GPU capability probe.
pub const GPU_PROBE_IMAGE: &str = "nvidia/cuda:12.2.0-runtime-ubuntu22.04";
/// Timeout of the GPU capability probe.
pub const GPU_PROBE_TIMEOUT_SECS: u64 = 30;

/// Statuses treated as proof that the server process is up.
///
/// 404 is included on purpose: the process answers even when the root path
/// is not routed.
pub const ALIVE_STATUSES: [u16; 3] = [200, 302, 404];

/// Exit code reported for commands that exceeded their timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 1;

/// Environment variable overriding the full image reference.
pub const ENV_IMAGE: &str = "NBCHECK_IMAGE";
/// Environment variable holding the registry namespace.
pub const ENV_REGISTRY_USER: &str = "DOCKER_HUB_USERNAME";
/// Environment variable holding the reverse-proxy prefix.
pub const ENV_NB_PREFIX: &str = "NB_PREFIX";
/// Environment variable selecting the runtime binary.
pub const ENV_RUNTIME: &str = "NBCHECK_RUNTIME";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "nbcheck";
