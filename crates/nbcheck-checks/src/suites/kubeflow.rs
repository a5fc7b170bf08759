//! Platform integration: the editor behind the published port, the
//! injected prefix, and the process supervisor.

use nbcheck_common::config::HarnessConfig;
use nbcheck_common::constants::ALIVE_STATUSES;

use super::HOME_WRITABLE;
use crate::spec::{CheckSpec, Expectation};

/// Checks of the `kubeflow` suite against the container launched with
/// `config`.
#[must_use]
pub fn checks(config: &HarnessConfig) -> Vec<CheckSpec> {
    let container_port = config.port.container;
    let host_binding = format!(":{}", config.port.host);
    vec![
        // `port <name> <container_port>` prints the host-side bindings.
        CheckSpec::published_port(format!("port {container_port} published"), container_port)
            .succeeds()
            .expect(Expectation::contains(host_binding)),
        CheckSpec::shell("NB_PREFIX visible", "echo $NB_PREFIX")
            .succeeds()
            .expect(Expectation::AnyOf(vec![
                Expectation::contains("/notebook/"),
                Expectation::StdoutEmpty,
            ])),
        CheckSpec::http("code-server responding", "/")
            .expect(Expectation::StatusIn(ALIVE_STATUSES.to_vec())),
        CheckSpec::http("iframe embedding allowed", "/").expect(Expectation::HeaderNot {
            name: "x-frame-options".into(),
            value: "DENY".into(),
        }),
        CheckSpec::exec("runs as jovyan", &["whoami"])
            .succeeds()
            .expect(Expectation::equals("jovyan")),
        CheckSpec::shell("home writable", HOME_WRITABLE)
            .succeeds()
            .expect(Expectation::contains("success")),
        CheckSpec::exec(
            "project directory exists",
            &["test", "-d", "/home/jovyan/project"],
        )
        .succeeds(),
        CheckSpec::exec("s6 supervising", &["ps", "aux"])
            .succeeds()
            .expect(Expectation::AnyOf(vec![
                Expectation::contains("s6-"),
                Expectation::contains("/init"),
            ])),
        CheckSpec::exec("code-server process running", &["pgrep", "-f", "code-server"])
            .succeeds()
            .expect(Expectation::StdoutNotEmpty),
    ]
}
