//! Image contents: toolchain, editor, user setup and system tools.
//!
//! Every check runs in its own `run --rm` container, so package installs
//! in one check are invisible to the next.

use super::{HOME_DIR, HOME_WRITABLE};
use crate::spec::{CheckSpec, Expectation};

/// Python version the image ships with.
pub const DEFAULT_PYTHON_VERSION: &str = "3.11";

/// Checks of the `image` suite.
#[must_use]
pub fn checks() -> Vec<CheckSpec> {
    vec![
        // uv
        CheckSpec::shell("uv installed", "uv --version")
            .succeeds()
            .expect(Expectation::StdoutContainsIgnoreCase("uv".into())),
        CheckSpec::shell("uvx installed", "uvx --version").succeeds(),
        CheckSpec::shell("uv python installed", "uv python list")
            .succeeds()
            .expect(Expectation::AnyOf(vec![
                Expectation::contains(DEFAULT_PYTHON_VERSION),
                Expectation::StdoutContainsIgnoreCase("cpython".into()),
            ])),
        CheckSpec::shell(
            "uv installs python 3.10",
            "uv python install 3.10 && uv python list | grep 3.10",
        )
        .succeeds()
        .expect(Expectation::contains("3.10")),
        CheckSpec::shell(
            "uv pip install",
            "uv pip install --system requests && \
             python -c 'import requests; print(requests.__version__)'",
        )
        .succeeds()
        .expect(Expectation::StdoutNotEmpty),
        CheckSpec::shell(
            "uv venv",
            "uv venv /tmp/testenv && ls /tmp/testenv/bin/python",
        )
        .succeeds(),
        // editor
        CheckSpec::shell("code-server installed", "code-server --version").succeeds(),
        // platform user
        CheckSpec::shell("user is jovyan", "whoami")
            .succeeds()
            .expect(Expectation::equals("jovyan")),
        CheckSpec::shell("uid is 1000", "id -u")
            .succeeds()
            .expect(Expectation::equals("1000")),
        CheckSpec::shell("gid is 100", "id -g")
            .succeeds()
            .expect(Expectation::equals("100")),
        CheckSpec::shell("home directory", "echo $HOME")
            .succeeds()
            .expect(Expectation::equals(HOME_DIR)),
        CheckSpec::shell(
            "s6-overlay installed",
            "test -f /init && echo 'yes' || echo 'no'",
        )
        .succeeds()
        .expect(Expectation::equals("yes")),
        CheckSpec::shell(
            "project directory",
            "test -d /home/jovyan/project && echo 'yes' || echo 'no'",
        )
        .succeeds()
        .expect(Expectation::equals("yes")),
        CheckSpec::shell("home writable", HOME_WRITABLE)
            .succeeds()
            .expect(Expectation::contains("success")),
        // system tools
        CheckSpec::shell("git installed", "git --version").succeeds(),
        CheckSpec::shell("curl installed", "curl --version | head -n 1").succeeds(),
        CheckSpec::shell("cuda home", "echo $CUDA_HOME")
            .succeeds()
            .expect(Expectation::equals("/usr/local/cuda")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::CheckMode;

    #[test]
    fn user_checks_match_platform_identity() {
        let checks = checks();
        let find = |name: &str| checks.iter().find(|c| c.name == name).unwrap();
        assert_eq!(find("user is jovyan").describe(), "whoami");
        assert!(
            find("uid is 1000")
                .expectations
                .contains(&Expectation::equals("1000"))
        );
        assert!(
            find("gid is 100")
                .expectations
                .contains(&Expectation::equals("100"))
        );
    }

    #[test]
    fn all_checks_are_shell_commands() {
        for check in checks() {
            match &check.mode {
                CheckMode::Exec { command } => assert_eq!(&command[..2], ["bash", "-c"]),
                other => panic!("{} uses {other:?}", check.name),
            }
        }
    }
}
