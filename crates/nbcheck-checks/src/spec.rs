//! Declarative check definitions.

use std::fmt;
use std::time::Duration;

use nbcheck_runtime::exec::ProbeResult;

/// How a check obtains its [`ProbeResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckMode {
    /// Run a command inside the container.
    Exec {
        /// Argument vector executed in the container.
        command: Vec<String>,
    },
    /// GET a path on the published editor port.
    Http {
        /// Request path, starting with `/`.
        path: String,
    },
    /// Ask the runtime which host addresses a container port is published on.
    PublishedPort {
        /// Port inside the container.
        container_port: u16,
    },
}

/// A predicate over a [`ProbeResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// The command exited with this code.
    ExitCode(i32),
    /// Standard output contains the substring.
    StdoutContains(String),
    /// Standard output contains the substring, ignoring ASCII case.
    StdoutContainsIgnoreCase(String),
    /// Standard output, trimmed, equals the value.
    StdoutEquals(String),
    /// Standard output has non-whitespace content.
    StdoutNotEmpty,
    /// Standard output is blank.
    StdoutEmpty,
    /// Standard output parses as an integer of at least this value.
    StdoutAtLeast(i64),
    /// The HTTP status is one of these.
    StatusIn(Vec<u16>),
    /// A response was received and the header is absent or differs from
    /// `value` (case-insensitive).
    HeaderNot {
        /// Header name.
        name: String,
        /// Rejected value.
        value: String,
    },
    /// At least one of the nested expectations holds.
    AnyOf(Vec<Expectation>),
}

impl Expectation {
    /// Substring match on standard output.
    #[must_use]
    pub fn contains(needle: impl Into<String>) -> Self {
        Self::StdoutContains(needle.into())
    }

    /// Exact match on trimmed standard output.
    #[must_use]
    pub fn equals(value: impl Into<String>) -> Self {
        Self::StdoutEquals(value.into())
    }

    /// Returns whether the predicate holds for `result`.
    #[must_use]
    pub fn holds(&self, result: &ProbeResult) -> bool {
        let stdout = result.stdout();
        match self {
            Self::ExitCode(code) => result.exit_code() == Some(*code),
            Self::StdoutContains(needle) => stdout.contains(needle.as_str()),
            Self::StdoutContainsIgnoreCase(needle) => stdout
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase()),
            Self::StdoutEquals(value) => stdout.trim() == value,
            Self::StdoutNotEmpty => !stdout.trim().is_empty(),
            Self::StdoutEmpty => stdout.trim().is_empty(),
            Self::StdoutAtLeast(min) => stdout.trim().parse::<i64>().is_ok_and(|n| n >= *min),
            Self::StatusIn(statuses) => result.status().is_some_and(|s| statuses.contains(&s)),
            Self::HeaderNot { name, value } => {
                result.status().is_some()
                    && result
                        .header(name)
                        .is_none_or(|v| !v.trim().eq_ignore_ascii_case(value))
            }
            Self::AnyOf(options) => options.iter().any(|e| e.holds(result)),
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExitCode(code) => write!(f, "exit code {code}"),
            Self::StdoutContains(needle) => write!(f, "output contains `{needle}`"),
            Self::StdoutContainsIgnoreCase(needle) => {
                write!(f, "output contains `{needle}` (any case)")
            }
            Self::StdoutEquals(value) => write!(f, "output is `{value}`"),
            Self::StdoutNotEmpty => write!(f, "output is not empty"),
            Self::StdoutEmpty => write!(f, "output is empty"),
            Self::StdoutAtLeast(min) => write!(f, "output is a number >= {min}"),
            Self::StatusIn(statuses) => write!(f, "HTTP status in {statuses:?}"),
            Self::HeaderNot { name, value } => write!(f, "header {name} is not `{value}`"),
            Self::AnyOf(options) => {
                let parts: Vec<String> = options.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(" or "))
            }
        }
    }
}

/// A single verifiable assertion about the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSpec {
    /// Human-readable name.
    pub name: String,
    /// How the result is obtained.
    pub mode: CheckMode,
    /// Predicates that must all hold.
    pub expectations: Vec<Expectation>,
    /// Overrides the suite's command timeout.
    pub timeout: Option<Duration>,
}

impl CheckSpec {
    fn new(name: impl Into<String>, mode: CheckMode) -> Self {
        Self {
            name: name.into(),
            mode,
            expectations: Vec::new(),
            timeout: None,
        }
    }

    /// Runs `script` through `bash -c` in the container.
    #[must_use]
    pub fn shell(name: impl Into<String>, script: &str) -> Self {
        Self::exec(name, &["bash", "-c", script])
    }

    /// Runs an argument vector in the container.
    #[must_use]
    pub fn exec(name: impl Into<String>, argv: &[&str]) -> Self {
        Self::new(
            name,
            CheckMode::Exec {
                command: argv.iter().map(|a| (*a).to_string()).collect(),
            },
        )
    }

    /// GETs `path` on the published editor port.
    #[must_use]
    pub fn http(name: impl Into<String>, path: &str) -> Self {
        Self::new(
            name,
            CheckMode::Http {
                path: path.to_string(),
            },
        )
    }

    /// Queries the runtime for the bindings of `container_port`.
    #[must_use]
    pub fn published_port(name: impl Into<String>, container_port: u16) -> Self {
        Self::new(name, CheckMode::PublishedPort { container_port })
    }

    /// Adds a predicate.
    #[must_use]
    pub fn expect(mut self, expectation: Expectation) -> Self {
        self.expectations.push(expectation);
        self
    }

    /// Requires exit code zero.
    #[must_use]
    pub fn succeeds(self) -> Self {
        self.expect(Expectation::ExitCode(0))
    }

    /// Overrides the command timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The first expectation that does not hold, if any.
    #[must_use]
    pub fn first_violation(&self, result: &ProbeResult) -> Option<&Expectation> {
        self.expectations.iter().find(|e| !e.holds(result))
    }

    /// All expectations, rendered for reports.
    #[must_use]
    pub fn expected(&self) -> String {
        if self.expectations.is_empty() {
            return "completes".to_string();
        }
        let parts: Vec<String> = self.expectations.iter().map(ToString::to_string).collect();
        parts.join("; ")
    }

    /// Short description of what the check runs.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.mode {
            CheckMode::Exec { command } => match command.as_slice() {
                [shell, flag, script] if shell == "bash" && flag == "-c" => script.clone(),
                argv => argv.join(" "),
            },
            CheckMode::Http { path } => format!("GET {path}"),
            CheckMode::PublishedPort { container_port } => format!("port {container_port}"),
        }
    }
}
