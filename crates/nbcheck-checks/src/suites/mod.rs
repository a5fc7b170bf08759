//! Check catalogs, one module per suite.

pub mod gpu;
pub mod image;
pub mod kubeflow;

use std::fmt;

use serde::Serialize;

use nbcheck_common::config::HarnessConfig;

use crate::spec::CheckSpec;

/// Home directory of the notebook user.
pub const HOME_DIR: &str = "/home/jovyan";

/// Shell snippet proving the home directory is writable.
pub(crate) const HOME_WRITABLE: &str =
    "touch /home/jovyan/test-file && rm /home/jovyan/test-file && echo 'success'";

/// A group of checks sharing one container lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteKind {
    /// Image contents and user setup, one `run --rm` per check.
    Image,
    /// Platform integration against a long-running container.
    Kubeflow,
    /// CUDA and PyTorch with device passthrough.
    Gpu,
}

impl SuiteKind {
    /// Every suite, in execution order.
    pub const ALL: [Self; 3] = [Self::Image, Self::Kubeflow, Self::Gpu];
}

impl fmt::Display for SuiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Kubeflow => write!(f, "kubeflow"),
            Self::Gpu => write!(f, "gpu"),
        }
    }
}

/// Checks of a suite, in execution order.
#[must_use]
pub fn catalog(kind: SuiteKind, config: &HarnessConfig) -> Vec<CheckSpec> {
    match kind {
        SuiteKind::Image => image::checks(),
        SuiteKind::Kubeflow => kubeflow::checks(config),
        SuiteKind::Gpu => gpu::checks(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn check_names_are_unique_per_suite() {
        let config = HarnessConfig::default();
        for kind in SuiteKind::ALL {
            let checks = catalog(kind, &config);
            assert!(!checks.is_empty(), "{kind} has no checks");
            let names: HashSet<&str> = checks.iter().map(|c| c.name.as_str()).collect();
            assert_eq!(names.len(), checks.len(), "duplicate names in {kind}");
        }
    }

    #[test]
    fn every_check_has_an_expectation() {
        let config = HarnessConfig::default();
        for kind in SuiteKind::ALL {
            for check in catalog(kind, &config) {
                assert!(!check.expectations.is_empty(), "{} is unchecked", check.name);
            }
        }
    }
}
