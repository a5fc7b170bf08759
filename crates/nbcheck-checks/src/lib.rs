//! # nbcheck-checks
//!
//! Black-box checks against the notebook image and the machinery to run
//! them:
//! - [`spec`]: declarative [`CheckSpec`](spec::CheckSpec) values and their
//!   expectation predicates.
//! - [`executor`]: evaluates one check against a running or ephemeral
//!   container.
//! - [`suites`]: the `image`, `kubeflow` and `gpu` catalogs.
//! - [`runner`]: per-suite container lifecycle and GPU preflight.
//! - [`report`]: pass/fail/skip aggregation.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod executor;
pub mod report;
pub mod runner;
pub mod spec;
pub mod suites;
