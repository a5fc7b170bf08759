//! Container runtime plumbing for the nbcheck harness.
//!
//! Everything here is a thin layer over two leaf dependencies: the
//! container runtime CLI (driven as a subprocess) and a blocking HTTP
//! client.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod backend;
pub mod exec;
pub mod http;
pub mod lifecycle;
pub mod logs;
pub mod retry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
