//! Blocking HTTP probing of published container ports.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use nbcheck_common::constants::ALIVE_STATUSES;
use nbcheck_common::error::{HarnessError, Result};
use nbcheck_common::types::RetryPolicy;

use crate::exec::ProbeResult;
use crate::retry::{Retried, retry_until};

/// Returns whether `status` proves the server process is answering.
///
/// 404 counts: the process is up even when the path is not routed.
#[must_use]
pub fn is_alive_status(status: u16) -> bool {
    ALIVE_STATUSES.contains(&status)
}

/// HTTP client used for readiness polling and HTTP checks.
///
/// Redirects are not followed, so the status observed is the one the
/// server inside the container answered with.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::blocking::Client,
}

impl HttpProber {
    /// Creates a prober whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| HarnessError::Http {
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// Issues a single GET.
    ///
    /// # Errors
    ///
    /// Returns the client error when no response was received (connection
    /// refused, reset, timeout). Any status code is a successful result.
    pub fn get(&self, url: &str) -> std::result::Result<ProbeResult, reqwest::Error> {
        let started = Instant::now();
        let response = self.client.get(url).send()?;
        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_ascii_lowercase(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().unwrap_or_default();
        tracing::debug!(url, status, "HTTP response");
        Ok(ProbeResult::Http {
            status,
            headers,
            body,
            elapsed: started.elapsed(),
        })
    }

    /// GET with retry on connection failure.
    ///
    /// The first response is returned as-is whatever its status; only
    /// transport errors are retried. Exhaustion yields
    /// [`ProbeResult::Unreachable`].
    pub fn probe(&self, url: &str, policy: &RetryPolicy) -> ProbeResult {
        let started = Instant::now();
        let retried = retry_until(policy, |_| self.get(url));
        match retried.outcome {
            Ok(result) => result,
            Err(e) => ProbeResult::Unreachable {
                message: e.to_string(),
                attempts: retried.attempts,
                elapsed: started.elapsed(),
            },
        }
    }

    /// Polls until a status in the alive class is observed.
    ///
    /// Transport errors and other statuses are retried silently. The error
    /// of an exhausted budget describes the last attempt.
    pub fn poll_alive(&self, url: &str, policy: &RetryPolicy) -> Retried<u16, String> {
        retry_until(policy, |attempt| match self.get(url) {
            Ok(result) => match result.status() {
                Some(status) if is_alive_status(status) => {
                    tracing::info!(url, status, attempt, "service is responding");
                    Ok(status)
                }
                other => Err(format!("unexpected status {other:?}")),
            },
            Err(e) => Err(e.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alive_class_includes_redirect_and_not_found() {
        assert!(is_alive_status(200));
        assert!(is_alive_status(302));
        assert!(is_alive_status(404));
        assert!(!is_alive_status(500));
        assert!(!is_alive_status(503));
        assert!(!is_alive_status(401));
    }

    #[test]
    fn probe_of_closed_port_is_unreachable() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let prober = HttpProber::new(Duration::from_secs(2)).unwrap();
        let result = prober.probe(
            &format!("http://127.0.0.1:{port}"),
            &RetryPolicy::new(2, Duration::ZERO),
        );
        match result {
            ProbeResult::Unreachable { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("expected unreachable, got {other:?}"),
        }
    }
}
