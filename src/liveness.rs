use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Status code returned when the request itself fails.
pub const UNREACHABLE: u16 = 0;

pub struct LivenessChecker {
    client: Client,
}

impl LivenessChecker {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    #[cfg(test)]
    pub(crate) fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Status code of `https://<domain>` after redirects, or [`UNREACHABLE`]
    /// for timeouts, DNS, connection and TLS failures.
    pub fn is_live(&self, domain: &str) -> u16 {
        self.status_of(&liveness_url(domain))
    }

    pub(crate) fn status_of(&self, url: &str) -> u16 {
        let start_time = Instant::now();
        match self.client.get(url).send() {
            Ok(response) => {
                let status = response.status().as_u16();
                info!(
                    action = "check",
                    component = "liveness",
                    url = url,
                    status,
                    duration_ms = start_time.elapsed().as_millis(),
                    "Liveness check answered"
                );
                status
            }
            Err(e) => {
                debug!(action = "check", component = "liveness", url = url, error = %e, "Liveness check failed");
                UNREACHABLE
            }
        }
    }
}

/// The URL probed for `domain`.
pub fn liveness_url(domain: &str) -> String {
    format!("https://{}", domain.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockHttp;

    fn checker(timeout: Duration) -> LivenessChecker {
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .unwrap();
        LivenessChecker::from_client(client)
    }

    #[test]
    fn test_liveness_url_is_https_root() {
        assert_eq!(liveness_url("example.com"), "https://example.com");
        assert_eq!(liveness_url(" example.com\n"), "https://example.com");
    }

    #[test]
    fn test_status_code_is_returned() {
        let server = MockHttp::start();
        server.mock_get("/", 200, "ok");
        assert_eq!(checker(Duration::from_secs(5)).status_of(&format!("{}/", server.uri())), 200);
    }

    #[test]
    fn test_error_status_is_not_collapsed() {
        let server = MockHttp::start();
        assert_eq!(
            checker(Duration::from_secs(5)).status_of(&format!("{}/missing", server.uri())),
            404
        );
    }

    #[test]
    fn test_timeout_returns_zero() {
        let server = MockHttp::start();
        server.mock_slow_get("/", Duration::from_secs(3));
        assert_eq!(
            checker(Duration::from_millis(200)).status_of(&format!("{}/", server.uri())),
            UNREACHABLE
        );
    }

    #[test]
    fn test_plain_http_server_fails_https_check() {
        let server = MockHttp::start();
        server.mock_get("/", 200, "ok");
        let host = server.uri().trim_start_matches("http://").to_string();

        let checker = checker(Duration::from_secs(5));
        assert_eq!(checker.is_live(&host), UNREACHABLE);
    }
}
