//! HTTP readiness probing for freshly started services.

use crate::config::{HEALTH_POLL_INTERVAL, HEALTH_REQUEST_TIMEOUT};
use crate::error::HealthError;
use crate::logging::{debug, warn};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct HealthProber {
    client: reqwest::Client,
    interval: Duration,
}

impl Default for HealthProber {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthProber {
    pub fn new() -> Self {
        Self::with_interval(HEALTH_POLL_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HEALTH_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn(format!(
                    "failed to build health client, falling back to defaults: {}",
                    err
                ));
                reqwest::Client::new()
            });
        Self { client, interval }
    }

    /// Poll `http://localhost:<port>/` until it answers with a status below
    /// 500 or `timeout` elapses.
    ///
    /// 4xx counts as healthy: the service is up and routing requests.
    /// Connection failures just mean "not yet".
    pub async fn wait_for_health(&self, port: u16, timeout: Duration) -> Result<(), HealthError> {
        let url = format!("http://localhost:{}/", port);
        let deadline = Instant::now() + timeout;
        let mut attempts = 0u32;

        while Instant::now() < deadline {
            attempts += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if self.probe(&url, remaining).await {
                debug(format!("{} healthy after {} attempt(s)", url, attempts));
                return Ok(());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(self.interval.min(remaining)).await;
        }

        Err(HealthError::TimedOut {
            port,
            waited: timeout,
            attempts,
        })
    }

    async fn probe(&self, url: &str, remaining: Duration) -> bool {
        let request = self
            .client
            .get(url)
            .timeout(HEALTH_REQUEST_TIMEOUT.min(remaining.max(Duration::from_millis(1))));

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                debug(format!("{} answered {}", url, status));
                status.as_u16() < 500
            }
            Err(err) => {
                debug(format!("{} not ready: {}", url, err));
                false
            }
        }
    }
}
