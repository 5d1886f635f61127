//! HTTPS reachability probes.

use async_trait::async_trait;
use common::{QueryError, Record};
use reqwest::Client;
use std::time::Duration;

#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// GET `url`, following redirects. Returns `{Url, Status}`.
    async fn probe(&self, url: &str) -> Result<Record, QueryError>;
}

/// Probe backed by a reqwest client.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self, QueryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QueryError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProber {
    async fn probe(&self, url: &str) -> Result<Record, QueryError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            let kind = if e.is_timeout() {
                "timed out"
            } else if e.is_connect() {
                "connection failed"
            } else {
                "request failed"
            };
            tracing::warn!(
                target: "infra_tests.adapters.reachability",
                url = %url,
                error = %e,
                "Probe failed"
            );
            QueryError::Transport(format!("GET {} {}", url, kind))
        })?;

        let status = response.status().as_u16();
        tracing::debug!(
            target: "infra_tests.adapters.reachability",
            url = %url,
            status,
            "Probe completed"
        );

        Ok(Record::new().with("Url", url).with("Status", status))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let prober = HttpProber::new(Duration::from_secs(2)).unwrap();
        // port 9 (discard) on loopback is closed on test machines
        let err = prober.probe("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, QueryError::Transport(msg) if msg.contains("127.0.0.1:9")));
    }
}
