//! Delivery of payload batches to the collection endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::level::LogLevel;

/// Per-request timeout, so a hung request cannot stall backlog draining.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Wire-ready record of one log emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogPayload {
    pub level: LogLevel,
    /// Flattened argument line.
    pub message: String,
    /// Source URL of the emitting app.
    pub url: String,
    /// RFC 3339 capture time.
    pub timestamp: String,
}

/// JSON body posted to the collection endpoint.
#[derive(Debug, Serialize, Deserialize)]
struct LogBatch {
    logs: Vec<LogPayload>,
}

/// Delivery seam between the batcher and the network.
#[async_trait]
pub trait LogTransport: Send + Sync + 'static {
    /// Deliver a batch, awaiting the outcome. Callers treat any `Err` as a
    /// dropped batch; no retry is attempted.
    async fn deliver(&self, batch: Vec<LogPayload>) -> Result<(), String>;

    /// Submit a batch without awaiting completion. Used on teardown, where
    /// the normal request path cannot be guaranteed to finish. Delivery is
    /// not assured.
    fn deliver_detached(&self, batch: Vec<LogPayload>);
}

/// HTTP transport posting JSON batches to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: &str) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {e}"))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl LogTransport for HttpTransport {
    async fn deliver(&self, batch: Vec<LogPayload>) -> Result<(), String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&LogBatch { logs: batch })
            .send()
            .await
            .map_err(|e| format!("Failed to deliver log batch: {e}"))?;

        if !response.status().is_success() {
            return Err(format!(
                "Log batch rejected with status {}",
                response.status()
            ));
        }
        Ok(())
    }

    fn deliver_detached(&self, batch: Vec<LogPayload>) {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();

        // Fire and forget; errors are silently ignored to avoid log loops.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = client
                    .post(&endpoint)
                    .json(&LogBatch { logs: batch })
                    .send()
                    .await;
            });
        }
    }
}
