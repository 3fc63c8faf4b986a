use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::{AnalyticsSink, PurchaseEvent};

/// Posts purchase events to an HTTP collector. Failures are logged and
/// dropped; reporting never delays or breaks settlement.
pub struct HttpAnalyticsSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnalyticsSink {
    /// `base_url` is the collector root, e.g. `http://analytics:9000`.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .context("Failed to build analytics HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/events", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl AnalyticsSink for HttpAnalyticsSink {
    async fn record(&self, event: PurchaseEvent) {
        let result = self
            .client
            .post(&self.endpoint)
            .json(&event)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        if let Err(err) = result {
            warn!(order = %event.order_id, error = %err, "analytics event dropped");
        }
    }
}

/// Swallows events. The default sink when no collector is configured.
pub struct NullAnalyticsSink;

#[async_trait]
impl AnalyticsSink for NullAnalyticsSink {
    async fn record(&self, event: PurchaseEvent) {
        debug!(order = %event.order_id, "analytics disabled, event dropped");
    }
}
