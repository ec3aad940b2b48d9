use crate::backend::{CalculationEngine, HistoricalStore};
use crate::error::{GaugeError, GaugeResult};
use crate::query::CalculationRequest;
use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Duration;
use tracing::{debug, error};

pub struct HttpHistoricalStore {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpHistoricalStore {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl HistoricalStore for HttpHistoricalStore {
    async fn fetch(&self, query_text: &str) -> GaugeResult<Value> {
        debug!("POST {} ({} bytes)", self.url, query_text.len());
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(query_text.to_string())
            .timeout(self.timeout)
            .send()
            .await;
        read_rows(&self.url, response).await
    }
}

pub struct HttpCalculationEngine {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpCalculationEngine {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl CalculationEngine for HttpCalculationEngine {
    async fn fetch(&self, requests: &[CalculationRequest]) -> GaugeResult<Value> {
        debug!("POST {} ({} calculation requests)", self.url, requests.len());
        let response = self
            .client
            .post(&self.url)
            .json(requests)
            .timeout(self.timeout)
            .send()
            .await;
        read_rows(&self.url, response).await
    }
}

async fn read_rows(
    url: &str,
    response: Result<reqwest::Response, reqwest::Error>,
) -> GaugeResult<Value> {
    let response = match response {
        Ok(response) => response,
        Err(e) => {
            error!("Request to {} failed: {}", url, e);
            return Err(e.into());
        }
    };

    if !response.status().is_success() {
        error!("{} answered with HTTP {}", url, response.status());
        return Err(GaugeError::Transport {
            message: format!("HTTP error from {}: {}", url, response.status()),
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| GaugeError::malformed(format!("Failed to parse response from {}: {}", url, e)))
}
