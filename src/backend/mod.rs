pub mod http;
pub mod mock;

pub use http::{HttpCalculationEngine, HttpHistoricalStore};
pub use mock::{MockCalculationEngine, MockHistoricalStore};

use crate::error::GaugeResult;
use crate::query::CalculationRequest;
use async_trait::async_trait;
use serde_json::Value;

/// Pre-aggregated time-series store. Receives the structured query as JSON
/// text and answers with a list of rows.
#[async_trait]
pub trait HistoricalStore: Send + Sync {
    async fn fetch(&self, query_text: &str) -> GaugeResult<Value>;
}

/// On-demand KPI calculation. All work items of a request go out in one
/// batched call.
#[async_trait]
pub trait CalculationEngine: Send + Sync {
    async fn fetch(&self, requests: &[CalculationRequest]) -> GaugeResult<Value>;
}
