use crate::backend::{CalculationEngine, HistoricalStore};
use crate::error::{GaugeError, GaugeResult};
use crate::query::CalculationRequest;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone)]
enum Reply {
    Fixed(Value),
    Echo,
    Fail(String),
}

// In-memory historical store for tests and offline demos
#[derive(Debug, Clone)]
pub struct MockHistoricalStore {
    reply: Reply,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockHistoricalStore {
    pub fn returning(payload: Value) -> Self {
        Self {
            reply: Reply::Fixed(payload),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Reply::Fail(message.into()),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Query texts received so far.
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl HistoricalStore for MockHistoricalStore {
    async fn fetch(&self, query_text: &str) -> GaugeResult<Value> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query_text.to_string());

        match &self.reply {
            Reply::Fixed(payload) => Ok(payload.clone()),
            Reply::Fail(message) => Err(GaugeError::Transport {
                message: message.clone(),
            }),
            // Historical queries carry no per-row work items to echo.
            Reply::Echo => Ok(json!([])),
        }
    }
}

// In-memory calculation engine; records every batch it receives
#[derive(Debug, Clone)]
pub struct MockCalculationEngine {
    reply: Reply,
    batches: Arc<Mutex<Vec<Vec<CalculationRequest>>>>,
}

impl MockCalculationEngine {
    pub fn returning(payload: Value) -> Self {
        Self {
            reply: Reply::Fixed(payload),
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answers every request with a row for the same period and entity,
    /// valued by the request's position in the batch.
    pub fn echoing() -> Self {
        Self {
            reply: Reply::Echo,
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Reply::Fail(message.into()),
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn batches(&self) -> Vec<Vec<CalculationRequest>> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CalculationEngine for MockCalculationEngine {
    async fn fetch(&self, requests: &[CalculationRequest]) -> GaugeResult<Value> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(requests.to_vec());

        match &self.reply {
            Reply::Fixed(payload) => Ok(payload.clone()),
            Reply::Fail(message) => Err(GaugeError::Transport {
                message: message.clone(),
            }),
            Reply::Echo => Ok(Value::Array(
                requests
                    .iter()
                    .enumerate()
                    .map(|(i, request)| {
                        json!({
                            "Date_Start": request.period_start,
                            "Machine_Name": request.entity,
                            "Value": i as f64,
                        })
                    })
                    .collect(),
            )),
        }
    }
}
