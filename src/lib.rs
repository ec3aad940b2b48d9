pub mod backend;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod model;
pub mod query;
pub mod reshape;
pub mod timeline;

pub use engine::{ChartDataEngine, ChartOutcome, ChartRequest};
pub use error::{GaugeError, GaugeResult};
pub use model::{ChartType, Entity, EntityFilter, Granularity, Kpi, TimeWindow};
pub use query::{QueryPlan, QueryPlanner};
pub use reshape::ReshapedSeries;

use backend::{HttpCalculationEngine, HttpHistoricalStore};
use catalog::{Catalog, InMemoryCatalog};
use query::{CalendarMapper, DemoCalendarMapper, IdentityCalendarMapper};
use std::sync::Arc;
use tokio::time::Duration;

#[derive(Debug, Clone)]
pub struct GaugeConfig {
    pub historical_store_url: String,
    pub calculation_engine_url: String,
    pub request_timeout_seconds: u64,
    // Shift historical windows into the demo data's calendar range
    pub demo_calendar: bool,
    pub catalog_path: Option<String>,
    pub bind_address: String,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self {
            historical_store_url: "http://127.0.0.1:8001/historical".to_string(),
            calculation_engine_url: "http://127.0.0.1:8002/calculate".to_string(),
            request_timeout_seconds: 30,
            demo_calendar: true,
            catalog_path: None,
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

impl GaugeConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("HISTORICAL_STORE_URL") {
            config.historical_store_url = url;
        }

        if let Ok(url) = std::env::var("CALCULATION_ENGINE_URL") {
            config.calculation_engine_url = url;
        }

        if let Ok(timeout_str) = std::env::var("REQUEST_TIMEOUT_SECONDS") {
            config.request_timeout_seconds = timeout_str.parse().unwrap_or(30);
        }

        if let Ok(demo_str) = std::env::var("DEMO_CALENDAR") {
            config.demo_calendar = demo_str.parse().unwrap_or(true);
        }

        if let Ok(path) = std::env::var("CATALOG_PATH") {
            if !path.trim().is_empty() {
                config.catalog_path = Some(path);
            }
        }

        if let Ok(bind_addr) = std::env::var("BIND_ADDRESS") {
            config.bind_address = bind_addr;
        }

        config
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn calendar(&self) -> Arc<dyn CalendarMapper> {
        if self.demo_calendar {
            Arc::new(DemoCalendarMapper::default())
        } else {
            Arc::new(IdentityCalendarMapper)
        }
    }

    /// Loads the catalog file when one is configured; otherwise every KPI
    /// and entity id is accepted as-is.
    pub fn catalog(&self) -> GaugeResult<Arc<dyn Catalog>> {
        match &self.catalog_path {
            Some(path) => Ok(Arc::new(InMemoryCatalog::load(path)?)),
            None => Ok(Arc::new(InMemoryCatalog::lenient())),
        }
    }

    pub fn planner(&self) -> GaugeResult<QueryPlanner> {
        Ok(QueryPlanner::new(self.catalog()?, self.calendar()))
    }

    /// Builds an engine talking to the configured HTTP backends.
    pub fn engine(&self) -> GaugeResult<ChartDataEngine> {
        let timeout = self.request_timeout();
        Ok(ChartDataEngine::new(
            self.planner()?,
            Arc::new(HttpHistoricalStore::new(&self.historical_store_url, timeout)),
            Arc::new(HttpCalculationEngine::new(&self.calculation_engine_url, timeout)),
        ))
    }
}
