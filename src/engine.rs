use crate::backend::{CalculationEngine, HistoricalStore};
use crate::catalog::resolve_kpi;
use crate::error::{GaugeError, GaugeResult};
use crate::model::{ChartCategory, ChartType, EntityFilter, Granularity, Kpi, TimeWindow};
use crate::query::{QueryPlan, QueryPlanner};
use crate::reshape::{parse_calculation_rows, parse_historical_rows, reshape, ReshapedSeries};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A chart's data request as sent by the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartRequest {
    pub kpi: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    #[serde(default)]
    pub granularity: Option<Granularity>,
    pub chart_type: String,
    #[serde(default)]
    pub filter: Option<EntityFilter>,
}

impl ChartRequest {
    pub fn window(&self) -> GaugeResult<TimeWindow> {
        let window = TimeWindow::new(self.from, self.to)?;
        Ok(match self.granularity {
            Some(granularity) => window.with_granularity(granularity),
            None => window,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChartOutcome {
    Ready { data: ReshapedSeries },
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Clone)]
pub struct ChartDataEngine {
    planner: QueryPlanner,
    historical: Arc<dyn HistoricalStore>,
    calculation: Arc<dyn CalculationEngine>,
}

impl ChartDataEngine {
    pub fn new(
        planner: QueryPlanner,
        historical: Arc<dyn HistoricalStore>,
        calculation: Arc<dyn CalculationEngine>,
    ) -> Self {
        Self {
            planner,
            historical,
            calculation,
        }
    }

    pub fn planner(&self) -> &QueryPlanner {
        &self.planner
    }

    /// Resolves, plans, fetches and reshapes one chart's data.
    ///
    /// Transport failures are returned as-is. A response that cannot be
    /// read as rows yields an empty series of the chart's shape.
    pub async fn get_chart_data(
        &self,
        kpi: &str,
        window: &TimeWindow,
        chart_type: &str,
        filter: Option<&EntityFilter>,
    ) -> GaugeResult<ReshapedSeries> {
        let chart_type: ChartType = chart_type.parse()?;
        let kpi = resolve_kpi(self.planner.catalog(), kpi)?;
        self.fetch_chart(&kpi, window, chart_type, filter).await
    }

    pub async fn fetch_chart(
        &self,
        kpi: &Kpi,
        window: &TimeWindow,
        chart_type: ChartType,
        filter: Option<&EntityFilter>,
    ) -> GaugeResult<ReshapedSeries> {
        let request_id = uuid::Uuid::new_v4().to_string();
        info!(
            "Fetching {} chart data for kpi {} ({})",
            chart_type, kpi.id, request_id
        );

        let category = chart_type.category();
        let plan = self.planner.plan(kpi, window, chart_type, filter)?;
        if plan.is_empty() {
            debug!(
                "No entities or buckets selected for kpi {}, skipping {} call ({})",
                kpi.id,
                plan.route(),
                request_id
            );
            return Ok(ReshapedSeries::empty(category));
        }

        let rows = match plan {
            QueryPlan::Historical(query) => {
                let payload = self.historical.fetch(&query.to_text()?).await?;
                parse_historical_rows(&payload, &kpi.id)
            }
            QueryPlan::Calculation(requests) => {
                let payload = self.calculation.fetch(&requests).await?;
                parse_calculation_rows(&payload)
            }
        };

        let series = rows.and_then(|rows| reshape(&rows, category));
        recover_malformed(series, category, &request_id)
    }

    /// Fetches every chart independently; one chart failing does not stop
    /// the others. Outcomes come back in request order.
    pub async fn get_dashboard_data(&self, charts: Vec<ChartRequest>) -> Vec<ChartOutcome> {
        let mut tasks = Vec::with_capacity(charts.len());
        for chart in charts {
            let engine = self.clone();
            tasks.push(tokio::spawn(async move {
                let window = chart.window()?;
                engine
                    .get_chart_data(&chart.kpi, &window, &chart.chart_type, chart.filter.as_ref())
                    .await
            }));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (index, task) in tasks.into_iter().enumerate() {
            let outcome = match task.await {
                Ok(Ok(data)) => ChartOutcome::Ready { data },
                Ok(Err(e @ GaugeError::EntityNotFound { .. })) => {
                    warn!("Skipping chart {}: {}", index, e);
                    ChartOutcome::Skipped {
                        reason: e.to_string(),
                    }
                }
                Ok(Err(e)) => {
                    error!("Chart {} failed: {}", index, e);
                    ChartOutcome::Failed {
                        error: e.to_string(),
                    }
                }
                Err(e) => {
                    error!("Chart {} task failed: {}", index, e);
                    ChartOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

fn recover_malformed(
    series: GaugeResult<ReshapedSeries>,
    category: ChartCategory,
    request_id: &str,
) -> GaugeResult<ReshapedSeries> {
    match series {
        Err(GaugeError::MalformedResponse { message }) => {
            warn!("Discarding malformed response ({}): {}", request_id, message);
            Ok(ReshapedSeries::empty(category))
        }
        other => other,
    }
}
