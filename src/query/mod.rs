pub mod calculation;
pub mod calendar;
pub mod historical;
pub mod plan;
pub mod router;
pub mod sql;

pub use calendar::{CalendarMapper, DemoCalendarMapper, IdentityCalendarMapper};
pub use plan::QueryPlanner;
pub use router::{route, route_by_identifier, QueryRoute};

use crate::error::GaugeResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMethod {
    Avg,
    Sum,
    Min,
    Max,
}

impl AggregationMethod {
    pub const ALL: [AggregationMethod; 4] = [
        AggregationMethod::Avg,
        AggregationMethod::Sum,
        AggregationMethod::Min,
        AggregationMethod::Max,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AggregationMethod::Avg => "avg",
            AggregationMethod::Sum => "sum",
            AggregationMethod::Min => "min",
            AggregationMethod::Max => "max",
        }
    }

    pub fn sql_function(self) -> &'static str {
        match self {
            AggregationMethod::Avg => "AVG",
            AggregationMethod::Sum => "SUM",
            AggregationMethod::Min => "MIN",
            AggregationMethod::Max => "MAX",
        }
    }

    /// Matches the last three characters of a KPI identifier, with no
    /// separator required (`"maxavg"` matches, `"avg_rate"` does not).
    pub fn from_trailing(kpi_id: &str) -> Option<Self> {
        let cut = kpi_id.len().checked_sub(3)?;
        let tail = kpi_id.get(cut..)?;
        Self::ALL.into_iter().find(|method| method.as_str() == tail)
    }

    /// Splits `energy_consumption_avg` into `("energy_consumption", Some(Avg))`.
    /// Identifiers without an `_<method>` suffix come back whole.
    pub fn split_kpi(kpi_id: &str) -> (&str, Option<Self>) {
        for method in Self::ALL {
            if let Some(base) = kpi_id
                .strip_suffix(method.as_str())
                .and_then(|rest| rest.strip_suffix('_'))
            {
                return (base, Some(method));
            }
        }
        (kpi_id, None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeframe {
    #[serde(rename = "start_date")]
    pub start: String,
    #[serde(rename = "end_date")]
    pub end: String,
}

/// Query sent to the historical store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredQuery {
    pub kpi: String,
    pub timeframe: Timeframe,
    #[serde(rename = "machines")]
    pub entities: Vec<String>,
    /// ISO-8601 period such as `P1D`; `None` for categorical charts.
    pub group_by: Option<String>,
}

impl StructuredQuery {
    pub fn to_text(&self) -> GaugeResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One atomic unit of work for the calculation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationRequest {
    #[serde(rename = "Date_Start")]
    pub period_start: String,
    #[serde(rename = "Date_Finish")]
    pub period_end: String,
    #[serde(rename = "Machine_Name")]
    pub entity: String,
    #[serde(rename = "KPI_Name")]
    pub kpi: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "route", content = "request", rename_all = "snake_case")]
pub enum QueryPlan {
    Historical(StructuredQuery),
    Calculation(Vec<CalculationRequest>),
}

impl QueryPlan {
    pub fn route(&self) -> QueryRoute {
        match self {
            QueryPlan::Historical(_) => QueryRoute::Historical,
            QueryPlan::Calculation(_) => QueryRoute::Calculation,
        }
    }

    /// True when the plan selects no entity, so no backend call is needed.
    pub fn is_empty(&self) -> bool {
        match self {
            QueryPlan::Historical(query) => query.entities.is_empty(),
            QueryPlan::Calculation(requests) => requests.is_empty(),
        }
    }

    /// SQL equivalent of a historical plan, for inspection only.
    pub fn sql(&self) -> Option<String> {
        match self {
            QueryPlan::Historical(query) => Some(sql::compile(query)),
            QueryPlan::Calculation(_) => None,
        }
    }
}
