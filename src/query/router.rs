use crate::model::Kpi;
use crate::query::AggregationMethod;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryRoute {
    /// The historical store aggregates this KPI natively.
    Historical,
    /// The request is decomposed into atomic calculation-engine requests.
    Calculation,
}

impl fmt::Display for QueryRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryRoute::Historical => f.write_str("historical"),
            QueryRoute::Calculation => f.write_str("calculation"),
        }
    }
}

/// Routes on the capability flag the catalog resolved for the KPI.
pub fn route(kpi: &Kpi) -> QueryRoute {
    if kpi.supports_direct_aggregation {
        QueryRoute::Historical
    } else {
        QueryRoute::Calculation
    }
}

/// Naming-convention routing for identifiers that never went through a
/// catalog: a trailing `avg`, `sum`, `min` or `max` selects the historical
/// store. Identifiers that merely end in those letters are routed the same
/// way.
pub fn route_by_identifier(kpi_id: &str) -> QueryRoute {
    match AggregationMethod::from_trailing(kpi_id) {
        Some(_) => QueryRoute::Historical,
        None => QueryRoute::Calculation,
    }
}
