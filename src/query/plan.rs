use crate::catalog::{resolve_entities, Catalog};
use crate::error::GaugeResult;
use crate::model::{ChartType, EntityFilter, Kpi, TimeWindow};
use crate::query::calculation::build_calculation_requests;
use crate::query::historical::build_structured_query;
use crate::query::{route, CalendarMapper, QueryPlan, QueryRoute};
use std::sync::Arc;
use tracing::debug;

/// Turns an analytic request into the single backend request that answers it.
#[derive(Clone)]
pub struct QueryPlanner {
    catalog: Arc<dyn Catalog>,
    calendar: Arc<dyn CalendarMapper>,
}

impl QueryPlanner {
    pub fn new(catalog: Arc<dyn Catalog>, calendar: Arc<dyn CalendarMapper>) -> Self {
        Self { catalog, calendar }
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    pub fn plan(
        &self,
        kpi: &Kpi,
        window: &TimeWindow,
        chart_type: ChartType,
        filter: Option<&EntityFilter>,
    ) -> GaugeResult<QueryPlan> {
        let entities = resolve_entities(self.catalog.as_ref(), filter)?;

        let plan = match route(kpi) {
            QueryRoute::Historical => QueryPlan::Historical(build_structured_query(
                kpi,
                window,
                chart_type,
                entities,
                self.calendar.as_ref(),
            )),
            QueryRoute::Calculation => QueryPlan::Calculation(build_calculation_requests(
                kpi,
                window,
                chart_type,
                &entities,
            )),
        };

        debug!("Planned {} query for kpi {} ({} chart)", plan.route(), kpi.id, chart_type);
        Ok(plan)
    }
}
