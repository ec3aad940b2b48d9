use crate::model::{format_date, format_timestamp, ChartType, Kpi, TimeWindow};
use crate::query::CalculationRequest;
use crate::timeline::segment;

/// Decomposes a request into calculation-engine work items.
///
/// Time-series charts get one item per (bucket, entity), ordered by bucket
/// then entity, with `period_start == period_end == bucket`. Categorical
/// charts get one item per entity spanning the whole window. No calendar
/// remapping is applied on this path.
pub fn build_calculation_requests(
    kpi: &Kpi,
    window: &TimeWindow,
    chart_type: ChartType,
    entities: &[String],
) -> Vec<CalculationRequest> {
    if chart_type.is_time_series() {
        let buckets = segment(window, window.effective_unit());
        let mut requests = Vec::with_capacity(buckets.len() * entities.len());
        for bucket in &buckets {
            let period = format_timestamp(bucket);
            for entity in entities {
                requests.push(CalculationRequest {
                    period_start: period.clone(),
                    period_end: period.clone(),
                    entity: entity.clone(),
                    kpi: kpi.id.clone(),
                });
            }
        }
        return requests;
    }

    let start = format_date(&window.from());
    let end = format_date(&window.to());
    entities
        .iter()
        .map(|entity| CalculationRequest {
            period_start: start.clone(),
            period_end: end.clone(),
            entity: entity.clone(),
            kpi: kpi.id.clone(),
        })
        .collect()
}
