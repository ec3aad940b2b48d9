use crate::model::{format_date, ChartType, Kpi, TimeWindow};
use crate::query::{CalendarMapper, StructuredQuery, Timeframe};
use crate::timeline::select_group_by;

/// Builds the historical-store query for an already resolved entity list.
///
/// The window is remapped through `calendar` before formatting; the caller's
/// window is only read. Grouping is chosen from the remapped duration and is
/// omitted for categorical charts.
pub fn build_structured_query(
    kpi: &Kpi,
    window: &TimeWindow,
    chart_type: ChartType,
    entities: Vec<String>,
    calendar: &dyn CalendarMapper,
) -> StructuredQuery {
    let (from, to) = calendar.map(window.from(), window.to());

    let group_by = if chart_type.is_time_series() {
        Some(select_group_by(from, to).to_string())
    } else {
        None
    };

    StructuredQuery {
        kpi: kpi.id.clone(),
        timeframe: Timeframe {
            start: format_date(&from),
            end: format_date(&to),
        },
        entities,
        group_by,
    }
}
