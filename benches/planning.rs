use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gauge::catalog::InMemoryCatalog;
use gauge::query::{sql, DemoCalendarMapper, QueryPlan};
use gauge::timeline::segment;
use gauge::{ChartType, Entity, EntityFilter, Granularity, Kpi, QueryPlanner, TimeWindow};
use std::sync::Arc;

fn plant_planner(machines: usize) -> QueryPlanner {
    let mut catalog = InMemoryCatalog::new();
    for i in 0..machines {
        let kind = if i % 2 == 0 { "Assembly" } else { "Laser" };
        catalog = catalog.with_entity(Entity::new(format!("machine-{}", i), kind));
    }
    QueryPlanner::new(Arc::new(catalog), Arc::new(DemoCalendarMapper::default()))
}

fn year_window() -> TimeWindow {
    TimeWindow::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
    )
    .unwrap()
}

fn benchmark_segmentation(c: &mut Criterion) {
    let window = year_window();

    c.bench_function("segment_year_daily", |b| {
        b.iter(|| black_box(segment(&window, Granularity::Day)))
    });

    c.bench_function("segment_year_monthly", |b| {
        b.iter(|| black_box(segment(&window, Granularity::Month)))
    });
}

fn benchmark_planning(c: &mut Criterion) {
    let planner = plant_planner(50);
    let window = year_window().with_granularity(Granularity::Day);
    let filter = EntityFilter::of_type("Assembly");

    c.bench_function("plan_historical_50_machines", |b| {
        let kpi = Kpi::new("energy_consumption_avg");
        b.iter(|| black_box(planner.plan(&kpi, &window, ChartType::Line, Some(&filter)).unwrap()))
    });

    // 366 days x 25 machines of calculation work items
    c.bench_function("plan_calculation_year_daily", |b| {
        let kpi = Kpi::new("oee");
        b.iter(|| black_box(planner.plan(&kpi, &window, ChartType::Line, Some(&filter)).unwrap()))
    });
}

fn benchmark_sql_compile(c: &mut Criterion) {
    let planner = plant_planner(200);
    let plan = planner
        .plan(&Kpi::new("cost_sum"), &year_window(), ChartType::Line, None)
        .unwrap();
    let query = match plan {
        QueryPlan::Historical(query) => query,
        QueryPlan::Calculation(_) => unreachable!("cost_sum is aggregatable"),
    };

    c.bench_function("compile_sql_200_machines", |b| {
        b.iter(|| black_box(sql::compile(&query)))
    });
}

criterion_group!(benches, benchmark_segmentation, benchmark_planning, benchmark_sql_compile);
criterion_main!(benches);
