use chrono::{TimeZone, Utc};
use gauge::backend::{MockCalculationEngine, MockHistoricalStore};
use gauge::catalog::{Catalog, InMemoryCatalog};
use gauge::model::format_timestamp;
use gauge::query::{DemoCalendarMapper, IdentityCalendarMapper, QueryRoute};
use gauge::reshape::{CategoryValue, ReshapedSeries};
use gauge::timeline::segment;
use gauge::{
    ChartDataEngine, ChartOutcome, ChartRequest, Entity, EntityFilter, GaugeConfig, GaugeError,
    Granularity, Kpi, QueryPlanner, TimeWindow,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

fn plant_catalog() -> InMemoryCatalog {
    InMemoryCatalog::new()
        .with_kpi(Kpi::new("energy_consumption_avg"))
        .with_kpi(Kpi::new("oee"))
        .with_entity(Entity::new("m1", "Assembly"))
        .with_entity(Entity::new("m2", "Assembly"))
        .with_entity(Entity::new("m3", "Laser"))
}

fn build_engine(
    catalog: impl Catalog + 'static,
    historical: MockHistoricalStore,
    calculation: MockCalculationEngine,
) -> ChartDataEngine {
    let planner = QueryPlanner::new(Arc::new(catalog), Arc::new(DemoCalendarMapper::default()));
    ChartDataEngine::new(planner, Arc::new(historical), Arc::new(calculation))
}

fn january_window() -> TimeWindow {
    TimeWindow::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_historical_line_chart_end_to_end() {
    let historical = MockHistoricalStore::returning(json!([
        {"timeframe": "2024-04-01", "name": "m1", "energy_consumption_avg": 10.0},
        {"timeframe": "2024-04-01", "name": "m2", "energy_consumption_avg": 11.0},
        {"timeframe": "2024-04-02", "name": "m1", "energy_consumption_avg": 12.0},
        {"timeframe": "2024-04-02", "name": "m2", "energy_consumption_avg": 13.0},
        {"timeframe": "2024-04-03", "name": "m1", "energy_consumption_avg": 14.0},
        {"timeframe": "2024-04-03", "name": "m2", "energy_consumption_avg": 15.0},
    ]));
    let calculation = MockCalculationEngine::echoing();
    let engine = build_engine(plant_catalog(), historical.clone(), calculation.clone());

    let filter = EntityFilter::ids(["m1", "m2"]);
    let series = engine
        .get_chart_data("energy_consumption_avg", &january_window(), "line", Some(&filter))
        .await
        .unwrap();

    let buckets = match series {
        ReshapedSeries::TimeSeries(buckets) => buckets,
        other => panic!("Expected time series, got {:?}", other),
    };
    assert_eq!(buckets.len(), 3);
    assert_eq!(buckets[0].timestamp, "2024-04-01");
    assert_eq!(buckets[2].values["m2"], 15.0);
    assert!(buckets.iter().all(|b| b.values.len() == 2));

    // Exactly one historical call and no calculation traffic
    let queries = historical.queries();
    assert_eq!(queries.len(), 1);
    assert!(calculation.batches().is_empty());

    let sent: Value = serde_json::from_str(&queries[0]).unwrap();
    assert_eq!(sent["kpi"], "energy_consumption_avg");
    assert_eq!(sent["timeframe"]["start_date"], "2024-04-01");
    assert_eq!(sent["timeframe"]["end_date"], "2024-04-03");
    assert_eq!(sent["machines"], json!(["m1", "m2"]));
    assert_eq!(sent["group_by"], "P1D");
}

#[tokio::test]
async fn test_calculation_buckets_match_segmentation() {
    let calculation = MockCalculationEngine::echoing();
    let engine = build_engine(
        plant_catalog(),
        MockHistoricalStore::returning(json!([])),
        calculation.clone(),
    );

    let window = TimeWindow::new(
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 2, 22, 0, 0, 0).unwrap(),
    )
    .unwrap()
    .with_granularity(Granularity::Week);

    let filter = EntityFilter::of_type("Assembly");
    let series = engine
        .get_chart_data("oee", &window, "area", Some(&filter))
        .await
        .unwrap();

    let expected: Vec<String> = segment(&window, Granularity::Week)
        .iter()
        .map(format_timestamp)
        .collect();
    assert_eq!(expected.len(), 4);

    match series {
        ReshapedSeries::TimeSeries(buckets) => {
            let timestamps: Vec<String> = buckets.iter().map(|b| b.timestamp.clone()).collect();
            assert_eq!(timestamps, expected);
            assert!(buckets.iter().all(|b| b.values.contains_key("m1") && b.values.contains_key("m2")));
        }
        other => panic!("Expected time series, got {:?}", other),
    }

    let batches = calculation.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 8);
}

#[tokio::test]
async fn test_categorical_chart_keeps_one_value_per_entity() {
    let calculation = MockCalculationEngine::echoing();
    let engine = build_engine(
        plant_catalog(),
        MockHistoricalStore::returning(json!([])),
        calculation.clone(),
    );

    let series = engine
        .get_chart_data("oee", &january_window(), "barv", None)
        .await
        .unwrap();

    assert_eq!(
        series,
        ReshapedSeries::Categorical(vec![
            CategoryValue { name: "m1".to_string(), value: 0.0 },
            CategoryValue { name: "m2".to_string(), value: 1.0 },
            CategoryValue { name: "m3".to_string(), value: 2.0 },
        ])
    );

    let batch = &calculation.batches()[0];
    assert!(batch.iter().all(|r| r.period_start == "2024-01-01" && r.period_end == "2024-01-03"));
}

#[tokio::test]
async fn test_transport_failure_reaches_caller() {
    let engine = build_engine(
        plant_catalog(),
        MockHistoricalStore::failing("connection refused"),
        MockCalculationEngine::echoing(),
    );

    let result = engine
        .get_chart_data("energy_consumption_avg", &january_window(), "scatter", None)
        .await;
    assert!(matches!(result, Err(GaugeError::Transport { .. })));
}

#[tokio::test]
async fn test_failed_calculation_item_keeps_valid_values() {
    let calculation = MockCalculationEngine::returning(json!([
        {"Date_Start": "2024-01-01T00:00:00.000Z", "Machine_Name": "m1", "Value": 0.9},
        {"Date_Start": "2024-01-01T00:00:00.000Z", "Machine_Name": "m2", "Value": "Error: tried to divide by zero"},
        {"Date_Start": "2024-01-02T00:00:00.000Z", "Machine_Name": "m1", "Value": 0.8},
        {"Date_Start": "2024-01-02T00:00:00.000Z", "Machine_Name": "m2", "Value": 0.7},
    ]));
    let engine = build_engine(plant_catalog(), MockHistoricalStore::returning(json!([])), calculation);

    let filter = EntityFilter::ids(["m1", "m2"]);
    let series = engine
        .get_chart_data("oee", &january_window(), "line", Some(&filter))
        .await
        .unwrap();

    let buckets = match series {
        ReshapedSeries::TimeSeries(buckets) => buckets,
        other => panic!("Expected time series, got {:?}", other),
    };
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].values.get("m1"), Some(&0.9));
    assert!(!buckets[0].values.contains_key("m2"));
    assert_eq!(buckets[1].values.get("m2"), Some(&0.7));
}

#[tokio::test]
async fn test_rows_without_value_are_left_out() {
    let historical = MockHistoricalStore::returning(json!([
        {"timeframe": "2024-04-01", "name": "m1"},
    ]));
    let engine = build_engine(plant_catalog(), historical, MockCalculationEngine::echoing());

    let series = engine
        .get_chart_data("energy_consumption_avg", &january_window(), "donut", None)
        .await
        .unwrap();
    assert_eq!(series, ReshapedSeries::Categorical(Vec::new()));
}

#[tokio::test]
async fn test_unknown_entity_is_rejected_before_any_call() {
    let historical = MockHistoricalStore::returning(json!([]));
    let engine = build_engine(plant_catalog(), historical.clone(), MockCalculationEngine::echoing());

    let filter = EntityFilter::ids(["m1", "m42"]);
    let result = engine
        .get_chart_data("energy_consumption_avg", &january_window(), "line", Some(&filter))
        .await;

    assert!(matches!(result, Err(GaugeError::EntityNotFound { kind: "entity", .. })));
    assert!(historical.queries().is_empty());
}

#[tokio::test]
async fn test_dashboard_from_json_requests() {
    let historical = MockHistoricalStore::returning(json!([
        {"name": "m1", "energy_consumption_avg": 3.5},
        {"name": "m2", "energy_consumption_avg": 4.5},
    ]));
    let engine = build_engine(plant_catalog(), historical, MockCalculationEngine::echoing());

    let charts: Vec<ChartRequest> = serde_json::from_value(json!([
        {
            "kpi": "energy_consumption_avg",
            "from": "2024-01-01T00:00:00Z",
            "to": "2024-01-03T00:00:00Z",
            "chart_type": "pie",
            "filter": {"entity_ids": ["m1", "m2"]}
        },
        {
            "kpi": "oee",
            "from": "2024-01-01T00:00:00Z",
            "to": "2024-01-03T00:00:00Z",
            "granularity": "day",
            "chart_type": "line",
            "filter": {"entity_type": "Laser"}
        },
        {
            "kpi": "oee",
            "from": "2024-01-05T00:00:00Z",
            "to": "2024-01-03T00:00:00Z",
            "chart_type": "line"
        },
        {
            "kpi": "oee",
            "from": "2024-01-01T00:00:00Z",
            "to": "2024-01-03T00:00:00Z",
            "chart_type": "line",
            "filter": {"entity_ids": ["nope"]}
        }
    ]))
    .unwrap();

    let outcomes = engine.get_dashboard_data(charts).await;
    assert_eq!(outcomes.len(), 4);
    assert!(matches!(&outcomes[0], ChartOutcome::Ready { data } if data.len() == 2));
    assert!(matches!(&outcomes[1], ChartOutcome::Ready { data } if data.len() == 3));
    assert!(matches!(&outcomes[2], ChartOutcome::Failed { .. }));
    assert!(matches!(&outcomes[3], ChartOutcome::Skipped { .. }));

    let rendered = serde_json::to_value(&outcomes[0]).unwrap();
    assert_eq!(rendered["status"], "ready");
    assert_eq!(rendered["data"][0], json!({"name": "m1", "value": 3.5}));
}

#[test]
fn test_catalog_file_drives_routing() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("catalog.json");
    std::fs::write(
        &path,
        json!({
            "kpis": [
                {"id": "throughput", "supports_direct_aggregation": true},
                {"id": "cycle_time_avg", "supports_direct_aggregation": false},
                {"id": "idle_time_sum"}
            ],
            "entities": [
                {"id": "press-1", "type": "Press"},
                {"id": "laser-1", "type": "Laser"}
            ]
        })
        .to_string(),
    )
    .unwrap();

    let config = GaugeConfig {
        catalog_path: Some(path.to_string_lossy().to_string()),
        demo_calendar: false,
        ..GaugeConfig::default()
    };
    let planner = config.planner().unwrap();
    let catalog = planner.catalog();

    let window = january_window();
    let filter = EntityFilter::of_type("Press");
    let route_of = |id: &str| {
        let kpi = catalog.find_kpi(id).unwrap();
        planner
            .plan(&kpi, &window, gauge::ChartType::Line, Some(&filter))
            .unwrap()
            .route()
    };

    assert_eq!(route_of("throughput"), QueryRoute::Historical);
    assert_eq!(route_of("cycle_time_avg"), QueryRoute::Calculation);
    assert_eq!(route_of("idle_time_sum"), QueryRoute::Historical);
    assert!(catalog.find_kpi("unlisted_avg").is_none());

    let kpi = catalog.find_kpi("throughput").unwrap();
    let sql = planner
        .plan(&kpi, &window, gauge::ChartType::Line, Some(&filter))
        .unwrap()
        .sql()
        .unwrap();
    assert!(sql.contains("name IN ('press-1')"));
    assert!(sql.contains("BETWEEN '2024-01-01' AND '2024-01-03'"));
}

#[test]
fn test_identity_calendar_leaves_window_alone() {
    let planner = QueryPlanner::new(
        Arc::new(InMemoryCatalog::lenient()),
        Arc::new(IdentityCalendarMapper),
    );
    let filter = EntityFilter::ids(["press-7"]);
    let plan = planner
        .plan(&Kpi::new("scrap_sum"), &january_window(), gauge::ChartType::Hist, Some(&filter))
        .unwrap();
    let rendered = serde_json::to_value(&plan).unwrap();
    assert_eq!(rendered["route"], "historical");
    assert_eq!(rendered["request"]["timeframe"]["start_date"], "2024-01-01");
    assert_eq!(rendered["request"]["machines"], json!(["press-7"]));
}

#[tokio::test]
async fn test_filter_selecting_no_entity_returns_nothing() {
    let historical = MockHistoricalStore::returning(json!([
        {"timeframe": "2024-04-01", "name": "m1", "energy_consumption_avg": 10.0},
    ]));
    let calculation = MockCalculationEngine::echoing();
    let catalog = InMemoryCatalog::new()
        .with_kpi(Kpi::new("energy_consumption_avg"))
        .with_kpi(Kpi::new("oee"))
        .with_entity(Entity::new("m1", "Assembly"))
        .with_entity(Entity::new("m2", "Assembly"));
    let engine = build_engine(catalog, historical.clone(), calculation.clone());
    let filter = EntityFilter::of_type("Laser");

    let plan = engine
        .planner()
        .plan(&Kpi::new("energy_consumption_avg"), &january_window(), gauge::ChartType::Line, Some(&filter))
        .unwrap();
    assert!(plan.is_empty());
    assert!(plan.sql().unwrap().contains("1 = 0"));

    let historical_series = engine
        .get_chart_data("energy_consumption_avg", &january_window(), "line", Some(&filter))
        .await
        .unwrap();
    let calculation_series = engine
        .get_chart_data("oee", &january_window(), "line", Some(&filter))
        .await
        .unwrap();

    assert!(historical_series.is_empty());
    assert!(calculation_series.is_empty());
    assert!(historical.queries().is_empty());
    assert!(calculation.batches().is_empty());
}
