use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use gauge::{
    catalog::resolve_kpi, ChartDataEngine, ChartOutcome, ChartRequest, ChartType, GaugeConfig,
    GaugeError, QueryPlan, ReshapedSeries,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

type AppState = Arc<ChartDataEngine>;

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Deserialize)]
struct DashboardRequest {
    charts: Vec<ChartRequest>,
}

#[derive(Debug, Serialize)]
struct DashboardResponse {
    charts: Vec<ChartOutcome>,
}

#[derive(Debug, Serialize)]
struct PlanResponse {
    plan: QueryPlan,
    sql: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting gauge chart data server");

    let config = GaugeConfig::from_env();
    info!("Historical store: {}", config.historical_store_url);
    info!("Calculation engine: {}", config.calculation_engine_url);
    info!("Demo calendar: {}", config.demo_calendar);

    let engine = Arc::new(config.engine()?);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/chart-data", post(chart_data))
        .route("/dashboard", post(dashboard))
        .route("/plan", post(plan))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(engine);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Server listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn chart_data(
    State(engine): State<AppState>,
    Json(request): Json<ChartRequest>,
) -> Result<Json<ReshapedSeries>, ApiError> {
    let window = request.window().map_err(api_error)?;
    engine
        .get_chart_data(&request.kpi, &window, &request.chart_type, request.filter.as_ref())
        .await
        .map(Json)
        .map_err(api_error)
}

async fn dashboard(
    State(engine): State<AppState>,
    Json(request): Json<DashboardRequest>,
) -> Json<DashboardResponse> {
    let charts = engine.get_dashboard_data(request.charts).await;
    Json(DashboardResponse { charts })
}

async fn plan(
    State(engine): State<AppState>,
    Json(request): Json<ChartRequest>,
) -> Result<Json<PlanResponse>, ApiError> {
    let window = request.window().map_err(api_error)?;
    let chart_type: ChartType = request.chart_type.parse().map_err(api_error)?;
    let planner = engine.planner();
    let kpi = resolve_kpi(planner.catalog(), &request.kpi).map_err(api_error)?;
    let plan = planner
        .plan(&kpi, &window, chart_type, request.filter.as_ref())
        .map_err(api_error)?;
    let sql = plan.sql();
    Ok(Json(PlanResponse { plan, sql }))
}

fn api_error(e: GaugeError) -> ApiError {
    let status = match &e {
        GaugeError::UnsupportedChartType(_)
        | GaugeError::InvalidTimeWindow { .. }
        | GaugeError::InvalidGranularity(_) => StatusCode::BAD_REQUEST,
        GaugeError::EntityNotFound { .. } => StatusCode::NOT_FOUND,
        GaugeError::Transport { .. } | GaugeError::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("Request failed: {}", e);
    } else {
        warn!("Rejected request: {}", e);
    }

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}
