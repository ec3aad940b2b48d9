use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use gauge::catalog::resolve_kpi;
use gauge::{ChartType, EntityFilter, GaugeConfig, GaugeError, GaugeResult, TimeWindow};

const USAGE: &str = "Usage: gauge-cli plan <kpi> <from> <to> <chart_type> [entity,...]";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("plan") => run_plan(&args[1..])?,
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
    Ok(())
}

/// Prints the backend request a chart would issue, without contacting any backend.
fn run_plan(args: &[String]) -> GaugeResult<()> {
    if args.len() < 4 {
        return Err(GaugeError::Config {
            message: USAGE.to_string(),
        });
    }

    let config = GaugeConfig::from_env();
    let planner = config.planner()?;

    let kpi = resolve_kpi(planner.catalog(), &args[0])?;
    let window = TimeWindow::new(parse_instant(&args[1])?, parse_instant(&args[2])?)?;
    let chart_type: ChartType = args[3].parse()?;
    let filter = args.get(4).map(|ids| {
        EntityFilter::ids(ids.split(',').map(str::trim).filter(|id| !id.is_empty()))
    });

    let plan = planner.plan(&kpi, &window, chart_type, filter.as_ref())?;

    println!("Route: {}", plan.route());
    println!("{}", serde_json::to_string_pretty(&plan)?);
    if let Some(sql) = plan.sql() {
        println!("\nSQL:\n{}", sql);
    }
    Ok(())
}

// RFC 3339 instant or a plain date at midnight UTC
fn parse_instant(value: &str) -> GaugeResult<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| GaugeError::Config {
            message: format!("Invalid date: {}", value),
        })
}
