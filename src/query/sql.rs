//! SQL rendering of a [`StructuredQuery`].
//!
//! Used to check what the historical store is being asked for; nothing here
//! executes the statement.

use crate::query::{AggregationMethod, StructuredQuery};

pub const TABLE: &str = "\"timeseries\"";
pub const TIME_COLUMN: &str = "__time";
pub const ENTITY_COLUMN: &str = "name";
pub const KPI_COLUMN: &str = "kpi";
pub const TIME_BUCKET_ALIAS: &str = "time_period";

pub fn compile(query: &StructuredQuery) -> String {
    let (kpi_name, method) = AggregationMethod::split_kpi(&query.kpi);
    let time_bucket = query.group_by.as_deref().map(truncate_expr);

    let mut columns = Vec::with_capacity(3);
    if let Some(bucket) = &time_bucket {
        columns.push(format!("{} AS {}", bucket, TIME_BUCKET_ALIAS));
    }
    columns.push(ENTITY_COLUMN.to_string());
    if let Some(method) = method {
        columns.push(format!(
            "{}(\"{}\") AS {}",
            method.sql_function(),
            method.as_str(),
            query.kpi
        ));
    }

    let mut sql = format!("SELECT {} FROM {}", columns.join(", "), TABLE);

    let mut conditions = Vec::with_capacity(3);
    conditions.push(format!(
        "{} BETWEEN {} AND {}",
        TIME_COLUMN,
        quote(&query.timeframe.start),
        quote(&query.timeframe.end)
    ));
    if query.entities.is_empty() {
        // An empty selection matches no row rather than every entity
        conditions.push("1 = 0".to_string());
    } else {
        let entities: Vec<String> = query.entities.iter().map(|e| quote(e)).collect();
        conditions.push(format!("{} IN ({})", ENTITY_COLUMN, entities.join(", ")));
    }
    conditions.push(format!("{} = {}", KPI_COLUMN, quote(kpi_name)));
    sql.push_str(" WHERE ");
    sql.push_str(&conditions.join(" AND "));

    let mut group_by = Vec::with_capacity(2);
    if let Some(bucket) = &time_bucket {
        group_by.push(bucket.clone());
    }
    group_by.push(ENTITY_COLUMN.to_string());
    sql.push_str(" GROUP BY ");
    sql.push_str(&group_by.join(", "));

    if time_bucket.is_some() {
        sql.push_str(" ORDER BY ");
        sql.push_str(TIME_BUCKET_ALIAS);
    }

    sql
}

fn truncate_expr(period: &str) -> String {
    format!("DATE_TRUNC({}, {})", quote(truncation_unit(period)), TIME_COLUMN)
}

fn truncation_unit(period: &str) -> &str {
    match period {
        "P1H" => "hour",
        "P1D" => "day",
        "P1W" => "week",
        "P1M" => "month",
        other => other,
    }
}

fn quote(literal: &str) -> String {
    format!("'{}'", literal.replace('\'', "''"))
}
