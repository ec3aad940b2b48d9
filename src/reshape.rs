//! Long-to-wide reshaping of backend responses.
//!
//! Both backends answer with one row per (entity, bucket) observation but
//! name the fields differently. Each row kind exposes the same
//! [`Observation`] view, so the folding below never looks at which backend
//! produced the rows.

use crate::error::{GaugeError, GaugeResult};
use crate::model::ChartCategory;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Key holding the bucket in a serialised [`TimeBucket`]. No entity may use it.
pub const TIMESTAMP_KEY: &str = "timestamp";

pub trait Observation {
    /// Bucket the observation belongs to, if the row carries one.
    fn bucket(&self) -> Option<&str>;
    fn entity(&self) -> &str;
    fn value(&self) -> f64;
}

/// Historical store row: `{"timeframe": .., "name": .., "<kpi id>": ..}`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalRow {
    pub bucket: Option<String>,
    pub entity: String,
    pub value: f64,
}

impl HistoricalRow {
    /// A row without a numeric value for the KPI is an absent observation
    /// and yields `None`; only a row without an entity is malformed.
    pub fn parse(row: &Value, kpi_id: &str) -> GaugeResult<Option<Self>> {
        let object = row
            .as_object()
            .ok_or_else(|| GaugeError::malformed("historical row is not an object"))?;
        let entity = object
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| GaugeError::malformed("historical row has no entity name"))?;
        let value = match object.get(kpi_id).and_then(Value::as_f64) {
            Some(value) => value,
            None => {
                warn!("Skipping historical row for {} without a numeric {}", entity, kpi_id);
                return Ok(None);
            }
        };
        let bucket = match object.get("timeframe") {
            None | Some(Value::Null) => None,
            Some(Value::String(bucket)) => Some(bucket.clone()),
            Some(other) => Some(other.to_string()),
        };
        Ok(Some(Self {
            bucket,
            entity: entity.to_string(),
            value,
        }))
    }
}

impl Observation for HistoricalRow {
    fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    fn entity(&self) -> &str {
        &self.entity
    }

    fn value(&self) -> f64 {
        self.value
    }
}

/// Calculation engine row: `{"Date_Start": .., "Machine_Name": .., "Value": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRow {
    #[serde(rename = "Date_Start")]
    pub period_start: String,
    #[serde(rename = "Machine_Name")]
    pub entity_name: String,
    #[serde(rename = "Value")]
    pub value: f64,
}

// Per-item failures come back as a string in `Value`, so it is read loosely.
#[derive(Debug, Deserialize)]
struct CalculationRowWire {
    #[serde(rename = "Date_Start")]
    period_start: String,
    #[serde(rename = "Machine_Name")]
    entity_name: String,
    #[serde(rename = "Value", default)]
    value: Value,
}

impl CalculationRowWire {
    fn into_row(self) -> Option<CalculationRow> {
        match self.value.as_f64() {
            Some(value) => Some(CalculationRow {
                period_start: self.period_start,
                entity_name: self.entity_name,
                value,
            }),
            None => {
                warn!(
                    "Skipping calculation row for {} at {}: {}",
                    self.entity_name, self.period_start, self.value
                );
                None
            }
        }
    }
}

impl Observation for CalculationRow {
    fn bucket(&self) -> Option<&str> {
        Some(&self.period_start)
    }

    fn entity(&self) -> &str {
        &self.entity_name
    }

    fn value(&self) -> f64 {
        self.value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawResponseRow {
    Historical(HistoricalRow),
    Calculation(CalculationRow),
}

impl Observation for RawResponseRow {
    fn bucket(&self) -> Option<&str> {
        match self {
            RawResponseRow::Historical(row) => row.bucket(),
            RawResponseRow::Calculation(row) => row.bucket(),
        }
    }

    fn entity(&self) -> &str {
        match self {
            RawResponseRow::Historical(row) => row.entity(),
            RawResponseRow::Calculation(row) => row.entity(),
        }
    }

    fn value(&self) -> f64 {
        match self {
            RawResponseRow::Historical(row) => row.value(),
            RawResponseRow::Calculation(row) => row.value(),
        }
    }
}

pub fn parse_historical_rows(payload: &Value, kpi_id: &str) -> GaugeResult<Vec<RawResponseRow>> {
    rows_of(payload)?
        .iter()
        .filter_map(|row| HistoricalRow::parse(row, kpi_id).transpose())
        .map(|row| row.map(RawResponseRow::Historical))
        .collect()
}

pub fn parse_calculation_rows(payload: &Value) -> GaugeResult<Vec<RawResponseRow>> {
    rows_of(payload)?
        .iter()
        .filter_map(|row| match CalculationRowWire::deserialize(row) {
            Ok(wire) => wire.into_row().map(|row| Ok(RawResponseRow::Calculation(row))),
            Err(e) => Some(Err(GaugeError::malformed(format!("calculation row: {}", e)))),
        })
        .collect()
}

fn rows_of(payload: &Value) -> GaugeResult<&Vec<Value>> {
    payload.as_array().ok_or_else(|| {
        let kind = match payload {
            Value::Object(_) => "object",
            Value::String(_) => "string",
            Value::Null => "null",
            _ => "scalar",
        };
        GaugeError::malformed(format!("expected a list of rows, got {}", kind))
    })
}

/// One time bucket with one field per entity. Entities are flattened next
/// to [`TIMESTAMP_KEY`], which is therefore reserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBucket {
    pub timestamp: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryValue {
    pub name: String,
    pub value: f64,
}

/// Chart-ready data; serialises to a bare JSON array of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReshapedSeries {
    TimeSeries(Vec<TimeBucket>),
    Categorical(Vec<CategoryValue>),
}

impl ReshapedSeries {
    pub fn empty(category: ChartCategory) -> Self {
        match category {
            ChartCategory::TimeSeries => ReshapedSeries::TimeSeries(Vec::new()),
            ChartCategory::Categorical => ReshapedSeries::Categorical(Vec::new()),
        }
    }

    pub fn category(&self) -> ChartCategory {
        match self {
            ReshapedSeries::TimeSeries(_) => ChartCategory::TimeSeries,
            ReshapedSeries::Categorical(_) => ChartCategory::Categorical,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ReshapedSeries::TimeSeries(buckets) => buckets.len(),
            ReshapedSeries::Categorical(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn reshape<R: Observation>(rows: &[R], category: ChartCategory) -> GaugeResult<ReshapedSeries> {
    match category {
        ChartCategory::TimeSeries => fold_time_series(rows).map(ReshapedSeries::TimeSeries),
        ChartCategory::Categorical => Ok(ReshapedSeries::Categorical(to_categories(rows))),
    }
}

/// Folds long rows into one record per bucket, in order of first appearance.
/// An (entity, bucket) pair with no row stays absent; a repeated pair keeps
/// the last value. Rows for an entity named [`TIMESTAMP_KEY`] are dropped.
pub fn fold_time_series<R: Observation>(rows: &[R]) -> GaugeResult<Vec<TimeBucket>> {
    let mut buckets: Vec<TimeBucket> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let timestamp = row.bucket().ok_or_else(|| {
            GaugeError::malformed(format!("row for {} has no time bucket", row.entity()))
        })?;
        if row.entity() == TIMESTAMP_KEY {
            warn!("Dropping row for reserved entity id {:?} at {}", TIMESTAMP_KEY, timestamp);
            continue;
        }
        let slot = match index.get(timestamp) {
            Some(&slot) => slot,
            None => {
                index.insert(timestamp.to_string(), buckets.len());
                buckets.push(TimeBucket {
                    timestamp: timestamp.to_string(),
                    values: BTreeMap::new(),
                });
                buckets.len() - 1
            }
        };
        buckets[slot].values.insert(row.entity().to_string(), row.value());
    }

    Ok(buckets)
}

pub fn to_categories<R: Observation>(rows: &[R]) -> Vec<CategoryValue> {
    rows.iter()
        .map(|row| CategoryValue {
            name: row.entity().to_string(),
            value: row.value(),
        })
        .collect()
}
