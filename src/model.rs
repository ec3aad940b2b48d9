use crate::error::{GaugeError, GaugeResult};
use crate::query::AggregationMethod;
use crate::timeline::granularity::infer_unit;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ALL_ENTITY_TYPES: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hour,
    Day,
    Week,
    Month,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }
}

impl FromStr for Granularity {
    type Err = GaugeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" | "hours" => Ok(Granularity::Hour),
            "day" | "days" => Ok(Granularity::Day),
            "week" | "weeks" => Ok(Granularity::Week),
            "month" | "months" => Ok(Granularity::Month),
            other => Err(GaugeError::InvalidGranularity(other.to_string())),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed time range requested by the caller, with an optional bucket size.
///
/// `from <= to` is enforced at construction. Builders take `&TimeWindow` and
/// work on copies, so a window handed to the engine is never altered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeWindow {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    granularity: Option<Granularity>,
}

impl TimeWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> GaugeResult<Self> {
        if from > to {
            return Err(GaugeError::InvalidTimeWindow {
                from: format_timestamp(&from),
                to: format_timestamp(&to),
            });
        }
        Ok(Self {
            from,
            to,
            granularity: None,
        })
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = Some(granularity);
        self
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    pub fn granularity(&self) -> Option<Granularity> {
        self.granularity
    }

    /// Fractional number of days between `from` and `to`.
    pub fn duration_days(&self) -> f64 {
        (self.to - self.from).num_milliseconds() as f64 / MILLIS_PER_DAY
    }

    /// The caller's granularity if one was given, otherwise the inferred one.
    pub fn effective_unit(&self) -> Granularity {
        self.granularity.unwrap_or_else(|| infer_unit(self))
    }
}

pub(crate) const MILLIS_PER_DAY: f64 = 24.0 * 3600.0 * 1000.0;

/// Bucket timestamps are rendered like `2024-01-01T00:00:00.000Z`.
pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn format_date(instant: &DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kpi {
    pub id: String,
    pub supports_direct_aggregation: bool,
}

impl Kpi {
    /// Builds a KPI whose capability flag follows the aggregation-suffix
    /// naming convention (`*avg`, `*sum`, `*min`, `*max`).
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let supports_direct_aggregation = AggregationMethod::from_trailing(&id).is_some();
        Self {
            id,
            supports_direct_aggregation,
        }
    }

    pub fn with_direct_aggregation(id: impl Into<String>, supports: bool) -> Self {
        Self {
            id: id.into(),
            supports_direct_aggregation: supports,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
}

impl Entity {
    pub fn new(id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFilter {
    #[serde(default)]
    pub entity_ids: Vec<String>,
    #[serde(default = "default_entity_type")]
    pub entity_type: String,
}

fn default_entity_type() -> String {
    ALL_ENTITY_TYPES.to_string()
}

impl Default for EntityFilter {
    fn default() -> Self {
        Self {
            entity_ids: Vec::new(),
            entity_type: default_entity_type(),
        }
    }
}

impl EntityFilter {
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entity_ids: ids.into_iter().map(Into::into).collect(),
            entity_type: default_entity_type(),
        }
    }

    pub fn of_type(entity_type: impl Into<String>) -> Self {
        Self {
            entity_ids: Vec::new(),
            entity_type: entity_type.into(),
        }
    }

    pub fn restricts_type(&self) -> bool {
        self.entity_type != ALL_ENTITY_TYPES
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartCategory {
    TimeSeries,
    Categorical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Line,
    Scatter,
    Area,
    Barv,
    Barh,
    Pie,
    Donut,
    StackedBar,
    Hist,
}

impl ChartType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartType::Line => "line",
            ChartType::Scatter => "scatter",
            ChartType::Area => "area",
            ChartType::Barv => "barv",
            ChartType::Barh => "barh",
            ChartType::Pie => "pie",
            ChartType::Donut => "donut",
            ChartType::StackedBar => "stacked_bar",
            ChartType::Hist => "hist",
        }
    }

    pub fn category(self) -> ChartCategory {
        match self {
            ChartType::Line | ChartType::Scatter | ChartType::Area => ChartCategory::TimeSeries,
            _ => ChartCategory::Categorical,
        }
    }

    pub fn is_time_series(self) -> bool {
        self.category() == ChartCategory::TimeSeries
    }
}

impl FromStr for ChartType {
    type Err = GaugeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "line" => Ok(ChartType::Line),
            "scatter" => Ok(ChartType::Scatter),
            "area" => Ok(ChartType::Area),
            "barv" => Ok(ChartType::Barv),
            "barh" => Ok(ChartType::Barh),
            "pie" => Ok(ChartType::Pie),
            "donut" => Ok(ChartType::Donut),
            "stacked_bar" => Ok(ChartType::StackedBar),
            "hist" => Ok(ChartType::Hist),
            other => Err(GaugeError::UnsupportedChartType(other.to_string())),
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
