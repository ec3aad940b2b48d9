use thiserror::Error;

#[derive(Error, Debug)]
pub enum GaugeError {
    #[error("Unsupported chart type: {0}")]
    UnsupportedChartType(String),

    #[error("Unknown {kind}: {id}")]
    EntityNotFound { kind: &'static str, id: String },

    #[error("Invalid time window: from {from} is after to {to}")]
    InvalidTimeWindow { from: String, to: String },

    #[error("Invalid granularity: {0}")]
    InvalidGranularity(String),

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GaugeError {
    pub fn kpi_not_found(id: impl Into<String>) -> Self {
        GaugeError::EntityNotFound { kind: "kpi", id: id.into() }
    }

    pub fn entity_not_found(id: impl Into<String>) -> Self {
        GaugeError::EntityNotFound { kind: "entity", id: id.into() }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        GaugeError::MalformedResponse { message: message.into() }
    }
}

impl From<reqwest::Error> for GaugeError {
    fn from(err: reqwest::Error) -> Self {
        GaugeError::Transport {
            message: err.to_string(),
        }
    }
}

pub type GaugeResult<T> = Result<T, GaugeError>;
