use crate::model::ModelFailure;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TsfoldError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Invalid option '{key}': {reason}")]
    ConfigParse { key: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model error for {context}: {source}")]
    Model {
        context: String,
        #[source]
        source: ModelFailure,
    },

    #[error("Insufficient data for {key}: {reason}")]
    InsufficientData { key: String, reason: String },

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl TsfoldError {
    pub fn config_parse(key: impl Into<String>, reason: impl Into<String>) -> Self {
        TsfoldError::ConfigParse {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TsfoldError>;
