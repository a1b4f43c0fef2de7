use super::traits::ConfigSection;
use crate::error::TsfoldError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    #[default]
    Backtest,
    Forecast,
    CvSplit,
    Metrics,
    Stats,
    Decomposition,
    FillGaps,
    CvFolds,
}

/// One operator run over one CSV input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub operator: OperatorKind,
    pub input: PathBuf,
    /// Columns in layout order: key(s), time, value(s). Empty keeps the file order.
    pub columns: Vec<String>,
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl ConfigSection for JobConfig {
    fn section_name() -> &'static str {
        "job"
    }

    fn validate(&self) -> Result<(), TsfoldError> {
        if self.input.as_os_str().is_empty() {
            return Err(TsfoldError::Configuration(
                "job.input must name a CSV file".to_string(),
            ));
        }
        if !self.columns.is_empty() && self.columns.len() < 3 {
            return Err(TsfoldError::Configuration(
                "job.columns needs at least a key, a time and a value column".to_string(),
            ));
        }
        Ok(())
    }
}
