use super::traits::ConfigSection;
use crate::engines::output::STANDARD_BATCH_CAPACITY;
use crate::error::TsfoldError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rows per input and output batch.
    pub batch_capacity: usize,
    /// Concurrent workers the local driver starts.
    pub workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_capacity: STANDARD_BATCH_CAPACITY,
            workers: 4,
        }
    }
}

impl ConfigSection for EngineConfig {
    fn section_name() -> &'static str {
        "engine"
    }

    fn validate(&self) -> Result<(), TsfoldError> {
        if self.batch_capacity == 0 {
            return Err(TsfoldError::Configuration(
                "batch_capacity must be > 0".to_string(),
            ));
        }
        if self.workers == 0 || self.workers > 256 {
            return Err(TsfoldError::Configuration(
                "workers must be between 1 and 256".to_string(),
            ));
        }
        Ok(())
    }
}
