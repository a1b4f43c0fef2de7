use crate::error::{Result, TsfoldError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    Expanding, // Training always starts at the first observation
    Fixed,     // Training keeps the last `min_train_size` periods
    Sliding,   // Same as Fixed
}

impl WindowType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "expanding" | "anchored" => Some(Self::Expanding),
            "fixed" => Some(Self::Fixed),
            "sliding" | "rolling" => Some(Self::Sliding),
            _ => None,
        }
    }

    pub fn is_expanding(&self) -> bool {
        matches!(self, Self::Expanding)
    }
}

/// Walk-forward configuration, fixed at bind time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldConfig {
    pub horizon: usize,
    pub n_folds: usize,
    pub window_type: WindowType,
    pub min_train_size: usize,
    pub gap: usize,
    pub embargo: usize,
    /// `None` selects the planner's own default.
    pub initial_train_size: Option<usize>,
    /// `None` means one horizon.
    pub skip_length: Option<usize>,
    pub clip_horizon: bool,
}

impl Default for FoldConfig {
    fn default() -> Self {
        Self {
            horizon: 1,
            n_folds: 5,
            window_type: WindowType::Expanding,
            min_train_size: 1,
            gap: 0,
            embargo: 0,
            initial_train_size: None,
            skip_length: None,
            clip_horizon: false,
        }
    }
}

impl FoldConfig {
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(TsfoldError::Configuration(
                "horizon must be at least 1".to_string(),
            ));
        }
        if self.n_folds == 0 {
            return Err(TsfoldError::Configuration(
                "n_folds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn skip(&self) -> usize {
        self.skip_length.filter(|s| *s > 0).unwrap_or(self.horizon)
    }

    pub fn initial_train_size(&self) -> Option<usize> {
        self.initial_train_size.filter(|s| *s > 0)
    }
}
