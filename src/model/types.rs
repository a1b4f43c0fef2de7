use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Packed validity bitmap, 64 rows per word, least significant bit first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityMask {
    words: Vec<u64>,
    len: usize,
}

impl ValidityMask {
    pub fn from_flags(flags: &[bool]) -> Self {
        let mut words = vec![0u64; flags.len().div_ceil(64)];
        for (i, &valid) in flags.iter().enumerate() {
            if valid {
                words[i / 64] |= 1u64 << (i % 64);
            }
        }
        Self {
            words,
            len: flags.len(),
        }
    }

    /// Returns `None` when every flag is set, so callers can skip the mask.
    pub fn from_flags_if_sparse(flags: &[bool]) -> Option<Self> {
        if flags.iter().all(|&v| v) {
            None
        } else {
            Some(Self::from_flags(flags))
        }
    }

    pub fn is_valid(&self, index: usize) -> bool {
        index < self.len && (self.words[index / 64] >> (index % 64)) & 1 == 1
    }

    pub fn count_valid(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOptions {
    pub method: String,
    pub model_spec: Option<String>,
    pub horizon: usize,
    pub confidence_level: f64,
    /// 0 means unknown; see `auto_detect_seasonality`.
    pub seasonal_period: usize,
    pub auto_detect_seasonality: bool,
    pub include_fitted: bool,
    pub include_residuals: bool,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            method: "Naive".to_string(),
            model_spec: None,
            horizon: 1,
            confidence_level: 0.90,
            seasonal_period: 0,
            auto_detect_seasonality: true,
            include_fitted: false,
            include_residuals: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
    pub mse: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    pub point: Vec<f64>,
    pub lower: Option<Vec<f64>>,
    pub upper: Option<Vec<f64>>,
    pub fitted: Option<Vec<f64>>,
    pub residuals: Option<Vec<f64>>,
    pub metadata: ModelMetadata,
}

impl ModelOutput {
    /// Interval bounds for step `h`, only when both sides exist.
    pub fn interval_at(&self, h: usize) -> (Option<f64>, Option<f64>) {
        let lower = self.lower.as_ref().and_then(|l| l.get(h).copied());
        let upper = self.upper.as_ref().and_then(|u| u.get(h).copied());
        match (lower, upper) {
            (Some(l), Some(u)) => (Some(l), Some(u)),
            _ => (None, None),
        }
    }
}

/// Additive split of a series into trend, one seasonal cycle and remainder.
/// Every component is aligned with the observed values passed in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    pub trend: Vec<f64>,
    /// `None` when no seasonal cycle was extracted.
    pub seasonal: Option<Vec<f64>>,
    pub period: Option<usize>,
    pub remainder: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelErrorCode {
    InvalidInput,
    InvalidModel,
    InsufficientData,
    Computation,
}

impl fmt::Display for ModelErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelErrorCode::InvalidInput => "invalid input",
            ModelErrorCode::InvalidModel => "invalid model",
            ModelErrorCode::InsufficientData => "insufficient data",
            ModelErrorCode::Computation => "computation failed",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{code}: {message}")]
pub struct ModelFailure {
    pub code: ModelErrorCode,
    pub message: String,
}

impl ModelFailure {
    pub fn new(code: ModelErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Failures caused by the user's model configuration rather than the data.
    pub fn is_configuration_error(&self) -> bool {
        self.code == ModelErrorCode::InvalidModel
    }
}

/// Black-box numeric engine. Implementations must be callable from any
/// worker thread.
pub trait Model: Send + Sync {
    fn forecast(
        &self,
        values: &[f64],
        validity: Option<&ValidityMask>,
        options: &ModelOptions,
    ) -> Result<ModelOutput, ModelFailure>;

    /// Seasonal-trend decomposition. `options.seasonal_period` fixes the
    /// cycle; 0 with auto detection off asks for the trend alone.
    fn decompose(
        &self,
        _values: &[f64],
        _validity: Option<&ValidityMask>,
        _options: &ModelOptions,
    ) -> Result<Decomposition, ModelFailure> {
        Err(ModelFailure::new(
            ModelErrorCode::InvalidModel,
            "this model does not decompose series",
        ))
    }
}
