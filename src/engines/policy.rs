use crate::error::{Result, TsfoldError};
use crate::model::{ModelErrorCode, ModelFailure};
use crate::types::SeriesKey;
use serde::{Deserialize, Serialize};

/// What to do with an entity that has too few observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsufficientDataPolicy {
    #[default]
    Fail,
    Skip,
    Pad,
}

impl InsufficientDataPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fail" | "error" => Some(Self::Fail),
            "skip" => Some(Self::Skip),
            "pad" => Some(Self::Pad),
            _ => None,
        }
    }

    /// Single dispatch point: fail the execution, omit the entity, or emit
    /// the degraded rows produced by `pad`.
    pub fn apply<R>(
        self,
        key: &SeriesKey,
        reason: &str,
        pad: impl FnOnce() -> Result<Vec<R>>,
    ) -> Result<Vec<R>> {
        match self {
            Self::Fail => Err(TsfoldError::InsufficientData {
                key: key.to_string(),
                reason: reason.to_string(),
            }),
            Self::Skip => {
                log::warn!("skipping {}: {}", key, reason);
                Ok(Vec::new())
            }
            Self::Pad => {
                log::debug!("padding {}: {}", key, reason);
                pad()
            }
        }
    }
}

/// How a model failure affects the execution.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureAction {
    /// Leave this group or fold out and keep going.
    Skip,
    /// Route through the insufficient-data policy.
    Insufficient(String),
}

/// Configuration failures abort the execution; everything else is decided
/// per group.
pub fn triage(context: &str, failure: ModelFailure) -> Result<FailureAction> {
    if failure.is_configuration_error() {
        return Err(TsfoldError::Model {
            context: context.to_string(),
            source: failure,
        });
    }
    if failure.code == ModelErrorCode::InsufficientData {
        return Ok(FailureAction::Insufficient(failure.message));
    }
    log::warn!("{}: model failed, skipping ({})", context, failure);
    Ok(FailureAction::Skip)
}
