use crate::error::TsfoldError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Mae,
    Mse,
    Rmse,
    Mape,
    Smape,
    Bias,
    R2,
    Coverage,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::Mae,
        Metric::Mse,
        Metric::Rmse,
        Metric::Mape,
        Metric::Smape,
        Metric::Bias,
        Metric::R2,
        Metric::Coverage,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Mae => "mae",
            Metric::Mse => "mse",
            Metric::Rmse => "rmse",
            Metric::Mape => "mape",
            Metric::Smape => "smape",
            Metric::Bias => "bias",
            Metric::R2 => "r2",
            Metric::Coverage => "coverage",
        }
    }

    pub fn needs_interval(&self) -> bool {
        matches!(self, Metric::Coverage)
    }
}

impl Default for Metric {
    fn default() -> Self {
        Metric::Rmse
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = TsfoldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| {
                TsfoldError::config_parse(
                    "metric",
                    format!(
                        "unknown metric '{}', expected one of mae, mse, rmse, mape, smape, bias, r2, coverage",
                        s
                    ),
                )
            })
    }
}
