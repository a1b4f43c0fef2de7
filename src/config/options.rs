use crate::data::Frequency;
use crate::engines::folds::{FoldConfig, WindowType};
use crate::engines::metrics::Metric;
use crate::engines::policy::InsufficientDataPolicy;
use crate::error::{Result, TsfoldError};
use crate::model::ModelOptions;
use serde_json::{Map, Value};

pub const RECOGNIZED_KEYS: &[&str] = &[
    "method",
    "model",
    "window_type",
    "min_train_size",
    "gap",
    "embargo",
    "initial_train_size",
    "skip_length",
    "clip_horizon",
    "metric",
    "seasonal_period",
    "confidence_level",
    "horizon",
    "n_folds",
    "frequency",
    "insufficient_data",
    "fill_until",
];

const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.90;

/// Key/value options as handed over at bind. Keys are case-insensitive;
/// malformed values fall back to their defaults except where noted.
#[derive(Debug, Clone, Default)]
pub struct OperatorOptions {
    entries: Map<String, Value>,
}

impl OperatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self::from_map(map)),
            Value::Null => Ok(Self::new()),
            other => Err(TsfoldError::config_parse(
                "options",
                format!("expected an object, got {}", other),
            )),
        }
    }

    pub fn from_map(map: &Map<String, Value>) -> Self {
        let mut options = Self::new();
        for (key, value) in map {
            options.insert(key, value.clone());
        }
        options
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut options = Self::new();
        for (key, value) in pairs {
            options.insert(key.as_ref(), Value::String(value.into()));
        }
        options
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value.into());
        self
    }

    fn insert(&mut self, key: &str, value: Value) {
        let key = key.trim().to_ascii_lowercase();
        if !RECOGNIZED_KEYS.contains(&key.as_str()) {
            log::debug!("ignoring unrecognized option '{}'", key);
            return;
        }
        self.entries.insert(key, value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.entries.get(key)? {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        let value = self.entries.get(key)?;
        let parsed = match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        if parsed.is_none() {
            log::debug!("option '{}' is not an integer ({}), using default", key, value);
        }
        parsed
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        let value = self.entries.get(key)?;
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        if parsed.is_none() {
            log::debug!("option '{}' is not a number ({}), using default", key, value);
        }
        parsed
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.entries.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().map_or(default, |v| v != 0),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                _ => {
                    log::debug!("option '{}' is not a boolean ('{}'), using default", key, s);
                    default
                }
            },
            _ => default,
        }
    }

    /// Non-negative integer, or `default` when missing or malformed.
    pub fn get_usize(&self, key: &str, default: usize) -> usize {
        match self.get_i64(key) {
            Some(v) if v >= 0 => v as usize,
            Some(v) => {
                log::debug!("option '{}' is negative ({}), using default", key, v);
                default
            }
            None => default,
        }
    }

    /// Positive integer, or `None` for "auto", non-positive or malformed values.
    pub fn get_auto(&self, key: &str) -> Option<usize> {
        if self
            .get_str(key)
            .is_some_and(|s| s.eq_ignore_ascii_case("auto"))
        {
            return None;
        }
        self.get_i64(key).filter(|v| *v > 0).map(|v| v as usize)
    }

    pub fn fold_config(&self) -> Result<FoldConfig> {
        let defaults = FoldConfig::default();
        let window_type = match self.get_str("window_type") {
            Some(raw) => WindowType::parse(&raw).unwrap_or_else(|| {
                log::debug!("unknown window_type '{}', using expanding", raw);
                defaults.window_type
            }),
            None => defaults.window_type,
        };

        let config = FoldConfig {
            horizon: self.get_usize("horizon", defaults.horizon),
            n_folds: self.get_usize("n_folds", defaults.n_folds),
            window_type,
            min_train_size: self.get_usize("min_train_size", defaults.min_train_size).max(1),
            gap: self.get_usize("gap", defaults.gap),
            embargo: self.get_usize("embargo", defaults.embargo),
            initial_train_size: self.get_auto("initial_train_size"),
            skip_length: self.get_auto("skip_length"),
            clip_horizon: self.get_bool("clip_horizon", defaults.clip_horizon),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn model_options(&self, horizon: usize) -> Result<ModelOptions> {
        let defaults = ModelOptions::default();
        let confidence_level = self.get_f64("confidence_level").unwrap_or(DEFAULT_CONFIDENCE_LEVEL);
        if !(confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(TsfoldError::config_parse(
                "confidence_level",
                format!("must be between 0 and 1 (exclusive), got {}", confidence_level),
            ));
        }
        let seasonal_period = self.get_usize("seasonal_period", 0);

        Ok(ModelOptions {
            method: self.get_str("method").unwrap_or(defaults.method),
            model_spec: self.get_str("model"),
            horizon,
            confidence_level,
            seasonal_period,
            auto_detect_seasonality: seasonal_period == 0,
            include_fitted: false,
            include_residuals: false,
        })
    }

    pub fn metric(&self) -> Result<Metric> {
        match self.get_str("metric") {
            Some(raw) => raw.parse(),
            None => Ok(Metric::default()),
        }
    }

    pub fn frequency(&self) -> Result<Option<Frequency>> {
        self.get_str("frequency")
            .map(|raw| Frequency::parse(&raw))
            .transpose()
    }

    pub fn insufficient_data(&self) -> InsufficientDataPolicy {
        match self.get_str("insufficient_data") {
            Some(raw) => InsufficientDataPolicy::parse(&raw).unwrap_or_else(|| {
                log::debug!("unknown insufficient_data mode '{}', using fail", raw);
                InsufficientDataPolicy::default()
            }),
            None => InsufficientDataPolicy::default(),
        }
    }
}
