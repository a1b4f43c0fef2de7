use serde::{Deserialize, Serialize};
use std::fmt;

/// Rendering of a null key component in logs and error messages.
pub const NULL_KEY: &str = "__NULL__";

/// Identity of one logical series, one entry per key column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesKey(pub Vec<Option<String>>);

impl SeriesKey {
    pub fn new(parts: Vec<Option<String>>) -> Self {
        Self(parts)
    }

    pub fn single(part: impl Into<String>) -> Self {
        Self(vec![Some(part.into())])
    }

    pub fn parts(&self) -> &[Option<String>] {
        &self.0
    }

    pub fn part(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(|p| p.as_deref())
    }

    pub fn width(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<&str> = self
            .0
            .iter()
            .map(|p| p.as_deref().unwrap_or(NULL_KEY))
            .collect();
        write!(f, "{}", rendered.join("|"))
    }
}

/// One train/test split. Units are shared by all fields: either time units
/// (micros or raw integers) or positions into a sorted distinct-time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldBoundary {
    pub fold_id: usize,
    pub train_start: i64,
    pub train_end: i64,
    pub test_start: i64,
    pub test_end: i64,
}

impl FoldBoundary {
    pub fn in_train(&self, t: i64) -> bool {
        t >= self.train_start && t <= self.train_end
    }

    pub fn in_test(&self, t: i64) -> bool {
        t >= self.test_start && t <= self.test_end
    }
}

/// Train/test membership of a row inside one fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitRole {
    Train,
    Test,
}

impl SplitRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitRole::Train => "train",
            SplitRole::Test => "test",
        }
    }
}

/// Forecast-shaped output record shared by the backtest and forecast
/// operators. Unavailable fields are `None`, never defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub fold_id: Option<usize>,
    pub key: SeriesKey,
    pub time: i64,
    pub step: Option<usize>,
    pub forecast: f64,
    pub actual: Option<f64>,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub score: Option<f64>,
    pub model_name: String,
}

impl ResultRow {
    /// Signed error (forecast - actual) when the actual is known.
    pub fn error(&self) -> Option<f64> {
        self.actual.map(|a| self.forecast - a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display_renders_nulls() {
        let key = SeriesKey::new(vec![Some("store_1".into()), None]);
        assert_eq!(key.to_string(), "store_1|__NULL__");
        assert_eq!(key.part(0), Some("store_1"));
        assert_eq!(key.part(1), None);
    }

    #[test]
    fn test_fold_membership_is_inclusive() {
        let fold = FoldBoundary {
            fold_id: 1,
            train_start: 0,
            train_end: 4,
            test_start: 5,
            test_end: 7,
        };
        assert!(fold.in_train(0) && fold.in_train(4));
        assert!(!fold.in_train(5));
        assert!(fold.in_test(5) && fold.in_test(7));
        assert!(!fold.in_test(8));
    }
}
