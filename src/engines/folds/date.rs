use super::base::{count, walk_forward, FoldPlanner, Walk};
use super::types::FoldConfig;
use crate::types::FoldBoundary;

/// Folds from the observed time range and a constant period length.
pub struct DateArithmeticPlanner {
    config: FoldConfig,
    period: i64,
}

impl DateArithmeticPlanner {
    pub fn new(config: FoldConfig, period: i64) -> Self {
        Self {
            config,
            period: period.max(1),
        }
    }

    pub fn period(&self) -> i64 {
        self.period
    }

    /// Boundaries for observations spanning `[min, max]` with
    /// `distinct_count` distinct timestamps.
    pub fn plan_range(&self, min: i64, max: i64, distinct_count: usize) -> Vec<FoldBoundary> {
        let initial = self
            .config
            .initial_train_size()
            .unwrap_or((distinct_count / 2).max(1));

        walk_forward(
            &self.config,
            &Walk {
                base: min,
                max,
                period: self.period,
                first_end: count(initial),
                lookback: count(self.config.min_train_size),
            },
        )
    }
}

impl FoldPlanner for DateArithmeticPlanner {
    fn plan(&self, axis: &[i64]) -> Vec<FoldBoundary> {
        match (axis.first(), axis.last()) {
            (Some(&min), Some(&max)) => self.plan_range(min, max, axis.len()),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::folds::WindowType;

    const DAY: i64 = 86_400_000_000;

    fn config() -> FoldConfig {
        FoldConfig {
            horizon: 3,
            n_folds: 2,
            initial_train_size: Some(4),
            skip_length: Some(3),
            ..Default::default()
        }
    }

    #[test]
    fn test_ten_daily_points_drop_the_overhanging_fold() {
        let folds = DateArithmeticPlanner::new(config(), DAY).plan_range(0, 9 * DAY, 10);
        assert_eq!(folds.len(), 1);
        assert_eq!(folds[0].train_start, 0);
        assert_eq!(folds[0].train_end, 4 * DAY);
        assert_eq!(folds[0].test_start, 5 * DAY);
        assert_eq!(folds[0].test_end, 7 * DAY);
    }

    #[test]
    fn test_clip_horizon_truncates_last_fold() {
        let mut cfg = config();
        cfg.clip_horizon = true;
        let folds = DateArithmeticPlanner::new(cfg, DAY).plan_range(0, 9 * DAY, 10);
        assert_eq!(folds.len(), 2);
        assert_eq!(folds[1].train_end, 7 * DAY);
        assert_eq!(folds[1].test_start, 8 * DAY);
        assert_eq!(folds[1].test_end, 9 * DAY);
    }

    #[test]
    fn test_auto_initial_is_half_the_distinct_count() {
        let cfg = FoldConfig {
            horizon: 1,
            n_folds: 1,
            ..Default::default()
        };
        let folds = DateArithmeticPlanner::new(cfg, 1).plan_range(0, 9, 10);
        assert_eq!(folds[0].train_end, 5);
    }

    #[test]
    fn test_fixed_window_reaches_back_min_train_periods() {
        let cfg = FoldConfig {
            window_type: WindowType::Fixed,
            min_train_size: 2,
            ..config()
        };
        let folds = DateArithmeticPlanner::new(cfg, DAY).plan_range(0, 20 * DAY, 21);
        assert_eq!(folds[0].train_start, 2 * DAY);
        assert_eq!(folds[1].train_start, 5 * DAY);
    }
}
