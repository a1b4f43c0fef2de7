use super::base::{count, walk_forward, FoldPlanner, Walk};
use super::types::FoldConfig;
use crate::types::FoldBoundary;

/// Folds counted in positions of the sorted distinct-time axis, for
/// frequencies where one period is not a constant offset.
pub struct PositionIndexPlanner {
    config: FoldConfig,
}

impl PositionIndexPlanner {
    pub fn new(config: FoldConfig) -> Self {
        Self { config }
    }

    /// Boundaries as indices into an axis of `n` points.
    pub fn plan_positions(&self, n: usize) -> Vec<FoldBoundary> {
        if n < 2 {
            return Vec::new();
        }
        let reserved = self.config.n_folds.saturating_mul(self.config.horizon);
        let initial = self
            .config
            .initial_train_size()
            .unwrap_or_else(|| n.saturating_sub(reserved).max(1));

        walk_forward(
            &self.config,
            &Walk {
                base: 0,
                max: n as i64 - 1,
                period: 1,
                first_end: count(initial) - 1,
                lookback: count(self.config.min_train_size.saturating_sub(1)),
            },
        )
    }
}

impl FoldPlanner for PositionIndexPlanner {
    fn plan(&self, axis: &[i64]) -> Vec<FoldBoundary> {
        let at = |i: i64| usize::try_from(i).ok().and_then(|i| axis.get(i).copied());
        self.plan_positions(axis.len())
            .into_iter()
            .filter_map(|f| {
                Some(FoldBoundary {
                    fold_id: f.fold_id,
                    train_start: at(f.train_start)?,
                    train_end: at(f.train_end)?,
                    test_start: at(f.test_start)?,
                    test_end: at(f.test_end)?,
                })
            })
            .collect()
    }
}
