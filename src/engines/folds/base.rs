use super::types::FoldConfig;
use crate::types::FoldBoundary;

pub trait FoldPlanner: Send + Sync {
    /// Fold boundaries, in time units, over the sorted distinct observed times.
    fn plan(&self, axis: &[i64]) -> Vec<FoldBoundary>;
}

/// Geometry of one walk: `base + k * period` is the k-th period boundary.
pub(crate) struct Walk {
    pub base: i64,
    pub max: i64,
    pub period: i64,
    /// Periods from `base` to the first fold's training end.
    pub first_end: i64,
    /// Periods a non-expanding window reaches back from its training end.
    pub lookback: i64,
}

/// Shared walk-forward loop for both planner modes. Boundaries past the
/// `i64` range count as not fitting.
pub(crate) fn walk_forward(config: &FoldConfig, walk: &Walk) -> Vec<FoldBoundary> {
    let skip = count(config.skip());
    let gap = count(config.gap);
    let horizon = count(config.horizon);
    let embargo = count(config.embargo);
    let period = walk.period;
    let offset = |from: i64, k: i64| k.checked_mul(period).and_then(|d| from.checked_add(d));

    let mut folds: Vec<FoldBoundary> = Vec::with_capacity(config.n_folds.min(1024));
    for f in 0..count(config.n_folds) {
        let ends = f
            .checked_mul(skip)
            .and_then(|k| k.checked_add(walk.first_end))
            .and_then(|k| offset(walk.base, k))
            .and_then(|train_end| {
                let test_start = offset(train_end, gap.checked_add(1)?)?;
                Some((train_end, test_start))
            });
        // Later folds only move further right.
        let Some((train_end, test_start)) = ends else {
            break;
        };
        let unclipped = gap.checked_add(horizon).and_then(|k| offset(train_end, k));
        let test_end = match (config.clip_horizon, unclipped) {
            (true, end) => end.map_or(walk.max, |end| end.min(walk.max)),
            (false, Some(end)) => end,
            (false, None) => break,
        };

        let fits = if config.clip_horizon {
            test_start <= walk.max
        } else {
            test_end <= walk.max
        };
        if !fits {
            break;
        }

        let mut train_start = if config.window_type.is_expanding() {
            walk.base
        } else {
            train_end
                .saturating_sub(walk.lookback.saturating_mul(period))
                .max(walk.base)
        };
        if embargo > 0 {
            if let Some(prev) = folds.last() {
                train_start = train_start.max(prev.test_end.saturating_add(embargo.saturating_mul(period)));
            }
        }
        if train_start > train_end {
            log::debug!(
                "fold {} dropped: embargo leaves no training data before {}",
                f + 1,
                train_end
            );
            continue;
        }

        folds.push(FoldBoundary {
            fold_id: folds.len() + 1,
            train_start,
            train_end,
            test_start,
            test_end,
        });
    }
    folds
}

/// A size option as a period count; anything past `i64` cannot fit an axis.
pub(crate) fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
