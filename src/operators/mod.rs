pub mod backtest;
pub mod cv_folds;
pub mod cv_split;
pub mod decomposition;
pub mod fill_gaps;
pub mod forecast;
pub mod frame;
pub mod metrics;
pub mod stats;

pub use backtest::BacktestOperator;
pub use cv_folds::CvFoldsOperator;
pub use cv_split::{CvSplitOperator, SplitRow};
pub use decomposition::{DecompositionOperator, DecompositionRow};
pub use fill_gaps::{FillGapsOperator, FilledRow};
pub use forecast::ForecastOperator;
pub use metrics::{MetricRow, MetricsOperator, ScoredPoint};
pub use stats::{StatsOperator, StatsRow};
