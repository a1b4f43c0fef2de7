pub mod accuracy;
pub mod engine;
pub mod kind;

pub use accuracy::AccuracyMetrics;
pub use engine::{MetricAggregator, ScoringInput};
pub use kind::Metric;
