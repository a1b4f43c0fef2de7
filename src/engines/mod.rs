pub mod buffer;
pub mod coordinator;
pub mod execution;
pub mod folds;
pub mod metrics;
pub mod output;
pub mod policy;

pub use buffer::{GroupBuffer, SeriesBuffer, SeriesPoint};
pub use coordinator::{Claim, FinalizeCoordinator, WorkerTicket};
pub use execution::{
    ExecutionContext, FinalizeBatch, GroupOperator, InputStatus, LocalDriver, ReleaseStrategy,
    WorkerState,
};
pub use folds::{FoldConfig, FoldPlanner, WindowType};
pub use metrics::{Metric, MetricAggregator, ScoringInput};
pub use output::{DrainStatus, OutputStreamer, STANDARD_BATCH_CAPACITY};
pub use policy::InsufficientDataPolicy;
