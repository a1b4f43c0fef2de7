//! Bind / Input / Finalize plumbing shared by every operator.

pub mod context;
pub mod driver;

pub use context::{ExecutionContext, FinalizeBatch, InputStatus, WorkerState};
pub use driver::LocalDriver;

use crate::data::ColumnSpec;
use crate::engines::buffer::{GroupBuffer, IngestRow, SeriesBuffer};
use crate::error::Result;
use crate::types::SeriesKey;
use polars::prelude::DataFrame;

/// When buffered series memory is given back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStrategy {
    /// Each group is evaluated lazily while draining and dropped right
    /// after its rows are produced.
    PerGroup,
    /// All groups are evaluated up front (in parallel) and dropped together.
    Bulk,
}

/// One group-partitioned operation, bound to an input layout.
pub trait GroupOperator: Send + Sync {
    type Value: Send + Sync + Default;
    type Plan: Send + Sync;
    type Row: Send;

    fn name(&self) -> &'static str;

    fn output_schema(&self) -> Vec<ColumnSpec>;

    fn release_strategy(&self) -> ReleaseStrategy {
        ReleaseStrategy::Bulk
    }

    /// Batch to owned rows; must not touch shared state.
    fn extract(&self, batch: &DataFrame) -> Result<Vec<IngestRow<Self::Value>>>;

    /// Global work done once before any group is evaluated, e.g. folds.
    fn plan(&self, groups: &GroupBuffer<Self::Value>) -> Result<Self::Plan>;

    /// Rows for one time-sorted group.
    fn evaluate(
        &self,
        plan: &Self::Plan,
        key: &SeriesKey,
        series: &SeriesBuffer<Self::Value>,
    ) -> Result<Vec<Self::Row>>;

    /// Pass over rows that are finalized together: every group's rows under
    /// `Bulk`, one group's rows under `PerGroup`.
    fn complete(&self, _plan: &Self::Plan, rows: Vec<Self::Row>) -> Result<Vec<Self::Row>> {
        Ok(rows)
    }

    /// Rows about the whole execution rather than one group, emitted once
    /// after every group's rows.
    fn finish(&self, _plan: &Self::Plan) -> Result<Vec<Self::Row>> {
        Ok(Vec::new())
    }

    fn to_frame(&self, rows: &[Self::Row]) -> Result<DataFrame>;
}
