use super::{GroupOperator, ReleaseStrategy};
use crate::data::ColumnSpec;
use crate::engines::buffer::{GroupBuffer, SeriesBuffer};
use crate::engines::coordinator::{Claim, FinalizeCoordinator, WorkerTicket};
use crate::engines::output::{DrainStatus, OutputStreamer, STANDARD_BATCH_CAPACITY};
use crate::error::{Result, TsfoldError};
use crate::types::SeriesKey;
use polars::prelude::DataFrame;
use rayon::prelude::*;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStatus {
    NeedMoreInput,
}

#[derive(Debug)]
pub struct FinalizeBatch {
    pub frame: DataFrame,
    pub status: DrainStatus,
}

/// Result set owned by the elected finalizer.
struct ResultStream<Op: GroupOperator> {
    plan: Op::Plan,
    remaining: VecDeque<(SeriesKey, SeriesBuffer<Op::Value>)>,
    streamer: OutputStreamer<Op::Row>,
}

enum Role<Op: GroupOperator> {
    Collecting,
    Finalizing(ResultStream<Op>),
    Done,
}

/// Thread-local state of one worker.
pub struct WorkerState<Op: GroupOperator> {
    ticket: WorkerTicket,
    role: Role<Op>,
}

impl<Op: GroupOperator> WorkerState<Op> {
    fn new() -> Self {
        Self {
            ticket: WorkerTicket::default(),
            role: Role::Collecting,
        }
    }

    pub fn is_finalizer(&self) -> bool {
        matches!(self.role, Role::Finalizing(_))
    }
}

/// Everything one execution of a bound operator shares across workers.
pub struct ExecutionContext<Op: GroupOperator> {
    operator: Op,
    groups: Mutex<GroupBuffer<Op::Value>>,
    coordinator: FinalizeCoordinator,
    release: ReleaseStrategy,
    batch_capacity: usize,
}

impl<Op: GroupOperator> ExecutionContext<Op> {
    pub fn new(operator: Op) -> Self {
        let release = operator.release_strategy();
        Self {
            operator,
            groups: Mutex::new(GroupBuffer::new()),
            coordinator: FinalizeCoordinator::new(),
            release,
            batch_capacity: STANDARD_BATCH_CAPACITY,
        }
    }

    pub fn with_release_strategy(mut self, release: ReleaseStrategy) -> Self {
        self.release = release;
        self
    }

    pub fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = capacity.max(1);
        self
    }

    pub fn operator(&self) -> &Op {
        &self.operator
    }

    pub fn output_schema(&self) -> Vec<ColumnSpec> {
        self.operator.output_schema()
    }

    pub fn worker(&self) -> WorkerState<Op> {
        WorkerState::new()
    }

    /// Buffers one batch. Extraction and grouping run without the lock; the
    /// merge takes it once.
    pub fn input(&self, worker: &mut WorkerState<Op>, batch: &DataFrame) -> Result<InputStatus> {
        self.coordinator.register_collector(&mut worker.ticket);
        if batch.height() == 0 {
            return Ok(InputStatus::NeedMoreInput);
        }

        let mut local = GroupBuffer::new();
        local.ingest_rows(self.operator.extract(batch)?);
        let mut groups = self.groups.lock().map_err(|_| poisoned())?;
        groups.merge(local);
        Ok(InputStatus::NeedMoreInput)
    }

    /// Counts a worker out without finalizing, e.g. after its input failed,
    /// so the finalizer does not wait on it.
    pub fn withdraw(&self, worker: &mut WorkerState<Op>) {
        self.coordinator.finish_collecting(&mut worker.ticket);
        worker.role = Role::Done;
    }

    /// Called repeatedly per worker once input is exhausted.
    pub fn finalize(&self, worker: &mut WorkerState<Op>) -> Result<FinalizeBatch> {
        if matches!(worker.role, Role::Collecting) {
            self.coordinator.finish_collecting(&mut worker.ticket);
            match self.coordinator.try_claim() {
                Claim::Lost => {
                    worker.role = Role::Done;
                    return self.empty_batch();
                }
                Claim::Won => {
                    self.coordinator.wait_for_collectors();
                    let stream = self.build_stream()?;
                    worker.role = Role::Finalizing(stream);
                }
            }
        }

        let (rows, status) = match &mut worker.role {
            Role::Finalizing(stream) => self.next_batch(stream)?,
            _ => return self.empty_batch(),
        };
        if status == DrainStatus::Finished {
            log::debug!("{}: output finished", self.operator.name());
            worker.role = Role::Done;
        }
        Ok(FinalizeBatch {
            frame: self.operator.to_frame(&rows)?,
            status,
        })
    }

    pub fn empty_frame(&self) -> Result<DataFrame> {
        self.operator.to_frame(&[])
    }

    fn empty_batch(&self) -> Result<FinalizeBatch> {
        Ok(FinalizeBatch {
            frame: self.empty_frame()?,
            status: DrainStatus::Finished,
        })
    }

    fn build_stream(&self) -> Result<ResultStream<Op>> {
        let groups = {
            let mut shared = self.groups.lock().map_err(|_| poisoned())?;
            std::mem::take(&mut *shared)
        };
        log::info!(
            "{}: finalizing {} groups ({} points) from {} collectors",
            self.operator.name(),
            groups.len(),
            groups.total_points(),
            self.coordinator.collectors()
        );

        let plan = self.operator.plan(&groups)?;
        let groups = groups.into_groups();

        match self.release {
            ReleaseStrategy::Bulk => {
                let operator = &self.operator;
                let per_group = groups
                    .par_iter()
                    .map(|(key, series)| operator.evaluate(&plan, key, series))
                    .collect::<Result<Vec<Vec<Op::Row>>>>()?;
                drop(groups);
                let mut rows = operator.complete(&plan, per_group.into_iter().flatten().collect())?;
                rows.extend(operator.finish(&plan)?);
                log::info!("{}: {} result rows", self.operator.name(), rows.len());
                Ok(ResultStream {
                    plan,
                    remaining: VecDeque::new(),
                    streamer: OutputStreamer::sealed(rows),
                })
            }
            ReleaseStrategy::PerGroup => Ok(ResultStream {
                plan,
                remaining: groups.into(),
                streamer: OutputStreamer::open(),
            }),
        }
    }

    /// Evaluates pending groups until a full batch is buffered or none are
    /// left, then drains one batch.
    fn next_batch(&self, stream: &mut ResultStream<Op>) -> Result<(Vec<Op::Row>, DrainStatus)> {
        while !stream.streamer.is_sealed() && stream.streamer.pending() < self.batch_capacity {
            match stream.remaining.pop_front() {
                Some((key, series)) => {
                    let rows = self.operator.evaluate(&stream.plan, &key, &series)?;
                    stream.streamer.extend(self.operator.complete(&stream.plan, rows)?);
                }
                None => self.close(stream)?,
            }
        }
        if stream.remaining.is_empty() && !stream.streamer.is_sealed() {
            self.close(stream)?;
        }
        Ok(stream.streamer.drain(self.batch_capacity))
    }

    fn close(&self, stream: &mut ResultStream<Op>) -> Result<()> {
        stream.streamer.extend(self.operator.finish(&stream.plan)?);
        stream.streamer.seal();
        Ok(())
    }
}

fn poisoned() -> TsfoldError {
    TsfoldError::Computation("group buffer lock poisoned".to_string())
}
