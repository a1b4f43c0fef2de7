use super::{ExecutionContext, GroupOperator};
use crate::engines::output::DrainStatus;
use crate::error::{Result, TsfoldError};
use polars::prelude::DataFrame;
use std::sync::Barrier;
use std::thread;

/// Stands in for the host engine: one scoped thread per partition, all
/// input calls before any finalize call.
pub struct LocalDriver;

impl LocalDriver {
    /// Output frames in the order they were produced, per worker.
    pub fn run<Op: GroupOperator>(
        ctx: &ExecutionContext<Op>,
        partitions: Vec<Vec<DataFrame>>,
    ) -> Result<Vec<DataFrame>> {
        let workers = partitions.len().max(1);
        let phase = Barrier::new(workers);

        let results: Vec<Result<Vec<DataFrame>>> = thread::scope(|scope| {
            let handles: Vec<_> = partitions
                .into_iter()
                .map(|batches| {
                    let phase = &phase;
                    scope.spawn(move || -> Result<Vec<DataFrame>> {
                        let mut worker = ctx.worker();
                        let ingested = batches
                            .iter()
                            .try_for_each(|batch| ctx.input(&mut worker, batch).map(|_| ()));
                        if ingested.is_err() {
                            ctx.withdraw(&mut worker);
                        }
                        phase.wait();
                        ingested?;

                        let mut frames = Vec::new();
                        loop {
                            let batch = ctx.finalize(&mut worker)?;
                            if batch.frame.height() > 0 {
                                frames.push(batch.frame);
                            }
                            if batch.status == DrainStatus::Finished {
                                break;
                            }
                        }
                        Ok(frames)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        Err(TsfoldError::Computation("worker thread panicked".to_string()))
                    })
                })
                .collect()
        });

        let mut frames = Vec::new();
        for result in results {
            frames.extend(result?);
        }
        Ok(frames)
    }

    /// All output stacked into one frame.
    pub fn collect<Op: GroupOperator>(
        ctx: &ExecutionContext<Op>,
        partitions: Vec<Vec<DataFrame>>,
    ) -> Result<DataFrame> {
        let mut frames = Self::run(ctx, partitions)?.into_iter();
        let Some(mut out) = frames.next() else {
            return ctx.empty_frame();
        };
        for frame in frames {
            out.vstack_mut(&frame)?;
        }
        Ok(out)
    }
}
