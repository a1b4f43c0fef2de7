use std::collections::VecDeque;

/// Default rows per output batch, matching the host's vector size.
pub const STANDARD_BATCH_CAPACITY: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStatus {
    /// The batch is full and rows remain.
    MoreOutput,
    /// Nothing remains; the batch may be partial or empty.
    Finished,
}

/// Cursor over a result set that is handed out one bounded batch at a time.
/// Rows can be appended until the streamer is sealed.
#[derive(Debug)]
pub struct OutputStreamer<R> {
    pending: VecDeque<R>,
    cursor: usize,
    sealed: bool,
}

impl<R> Default for OutputStreamer<R> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
            cursor: 0,
            sealed: false,
        }
    }
}

impl<R> OutputStreamer<R> {
    /// Streamer over a complete result set.
    pub fn sealed(rows: Vec<R>) -> Self {
        Self {
            pending: rows.into(),
            cursor: 0,
            sealed: true,
        }
    }

    /// Streamer that is filled incrementally.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, rows: Vec<R>) {
        debug_assert!(!self.sealed, "extend after seal");
        self.pending.extend(rows);
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Rows handed out so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn drain(&mut self, capacity: usize) -> (Vec<R>, DrainStatus) {
        let take = capacity.min(self.pending.len());
        let batch: Vec<R> = self.pending.drain(..take).collect();
        self.cursor += batch.len();

        let status = if self.pending.is_empty() && self.sealed {
            DrainStatus::Finished
        } else {
            DrainStatus::MoreOutput
        };
        (batch, status)
    }
}
