use crate::error::{Result, TsfoldError};
use polars::prelude::*;
use std::path::Path;

pub struct CsvConnector;

impl CsvConnector {
    /// Load CSV file into DataFrame, parsing ISO dates into DATE/TIMESTAMP columns.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .map_parse_options(|opts| opts.with_try_parse_dates(true))
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()
            .map_err(|e| TsfoldError::Computation(format!("Failed to read CSV: {}", e)))?;

        if df.height() == 0 {
            log::warn!("{} contains no rows", path.as_ref().display());
        }
        Ok(df)
    }

    /// Keep `columns` in the given order, which becomes the operator layout.
    pub fn project(df: DataFrame, columns: &[String]) -> Result<DataFrame> {
        if columns.is_empty() {
            return Ok(df);
        }
        let exprs: Vec<Expr> = columns.iter().map(|c| col(c.as_str())).collect();
        Ok(df.lazy().select(exprs).collect()?)
    }

    /// Row-wise partitions for `workers` workers, each cut into batches of at
    /// most `batch_size` rows.
    pub fn partition(df: &DataFrame, workers: usize, batch_size: usize) -> Vec<Vec<DataFrame>> {
        let workers = workers.max(1);
        let batch_size = batch_size.max(1);
        let per_worker = df.height().div_ceil(workers);

        (0..workers)
            .map(|w| {
                let start = w * per_worker;
                let end = (start + per_worker).min(df.height());
                let mut batches = Vec::new();
                let mut offset = start;
                while offset < end {
                    let len = batch_size.min(end - offset);
                    batches.push(df.slice(offset as i64, len));
                    offset += len;
                }
                batches
            })
            .collect()
    }
}
