use crate::data::InputLayout;
use crate::error::Result;
use crate::types::SeriesKey;
use polars::prelude::*;

/// One input row after conversion, before it reaches the shared buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRow<V = f64> {
    pub key: SeriesKey,
    pub time: i64,
    pub value: V,
    pub valid: bool,
}

/// Column `index` of `batch` as nullable f64.
pub fn f64_values(batch: &DataFrame, index: usize) -> Result<Vec<Option<f64>>> {
    let column = batch.get_columns()[index].cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

fn key_parts(batch: &DataFrame, layout: &InputLayout) -> Result<Vec<Vec<Option<String>>>> {
    let mut parts: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(layout.keys.len()); batch.height()];
    for index in 0..layout.keys.len() {
        let column = batch.get_columns()[index].cast(&DataType::String)?;
        for (row, value) in column.str()?.into_iter().enumerate() {
            parts[row].push(value.map(str::to_owned));
        }
    }
    Ok(parts)
}

/// Converts a batch into owned rows without touching shared state. A row
/// with a null time is dropped; a `None` value keeps the row as invalid.
pub fn extract_rows<V: Default>(
    layout: &InputLayout,
    batch: &DataFrame,
    values: Vec<Option<V>>,
) -> Result<Vec<IngestRow<V>>> {
    layout.check_batch(batch)?;
    let keys = key_parts(batch, layout)?;
    let times = layout
        .time
        .to_units(&batch.get_columns()[layout.time_index()])?;

    let mut rows = Vec::with_capacity(batch.height());
    let mut dropped = 0usize;
    for ((parts, time), value) in keys.into_iter().zip(times).zip(values) {
        let Some(time) = time else {
            dropped += 1;
            continue;
        };
        let (value, valid) = match value {
            Some(v) => (v, true),
            None => (V::default(), false),
        };
        rows.push(IngestRow {
            key: SeriesKey::new(parts),
            time,
            value,
            valid,
        });
    }
    if dropped > 0 {
        log::debug!("dropped {} rows with a null time", dropped);
    }
    Ok(rows)
}
